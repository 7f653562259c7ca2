use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Lookup;
use crate::error::AvifloraError;

const BASE_URL: &str = "https://api.inaturalist.org/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalized result of one iNaturalist taxa lookup. `image_local` is filled
/// in by the enrichment orchestrator after the photo has been materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InatRecord {
    pub source: String,
    pub taxon_id: Option<u64>,
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub summary: Option<String>,
    pub images_remote: Vec<String>,
    pub image_local: Option<String>,
    pub url: Option<String>,
}

pub trait InatClient: Send + Sync {
    fn lookup(&self, scientific_name: &str) -> Lookup<InatRecord>;
}

#[derive(Clone)]
pub struct InatHttpClient {
    client: Client,
    base_url: String,
}

impl InatHttpClient {
    pub fn new() -> Result<Self, AvifloraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("aviflora/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AvifloraError::HttpClient(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AvifloraError::HttpClient(err.to_string()))?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }
}

impl InatClient for InatHttpClient {
    /// Single attempt, no retry. Transport, status and parse failures all map
    /// to `Failed`; an empty result set is `NotFound`.
    fn lookup(&self, scientific_name: &str) -> Lookup<InatRecord> {
        let url = format!("{}/taxa", self.base_url);
        let response = match self
            .client
            .get(&url)
            .query(&[("q", scientific_name), ("per_page", "1")])
            .send()
        {
            Ok(response) => response,
            Err(err) => return Lookup::Failed(err.to_string()),
        };
        if !response.status().is_success() {
            return Lookup::Failed(format!(
                "iNaturalist returned status {}",
                response.status().as_u16()
            ));
        }
        let payload: Value = match response.json() {
            Ok(payload) => payload,
            Err(err) => return Lookup::Failed(err.to_string()),
        };
        match extract_record(scientific_name, &payload) {
            Some(record) => Lookup::Found(record),
            None => Lookup::NotFound,
        }
    }
}

/// Pull the fixed-shape record out of a `/taxa` search payload. Returns None
/// when the result list is empty.
pub fn extract_record(query: &str, payload: &Value) -> Option<InatRecord> {
    let taxon = payload.get("results").and_then(|v| v.as_array())?.first()?;

    let taxon_id = taxon.get("id").and_then(|v| v.as_u64());
    let scientific_name = taxon
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(query)
        .to_string();
    let common_name = taxon
        .get("preferred_common_name")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let summary = taxon
        .get("wikipedia_summary")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    let mut images_remote = Vec::new();
    if let Some(url) = first_photo_url(taxon) {
        images_remote.push(url);
    }

    Some(InatRecord {
        source: "iNaturalist".to_string(),
        taxon_id,
        scientific_name,
        common_name,
        summary,
        images_remote,
        image_local: None,
        url: taxon_id.map(|id| format!("https://www.inaturalist.org/taxa/{id}")),
    })
}

/// Prefers the taxon's default photo (medium, then square), falling back to
/// the first listed photo.
fn first_photo_url(taxon: &Value) -> Option<String> {
    if let Some(default_photo) = taxon.get("default_photo") {
        let url = default_photo
            .get("medium_url")
            .and_then(|v| v.as_str())
            .or_else(|| default_photo.get("square_url").and_then(|v| v.as_str()));
        if let Some(url) = url {
            return Some(url.to_string());
        }
    }
    taxon
        .get("photos")
        .and_then(|v| v.as_array())
        .and_then(|photos| photos.first())
        .and_then(|photo| photo.get("medium_url"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}
