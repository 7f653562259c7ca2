use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Lookup;
use crate::error::AvifloraError;

const BASE_URL: &str = "https://api.gbif.org/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const COUNTRY_FACET_LIMIT: u32 = 20;

/// Normalized result of one GBIF lookup: the backbone rank chain plus the
/// countries with recorded occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbifRecord {
    pub source: String,
    pub key: u64,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub species: Option<String>,
    pub vernacular_name: Option<String>,
    pub countries: Vec<String>,
    pub url: String,
}

pub trait GbifClient: Send + Sync {
    fn lookup(&self, scientific_name: &str) -> Lookup<GbifRecord>;
}

#[derive(Clone)]
pub struct GbifHttpClient {
    client: Client,
    base_url: String,
}

impl GbifHttpClient {
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

    /// One GET, one attempt, JSON body or an error string.
    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("GBIF returned status {}", response.status().as_u16()));
        }
        response.json().map_err(|err| err.to_string())
    }
}

impl GbifClient for GbifHttpClient {
    /// The backbone match is the primary lookup: its failure fails the whole
    /// call and a match without a usage key is a miss. The species detail and
    /// the occurrence country facets are secondary; either may fail without
    /// invalidating the record.
    fn lookup(&self, scientific_name: &str) -> Lookup<GbifRecord> {
        let match_url = format!("{}/species/match", self.base_url);
        let matched = match self.get_json(&match_url, &[("name", scientific_name.to_string())]) {
            Ok(payload) => payload,
            Err(reason) => return Lookup::Failed(reason),
        };
        let Some(key) = extract_usage_key(&matched) else {
            return Lookup::NotFound;
        };

        let taxonomy = self
            .get_json(&format!("{}/species/{key}", self.base_url), &[])
            .unwrap_or_else(|reason| {
                tracing::warn!(species = scientific_name, key, reason = %reason, "GBIF taxonomy lookup failed");
                Value::Null
            });

        let occurrence_url = format!("{}/occurrence/search", self.base_url);
        let countries = match self.get_json(
            &occurrence_url,
            &[
                ("taxon_key", key.to_string()),
                ("limit", "0".to_string()),
                ("facet", "country".to_string()),
                ("facetLimit", COUNTRY_FACET_LIMIT.to_string()),
            ],
        ) {
            Ok(payload) => extract_countries(&payload),
            Err(reason) => {
                tracing::warn!(species = scientific_name, key, reason = %reason, "GBIF occurrence facets failed");
                Vec::new()
            }
        };

        Lookup::Found(extract_record(key, &taxonomy, countries))
    }
}

/// A backbone match payload without a usage key means GBIF did not recognize
/// the name.
pub fn extract_usage_key(payload: &Value) -> Option<u64> {
    payload
        .get("usageKey")
        .and_then(|v| v.as_u64())
        .or_else(|| payload.get("speciesKey").and_then(|v| v.as_u64()))
}

pub fn extract_record(key: u64, taxonomy: &Value, countries: Vec<String>) -> GbifRecord {
    GbifRecord {
        source: "GBIF".to_string(),
        key,
        kingdom: string_field(taxonomy, "kingdom"),
        phylum: string_field(taxonomy, "phylum"),
        class: string_field(taxonomy, "class"),
        order: string_field(taxonomy, "order"),
        family: string_field(taxonomy, "family"),
        genus: string_field(taxonomy, "genus"),
        species: string_field(taxonomy, "species"),
        vernacular_name: string_field(taxonomy, "vernacularName"),
        countries,
        url: format!("https://www.gbif.org/species/{key}"),
    }
}

/// Country names from the COUNTRY facet of an occurrence search.
pub fn extract_countries(payload: &Value) -> Vec<String> {
    let mut countries = Vec::new();
    let Some(facets) = payload.get("facets").and_then(|v| v.as_array()) else {
        return countries;
    };
    for facet in facets {
        if facet.get("field").and_then(|v| v.as_str()) != Some("COUNTRY") {
            continue;
        }
        if let Some(counts) = facet.get("counts").and_then(|v| v.as_array()) {
            for count in counts {
                if let Some(name) = count.get("name").and_then(|v| v.as_str()) {
                    countries.push(name.to_string());
                }
            }
        }
    }
    countries
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn usage_key_fallback() {
        assert_eq!(extract_usage_key(&json!({ "usageKey": 5 })), Some(5));
        assert_eq!(extract_usage_key(&json!({ "speciesKey": 9 })), Some(9));
        assert_eq!(extract_usage_key(&json!({ "matchType": "NONE" })), None);
    }

    #[test]
    fn record_from_null_taxonomy() {
        let record = extract_record(42, &Value::Null, Vec::new());
        assert_eq!(record.key, 42);
        assert_eq!(record.kingdom, None);
        assert_eq!(record.url, "https://www.gbif.org/species/42");
    }

    #[test]
    fn countries_only_from_country_facet() {
        let payload = json!({ "facets": [
            { "field": "YEAR", "counts": [{ "name": "2020" }] },
            { "field": "COUNTRY", "counts": [{ "name": "Spain" }, { "name": "Portugal" }] }
        ] });
        assert_eq!(extract_countries(&payload), vec!["Spain", "Portugal"]);
    }
}
