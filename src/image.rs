use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Lookup;
use crate::error::AvifloraError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads one representative image. Single attempt; 404 is a miss, every
/// other failure is reported with its reason. Callers map both to "no image".
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Lookup<Vec<u8>>;
}

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
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
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Lookup<Vec<u8>> {
        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(err) => return Lookup::Failed(err.to_string()),
        };
        if response.status() == StatusCode::NOT_FOUND {
            return Lookup::NotFound;
        }
        if !response.status().is_success() {
            return Lookup::Failed(format!(
                "image host returned status {}",
                response.status().as_u16()
            ));
        }
        match response.bytes() {
            Ok(bytes) => Lookup::Found(bytes.to_vec()),
            Err(err) => Lookup::Failed(err.to_string()),
        }
    }
}
