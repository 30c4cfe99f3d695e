/*!
 * GeoNames lookup client.
 *
 * Fetches the most populated places of a country through `searchJSON`,
 * localized to a language, to seed the target city table.
 */

use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;

/// Default GeoNames API base URL
pub const DEFAULT_ENDPOINT: &str = "https://api.geonames.org";

/// One place returned by `searchJSON`
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Localized name
    #[serde(default)]
    pub name: Option<String>,
    /// Name in the toponym's own script
    #[serde(default)]
    pub toponym_name: Option<String>,
    /// Latitude as sent by the service
    #[serde(default)]
    pub lat: Option<String>,
    /// Longitude as sent by the service
    #[serde(default)]
    pub lng: Option<String>,
}

/// Error status embedded in a 200 response
#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    value: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    geonames: Vec<Place>,
    #[serde(default)]
    status: Option<Status>,
}

/// Query parameters of one search
#[derive(Debug, Clone)]
pub struct PlaceQuery {
    /// ISO country code
    pub country: String,
    /// Language of returned names
    pub lang: String,
    /// Maximum number of rows
    pub max_rows: usize,
}

/// GeoNames client
#[derive(Debug)]
pub struct GeoNames {
    client: Client,
    endpoint: String,
    username: String,
}

impl GeoNames {
    /// Create a new client. `insecure` disables TLS certificate checks.
    pub fn new(
        username: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
        insecure: bool,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint.into();
        Ok(Self {
            client,
            endpoint: if endpoint.trim().is_empty() {
                DEFAULT_ENDPOINT.to_string()
            } else {
                endpoint.trim_end_matches('/').to_string()
            },
            username: username.into(),
        })
    }

    /// Search URL for a query
    pub fn search_url(&self, query: &PlaceQuery) -> Result<Url, ProviderError> {
        let max_rows = query.max_rows.to_string();
        Url::parse_with_params(
            &format!("{}/searchJSON", self.endpoint),
            &[
                ("country", query.country.as_str()),
                ("featureClass", "P"),
                ("orderby", "population"),
                ("maxRows", max_rows.as_str()),
                ("lang", query.lang.as_str()),
                ("style", "FULL"),
                ("username", self.username.as_str()),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("Invalid GeoNames URL: {}", e)))
    }

    /// Fetch populated places ordered by population
    pub async fn search_places(&self, query: &PlaceQuery) -> Result<Vec<Place>, ProviderError> {
        let url = self.search_url(query)?;
        debug!("GET {}", url.as_str().replace(&self.username, "***"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!("GeoNames API error ({}): {}", status, body);
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        parse_search_response(&body)
    }
}

/// Parse a `searchJSON` body, surfacing embedded error statuses
pub fn parse_search_response(body: &str) -> Result<Vec<Place>, ProviderError> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    if let Some(status) = parsed.status {
        return Err(ProviderError::ApiError {
            status_code: 400,
            message: format!(
                "GeoNames error {}: {}",
                status.value.map(|v| v.to_string()).unwrap_or_default(),
                status.message.unwrap_or_default()
            ),
        });
    }

    if parsed.geonames.is_empty() {
        return Err(ProviderError::ApiError {
            status_code: 404,
            message: "GeoNames returned no results".to_string(),
        });
    }

    Ok(parsed.geonames)
}
