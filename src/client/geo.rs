use reqwest::Client;
use tracing::warn;

use crate::api::models::GeoPayload;
use crate::client::ClientError;

pub const IP_API_URL: &str = "http://ip-api.com/json";

pub struct GeoLookup {
    client: Client,
    url: String,
}

impl GeoLookup {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Location of the caller's public IP. Failures are logged and give an
    /// empty payload.
    pub async fn lookup(&self) -> GeoPayload {
        match self.fetch().await {
            Ok(geo) => geo,
            Err(e) => {
                warn!("Geolocation lookup failed: {}", e);
                GeoPayload::default()
            }
        }
    }

    async fn fetch(&self) -> Result<GeoPayload, ClientError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Server(status, text));
        }
        Ok(response.json().await?)
    }
}
