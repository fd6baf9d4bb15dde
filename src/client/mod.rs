//! The visitor side: identity, device fingerprint, geolocation, and the two
//! calls to the server.

pub mod fingerprint;
pub mod geo;
pub mod identity;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::models::{ErrorResponse, QueryRequest, QueryResponse, SessionRequest, SessionResponse};
use fingerprint::DeviceTraits;
use geo::GeoLookup;
use identity::VisitorIdStore;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network Error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server Error {0}: {1}")]
    Server(u16, String),
    #[error("Identity Error: {0}")]
    Io(#[from] std::io::Error),
}

/// Talks to the terminal server's `/session` and `/query` endpoints.
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn report_session(&self, report: &SessionRequest) -> Result<SessionResponse, ClientError> {
        self.post("/session", report).await
    }

    pub async fn query(&self, visitor_id: Uuid, prompt: &str) -> Result<String, ClientError> {
        let request = QueryRequest {
            visitor_id,
            prompt: prompt.to_string(),
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        Ok(response.answer)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, ClientError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(ClientError::Server(status, message));
        }

        Ok(response.json().await?)
    }
}

/// Everything the boot sequence gathers before the first prompt.
#[derive(Debug, Clone)]
pub struct VisitorSession {
    pub visitor_id: Uuid,
    pub fingerprint: String,
}

/// Ensures the id, fingerprints the host, looks up the location and reports
/// the session. Only the identity step can fail; a failed report is logged.
pub async fn open_session(
    ids: &VisitorIdStore,
    geo: Option<&GeoLookup>,
    relay: &RelayClient,
) -> Result<VisitorSession, ClientError> {
    let visitor_id = ids.load_or_create()?;
    let traits = DeviceTraits::collect();
    let fingerprint = traits.hash();

    let geo = match geo {
        Some(lookup) => lookup.lookup().await,
        None => Default::default(),
    };

    let report = SessionRequest {
        visitor_id,
        fp_hash: fingerprint.clone(),
        geo,
        user_agent: Some(traits.user_agent()),
    };

    match relay.report_session(&report).await {
        Ok(_) => info!(%visitor_id, "Session reported"),
        Err(e) => warn!(%visitor_id, "Session report failed: {}", e),
    }

    Ok(VisitorSession {
        visitor_id,
        fingerprint,
    })
}
