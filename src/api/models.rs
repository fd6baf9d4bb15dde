use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{NewVisitor, UNKNOWN};

/// Subset of an ip-api.com response. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub visitor_id: Uuid,
    #[serde(rename = "fpHash", default)]
    pub fp_hash: String,
    #[serde(default)]
    pub geo: GeoPayload,
    #[serde(rename = "userAgent", default)]
    pub user_agent: Option<String>,
}

impl SessionRequest {
    pub fn into_visitor(self) -> NewVisitor {
        fn or_unknown(val: Option<String>) -> String {
            val.filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        }

        NewVisitor {
            visitor_id: self.visitor_id,
            fingerprint_hash: self.fp_hash,
            ip: or_unknown(self.geo.query),
            city: or_unknown(self.geo.city),
            country: or_unknown(self.geo.country),
            latitude: self.geo.lat.unwrap_or(0.0),
            longitude: self.geo.lon.unwrap_or(0.0),
            user_agent: or_unknown(self.user_agent),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub visitor_id: Uuid,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
