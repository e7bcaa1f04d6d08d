use serde::{Deserialize, Serialize};

use crate::games::PromptKind;
use crate::models::domain::UserId;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

/// Result of a stop request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    #[serde(rename = "releasedPartnerId")]
    pub released_partner_id: Option<UserId>,
}

/// Current chat partner lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "partnerId")]
    pub partner_id: Option<UserId>,
}

/// Truth-or-dare prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    pub kind: PromptKind,
    pub prompt: String,
}
