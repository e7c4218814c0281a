use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Temporary credentials as they are cached on disk, one file per session key.
///
/// `expiration` is in epoch seconds. A record without `role_name` is a root (MFA) session.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: i64,
    pub account_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

impl CredentialRecord {
    pub fn key(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret(&self) -> &str {
        &self.secret_access_key
    }

    pub fn token(&self) -> &str {
        &self.session_token
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role_name.as_deref().filter(|s| !s.is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expiration, 0).single()
    }
}
