use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use portray_schema::credentials::CredentialRecord;

use crate::error::ProviderError;
use crate::identity::{defaults, AssumeRoleInput, IdentityProvider, RootSessionInput};
use crate::mfa::ReadMfaToken;

pub const NOW: i64 = 1_700_000_000;

pub fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(NOW, 0).unwrap()
}

pub fn record(token: &str, expiration: i64, role_name: Option<&str>) -> CredentialRecord {
    CredentialRecord {
        access_key_id: format!("ASIA{}", token.to_uppercase()),
        secret_access_key: format!("secret-{}", token),
        session_token: token.to_string(),
        expiration,
        account_id: "111111111111".to_string(),
        role_name: role_name.map(|s| s.to_string()),
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    Root {
        profile: String,
        token_code: Option<String>,
    },
    Role {
        role_arn: String,
        external_id: String,
        session_name: String,
        source_token: String,
    },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Failure {
    AuthRejected,
    AccessDenied,
    Unavailable,
}

impl Failure {
    fn into_error(self) -> ProviderError {
        match self {
            Failure::AuthRejected => ProviderError::AuthRejected("invalid MFA code".to_string()),
            Failure::AccessDenied => ProviderError::AccessDenied("not trusted".to_string()),
            Failure::Unavailable => ProviderError::Unavailable("dispatch failure".to_string()),
        }
    }
}

/// Records every call and issues sessions valid from `NOW`.
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub root_failure: Option<Failure>,
    pub role_failure: Option<Failure>,
}

impl FakeProvider {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn get_root_session(
        &self,
        input: RootSessionInput<'_>,
    ) -> Result<CredentialRecord, ProviderError> {
        self.calls.lock().unwrap().push(Call::Root {
            profile: input.profile.to_string(),
            token_code: input.token_code.map(|s| s.to_string()),
        });
        if let Some(failure) = self.root_failure {
            return Err(failure.into_error());
        }

        Ok(CredentialRecord {
            account_id: input.account_id.to_string(),
            ..record(
                "root",
                NOW + i64::from(defaults::ROOT_SESSION_SECONDS),
                None,
            )
        })
    }

    async fn assume_role(
        &self,
        input: AssumeRoleInput<'_>,
    ) -> Result<CredentialRecord, ProviderError> {
        self.calls.lock().unwrap().push(Call::Role {
            role_arn: input.role_arn(),
            external_id: input.external_id.to_string(),
            session_name: input.session_name.to_string(),
            source_token: input.source.token().to_string(),
        });
        if let Some(failure) = self.role_failure {
            return Err(failure.into_error());
        }

        Ok(CredentialRecord {
            account_id: input.account_id.to_string(),
            ..record(
                "role",
                NOW + i64::from(defaults::ROLE_SESSION_SECONDS),
                Some(input.role_name),
            )
        })
    }
}

/// Answers every prompt with the same code and counts how often it was asked.
#[derive(Debug, Clone, Default)]
pub struct FakeTokenReader {
    pub code: String,
    pub reads: Arc<AtomicUsize>,
}

impl FakeTokenReader {
    pub fn answering(code: &str) -> FakeTokenReader {
        FakeTokenReader {
            code: code.to_string(),
            reads: Arc::default(),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadMfaToken for FakeTokenReader {
    async fn read_mfa_token(&self, _mfa_serial: &str) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.code.clone())
    }
}
