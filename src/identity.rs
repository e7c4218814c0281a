use async_trait::async_trait;
use portray_schema::credentials::CredentialRecord;

use crate::error::ProviderError;

pub mod aws_sdk;

pub mod defaults {
    pub const REGION: &str = "us-east-1";
    pub const ROOT_SESSION_SECONDS: i32 = 43200;
    pub const ROLE_SESSION_SECONDS: i32 = 3600;
}

/// Parameters for an MFA-derived session.
///
/// `token_code` is `None` when MFA is disabled for the identity; the request is then sent
/// without a serial number or token.
#[derive(Debug, Clone)]
pub struct RootSessionInput<'a> {
    pub profile: &'a str,
    pub account_id: &'a str,
    pub user_name: &'a str,
    pub token_code: Option<&'a str>,
    pub region: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct AssumeRoleInput<'a> {
    pub account_id: &'a str,
    pub role_name: &'a str,
    pub external_id: &'a str,
    pub session_name: &'a str,
    pub source: &'a CredentialRecord,
    pub region: Option<&'a str>,
}

impl AssumeRoleInput<'_> {
    pub fn role_arn(&self) -> String {
        format!("arn:aws:iam::{}:role/{}", self.account_id, self.role_name)
    }
}

/// The network boundary. Implementations never touch the session cache.
#[async_trait]
pub trait IdentityProvider {
    async fn get_root_session(
        &self,
        input: RootSessionInput<'_>,
    ) -> Result<CredentialRecord, ProviderError>;

    async fn assume_role(
        &self,
        input: AssumeRoleInput<'_>,
    ) -> Result<CredentialRecord, ProviderError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Operation {
    GetRootSession,
    AssumeRole,
}

/// Maps an STS error code onto the provider error taxonomy.
pub fn classify(operation: Operation, code: Option<&str>, message: String) -> ProviderError {
    match (operation, code) {
        (Operation::GetRootSession, Some("AccessDenied")) => ProviderError::AuthRejected(message),
        (Operation::AssumeRole, Some("AccessDenied")) => ProviderError::AccessDenied(message),
        (_, Some("ExpiredToken" | "InvalidClientTokenId" | "SignatureDoesNotMatch")) => {
            ProviderError::AuthRejected(message)
        }
        (_, Some("NoSuchEntity" | "ValidationError")) => ProviderError::NotFound(message),
        _ => ProviderError::Unavailable(message),
    }
}
