use std::fmt::Debug;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sts::config::Credentials;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_types::region::Region;
use portray_schema::credentials::CredentialRecord;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::identity::{
    classify, defaults, AssumeRoleInput, IdentityProvider, Operation, RootSessionInput,
};
use crate::mfa::mfa_serial;

/// Talks to AWS STS. Root sessions are signed with the profile's long-lived keys, role
/// sessions with the cached root session.
#[derive(Debug, Default)]
pub struct StsIdentityProvider;

fn region_of(region: Option<&str>) -> Region {
    Region::new(region.unwrap_or(defaults::REGION).to_string())
}

fn provider_error<E, R>(operation: Operation, err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    match &err {
        SdkError::ServiceError(service) => {
            let e = service.err();
            let message = e.message().unwrap_or("no message").to_string();
            classify(operation, e.code(), message)
        }
        _ => ProviderError::Unavailable(DisplayErrorContext(&err).to_string()),
    }
}

fn record_from(
    credentials: Option<aws_sdk_sts::types::Credentials>,
    account_id: &str,
    role_name: Option<&str>,
) -> Result<CredentialRecord, ProviderError> {
    let creds = credentials.ok_or_else(|| {
        ProviderError::Unavailable("STS didn't return a credential".to_string())
    })?;

    Ok(CredentialRecord {
        access_key_id: creds.access_key_id,
        secret_access_key: creds.secret_access_key,
        session_token: creds.session_token,
        expiration: creds.expiration.secs(),
        account_id: account_id.to_string(),
        role_name: role_name.map(|s| s.to_string()),
    })
}

impl StsIdentityProvider {
    async fn profile_client(&self, profile: &str, region: Option<&str>) -> aws_sdk_sts::Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_of(region))
            .profile_name(profile)
            .load()
            .await;
        aws_sdk_sts::Client::new(&config)
    }

    fn session_client(
        &self,
        source: &CredentialRecord,
        region: Option<&str>,
    ) -> aws_sdk_sts::Client {
        let credentials = Credentials::new(
            source.key(),
            source.secret(),
            Some(source.token().to_string()),
            source.expires_at().map(SystemTime::from),
            "portray",
        );

        let config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region_of(region))
            .credentials_provider(credentials)
            .build();
        aws_sdk_sts::Client::from_conf(config)
    }
}

#[async_trait]
impl IdentityProvider for StsIdentityProvider {
    async fn get_root_session(
        &self,
        input: RootSessionInput<'_>,
    ) -> Result<CredentialRecord, ProviderError> {
        let client = self.profile_client(input.profile, input.region).await;
        let mut builder = client
            .get_session_token()
            .duration_seconds(defaults::ROOT_SESSION_SECONDS);

        if let Some(token_code) = input.token_code {
            let serial = mfa_serial(input.account_id, input.user_name);
            debug!("requesting MFA session. serial:{}", serial);
            builder = builder.serial_number(serial).token_code(token_code);
        } else {
            info!("requesting session without MFA. profile:{}", input.profile);
        }

        let output = builder
            .send()
            .await
            .map_err(|e| provider_error(Operation::GetRootSession, e))?;
        record_from(output.credentials, input.account_id, None)
    }

    async fn assume_role(
        &self,
        input: AssumeRoleInput<'_>,
    ) -> Result<CredentialRecord, ProviderError> {
        let role_arn = input.role_arn();
        debug!(
            "assuming role. role_arn:{}, session_name:{}",
            role_arn, input.session_name
        );

        let client = self.session_client(input.source, input.region);
        let output = client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(input.session_name)
            .external_id(input.external_id)
            .duration_seconds(defaults::ROLE_SESSION_SECONDS)
            .send()
            .await
            .map_err(|e| provider_error(Operation::AssumeRole, e))?;
        record_from(output.credentials, input.account_id, Some(input.role_name))
    }
}
