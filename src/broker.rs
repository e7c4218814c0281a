use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{ResolvedRequest, RoleRequest, RootRequest};
use crate::error::{PortrayError, Result};
use crate::identity::{AssumeRoleInput, IdentityProvider, RootSessionInput};
use crate::mfa::{mfa_serial, ReadMfaToken};
use crate::session::{self, Session};
use crate::store::{CredentialStore, SessionKey};

const MAX_SESSION_NAME: usize = 64;

/// Builds a role session name that STS accepts: `[\w+=,.@-]{2,64}`. The user name is cut
/// short so the timestamp always survives.
pub fn session_name(user_name: &str, now: DateTime<Utc>) -> String {
    let suffix = format!("-{}", now.timestamp());
    let mut name = String::from("Portray-");
    let room = MAX_SESSION_NAME.saturating_sub(name.len() + suffix.len());
    name.extend(
        user_name
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '+' | '=' | ',' | '.' | '@' | '-' => c,
                _ => '-',
            })
            .take(room),
    );
    name.push_str(&suffix);
    name
}

/// Returns usable credentials for a resolved request, reusing the session cache whenever it
/// still holds a valid record and asking the identity provider otherwise.
///
/// Fresh sessions replace the cached record. Provider failures are never retried.
pub struct CredentialsBroker<P, S, R> {
    provider: P,
    store: S,
    mfa_reader: R,
    local_user: String,
    clock: fn() -> DateTime<Utc>,
}

impl<P, S, R> CredentialsBroker<P, S, R>
where
    P: IdentityProvider + Send + Sync,
    S: CredentialStore + Send + Sync,
    R: ReadMfaToken + Send + Sync,
{
    pub fn new<U: Into<String>>(provider: P, store: S, mfa_reader: R, local_user: U) -> Self {
        Self {
            provider,
            store,
            mfa_reader,
            local_user: local_user.into(),
            clock: Utc::now,
        }
    }

    pub fn with_clock(self, clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock, ..self }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub async fn obtain(&self, request: &ResolvedRequest) -> Result<Session> {
        match request {
            ResolvedRequest::Root(root) => self.root_session(root).await,
            ResolvedRequest::Role(role) => self.role_session(role).await,
        }
    }

    fn cached(&self, key: &SessionKey) -> Option<Session> {
        let now = self.now();
        let record = self.store.load(key)?;
        if session::is_valid(&record, now) {
            debug!("cache hit. key:{:?}", key);
            Some(Session::cached(record, now))
        } else {
            debug!("cached session expired. key:{:?}", key);
            None
        }
    }

    pub async fn root_session(&self, request: &RootRequest) -> Result<Session> {
        let key = SessionKey::root(&request.profile);
        match self.cached(&key) {
            Some(session) => Ok(session),
            None => self.start_root_session(&key, request).await,
        }
    }

    async fn start_root_session(&self, key: &SessionKey, request: &RootRequest) -> Result<Session> {
        if !request.can_start_session() {
            return Err(PortrayError::IncompleteRequest(format!(
                "No valid session for profile \"{}\"; an account id and user name are required to start one",
                request.profile
            )));
        }

        let account_id = request.account_id.as_deref().unwrap_or_default();
        let user_name = request.user_name.as_deref().unwrap_or_default();
        let token_code = self.token_code(request, account_id, user_name).await?;

        info!("requesting root session. profile:{}", request.profile);
        let record = self
            .provider
            .get_root_session(RootSessionInput {
                profile: &request.profile,
                account_id,
                user_name,
                token_code: token_code.as_deref(),
                region: request.region.as_deref(),
            })
            .await?;

        self.store.save(key, &record)?;
        Ok(Session::fresh(record, self.now()))
    }

    async fn token_code(
        &self,
        request: &RootRequest,
        account_id: &str,
        user_name: &str,
    ) -> Result<Option<String>> {
        if request.no_mfa {
            return Ok(None);
        }

        let code = match request.token_code.as_ref() {
            Some(code) => code.clone(),
            None => self
                .mfa_reader
                .read_mfa_token(&mfa_serial(account_id, user_name))
                .await
                .map_err(PortrayError::TokenPrompt)?,
        };

        if code.is_empty() {
            Err(PortrayError::IncompleteRequest(
                "an MFA token code is required; use --no-mfa if MFA is disabled".to_string(),
            ))
        } else {
            Ok(Some(code))
        }
    }

    pub async fn role_session(&self, request: &RoleRequest) -> Result<Session> {
        let key = SessionKey::role(&request.account_id, &request.role_name);
        if let Some(session) = self.cached(&key) {
            return Ok(session);
        }

        let source_key = SessionKey::root(&request.source.profile);
        let source = match self.cached(&source_key) {
            Some(source) => source,
            None if request.source.can_start_session() => {
                self.start_root_session(&source_key, &request.source).await?
            }
            None => {
                return Err(PortrayError::MissingSourceSession(
                    request.source.profile.clone(),
                ))
            }
        };

        let now = self.now();
        let external_id = request
            .external_id
            .as_deref()
            .unwrap_or(self.local_user.as_str());
        let session_name = session_name(&self.local_user, now);

        info!(
            "assuming role. account_id:{}, role_name:{}",
            request.account_id, request.role_name
        );
        let record = self
            .provider
            .assume_role(AssumeRoleInput {
                account_id: &request.account_id,
                role_name: &request.role_name,
                external_id,
                session_name: &session_name,
                source: &source.record,
                region: request.source.region.as_deref(),
            })
            .await?;

        self.store.save(&key, &record)?;
        Ok(Session::fresh(record, self.now()))
    }
}
