use tracing::debug;

use crate::broker::CredentialsBroker;
use crate::config::{AuthFlags, PortrayConfig, ResolvedRequest, Resolver, SwitchFlags};
use crate::error::{PortrayError, Result};
use crate::handler::{HandleCredentials, HandleCredentialsRequest};
use crate::identity::IdentityProvider;
use crate::mfa::ReadMfaToken;
use crate::session::{format_ttl, is_valid, Session};
use crate::store::CredentialStore;

#[derive(Debug, Clone)]
pub enum Command {
    Auth(AuthFlags),
    Switch(SwitchFlags),
}

pub struct Portray<P, S, R, H> {
    config: PortrayConfig,
    env_profile: Option<String>,
    broker: CredentialsBroker<P, S, R>,
    handler: H,
}

impl<P, S, R, H> Portray<P, S, R, H>
where
    P: IdentityProvider + Send + Sync,
    S: CredentialStore + Send + Sync,
    R: ReadMfaToken + Send + Sync,
    H: HandleCredentials,
{
    pub fn new(
        config: PortrayConfig,
        env_profile: Option<String>,
        broker: CredentialsBroker<P, S, R>,
        handler: H,
    ) -> Self {
        Self {
            config,
            env_profile,
            broker,
            handler,
        }
    }

    pub fn resolve(&self, command: &Command) -> Result<ResolvedRequest> {
        let resolver = Resolver::new(&self.config, self.env_profile.clone());
        match command {
            Command::Auth(flags) => resolver.resolve_auth(flags).map(ResolvedRequest::Root),
            Command::Switch(flags) => resolver.resolve_switch(flags).map(ResolvedRequest::Role),
        }
    }

    /// Resolves, obtains and hands off credentials. With the shell handler this never
    /// returns on success.
    pub async fn run(self, command: Command) -> Result<()> {
        let request = self.resolve(&command)?;
        debug!("resolved request: {:?}", request);

        let session = self.broker.obtain(&request).await?;
        report(&request, &session);

        if !is_valid(&session.record, self.broker.now()) {
            return Err(PortrayError::InvalidSession(
                session.record.account_id.clone(),
            ));
        }

        let (role_label, profile_label) = match &request {
            ResolvedRequest::Root(root) => ("", root.profile.as_str()),
            ResolvedRequest::Role(role) => (
                role.role_name.as_str(),
                role.profile.as_deref().unwrap_or_default(),
            ),
        };
        self.handler.handle_credentials(HandleCredentialsRequest {
            record: &session.record,
            role_label,
            profile_label,
        })
    }
}

fn report(request: &ResolvedRequest, session: &Session) {
    if session.is_cached() {
        println!("Using cached session credentials");
        println!("Session valid for {}", format_ttl(session.remaining));
    } else if let ResolvedRequest::Role(role) = request {
        println!(
            "No session cache found or cache expired. Assumed role {} in account {}",
            role.role_name, role.account_id
        );
    } else {
        println!("Started new session, valid for {}", format_ttl(session.remaining));
    }
}
