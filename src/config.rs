use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PortrayError, Result};

pub const CONFIG_ENV: &str = "PORTRAY_CONFIG";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthProfile {
    pub account_id: Option<String>,
    pub user_name: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleProfile {
    pub role_arn: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub source_profile: Option<String>,
}

/// The read-only `~/.portray-config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortrayConfig {
    pub default_profile: Option<String>,
    pub auth_profiles: BTreeMap<String, AuthProfile>,
    pub profiles: BTreeMap<String, RoleProfile>,
}

impl PortrayConfig {
    pub fn default_path() -> Option<PathBuf> {
        env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".portray-config.json")))
    }

    /// A missing file is an empty config; a file that doesn't parse is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<PortrayConfig> {
        let path = path.as_ref();
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no config file. path:{}", path.display());
                return Ok(PortrayConfig::default());
            }
            Err(source) => {
                return Err(PortrayError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&json).map_err(|source| PortrayError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Flags accepted by `portray auth`.
#[derive(Debug, Clone, Default)]
pub struct AuthFlags {
    pub account_id: Option<String>,
    pub user_name: Option<String>,
    pub token_code: Option<String>,
    pub profile: Option<String>,
    pub no_mfa: bool,
}

/// Flags accepted by `portray switch`.
#[derive(Debug, Clone, Default)]
pub struct SwitchFlags {
    pub account_id: Option<String>,
    pub role_name: Option<String>,
    pub external_id: Option<String>,
    pub profile: Option<String>,
    pub token_code: Option<String>,
    pub no_mfa: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RootRequest {
    pub profile: String,
    pub account_id: Option<String>,
    pub user_name: Option<String>,
    pub region: Option<String>,
    pub token_code: Option<String>,
    pub no_mfa: bool,
}

impl RootRequest {
    /// Whether there is enough to ask the identity provider for a new root session.
    pub fn can_start_session(&self) -> bool {
        self.no_mfa || (self.account_id.is_some() && self.user_name.is_some())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RoleRequest {
    pub profile: Option<String>,
    pub account_id: String,
    pub role_name: String,
    pub external_id: Option<String>,
    pub source: RootRequest,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResolvedRequest {
    Root(RootRequest),
    Role(RoleRequest),
}

fn given(s: &Option<String>) -> Option<String> {
    s.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn reject_conflicts(profile: &Option<String>, explicit: &[(&str, &Option<String>)]) -> Result<()> {
    let Some(profile) = given(profile) else {
        return Ok(());
    };

    let flags = explicit
        .iter()
        .filter(|(_, v)| given(v).is_some())
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    if flags.is_empty() {
        Ok(())
    } else {
        Err(PortrayError::ConfigurationConflict {
            profile,
            flags: flags.join(", "),
        })
    }
}

/// Splits `arn:aws:iam::<account>:role/<name>` into account id and role name.
pub fn parse_role_arn(arn: &str) -> Result<(String, String)> {
    let parts = arn.splitn(6, ':').collect::<Vec<_>>();
    match parts.as_slice() {
        ["arn", _, "iam", _, account_id, resource] if !account_id.is_empty() => resource
            .strip_prefix("role/")
            .filter(|name| !name.is_empty())
            .map(|name| (account_id.to_string(), name.to_string()))
            .ok_or_else(|| PortrayError::InvalidRoleArn(arn.to_string())),
        _ => Err(PortrayError::InvalidRoleArn(arn.to_string())),
    }
}

/// Name of the invoking local account, used as the default external id.
pub fn local_user_name() -> String {
    nix::unistd::User::from_uid(nix::unistd::getuid())
        .ok()
        .flatten()
        .map(|u| u.name)
        .or_else(|| env::var("USER").ok())
        .unwrap_or_else(|| "portray".to_string())
}

pub struct Resolver<'a> {
    config: &'a PortrayConfig,
    env_profile: Option<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a PortrayConfig, env_profile: Option<String>) -> Resolver<'a> {
        Resolver {
            config,
            env_profile: env_profile.filter(|s| !s.is_empty()),
        }
    }

    fn root_profile(&self, preferred: Option<String>) -> String {
        preferred
            .or_else(|| self.env_profile.clone())
            .or_else(|| given(&self.config.default_profile))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    fn root_request(
        &self,
        profile: String,
        account_id: Option<String>,
        user_name: Option<String>,
        token_code: Option<String>,
        no_mfa: bool,
    ) -> RootRequest {
        let stored = self
            .config
            .auth_profiles
            .get(&profile)
            .cloned()
            .unwrap_or_default();

        RootRequest {
            account_id: account_id.or_else(|| given(&stored.account_id)),
            user_name: user_name.or_else(|| given(&stored.user_name)),
            region: given(&stored.region),
            token_code,
            no_mfa,
            profile,
        }
    }

    pub fn resolve_auth(&self, flags: &AuthFlags) -> Result<RootRequest> {
        reject_conflicts(
            &flags.profile,
            &[("--account", &flags.account_id), ("--username", &flags.user_name)],
        )?;

        let profile = self.root_profile(given(&flags.profile));
        debug!("resolved auth profile:{}", profile);
        Ok(self.root_request(
            profile,
            given(&flags.account_id),
            given(&flags.user_name),
            given(&flags.token_code),
            flags.no_mfa,
        ))
    }

    pub fn resolve_switch(&self, flags: &SwitchFlags) -> Result<RoleRequest> {
        reject_conflicts(
            &flags.profile,
            &[
                ("--account", &flags.account_id),
                ("--role", &flags.role_name),
                ("--external-id", &flags.external_id),
            ],
        )?;

        let (profile, account_id, role_name, external_id, source_profile) =
            if let Some(name) = given(&flags.profile) {
                let stored = self
                    .config
                    .profiles
                    .get(&name)
                    .ok_or_else(|| PortrayError::ProfileNotFound(name.clone()))?;
                let (account_id, role_name) = parse_role_arn(&stored.role_arn)?;
                (
                    Some(name),
                    account_id,
                    role_name,
                    given(&stored.external_id),
                    given(&stored.source_profile),
                )
            } else {
                match (given(&flags.account_id), given(&flags.role_name)) {
                    (Some(account_id), Some(role_name)) => (
                        None,
                        account_id,
                        role_name,
                        given(&flags.external_id),
                        None,
                    ),
                    _ => {
                        return Err(PortrayError::IncompleteRequest(
                            "use either a named profile or specify both --account and --role"
                                .to_string(),
                        ))
                    }
                }
            };

        let source = self.root_request(
            self.root_profile(source_profile),
            None,
            None,
            given(&flags.token_code),
            flags.no_mfa,
        );
        debug!(
            "resolved switch. account_id:{}, role_name:{}, source_profile:{}",
            account_id, role_name, source.profile
        );

        Ok(RoleRequest {
            profile,
            account_id,
            role_name,
            external_id,
            source,
        })
    }
}
