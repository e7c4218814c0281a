use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the identity provider. None of them are retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("MFA authentication was rejected: {0}")]
    AuthRejected(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PortrayError {
    #[error("can't combine the named profile \"{profile}\" with {flags}")]
    ConfigurationConflict { profile: String, flags: String },

    #[error("{0}")]
    IncompleteRequest(String),

    #[error("unable to find profile \"{0}\" in config. Is it set in the profiles section?")]
    ProfileNotFound(String),

    #[error("invalid role ARN: {0}")]
    InvalidRoleArn(String),

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("You need a valid session! No usable session for profile \"{0}\" and not enough details to start one")]
    MissingSourceSession(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to write session cache {}: {source}", path.display())]
    CacheWrite { path: PathBuf, source: io::Error },

    #[error("failed to read MFA token: {0}")]
    TokenPrompt(#[source] io::Error),

    #[error("refusing to export an empty or expired session for account {0}")]
    InvalidSession(String),

    #[error("SHELL is not set: {0}")]
    ShellUnset(#[source] std::env::VarError),

    #[error("failed to start shell {shell}: {source}")]
    ShellLaunch { shell: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, PortrayError>;
