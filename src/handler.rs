use std::collections::BTreeMap;

use portray_schema::credentials::CredentialRecord;

use crate::error::Result;

pub mod shell;

pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const SECURITY_TOKEN: &str = "AWS_SECURITY_TOKEN";
pub const PROMPT: &str = "PORTRAY_PROMPT";

pub struct HandleCredentialsRequest<'a> {
    pub record: &'a CredentialRecord,
    pub role_label: &'a str,
    pub profile_label: &'a str,
}

pub trait HandleCredentials {
    fn handle_credentials(&self, request: HandleCredentialsRequest) -> Result<()>;
}

/// `account_id[:role][:profile]`, skipping empty segments. Meant for shell prompts.
pub fn prompt(account_id: &str, role_label: &str, profile_label: &str) -> String {
    [account_id, role_label, profile_label]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

pub fn export(
    record: &CredentialRecord,
    role_label: &str,
    profile_label: &str,
) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (ACCESS_KEY_ID, record.key().to_string()),
        (SECRET_ACCESS_KEY, record.secret().to_string()),
        (SESSION_TOKEN, record.token().to_string()),
        // for older SDKs
        (SECURITY_TOKEN, record.token().to_string()),
        (
            PROMPT,
            prompt(record.account_id(), role_label, profile_label),
        ),
    ])
}

struct Variable<'a> {
    name: &'a str,
    value: Option<String>,
}

fn into_variables<'a>(request: &HandleCredentialsRequest<'a>) -> Vec<Variable<'a>> {
    fn v<S: Into<String>>(name: &str, value: Option<S>) -> Variable {
        Variable {
            name,
            value: value.map(|s| s.into()),
        }
    }

    let mut variables = vec![
        // a named profile would shadow the exported keys
        v("AWS_PROFILE", Option::<String>::None),
        v(
            "AWS_SESSION_EXPIRATION",
            request.record.expires_at().map(|dt| dt.to_rfc3339()),
        ),
    ];
    variables.extend(
        export(request.record, request.role_label, request.profile_label)
            .into_iter()
            .map(|(name, value)| v(name, Some(value))),
    );
    variables
}
