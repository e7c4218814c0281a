use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use portray_schema::credentials::CredentialRecord;
use tracing::debug;

use crate::error::{PortrayError, Result};

/// Identifies one cached session file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionKey {
    Root { profile: String },
    Role { account_id: String, role_name: String },
}

impl SessionKey {
    pub fn root<S: Into<String>>(profile: S) -> SessionKey {
        SessionKey::Root {
            profile: profile.into(),
        }
    }

    pub fn role<A: Into<String>, R: Into<String>>(account_id: A, role_name: R) -> SessionKey {
        SessionKey::Role {
            account_id: account_id.into(),
            role_name: role_name.into(),
        }
    }

    /// Role paths and separators in profile names are flattened so every key stays a single
    /// entry of the cache directory.
    pub fn file_name(&self) -> String {
        match self {
            SessionKey::Root { profile } => {
                format!("portray-session-{}.json", file_safe(profile))
            }
            SessionKey::Role {
                account_id,
                role_name,
            } => format!(
                "portray-role-session-{}_{}.json",
                file_safe(account_id),
                file_safe(role_name)
            ),
        }
    }
}

fn file_safe(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '-',
            _ => c,
        })
        .collect()
}

pub trait CredentialStore {
    /// Returns `None` when there is no readable record for `key`.
    fn load(&self, key: &SessionKey) -> Option<CredentialRecord>;

    fn save(&self, key: &SessionKey, record: &CredentialRecord) -> Result<()>;
}

/// Keeps one JSON file per session key under a directory, `~/.aws` by default.
///
/// Writers don't lock; concurrent invocations race and the last write wins.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> FileCredentialStore {
        FileCredentialStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn in_home() -> Option<FileCredentialStore> {
        dirs::home_dir().map(|home| FileCredentialStore::new(home.join(".aws")))
    }

    pub fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn write(&self, path: &Path, record: &CredentialRecord) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec(record)?;
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path)?;
        // mode() only applies on creation
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(&json)?;
        file.sync_all()
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, key: &SessionKey) -> Option<CredentialRecord> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("no session cache. path:{}, error:{}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("corrupt session cache. path:{}, error:{}", path.display(), e);
                None
            }
        }
    }

    fn save(&self, key: &SessionKey, record: &CredentialRecord) -> Result<()> {
        let path = self.path_for(key);
        debug!("writing session cache. path:{}", path.display());
        self.write(&path, record)
            .map_err(|source| PortrayError::CacheWrite { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CredentialRecord {
        CredentialRecord {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiration: 1_700_000_000,
            account_id: "123456789012".to_string(),
            role_name: Some("Admin".to_string()),
        }
    }

    #[test]
    fn file_names_follow_key_kind() {
        assert_eq!(
            SessionKey::root("default").file_name(),
            "portray-session-default.json"
        );
        assert_eq!(
            SessionKey::role("123456789012", "Admin").file_name(),
            "portray-role-session-123456789012_Admin.json"
        );
    }

    #[test]
    fn separators_never_leave_the_cache_dir() {
        assert_eq!(
            SessionKey::role("222222222222", "ops/Admin").file_name(),
            "portray-role-session-222222222222_ops-Admin.json"
        );
        assert_eq!(
            SessionKey::root("../../escape").file_name(),
            "portray-session-..-..-escape.json"
        );

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let key = SessionKey::role("222222222222", "ops/Admin");
        store.save(&key, &record()).unwrap();
        assert_eq!(store.load(&key), Some(record()));
        assert_eq!(store.path_for(&key).parent(), Some(dir.path()));
    }

    #[test]
    fn save_then_load_returns_same_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join(".aws"));
        let key = SessionKey::role("123456789012", "Admin");

        store.save(&key, &record()).unwrap();
        assert_eq!(store.load(&key), Some(record()));
    }

    #[test]
    fn missing_or_corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let key = SessionKey::root("default");
        assert_eq!(store.load(&key), None);

        fs::write(store.path_for(&key), b"{not json").unwrap();
        assert_eq!(store.load(&key), None);
    }

    #[test]
    fn save_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let key = SessionKey::root("default");

        store.save(&key, &record()).unwrap();
        let newer = CredentialRecord {
            session_token: "newer".to_string(),
            role_name: None,
            ..record()
        };
        store.save(&key, &newer).unwrap();
        assert_eq!(store.load(&key), Some(newer));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        let key = SessionKey::root("default");

        fs::write(store.path_for(&key), b"").unwrap();
        fs::set_permissions(store.path_for(&key), fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&key, &record()).unwrap();

        let mode = fs::metadata(store.path_for(&key)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let store = FileCredentialStore::new(blocker.join("nested"));

        let err = store
            .save(&SessionKey::root("default"), &record())
            .unwrap_err();
        assert!(matches!(err, PortrayError::CacheWrite { .. }));
    }
}
