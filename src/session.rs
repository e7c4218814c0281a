use chrono::{DateTime, Duration, Utc};
use portray_schema::credentials::CredentialRecord;

/// A record is usable only while it carries a session token and `now` is before its expiration.
pub fn is_valid(record: &CredentialRecord, now: DateTime<Utc>) -> bool {
    !record.session_token.is_empty() && now.timestamp() < record.expiration
}

/// Time left before `record` expires, or `None` once it is no longer valid.
pub fn remaining(record: &CredentialRecord, now: DateTime<Utc>) -> Option<Duration> {
    is_valid(record, now).then(|| Duration::seconds(record.expiration - now.timestamp()))
}

pub fn format_ttl(ttl: Duration) -> String {
    let secs = ttl.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Origin {
    Cached,
    Fresh,
}

/// Credentials handed back by the broker, along with where they came from and how long they
/// remain usable.
#[derive(Debug, Clone)]
pub struct Session {
    pub record: CredentialRecord,
    pub origin: Origin,
    pub remaining: Duration,
}

impl Session {
    fn new(record: CredentialRecord, origin: Origin, now: DateTime<Utc>) -> Session {
        let remaining = remaining(&record, now).unwrap_or_else(Duration::zero);
        Session {
            record,
            origin,
            remaining,
        }
    }

    pub fn cached(record: CredentialRecord, now: DateTime<Utc>) -> Session {
        Session::new(record, Origin::Cached, now)
    }

    pub fn fresh(record: CredentialRecord, now: DateTime<Utc>) -> Session {
        Session::new(record, Origin::Fresh, now)
    }

    pub fn is_cached(&self) -> bool {
        self.origin == Origin::Cached
    }
}
