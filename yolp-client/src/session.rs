//! Session cookie jar for the directory API, optionally persisted between runs.
//!
//! The gateway only ever talks to one origin, so cookies are keyed by name
//! alone. Every change is written back to the session file when one is set,
//! which lets a sign-in from one `yolp` invocation carry over to the next.

use chrono::{DateTime, TimeDelta, Utc};
use cookie::Cookie;
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    /// `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    cookies: BTreeMap<String, StoredCookie>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to access session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid session file: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Cookie jar handed to `reqwest` as its cookie provider.
#[derive(Debug, Default)]
pub struct SessionJar {
    path: Option<PathBuf>,
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl SessionJar {
    /// A jar that lives as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the jar saved at `path`; a missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let persisted = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str::<PersistedSession>(&contents)?
        } else {
            PersistedSession::default()
        };
        tracing::debug!(path = %path.display(), cookies = persisted.cookies.len(), "Session loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            cookies: Mutex::new(persisted.cookies),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the unexpired cookies to the session file, if there is one.
    pub fn save(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let now = Utc::now();
        let cookies = self
            .lock()
            .iter()
            .filter(|(_, cookie)| !cookie.is_expired(now))
            .map(|(name, cookie)| (name.clone(), cookie.clone()))
            .collect();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&PersistedSession { cookies })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply one `Set-Cookie` header. Returns false when it does not parse.
    ///
    /// A cookie that is already expired (`Max-Age=0`, past `Expires`) is
    /// removed, which is how the server ends a session.
    pub fn store(&self, set_cookie: &str) -> bool {
        let cookie = match Cookie::parse(set_cookie.to_string()) {
            Ok(cookie) => cookie,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed Set-Cookie header");
                return false;
            }
        };

        let now = Utc::now();
        let expires_at = match (cookie.max_age(), cookie.expires_datetime()) {
            (Some(max_age), _) => TimeDelta::try_seconds(max_age.whole_seconds())
                .and_then(|delta| now.checked_add_signed(delta)),
            (None, Some(at)) => DateTime::from_timestamp(at.unix_timestamp(), 0),
            (None, None) => None,
        };
        let stored = StoredCookie {
            value: cookie.value().to_string(),
            expires_at,
        };

        let mut cookies = self.lock();
        if stored.is_expired(now) {
            cookies.remove(cookie.name());
        } else {
            cookies.insert(cookie.name().to_string(), stored);
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        self.lock()
            .get(name)
            .filter(|cookie| !cookie.is_expired(now))
            .map(|cookie| cookie.value.clone())
    }

    /// The `Cookie` request header value, or `None` when the jar is empty.
    pub fn header(&self) -> Option<String> {
        let now = Utc::now();
        let mut cookies = self.lock();
        cookies.retain(|_, cookie| !cookie.is_expired(now));
        if cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = cookies
            .iter()
            .map(|(name, cookie)| format!("{name}={}", cookie.value))
            .collect();
        Some(pairs.join("; "))
    }

    pub fn is_empty(&self) -> bool {
        self.header().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl reqwest::cookie::CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut changed = false;
        for header in cookie_headers {
            match header.to_str() {
                Ok(raw) => changed |= self.store(raw),
                Err(_) => tracing::debug!(url = %url, "Ignoring non-ASCII Set-Cookie header"),
            }
        }
        if changed {
            if let Err(e) = self.save() {
                tracing::warn!(error = %e, "Failed to persist session");
            }
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        self.header()
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn api_url() -> Url {
        "http://localhost:3000/auth/sign-in".parse().unwrap()
    }

    #[test]
    fn test_session_cookie_is_sent_back() {
        let jar = SessionJar::in_memory();
        assert!(jar.is_empty());
        assert!(jar.store("sid=abc123; Path=/; HttpOnly"));
        assert!(jar.store("theme=dark"));

        assert_eq!(jar.get("sid").as_deref(), Some("abc123"));
        assert_eq!(jar.header().as_deref(), Some("sid=abc123; theme=dark"));
    }

    #[test]
    fn test_expired_cookie_clears_session() {
        let jar = SessionJar::in_memory();
        jar.store("sid=abc123; Max-Age=3600");
        assert!(jar.get("sid").is_some());

        jar.store("sid=; Max-Age=0");
        assert!(jar.get("sid").is_none());

        jar.store("sid=abc123");
        jar.store("sid=; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        assert!(jar.is_empty());
    }

    #[test]
    fn test_malformed_header_is_ignored() {
        let jar = SessionJar::in_memory();
        assert!(!jar.store("no-equals-sign"));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let jar = SessionJar::load(&dir.path().join("session.json")).unwrap();
        assert!(jar.is_empty());
    }

    #[test]
    fn test_session_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yolp").join("session.json");

        let jar = SessionJar::load(&path).unwrap();
        let headers = [HeaderValue::from_static("sid=abc123; Path=/; HttpOnly")];
        jar.set_cookies(&mut headers.iter(), &api_url());
        assert!(path.exists());

        let reloaded = SessionJar::load(&path).unwrap();
        assert_eq!(
            reloaded.cookies(&api_url()),
            Some(HeaderValue::from_static("sid=abc123"))
        );

        let cleared = [HeaderValue::from_static("sid=; Max-Age=0")];
        reloaded.set_cookies(&mut cleared.iter(), &api_url());
        assert!(SessionJar::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(SessionJar::load(&path), Err(SessionError::Serde(_))));
    }

    #[test]
    fn test_in_memory_jar_does_not_write() {
        let jar = SessionJar::in_memory();
        jar.store("sid=abc123");
        assert!(jar.save().is_ok());
        assert!(jar.path().is_none());
    }
}
