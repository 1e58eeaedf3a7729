use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{apply_partial, capture, SearchParams, StateSync, SyncRecord};
use crate::{error::GridResult, time::in_some_time, utils::safe_parse_json};

/// Lifetime given to the managed cookie on every write.
pub const COOKIE_MAX_AGE: &str = "30d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub value: String,
    pub expires: DateTime<Utc>,
}

/// Named cookies with expiry, persisted as JSON between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

pub type SharedCookieJar = Arc<RwLock<CookieJar>>;

pub fn shared_cookie_jar(jar: CookieJar) -> SharedCookieJar {
    Arc::new(RwLock::new(jar))
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a cookie that has not expired yet.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_at(name, Utc::now())
    }

    pub fn get_at(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|c| c.expires > now)
            .map(|c| c.value.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    pub fn set(&mut self, name: &str, value: String, expires: DateTime<Utc>) {
        self.cookies.insert(name.to_string(), Cookie { value, expires });
    }

    pub fn remove(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Drops expired cookies.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.cookies.retain(|_, c| c.expires > now);
    }

    /// Parses a jar; malformed JSON yields an empty jar.
    pub fn from_json(json: &str) -> Self {
        safe_parse_json(Some(json)).unwrap_or_else(|| {
            log::warn!("sync.cookie_jar_malformed bytes={}", json.len());
            Self::default()
        })
    }

    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a jar file; a missing or unreadable file yields an empty jar.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("sync.cookie_jar_unreadable path={} err={}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> GridResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn decode_cookie(name: &str, raw: Option<&str>) -> SearchParams {
    let Some(raw) = raw else {
        return SearchParams::default();
    };
    match urlencoding::decode(raw) {
        Ok(decoded) => SearchParams::parse(&decoded),
        Err(e) => {
            log::warn!("sync.cookie_malformed name={} err={}", name, e);
            SearchParams::default()
        }
    }
}

/// Mirrors the managed keys into one cookie holding a URL-encoded query string.
pub struct CookieSync {
    name: String,
    keys: Vec<String>,
    jar: SharedCookieJar,
    stored_on_load: SyncRecord,
}

impl CookieSync {
    /// `None` when no cookie name is configured, which callers must treat as
    /// "no cookie adapter" rather than "empty cookie".
    pub fn new(cookie_key: Option<&str>, keys: &[String], jar: SharedCookieJar) -> Option<Self> {
        let name = cookie_key.filter(|k| !k.is_empty())?.to_string();
        let stored_on_load = {
            let current = decode_cookie(&name, jar.read().get(&name));
            capture(&current, keys)
        };
        Some(Self {
            name,
            keys: keys.to_vec(),
            jar,
            stored_on_load,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    pub fn jar(&self) -> &SharedCookieJar {
        &self.jar
    }
}

impl StateSync for CookieSync {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn stored_on_load(&self) -> &SyncRecord {
        &self.stored_on_load
    }

    fn update(&mut self, record: &SyncRecord) {
        let expires = match in_some_time(COOKIE_MAX_AGE) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("sync.cookie_expiry_failed name={} err={}", self.name, e);
                return;
            }
        };
        let mut jar = self.jar.write();
        let mut params = decode_cookie(&self.name, jar.get(&self.name));
        apply_partial(&mut params, &self.keys, record);
        let encoded = urlencoding::encode(&params.to_string()).into_owned();
        jar.set(&self.name, encoded, expires);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    fn jar_with(name: &str, raw: &str) -> SharedCookieJar {
        let mut jar = CookieJar::new();
        jar.set(name, raw.to_string(), Utc::now() + TimeDelta::days(1));
        shared_cookie_jar(jar)
    }

    #[test]
    fn not_configured_without_a_name() {
        let jar = shared_cookie_jar(CookieJar::new());
        assert!(CookieSync::new(None, &keys(&["a"]), jar.clone()).is_none());
        assert!(CookieSync::new(Some(""), &keys(&["a"]), jar).is_none());
    }

    #[test]
    fn configured_but_empty_cookie_reads_absent_values() {
        let jar = shared_cookie_jar(CookieJar::new());
        let sync = CookieSync::new(Some("prefs"), &keys(&["a", "b"]), jar).unwrap();
        assert_eq!(sync.stored_on_load().len(), 2);
        assert!(sync.stored_on_load().values().all(Option::is_none));
    }

    #[test]
    fn reads_url_encoded_query_string() {
        let jar = jar_with("prefs", "a%3D1%26b%3Dx%252Cy");
        let sync = CookieSync::new(Some("prefs"), &keys(&["a", "b"]), jar).unwrap();
        assert_eq!(sync.stored_on_load()["a"].as_deref(), Some("1"));
        assert_eq!(sync.stored_on_load()["b"].as_deref(), Some("x,y"));
    }

    #[test]
    fn partial_update_removes_only_managed_key() {
        let jar = jar_with("prefs", &urlencoding::encode("a=1&b=2"));
        let mut sync = CookieSync::new(Some("prefs"), &keys(&["a"]), jar.clone()).unwrap();
        sync.update(&SyncRecord::from([("a".to_string(), None)]));

        let raw = jar.read().get("prefs").map(str::to_string).unwrap();
        assert_eq!(urlencoding::decode(&raw).unwrap(), "b=2");
    }

    #[test]
    fn every_write_refreshes_expiry() {
        let mut jar = CookieJar::new();
        jar.set("prefs", String::new(), Utc::now() + TimeDelta::minutes(1));
        let jar = shared_cookie_jar(jar);
        let mut sync = CookieSync::new(Some("prefs"), &keys(&["a"]), jar.clone()).unwrap();
        sync.update(&SyncRecord::new());

        let expires = jar.read().cookie("prefs").unwrap().expires;
        let remaining = expires - Utc::now();
        assert!(remaining > TimeDelta::days(29));
        assert!(remaining <= TimeDelta::days(30));
    }

    #[test]
    fn malformed_cookie_reads_as_absent() {
        let jar = jar_with("prefs", "%FF%FE");
        let sync = CookieSync::new(Some("prefs"), &keys(&["a"]), jar).unwrap();
        assert_eq!(sync.stored_on_load()["a"], None);
    }

    #[test]
    fn expired_cookie_reads_as_absent() {
        let mut jar = CookieJar::new();
        jar.set("prefs", "a%3D1".to_string(), Utc::now() - TimeDelta::seconds(1));
        assert_eq!(jar.get("prefs"), None);
        let sync = CookieSync::new(Some("prefs"), &keys(&["a"]), shared_cookie_jar(jar)).unwrap();
        assert_eq!(sync.stored_on_load()["a"], None);
    }

    #[test]
    fn jar_file_round_trip_and_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");

        assert!(CookieJar::load(&path).is_empty());

        let mut jar = CookieJar::new();
        jar.set("prefs", "a%3D1".to_string(), Utc::now() + TimeDelta::days(3));
        jar.save(&path).unwrap();
        assert_eq!(CookieJar::load(&path), jar);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(CookieJar::load(&path).is_empty());
    }
}
