//! Per-session cookie jar keyed by path.
//!
//! # Design
//! Captured cookies are merged one by one: a `Set-Cookie` for a name that is
//! already stored under the same path replaces the value, and every other
//! stored cookie survives. Paths are compared literally; the only path that
//! applies to every request is `/`.

use std::collections::BTreeMap;

/// The path cookies are filed under when `Set-Cookie` names none.
pub const ROOT_PATH: &str = "/";

/// Cookies grouped by the path they apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    paths: BTreeMap<String, BTreeMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one cookie at `path`, replacing any cookie of the same name there.
    pub fn set(&mut self, name: &str, value: &str, path: &str) {
        self.paths
            .entry(path.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    /// Store several cookies at the same `path`.
    pub fn set_many<'a, I>(&mut self, cookies: I, path: &str)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in cookies {
            self.set(name, value, path);
        }
    }

    /// Every cookie stored for exactly `path`.
    pub fn get(&self, path: &str) -> BTreeMap<String, String> {
        self.paths.get(path).cloned().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.paths.values().all(BTreeMap::is_empty)
    }

    /// Parse `Set-Cookie` values and merge them into the jar.
    ///
    /// Each value must start with `name=value`; an optional `path=`
    /// attribute (any case) selects the path, defaulting to `/`. Values that
    /// do not match are ignored. Returns the number of cookies stored.
    pub fn capture<S: AsRef<str>>(&mut self, set_cookies: &[S]) -> usize {
        let mut stored = 0;
        for raw in set_cookies {
            if let Some((name, value, path)) = parse_set_cookie(raw.as_ref()) {
                log::trace!("cookie {name} captured for {path}");
                self.set(&name, &value, &path);
                stored += 1;
            }
        }
        stored
    }

    /// Value of the `Cookie` request header for `path`, or `None` when no
    /// cookie applies.
    ///
    /// Root cookies come first, then cookies filed under the literal request
    /// path. Each is rendered as `name=value; `, trailing separator included.
    pub fn header_for(&self, path: &str) -> Option<String> {
        let mut header = String::new();
        let mut render = |cookies: &BTreeMap<String, String>| {
            for (name, value) in cookies {
                header.push_str(name);
                header.push('=');
                header.push_str(value);
                header.push_str("; ");
            }
        };

        if let Some(root) = self.paths.get(ROOT_PATH) {
            render(root);
        }
        if path != ROOT_PATH {
            if let Some(specific) = self.paths.get(path) {
                render(specific);
            }
        }

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }
}

/// Split a `Set-Cookie` value into (name, value, path).
fn parse_set_cookie(raw: &str) -> Option<(String, String, String)> {
    let mut parts = raw.split(';');
    let pair = parts.next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }

    let path = parts
        .filter_map(|attr| attr.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("path"))
        .map(|(_, p)| p.trim().to_ascii_lowercase())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ROOT_PATH.to_string());

    Some((name.to_string(), value.to_string(), path))
}
