//! Minimal URI splitting for request targets, redirect locations and the
//! session host.
//!
//! Only what the client needs: an optional scheme, an authority reduced to
//! host and port, the path and the query. Fragments are dropped.

/// A URI split into the parts the client looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
}

impl Uri {
    /// Split `input` into scheme, host, port, path and query.
    ///
    /// `http://Example.com:8080/a/b?x=1#top` yields scheme `http`, host
    /// `Example.com`, port 8080, path `/a/b`, query `x=1`. A bare path such
    /// as `/a?x=1` has no scheme and no host. Host case is preserved.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let without_fragment = input.split('#').next().unwrap_or("");

        let (scheme, rest) = match without_fragment.find("://") {
            Some(idx) if is_scheme(&without_fragment[..idx]) => (
                Some(without_fragment[..idx].to_ascii_lowercase()),
                &without_fragment[idx + 1..],
            ),
            _ => (None, without_fragment),
        };

        let (authority, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(|c: char| c == '/' || c == '?').unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, rest),
        };

        let (path, query) = match rest.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (rest.to_string(), None),
        };

        let (host, port) = match authority {
            Some(auth) => split_authority(auth),
            None => (None, None),
        };

        Self {
            scheme,
            host,
            port,
            path,
            query,
        }
    }

    /// Path plus `?query`, defaulting the path to `/`.
    pub fn request_target(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        match &self.query {
            Some(q) => format!("{path}?{q}"),
            None => path.to_string(),
        }
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Drop userinfo and split `host[:port]`. Bracketed IPv6 literals keep
/// their brackets out of the host.
fn split_authority(authority: &str) -> (Option<String>, Option<u16>) {
    let host_port = match authority.rsplit_once('@') {
        Some((_, hp)) => hp,
        None => authority,
    };
    if host_port.is_empty() {
        return (None, None);
    }

    if let Some(inner) = host_port.strip_prefix('[') {
        return match inner.split_once(']') {
            Some((host, after)) => {
                let port = after.strip_prefix(':').and_then(|p| p.parse().ok());
                (Some(host.to_string()), port)
            }
            None => (Some(inner.to_string()), None),
        };
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
            (Some(host.to_string()), port.parse().ok())
        }
        _ => (Some(host_port.to_string()), None),
    }
}
