//! HTTP(S) URL parsing and redirect resolution (simplified RFC 3986).

use std::fmt;

use hatch_types::error::{HatchError, Result};

/// A parsed absolute `http` or `https` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Lower-cased scheme, `"http"` or `"https"`.
    pub scheme: String,
    pub host: String,
    /// Explicit port, if the URL carried one.
    pub port: Option<u16>,
    /// Path component starting with `/`.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
}

impl Url {
    /// Parse an absolute URL. Fragments are discarded.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| HatchError::Network(format!("not an absolute URL: {url}")))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(HatchError::Network(format!("unsupported scheme: {scheme}")));
        }

        let rest = rest.split('#').next().unwrap_or("");
        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, Some(q.to_string())),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        // Drop userinfo; credentials are not sent.
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        let (host, port) = match authority.rfind(':') {
            Some(i) if !authority.ends_with(']') => {
                let port = authority[i + 1..]
                    .parse::<u16>()
                    .map_err(|_| HatchError::Network(format!("bad port in URL: {url}")))?;
                (&authority[..i], Some(port))
            },
            _ => (authority, None),
        };
        if host.is_empty() {
            return Err(HatchError::Network(format!("missing host in URL: {url}")));
        }

        Ok(Url {
            scheme,
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            path: path.to_string(),
            query,
        })
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Port to connect to, falling back to the scheme default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(self.default_port())
    }

    /// Value for the `Host` request header.
    pub fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(p) if p != self.default_port() => format!("{host}:{p}"),
            _ => host,
        }
    }

    /// Path plus query, as sent on the request line.
    pub fn request_target(&self) -> String {
        match self.query {
            Some(ref q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Last non-empty path segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path.rsplit('/').find(|s| !s.is_empty())
    }

    /// Resolve a `Location` header value against this URL.
    pub fn resolve(&self, location: &str) -> Result<Url> {
        let location = location.trim();
        if location.contains("://") {
            return Url::parse(location);
        }
        if location.starts_with("//") {
            return Url::parse(&format!("{}:{location}", self.scheme));
        }

        let location = location.split('#').next().unwrap_or("");
        let (path, query) = match location.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (location, None),
        };
        let path = if path.starts_with('/') {
            normalize_path(path)
        } else if path.is_empty() {
            self.path.clone()
        } else {
            let dir = match self.path.rfind('/') {
                Some(i) => &self.path[..=i],
                None => "/",
            };
            normalize_path(&format!("{dir}{path}"))
        };

        Ok(Url {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path,
            query,
        })
    }

    fn default_port(&self) -> u16 {
        if self.is_https() { 443 } else { 80 }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(ref q) = self.query {
            write!(f, "?{q}")?;
        }
        Ok(())
    }
}

/// Collapse `.` and `..` segments of an absolute path.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }
    let mut out = format!("/{}", segments.join("/"));
    if path.ends_with('/') && out.len() > 1 {
        out.push('/');
    }
    out
}
