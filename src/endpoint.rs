//! URL composition.
//!
//! Every request URL is a base address followed by path segments. Each
//! segment is trimmed of leading and trailing `/` and the pieces are joined
//! with a single `/`, so `compose("https://host/", ["a/", "/b", "c"])` is
//! `https://host/a/b/c`. Segments that are empty once trimmed are dropped.

/// Version prefix of the service API.
pub const API_VERSION_PATH: [&str; 2] = ["api", "v1.0"];

/// Join `segments` onto `base`.
pub fn compose<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.as_ref().trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    url
}

/// A base address that request URLs are built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The versioned API root under `base` (`{base}/api/v1.0`).
    pub fn api(base: &str) -> Self {
        Self::new(base).child(API_VERSION_PATH)
    }

    /// Build a request URL from this endpoint.
    pub fn url<I, S>(&self, segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        compose(&self.base, segments)
    }

    /// A new endpoint rooted below this one.
    pub fn child<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            base: self.url(segments),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}
