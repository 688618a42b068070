//! Fetch descriptors and the validated transfer requests built from them.

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::domain::errors::FetchError;

/// Describes where an item's payload lives.
///
/// Supplied by the metadata layer; may be malformed, which is only detected
/// when the request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDescriptor {
    /// Source URL.
    pub url: String,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl FetchDescriptor {
    /// Creates a descriptor for the given URL with no extra headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builds a transfer request.
    ///
    /// With `force_https`, plain `http` URLs are upgraded to `https`.
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidRequest`] if the URL does not parse, is not
    /// http(s), has no host, or a header is not valid.
    pub fn to_request(&self, force_https: bool) -> Result<TransferRequest, FetchError> {
        let mut url = Url::parse(self.url.trim())
            .map_err(|e| FetchError::invalid_request(format!("bad url {:?}: {e}", self.url)))?;

        match url.scheme() {
            "https" => {}
            "http" if force_https => {
                url.set_scheme("https").map_err(|()| {
                    FetchError::invalid_request(format!("cannot upgrade {:?} to https", self.url))
                })?;
            }
            "http" => {}
            other => {
                return Err(FetchError::invalid_request(format!(
                    "unsupported scheme {other:?}"
                )));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(FetchError::invalid_request(format!(
                "url {:?} has no host",
                self.url
            )));
        }

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::invalid_request(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::invalid_request(format!("header value for {name}: {e}")))?;
            headers.append(name, value);
        }

        Ok(TransferRequest { url, headers })
    }
}

impl From<&str> for FetchDescriptor {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FetchDescriptor {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// A validated request ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Absolute http(s) URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
}
