//! Capabilities a feed operation is assembled from

use crate::error::Result;
use crate::http::RequestSpec;
use url::Url;

/// Maps a cursor to the address of one page
///
/// Implemented for closures, so most endpoints need nothing more than
/// `|cursor| ...`.
pub trait AddressBuilder: Send + Sync {
    fn page_url(&self, cursor: Option<&str>) -> Result<Url>;
}

impl<F> AddressBuilder for F
where
    F: Fn(Option<&str>) -> Result<Url> + Send + Sync,
{
    fn page_url(&self, cursor: Option<&str>) -> Result<Url> {
        self(cursor)
    }
}

/// Attaches device/session identity to an outgoing request
///
/// Implementations for mutating calls may also replace the body with a
/// signed one. Called once per attempt, on a freshly built request.
pub trait RequestIdentity: Send + Sync {
    fn apply(&self, request: RequestSpec) -> RequestSpec;
}

/// Sends requests untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl RequestIdentity for NoIdentity {
    fn apply(&self, request: RequestSpec) -> RequestSpec {
        request
    }
}

/// Fixed set of device and session headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceHeaders {
    headers: Vec<(String, String)>,
}

impl DeviceHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; later values for the same name replace earlier ones
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&key));
        self.headers.push((key, value.into()));
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl RequestIdentity for DeviceHeaders {
    fn apply(&self, mut request: RequestSpec) -> RequestSpec {
        for (key, value) in &self.headers {
            request.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
            request.headers.push((key.clone(), value.clone()));
        }
        request
    }
}
