//! Request description and raw response
//!
//! A [`RequestSpec`] is an attempt-independent description of a call. The
//! transport turns it into a fresh `reqwest::Request` on every attempt, so a
//! retried call never reuses a consumed request.

use crate::error::{Error, Result};
use crate::types::{JsonValue, Method};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

// ============================================================================
// RequestSpec
// ============================================================================

/// Body of a request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` fields, e.g. a signed payload
    Form(Vec<(String, String)>),
    /// JSON document
    Json(JsonValue),
    /// Pre-encoded bytes with a content type
    Raw { content_type: String, bytes: Bytes },
}

/// Immutable description of one request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Overrides the executor timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    /// Create a request with no headers or body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set a form body
    #[must_use]
    pub fn form<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Set a JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn raw(mut self, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Raw {
            content_type: content_type.into(),
            bytes: bytes.into(),
        });
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up the first header with this name (case-insensitive)
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Materialize a fresh transport request
    pub fn to_request(
        &self,
        client: &reqwest::Client,
        default_timeout: Duration,
    ) -> Result<reqwest::Request> {
        let mut req = client.request(self.method.into(), self.url.clone());

        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::invalid_request(format!("header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::invalid_request(format!("header '{key}': {e}")))?;
            req = req.header(name, value);
        }

        req = match &self.body {
            Some(RequestBody::Form(fields)) => req.form(fields),
            Some(RequestBody::Json(body)) => req.json(body),
            Some(RequestBody::Raw {
                content_type,
                bytes,
            }) => req
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
            None => req,
        };

        req.timeout(self.timeout.unwrap_or(default_timeout))
            .build()
            .map_err(|e| Error::invalid_request(e.to_string()))
    }
}

// ============================================================================
// RawResponse
// ============================================================================

/// Response body, either already read or still on the wire
#[derive(Debug)]
pub enum ResponseBody {
    Buffered(Bytes),
    Deferred(reqwest::Response),
}

/// A received response, not yet interpreted
#[derive(Debug)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Option<Url>,
    body: ResponseBody,
}

impl RawResponse {
    /// Build a response with an in-memory body
    pub fn buffered(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            url: None,
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// Read the whole body of a reqwest response
    pub async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = Some(response.url().clone());
        let bytes = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            url,
            body: ResponseBody::Buffered(bytes),
        })
    }

    /// Wrap a reqwest response without reading its body
    pub fn deferred(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            url: Some(response.url().clone()),
            body: ResponseBody::Deferred(response),
        }
    }

    /// Attach headers
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Whether the body has already been read
    pub fn is_buffered(&self) -> bool {
        matches!(self.body, ResponseBody::Buffered(_))
    }

    /// Consume the body as bytes
    pub async fn bytes(self) -> Result<Bytes> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Deferred(response) => Ok(response.bytes().await?),
        }
    }

    /// Consume the body as UTF-8 text (lossy)
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
