//! REST client for a Morpheus appliance
//!
//! Commands describe requests as [`RequestSpec`] values and hand them to
//! [`ApiClient::execute`]. In dry-run mode the spec comes straight back as
//! [`Reply::DryRun`] so the command can print it instead.

pub mod resources;

use std::fmt;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::session::SessionContext;

const USER_AGENT: &str = concat!("morpheus-cli/", env!("CARGO_PKG_VERSION"));

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
}

/// A request that has not been sent yet
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn bytes(mut self, content_type: &str, data: Vec<u8>) -> Self {
        self.body = Body::Bytes {
            content_type: content_type.to_string(),
            data,
        };
        self
    }

    /// The URL with its query string encoded
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        match Url::parse_with_params(&self.url, &self.query) {
            Ok(url) => url.to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.display_url())
    }
}

/// What came back from [`ApiClient::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    Bytes(Vec<u8>),
    /// Not sent because of `--dry-run`
    DryRun(RequestSpec),
}

impl Reply {
    /// The JSON body, or `Value::Null` for other replies
    pub fn into_json(self) -> Value {
        match self {
            Reply::Json(value) => value,
            _ => Value::Null,
        }
    }
}

/// Outcome of looking a record up by id or name
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Error(Error),
}

impl<T> Lookup<T> {
    /// Turn `NotFound` into `Error::NotFound` for `resource`
    pub fn into_result(self, resource: impl FnOnce() -> String) -> Result<T> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::NotFound => Err(Error::not_found(resource())),
            Lookup::Error(e) => Err(e),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Error(e) => Lookup::Error(e),
        }
    }
}

impl<T> From<Result<T>> for Lookup<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(Error::Api { status: 404, .. }) | Err(Error::NotFound { .. }) => Lookup::NotFound,
            Err(e) => Lookup::Error(e),
        }
    }
}

/// HTTP client bound to one remote appliance
pub struct ApiClient {
    remote: String,
    base_url: String,
    token: Option<Zeroizing<String>>,
    dry_run: bool,
    http: reqwest::Client,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("remote", &self.remote)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        remote: &str,
        base_url: &str,
        token: Option<&str>,
        insecure: bool,
        dry_run: bool,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            remote: remote.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(|t| Zeroizing::new(t.to_string())),
            dry_run,
            http,
        })
    }

    /// Client for `remote` (or the active remote) of `session`
    pub fn from_session(
        session: &SessionContext,
        remote: Option<&str>,
        dry_run: bool,
    ) -> Result<Self> {
        let target = match remote {
            Some(name) => session
                .remotes
                .resolve(name)
                .ok_or_else(|| Error::RemoteNotFound(name.to_string()))?,
            None => session.remotes.active().ok_or(Error::NoActiveRemote)?,
        };

        Self::new(
            &target.name,
            &target.entry.url,
            session.remotes.token(&target.name),
            session.insecure || target.entry.insecure,
            dry_run,
        )
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Start a request for `path` (e.g. `/api/whoami`)
    pub fn request(&self, method: Method, path: &str) -> RequestSpec {
        RequestSpec::new(method, format!("{}{}", self.base_url, path))
    }

    /// Send `spec`, or return it untouched in dry-run mode
    pub async fn execute(&self, spec: RequestSpec) -> Result<Reply> {
        if self.dry_run {
            return Ok(Reply::DryRun(spec));
        }

        debug!("{} {}", spec.method, spec.display_url());

        let mut request = self
            .http
            .request(spec.method.clone(), &spec.url)
            .header(ACCEPT, "application/json");
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.as_str());
        }
        request = match spec.body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Bytes { content_type, data } => {
                request.header(CONTENT_TYPE, content_type).body(data)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status, &bytes));
        }

        trace!("{} returned {} bytes", status, bytes.len());

        if is_json {
            if bytes.is_empty() {
                return Ok(Reply::Json(Value::Null));
            }
            Ok(Reply::Json(serde_json::from_slice(&bytes)?))
        } else {
            Ok(Reply::Bytes(bytes.to_vec()))
        }
    }
}

/// Build an `Error::Api` from a failed response, preferring the
/// appliance's own `msg` or `message` field
fn api_error(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("msg")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    Error::Api {
        status: status.as_u16(),
        message,
    }
}
