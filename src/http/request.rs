//! Request adapter.
//!
//! # Responsibilities
//! - Wrap a [`ConnectionRequest`] without mutating it
//! - Derive host, URL, path, query, cookies and accept lists once per request
//! - Gate `body`, `form`, `params` and `session_user` behind explicit preparation calls
//! - Own the request-scoped disposables
//!
//! # Design Decisions
//! - Derived values are memoized on first access
//! - Cookie parsing is lenient: a malformed header reads as no cookies
//! - Gated members never fall back to an empty value

use std::collections::HashMap;
use std::net::IpAddr;

use axum::http::{header, HeaderMap, Method};
use bytes::Bytes;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use url::Url;

use crate::http::cache::Memo;
use crate::http::connection::ConnectionRequest;
use crate::http::cookie;
use crate::http::error::HttpError;
use crate::http::session::{SessionResolver, SessionUser};
use crate::lifecycle::dispose::{Disposable, Disposables};

/// Merged parameter bag handed to handlers.
pub type Params = Map<String, Value>;

static FALLBACK_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://localhost/").expect("static base URL is valid"));

/// A file part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was posted under.
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Decoded form: text fields plus any uploaded files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl FormData {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// First file posted under `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.field == field)
    }
}

/// A member that stays unavailable until its preparation call runs.
#[derive(Debug, Clone)]
struct Gated<T>(Option<T>);

impl<T> Gated<T> {
    fn pending() -> Self {
        Self(None)
    }

    fn get(&self, member: &'static str, requires: &'static str) -> Result<&T, HttpError> {
        self.0
            .as_ref()
            .ok_or_else(|| HttpError::precondition(member, requires))
    }

    fn set(&mut self, value: T) -> &T {
        self.0.insert(value)
    }

    fn is_ready(&self) -> bool {
        self.0.is_some()
    }
}

/// Higher-level view over one inbound request.
#[derive(Debug)]
pub struct RequestAdapter<'c> {
    conn: &'c ConnectionRequest,
    host: Memo<Option<String>>,
    url: Memo<Url>,
    cookies: Memo<HashMap<String, String>>,
    query: Memo<HashMap<String, String>>,
    accepts: Memo<Vec<String>>,
    body: Gated<Value>,
    form: Gated<FormData>,
    params: Gated<Params>,
    session_user: Gated<Option<SessionUser>>,
    disposables: Disposables,
}

impl<'c> RequestAdapter<'c> {
    pub fn new(conn: &'c ConnectionRequest) -> Self {
        Self {
            conn,
            host: Memo::new(),
            url: Memo::new(),
            cookies: Memo::new(),
            query: Memo::new(),
            accepts: Memo::new(),
            body: Gated::pending(),
            form: Gated::pending(),
            params: Gated::pending(),
            session_user: Gated::pending(),
            disposables: Disposables::new(),
        }
    }

    /// The wrapped connection object.
    pub fn connection(&self) -> &'c ConnectionRequest {
        self.conn
    }

    pub fn method(&self) -> &Method {
        self.conn.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.conn.headers()
    }

    /// First value of a header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.conn.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Authority of the request: HTTP/2 authority, else the `host` header.
    pub fn host(&self) -> Option<&str> {
        self.host
            .value(|| {
                self.conn
                    .authority()
                    .or_else(|| self.header("host"))
                    .map(str::to_string)
            })
            .as_deref()
    }

    /// Absolute URL built from the raw target on an `https://<host>` base.
    pub fn url(&self) -> &Url {
        self.url.value(|| {
            let base = self
                .host()
                .and_then(|host| Url::parse(&format!("https://{host}/")).ok())
                .unwrap_or_else(|| FALLBACK_BASE.clone());
            base.join(self.conn.target()).unwrap_or(base)
        })
    }

    pub fn path(&self) -> &str {
        self.url().path()
    }

    /// Query parameters; the last value wins for repeated keys.
    pub fn query(&self) -> &HashMap<String, String> {
        self.query.value(|| {
            self.url()
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
    }

    /// Request cookies; empty when the header is missing or malformed.
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies.value(|| {
            let header = self
                .conn
                .headers()
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join("; ");
            if header.is_empty() {
                return HashMap::new();
            }
            cookie::parse(&header).unwrap_or_else(|| {
                tracing::debug!("Ignoring malformed cookie header");
                HashMap::new()
            })
        })
    }

    /// Raw `accept` entries, split on `;` without weighing `q` values.
    pub fn accepts(&self) -> &[String] {
        self.accepts.value(|| {
            self.header("accept")
                .unwrap_or_default()
                .split(';')
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect()
        })
    }

    /// Whether any of `types` appears in any accepted entry.
    pub fn accepts_any(&self, types: &[&str]) -> bool {
        let accepts = self.accepts();
        types
            .iter()
            .any(|ty| accepts.iter().any(|entry| entry.contains(ty)))
    }

    /// Whether the client lists a JSON media type.
    pub fn accepts_json(&self) -> bool {
        self.accepts()
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(|ty| ty.trim().to_ascii_lowercase())
            .any(|ty| ty.ends_with("/json") || ty.ends_with("+json"))
    }

    pub fn remote_ip_address(&self) -> Option<IpAddr> {
        self.conn.remote_addr().map(|addr| addr.ip())
    }

    /// The undecoded request body.
    pub fn raw_body(&self) -> &Bytes {
        self.conn.body()
    }

    /// Register a resource to release when the request ends.
    pub fn register_disposable(&self, item: Box<dyn Disposable>) {
        self.disposables.push(item);
    }

    pub fn body(&self) -> Result<&Value, HttpError> {
        self.body.get("body", "ensure_body")
    }

    pub fn form(&self) -> Result<&FormData, HttpError> {
        self.form.get("form", "ensure_form")
    }

    pub fn params(&self) -> Result<&Params, HttpError> {
        self.params.get("params", "ensure_params")
    }

    pub fn session_user(&self) -> Result<Option<&SessionUser>, HttpError> {
        self.session_user
            .get("session_user", "authorize")
            .map(Option::as_ref)
    }

    /// Decode the body by content type: JSON, url-encoded fields as an
    /// object, `null` for empty or other bodies.
    pub fn ensure_body(&mut self) -> Result<&Value, HttpError> {
        if !self.body.is_ready() {
            let value = decode_body(self.content_type().as_deref(), self.conn.body())?;
            self.body.set(value);
        }
        self.body()
    }

    /// Decode url-encoded or `multipart/form-data` fields and files.
    pub async fn ensure_form(&mut self) -> Result<&FormData, HttpError> {
        if !self.form.is_ready() {
            let form = match self.header("content-type") {
                Some(ct) if is_multipart(ct) => {
                    decode_multipart(ct, self.conn.body().clone()).await?
                }
                _ => FormData {
                    fields: url::form_urlencoded::parse(self.conn.body())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect(),
                    files: Vec::new(),
                },
            };
            self.form.set(form);
        }
        self.form()
    }

    /// Whether the body is a url-encoded or multipart form.
    pub fn has_form_body(&self) -> bool {
        match self.content_type().as_deref() {
            Some("application/x-www-form-urlencoded") => true,
            Some(ct) => is_multipart(ct),
            None => false,
        }
    }

    /// Store the merged parameter bag.
    pub fn ensure_params(&mut self, params: Params) -> &Params {
        self.params.set(params)
    }

    /// Attach the caller resolved by `resolver`.
    pub async fn authorize(
        &mut self,
        resolver: &dyn SessionResolver,
    ) -> Result<Option<&SessionUser>, HttpError> {
        if !self.session_user.is_ready() {
            let user = resolver.resolve(self).await?;
            self.session_user.set(user);
        }
        self.session_user()
    }

    /// Lowercase media type without parameters.
    fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}

async fn decode_multipart(content_type: &str, body: Bytes) -> Result<FormData, HttpError> {
    let invalid = |e: multer::Error| HttpError::InvalidBody(e.to_string());
    let boundary = multer::parse_boundary(content_type).map_err(invalid)?;
    let chunks = futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(chunks, boundary);

    let mut form = FormData::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(invalid)?;
                form.files.push(UploadedFile {
                    field: name,
                    file_name: Some(file_name),
                    content_type,
                    data,
                });
            }
            None => {
                let text = field.text().await.map_err(invalid)?;
                form.fields.insert(name, text);
            }
        }
    }
    Ok(form)
}

fn decode_body(content_type: Option<&str>, body: &Bytes) -> Result<Value, HttpError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    match content_type {
        Some(ct) if ct == "application/json" || ct.ends_with("+json") => {
            serde_json::from_slice(body).map_err(|e| HttpError::InvalidBody(e.to_string()))
        }
        Some("application/x-www-form-urlencoded") => Ok(Value::Object(
            url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect(),
        )),
        _ => Ok(Value::Null),
    }
}
