//! Handler error types.
//!
//! A handler fails with an [`Error`]. The error translator
//! ([`ErrorHandler`](crate::middleware::ErrorHandler)) turns every variant into
//! an [`HttpError`], the `{status, code, message}` triple clients see.

use std::fmt;

use serde::Serialize;

use crate::status;

/// Boxed error used at the seams where any error type is accepted
/// (module installers, opaque handler failures).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error already expressed in HTTP terms.
///
/// Passed through the error translator unchanged.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HttpError {
    #[serde(skip)]
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl HttpError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status, code: code.into(), message: message.into() }
    }

    /// `{status, code, message}` taken from the status table.
    ///
    /// ```rust
    /// use mortar::HttpError;
    ///
    /// let e = HttpError::from_status(404);
    /// assert_eq!(e.code, "not.found");
    /// assert_eq!(e.message, "Not Found");
    /// ```
    pub fn from_status(status: u16) -> Self {
        let (code, message) = status::default_code_and_message(status);
        Self { status, code, message }
    }

    /// `500 server.error Internal Server Error`.
    pub fn internal() -> Self {
        Self::from_status(500)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "bad.request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "not.found", message)
    }
}

impl Default for HttpError {
    fn default() -> Self {
        Self::internal()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for HttpError {}

/// The error type handlers return.
///
/// The variants are the three branches of the translation taxonomy:
///
/// - [`Error::Http`]: already carries status, code and message;
/// - [`Error::Status`]: a foreign error with a known status; code and message
///   are regenerated from the status;
/// - [`Error::Opaque`]: anything else, answered with a generic 500. The source
///   only ever reaches the request log, never the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}", .0.message)]
    Http(HttpError),

    #[error("{source}")]
    Status {
        status: u16,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Opaque(BoxError),
}

impl Error {
    pub fn http(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http(HttpError::new(status, code, message))
    }

    pub fn with_status(status: u16, source: impl Into<BoxError>) -> Self {
        Self::Status { status, source: source.into() }
    }

    pub fn opaque(source: impl Into<BoxError>) -> Self {
        Self::Opaque(source.into())
    }

    /// Maps the error onto the taxonomy clients see.
    pub fn to_http(&self) -> HttpError {
        match self {
            Self::Http(e) => e.clone(),
            Self::Status { status, .. } => HttpError::from_status(*status),
            Self::Opaque(_) => HttpError::internal(),
        }
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Opaque(Box::new(e))
    }
}

/// Bad JSON input is the caller's fault.
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Status { status: 400, source: Box::new(e) }
    }
}

/// Attach an HTTP status to any fallible result.
///
/// ```rust
/// use mortar::{Error, ResultExt};
///
/// fn load() -> Result<u32, std::num::ParseIntError> { "x".parse() }
///
/// let err: Error = load().or_status(422).unwrap_err();
/// assert_eq!(err.to_http().status, 422);
/// ```
pub trait ResultExt<T> {
    fn or_status(self, status: u16) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_status(self, status: u16) -> Result<T, Error> {
        self.map_err(|e| Error::with_status(status, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_pass_through_unchanged() {
        let err = Error::http(404, "not.found", "Not Found");
        assert_eq!(err.to_http(), HttpError::new(404, "not.found", "Not Found"));
    }

    #[test]
    fn status_errors_regenerate_code_and_message() {
        let io = std::io::Error::other("disk on fire");
        let err = Error::with_status(503, io);
        let http = err.to_http();
        assert_eq!(http.status, 503);
        assert_eq!(http.code, "service.unavailable");
        assert_eq!(http.message, "Service Unavailable");
    }

    #[test]
    fn opaque_errors_collapse_to_internal() {
        let err = Error::opaque("secret connection string leaked");
        let http = err.to_http();
        assert_eq!(http, HttpError::new(500, "server.error", "Internal Server Error"));
        assert_eq!(err.to_string(), "secret connection string leaked");
    }

    #[test]
    fn json_errors_are_bad_requests() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(parse).to_http().status, 400);
    }

    #[test]
    fn serialises_only_code_and_message() {
        let body = serde_json::to_value(HttpError::not_found("no such user")).unwrap();
        assert_eq!(body, serde_json::json!({"code": "not.found", "message": "no such user"}));
    }
}
