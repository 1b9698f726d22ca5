//! Status-code defaults for the error taxonomy.
//!
//! When an error only knows its HTTP status, the code and message clients see
//! are regenerated here: the message is the IANA reason phrase and the code
//! is that phrase lowercased with its words joined by dots.
//!
//! ```rust
//! use mortar::HttpError;
//!
//! let e = HttpError::from_status(429);
//! assert_eq!((e.code.as_str(), e.message.as_str()), ("too.many.requests", "Too Many Requests"));
//! ```

const SERVER_ERROR: (&str, &str) = ("server.error", "Internal Server Error");
const CLIENT_ERROR: (&str, &str) = ("client.error", "Client Error");

/// Returns `(code, message)` for `status`.
///
/// `500` and every unregistered 5xx collapse to `server.error`; unregistered
/// codes below 500 become `client.error`.
pub(crate) fn default_code_and_message(status: u16) -> (String, String) {
    if status == 500 {
        return owned(SERVER_ERROR);
    }
    match reason(status) {
        "" if status >= 500 => owned(SERVER_ERROR),
        ""                  => owned(CLIENT_ERROR),
        phrase              => (code_from_phrase(phrase), phrase.to_owned()),
    }
}

fn owned((code, message): (&str, &str)) -> (String, String) {
    (code.to_owned(), message.to_owned())
}

/// `"Not Found"` → `"not.found"`, `"I'm a Teapot"` → `"im.a.teapot"`.
fn code_from_phrase(phrase: &str) -> String {
    phrase
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(|word| {
            word.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// IANA reason phrase, or `""` for unregistered codes.
pub(crate) fn reason(code: u16) -> &'static str {
    match code {
        // ── 1xx Informational ─────────────────────────────────────────────────
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",
        // ── 2xx Success ───────────────────────────────────────────────────────
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        226 => "IM Used",
        // ── 3xx Redirection ───────────────────────────────────────────────────
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        // ── 4xx Client errors ─────────────────────────────────────────────────
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Content Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a Teapot",
        421 => "Misdirected Request",
        422 => "Unprocessable Content",
        423 => "Locked",
        424 => "Failed Dependency",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        // ── 5xx Server errors ─────────────────────────────────────────────────
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also Negotiates",
        507 => "Insufficient Storage",
        508 => "Loop Detected",
        510 => "Not Extended",
        511 => "Network Authentication Required",
        _   => "",
    }
}
