use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionStateKind {
    #[error("idle")]
    Idle,
    #[error("running")]
    Running,
    #[error("completed")]
    Completed,
    #[error("cancelled")]
    Cancelled,
    #[error("reported")]
    Reported,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid header format: '{value}'. Expected 'Key: Value'")]
    InvalidHeaderFormat { value: String },
    #[error("Invalid header name '{header}': {source}")]
    InvalidHeaderName {
        header: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },
    #[error("Invalid header value for '{header}': {source}")]
    InvalidHeaderValue {
        header: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid HTTP method '{value}'. Use get, post, head, options, or trace.")]
    InvalidMethod { value: String },
    #[error("Concurrency must be > 0.")]
    ZeroConcurrency,
    #[error("Missing URL (pass a target URL, set --urls-file, or provide url in config).")]
    MissingUrl,
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Unsupported URL scheme '{scheme}'. Use http or https.")]
    UnsupportedScheme { scheme: String },
    #[error("URL '{url}' is missing a host.")]
    UrlMissingHost { url: String },
    #[error("HTTP/2 requires an https URL (got '{url}').")]
    Http2RequiresHttps { url: String },
    #[error("Invalid proxy address '{value}'. Expected host:port or http://host:port.")]
    InvalidProxyAddress { value: String },
    #[error("Invalid SOCKS5 address '{value}'. Expected host:port.")]
    InvalidSocksAddress { value: String },
    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxyUrl {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Only one request method flag may be set.")]
    ConflictingMethodFlags,
    #[error("URL file '{path}' has no URLs.")]
    UrlFileEmpty { path: String },
    #[error("Failed to read URL file '{path}': {source}")]
    ReadUrlFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot combine a target URL with --urls-file.")]
    UrlAndUrlFileConflict,
    #[error("Session is {actual}; expected {expected}.")]
    InvalidSessionState {
        expected: SessionStateKind,
        actual: SessionStateKind,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
