use thiserror::Error;

/// Convenient result alias for the osmgeo library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// An upstream operation was attempted before `connect` or after `disconnect`.
    #[error("OSM client not connected")]
    NotConnected,

    /// An upstream service answered with a non-success status, or the
    /// request never completed.
    #[error("{service} request failed{}: {message}", format_status(.status))]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// A well-formed upstream response carried no usable candidates.
    #[error("no {what} found")]
    NoResult { what: String },

    /// Caller-supplied input violated a precondition.
    #[error("invalid argument '{parameter}': {reason}")]
    InvalidArgument { parameter: String, reason: String },
}

impl Error {
    pub fn upstream(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Upstream {
            service,
            status,
            message: message.into(),
        }
    }

    pub fn no_result(what: impl Into<String>) -> Self {
        Error::NoResult { what: what.into() }
    }

    pub fn invalid_argument(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a transport or decoding error raised by the HTTP client.
    pub fn from_http(service: &'static str, err: reqwest::Error) -> Self {
        Error::Upstream {
            service,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    /// Whether aggregation tools may downgrade this failure to a partial result.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream { .. })
    }

    /// Upstream failures plus empty answers; a per-item lookup may record
    /// these and carry on. `NotConnected` and bad arguments never qualify.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Upstream { .. } | Error::NoResult { .. })
    }
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_includes_status() {
        let err = Error::upstream("nominatim", Some(503), "service unavailable");
        assert_eq!(
            err.to_string(),
            "nominatim request failed with status 503: service unavailable"
        );
        assert!(err.is_upstream());
    }

    #[test]
    fn upstream_message_without_status() {
        let err = Error::upstream("overpass", None, "connection reset");
        assert_eq!(err.to_string(), "overpass request failed: connection reset");
    }

    #[test]
    fn other_kinds_are_not_upstream() {
        assert!(!Error::NotConnected.is_upstream());
        assert!(!Error::no_result("route").is_upstream());
        let err = Error::invalid_argument("locations", "need at least two");
        assert!(!err.is_upstream());
        assert_eq!(
            err.to_string(),
            "invalid argument 'locations': need at least two"
        );
    }

    #[test]
    fn only_upstream_and_empty_answers_are_recoverable() {
        assert!(Error::upstream("osrm", Some(500), "boom").is_recoverable());
        assert!(Error::no_result("route").is_recoverable());
        assert!(!Error::NotConnected.is_recoverable());
        assert!(!Error::invalid_argument("radius", "negative").is_recoverable());
    }
}
