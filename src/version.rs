//! Protocol version handling and negotiation.
//!
//! The Atlas Server management API is versioned with a `major.minor` pair that
//! is totally ordered lexicographically. A client requests a version at
//! construction time; the requested value is clamped into the range this
//! library implements before any request is sent.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// An API protocol version, ordered lexicographically on `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

/// Oldest protocol version this library speaks.
pub const MIN_SUPPORTED: ApiVersion = ApiVersion::new(2, 0);

/// Newest protocol version this library speaks.
pub const MAX_SUPPORTED: ApiVersion = ApiVersion::new(3, 23);

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = ClientError;

    /// Parse `"3.4"` (or a bare `"3"`, which reads as `3.0`). Components past
    /// the minor are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ClientError::Validation(format!("'{s}' cannot be parsed as an API version"));

        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse::<u16>().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self { major, minor })
    }
}

/// Settle on the version actually used for the session.
///
/// A request below [`MIN_SUPPORTED`] is a configuration error. A request with
/// either component above [`MAX_SUPPORTED`] is clamped down to the ceiling,
/// with a diagnostic; the negotiated version is never silently escalated past
/// the ceiling.
pub fn negotiate(requested: ApiVersion) -> Result<ApiVersion, ClientError> {
    if requested < MIN_SUPPORTED {
        return Err(ClientError::Validation(format!(
            "API version must be at least {MIN_SUPPORTED} (requested {requested})"
        )));
    }
    if requested.major <= MAX_SUPPORTED.major && requested.minor <= MAX_SUPPORTED.minor {
        Ok(requested)
    } else {
        log::warn!(
            "negotiated API version {MAX_SUPPORTED} instead of requested {requested} \
             due to library implementation limit"
        );
        Ok(MAX_SUPPORTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_minor() {
        assert_eq!("3.4".parse::<ApiVersion>().unwrap(), ApiVersion::new(3, 4));
        assert_eq!("2".parse::<ApiVersion>().unwrap(), ApiVersion::new(2, 0));
        assert_eq!(
            "3.4.1".parse::<ApiVersion>().unwrap(),
            ApiVersion::new(3, 4)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ApiVersion>().is_err());
        assert!("three".parse::<ApiVersion>().is_err());
        assert!("3.x".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ApiVersion::new(2, 9) < ApiVersion::new(3, 0));
        assert!(ApiVersion::new(3, 0) < ApiVersion::new(3, 1));
    }

    #[test]
    fn below_minimum_fails() {
        let err = negotiate(ApiVersion::new(1, 9)).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn within_range_is_kept() {
        assert_eq!(
            negotiate(ApiVersion::new(3, 4)).unwrap(),
            ApiVersion::new(3, 4)
        );
    }

    #[test]
    fn above_ceiling_clamps_to_ceiling() {
        assert_eq!(negotiate(ApiVersion::new(4, 0)).unwrap(), MAX_SUPPORTED);
        assert_eq!(negotiate(ApiVersion::new(3, 99)).unwrap(), MAX_SUPPORTED);
    }
}
