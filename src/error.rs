//! Error taxonomy for the client core.
//!
//! Constructor validation failures abort construction with no partial client.
//! Capability-gate failures abort before any network I/O. Decode treats
//! "slot not present" as `Ok(None)` but an unparsable document as a hard
//! [`ClientError::Parse`]. Transport and remote-status failures are wrapped,
//! logged at the boundary, and never swallowed.

use thiserror::Error;

use crate::envelope::types::ApiErrorDetail;
use crate::version::ApiVersion;

/// Failures raised by the external transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket-level or protocol-level HTTP failure.
    #[error("network failure: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O failure while streaming a request body.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can go wrong between a caller and the Atlas Server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed constructor input (empty base address, unparsable version
    /// string, zero timeout).
    #[error("invalid client configuration: {0}")]
    Validation(String),

    /// The endpoint requires a higher negotiated protocol version.
    #[error(
        "endpoint '{endpoint}' requires API version {required} \
         but the negotiated version is {negotiated}"
    )]
    VersionTooOld {
        endpoint: String,
        required: ApiVersion,
        negotiated: ApiVersion,
    },

    /// An on-premise-only endpoint was called against a hosted deployment.
    #[error("endpoint '{endpoint}' is not available on hosted deployments")]
    DeploymentNotSupported { endpoint: String },

    /// The response document could not be parsed into the envelope shape.
    #[error("response is not a parseable envelope: {0}")]
    Parse(#[from] quick_xml::DeError),

    /// A populated envelope failed to serialize.
    #[error("failed to serialize request envelope: {0}")]
    Encode(#[from] quick_xml::SeError),

    /// No request slot accepts the payload kind being encoded.
    #[error("no request envelope slot accepts payload kind '{type_name}'")]
    UnmappablePayload { type_name: &'static str },

    /// The server answered with the expected status but the envelope did not
    /// carry the payload the operation needs.
    #[error("response did not contain the expected '{kind}' payload")]
    MissingPayload { kind: &'static str },

    /// Network failure reported by the transport.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with an unexpected status code.
    #[error("server returned status {status} for '{url}'")]
    RemoteRequest {
        url: String,
        status: u16,
        /// Parsed error body, when the server sent one we could decode.
        details: Option<ApiErrorDetail>,
    },
}

impl ClientError {
    /// Server-side error code carried in the response body, if any.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            ClientError::RemoteRequest {
                details: Some(d), ..
            } => Some(d.code.as_str()),
            _ => None,
        }
    }
}
