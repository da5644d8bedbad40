//! # atlas-api-client
//!
//! Client core for the Atlas Server versioned XML management API.
//!
//! Feature-area sub-clients (auth, permissions, datasources, ...) all funnel
//! through the shared plumbing in this crate: a generic envelope codec that
//! packs and unpacks typed payloads into the single wire envelope, a
//! capability gate that blocks calls the negotiated protocol version or the
//! deployment mode does not permit, and a bounded stream view for assembling
//! multipart uploads without buffering whole files.
//!
//! The API surface is synchronous and blocking throughout. Socket-level
//! concerns (retry, backoff, pooling) live behind the [`Transport`] trait.

pub mod client;
pub mod envelope;
pub mod error;
pub mod io;
pub mod transport;
pub mod version;

pub use client::{
    ApiClient, AtlasSession, CapabilityGate, ClientConfig, ClientCore, ClientRegistry,
    EndpointSpec, SubClient, SubClientEntry, SubClientFactory,
};
pub use envelope::{RequestEnvelope, RequestPayload, ResponseEnvelope, ResponseSlot};
pub use error::{ClientError, TransportError};
pub use io::BoundedStream;
pub use transport::{HttpTransport, Method, Transport};
pub use version::ApiVersion;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
