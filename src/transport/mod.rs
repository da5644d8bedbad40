//! Transport seam between the client core and the network.
//!
//! The core never touches sockets. It hands a fully described request to a
//! [`Transport`] implementation and gets back a status and body, or a
//! [`TransportError`]. Retry, backoff, and connection pooling live behind
//! this trait; the core neither retries nor cancels. [`HttpTransport`] is the
//! stock blocking implementation over reqwest.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::TransportError;

/// Header carrying the session token on authenticated requests.
pub const AUTH_HEADER: &str = "X-Atlas-Auth";

/// Multipart part name for the XML payload.
pub const PAYLOAD_PART: &str = "request_payload";

/// Multipart part name for the uploaded file content.
pub const FILE_PART: &str = "atlas_file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File content fed into a multipart upload from a reader, so large files are
/// streamed rather than buffered whole. The reader is typically a
/// [`BoundedStream`](crate::io::BoundedStream) slice of a larger file.
pub struct FilePart {
    pub file_name: String,
    pub reader: Box<dyn Read + Send + 'static>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            file_name: file_name.into(),
            reader: Box::new(reader),
        }
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("reader", &"<reader>")
            .finish()
    }
}

/// Multipart form body: the XML payload part plus an optional file part.
#[derive(Debug)]
pub struct MultipartBody {
    pub payload_xml: String,
    pub file: Option<FilePart>,
}

/// Prepare multipart upload content from a request document and an optional
/// file reader.
pub fn prepare_upload(payload_xml: String, file: Option<FilePart>) -> MultipartBody {
    MultipartBody { payload_xml, file }
}

/// Request body variants the core produces.
#[derive(Debug)]
pub enum RequestBody {
    Empty,
    Xml(String),
    Multipart(MultipartBody),
}

/// A fully described request, ready for the wire.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Duration,
}

/// What came back: status code and response text. Status interpretation is
/// the caller's job.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The external collaborator owning socket-level concerns.
///
/// A call either returns synchronously or fails synchronously; the core has
/// no timeout or cancellation semantics of its own beyond the per-request
/// timeout passed through.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Blocking HTTP transport over reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    ignore_ssl_errors: bool,
}

impl HttpTransport {
    pub fn new(ignore_ssl_errors: bool) -> Self {
        Self { ignore_ssl_errors }
    }

    fn method_of(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request.timeout)
            .danger_accept_invalid_certs(self.ignore_ssl_errors)
            .build()?;

        let mut builder = client
            .request(Self::method_of(request.method), &request.url)
            .header("Accept", "application/xml");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Xml(xml) => builder
                .header("Content-Type", "application/xml")
                .body(xml),
            RequestBody::Multipart(multipart) => {
                let mut form = reqwest::blocking::multipart::Form::new().part(
                    PAYLOAD_PART,
                    reqwest::blocking::multipart::Part::text(multipart.payload_xml)
                        .mime_str("application/xml")?,
                );
                if let Some(file) = multipart.file {
                    form = form.part(
                        FILE_PART,
                        reqwest::blocking::multipart::Part::reader(file.reader)
                            .file_name(file.file_name)
                            .mime_str("application/octet-stream")?,
                    );
                }
                builder.multipart(form)
            }
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(TransportResponse { status, body })
    }
}
