//! Envelope codec: payloads in, documents out, and back again.
//!
//! Decode is best-effort for "not present" (the slot scan returns `None`) but
//! fails hard when the document cannot be parsed into the envelope shape at
//! all. Responses are normalized with pure text rewrites before parsing: the
//! schema models carry no namespace prefixes, while servers (old ones
//! especially) emit both prefixes and a legacy document-root URI.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ClientError;

use super::{RequestEnvelope, RequestPayload, ResponseEnvelope, ResponseSlot};

/// Document-root URI emitted by servers older than 9.x.
const LEGACY_SCHEMA_URI: &str = "http://legacy.atlasdata.com/api";

/// Its modern equivalent, the one the schema models are declared against.
const SCHEMA_URI: &str = "http://atlasdata.com/api";

static XMLNS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+xmlns(?::[A-Za-z0-9_.-]+)?="[^"]*""#).expect("xmlns pattern is valid")
});

static TAG_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(</?)[A-Za-z_][A-Za-z0-9_.-]*:").expect("prefix pattern is valid"));

static XML_PROLOG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>\s*").expect("prolog pattern is valid"));

static ROOT_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<atlasRequest\s[^>]*?(/?)>").expect("root attribute pattern is valid")
});

/// Rewrite a raw response body into the form the schema models parse.
///
/// Not namespace-aware by design: the rewrites are plain text substitutions
/// applied before any XML machinery runs. Rewrites the legacy root URI to its
/// modern equivalent, drops every `xmlns` declaration, and strips namespace
/// prefixes from open and close tags.
pub fn normalize_response(content: &str) -> String {
    let content = content.replace(LEGACY_SCHEMA_URI, SCHEMA_URI);
    let content = XMLNS_DECL.replace_all(&content, "");
    TAG_PREFIX.replace_all(&content, "$1").into_owned()
}

/// Parse a raw response body into the envelope, normalizing first.
pub fn parse_response(content: &str) -> Result<ResponseEnvelope, ClientError> {
    let normalized = normalize_response(content);
    quick_xml::de::from_str(&normalized).map_err(|err| {
        log::error!("failed to parse server response as an envelope: {err}");
        ClientError::Parse(err)
    })
}

/// Extract the first payload of type `T` from a response body.
///
/// Scans the envelope slots in declaration order; a direct value or the first
/// element of a matching sequence wins. `Ok(None)` when no slot of that kind
/// is populated.
pub fn extract_one<T: ResponseSlot>(content: &str) -> Result<Option<T>, ClientError> {
    let mut envelope = parse_response(content)?;
    Ok(T::take_from(&mut envelope))
}

/// Extract one payload each of two different types from a single response.
///
/// One parse, two slot scans; a populated slot satisfies at most one of the
/// two targets regardless of document order.
pub fn extract_two<T1, T2>(content: &str) -> Result<(Option<T1>, Option<T2>), ClientError>
where
    T1: ResponseSlot,
    T2: ResponseSlot,
{
    let mut envelope = parse_response(content)?;
    let first = T1::take_from(&mut envelope);
    let second = T2::take_from(&mut envelope);
    Ok((first, second))
}

/// Encode a payload into a serialized request document.
///
/// The payload lands in exactly one envelope slot (enforced by the closed
/// union). The serialized document is then trimmed for compatibility with the
/// oldest supported servers: no XML prolog, no attributes on the root
/// element, and an empty root collapses into a self-closing tag.
pub fn build_request(payload: RequestPayload) -> Result<String, ClientError> {
    let envelope = payload.into_envelope().map_err(|err| {
        log::error!("cannot encode request payload: {err}");
        err
    })?;
    let document = serialize_envelope(&envelope)?;
    Ok(finish_request_document(document))
}

fn serialize_envelope(envelope: &RequestEnvelope) -> Result<String, ClientError> {
    quick_xml::se::to_string(envelope).map_err(|err| {
        log::error!("failed to serialize request envelope: {err}");
        ClientError::Encode(err)
    })
}

fn finish_request_document(document: String) -> String {
    let document = XML_PROLOG.replace(&document, "").into_owned();
    let document = ROOT_ATTRIBUTES
        .replace(&document, "<atlasRequest$1>")
        .into_owned();
    if document == "<atlasRequest></atlasRequest>" {
        return "<atlasRequest/>".to_string();
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::types::{
        ApiErrorDetail, Credentials, Group, Pagination, Site, User, UserList,
    };

    #[test]
    fn normalization_strips_namespaces_and_prefixes() {
        let raw = concat!(
            r#"<ns2:atlasResponse xmlns:ns2="http://legacy.atlasdata.com/api" "#,
            r#"xmlns="http://www.w3.org/2001/XMLSchema-instance">"#,
            r#"<ns2:user id="u1" name="ada"/></ns2:atlasResponse>"#,
        );
        let cleaned = normalize_response(raw);
        assert_eq!(
            cleaned,
            r#"<atlasResponse><user id="u1" name="ada"/></atlasResponse>"#
        );
    }

    #[test]
    fn normalization_rewrites_the_legacy_root_uri() {
        let cleaned = normalize_response(r#"<a schemaLocation="http://legacy.atlasdata.com/api x.xsd"/>"#);
        assert!(cleaned.contains("http://atlasdata.com/api x.xsd"));
    }

    #[test]
    fn extract_one_finds_a_direct_slot() {
        let body = r#"<atlasResponse><credentials token="t0k3n"/></atlasResponse>"#;
        let creds: Option<Credentials> = extract_one(body).unwrap();
        assert_eq!(creds.unwrap().token.as_deref(), Some("t0k3n"));
    }

    #[test]
    fn extract_one_returns_none_for_an_absent_kind() {
        let body = r#"<atlasResponse><user id="u1" name="ada"/></atlasResponse>"#;
        let group: Option<Group> = extract_one(body).unwrap();
        assert!(group.is_none());
    }

    #[test]
    fn extract_one_takes_the_first_sequence_element() {
        let body = concat!(
            r#"<atlasResponse><users>"#,
            r#"<user id="u1" name="ada"/><user id="u2" name="grace"/>"#,
            r#"</users></atlasResponse>"#,
        );
        let user: Option<User> = extract_one(body).unwrap();
        assert_eq!(user.unwrap().id.as_deref(), Some("u1"));
    }

    #[test]
    fn extract_one_fails_hard_on_garbage() {
        let err = extract_one::<User>("this is not xml <<<").unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[test]
    fn extract_two_matches_both_regardless_of_document_order() {
        let body = concat!(
            r#"<atlasResponse>"#,
            r#"<pagination pageNumber="1" pageSize="100" totalAvailable="250"/>"#,
            r#"<users><user id="u1" name="ada"/></users>"#,
            r#"</atlasResponse>"#,
        );
        let (list, paging): (Option<UserList>, Option<Pagination>) = extract_two(body).unwrap();
        assert_eq!(list.unwrap().items.len(), 1);
        assert_eq!(paging.unwrap().total_available, 250);

        // Same document, targets swapped.
        let (paging, list): (Option<Pagination>, Option<UserList>) = extract_two(body).unwrap();
        assert_eq!(paging.unwrap().page_size, 100);
        assert_eq!(list.unwrap().items[0].name.as_deref(), Some("ada"));
    }

    #[test]
    fn encode_populates_exactly_one_slot() {
        let user = User {
            name: Some("ada".into()),
            site_role: Some("Creator".into()),
            ..Default::default()
        };
        let document = build_request(user.clone().into()).unwrap();
        assert_eq!(
            document,
            r#"<atlasRequest><user name="ada" siteRole="Creator"/></atlasRequest>"#
        );

        // Round-trip through the response scan: the encoded kind is present,
        // any other kind is absent.
        let as_response = document.replace("atlasRequest", "atlasResponse");
        let decoded: Option<User> = extract_one(&as_response).unwrap();
        assert_eq!(decoded.unwrap(), user);
        let other: Option<Site> = extract_one(&as_response).unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn encode_has_no_prolog() {
        let document = build_request(Group::default().into()).unwrap();
        assert!(!document.starts_with("<?xml"));
    }

    #[test]
    fn response_only_payloads_are_unmappable() {
        let err = build_request(ApiErrorDetail::default().into()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnmappablePayload {
                type_name: "ApiErrorDetail"
            }
        ));
        let err = build_request(Pagination::default().into()).unwrap_err();
        assert!(matches!(err, ClientError::UnmappablePayload { .. }));
    }

    #[test]
    fn empty_root_collapses_to_self_closing() {
        assert_eq!(
            finish_request_document("<atlasRequest></atlasRequest>".to_string()),
            "<atlasRequest/>"
        );
    }

    #[test]
    fn root_attributes_are_stripped() {
        let trimmed = finish_request_document(
            r#"<?xml version="1.0"?><atlasRequest xmlns="http://atlasdata.com/api"><site id="s1"/></atlasRequest>"#.to_string(),
        );
        assert_eq!(trimmed, r#"<atlasRequest><site id="s1"/></atlasRequest>"#);
    }
}
