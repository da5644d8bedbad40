//! The single wire envelope every request and response body embeds in.
//!
//! Both directions use one polymorphic container with a fixed, enumerable set
//! of named slots, one per payload kind, and at most one slot populated per
//! call. Encoding dispatches through the closed [`RequestPayload`] union with
//! an exhaustive match, so the payload-to-slot mapping is checked at compile
//! time. Decoding scans response slots in declaration order through the
//! [`ResponseSlot`] trait.

pub mod codec;
pub mod types;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use types::{
    ApiErrorDetail, Credentials, DataSource, Group, GroupList, JobStatus, Pagination, Project,
    Site, User, UserList,
};

/// Wire container for request bodies: `<atlasRequest>...</atlasRequest>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "atlasRequest")]
pub struct RequestEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DataSource>,
}

/// Wire container for response bodies: `<atlasResponse>...</atlasResponse>`.
///
/// Field declaration order is the decode scan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "atlasResponse")]
pub struct ResponseEnvelope {
    pub error: Option<ApiErrorDetail>,
    pub pagination: Option<Pagination>,
    pub credentials: Option<Credentials>,
    pub site: Option<Site>,
    pub user: Option<User>,
    pub group: Option<Group>,
    pub project: Option<Project>,
    pub datasource: Option<DataSource>,
    pub job: Option<JobStatus>,
    pub users: Option<UserList>,
    pub groups: Option<GroupList>,
}

/// Closed union of every payload kind a caller may hand to the codec.
///
/// Response-only kinds are members too, so encoding one fails with a typed
/// [`ClientError::UnmappablePayload`] instead of being unrepresentable at the
/// call site that forwards a payload generically.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    Credentials(Credentials),
    Site(Site),
    User(User),
    Group(Group),
    Project(Project),
    DataSource(DataSource),
    Job(JobStatus),
    Pagination(Pagination),
    Error(ApiErrorDetail),
}

impl RequestPayload {
    /// Stable name of the payload kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestPayload::Credentials(_) => "Credentials",
            RequestPayload::Site(_) => "Site",
            RequestPayload::User(_) => "User",
            RequestPayload::Group(_) => "Group",
            RequestPayload::Project(_) => "Project",
            RequestPayload::DataSource(_) => "DataSource",
            RequestPayload::Job(_) => "JobStatus",
            RequestPayload::Pagination(_) => "Pagination",
            RequestPayload::Error(_) => "ApiErrorDetail",
        }
    }

    /// Map the payload onto the one envelope slot that carries it.
    pub fn into_envelope(self) -> Result<RequestEnvelope, ClientError> {
        let mut envelope = RequestEnvelope::default();
        match self {
            RequestPayload::Credentials(v) => envelope.credentials = Some(v),
            RequestPayload::Site(v) => envelope.site = Some(v),
            RequestPayload::User(v) => envelope.user = Some(v),
            RequestPayload::Group(v) => envelope.group = Some(v),
            RequestPayload::Project(v) => envelope.project = Some(v),
            RequestPayload::DataSource(v) => envelope.datasource = Some(v),
            other @ (RequestPayload::Job(_)
            | RequestPayload::Pagination(_)
            | RequestPayload::Error(_)) => {
                return Err(ClientError::UnmappablePayload {
                    type_name: other.kind(),
                })
            }
        }
        Ok(envelope)
    }
}

impl From<Credentials> for RequestPayload {
    fn from(v: Credentials) -> Self {
        RequestPayload::Credentials(v)
    }
}

impl From<Site> for RequestPayload {
    fn from(v: Site) -> Self {
        RequestPayload::Site(v)
    }
}

impl From<User> for RequestPayload {
    fn from(v: User) -> Self {
        RequestPayload::User(v)
    }
}

impl From<Group> for RequestPayload {
    fn from(v: Group) -> Self {
        RequestPayload::Group(v)
    }
}

impl From<Project> for RequestPayload {
    fn from(v: Project) -> Self {
        RequestPayload::Project(v)
    }
}

impl From<DataSource> for RequestPayload {
    fn from(v: DataSource) -> Self {
        RequestPayload::DataSource(v)
    }
}

impl From<JobStatus> for RequestPayload {
    fn from(v: JobStatus) -> Self {
        RequestPayload::Job(v)
    }
}

impl From<Pagination> for RequestPayload {
    fn from(v: Pagination) -> Self {
        RequestPayload::Pagination(v)
    }
}

impl From<ApiErrorDetail> for RequestPayload {
    fn from(v: ApiErrorDetail) -> Self {
        RequestPayload::Error(v)
    }
}

/// One response payload kind's extraction rule: take the first match from the
/// envelope, scanning the direct slot before any sequence slot.
pub trait ResponseSlot: Sized {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self>;
}

impl ResponseSlot for ApiErrorDetail {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.error.take()
    }
}

impl ResponseSlot for Pagination {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.pagination.take()
    }
}

impl ResponseSlot for Credentials {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.credentials.take()
    }
}

impl ResponseSlot for Site {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.site.take()
    }
}

impl ResponseSlot for User {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        if let Some(user) = envelope.user.take() {
            return Some(user);
        }
        envelope
            .users
            .as_mut()
            .filter(|list| !list.items.is_empty())
            .map(|list| list.items.remove(0))
    }
}

impl ResponseSlot for Group {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        if let Some(group) = envelope.group.take() {
            return Some(group);
        }
        envelope
            .groups
            .as_mut()
            .filter(|list| !list.items.is_empty())
            .map(|list| list.items.remove(0))
    }
}

impl ResponseSlot for Project {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.project.take()
    }
}

impl ResponseSlot for DataSource {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.datasource.take()
    }
}

impl ResponseSlot for JobStatus {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.job.take()
    }
}

impl ResponseSlot for UserList {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.users.take()
    }
}

impl ResponseSlot for GroupList {
    fn take_from(envelope: &mut ResponseEnvelope) -> Option<Self> {
        envelope.groups.take()
    }
}
