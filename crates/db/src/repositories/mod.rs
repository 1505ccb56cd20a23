use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use assetflow_core::domain::asset_type::{AssetType, AssetTypeId};
use assetflow_core::domain::history::ApprovalEvent;
use assetflow_core::domain::request::{AssetRequest, RequestId, RequestStatus};

pub mod asset_type;
pub mod memory;
pub mod request;

pub use asset_type::SqlAssetTypeRepository;
pub use memory::{InMemoryAssetTypeRepository, InMemoryRequestRepository};
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("concurrent update conflict on request `{0}`")]
    Conflict(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub requester_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RequestCounts {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub denied: u64,
    pub cancelled: u64,
}

/// A request mutation plus its audit append, committed as one unit.
///
/// `expected_version` is the optimistic-concurrency token: the commit fails
/// with `Conflict` when another writer got there first, leaving both the
/// request row and the audit log untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestTransition {
    pub request_id: RequestId,
    pub expected_version: i64,
    pub new_status: RequestStatus,
    pub new_level: u32,
    pub issued_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub event: Option<ApprovalEvent>,
}

#[async_trait]
pub trait AssetTypeRepository: Send + Sync {
    async fn find_by_id(&self, id: &AssetTypeId) -> Result<Option<AssetType>, RepositoryError>;
    async fn save(&self, asset_type: AssetType) -> Result<(), RepositoryError>;
    async fn list(&self, active_only: bool) -> Result<Vec<AssetType>, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<AssetRequest>, RepositoryError>;

    async fn insert(&self, request: AssetRequest) -> Result<(), RepositoryError>;

    /// Apply a transition atomically: the request row mutation and the audit
    /// append become visible together or not at all.
    async fn commit_transition(&self, transition: RequestTransition)
        -> Result<(), RepositoryError>;

    /// Requests matching the filter, newest first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<AssetRequest>, RepositoryError>;

    async fn list_pending(&self) -> Result<Vec<AssetRequest>, RepositoryError>;

    /// Audit events for one request in append order.
    async fn history(&self, request_id: &RequestId)
        -> Result<Vec<ApprovalEvent>, RepositoryError>;

    async fn counts(&self) -> Result<RequestCounts, RepositoryError>;
}
