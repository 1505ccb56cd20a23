use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::asset_type::{AssetType, AssetTypeId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    Cancelled,
}

impl RequestStatus {
    /// Terminal statuses permit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Input for submitting a new request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewRequest {
    pub requester_id: String,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_department: Option<String>,
    pub asset_type_id: AssetTypeId,
    pub form_data: Value,
}

/// The mutable workflow subject.
///
/// Requester identity, form data, and the asset-type snapshot
/// (`asset_type_name`, `total_approval_levels`) are frozen at creation.
/// `version` is the optimistic-concurrency token bumped on every committed
/// transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub id: RequestId,
    pub requester_id: String,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_department: Option<String>,
    pub asset_type_id: AssetTypeId,
    pub asset_type_name: String,
    pub form_data: Value,
    pub status: RequestStatus,
    pub current_approval_level: u32,
    pub total_approval_levels: u32,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl AssetRequest {
    /// Build a freshly submitted request for the given asset type.
    ///
    /// A type with no approval levels is issued immediately, so that
    /// `Approved` and `current_approval_level == total_approval_levels`
    /// coincide in every reachable state.
    pub fn submitted(new_request: NewRequest, asset_type: &AssetType, now: DateTime<Utc>) -> Self {
        let total_approval_levels = asset_type.total_approval_levels();
        let auto_issued = total_approval_levels == 0;

        Self {
            id: RequestId(Uuid::new_v4().to_string()),
            requester_id: new_request.requester_id,
            requester_name: new_request.requester_name,
            requester_email: new_request.requester_email,
            requester_department: new_request.requester_department,
            asset_type_id: new_request.asset_type_id,
            asset_type_name: asset_type.name.clone(),
            form_data: new_request.form_data,
            status: if auto_issued { RequestStatus::Approved } else { RequestStatus::Pending },
            current_approval_level: 0,
            total_approval_levels,
            issued_at: auto_issued.then_some(now),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}
