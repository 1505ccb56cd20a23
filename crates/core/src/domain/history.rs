use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::request::RequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approved,
    Denied,
}

/// One audit record in a request's approval trail. Immutable once written;
/// `level` is the step that was being resolved when the action was taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub id: String,
    pub request_id: RequestId,
    pub approver_id: String,
    pub approver_name: String,
    pub approver_email: String,
    pub approver_role: String,
    pub action: ApprovalAction,
    pub comment: Option<String>,
    pub level: u32,
    pub created_at: DateTime<Utc>,
}

impl ApprovalEvent {
    pub fn recorded(
        request_id: RequestId,
        approver: &Actor,
        action: ApprovalAction,
        comment: Option<String>,
        level: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_id,
            approver_id: approver.id.clone(),
            approver_name: approver.name.clone(),
            approver_email: approver.email.clone(),
            approver_role: approver.role.clone(),
            action,
            comment,
            level,
            created_at: at,
        }
    }
}
