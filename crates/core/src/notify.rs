use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::history::ApprovalEvent;
use crate::domain::request::AssetRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestSubmitted,
    RequestApproved,
    RequestDenied,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestSubmitted => "request_submitted",
            Self::RequestApproved => "request_approved",
            Self::RequestDenied => "request_denied",
        }
    }
}

/// Outbound notification emitted after a committed workflow transition.
/// Delivery is fire-and-forget: it never participates in the commit and
/// transport failures never roll a transition back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub data: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, recipient: impl Into<String>) -> Self {
        Self { kind, recipient: recipient.into(), data: BTreeMap::new() }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Approver-facing notice that a new request awaits review.
    pub fn request_submitted(request: &AssetRequest, approvals_inbox: &str) -> Self {
        Self::new(NotificationKind::RequestSubmitted, approvals_inbox)
            .with_data("requester_name", &request.requester_name)
            .with_data("asset_type_name", &request.asset_type_name)
            .with_data("created_at", request.created_at.to_rfc3339())
    }

    /// Requester-facing notice that the full approval chain completed.
    pub fn request_approved(request: &AssetRequest, event: &ApprovalEvent) -> Self {
        Self::new(NotificationKind::RequestApproved, &request.requester_email)
            .with_data("asset_type_name", &request.asset_type_name)
            .with_data("approver_name", &event.approver_name)
            .with_data("comment", event.comment.clone().unwrap_or_default())
    }

    /// Requester-facing notice that the request was denied, with the reason.
    pub fn request_denied(request: &AssetRequest, event: &ApprovalEvent) -> Self {
        Self::new(NotificationKind::RequestDenied, &request.requester_email)
            .with_data("asset_type_name", &request.asset_type_name)
            .with_data("approver_name", &event.approver_name)
            .with_data("comment", event.comment.clone().unwrap_or_default())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification rendering failure: {0}")]
    Render(String),
    #[error("notification transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notifier that drops everything. Default when no transport is configured.
#[derive(Clone, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that records deliveries for assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    deliveries: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn deliveries(&self) -> Vec<Notification> {
        match self.deliveries.lock() {
            Ok(deliveries) => deliveries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        match self.deliveries.lock() {
            Ok(mut deliveries) => deliveries.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use crate::domain::actor::Actor;
    use crate::domain::asset_type::{AssetType, AssetTypeId};
    use crate::domain::history::{ApprovalAction, ApprovalEvent};
    use crate::domain::request::{AssetRequest, NewRequest};

    use super::{Notification, NotificationKind, Notifier, RecordingNotifier};

    fn request() -> AssetRequest {
        let now = Utc::now();
        let asset_type = AssetType {
            id: AssetTypeId("at-1".to_string()),
            name: "Access Card".to_string(),
            description: "Building access card or badge".to_string(),
            icon: None,
            fields: Vec::new(),
            requires_approval: true,
            approval_levels: vec!["supervisor".to_string()],
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        AssetRequest::submitted(
            NewRequest {
                requester_id: "u-1".to_string(),
                requester_name: "Grace Hopper".to_string(),
                requester_email: "grace@example.com".to_string(),
                requester_department: None,
                asset_type_id: asset_type.id.clone(),
                form_data: json!({}),
            },
            &asset_type,
            now,
        )
    }

    #[test]
    fn denied_notification_targets_the_requester_with_the_reason() {
        let request = request();
        let approver = Actor::new("u-2", "Alan Turing", "alan@example.com", "supervisor");
        let event = ApprovalEvent::recorded(
            request.id.clone(),
            &approver,
            ApprovalAction::Denied,
            Some("insufficient justification".to_string()),
            0,
            Utc::now(),
        );

        let notification = Notification::request_denied(&request, &event);

        assert_eq!(notification.kind, NotificationKind::RequestDenied);
        assert_eq!(notification.recipient, "grace@example.com");
        assert_eq!(
            notification.data.get("comment").map(String::as_str),
            Some("insufficient justification")
        );
    }

    #[tokio::test]
    async fn recording_notifier_captures_deliveries() {
        let notifier = RecordingNotifier::default();
        let notification =
            Notification::request_submitted(&request(), "approvals@example.com");

        notifier.deliver(notification.clone()).await.expect("recording never fails");

        assert_eq!(notifier.deliveries(), vec![notification]);
    }
}
