use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use assetflow_core::domain::actor::Actor;
use assetflow_core::domain::asset_type::AssetType;
use assetflow_core::domain::history::ApprovalEvent;
use assetflow_core::domain::request::{AssetRequest, NewRequest, RequestId, RequestStatus};
use assetflow_core::errors::WorkflowError;
use assetflow_core::notify::{Notification, Notifier};
use assetflow_core::roles::RoleHierarchy;
use assetflow_core::workflow::{plan_approval, plan_cancellation, plan_denial};
use assetflow_db::repositories::{
    AssetTypeRepository, RepositoryError, RequestCounts, RequestFilter, RequestRepository,
    RequestTransition,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for EngineError {
    fn from(error: RepositoryError) -> Self {
        match error {
            // The race loser: another writer committed first, so this
            // request is no longer pending at the expected step.
            RepositoryError::Conflict(id) => {
                Self::Workflow(WorkflowError::InvalidState { id: RequestId(id) })
            }
            other => Self::Persistence(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ApprovalOutcome {
    pub status: RequestStatus,
    pub fully_approved: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingApproval {
    pub request: AssetRequest,
    pub required_role: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequestWithHistory {
    pub request: AssetRequest,
    pub history: Vec<ApprovalEvent>,
    pub asset_type: AssetType,
}

/// Orchestrator for the approval workflow.
///
/// Every mutation runs the same sequence: load current state, validate the
/// preconditions in order (exists, pending, authorized, input), then commit
/// the request mutation and the audit append as one unit through the
/// repository's version-guarded transition. Notifications go out after the
/// commit on a detached task and never affect the result.
pub struct WorkflowService {
    requests: Arc<dyn RequestRepository>,
    asset_types: Arc<dyn AssetTypeRepository>,
    notifier: Arc<dyn Notifier>,
    hierarchy: RoleHierarchy,
    approvals_inbox: String,
}

impl WorkflowService {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        asset_types: Arc<dyn AssetTypeRepository>,
        notifier: Arc<dyn Notifier>,
        hierarchy: RoleHierarchy,
        approvals_inbox: impl Into<String>,
    ) -> Self {
        Self {
            requests,
            asset_types,
            notifier,
            hierarchy,
            approvals_inbox: approvals_inbox.into(),
        }
    }

    pub async fn create_request(
        &self,
        new_request: NewRequest,
    ) -> Result<AssetRequest, EngineError> {
        let asset_type = self
            .asset_types
            .find_by_id(&new_request.asset_type_id)
            .await?
            .filter(|asset_type| asset_type.is_active)
            .ok_or_else(|| {
                WorkflowError::asset_type_not_found(new_request.asset_type_id.0.clone())
            })?;

        asset_type.validate_form_data(&new_request.form_data)?;

        let request = AssetRequest::submitted(new_request, &asset_type, Utc::now());
        self.requests.insert(request.clone()).await?;

        info!(
            event_name = "workflow.request_created",
            request_id = %request.id,
            asset_type = %asset_type.name,
            requester = %request.requester_id,
            status = ?request.status,
            "request created"
        );

        if request.status == RequestStatus::Pending {
            self.dispatch(Notification::request_submitted(&request, &self.approvals_inbox));
        }

        Ok(request)
    }

    pub async fn approve(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<ApprovalOutcome, EngineError> {
        let request = self.load_request(request_id).await?;
        if request.status.is_terminal() {
            return Err(WorkflowError::InvalidState { id: request.id.clone() }.into());
        }
        let asset_type = self.load_asset_type(&request).await?;

        let plan =
            plan_approval(&request, &asset_type, actor, &self.hierarchy, comment, Utc::now())?;

        self.requests
            .commit_transition(RequestTransition {
                request_id: request.id.clone(),
                expected_version: request.version,
                new_status: plan.new_status,
                new_level: plan.new_level,
                issued_at: plan.issued_at,
                updated_at: plan.event.created_at,
                event: Some(plan.event.clone()),
            })
            .await?;

        info!(
            event_name = "workflow.request_approved",
            request_id = %request.id,
            approver = %actor.id,
            level = plan.event.level,
            fully_approved = plan.fully_approved,
            "approval recorded"
        );

        if plan.fully_approved {
            self.dispatch(Notification::request_approved(&request, &plan.event));
        }

        Ok(ApprovalOutcome { status: plan.new_status, fully_approved: plan.fully_approved })
    }

    pub async fn deny(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        comment: &str,
    ) -> Result<RequestStatus, EngineError> {
        let request = self.load_request(request_id).await?;
        if request.status.is_terminal() {
            return Err(WorkflowError::InvalidState { id: request.id.clone() }.into());
        }
        let asset_type = self.load_asset_type(&request).await?;

        let plan = plan_denial(&request, &asset_type, actor, &self.hierarchy, comment, Utc::now())?;

        self.requests
            .commit_transition(RequestTransition {
                request_id: request.id.clone(),
                expected_version: request.version,
                new_status: plan.new_status,
                new_level: request.current_approval_level,
                issued_at: None,
                updated_at: plan.event.created_at,
                event: Some(plan.event.clone()),
            })
            .await?;

        info!(
            event_name = "workflow.request_denied",
            request_id = %request.id,
            approver = %actor.id,
            level = plan.event.level,
            "denial recorded"
        );

        self.dispatch(Notification::request_denied(&request, &plan.event));

        Ok(plan.new_status)
    }

    pub async fn cancel(
        &self,
        request_id: &RequestId,
        requester_id: &str,
    ) -> Result<RequestStatus, EngineError> {
        let request = self.load_request(request_id).await?;

        let plan = plan_cancellation(&request, requester_id)?;

        self.requests
            .commit_transition(RequestTransition {
                request_id: request.id.clone(),
                expected_version: request.version,
                new_status: plan.new_status,
                new_level: request.current_approval_level,
                issued_at: None,
                updated_at: Utc::now(),
                event: None,
            })
            .await?;

        info!(
            event_name = "workflow.request_cancelled",
            request_id = %request.id,
            requester = %requester_id,
            "request cancelled"
        );

        Ok(plan.new_status)
    }

    pub async fn get_request(&self, request_id: &RequestId) -> Result<AssetRequest, EngineError> {
        self.load_request(request_id).await
    }

    pub async fn get_request_with_history(
        &self,
        request_id: &RequestId,
    ) -> Result<RequestWithHistory, EngineError> {
        let request = self.load_request(request_id).await?;
        let history = self.requests.history(request_id).await?;
        let asset_type = self.load_asset_type(&request).await?;

        Ok(RequestWithHistory { request, history, asset_type })
    }

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<AssetRequest>, EngineError> {
        Ok(self.requests.list(filter).await?)
    }

    /// Every pending request whose current step the given role may act on,
    /// with the concrete role that step requires. Re-evaluated per call:
    /// the required role moves as a request advances through its chain.
    pub async fn pending_for(
        &self,
        actor_role: &str,
    ) -> Result<Vec<PendingApproval>, EngineError> {
        let pending = self.requests.list_pending().await?;

        let mut worklist = Vec::new();
        for request in pending {
            let Some(asset_type) = self.asset_types.find_by_id(&request.asset_type_id).await?
            else {
                continue;
            };
            let Some(required_role) = asset_type.required_role_at(request.current_approval_level)
            else {
                continue;
            };

            if self.hierarchy.authorizes(actor_role, required_role) {
                let required_role = required_role.to_string();
                worklist.push(PendingApproval { request, required_role });
            }
        }

        Ok(worklist)
    }

    pub async fn stats(&self) -> Result<RequestCounts, EngineError> {
        Ok(self.requests.counts().await?)
    }

    async fn load_request(&self, request_id: &RequestId) -> Result<AssetRequest, EngineError> {
        self.requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| WorkflowError::request_not_found(request_id.0.clone()).into())
    }

    async fn load_asset_type(&self, request: &AssetRequest) -> Result<AssetType, EngineError> {
        self.asset_types
            .find_by_id(&request.asset_type_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::asset_type_not_found(request.asset_type_id.0.clone()).into()
            })
    }

    /// Fire-and-forget delivery. The commit already happened; a transport
    /// failure is logged and swallowed, never surfaced to the caller.
    fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let kind = notification.kind;
            if let Err(error) = notifier.deliver(notification).await {
                warn!(
                    event_name = "notify.delivery_failed",
                    kind = kind.as_str(),
                    "notification delivery failed: {error}"
                );
            }
        });
    }
}
