use chrono::{DateTime, Utc};

use crate::domain::actor::Actor;
use crate::domain::asset_type::AssetType;
use crate::domain::history::{ApprovalAction, ApprovalEvent};
use crate::domain::request::{AssetRequest, RequestStatus};
use crate::errors::WorkflowError;
use crate::roles::RoleHierarchy;

/// Planned outcome of an approval: the request mutation to apply, the audit
/// event to append, and whether this action completed the full chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalPlan {
    pub new_status: RequestStatus,
    pub new_level: u32,
    pub issued_at: Option<DateTime<Utc>>,
    pub fully_approved: bool,
    pub event: ApprovalEvent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DenialPlan {
    pub new_status: RequestStatus,
    pub event: ApprovalEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancellationPlan {
    pub new_status: RequestStatus,
}

/// Plan one approval step.
///
/// Guards, in order: the request must be pending; the actor's role must be
/// authorized for the step currently required. Approving the last level and
/// becoming fully approved happen in the same transition: there is no
/// observable state where the level equals the total but the status is
/// still pending.
pub fn plan_approval(
    request: &AssetRequest,
    asset_type: &AssetType,
    actor: &Actor,
    hierarchy: &RoleHierarchy,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<ApprovalPlan, WorkflowError> {
    authorize_step(request, asset_type, actor, hierarchy)?;

    let new_level = request.current_approval_level + 1;
    let fully_approved = new_level >= request.total_approval_levels;

    Ok(ApprovalPlan {
        new_status: if fully_approved { RequestStatus::Approved } else { RequestStatus::Pending },
        new_level,
        issued_at: fully_approved.then_some(now),
        fully_approved,
        event: ApprovalEvent::recorded(
            request.id.clone(),
            actor,
            ApprovalAction::Approved,
            comment,
            request.current_approval_level,
            now,
        ),
    })
}

/// Plan a denial. Same authorization guard as approval, plus a mandatory
/// non-empty comment. The level counter is left untouched.
pub fn plan_denial(
    request: &AssetRequest,
    asset_type: &AssetType,
    actor: &Actor,
    hierarchy: &RoleHierarchy,
    comment: &str,
    now: DateTime<Utc>,
) -> Result<DenialPlan, WorkflowError> {
    authorize_step(request, asset_type, actor, hierarchy)?;

    let comment = comment.trim();
    if comment.is_empty() {
        return Err(WorkflowError::validation("a comment is required to deny a request"));
    }

    Ok(DenialPlan {
        new_status: RequestStatus::Denied,
        event: ApprovalEvent::recorded(
            request.id.clone(),
            actor,
            ApprovalAction::Denied,
            Some(comment.to_string()),
            request.current_approval_level,
            now,
        ),
    })
}

/// Plan a cancellation. Requester-initiated self-service: no audit event is
/// written, and only the original requester may cancel.
pub fn plan_cancellation(
    request: &AssetRequest,
    requester_id: &str,
) -> Result<CancellationPlan, WorkflowError> {
    if request.status.is_terminal() {
        return Err(WorkflowError::InvalidState { id: request.id.clone() });
    }
    if request.requester_id != requester_id {
        return Err(WorkflowError::forbidden("only the requester can cancel this request"));
    }

    Ok(CancellationPlan { new_status: RequestStatus::Cancelled })
}

fn authorize_step(
    request: &AssetRequest,
    asset_type: &AssetType,
    actor: &Actor,
    hierarchy: &RoleHierarchy,
) -> Result<(), WorkflowError> {
    if request.status.is_terminal() {
        return Err(WorkflowError::InvalidState { id: request.id.clone() });
    }

    let Some(required_role) = asset_type.required_role_at(request.current_approval_level) else {
        return Err(WorkflowError::validation(format!(
            "asset type `{}` defines no approver for step {}",
            asset_type.name, request.current_approval_level
        )));
    };

    if !hierarchy.authorizes(&actor.role, required_role) {
        return Err(WorkflowError::forbidden(format!(
            "role `{}` cannot act on a step requiring `{required_role}`",
            actor.role
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use crate::domain::actor::Actor;
    use crate::domain::asset_type::{AssetType, AssetTypeId};
    use crate::domain::history::ApprovalAction;
    use crate::domain::request::{AssetRequest, NewRequest, RequestStatus};
    use crate::errors::WorkflowError;
    use crate::roles::RoleHierarchy;

    use super::{plan_approval, plan_cancellation, plan_denial};

    fn asset_type(approval_levels: Vec<&str>) -> AssetType {
        let now = Utc::now();
        AssetType {
            id: AssetTypeId("at-1".to_string()),
            name: "Hardware Asset".to_string(),
            description: "Request for computer equipment".to_string(),
            icon: None,
            fields: Vec::new(),
            requires_approval: true,
            approval_levels: approval_levels.into_iter().map(str::to_string).collect(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn pending_request(asset_type: &AssetType) -> AssetRequest {
        AssetRequest::submitted(
            NewRequest {
                requester_id: "u-req".to_string(),
                requester_name: "Grace Hopper".to_string(),
                requester_email: "grace@example.com".to_string(),
                requester_department: None,
                asset_type_id: asset_type.id.clone(),
                form_data: json!({}),
            },
            asset_type,
            Utc::now(),
        )
    }

    fn supervisor() -> Actor {
        Actor::new("u-sup", "Alan Turing", "alan@example.com", "supervisor")
    }

    fn admin() -> Actor {
        Actor::new("u-adm", "Annie Easley", "annie@example.com", "admin")
    }

    #[test]
    fn intermediate_approval_stays_pending() {
        let asset_type = asset_type(vec!["supervisor", "admin"]);
        let request = pending_request(&asset_type);
        let hierarchy = RoleHierarchy::default();

        let plan =
            plan_approval(&request, &asset_type, &supervisor(), &hierarchy, None, Utc::now())
                .expect("supervisor clears step 0");

        assert_eq!(plan.new_status, RequestStatus::Pending);
        assert_eq!(plan.new_level, 1);
        assert!(!plan.fully_approved);
        assert!(plan.issued_at.is_none());
        assert_eq!(plan.event.action, ApprovalAction::Approved);
        assert_eq!(plan.event.level, 0);
    }

    #[test]
    fn final_approval_issues_atomically() {
        let asset_type = asset_type(vec!["supervisor"]);
        let request = pending_request(&asset_type);
        let now = Utc::now();

        let plan =
            plan_approval(&request, &asset_type, &supervisor(), &RoleHierarchy::default(), None, now)
                .expect("single-level chain completes");

        assert_eq!(plan.new_status, RequestStatus::Approved);
        assert_eq!(plan.new_level, request.total_approval_levels);
        assert!(plan.fully_approved);
        assert_eq!(plan.issued_at, Some(now));
    }

    #[test]
    fn higher_role_may_clear_a_lower_step() {
        let asset_type = asset_type(vec!["supervisor", "admin"]);
        let request = pending_request(&asset_type);

        let plan =
            plan_approval(&request, &asset_type, &admin(), &RoleHierarchy::default(), None, Utc::now())
                .expect("admin clears a supervisor step");

        assert_eq!(plan.new_level, 1);
    }

    #[test]
    fn floor_role_is_rejected_even_when_nominally_required() {
        let asset_type = asset_type(vec!["employee"]);
        let request = pending_request(&asset_type);
        let employee = Actor::new("u-emp", "Mary Jackson", "mary@example.com", "employee");

        let error = plan_approval(
            &request,
            &asset_type,
            &employee,
            &RoleHierarchy::default(),
            None,
            Utc::now(),
        )
        .expect_err("employee may never approve");

        assert!(matches!(error, WorkflowError::Forbidden { .. }));
    }

    #[test]
    fn insufficient_role_is_forbidden() {
        let asset_type = asset_type(vec!["admin"]);
        let request = pending_request(&asset_type);

        let error = plan_approval(
            &request,
            &asset_type,
            &supervisor(),
            &RoleHierarchy::default(),
            None,
            Utc::now(),
        )
        .expect_err("supervisor cannot clear an admin step");

        assert!(matches!(error, WorkflowError::Forbidden { .. }));
    }

    #[test]
    fn terminal_requests_reject_every_action() {
        let asset_type = asset_type(vec!["supervisor"]);
        let mut request = pending_request(&asset_type);
        request.status = RequestStatus::Denied;
        let hierarchy = RoleHierarchy::default();

        let approve =
            plan_approval(&request, &asset_type, &supervisor(), &hierarchy, None, Utc::now());
        let deny =
            plan_denial(&request, &asset_type, &supervisor(), &hierarchy, "why", Utc::now());
        let cancel = plan_cancellation(&request, "u-req");

        assert!(matches!(approve, Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(deny, Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(cancel, Err(WorkflowError::InvalidState { .. })));
    }

    #[test]
    fn denial_requires_a_comment_and_keeps_the_level() {
        let asset_type = asset_type(vec!["supervisor", "admin"]);
        let request = pending_request(&asset_type);
        let hierarchy = RoleHierarchy::default();

        let blank =
            plan_denial(&request, &asset_type, &supervisor(), &hierarchy, "   ", Utc::now())
                .expect_err("blank comment must be rejected");
        assert!(matches!(blank, WorkflowError::Validation { .. }));

        let plan = plan_denial(
            &request,
            &asset_type,
            &supervisor(),
            &hierarchy,
            "insufficient justification",
            Utc::now(),
        )
        .expect("denial with comment");

        assert_eq!(plan.new_status, RequestStatus::Denied);
        assert_eq!(plan.event.level, request.current_approval_level);
        assert_eq!(plan.event.comment.as_deref(), Some("insufficient justification"));
    }

    #[test]
    fn authorization_is_checked_before_the_denial_comment() {
        let asset_type = asset_type(vec!["admin"]);
        let request = pending_request(&asset_type);

        let error = plan_denial(
            &request,
            &asset_type,
            &supervisor(),
            &RoleHierarchy::default(),
            "",
            Utc::now(),
        )
        .expect_err("unauthorized denial must fail on the role first");

        assert!(matches!(error, WorkflowError::Forbidden { .. }));
    }

    #[test]
    fn only_the_requester_may_cancel() {
        let asset_type = asset_type(vec!["supervisor"]);
        let request = pending_request(&asset_type);

        let plan = plan_cancellation(&request, "u-req").expect("requester cancels");
        assert_eq!(plan.new_status, RequestStatus::Cancelled);

        let error = plan_cancellation(&request, "u-other").expect_err("strangers may not cancel");
        assert!(matches!(error, WorkflowError::Forbidden { .. }));
    }
}
