pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod roles;
pub mod workflow;

pub use domain::actor::Actor;
pub use domain::asset_type::{AssetType, AssetTypeId, FieldDescriptor, FieldKind};
pub use domain::history::{ApprovalAction, ApprovalEvent};
pub use domain::request::{AssetRequest, NewRequest, RequestId, RequestStatus};
pub use errors::WorkflowError;
pub use notify::{
    NoopNotifier, Notification, NotificationKind, Notifier, NotifyError, RecordingNotifier,
};
pub use roles::{RoleHierarchy, RoleLevel};
pub use workflow::{
    plan_approval, plan_cancellation, plan_denial, ApprovalPlan, CancellationPlan, DenialPlan,
};
