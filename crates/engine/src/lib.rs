pub mod service;

pub use service::{
    ApprovalOutcome, EngineError, PendingApproval, RequestWithHistory, WorkflowService,
};
