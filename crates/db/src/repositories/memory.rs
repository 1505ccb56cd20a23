use std::collections::HashMap;

use tokio::sync::RwLock;

use assetflow_core::domain::asset_type::{AssetType, AssetTypeId};
use assetflow_core::domain::history::ApprovalEvent;
use assetflow_core::domain::request::{AssetRequest, RequestId};

use super::{
    AssetTypeRepository, RepositoryError, RequestCounts, RequestFilter, RequestRepository,
    RequestTransition,
};

#[derive(Default)]
pub struct InMemoryAssetTypeRepository {
    asset_types: RwLock<HashMap<String, AssetType>>,
}

#[async_trait::async_trait]
impl AssetTypeRepository for InMemoryAssetTypeRepository {
    async fn find_by_id(&self, id: &AssetTypeId) -> Result<Option<AssetType>, RepositoryError> {
        let asset_types = self.asset_types.read().await;
        Ok(asset_types.get(&id.0).cloned())
    }

    async fn save(&self, asset_type: AssetType) -> Result<(), RepositoryError> {
        let mut asset_types = self.asset_types.write().await;
        asset_types.insert(asset_type.id.0.clone(), asset_type);
        Ok(())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<AssetType>, RepositoryError> {
        let asset_types = self.asset_types.read().await;
        let mut result: Vec<AssetType> = asset_types
            .values()
            .filter(|asset_type| !active_only || asset_type.is_active)
            .cloned()
            .collect();
        result.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(result)
    }
}

/// In-memory request store. The single write lock over requests and events
/// is the per-request serialization point: a stale `expected_version` fails
/// the compare before anything is mutated.
#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, AssetRequest>>,
    events: RwLock<Vec<ApprovalEvent>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<AssetRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn insert(&self, request: AssetRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn commit_transition(
        &self,
        transition: RequestTransition,
    ) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        let mut events = self.events.write().await;

        let Some(request) = requests.get_mut(&transition.request_id.0) else {
            return Err(RepositoryError::Conflict(transition.request_id.0.clone()));
        };
        if request.version != transition.expected_version {
            return Err(RepositoryError::Conflict(transition.request_id.0.clone()));
        }

        request.status = transition.new_status;
        request.current_approval_level = transition.new_level;
        if request.issued_at.is_none() {
            request.issued_at = transition.issued_at;
        }
        request.updated_at = transition.updated_at;
        request.version += 1;

        if let Some(event) = transition.event {
            events.push(event);
        }

        Ok(())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<AssetRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut result: Vec<AssetRequest> = requests
            .values()
            .filter(|request| filter.status.map_or(true, |status| request.status == status))
            .filter(|request| {
                filter
                    .requester_id
                    .as_deref()
                    .map_or(true, |requester_id| request.requester_id == requester_id)
            })
            .cloned()
            .collect();
        result.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(result)
    }

    async fn list_pending(&self) -> Result<Vec<AssetRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut result: Vec<AssetRequest> =
            requests.values().filter(|request| !request.status.is_terminal()).cloned().collect();
        result.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(result)
    }

    async fn history(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| &event.request_id == request_id).cloned().collect())
    }

    async fn counts(&self) -> Result<RequestCounts, RepositoryError> {
        use assetflow_core::domain::request::RequestStatus;

        let requests = self.requests.read().await;
        let mut counts = RequestCounts::default();
        for request in requests.values() {
            counts.total += 1;
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Approved => counts.approved += 1,
                RequestStatus::Denied => counts.denied += 1,
                RequestStatus::Cancelled => counts.cancelled += 1,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use assetflow_core::domain::actor::Actor;
    use assetflow_core::domain::asset_type::{AssetType, AssetTypeId};
    use assetflow_core::domain::history::{ApprovalAction, ApprovalEvent};
    use assetflow_core::domain::request::{AssetRequest, NewRequest, RequestStatus};

    use crate::repositories::{
        AssetTypeRepository, InMemoryAssetTypeRepository, InMemoryRequestRepository,
        RepositoryError, RequestFilter, RequestRepository, RequestTransition,
    };

    fn asset_type() -> AssetType {
        let now = Utc::now();
        AssetType {
            id: AssetTypeId("at-1".to_string()),
            name: "Access Card".to_string(),
            description: "Building access card".to_string(),
            icon: None,
            fields: Vec::new(),
            requires_approval: true,
            approval_levels: vec!["supervisor".to_string()],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(requester_id: &str) -> AssetRequest {
        AssetRequest::submitted(
            NewRequest {
                requester_id: requester_id.to_string(),
                requester_name: "Grace Hopper".to_string(),
                requester_email: "grace@example.com".to_string(),
                requester_department: None,
                asset_type_id: AssetTypeId("at-1".to_string()),
                form_data: json!({}),
            },
            &asset_type(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn asset_type_repo_round_trip() {
        let repo = InMemoryAssetTypeRepository::default();
        let asset_type = asset_type();

        repo.save(asset_type.clone()).await.expect("save");
        let found = repo.find_by_id(&asset_type.id).await.expect("find");

        assert_eq!(found, Some(asset_type));
    }

    #[tokio::test]
    async fn request_repo_round_trip_and_filtering() {
        let repo = InMemoryRequestRepository::default();
        let mine = request("u-1");
        let other = request("u-2");

        repo.insert(mine.clone()).await.expect("insert mine");
        repo.insert(other).await.expect("insert other");

        let found = repo.find_by_id(&mine.id).await.expect("find");
        assert_eq!(found, Some(mine.clone()));

        let filtered = repo
            .list(&RequestFilter {
                requester_id: Some("u-1".to_string()),
                ..RequestFilter::default()
            })
            .await
            .expect("list");
        assert_eq!(filtered, vec![mine]);
    }

    #[tokio::test]
    async fn stale_version_is_rejected_before_any_mutation() {
        let repo = InMemoryRequestRepository::default();
        let request = request("u-1");
        repo.insert(request.clone()).await.expect("insert");

        let approver = Actor::new("u-sup", "Alan Turing", "alan@example.com", "supervisor");
        let transition = |expected_version| RequestTransition {
            request_id: request.id.clone(),
            expected_version,
            new_status: RequestStatus::Approved,
            new_level: 1,
            issued_at: Some(Utc::now()),
            updated_at: Utc::now(),
            event: Some(ApprovalEvent::recorded(
                request.id.clone(),
                &approver,
                ApprovalAction::Approved,
                None,
                0,
                Utc::now(),
            )),
        };

        repo.commit_transition(transition(1)).await.expect("first commit");
        let error = repo.commit_transition(transition(1)).await.expect_err("stale version");
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let history = repo.history(&request.id).await.expect("history");
        assert_eq!(history.len(), 1);

        let stored = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, RequestStatus::Approved);
    }
}
