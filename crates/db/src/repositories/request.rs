use chrono::{DateTime, Utc};
use sqlx::Row;

use assetflow_core::domain::asset_type::AssetTypeId;
use assetflow_core::domain::history::{ApprovalAction, ApprovalEvent};
use assetflow_core::domain::request::{AssetRequest, RequestId, RequestStatus};

use super::{
    RepositoryError, RequestCounts, RequestFilter, RequestRepository, RequestTransition,
};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> RequestStatus {
    match s {
        "approved" => RequestStatus::Approved,
        "denied" => RequestStatus::Denied,
        "cancelled" => RequestStatus::Cancelled,
        _ => RequestStatus::Pending,
    }
}

pub fn status_as_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "pending",
        RequestStatus::Approved => "approved",
        RequestStatus::Denied => "denied",
        RequestStatus::Cancelled => "cancelled",
    }
}

fn parse_action(s: &str) -> ApprovalAction {
    match s {
        "denied" => ApprovalAction::Denied,
        _ => ApprovalAction::Approved,
    }
}

fn action_as_str(action: ApprovalAction) -> &'static str {
    match action {
        ApprovalAction::Approved => "approved",
        ApprovalAction::Denied => "denied",
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("timestamp `{raw}`: {e}")))
}

const REQUEST_COLUMNS: &str = "id, requester_id, requester_name, requester_email, \
     requester_department, asset_type_id, asset_type_name, form_data, status, \
     current_approval_level, total_approval_levels, issued_at, created_at, updated_at, version";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<AssetRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_name: String =
        row.try_get("requester_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_email: String =
        row.try_get("requester_email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_department: Option<String> =
        row.try_get("requester_department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let asset_type_id: String =
        row.try_get("asset_type_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let asset_type_name: String =
        row.try_get("asset_type_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let form_data_json: String =
        row.try_get("form_data").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approval_level: i64 = row
        .try_get("current_approval_level")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_approval_levels: i64 = row
        .try_get("total_approval_levels")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let issued_at_str: Option<String> =
        row.try_get("issued_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let version: i64 =
        row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let form_data = serde_json::from_str(&form_data_json)
        .map_err(|e| RepositoryError::Decode(format!("form data: {e}")))?;
    let issued_at = issued_at_str.as_deref().map(parse_timestamp).transpose()?;

    Ok(AssetRequest {
        id: RequestId(id),
        requester_id,
        requester_name,
        requester_email,
        requester_department,
        asset_type_id: AssetTypeId(asset_type_id),
        asset_type_name,
        form_data,
        status: parse_status(&status_str),
        current_approval_level: current_approval_level as u32,
        total_approval_levels: total_approval_levels as u32,
        issued_at,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
        version,
    })
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalEvent, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_name: String =
        row.try_get("approver_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_email: String =
        row.try_get("approver_email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_role: String =
        row.try_get("approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_str: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level: i64 = row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalEvent {
        id,
        request_id: RequestId(request_id),
        approver_id,
        approver_name,
        approver_email,
        approver_role,
        action: parse_action(&action_str),
        comment,
        level: level as u32,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<AssetRequest>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM request WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, request: AssetRequest) -> Result<(), RepositoryError> {
        let form_data_json = serde_json::to_string(&request.form_data)
            .map_err(|e| RepositoryError::Decode(format!("form data: {e}")))?;

        sqlx::query(
            "INSERT INTO request (id, requester_id, requester_name, requester_email,
                                  requester_department, asset_type_id, asset_type_name,
                                  form_data, status, current_approval_level,
                                  total_approval_levels, issued_at, created_at, updated_at,
                                  version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.requester_id)
        .bind(&request.requester_name)
        .bind(&request.requester_email)
        .bind(&request.requester_department)
        .bind(&request.asset_type_id.0)
        .bind(&request.asset_type_name)
        .bind(&form_data_json)
        .bind(status_as_str(request.status))
        .bind(request.current_approval_level as i64)
        .bind(request.total_approval_levels as i64)
        .bind(request.issued_at.map(|dt| dt.to_rfc3339()))
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .bind(request.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn commit_transition(
        &self,
        transition: RequestTransition,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE request
             SET status = ?, current_approval_level = ?,
                 issued_at = COALESCE(?, issued_at),
                 updated_at = ?, version = version + 1
             WHERE id = ? AND version = ?",
        )
        .bind(status_as_str(transition.new_status))
        .bind(transition.new_level as i64)
        .bind(transition.issued_at.map(|dt| dt.to_rfc3339()))
        .bind(transition.updated_at.to_rfc3339())
        .bind(&transition.request_id.0)
        .bind(transition.expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict(transition.request_id.0.clone()));
        }

        if let Some(event) = &transition.event {
            sqlx::query(
                "INSERT INTO approval_event (id, request_id, approver_id, approver_name,
                                             approver_email, approver_role, action, comment,
                                             level, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&event.id)
            .bind(&event.request_id.0)
            .bind(&event.approver_id)
            .bind(&event.approver_name)
            .bind(&event.approver_email)
            .bind(&event.approver_role)
            .bind(action_as_str(event.action))
            .bind(&event.comment)
            .bind(event.level as i64)
            .bind(event.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<AssetRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            match (filter.status, filter.requester_id.as_deref()) {
                (Some(status), Some(requester_id)) => {
                    sqlx::query(&format!(
                        "SELECT {REQUEST_COLUMNS} FROM request
                         WHERE status = ? AND requester_id = ?
                         ORDER BY created_at DESC"
                    ))
                    .bind(status_as_str(status))
                    .bind(requester_id)
                    .fetch_all(&self.pool)
                    .await?
                }
                (Some(status), None) => {
                    sqlx::query(&format!(
                        "SELECT {REQUEST_COLUMNS} FROM request
                         WHERE status = ? ORDER BY created_at DESC"
                    ))
                    .bind(status_as_str(status))
                    .fetch_all(&self.pool)
                    .await?
                }
                (None, Some(requester_id)) => {
                    sqlx::query(&format!(
                        "SELECT {REQUEST_COLUMNS} FROM request
                         WHERE requester_id = ? ORDER BY created_at DESC"
                    ))
                    .bind(requester_id)
                    .fetch_all(&self.pool)
                    .await?
                }
                (None, None) => {
                    sqlx::query(&format!(
                        "SELECT {REQUEST_COLUMNS} FROM request ORDER BY created_at DESC"
                    ))
                    .fetch_all(&self.pool)
                    .await?
                }
            };

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    async fn list_pending(&self) -> Result<Vec<AssetRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM request
             WHERE status = 'pending' ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    async fn history(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalEvent>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, request_id, approver_id, approver_name, approver_email, approver_role,
                    action, comment, level, created_at
             FROM approval_event
             WHERE request_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()
    }

    async fn counts(&self) -> Result<RequestCounts, RepositoryError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM request GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = RequestCounts::default();
        for row in rows {
            let status: String =
                row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let count: i64 =
                row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let count = count as u64;

            counts.total += count;
            match parse_status(&status) {
                RequestStatus::Pending => counts.pending += count,
                RequestStatus::Approved => counts.approved += count,
                RequestStatus::Denied => counts.denied += count,
                RequestStatus::Cancelled => counts.cancelled += count,
            }
        }

        Ok(counts)
    }
}
