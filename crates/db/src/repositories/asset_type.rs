use chrono::{DateTime, Utc};
use sqlx::Row;

use assetflow_core::domain::asset_type::{AssetType, AssetTypeId, FieldDescriptor};

use super::{AssetTypeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAssetTypeRepository {
    pool: DbPool,
}

impl SqlAssetTypeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_asset_type(row: &sqlx::sqlite::SqliteRow) -> Result<AssetType, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let icon: Option<String> =
        row.try_get("icon").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let fields_json: String =
        row.try_get("fields").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requires_approval: bool =
        row.try_get("requires_approval").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approval_levels_json: String =
        row.try_get("approval_levels").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let fields: Vec<FieldDescriptor> = serde_json::from_str(&fields_json)
        .map_err(|e| RepositoryError::Decode(format!("asset type fields: {e}")))?;
    let approval_levels: Vec<String> = serde_json::from_str(&approval_levels_json)
        .map_err(|e| RepositoryError::Decode(format!("asset type approval levels: {e}")))?;

    Ok(AssetType {
        id: AssetTypeId(id),
        name,
        description,
        icon,
        fields,
        requires_approval,
        approval_levels,
        is_active,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("timestamp `{raw}`: {e}")))
}

#[async_trait::async_trait]
impl AssetTypeRepository for SqlAssetTypeRepository {
    async fn find_by_id(&self, id: &AssetTypeId) -> Result<Option<AssetType>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, icon, fields, requires_approval,
                    approval_levels, is_active, created_at, updated_at
             FROM asset_type WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_asset_type(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, asset_type: AssetType) -> Result<(), RepositoryError> {
        let fields_json = serde_json::to_string(&asset_type.fields)
            .map_err(|e| RepositoryError::Decode(format!("asset type fields: {e}")))?;
        let approval_levels_json = serde_json::to_string(&asset_type.approval_levels)
            .map_err(|e| RepositoryError::Decode(format!("asset type approval levels: {e}")))?;

        sqlx::query(
            "INSERT INTO asset_type (id, name, description, icon, fields, requires_approval,
                                     approval_levels, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 icon = excluded.icon,
                 fields = excluded.fields,
                 requires_approval = excluded.requires_approval,
                 approval_levels = excluded.approval_levels,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&asset_type.id.0)
        .bind(&asset_type.name)
        .bind(&asset_type.description)
        .bind(&asset_type.icon)
        .bind(&fields_json)
        .bind(asset_type.requires_approval)
        .bind(&approval_levels_json)
        .bind(asset_type.is_active)
        .bind(asset_type.created_at.to_rfc3339())
        .bind(asset_type.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, active_only: bool) -> Result<Vec<AssetType>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if active_only {
            sqlx::query(
                "SELECT id, name, description, icon, fields, requires_approval,
                        approval_levels, is_active, created_at, updated_at
                 FROM asset_type WHERE is_active = 1 ORDER BY name ASC",
            )
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, name, description, icon, fields, requires_approval,
                        approval_levels, is_active, created_at, updated_at
                 FROM asset_type ORDER BY name ASC",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_asset_type).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use assetflow_core::domain::asset_type::{
        AssetType, AssetTypeId, FieldDescriptor, FieldKind,
    };

    use super::SqlAssetTypeRepository;
    use crate::repositories::AssetTypeRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_asset_type(id: &str, name: &str, active: bool) -> AssetType {
        let now = Utc::now();
        AssetType {
            id: AssetTypeId(id.to_string()),
            name: name.to_string(),
            description: "Request for software licenses and subscriptions".to_string(),
            icon: Some("key".to_string()),
            fields: vec![FieldDescriptor {
                name: "softwareName".to_string(),
                label: "Software Name".to_string(),
                kind: FieldKind::Text,
                required: true,
                options: None,
            }],
            requires_approval: true,
            approval_levels: vec!["supervisor".to_string(), "admin".to_string()],
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_fields_and_levels() {
        let pool = setup().await;
        let repo = SqlAssetTypeRepository::new(pool);
        let asset_type = sample_asset_type("at-license", "Software License", true);

        repo.save(asset_type.clone()).await.expect("save");
        let found = repo
            .find_by_id(&AssetTypeId("at-license".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.name, "Software License");
        assert_eq!(found.fields, asset_type.fields);
        assert_eq!(found.approval_levels, asset_type.approval_levels);
    }

    #[tokio::test]
    async fn list_can_exclude_inactive_types() {
        let pool = setup().await;
        let repo = SqlAssetTypeRepository::new(pool);

        repo.save(sample_asset_type("at-1", "Gate Pass", true)).await.expect("save 1");
        repo.save(sample_asset_type("at-2", "Legacy Badge", false)).await.expect("save 2");

        let all = repo.list(false).await.expect("list all");
        assert_eq!(all.len(), 2);

        let active = repo.list(true).await.expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Gate Pass");
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlAssetTypeRepository::new(pool);

        let asset_type = sample_asset_type("at-1", "Gate Pass", true);
        repo.save(asset_type.clone()).await.expect("save");

        let mut updated = asset_type;
        updated.is_active = false;
        updated.updated_at = Utc::now();
        repo.save(updated).await.expect("upsert");

        let found = repo
            .find_by_id(&AssetTypeId("at-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert!(!found.is_active);
    }
}
