use chrono::Utc;
use uuid::Uuid;

use assetflow_core::domain::asset_type::{AssetType, AssetTypeId, FieldDescriptor, FieldKind};

use crate::repositories::{AssetTypeRepository, RepositoryError};

/// Outcome of loading the default asset types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub created: Vec<String>,
    pub already_seeded: bool,
}

/// The canonical starter catalogue: the four asset types every fresh
/// deployment begins with. Seeding is a no-op when any asset type already
/// exists, so re-running the seed never duplicates or overwrites.
pub struct DefaultAssetTypes;

impl DefaultAssetTypes {
    pub async fn load(repo: &dyn AssetTypeRepository) -> Result<SeedResult, RepositoryError> {
        let existing = repo.list(false).await?;
        if !existing.is_empty() {
            return Ok(SeedResult { created: Vec::new(), already_seeded: true });
        }

        let mut created = Vec::new();
        for asset_type in Self::asset_types() {
            created.push(asset_type.name.clone());
            repo.save(asset_type).await?;
        }

        Ok(SeedResult { created, already_seeded: false })
    }

    pub fn asset_types() -> Vec<AssetType> {
        let now = Utc::now();
        let base = |name: &str, description: &str, icon: &str| AssetType {
            id: AssetTypeId(Uuid::new_v4().to_string()),
            name: name.to_string(),
            description: description.to_string(),
            icon: Some(icon.to_string()),
            fields: Vec::new(),
            requires_approval: true,
            approval_levels: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut gate_pass = base(
            "Gate Pass",
            "Temporary access pass for visitors or contractors",
            "door-open",
        );
        gate_pass.fields = vec![
            text_field("visitorName", "Visitor Name", true),
            text_field("company", "Company/Organization", true),
            textarea_field("purpose", "Purpose of Visit", true),
            date_field("validFrom", "Valid From", true),
            date_field("validUntil", "Valid Until", true),
            select_field(
                "accessAreas",
                "Access Areas",
                true,
                &["Lobby Only", "General Office", "All Areas", "Restricted"],
            ),
        ];
        gate_pass.approval_levels = vec!["supervisor".to_string()];

        let mut software_license = base(
            "Software License",
            "Request for software licenses and subscriptions",
            "key",
        );
        software_license.fields = vec![
            text_field("softwareName", "Software Name", true),
            text_field("version", "Version", false),
            select_field(
                "licenseType",
                "License Type",
                true,
                &["Single User", "Team", "Enterprise", "Floating"],
            ),
            number_field("seats", "Number of Seats", true),
            textarea_field("justification", "Business Justification", true),
            select_field(
                "duration",
                "License Duration",
                true,
                &["Monthly", "Annual", "Perpetual"],
            ),
        ];
        software_license.approval_levels = vec!["supervisor".to_string(), "admin".to_string()];

        let mut hardware_asset = base(
            "Hardware Asset",
            "Request for computer equipment and hardware",
            "laptop",
        );
        hardware_asset.fields = vec![
            select_field(
                "assetCategory",
                "Asset Category",
                true,
                &["Laptop", "Desktop", "Monitor", "Keyboard/Mouse", "Mobile Device", "Other"],
            ),
            textarea_field("specifications", "Specifications", true),
            textarea_field("justification", "Business Justification", true),
            select_field("urgency", "Urgency", true, &["Low", "Medium", "High", "Critical"]),
        ];
        hardware_asset.approval_levels = vec!["supervisor".to_string(), "admin".to_string()];

        let mut access_card = base("Access Card", "Building access card or badge", "credit-card");
        access_card.fields = vec![
            select_field(
                "cardType",
                "Card Type",
                true,
                &["Permanent", "Temporary", "Replacement"],
            ),
            select_field(
                "accessLevel",
                "Access Level",
                true,
                &["Basic", "Standard", "Enhanced", "Full Access"],
            ),
            text_field("buildings", "Buildings", true),
            textarea_field("reason", "Reason for Request", true),
        ];
        access_card.approval_levels = vec!["supervisor".to_string()];

        vec![gate_pass, software_license, hardware_asset, access_card]
    }
}

fn text_field(name: &str, label: &str, required: bool) -> FieldDescriptor {
    field(name, label, FieldKind::Text, required, None)
}

fn textarea_field(name: &str, label: &str, required: bool) -> FieldDescriptor {
    field(name, label, FieldKind::Textarea, required, None)
}

fn date_field(name: &str, label: &str, required: bool) -> FieldDescriptor {
    field(name, label, FieldKind::Date, required, None)
}

fn number_field(name: &str, label: &str, required: bool) -> FieldDescriptor {
    field(name, label, FieldKind::Number, required, None)
}

fn select_field(name: &str, label: &str, required: bool, options: &[&str]) -> FieldDescriptor {
    field(
        name,
        label,
        FieldKind::Select,
        required,
        Some(options.iter().map(|option| option.to_string()).collect()),
    )
}

fn field(
    name: &str,
    label: &str,
    kind: FieldKind,
    required: bool,
    options: Option<Vec<String>>,
) -> FieldDescriptor {
    FieldDescriptor { name: name.to_string(), label: label.to_string(), kind, required, options }
}
