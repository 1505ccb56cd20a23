use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetTypeId(pub String);

impl std::fmt::Display for AssetTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Select,
    Textarea,
}

/// Descriptor for one input field on a request form. The workflow treats
/// submitted values opaquely beyond the checks in `validate_form_data`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Configuration for one kind of requestable asset: the form it carries and
/// the ordered roles that must approve it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetType {
    pub id: AssetTypeId,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    pub requires_approval: bool,
    pub approval_levels: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssetType {
    pub fn total_approval_levels(&self) -> u32 {
        self.approval_levels.len() as u32
    }

    /// Role required at a given approval step, if the step exists.
    pub fn required_role_at(&self, level: u32) -> Option<&str> {
        self.approval_levels.get(level as usize).map(String::as_str)
    }

    /// Validate submitted form data against this type's field descriptors.
    ///
    /// Required fields must be present and non-empty, select values must be
    /// one of the declared options, and submitted keys must name declared
    /// fields. All problems are reported in one `Validation` error.
    pub fn validate_form_data(&self, form_data: &Value) -> Result<(), WorkflowError> {
        let Some(submitted) = form_data.as_object() else {
            return Err(WorkflowError::validation("form data must be a JSON object"));
        };

        let mut problems = Vec::new();

        for field in &self.fields {
            let value = submitted.get(&field.name);
            if field.required && !has_value(value) {
                problems.push(format!("missing required field `{}`", field.name));
                continue;
            }

            if let (FieldKind::Select, Some(value)) = (field.kind, value) {
                if let (Some(options), Some(chosen)) = (&field.options, value.as_str()) {
                    if !options.iter().any(|option| option == chosen) {
                        problems.push(format!(
                            "field `{}` value `{chosen}` is not one of the declared options",
                            field.name
                        ));
                    }
                }
            }
        }

        for key in submitted.keys() {
            if !self.fields.iter().any(|field| &field.name == key) {
                problems.push(format!("unknown field `{key}`"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::validation(problems.join("; ")))
        }
    }
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(_) => true,
    }
}
