use serde::{Deserialize, Serialize};

/// The user performing an approval action. The role is resolved by the
/// caller from its user directory; the workflow only needs the value at
/// call time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Actor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into(), role: role.into() }
    }
}
