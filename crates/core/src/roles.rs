use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named role and its rank in the hierarchy. Higher levels outrank lower ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLevel {
    pub name: String,
    pub level: u8,
}

impl RoleLevel {
    pub fn new(name: impl Into<String>, level: u8) -> Self {
        Self { name: name.into(), level }
    }
}

/// Strict total order over a small fixed set of roles.
///
/// This is the sole authorization primitive for the approval workflow: an
/// actor may act on a step when their level is at least the step's required
/// level AND at least `min_approver_level`. The second bound keeps the floor
/// role from approving steps even when an asset type is misconfigured to
/// name it as an approval level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleHierarchy {
    levels: HashMap<String, u8>,
    floor: u8,
    min_approver_level: u8,
}

impl RoleHierarchy {
    pub fn new(roles: Vec<RoleLevel>) -> Self {
        let floor = roles.iter().map(|role| role.level).min().unwrap_or(0);
        let levels =
            roles.into_iter().map(|role| (normalize_key(&role.name), role.level)).collect();

        Self { levels, floor, min_approver_level: floor.saturating_add(1) }
    }

    pub fn with_min_approver_level(mut self, min_approver_level: u8) -> Self {
        self.min_approver_level = min_approver_level;
        self
    }

    /// Rank of a role. Unknown roles rank at the floor.
    pub fn level(&self, role: &str) -> u8 {
        self.levels.get(&normalize_key(role)).copied().unwrap_or(self.floor)
    }

    /// Whether `actor_role` may act on a step nominally requiring `required_role`.
    ///
    /// Authorization is "at least", not "exactly": a higher role can clear a
    /// lower role's step.
    pub fn authorizes(&self, actor_role: &str, required_role: &str) -> bool {
        let actor_level = self.level(actor_role);
        actor_level >= self.level(required_role) && actor_level >= self.min_approver_level
    }
}

impl Default for RoleHierarchy {
    fn default() -> Self {
        Self::new(vec![
            RoleLevel::new("employee", 0),
            RoleLevel::new("supervisor", 1),
            RoleLevel::new("admin", 2),
            RoleLevel::new("super_admin", 3),
        ])
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
