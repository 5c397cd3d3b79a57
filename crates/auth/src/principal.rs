use serde::{Deserialize, Serialize};

use policygate_core::PrincipalId;

use crate::Role;

/// The acting identity whose permissions are being evaluated.
///
/// Facade operations take `Option<&Principal>`; `None` is the anonymous
/// principal and is always permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub principal_id: PrincipalId,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(principal_id: PrincipalId) -> Self {
        Self {
            principal_id,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<Role>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }
}
