use serde::{Deserialize, Serialize};

use warden_core::{DomainResult, RoleId};

use crate::Permission;
use crate::validation::{self, DESCRIPTION_MAX, ROLE_NAME_MAX};

/// A named bundle of permissions that can be granted to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Globally unique.
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl Role {
    /// Materialise a validated creation request; new roles start active.
    pub fn from_new(id: RoleId, new: NewRole) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            active: true,
        }
    }

    /// Apply a validated update; unset fields are left untouched.
    pub fn apply(&mut self, update: RoleUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        validation::apply_clearable(&mut self.description, update.description);
        if let Some(active) = update.active {
            self.active = active;
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Request to create a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            name: validation::required("role name", &self.name, ROLE_NAME_MAX)?,
            description: validation::optional("description", self.description, DESCRIPTION_MAX)?,
        })
    }
}

/// Partial role update. `None` means "leave as is"; a blank description
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl RoleUpdate {
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            name: self
                .name
                .map(|n| validation::required("role name", &n, ROLE_NAME_MAX))
                .transpose()?,
            description: validation::clearable("description", self.description, DESCRIPTION_MAX)?,
            active: self.active,
        })
    }
}

/// A role together with the permissions granted through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}
