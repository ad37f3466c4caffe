use core::str::FromStr;

use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult, PermissionId};

use crate::validation::{
    self, BUTTON_ID_MAX, DESCRIPTION_MAX, MENU_PATH_MAX, PERMISSION_NAME_MAX, TAG_MAX,
};

/// What a permission gates.
///
/// Only `Api` permissions are consulted by runtime checks in practice; menu
/// and button permissions carry UI metadata that this crate stores verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    #[default]
    Api,
    Menu,
    Button,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Api => "api",
            PermissionType::Menu => "menu",
            PermissionType::Button => "button",
        }
    }
}

impl core::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(PermissionType::Api),
            "menu" => Ok(PermissionType::Menu),
            "button" => Ok(PermissionType::Button),
            other => Err(DomainError::validation(format!(
                "permission_type must be one of: api, menu, button (got '{other}')"
            ))),
        }
    }
}

/// The `(resource, action)` pair that runtime checks match on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    pub resource: String,
    pub action: String,
}

impl PermissionKey {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for PermissionKey {
    type Err = DomainError;

    /// Parse `"resource:action"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s
            .split_once(':')
            .ok_or_else(|| DomainError::validation(format!("expected 'resource:action', got '{s}'")))?;
        Ok(Self {
            resource: validation::required("resource", resource, TAG_MAX)?,
            action: validation::required("action", action, TAG_MAX)?,
        })
    }
}

impl<R: Into<String>, A: Into<String>> From<(R, A)> for PermissionKey {
    fn from((resource, action): (R, A)) -> Self {
        Self::new(resource, action)
    }
}

/// A stored permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Globally unique, e.g. `item.write`.
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub permission_type: PermissionType,
    pub menu_path: Option<String>,
    pub button_id: Option<String>,
}

impl Permission {
    /// Materialise a validated creation request under a fresh id.
    pub fn from_new(id: PermissionId, new: NewPermission) -> Self {
        Self {
            id,
            name: new.name,
            resource: new.resource,
            action: new.action,
            description: new.description,
            permission_type: new.permission_type,
            menu_path: new.menu_path,
            button_id: new.button_id,
        }
    }

    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.resource.clone(), self.action.clone())
    }

    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }

    /// Apply a validated update; unset fields are left untouched.
    pub fn apply(&mut self, update: PermissionUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(resource) = update.resource {
            self.resource = resource;
        }
        if let Some(action) = update.action {
            self.action = action;
        }
        validation::apply_clearable(&mut self.description, update.description);
        if let Some(permission_type) = update.permission_type {
            self.permission_type = permission_type;
        }
        validation::apply_clearable(&mut self.menu_path, update.menu_path);
        validation::apply_clearable(&mut self.button_id, update.button_id);
    }
}

/// Request to create a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermission {
    pub name: String,
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permission_type: PermissionType,
    #[serde(default)]
    pub menu_path: Option<String>,
    #[serde(default)]
    pub button_id: Option<String>,
}

impl NewPermission {
    /// An `api` permission with no UI metadata.
    pub fn api(name: impl Into<String>, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            action: action.into(),
            description: None,
            permission_type: PermissionType::Api,
            menu_path: None,
            button_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Turn this into a `menu` permission for `path`.
    pub fn menu(mut self, path: impl Into<String>) -> Self {
        self.permission_type = PermissionType::Menu;
        self.menu_path = Some(path.into());
        self
    }

    /// Turn this into a `button` permission for `button_id`.
    pub fn button(mut self, button_id: impl Into<String>) -> Self {
        self.permission_type = PermissionType::Button;
        self.button_id = Some(button_id.into());
        self
    }

    /// Trim every field and reject empty names, resources and actions.
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            name: validation::required("permission name", &self.name, PERMISSION_NAME_MAX)?,
            resource: validation::required("resource", &self.resource, TAG_MAX)?,
            action: validation::required("action", &self.action, TAG_MAX)?,
            description: validation::optional("description", self.description, DESCRIPTION_MAX)?,
            permission_type: self.permission_type,
            menu_path: validation::optional("menu_path", self.menu_path, MENU_PATH_MAX)?,
            button_id: validation::optional("button_id", self.button_id, BUTTON_ID_MAX)?,
        })
    }
}

/// Partial permission update. `None` means "leave as is"; blank text clears
/// an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permission_type: Option<PermissionType>,
    #[serde(default)]
    pub menu_path: Option<String>,
    #[serde(default)]
    pub button_id: Option<String>,
}

impl PermissionUpdate {
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            name: self
                .name
                .map(|n| validation::required("permission name", &n, PERMISSION_NAME_MAX))
                .transpose()?,
            resource: self
                .resource
                .map(|r| validation::required("resource", &r, TAG_MAX))
                .transpose()?,
            action: self
                .action
                .map(|a| validation::required("action", &a, TAG_MAX))
                .transpose()?,
            description: validation::clearable("description", self.description, DESCRIPTION_MAX)?,
            permission_type: self.permission_type,
            menu_path: validation::clearable("menu_path", self.menu_path, MENU_PATH_MAX)?,
            button_id: validation::clearable("button_id", self.button_id, BUTTON_ID_MAX)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parses_and_displays() {
        let key: PermissionKey = "items:write".parse().unwrap();
        assert_eq!(key, PermissionKey::new("items", "write"));
        assert_eq!(key.to_string(), "items:write");
        assert!("items".parse::<PermissionKey>().is_err());
        assert!("items: ".parse::<PermissionKey>().is_err());
    }

    #[test]
    fn permission_type_is_case_insensitive() {
        assert_eq!("MENU".parse::<PermissionType>().unwrap(), PermissionType::Menu);
        assert!("page".parse::<PermissionType>().is_err());
        assert_eq!(serde_json::to_string(&PermissionType::Button).unwrap(), "\"button\"");
    }

    #[test]
    fn new_permission_rejects_blank_tags() {
        let err = NewPermission::api("item.write", "  ", "write").validate().unwrap_err();
        assert_eq!(err, DomainError::validation("resource must not be empty"));
    }

    #[test]
    fn builders_set_ui_metadata() {
        let p = NewPermission::api("menu.projects", "projects", "view")
            .menu("/project-management")
            .validate()
            .unwrap();
        assert_eq!(p.permission_type, PermissionType::Menu);
        assert_eq!(p.menu_path.as_deref(), Some("/project-management"));

        let b = NewPermission::api("btn.create", "projects", "create").button("create-project");
        assert_eq!(b.permission_type, PermissionType::Button);
        assert_eq!(b.button_id.as_deref(), Some("create-project"));
    }

    #[test]
    fn apply_ignores_unset_fields() {
        let mut p = Permission::from_new(
            PermissionId::new(),
            NewPermission::api("item.read", "items", "read")
                .with_description("read items")
                .validate()
                .unwrap(),
        );
        p.apply(
            PermissionUpdate {
                action: Some("list".into()),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        );
        assert_eq!(p.name, "item.read");
        assert_eq!(p.action, "list");
        assert_eq!(p.description.as_deref(), Some("read items"));
        assert!(p.matches("items", "list"));
    }

    #[test]
    fn ui_metadata_is_bounded() {
        let base = || NewPermission::api("menu.reports", "reports", "view");
        assert!(base().with_description("d".repeat(255)).validate().is_ok());
        assert!(base().with_description("d".repeat(256)).validate().is_err());
        assert!(base().menu("/".repeat(200)).validate().is_ok());
        assert!(base().menu("/".repeat(201)).validate().is_err());
        assert!(base().button("b".repeat(100)).validate().is_ok());
        assert!(base().button("b".repeat(101)).validate().is_err());

        let update = |menu_path: String| PermissionUpdate {
            menu_path: Some(menu_path),
            ..Default::default()
        };
        assert!(update("/".repeat(201)).validate().is_err());
        assert!(PermissionUpdate {
            button_id: Some("b".repeat(101)),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(PermissionUpdate {
            description: Some("d".repeat(256)),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn blank_update_clears_ui_metadata() {
        let mut p = Permission::from_new(
            PermissionId::new(),
            NewPermission::api("menu.reports", "reports", "view")
                .with_description("reports menu")
                .menu("/reports")
                .validate()
                .unwrap(),
        );
        p.apply(
            PermissionUpdate {
                description: Some("  ".into()),
                menu_path: Some(" ".into()),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        );
        assert_eq!(p.description, None);
        assert_eq!(p.menu_path, None);
        assert_eq!(p.permission_type, PermissionType::Menu);
    }
}
