use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FormcapError, Result};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Administrator,
    Editor,
    #[default]
    Viewer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Administrator => "administrator",
            UserRole::Editor => "editor",
            UserRole::Viewer => "viewer",
        }
    }

    pub fn permissions(self) -> Permissions {
        Permissions {
            can_view: true,
            can_edit: matches!(self, UserRole::Administrator | UserRole::Editor),
            can_delete: matches!(self, UserRole::Administrator),
            can_access_settings: matches!(self, UserRole::Administrator | UserRole::Editor),
        }
    }
}

// Anything the backend does not recognise is treated as the least privileged role.
impl From<String> for UserRole {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "administrator" => UserRole::Administrator,
            "editor" => UserRole::Editor,
            _ => UserRole::Viewer,
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_access_settings: bool,
}

/// Who is acting. Passed explicitly into every mutating service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub role: UserRole,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn permissions(&self) -> Permissions {
        self.role.permissions()
    }

    pub fn require_edit(&self) -> Result<()> {
        if self.permissions().can_edit {
            Ok(())
        } else {
            Err(FormcapError::permission_denied(format!(
                "{} ({}) cannot edit",
                self.user_id, self.role
            )))
        }
    }

    pub fn require_delete(&self) -> Result<()> {
        if self.permissions().can_delete {
            Ok(())
        } else {
            Err(FormcapError::permission_denied(format!(
                "{} ({}) cannot delete",
                self.user_id, self.role
            )))
        }
    }
}
