//! Read-through user cache
//!
//! Authoritative user storage lives in the account service's relational
//! store. The ledger keeps only the copies it was handed, for role checks and
//! the employee-info accessors.

use crate::{crypto, Error, Result};
use chrono::Local;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator
    Admin,
    /// Regular user
    User,
    /// Read-only access
    Viewer,
    /// No access
    None,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
            Role::Viewer => write!(f, "viewer"),
            Role::None => write!(f, "none"),
        }
    }
}

/// Cached user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique username
    pub username: String,
    /// Role
    pub role: Role,
    /// Job position
    pub position: Option<String>,
    /// Whether the employment contract is active
    pub contract_active: bool,
    /// Last profile update
    pub last_update: Option<String>,
    /// Per-user key derived by [`UserDirectory::generate_unique_key`]
    pub unique_key: Option<String>,
}

impl User {
    /// Create new user
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
            position: None,
            contract_active: false,
            last_update: None,
            unique_key: None,
        }
    }

    /// Set position
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Mark the contract as active
    pub fn with_active_contract(mut self) -> Self {
        self.contract_active = true;
        self
    }

    /// Whether the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Employee summary exposed to the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInfo {
    /// Username
    pub username: String,
    /// Job position
    pub position: Option<String>,
    /// Whether the employment contract is active
    pub contract_active: bool,
    /// Last profile update
    pub last_update: Option<String>,
}

impl From<&User> for EmployeeInfo {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            position: user.position.clone(),
            contract_active: user.contract_active,
            last_update: user.last_update.clone(),
        }
    }
}

/// Username → user cache
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl UserDirectory {
    /// Create empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub fn add_user(&self, user: User) {
        self.users.write().insert(user.username.clone(), user);
    }

    /// Look up a user
    pub fn get_user(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }

    /// Number of cached users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Change `target`'s role; only administrators may do this
    ///
    /// The updated user is cached (and returned) even if it was not cached
    /// before.
    pub fn assign_role(&self, admin: &User, target: &User, role: Role) -> Result<User> {
        if !admin.is_admin() {
            return Err(Error::PermissionDenied(format!(
                "{} cannot change roles",
                admin.username
            )));
        }

        let mut updated = self
            .get_user(&target.username)
            .unwrap_or_else(|| target.clone());
        updated.role = role;
        updated.last_update = Some(crate::types::now_timestamp());

        self.add_user(updated.clone());
        Ok(updated)
    }

    /// Derive and store a per-user key: `sha256(username ++ now_iso8601)`
    pub fn generate_unique_key(&self, username: &str) -> Result<String> {
        let mut users = self.users.write();
        let user = users
            .get_mut(username)
            .ok_or_else(|| Error::UserNotFound(username.to_string()))?;

        let key_material = format!(
            "{}{}",
            user.username,
            Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")
        );
        let unique_key = crypto::sha256_hex(key_material.as_bytes());
        user.unique_key = Some(unique_key.clone());

        Ok(unique_key)
    }

    /// Employee summary for one user
    pub fn employee_info(&self, username: &str) -> Option<EmployeeInfo> {
        self.users.read().get(username).map(EmployeeInfo::from)
    }

    /// Employee summaries for every cached user, sorted by username
    pub fn current_employee_info(&self) -> Vec<EmployeeInfo> {
        let mut infos: Vec<EmployeeInfo> =
            self.users.read().values().map(EmployeeInfo::from).collect();
        infos.sort_by(|a, b| a.username.cmp(&b.username));
        infos
    }

    /// Whether `user` may read data under `key`
    ///
    /// Only administrators are granted access.
    pub fn check_access(&self, user: &User, _key: &str) -> bool {
        user.is_admin()
    }
}
