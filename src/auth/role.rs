//! Roles and the capability table

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// MDA reporting user
    User,
    /// Regular admin
    Admin,
    /// Non-deletable admin with exclusive rights over other admins
    SuperAdmin,
}

/// Everything a principal can be allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    ChangeOwnPassword,
    ViewDashboard,
    ManageMdas,
    ManageUsers,
    ResetUserPasswords,
    ExportData,
    ViewActivities,
    ManageAdmins,
}

const USER_PERMISSIONS: &[Permission] = &[Permission::ViewOwnProfile, Permission::ChangeOwnPassword];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ManageMdas,
    Permission::ManageUsers,
    Permission::ResetUserPasswords,
    Permission::ExportData,
    Permission::ViewActivities,
];

const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[Permission::ManageAdmins];

impl Role {
    /// Permissions granted to this role
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Role::User => USER_PERMISSIONS.to_vec(),
            Role::Admin => ADMIN_PERMISSIONS.to_vec(),
            Role::SuperAdmin => ADMIN_PERMISSIONS
                .iter()
                .chain(SUPER_ADMIN_PERMISSIONS)
                .copied()
                .collect(),
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        match self {
            Role::User => USER_PERMISSIONS.contains(&permission),
            Role::Admin => ADMIN_PERMISSIONS.contains(&permission),
            Role::SuperAdmin => {
                ADMIN_PERMISSIONS.contains(&permission)
                    || SUPER_ADMIN_PERMISSIONS.contains(&permission)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
