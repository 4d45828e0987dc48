use crate::types::SystemConfigEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried in the user profile and on every user row.
///
/// Parsing is case-insensitive; roles the client does not know about are kept
/// verbatim so they round-trip to the backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Supervisor,
    User,
    Other(String),
}

impl Role {
    /// Role assumed when the backend omits one
    pub const fn default_member() -> Self {
        Self::User
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "ADMIN",
            Self::Supervisor => "SUPERVISOR",
            Self::User => "USER",
            Self::Other(raw) => raw,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Admin => "모든 시스템 설정 및 사용자 관리 권한",
            Self::Supervisor => "일반 사용자 관리 및 제한된 설정 권한",
            Self::User => "기본 사용자 권한",
            Self::Other(_) => "권한 설명 없음",
        }
    }

    /// Whether a user holding `self` may hand out `target`
    pub fn can_grant(&self, target: &Self) -> bool {
        match self {
            Self::Admin => true,
            Self::Supervisor => *target != Self::Admin,
            Self::User | Self::Other(_) => *target == Self::User,
        }
    }

    /// Narrow the role options offered to a user holding `self`
    pub fn assignable_roles<'a>(&self, options: &'a [RoleOption]) -> Vec<&'a RoleOption> {
        options
            .iter()
            .filter(|option| self.can_grant(&option.value))
            .collect()
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "supervisor" => Self::Supervisor,
            "user" => Self::User,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selectable role, built from the `role` system configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOption {
    pub value: Role,
    pub label: String,
}

impl From<&SystemConfigEntry> for RoleOption {
    fn from(entry: &SystemConfigEntry) -> Self {
        Self {
            value: Role::from(entry.config_value.as_str()),
            label: entry.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<RoleOption> {
        [("ADMIN", "관리자"), ("SUPERVISOR", "운영진"), ("USER", "회원")]
            .into_iter()
            .map(|(value, label)| RoleOption {
                value: value.into(),
                label: label.to_string(),
            })
            .collect()
    }

    fn values(list: Vec<&RoleOption>) -> Vec<&str> {
        list.into_iter().map(|o| o.value.as_str()).collect()
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("Supervisor"), Role::Supervisor);
        assert_eq!(Role::from("COACH"), Role::Other("COACH".into()));
        assert_eq!(String::from(Role::Other("COACH".into())), "COACH");
    }

    #[test]
    fn admin_grants_everything() {
        let opts = options();
        assert_eq!(
            values(Role::Admin.assignable_roles(&opts)),
            ["ADMIN", "SUPERVISOR", "USER"]
        );
    }

    #[test]
    fn supervisor_cannot_grant_admin() {
        let opts = options();
        assert_eq!(
            values(Role::Supervisor.assignable_roles(&opts)),
            ["SUPERVISOR", "USER"]
        );
    }

    #[test]
    fn members_only_grant_member() {
        let opts = options();
        assert_eq!(values(Role::User.assignable_roles(&opts)), ["USER"]);
        assert_eq!(
            values(Role::Other("COACH".into()).assignable_roles(&opts)),
            ["USER"]
        );
    }

    #[test]
    fn option_from_system_config() {
        let entry = SystemConfigEntry {
            name: "운영진".into(),
            config_value: "supervisor".into(),
            extra: serde_json::Map::new(),
        };
        let option = RoleOption::from(&entry);
        assert_eq!(option.value, Role::Supervisor);
        assert_eq!(option.label, "운영진");
    }
}
