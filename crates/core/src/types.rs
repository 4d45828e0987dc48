use crate::access::Role;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Stable identity key the backend uses for "act as this user" calls.
///
/// The backend has returned it both as a number and as a string, so either
/// form is accepted and normalised to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

/// Claims of the logged-in user, cached alongside the tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub birthday: Option<String>,
    pub uid: Uid,
}

/// Account lifecycle state as reported by `/users/getUsers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserState {
    /// `U`: approved and in use
    Active,
    /// `D`: soft-deleted
    Deleted,
    /// `W`: registered, waiting for approval
    Waiting,
    Unknown(String),
}

impl UserState {
    pub fn code(&self) -> &str {
        match self {
            Self::Active => "U",
            Self::Deleted => "D",
            Self::Waiting => "W",
            Self::Unknown(code) => code,
        }
    }

    /// Display label used by the admin screens
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Active => "사용",
            Self::Deleted => "삭제",
            Self::Waiting => "대기",
            Self::Unknown(_) => "알 수 없음",
        }
    }
}

impl From<String> for UserState {
    fn from(code: String) -> Self {
        match code.as_str() {
            "U" => Self::Active,
            "D" => Self::Deleted,
            "W" => Self::Waiting,
            _ => Self::Unknown(code),
        }
    }
}

impl From<UserState> for String {
    fn from(state: UserState) -> Self {
        state.code().to_string()
    }
}

/// One row of the user administration list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub uid: Uid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default = "Role::default_member")]
    pub role: Role,
    #[serde(default)]
    pub birthday: Option<String>,
    pub state: UserState,
    /// Fields the backend sends that the client does not interpret; they are
    /// echoed back unchanged on update.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl UserSummary {
    pub fn is_waiting(&self) -> bool {
        self.state == UserState::Waiting
    }
}

/// Users whose registration still needs approval
pub fn pending_approvals(users: &[UserSummary]) -> Vec<&UserSummary> {
    users.iter().filter(|user| user.is_waiting()).collect()
}

/// Server-delivered configuration, fetched once per client lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Days an access token stays valid on the client
    pub live_access_token: u32,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl RuntimeConfig {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.live_access_token))
    }
}

/// Entry of `/config/get/systemConfig/{kind}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfigEntry {
    pub name: String,
    pub config_value: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Navigation menu node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub uid: Uid,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    /// Role label the menu is limited to; absent for everyone
    pub restricted: Option<String>,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

impl MenuItem {
    /// Depth-first walk over this node and all descendants
    pub fn walk(&self) -> Vec<&MenuItem> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uid_accepts_numbers_and_strings() {
        let a: Uid = serde_json::from_value(json!(42)).unwrap();
        let b: Uid = serde_json::from_value(json!("42")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "42");
    }

    #[test]
    fn profile_uses_camel_case() {
        let profile: UserProfile = serde_json::from_value(json!({
            "userId": "kim",
            "name": "김퐁당",
            "nickname": "퐁",
            "role": "ADMIN",
            "birthday": "1990-01-01",
            "uid": 7
        }))
        .unwrap();

        assert_eq!(profile.user_id, "kim");
        assert_eq!(profile.role, Role::Admin);
        assert_eq!(profile.uid.as_str(), "7");

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["userId"], "kim");
        assert_eq!(back["uid"], "7");
    }

    #[test]
    fn user_state_codes() {
        assert_eq!(UserState::from("W".to_string()), UserState::Waiting);
        assert_eq!(UserState::from("U".to_string()).label(), "사용");
        assert_eq!(
            UserState::from("X".to_string()),
            UserState::Unknown("X".to_string())
        );
        assert_eq!(String::from(UserState::Deleted), "D");
    }

    #[test]
    fn pending_approvals_only_returns_waiting_users() {
        let users: Vec<UserSummary> = serde_json::from_value(json!([
            { "uid": 1, "userId": "a", "name": "A", "state": "U" },
            { "uid": 2, "userId": "b", "name": "B", "state": "W" },
            { "uid": 3, "userId": "c", "name": "C", "state": "D", "phone": "010" }
        ]))
        .unwrap();

        let pending = pending_approvals(&users);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, "b");
        assert_eq!(users[0].role, Role::User);
        assert_eq!(users[2].extra["phone"], "010");
    }

    #[test]
    fn runtime_config_ttl_in_days() {
        let config: RuntimeConfig =
            serde_json::from_value(json!({ "liveAccessToken": 3, "siteName": "퐁당" })).unwrap();
        assert_eq!(config.access_token_ttl(), chrono::Duration::days(3));
        assert_eq!(config.extra["siteName"], "퐁당");
    }

    #[test]
    fn menu_walk_is_depth_first() {
        let menu: MenuItem = serde_json::from_value(json!({
            "uid": 1, "name": "root",
            "children": [
                { "uid": 2, "name": "board", "children": [ { "uid": 3, "name": "notice" } ] },
                { "uid": 4, "name": "lesson" }
            ]
        }))
        .unwrap();

        let names: Vec<_> = menu.walk().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["root", "board", "notice", "lesson"]);
    }

    #[test]
    fn restricted_menu_carries_role_label() {
        let menus: Vec<MenuItem> = serde_json::from_value(json!([
            { "uid": 1, "name": "관리", "restricted": "ADMIN" },
            { "uid": 2, "name": "공지", "restricted": null }
        ]))
        .unwrap();

        assert_eq!(menus[0].restricted.as_deref(), Some("ADMIN"));
        assert_eq!(menus[1].restricted, None);
    }
}
