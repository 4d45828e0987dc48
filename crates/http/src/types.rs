//! Request and response bodies exchanged with the backend

use pongdang_core::{Role, Uid, UserProfile};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair as the backend spells it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

/// Login response: the token pair plus the profile fields at top level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: TokenPair,
    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Body of both `/users/reissue` and `/users/logout`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenRequest {
    pub user_id: String,
    pub token: TokenPair,
}

/// Reissue response. Fields are optional so a missing access token can be
/// reported as a format error instead of a generic decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct ReissueResponse {
    #[serde(default)]
    pub token: Option<ReissuedToken>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReissuedToken {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Self-registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub user_id: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
}

/// Password change for the logged-in user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub uid: Uid,
    pub current_password: String,
    pub new_password: String,
}

/// One entry of `/admin/approve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalEntry {
    pub uid: Uid,
    pub user_id: String,
    pub role: Role,
}

/// One entry of `/users/delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UidRef {
    pub uid: Uid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_response_flattens_profile() {
        let response: LoginResponse = serde_json::from_value(json!({
            "token": { "accessToken": "A1", "refreshToken": "R1" },
            "userId": "kim",
            "name": "김퐁당",
            "nickname": "퐁",
            "role": "USER",
            "birthday": null,
            "uid": 11
        }))
        .unwrap();

        assert_eq!(response.token.access_token, "A1");
        assert_eq!(response.profile.uid.as_str(), "11");
        assert_eq!(response.profile.birthday, None);
    }

    #[test]
    fn reissue_response_tolerates_missing_token() {
        let empty: ReissueResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.token.is_none());

        let partial: ReissueResponse =
            serde_json::from_value(json!({ "token": { "refreshToken": "R2" } })).unwrap();
        assert!(partial.token.unwrap().access_token.is_none());
    }

    #[test]
    fn session_token_request_shape() {
        let body = SessionTokenRequest {
            user_id: "kim".into(),
            token: TokenPair {
                access_token: "A".into(),
                refresh_token: "R".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "userId": "kim", "token": { "accessToken": "A", "refreshToken": "R" } })
        );
    }
}
