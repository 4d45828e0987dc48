//! User administration client methods

use super::{ApiRequest, ClientError, PongdangClient};
use crate::types::{ApprovalEntry, ChangePasswordRequest, UidRef};
use pongdang_core::{Role, Uid, UserSummary};
use serde_json::Value as JsonValue;

/// Password the admin screen resets accounts to
pub const DEFAULT_TEMPORARY_PASSWORD: &str = "1111";

impl PongdangClient {
    /// All users, including ones waiting for approval
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ClientError> {
        self.execute(&ApiRequest::get("/users/getUsers")).await
    }

    /// Save a modified user row. Unknown fields are sent back as received.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn update_user(&self, user: &UserSummary) -> Result<(), ClientError> {
        self.execute_empty(&ApiRequest::patch("/users/update").json(user)?)
            .await
    }

    /// Change a user's role
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn change_role(&self, user: &UserSummary, role: Role) -> Result<(), ClientError> {
        let mut updated = user.clone();
        updated.role = role;
        self.update_user(&updated).await
    }

    /// Overwrite a user's password with a temporary one
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn reset_password(
        &self,
        user: &UserSummary,
        temporary_password: &str,
    ) -> Result<(), ClientError> {
        let mut updated = user.clone();
        updated
            .extra
            .insert("password".into(), JsonValue::from(temporary_password));
        self.update_user(&updated).await
    }

    /// Change the logged-in user's own password
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a session, or the request error
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let profile = self
            .session
            .profile()
            .await?
            .ok_or(ClientError::NotLoggedIn)?;

        let request = ApiRequest::patch("/users/changePassword").json(&ChangePasswordRequest {
            uid: profile.uid,
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        })?;
        self.execute_empty(&request).await
    }

    /// Delete users by uid
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn delete_users(&self, uids: &[Uid]) -> Result<(), ClientError> {
        let body: Vec<UidRef> = uids.iter().cloned().map(|uid| UidRef { uid }).collect();
        self.execute_empty(&ApiRequest::delete("/users/delete").json(&body)?)
            .await
    }

    /// Approve waiting registrations, granting each the given role
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn approve_users(&self, approvals: &[ApprovalEntry]) -> Result<(), ClientError> {
        if approvals.is_empty() {
            return Ok(());
        }
        self.execute_empty(&ApiRequest::put("/admin/approve").json(approvals)?)
            .await
    }
}

impl ApprovalEntry {
    /// Approval for `user` with `role`, or the user's current role
    pub fn for_user(user: &UserSummary, role: Option<Role>) -> Self {
        Self {
            uid: user.uid.clone(),
            user_id: user.user_id.clone(),
            role: role.unwrap_or_else(|| user.role.clone()),
        }
    }
}
