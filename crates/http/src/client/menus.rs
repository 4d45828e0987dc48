//! Menu API client methods

use super::{ApiRequest, ClientError, PongdangClient};
use pongdang_core::{MenuItem, Uid};

impl PongdangClient {
    /// Menu tree visible to the logged-in user
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn menus(&self) -> Result<Vec<MenuItem>, ClientError> {
        self.execute(&ApiRequest::get("/menu/get")).await
    }

    /// Top-level menus
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn main_menu(&self) -> Result<Vec<MenuItem>, ClientError> {
        self.execute(&ApiRequest::get("/menu/getMain")).await
    }

    /// A single menu and its children
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn menu(&self, uid: &Uid) -> Result<MenuItem, ClientError> {
        self.execute(&ApiRequest::get(format!("/menu/get/{uid}")))
            .await
    }
}
