//! Pongdang HTTP client
//!
//! An authenticated REST client for the pongdang club backend: session
//! persistence, bearer-token attachment, coalesced token reissue with a
//! single replay, and typed endpoints for the admin screens.

pub mod client;
pub mod types;

pub use client::error::{ClientError, ReissueError};
pub use client::persistence::{
    FileSessionStore, MemorySessionStore, SessionError, SessionStore, StoredSession,
};
pub use client::reissue::AuthFailurePolicy;
pub use client::session::{ListenerId, LogoutReason, SessionManager};
pub use client::{ApiRequest, PongdangClient, PongdangClientBuilder, RequestContext};
