//! Pongdang core types and utilities

pub mod access;
pub mod error;
pub mod settings;
pub mod types;

pub use access::{Role, RoleOption};
pub use error::{CoreError, CoreResult};
pub use settings::{ClientSettings, ReissueSettings};
pub use types::{
    MenuItem, RuntimeConfig, SystemConfigEntry, Uid, UserProfile, UserState, UserSummary,
    pending_approvals,
};
