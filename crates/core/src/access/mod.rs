//! Role model and the rules for who may grant which role

pub mod roles;

pub use roles::{Role, RoleOption};
