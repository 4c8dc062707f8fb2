pub mod auth;

pub use auth::{AdminUser, AuthUser, Claims, Identity};
