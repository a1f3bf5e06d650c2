pub(crate) mod extractors;
pub mod jwt;
pub mod services;

pub use extractors::{AuthUser, CurrentUser, StaffUser};
pub use jwt::JwtKeys;
