//! Authentication and authorization
//!
//! - [`token`]: signed session tokens in two independent namespaces
//! - [`password`]: bcrypt hashing on the blocking pool
//! - [`role`]: closed role enumeration and capability table
//! - [`middleware`]: per-request principal resolution

pub mod middleware;
pub mod password;
pub mod role;
pub mod token;

pub use middleware::{AdminPrincipal, UserPrincipal, admin_auth_middleware, user_auth_middleware};
pub use role::{Permission, Role};
pub use token::{Claims, IssuedToken, PrincipalKind, TokenError, TokenIssuer};
