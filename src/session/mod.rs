//! Client session store
//!
//! Keeps the user and admin sign-ins of a front end apart, persisted
//! through a pluggable [`TokenStorage`].

mod storage;
mod store;

pub use storage::{FileStorage, MemoryStorage, StorageError, TokenStorage};
pub use store::{
    ADMIN_TOKEN_KEY, SessionError, SessionExpired, SessionStore, USER_TOKEN_KEY, login_path,
    spawn_validity_watch,
};
