//! Browser chat with the therapist agent: an axum app serving the chat page
//! and a small JSON API over per-visitor sessions.

pub mod page;
pub mod routes;
pub mod session;

pub use routes::{config_error_router, router, AppState};
pub use session::{Session, SessionStore};
