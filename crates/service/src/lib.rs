//! Service layer: identity provider, user document store, chat relay and the
//! request handlers that tie them together.
//! - Independent of the web framework; the `server` crate only maps HTTP.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod auth;
pub mod runtime;
pub mod storage;
pub mod chat;
pub mod handlers;

pub use handlers::Handlers;
