//! Auth module: three-layer architecture (domain, repository, service).
//!
//! This is the identity provider used by the request handlers: it creates
//! identities and verifies username/password pairs. Credentials are re-checked
//! on every request; there are no sessions.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
