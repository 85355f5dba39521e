//! Client core for a two-realm link-shortening service: session slots, the
//! navigation gate, the link list controller and transient UI feedback.

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod feedback;
pub mod models;
pub mod routes;
pub mod session;
pub mod shell;

mod test_utils;

pub use api::{ApiGateway, HttpGateway};
pub use auth::{AccessGate, AuthFlow, GateDecision, Navigation};
pub use config::ClientConfig;
pub use controller::{LinkController, LinkScope, ListView};
pub use error::{ApiError, AuthError, SessionError};
pub use models::{Principal, Realm, ShortLink};
pub use session::{FileBackend, MemoryBackend, SessionStore};
