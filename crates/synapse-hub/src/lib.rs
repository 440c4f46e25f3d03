//! # synapse-hub
//!
//! The server half of federation. [`FederationHub`] verifies bearer tokens,
//! keeps one durable record store and change log per tenant, answers pulls
//! with everything the caller's clock does not cover, and relays accepted
//! pushes to the other live sessions of the same tenant.
//!
//! Each connection is served by its own task ([`serve_connection`]); the
//! [`SessionRegistry`] is the only state shared between them.

pub mod auth;
pub mod connection;
pub mod connector;
pub mod hub;
pub mod registry;

pub use auth::{Claims, Scope, TokenIssuer, TokenVerifier};
pub use connection::serve_connection;
pub use connector::InProcessConnector;
pub use hub::{AuthContext, FederationHub};
pub use registry::{ConnectionId, SessionInfo, SessionRegistry};
