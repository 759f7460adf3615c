//! Session-authenticated client for the banking REST API.
//!
//! # Overview
//! Logs a user in, carries the bearer credential on every later call, and
//! turns every failure into one normalized `ApiError`.
//!
//! # Design
//! - `BankClient` is stateless: `build_*` produces an `HttpRequest`, `parse_*`
//!   consumes an `HttpResponse`. It never touches the network.
//! - `BankSession` owns a `BankClient`, a `Transport` and a `SessionStore`
//!   and runs each operation as build, dispatch, parse.
//! - The session store is injected, so tests and embedders choose where the
//!   credential and current user live.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use client::BankClient;
pub use config::ClientConfig;
pub use envelope::Operation;
pub use error::{ApiError, FailureKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::BankSession;
pub use store::{MemorySessionStore, SessionStore};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    Account, Acknowledgement, AuditLogEntry, Credential, NewTransaction, NewUser, PasswordChange,
    Role, SessionUser, Transaction, TransactionType, UserRecord, UserStatus, UserUpdate,
};
