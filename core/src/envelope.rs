//! Shared request construction and response validation.
//!
//! # Design
//! Every endpoint goes through the same three steps: build the URL and
//! headers, check the status, decode the body. `Operation` is the catalog
//! entry that parameterizes those steps (method, auth requirement, default
//! error message). Failure bodies are only ever read as text.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{ApiError, FailureKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::Credential;

/// One entry of the endpoint catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Logout,
    GetAccounts,
    GetAccountsByUser,
    GetTransactionHistory,
    MakeTransaction,
    CreateUser,
    UpdateUser,
    UpdatePassword,
    SearchUsers,
    GetAuditLogs,
}

impl Operation {
    pub fn method(self) -> HttpMethod {
        match self {
            Operation::GetAccounts
            | Operation::GetAccountsByUser
            | Operation::GetTransactionHistory
            | Operation::SearchUsers
            | Operation::GetAuditLogs => HttpMethod::Get,
            Operation::UpdateUser => HttpMethod::Patch,
            Operation::Login
            | Operation::Logout
            | Operation::MakeTransaction
            | Operation::CreateUser
            | Operation::UpdatePassword => HttpMethod::Post,
        }
    }

    /// Whether the request carries the bearer credential.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Operation::Login)
    }

    /// Message used when a failure response has an empty body.
    pub fn default_error(self) -> &'static str {
        match self {
            Operation::Login => "Login failed",
            Operation::Logout => "Logout failed",
            Operation::GetAccounts => "Failed to fetch accounts",
            Operation::GetAccountsByUser => "Failed to fetch user accounts",
            Operation::GetTransactionHistory => "Failed to fetch transaction history",
            Operation::MakeTransaction => "Transaction failed",
            Operation::CreateUser => "Failed to create user",
            Operation::UpdateUser => "Failed to update user",
            Operation::UpdatePassword => "Failed to update password",
            Operation::SearchUsers => "Search failed",
            Operation::GetAuditLogs => "Failed to fetch audit logs",
        }
    }
}

/// Value of the authorization header. With no credential the bare scheme is
/// still sent so the backend sees an explicit unauthenticated request.
pub fn bearer_value(credential: Option<&Credential>) -> String {
    match credential {
        Some(c) => format!("Bearer {}", c.as_str()),
        None => "Bearer".to_string(),
    }
}

/// Serialize a request payload to its JSON body.
pub fn json_body<B: Serialize + ?Sized>(payload: &B) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Assemble a request for `operation` against an already-routed `url`.
pub fn build_request(
    operation: Operation,
    url: Url,
    credential: Option<&Credential>,
    body: Option<String>,
) -> HttpRequest {
    let mut headers = Vec::new();
    if body.is_some() {
        headers.push(("content-type".to_string(), "application/json".to_string()));
    }
    if operation.requires_auth() {
        headers.push(("authorization".to_string(), bearer_value(credential)));
    }
    HttpRequest {
        method: operation.method(),
        url: url.into(),
        headers,
        body,
    }
}

/// Turn a non-2xx response into the normalized error for `operation`.
pub fn check_status(operation: Operation, response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let message = if response.body.is_empty() {
        operation.default_error().to_string()
    } else {
        response.body.clone()
    };
    let status = response.status;
    Err(match operation {
        Operation::Login => ApiError::Authentication { status, message },
        _ => ApiError::Request {
            kind: FailureKind::from_status(status),
            status,
            message,
        },
    })
}

/// Validate the status, then decode the JSON body into `T`.
pub fn decode<T: DeserializeOwned>(
    operation: Operation,
    response: &HttpResponse,
) -> Result<T, ApiError> {
    check_status(operation, response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
