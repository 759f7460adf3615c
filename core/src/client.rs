//! Stateless HTTP request builder and response parser for the banking API.
//!
//! # Design
//! `BankClient` holds only the base address. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The credential is an explicit argument to
//! every authenticated builder, so the caller decides which credential a
//! request carries at the moment it is built.

use serde_json::{Map, Value};
use url::Url;

use crate::envelope::{build_request, check_status, decode, json_body, Operation};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{
    Account, Acknowledgement, AuditLogEntry, Credential, NewTransaction, NewUser,
    PasswordChange, SessionUser, Transaction, UserRecord, UserUpdate,
};

/// Synchronous, stateless client for the banking API.
#[derive(Debug, Clone)]
pub struct BankClient {
    base_url: Url,
}

impl BankClient {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(format!(
                "{base_url}: cannot carry a path"
            )));
        }
        Ok(Self { base_url: url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base address plus `segments`, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn build_login(&self, username: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = json_body(&serde_json::json!({
            "username": username,
            "password": password,
        }))?;
        Ok(build_request(
            Operation::Login,
            self.endpoint(&["login"]),
            None,
            Some(body),
        ))
    }

    /// Decode a login response. A missing or empty `username` is filled in
    /// from the name the user logged in with.
    pub fn parse_login(
        &self,
        response: HttpResponse,
        username: &str,
    ) -> Result<SessionUser, ApiError> {
        let mut payload: Map<String, Value> = decode(Operation::Login, &response)?;
        let has_username = matches!(payload.get("username"), Some(Value::String(s)) if !s.is_empty());
        if !has_username {
            payload.insert("username".to_string(), Value::String(username.to_string()));
        }
        serde_json::from_value(Value::Object(payload))
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn build_logout(&self, credential: Option<&Credential>) -> HttpRequest {
        build_request(
            Operation::Logout,
            self.endpoint(&["logout"]),
            credential,
            None,
        )
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(Operation::Logout, &response)
    }

    pub fn build_update_password(
        &self,
        credential: Option<&Credential>,
        current_password: &str,
        new_password: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = json_body(&PasswordChange {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        })?;
        Ok(build_request(
            Operation::UpdatePassword,
            self.endpoint(&["change-password"]),
            credential,
            Some(body),
        ))
    }

    pub fn parse_update_password(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        decode(Operation::UpdatePassword, &response)
    }

    // -----------------------------------------------------------------------
    // Accounts & transactions
    // -----------------------------------------------------------------------

    pub fn build_get_accounts(&self, credential: Option<&Credential>) -> HttpRequest {
        build_request(
            Operation::GetAccounts,
            self.endpoint(&["accounts"]),
            credential,
            None,
        )
    }

    pub fn parse_get_accounts(&self, response: HttpResponse) -> Result<Vec<Account>, ApiError> {
        decode(Operation::GetAccounts, &response)
    }

    pub fn build_get_accounts_by_user(
        &self,
        credential: Option<&Credential>,
        user_id: &str,
    ) -> HttpRequest {
        build_request(
            Operation::GetAccountsByUser,
            self.endpoint(&["accounts", "user", user_id]),
            credential,
            None,
        )
    }

    pub fn parse_get_accounts_by_user(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Account>, ApiError> {
        decode(Operation::GetAccountsByUser, &response)
    }

    pub fn build_get_transaction_history(
        &self,
        credential: Option<&Credential>,
        account_number: &str,
    ) -> HttpRequest {
        build_request(
            Operation::GetTransactionHistory,
            self.endpoint(&["transactions", account_number]),
            credential,
            None,
        )
    }

    pub fn parse_get_transaction_history(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<Transaction>, ApiError> {
        decode(Operation::GetTransactionHistory, &response)
    }

    pub fn build_make_transaction(
        &self,
        credential: Option<&Credential>,
        input: &NewTransaction,
    ) -> Result<HttpRequest, ApiError> {
        Ok(build_request(
            Operation::MakeTransaction,
            self.endpoint(&["transaction"]),
            credential,
            Some(json_body(input)?),
        ))
    }

    pub fn parse_make_transaction(
        &self,
        response: HttpResponse,
    ) -> Result<Acknowledgement, ApiError> {
        decode(Operation::MakeTransaction, &response)
    }

    // -----------------------------------------------------------------------
    // Administration & search
    // -----------------------------------------------------------------------

    pub fn build_create_user(
        &self,
        credential: Option<&Credential>,
        input: &NewUser,
    ) -> Result<HttpRequest, ApiError> {
        Ok(build_request(
            Operation::CreateUser,
            self.endpoint(&["admin", "create-user"]),
            credential,
            Some(json_body(input)?),
        ))
    }

    pub fn parse_create_user(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        decode(Operation::CreateUser, &response)
    }

    pub fn build_update_user(
        &self,
        credential: Option<&Credential>,
        user_id: &str,
        input: &UserUpdate,
    ) -> Result<HttpRequest, ApiError> {
        Ok(build_request(
            Operation::UpdateUser,
            self.endpoint(&["admin", "users", user_id]),
            credential,
            Some(json_body(input)?),
        ))
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        decode(Operation::UpdateUser, &response)
    }

    /// `q` is percent-encoded with `%20` for spaces, never `+`.
    pub fn build_search_users(&self, credential: Option<&Credential>, query: &str) -> HttpRequest {
        let mut url = self.endpoint(&["search"]);
        url.set_query(Some(&format!("q={}", urlencoding::encode(query))));
        build_request(Operation::SearchUsers, url, credential, None)
    }

    pub fn parse_search_users(&self, response: HttpResponse) -> Result<Vec<UserRecord>, ApiError> {
        decode(Operation::SearchUsers, &response)
    }

    pub fn build_get_audit_logs(&self, credential: Option<&Credential>) -> HttpRequest {
        build_request(
            Operation::GetAuditLogs,
            self.endpoint(&["admin", "audit-logs"]),
            credential,
            None,
        )
    }

    pub fn parse_get_audit_logs(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<AuditLogEntry>, ApiError> {
        decode(Operation::GetAuditLogs, &response)
    }
}
