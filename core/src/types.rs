//! Domain DTOs for the banking API.
//!
//! # Design
//! These types mirror the backend's JSON (camelCase, with the backend's own
//! `userID`/`ownerUserID` spellings) but are defined independently of the mock
//! server; integration tests catch schema drift. Response types keep any field
//! they do not model in a flattened `extra` map so that nothing the backend
//! sends is lost on a round-trip through the session store.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque bearer token identifying an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// The authenticated principal, as returned by the login endpoint.
///
/// `username` is always populated once stored: when the backend omits it the
/// session fills in the name the user logged in with. Every other field,
/// `role` and `fullName` included, is kept exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub token: String,
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionUser {
    pub fn credential(&self) -> Credential {
        Credential::new(self.token.clone())
    }

    /// The backend's identifier for this user, if it sent one.
    ///
    /// Numeric ids are rendered as strings.
    pub fn user_id(&self) -> Option<String> {
        ["userId", "userID", "id"]
            .iter()
            .find_map(|key| match self.extra.get(*key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    /// The role as sent, when it is a string.
    pub fn role(&self) -> Option<&str> {
        self.extra.get("role")?.as_str()
    }

    pub fn full_name(&self) -> Option<&str> {
        self.extra.get("fullName")?.as_str()
    }

    /// The role parsed into a known variant. Unknown roles yield `None`.
    pub fn parsed_role(&self) -> Option<Role> {
        self.role().and_then(|r| r.parse().ok())
    }
}

/// Role of a bank user. Access control is enforced by the backend only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Teller,
    #[serde(alias = "ADMIN")]
    Administrator,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Role::Customer),
            "TELLER" => Ok(Role::Teller),
            "ADMIN" | "ADMINISTRATOR" => Ok(Role::Administrator),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

/// A bank account. Never mutated locally; always re-fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "accountNumber")]
    pub account_number: String,
    #[serde(rename = "ownerUserID", alias = "ownerUserId", default)]
    pub owner_user_id: Option<String>,
    pub balance: Decimal,
    #[serde(
        rename = "accountType",
        alias = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A recorded transaction. Id and timestamp are assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transactionID", alias = "transactionId", alias = "id", default)]
    pub transaction_id: Option<String>,
    #[serde(rename = "sourceAccountNumber")]
    pub source_account_number: String,
    #[serde(rename = "targetAccountNumber", default)]
    pub target_account_number: Option<String>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body for submitting a deposit, withdrawal or transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(rename = "accountNumber")]
    pub account_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "targetAccount", skip_serializing_if = "Option::is_none", default)]
    pub target_account: Option<String>,
}

impl NewTransaction {
    pub fn deposit(account_number: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind: TransactionType::Deposit,
            account_number: account_number.into(),
            amount,
            target_account: None,
        }
    }

    pub fn withdrawal(account_number: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind: TransactionType::Withdrawal,
            account_number: account_number.into(),
            amount,
            target_account: None,
        }
    }

    pub fn transfer(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            kind: TransactionType::Transfer,
            account_number: from.into(),
            amount,
            target_account: Some(to.into()),
        }
    }
}

/// A user as seen by search and admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "userID", alias = "userId", alias = "id", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "twoFactorEnabled", default)]
    pub two_factor_enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body for the admin create-user endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<Role>,
}

/// Partial update for the admin update-user endpoint. Only the fields present
/// in the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "twoFactorEnabled", skip_serializing_if = "Option::is_none")]
    pub two_factor_enabled: Option<bool>,
}

/// Body for the change-password endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// One administrative action recorded by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(rename = "logID", alias = "logId", alias = "id", default)]
    pub log_id: Option<String>,
    #[serde(rename = "adminUserID", alias = "adminUserId", alias = "actor", default)]
    pub actor: Option<String>,
    pub action: String,
    #[serde(rename = "targetUserID", alias = "targetId", alias = "target", default)]
    pub target: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `{"message": ...}` body returned by mutating endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
