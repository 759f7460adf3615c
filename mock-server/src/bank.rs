//! In-memory banking backend state and business rules.
//!
//! Everything here is synchronous and independent of axum; the handlers in
//! `lib.rs` lock the shared `Bank` and call into it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sessions idle for longer than this are dropped on next use.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Consecutive failed logins that lock a user.
pub const MAX_FAILED_LOGINS: u32 = 5;
pub const MIN_PASSWORD_LEN: usize = 6;

/// A rejected request: status plus a plain-text body (possibly empty).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Teller,
    Administrator,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Some(Role::Customer),
            "TELLER" => Some(Role::Teller),
            "ADMIN" | "ADMINISTRATOR" => Some(Role::Administrator),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Teller => "TELLER",
            Role::Administrator => "ADMINISTRATOR",
        }
    }

    pub fn can_search(self) -> bool {
        matches!(self, Role::Teller | Role::Administrator)
    }

    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Administrator)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Active,
    Inactive,
    Locked,
}

impl Status {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Status::Active),
            "INACTIVE" => Some(Status::Inactive),
            "LOCKED" => Some(Status::Locked),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
            Status::Locked => "LOCKED",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub role: Role,
    pub status: Status,
    #[serde(rename = "twoFactorEnabled")]
    pub two_factor_enabled: bool,
    #[serde(skip)]
    password: String,
    #[serde(skip)]
    failed_logins: u32,
}

impl User {
    pub fn new(user_id: &str, username: &str, full_name: &str, role: Role, password: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            role,
            status: Status::Active,
            two_factor_enabled: false,
            password: password.to_string(),
            failed_logins: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "accountNumber")]
    pub account_number: String,
    #[serde(rename = "ownerUserID")]
    pub owner_user_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(rename = "accountType")]
    pub account_type: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(rename = "sourceAccountNumber")]
    pub source_account_number: String,
    #[serde(rename = "targetAccountNumber")]
    pub target_account_number: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub timestamp: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditLog {
    #[serde(rename = "logID")]
    pub log_id: String,
    #[serde(rename = "adminUserID")]
    pub admin_user_id: String,
    pub action: String,
    #[serde(rename = "targetUserID")]
    pub target_user_id: String,
    pub timestamp: String,
}

/// Transaction submission as sent by clients.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "accountNumber")]
    pub account_number: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "targetAccount")]
    pub target_account: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub status: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "twoFactorEnabled")]
    pub two_factor_enabled: Option<bool>,
}

#[derive(Debug)]
struct Session {
    user_id: String,
    last_seen: Instant,
}

#[derive(Debug, Default)]
pub struct Bank {
    users: Vec<User>,
    accounts: Vec<Account>,
    transactions: Vec<TransactionRecord>,
    audit_logs: Vec<AuditLog>,
    sessions: HashMap<String, Session>,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl Bank {
    pub fn new(users: Vec<User>, accounts: Vec<Account>) -> Self {
        Self {
            users,
            accounts,
            ..Default::default()
        }
    }

    /// Fixture data shared by tests and local runs.
    pub fn seeded() -> Self {
        let users = vec![
            User::new("u-admin", "admin", "Ada Admin", Role::Administrator, "admin123"),
            User::new("u-teller", "teller", "Tom Teller", Role::Teller, "teller123"),
            User::new("u-alice", "alice", "Alice Doe", Role::Customer, "password1"),
            User::new("u-bob", "bob", "Bob Roe", Role::Customer, "password2"),
        ];
        let account = |number: &str, owner: &str, cents: i64, kind: &str| Account {
            account_number: number.to_string(),
            owner_user_id: owner.to_string(),
            balance: Decimal::new(cents, 2),
            account_type: kind.to_string(),
        };
        let accounts = vec![
            account("ACC-1001", "u-alice", 50_000, "CHEQUING"),
            account("ACC-1002", "u-alice", 5_000, "SAVINGS"),
            account("ACC-2001", "u-bob", 100_000, "CHEQUING"),
        ];
        Self::new(users, accounts)
    }

    fn user_by_name_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    fn user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn user_by_id_mut(&mut self, user_id: &str) -> Result<&mut User, ApiFailure> {
        self.users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| ApiFailure::not_found("User not found"))
    }

    fn account_mut(&mut self, number: &str) -> Result<&mut Account, ApiFailure> {
        self.accounts
            .iter_mut()
            .find(|a| a.account_number == number)
            .ok_or_else(|| ApiFailure::not_found(format!("Account not found: {number}")))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Verify credentials and open a session. Returns the new token and user.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(String, User), ApiFailure> {
        let user = self
            .user_by_name_mut(username)
            .ok_or_else(|| ApiFailure::unauthorized("Invalid credentials"))?;

        if matches!(user.status, Status::Locked | Status::Inactive) {
            return Err(ApiFailure::unauthorized(format!(
                "Account is locked/inactive ({}). Contact Admin.",
                user.status.as_str()
            )));
        }

        if user.password != password {
            user.failed_logins += 1;
            if user.failed_logins >= MAX_FAILED_LOGINS {
                user.status = Status::Locked;
            }
            return Err(ApiFailure::unauthorized("Invalid credentials"));
        }

        user.failed_logins = 0;
        let user = user.clone();
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                user_id: user.user_id.clone(),
                last_seen: Instant::now(),
            },
        );
        Ok((token, user))
    }

    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Resolve a bearer token to its user, refreshing the idle timer.
    pub fn authenticate(&mut self, token: Option<&str>) -> Result<User, ApiFailure> {
        let token = token.ok_or_else(|| ApiFailure::unauthorized("Invalid session"))?;
        let session = self
            .sessions
            .get_mut(token)
            .ok_or_else(|| ApiFailure::unauthorized("Invalid session"))?;

        if session.last_seen.elapsed() > SESSION_TIMEOUT {
            self.sessions.remove(token);
            return Err(ApiFailure::unauthorized("Session expired"));
        }
        session.last_seen = Instant::now();
        let user_id = session.user_id.clone();

        self.user_by_id(&user_id)
            .cloned()
            .ok_or_else(|| ApiFailure::unauthorized("User not found"))
    }

    pub fn change_password(
        &mut self,
        user_id: &str,
        current: Option<&str>,
        new: Option<&str>,
    ) -> Result<(), ApiFailure> {
        let (Some(current), Some(new)) = (current, new) else {
            return Err(ApiFailure::bad_request(
                "Current password and new password are required",
            ));
        };
        let user = self.user_by_id_mut(user_id)?;
        if user.password != current {
            return Err(ApiFailure::bad_request("Current password is incorrect"));
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiFailure::bad_request(format!(
                "New password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        user.password = new.to_string();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accounts & transactions
    // -----------------------------------------------------------------------

    pub fn accounts_of(&self, user_id: &str) -> Vec<Account> {
        self.accounts
            .iter()
            .filter(|a| a.owner_user_id == user_id)
            .cloned()
            .collect()
    }

    fn owns(&self, user: &User, account_number: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.account_number == account_number && a.owner_user_id == user.user_id)
    }

    pub fn history(
        &self,
        caller: &User,
        account_number: &str,
    ) -> Result<Vec<TransactionRecord>, ApiFailure> {
        if !caller.role.can_search() && !self.owns(caller, account_number) {
            return Err(ApiFailure::forbidden("Access Denied"));
        }
        Ok(self
            .transactions
            .iter()
            .filter(|t| {
                t.source_account_number == account_number
                    || t.target_account_number.as_deref() == Some(account_number)
            })
            .cloned()
            .collect())
    }

    pub fn transact(
        &mut self,
        caller: &User,
        request: TransactionRequest,
    ) -> Result<TransactionRecord, ApiFailure> {
        let amount = request
            .amount
            .ok_or_else(|| ApiFailure::bad_request("Amount is required"))?;
        let kind = match request.kind.as_deref().map(str::to_ascii_uppercase).as_deref() {
            None => return Err(ApiFailure::bad_request("Transaction type is required")),
            Some("DEPOSIT") => TransactionType::Deposit,
            Some("WITHDRAWAL") => TransactionType::Withdrawal,
            Some("TRANSFER") => TransactionType::Transfer,
            Some(_) => return Err(ApiFailure::bad_request("Invalid transaction type")),
        };
        let source = request
            .account_number
            .ok_or_else(|| ApiFailure::bad_request("Account number is required"))?;
        if amount <= Decimal::ZERO {
            return Err(ApiFailure::bad_request("Amount must be positive"));
        }
        self.account_mut(&source)?;
        if caller.role == Role::Customer && !self.owns(caller, &source) {
            return Err(ApiFailure::forbidden("Access Denied"));
        }

        let mut target = None;
        match kind {
            TransactionType::Deposit => {
                self.account_mut(&source)?.balance += amount;
            }
            TransactionType::Withdrawal => {
                let account = self.account_mut(&source)?;
                if account.balance < amount {
                    return Err(insufficient_funds());
                }
                account.balance -= amount;
            }
            TransactionType::Transfer => {
                let to = request
                    .target_account
                    .ok_or_else(|| ApiFailure::bad_request("Target account required for transfer"))?;
                if to == source {
                    return Err(ApiFailure::bad_request("Cannot transfer to the same account"));
                }
                self.account_mut(&to)?;
                let from = self.account_mut(&source)?;
                if from.balance < amount {
                    return Err(insufficient_funds());
                }
                from.balance -= amount;
                self.account_mut(&to)?.balance += amount;
                target = Some(to);
            }
        }

        let record = TransactionRecord {
            transaction_id: Uuid::new_v4().to_string(),
            source_account_number: source,
            target_account_number: target,
            amount,
            kind,
            timestamp: now(),
            status: "COMPLETED".to_string(),
        };
        self.transactions.push(record.clone());
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Administration & search
    // -----------------------------------------------------------------------

    fn audit(&mut self, admin: &User, action: String, target_user_id: &str) {
        self.audit_logs.push(AuditLog {
            log_id: Uuid::new_v4().to_string(),
            admin_user_id: admin.user_id.clone(),
            action,
            target_user_id: target_user_id.to_string(),
            timestamp: now(),
        });
    }

    pub fn create_user(
        &mut self,
        admin: &User,
        request: CreateUserRequest,
    ) -> Result<User, ApiFailure> {
        if self.user_by_name_mut(&request.username).is_some() {
            return Err(ApiFailure::new(
                StatusCode::CONFLICT,
                "Username already exists",
            ));
        }
        let role = request
            .role
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or(Role::Customer);
        let user = User::new(
            &Uuid::new_v4().to_string(),
            &request.username,
            &request.name,
            role,
            &request.password,
        );
        self.users.push(user.clone());
        self.audit(admin, "CREATE_USER".to_string(), &user.user_id);
        Ok(user)
    }

    pub fn update_user(
        &mut self,
        admin: &User,
        user_id: &str,
        request: UpdateUserRequest,
    ) -> Result<(), ApiFailure> {
        self.user_by_id_mut(user_id)?;
        if let Some(status) = request.status {
            let status =
                Status::parse(&status).ok_or_else(|| ApiFailure::bad_request("Invalid Status"))?;
            self.user_by_id_mut(user_id)?.status = status;
            self.audit(admin, format!("UPDATE_STATUS_{}", status.as_str()), user_id);
        }
        if let Some(role) = request.role {
            let role = Role::parse(&role).ok_or_else(|| ApiFailure::bad_request("Invalid Role"))?;
            self.user_by_id_mut(user_id)?.role = role;
            self.audit(admin, format!("UPDATE_ROLE_{}", role.as_str()), user_id);
        }
        if let Some(enabled) = request.two_factor_enabled {
            self.user_by_id_mut(user_id)?.two_factor_enabled = enabled;
            self.audit(admin, format!("TOGGLE_2FA_{enabled}"), user_id);
        }
        Ok(())
    }

    pub fn audit_logs(&self) -> Vec<AuditLog> {
        self.audit_logs.clone()
    }

    /// Case-insensitive substring match on username or full name.
    pub fn search(&self, query: &str) -> Vec<User> {
        let needle = query.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.full_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }
}

fn insufficient_funds() -> ApiFailure {
    ApiFailure::new(StatusCode::UNPROCESSABLE_ENTITY, "Insufficient funds")
}
