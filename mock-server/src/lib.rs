//! In-memory banking backend used by the client's integration tests.
//!
//! All routes live under `/api`. Failures are answered with a plain-text body
//! (empty for admin-only routes hit by non-admins) so clients exercise their
//! body-or-default message handling.

pub mod bank;

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub use bank::{
    Account, ApiFailure, AuditLog, Bank, CreateUserRequest, Role, Status, TransactionRecord,
    TransactionRequest, UpdateUserRequest, User,
};

pub type Db = Arc<RwLock<Bank>>;

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Router over the seeded fixture data.
pub fn app() -> Router {
    app_with(Bank::seeded())
}

pub fn app_with(bank: Bank) -> Router {
    let db: Db = Arc::new(RwLock::new(bank));
    let api = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/accounts", get(get_accounts))
        .route("/accounts/user/{user_id}", get(get_accounts_by_user))
        .route(
            "/transactions/{account_number}",
            get(get_transaction_history),
        )
        .route("/transaction", post(make_transaction))
        .route("/admin/create-user", post(create_user))
        .route("/admin/users/{user_id}", patch(update_user))
        .route("/admin/audit-logs", get(get_audit_logs))
        .route("/search", get(search_users))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Token from an `Authorization: Bearer <token>` header, if any.
fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn forbidden_silently() -> ApiFailure {
    ApiFailure::forbidden("")
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let (token, user) = db
        .write()
        .await
        .login(&input.username, &input.password)
        .inspect_err(|e| {
            tracing::info!(username = %input.username, reason = %e.message, "login rejected")
        })?;
    tracing::info!(username = %user.username, "login succeeded");
    Ok(Json(json!({
        "token": token,
        "role": user.role,
        "fullName": user.full_name,
        "username": user.username,
        "userId": user.user_id,
        "message": "Login successful",
    })))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer(&headers) {
        db.write().await.logout(token);
    }
    Json(json!({ "message": "Logged out" }))
}

#[derive(Deserialize)]
struct PasswordChangeRequest {
    #[serde(rename = "currentPassword")]
    current_password: Option<String>,
    #[serde(rename = "newPassword")]
    new_password: Option<String>,
}

async fn change_password(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<PasswordChangeRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let mut bank = db.write().await;
    let user = bank.authenticate(bearer(&headers))?;
    bank.change_password(
        &user.user_id,
        input.current_password.as_deref(),
        input.new_password.as_deref(),
    )?;
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

async fn get_accounts(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>, ApiFailure> {
    let mut bank = db.write().await;
    let user = bank.authenticate(bearer(&headers))?;
    Ok(Json(bank.accounts_of(&user.user_id)))
}

async fn get_accounts_by_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Account>>, ApiFailure> {
    let mut bank = db.write().await;
    let caller = bank.authenticate(bearer(&headers))?;
    if !caller.role.can_search() {
        return Err(ApiFailure::forbidden("Access Denied"));
    }
    Ok(Json(bank.accounts_of(&user_id)))
}

async fn get_transaction_history(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(account_number): Path<String>,
) -> Result<Json<Vec<TransactionRecord>>, ApiFailure> {
    let mut bank = db.write().await;
    let caller = bank.authenticate(bearer(&headers))?;
    Ok(Json(bank.history(&caller, &account_number)?))
}

async fn make_transaction(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<TransactionRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let mut bank = db.write().await;
    let caller = bank.authenticate(bearer(&headers))?;
    let record = bank.transact(&caller, input)?;
    tracing::info!(
        id = %record.transaction_id,
        kind = ?record.kind,
        amount = %record.amount,
        "transaction recorded"
    );
    Ok(Json(json!({
        "message": "Transaction Successful",
        "transactionID": record.transaction_id,
    })))
}

async fn create_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    let mut bank = db.write().await;
    let admin = bank.authenticate(bearer(&headers))?;
    if !admin.role.can_manage_users() {
        return Err(forbidden_silently());
    }
    let user = bank.create_user(&admin, input)?;
    tracing::info!(username = %user.username, role = ?user.role, "user created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "userId": user.user_id,
        })),
    ))
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let mut bank = db.write().await;
    let admin = bank.authenticate(bearer(&headers))?;
    if !admin.role.can_manage_users() {
        return Err(forbidden_silently());
    }
    bank.update_user(&admin, &user_id, input)?;
    Ok(Json(json!({ "message": "User updated successfully" })))
}

async fn get_audit_logs(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Vec<AuditLog>>, ApiFailure> {
    let mut bank = db.write().await;
    let admin = bank.authenticate(bearer(&headers))?;
    if !admin.role.can_manage_users() {
        return Err(forbidden_silently());
    }
    Ok(Json(bank.audit_logs()))
}

async fn search_users(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<User>>, ApiFailure> {
    let mut bank = db.write().await;
    let caller = bank.authenticate(bearer(&headers))?;
    if !caller.role.can_search() {
        return Err(ApiFailure::forbidden(
            "Access Denied: Insufficient Permissions",
        ));
    }
    let query = params
        .get("q")
        .or_else(|| params.get("query"))
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiFailure::bad_request("Search query is required"))?;
    Ok(Json(bank.search(query)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer".parse().unwrap());
        assert_eq!(bearer(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc-123".parse().unwrap());
        assert_eq!(bearer(&headers), Some("abc-123"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer(&headers), None);
    }

    #[test]
    fn failure_response_carries_plain_text() {
        let response = ApiFailure::new(StatusCode::UNPROCESSABLE_ENTITY, "Insufficient funds")
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn login_request_tolerates_missing_fields() {
        let input: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(input.username.is_empty());
        assert!(input.password.is_empty());
    }
}
