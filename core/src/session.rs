//! Session-owning client: build, attach credential, dispatch, parse.
//!
//! # Design
//! `BankSession` glues the sans-IO `BankClient` to a `Transport` and a
//! `SessionStore`. Only `login` and `logout` write to the store. Every other
//! operation reads the credential from the store when its request is built,
//! so a request always carries the most recently stored credential and a
//! concurrent `logout` cannot change a request that is already in flight.
//!
//! No operation retries, and none checks roles locally: authorization
//! failures come back from the backend through the normal error path.

use tracing::{debug, info, warn};

use crate::client::BankClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::store::{MemorySessionStore, SessionStore, CURRENT_USER_KEY, TOKEN_KEY};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Account, Acknowledgement, AuditLogEntry, Credential, NewTransaction, NewUser, SessionUser,
    Transaction, UserRecord, UserUpdate,
};

pub struct BankSession<T, S> {
    client: BankClient,
    transport: T,
    store: S,
}

impl BankSession<UreqTransport, MemorySessionStore> {
    /// A session talking HTTP through `ureq` with an in-memory store.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = BankClient::new(&config.base_url)?;
        Ok(Self::new(client, UreqTransport::new(), MemorySessionStore::new()))
    }
}

impl<T: Transport, S: SessionStore> BankSession<T, S> {
    pub fn new(client: BankClient, transport: T, store: S) -> Self {
        Self {
            client,
            transport,
            store,
        }
    }

    pub fn client(&self) -> &BankClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The stored credential, read fresh on every call.
    pub fn credential(&self) -> Option<Credential> {
        self.store.get(TOKEN_KEY).map(Credential::new)
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get(TOKEN_KEY).is_some()
    }

    /// The stored user, without touching the network.
    ///
    /// Stored data that no longer decodes counts as no session.
    pub fn current_user(&self) -> Option<SessionUser> {
        let raw = self.store.get(CURRENT_USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored session user is unreadable, treating as signed out");
                None
            }
        }
    }

    fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, url = %request.url, "response received");
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Authenticate and replace any existing session with the new one.
    pub fn login(&self, username: &str, password: &str) -> Result<SessionUser, ApiError> {
        let request = self.client.build_login(username, password)?;
        let response = self.dispatch(request)?;
        let user = self.client.parse_login(response, username).inspect_err(|e| {
            info!(%username, error = %e, "login rejected");
        })?;

        let serialized =
            serde_json::to_string(&user).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.store.set(TOKEN_KEY, user.token.clone());
        self.store.set(CURRENT_USER_KEY, serialized);

        info!(username = %user.username, "login succeeded");
        Ok(user)
    }

    /// Best-effort server-side logout followed by unconditional local teardown.
    pub fn logout(&self) {
        let request = self.client.build_logout(self.credential().as_ref());
        match self
            .dispatch(request)
            .and_then(|response| self.client.parse_logout(response))
        {
            Ok(()) => info!("logged out"),
            Err(e) => warn!(error = %e, "logout request failed, clearing local session anyway"),
        }
        self.store.remove(CURRENT_USER_KEY);
        self.store.remove(TOKEN_KEY);
    }

    /// Change the password. The stored credential stays valid and untouched.
    pub fn update_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<Acknowledgement, ApiError> {
        let request = self.client.build_update_password(
            self.credential().as_ref(),
            current_password,
            new_password,
        )?;
        self.client.parse_update_password(self.dispatch(request)?)
    }

    // -----------------------------------------------------------------------
    // Accounts & transactions
    // -----------------------------------------------------------------------

    pub fn get_accounts(&self) -> Result<Vec<Account>, ApiError> {
        let request = self.client.build_get_accounts(self.credential().as_ref());
        self.client.parse_get_accounts(self.dispatch(request)?)
    }

    pub fn get_accounts_by_user(&self, user_id: &str) -> Result<Vec<Account>, ApiError> {
        let request = self
            .client
            .build_get_accounts_by_user(self.credential().as_ref(), user_id);
        self.client.parse_get_accounts_by_user(self.dispatch(request)?)
    }

    pub fn get_transaction_history(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, ApiError> {
        let request = self
            .client
            .build_get_transaction_history(self.credential().as_ref(), account_number);
        self.client
            .parse_get_transaction_history(self.dispatch(request)?)
    }

    pub fn make_transaction(&self, input: &NewTransaction) -> Result<Acknowledgement, ApiError> {
        let request = self
            .client
            .build_make_transaction(self.credential().as_ref(), input)?;
        self.client.parse_make_transaction(self.dispatch(request)?)
    }

    // -----------------------------------------------------------------------
    // Administration & search
    // -----------------------------------------------------------------------

    pub fn create_user(&self, input: &NewUser) -> Result<Acknowledgement, ApiError> {
        let request = self
            .client
            .build_create_user(self.credential().as_ref(), input)?;
        self.client.parse_create_user(self.dispatch(request)?)
    }

    pub fn update_user(
        &self,
        user_id: &str,
        input: &UserUpdate,
    ) -> Result<Acknowledgement, ApiError> {
        let request = self
            .client
            .build_update_user(self.credential().as_ref(), user_id, input)?;
        self.client.parse_update_user(self.dispatch(request)?)
    }

    pub fn search_users(&self, query: &str) -> Result<Vec<UserRecord>, ApiError> {
        let request = self
            .client
            .build_search_users(self.credential().as_ref(), query);
        self.client.parse_search_users(self.dispatch(request)?)
    }

    pub fn get_audit_logs(&self) -> Result<Vec<AuditLogEntry>, ApiError> {
        let request = self.client.build_get_audit_logs(self.credential().as_ref());
        self.client.parse_get_audit_logs(self.dispatch(request)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use super::*;
    use crate::error::FailureKind;
    use crate::transport::TransportError;

    /// Replays queued outcomes in order and records every request it sees.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn respond(&self, status: u16, body: &str) -> &Self {
            self.outcomes
                .lock()
                .unwrap()
                .push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        fn fail(&self, reason: &str) -> &Self {
            self.outcomes
                .lock()
                .unwrap()
                .push_back(Err(TransportError(reason.to_string())));
            self
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }

        fn last(&self) -> HttpRequest {
            self.requests().pop().expect("no request was sent")
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    fn session() -> BankSession<ScriptedTransport, MemorySessionStore> {
        BankSession::new(
            BankClient::new("http://bank.test/api").unwrap(),
            ScriptedTransport::default(),
            MemorySessionStore::new(),
        )
    }

    fn logged_in(token: &str) -> BankSession<ScriptedTransport, MemorySessionStore> {
        let s = session();
        s.transport()
            .respond(200, &format!(r#"{{"token":"{token}","username":"alice"}}"#));
        s.login("alice", "pw").unwrap();
        s
    }

    #[test]
    fn login_backfills_username_and_persists() {
        let s = session();
        s.transport().respond(200, r#"{"token":"abc","id":7}"#);

        let user = s.login("alice", "pw").unwrap();

        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            serde_json::json!({"token": "abc", "id": 7, "username": "alice"})
        );
        assert_eq!(s.current_user(), Some(user));
        assert_eq!(s.credential(), Some(Credential::new("abc")));
        assert!(s.transport().last().header("authorization").is_none());
    }

    #[test]
    fn login_prefers_backend_username() {
        let s = session();
        s.transport()
            .respond(200, r#"{"token":"abc","username":"alice.doe","role":"CUSTOMER"}"#);
        s.login("alice", "pw").unwrap();
        assert_eq!(s.current_user().unwrap().username, "alice.doe");
    }

    #[test]
    fn login_overwrites_previous_session() {
        let s = logged_in("first");
        s.transport()
            .respond(200, r#"{"token":"second","username":"bob"}"#);
        s.login("bob", "pw").unwrap();
        assert_eq!(s.credential(), Some(Credential::new("second")));
        assert_eq!(s.current_user().unwrap().username, "bob");
    }

    #[test]
    fn login_rejection_leaves_store_untouched() {
        let s = session();
        s.transport().respond(401, "Invalid credentials");
        let err = s.login("alice", "wrong").unwrap_err();
        assert!(matches!(err, ApiError::Authentication { .. }));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(s.current_user().is_none());
        assert!(s.store().is_empty());
    }

    #[test]
    fn login_rejection_with_empty_body_uses_default() {
        let s = session();
        s.transport().respond(401, "");
        let err = s.login("alice", "wrong").unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[test]
    fn logout_clears_after_success() {
        let s = logged_in("abc");
        s.transport().respond(200, r#"{"message":"Logged out"}"#);
        s.logout();
        assert_eq!(s.transport().last().header("authorization"), Some("Bearer abc"));
        assert!(s.current_user().is_none());
        assert!(!s.is_authenticated());
    }

    #[test]
    fn logout_clears_after_error_status() {
        let s = logged_in("abc");
        s.transport().respond(500, "boom");
        s.logout();
        assert!(s.current_user().is_none());
        assert!(s.credential().is_none());
    }

    #[test]
    fn logout_clears_after_transport_failure() {
        let s = logged_in("abc");
        s.transport().fail("connection refused");
        s.logout();
        assert!(s.current_user().is_none());
        assert!(s.store().is_empty());
    }

    #[test]
    fn unauthenticated_calls_are_still_sent_with_header() {
        let s = session();
        let t = s.transport();
        for _ in 0..9 {
            t.respond(401, "");
        }
        let tx = NewTransaction::deposit("ACC-1", Decimal::ONE);
        let new_user = NewUser {
            username: "carol".to_string(),
            password: "secret1".to_string(),
            name: "Carol".to_string(),
            role: None,
        };

        assert!(s.get_accounts().is_err());
        assert!(s.get_accounts_by_user("u1").is_err());
        assert!(s.get_transaction_history("ACC-1").is_err());
        assert!(s.make_transaction(&tx).is_err());
        assert!(s.create_user(&new_user).is_err());
        assert!(s.update_user("u1", &UserUpdate::default()).is_err());
        assert!(s.update_password("a", "b").is_err());
        assert!(s.search_users("al").is_err());
        assert!(s.get_audit_logs().is_err());

        let requests = t.requests();
        assert_eq!(requests.len(), 9);
        for req in requests {
            assert_eq!(req.header("authorization"), Some("Bearer"), "{}", req.url);
        }
    }

    #[test]
    fn unauthenticated_failure_kind() {
        let s = session();
        s.transport().respond(401, "Invalid session");
        let err = s.get_accounts().unwrap_err();
        assert_eq!(err.kind(), Some(FailureKind::Unauthenticated));
        assert_eq!(err.to_string(), "Invalid session");
    }

    #[test]
    fn requests_use_latest_credential() {
        let s = logged_in("first");
        s.transport().respond(200, "[]");
        s.get_accounts().unwrap();
        assert_eq!(s.transport().last().header("authorization"), Some("Bearer first"));

        s.transport().respond(200, "{}");
        s.logout();
        s.transport()
            .respond(200, r#"{"token":"second","username":"alice"}"#);
        s.login("alice", "pw").unwrap();

        s.transport().respond(200, "[]");
        s.get_accounts().unwrap();
        assert_eq!(s.transport().last().header("authorization"), Some("Bearer second"));
    }

    #[test]
    fn transaction_rejection_message_is_body() {
        let s = logged_in("abc");
        s.transport().respond(422, "insufficient funds");
        let tx = NewTransaction::transfer("1", "2", Decimal::new(50, 0));
        let err = s.make_transaction(&tx).unwrap_err();
        assert_eq!(err.to_string(), "insufficient funds");
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn audit_logs_forbidden_uses_default() {
        let s = logged_in("abc");
        s.transport().respond(403, "");
        let err = s.get_audit_logs().unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch audit logs");
    }

    #[test]
    fn update_password_keeps_credential() {
        let s = logged_in("abc");
        s.transport()
            .respond(200, r#"{"message":"Password changed successfully"}"#);
        let ack = s.update_password("pw", "new-password").unwrap();
        assert_eq!(ack.message, "Password changed successfully");
        assert_eq!(s.credential(), Some(Credential::new("abc")));
    }

    #[test]
    fn transport_failure_is_passed_through() {
        let s = logged_in("abc");
        s.transport().fail("dns error");
        let err = s.get_accounts().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn corrupt_stored_user_reads_as_none() {
        let s = session();
        s.store().set(CURRENT_USER_KEY, "{not json".to_string());
        assert!(s.current_user().is_none());
    }

    #[test]
    fn externally_cleared_store_ends_session() {
        let s = logged_in("abc");
        s.store().remove(CURRENT_USER_KEY);
        s.store().remove(TOKEN_KEY);
        assert!(s.current_user().is_none());
        assert!(!s.is_authenticated());
    }

    #[test]
    fn session_is_shareable_across_threads() {
        fn assert_send_sync<X: Send + Sync>() {}
        assert_send_sync::<BankSession<UreqTransport, MemorySessionStore>>();
    }

    #[test]
    fn from_config_rejects_bad_url() {
        let config = ClientConfig::new("::nope::");
        assert!(matches!(
            BankSession::from_config(&config),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }
}
