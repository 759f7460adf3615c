//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and either the expected parse result or the expected normalized error.
//! Bodies and results are compared as parsed values, not raw strings, so
//! field ordering never causes false negatives.

use bank_core::{
    Account, Acknowledgement, ApiError, AuditLogEntry, BankClient, Credential, FailureKind,
    HttpMethod, HttpRequest, HttpResponse, NewTransaction, NewUser, SessionUser, Transaction,
    UserRecord, UserUpdate,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080/api";

fn client() -> BankClient {
    BankClient::new(BASE_URL).unwrap()
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        other => panic!("unknown method: {other}"),
    }
}

fn credential(case: &Value) -> Option<Credential> {
    case["token"].as_str().map(Credential::new)
}

fn input<T: DeserializeOwned>(case: &Value) -> T {
    serde_json::from_value(case["input"].clone()).unwrap()
}

fn check_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

/// Compare a parse outcome against `expected_result` or `expected_error`.
fn check_outcome<T>(name: &str, case: &Value, result: Result<T, ApiError>)
where
    T: DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let Some(expected) = case.get("expected_error") else {
        let actual = result.unwrap();
        let expected: T = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(actual, expected, "{name}: parsed result");
        return;
    };

    let err = result.unwrap_err();
    let status = expected["status"].as_u64().unwrap() as u16;
    assert_eq!(err.status(), Some(status), "{name}: status");
    assert_eq!(err.to_string(), expected["message"].as_str().unwrap(), "{name}: message");

    let kind = expected["kind"].as_str().unwrap();
    if kind == "Authentication" {
        assert!(matches!(err, ApiError::Authentication { .. }), "{name}: expected Authentication");
        return;
    }
    let kind = match kind {
        "Unauthenticated" => FailureKind::Unauthenticated,
        "Forbidden" => FailureKind::Forbidden,
        "NotFound" => FailureKind::NotFound,
        "Server" => FailureKind::Server,
        "Rejected" => FailureKind::Rejected,
        other => panic!("{name}: unknown expected_error kind: {other}"),
    };
    assert!(matches!(err, ApiError::Request { .. }), "{name}: expected Request");
    assert_eq!(err.kind(), Some(kind), "{name}: kind");
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn login_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/login.json")) {
        let name = case["name"].as_str().unwrap();
        let username = case["input"]["username"].as_str().unwrap();
        let password = case["input"]["password"].as_str().unwrap();

        let req = c.build_login(username, password).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_login(simulated(&case), username);
        check_outcome::<SessionUser>(name, &case, result);
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[test]
fn accounts_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/accounts.json")) {
        let name = case["name"].as_str().unwrap();
        let cred = credential(&case);

        let result = match case["input_user_id"].as_str() {
            Some(user_id) => {
                let req = c.build_get_accounts_by_user(cred.as_ref(), user_id);
                check_request(name, &req, &case["expected_request"]);
                c.parse_get_accounts_by_user(simulated(&case))
            }
            None => {
                let req = c.build_get_accounts(cred.as_ref());
                check_request(name, &req, &case["expected_request"]);
                c.parse_get_accounts(simulated(&case))
            }
        };
        check_outcome::<Vec<Account>>(name, &case, result);
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[test]
fn transaction_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/transactions.json")) {
        let name = case["name"].as_str().unwrap();
        let cred = credential(&case);

        if let Some(account_number) = case["input_account_number"].as_str() {
            let req = c.build_get_transaction_history(cred.as_ref(), account_number);
            check_request(name, &req, &case["expected_request"]);
            let result = c.parse_get_transaction_history(simulated(&case));
            check_outcome::<Vec<Transaction>>(name, &case, result);
        } else {
            let tx: NewTransaction = input(&case);
            let req = c.build_make_transaction(cred.as_ref(), &tx).unwrap();
            check_request(name, &req, &case["expected_request"]);
            let result = c.parse_make_transaction(simulated(&case));
            check_outcome::<Acknowledgement>(name, &case, result);
        }
    }
}

// ---------------------------------------------------------------------------
// Administration and search
// ---------------------------------------------------------------------------

#[test]
fn admin_test_vectors() {
    let c = client();
    for case in load(include_str!("../../test-vectors/admin.json")) {
        let name = case["name"].as_str().unwrap();
        let cred = credential(&case);
        let expected_req = &case["expected_request"];

        match case["operation"].as_str().unwrap() {
            "create_user" => {
                let user: NewUser = input(&case);
                let req = c.build_create_user(cred.as_ref(), &user).unwrap();
                check_request(name, &req, expected_req);
                check_outcome::<Acknowledgement>(name, &case, c.parse_create_user(simulated(&case)));
            }
            "update_user" => {
                let user_id = case["input_user_id"].as_str().unwrap();
                let update: UserUpdate = input(&case);
                let req = c.build_update_user(cred.as_ref(), user_id, &update).unwrap();
                check_request(name, &req, expected_req);
                check_outcome::<Acknowledgement>(name, &case, c.parse_update_user(simulated(&case)));
            }
            "audit_logs" => {
                let req = c.build_get_audit_logs(cred.as_ref());
                check_request(name, &req, expected_req);
                check_outcome::<Vec<AuditLogEntry>>(
                    name,
                    &case,
                    c.parse_get_audit_logs(simulated(&case)),
                );
            }
            "search_users" => {
                let query = case["input_query"].as_str().unwrap();
                let req = c.build_search_users(cred.as_ref(), query);
                check_request(name, &req, expected_req);
                check_outcome::<Vec<UserRecord>>(
                    name,
                    &case,
                    c.parse_search_users(simulated(&case)),
                );
            }
            other => panic!("{name}: unknown operation: {other}"),
        }
    }
}
