use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use super::*;
use crate::{
    AuthStrategy, SnowflakeConnectionOpts, SnowflakeConnectionOptsBuilder, StatementKind,
    config::{DatabasePolicy, SnowflakeConfig},
    warehouse::{SnowflakeWarehouse, Warehouse, WarehouseSession},
};

static FAKE_HOST: &str = "https://fake.snowflake.test";

#[derive(Debug, Clone)]
struct Recorded {
    method: &'static str,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    requests: Vec<(&'static str, Recorded)>,
    responses: HashMap<&'static str, VecDeque<Value>>,
}

/// Serves queued JSON bodies per Snowflake route and records every request.
#[derive(Clone, Default)]
struct FakeHttp {
    state: Arc<Mutex<FakeState>>,
}

fn route(url: &str) -> &'static str {
    if url.contains("/session/v1/login-request") {
        "login"
    } else if url.contains("/session/token-request") {
        "renew"
    } else if url.contains("/queries/v1/query-request") {
        "query"
    } else if url.contains("/queries/") {
        "result"
    } else if url.contains("/session?") {
        "close"
    } else {
        "unknown"
    }
}

impl FakeHttp {
    fn respond(&self, route: &'static str, body: Value) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry(route)
            .or_default()
            .push_back(body);
        self
    }

    fn requests(&self, route: &'static str) -> Vec<Recorded> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(r, _)| *r == route)
            .map(|(_, req)| req.clone())
            .collect()
    }

    fn routes(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|(r, _)| *r)
            .collect()
    }

    fn handle(
        &self,
        method: &'static str,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SnowflakeError> {
        let mut state = self.state.lock().unwrap();
        let route = route(url);

        state.requests.push((
            route,
            Recorded {
                method,
                url: url.to_string(),
                headers,
                body: body.map(|b| serde_json::from_slice(&b).unwrap()),
            },
        ));

        let resp = state
            .responses
            .get_mut(route)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| SnowflakeError::new("FakeHttp::handle", format!("no response queued for {url}"), None))?;

        Ok(serde_json::to_vec(&resp).unwrap())
    }
}

impl SnowflakeHttpClient for FakeHttp {
    fn get(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send {
        let resp = self.handle("GET", url, headers, None);
        async move { resp }
    }

    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send {
        let resp = self.handle("POST", url, headers, Some(body));
        async move { resp }
    }
}

fn login_ok(validity: i64) -> Value {
    login_with(validity, 14400)
}

fn login_with(validity: i64, master_validity: i64) -> Value {
    json!({
        "data": {
            "token": "session-token-1",
            "masterToken": "master-token-1",
            "validityInSeconds": validity,
            "masterValidityInSeconds": master_validity,
            "sessionId": 4242,
            "serverVersion": "8.40.1",
            "sessionInfo": {
                "databaseName": "ANALYTICS",
                "schemaName": null,
                "warehouseName": "COMPUTE_WH",
                "roleName": "SYSADMIN"
            }
        },
        "code": null,
        "message": null,
        "success": true
    })
}

fn query_ok(query_id: &str, statement_type_id: i64, rows_inserted: i64) -> Value {
    json!({
        "data": {
            "queryId": query_id,
            "statementTypeId": statement_type_id,
            "total": 1,
            "returned": 1,
            "rowtype": [],
            "rowset": [],
            "stats": {
                "numRowsInserted": rows_inserted,
                "numRowsUpdated": 0,
                "numRowsDeleted": 0,
                "numDmlDuplicates": 0
            }
        },
        "code": null,
        "message": null,
        "success": true
    })
}

fn close_ok() -> Value {
    json!({"data": null, "code": null, "message": null, "success": true})
}

fn opts() -> SnowflakeConnectionOpts {
    SnowflakeConnectionOptsBuilder::default()
        .strategy(AuthStrategy::Password("hunter2".into()))
        .account_id("xy12345")
        .username("loader")
        .role("SYSADMIN")
        .warehouse("COMPUTE_WH")
        .database("ANALYTICS")
        .host(FAKE_HOST)
        .build()
        .unwrap()
}

async fn connect(http: &FakeHttp) -> Session<FakeHttp> {
    opts().connect_with_client(http.clone()).await.unwrap()
}

fn auth_header(req: &Recorded) -> &str {
    req.headers.get("Authorization").map(String::as_str).unwrap_or("")
}

#[tokio::test]
async fn login_sends_credentials_and_session_context() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600));

    let session = connect(&http).await;
    assert_eq!(session.session_id(), Some(4242));

    let login = &http.requests("login")[0];
    assert_eq!(login.method, "POST");
    assert!(login.url.starts_with("https://fake.snowflake.test/session/v1/login-request?"));
    assert!(login.url.contains("databaseName=ANALYTICS"));
    assert!(login.url.contains("warehouse=COMPUTE_WH"));
    assert!(login.url.contains("roleName=SYSADMIN"));
    assert!(!login.url.contains("schemaName"));

    let data = &login.body.as_ref().unwrap()["data"];
    assert_eq!(data["ACCOUNT_NAME"], "xy12345");
    assert_eq!(data["LOGIN_NAME"], "loader");
    assert_eq!(data["PASSWORD"], "hunter2");
    assert!(login.headers.get("Authorization").is_none());
}

#[tokio::test]
async fn failed_login_is_reported() {
    let http = FakeHttp::default();
    http.respond(
        "login",
        json!({
            "data": {"nextAction": "RETRY_LOGIN", "authnMethod": "USERNAME_PASSWORD"},
            "code": "390100",
            "message": "Incorrect username or password was specified.",
            "success": false
        }),
    );

    let Err(err) = opts().connect_with_client(http.clone()).await else {
        panic!("login should have failed");
    };

    assert_eq!(err.code(), Some("390100"));
    assert_eq!(err.message(), "Incorrect username or password was specified.");
    assert_eq!(http.routes(), vec!["login"]);
}

#[tokio::test]
async fn statements_carry_token_and_increasing_sequence() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600))
        .respond("query", query_ok("q-1", 0x6000, 0))
        .respond("query", query_ok("q-2", 0x3100, 3));

    let mut session = connect(&http).await;

    let created = session.execute("CREATE TABLE t (id INT)").await.unwrap();
    assert_eq!(created.kind, StatementKind::Other);
    assert_eq!(created.query_id.as_deref(), Some("q-1"));

    let inserted = session.execute("INSERT INTO t VALUES (1), (2), (3)").await.unwrap();
    assert_eq!(inserted.kind, StatementKind::Dml);
    assert_eq!(inserted.rows_affected, 3);

    let queries = http.requests("query");
    assert_eq!(queries.len(), 2);
    for (i, (req, sql)) in queries
        .iter()
        .zip(["CREATE TABLE t (id INT)", "INSERT INTO t VALUES (1), (2), (3)"])
        .enumerate()
    {
        let body = req.body.as_ref().unwrap();
        assert_eq!(body["sqlText"], sql);
        assert_eq!(body["sequenceId"], i as u64);
        assert_eq!(body["describeOnly"], false);
        assert_eq!(auth_header(req), "Snowflake Token=\"session-token-1\"");
    }
}

#[tokio::test]
async fn statement_failure_carries_sql_state() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600)).respond(
        "query",
        json!({
            "data": {"age": 0, "errorCode": "001003", "sqlState": "42000", "queryId": "q-bad", "line": 1, "pos": 0},
            "code": "001003",
            "message": "SQL compilation error:\nsyntax error line 1 at position 0 unexpected 'GARBAGE'.",
            "success": false
        }),
    );

    let mut session = connect(&http).await;
    let err = session.execute("GARBAGE SYNTAX").await.unwrap_err();

    assert_eq!(err.code(), Some("001003"));
    assert_eq!(err.sql_state(), Some("42000"));
    assert!(err.message().contains("[query id q-bad]"));
}

#[tokio::test]
async fn running_query_is_polled_until_finished() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600))
        .respond(
            "query",
            json!({
                "data": {"getResultUrl": "/queries/q-slow/result", "queryAbortsAfterSecs": 300, "queryId": "q-slow"},
                "code": "333334",
                "message": "Asynchronous execution in progress.",
                "success": true
            }),
        )
        .respond(
            "result",
            json!({
                "data": {"getResultUrl": "/queries/q-slow/result", "queryAbortsAfterSecs": 300, "queryId": "q-slow"},
                "code": "333333",
                "message": "Query execution in progress.",
                "success": true
            }),
        )
        .respond("result", query_ok("q-slow", 0x6000, 0));

    let mut session = connect(&http).await;
    let outcome = session.execute("CREATE TABLE big AS SELECT * FROM huge").await.unwrap();

    assert_eq!(outcome.query_id.as_deref(), Some("q-slow"));
    assert_eq!(http.routes(), vec!["login", "query", "result", "result"]);

    for poll in http.requests("result") {
        assert_eq!(poll.method, "GET");
        assert!(poll.url.starts_with("https://fake.snowflake.test/queries/q-slow/result?"));
        assert_eq!(auth_header(&poll), "Snowflake Token=\"session-token-1\"");
    }
}

#[tokio::test]
async fn expired_session_token_is_renewed_with_master_token() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(0))
        .respond(
            "renew",
            json!({
                "data": {
                    "sessionToken": "session-token-2",
                    "validityInSecondsST": 3600,
                    "masterToken": "master-token-2",
                    "validityInSecondsMT": 14400,
                    "sessionId": 4242
                },
                "code": null,
                "message": "Token renewed",
                "success": true
            }),
        )
        .respond("query", query_ok("q-1", 0x1000, 0));

    let mut session = connect(&http).await;
    let outcome = session.execute("SELECT 1").await.unwrap();
    assert_eq!(outcome.kind, StatementKind::Query);

    assert_eq!(http.routes(), vec!["login", "renew", "query"]);

    let renew = &http.requests("renew")[0];
    assert_eq!(auth_header(renew), "Snowflake Token=\"master-token-1\"");
    assert_eq!(renew.body.as_ref().unwrap()["oldSessionToken"], "session-token-1");
    assert_eq!(renew.body.as_ref().unwrap()["requestType"], "RENEW");

    let query = &http.requests("query")[0];
    assert_eq!(auth_header(query), "Snowflake Token=\"session-token-2\"");
}

#[tokio::test]
async fn close_deletes_the_session() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600)).respond("close", close_ok());

    let session = connect(&http).await;
    session.close().await.unwrap();

    let close = &http.requests("close")[0];
    assert_eq!(close.method, "POST");
    assert!(close.url.starts_with("https://fake.snowflake.test/session?"));
    assert!(close.url.contains("delete=true"));
    assert_eq!(auth_header(close), "Snowflake Token=\"session-token-1\"");
}

#[tokio::test]
async fn close_renews_an_expired_session_token() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(0))
        .respond(
            "renew",
            json!({
                "data": {
                    "sessionToken": "session-token-2",
                    "validityInSecondsST": 3600,
                    "masterToken": "master-token-2",
                    "validityInSecondsMT": 14400,
                    "sessionId": 4242
                },
                "code": null,
                "message": "Token renewed",
                "success": true
            }),
        )
        .respond("close", close_ok());

    let session = connect(&http).await;
    session.close().await.unwrap();

    assert_eq!(http.routes(), vec!["login", "renew", "close"]);
    let close = &http.requests("close")[0];
    assert_eq!(auth_header(close), "Snowflake Token=\"session-token-2\"");
}

#[tokio::test]
async fn close_with_expired_master_token_never_logs_in_again() {
    let http = FakeHttp::default();
    http.respond("login", login_with(0, 0)).respond(
        "close",
        json!({"data": null, "code": "390112", "message": "Your session has expired. Please login again.", "success": false}),
    );

    let session = connect(&http).await;
    let err = session.close().await.unwrap_err();

    assert_eq!(http.routes(), vec!["login", "close"]);
    let close = &http.requests("close")[0];
    assert_eq!(auth_header(close), "Snowflake Token=\"session-token-1\"");
    assert_eq!(err.code(), Some("390112"));
}

#[tokio::test]
async fn close_failure_is_reported() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600)).respond(
        "close",
        json!({"data": null, "code": "390111", "message": "Session no longer exists.", "success": false}),
    );

    let session = connect(&http).await;
    let err = session.close().await.unwrap_err();

    assert_eq!(err.code(), Some("390111"));
}

#[tokio::test]
async fn warehouse_opens_executes_and_closes_through_the_traits() {
    let http = FakeHttp::default();
    http.respond("login", login_ok(3600))
        .respond("query", query_ok("q-1", 0x1000, 0))
        .respond("close", close_ok());

    let config = SnowflakeConfig::from_lookup(&DatabasePolicy::default(), |key| match key {
        "SNOWFLAKE_HOST" => Some(FAKE_HOST.to_string()),
        "SNOWFLAKE_DATABASE" => None,
        other => Some(format!("{}-value", other.to_lowercase())),
    })
    .unwrap();

    let warehouse = SnowflakeWarehouse::with_client(http.clone());
    let mut session = warehouse.connect(&config).await.unwrap();
    WarehouseSession::execute(&mut session, "SELECT 1").await.unwrap();
    WarehouseSession::close(session).await.unwrap();

    assert_eq!(http.routes(), vec!["login", "query", "close"]);

    let login = &http.requests("login")[0];
    assert!(login.url.contains("databaseName=SNOWPARK_DB"));
    assert_eq!(login.body.as_ref().unwrap()["data"]["PASSWORD"], "snowflake_password-value");
}
