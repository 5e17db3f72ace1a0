//! A minimal in-process stand-in for the Snowflake login and query endpoints.

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::http::StatusCode;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const PASSWORD: &str = "hunter2";
pub const SESSION_TOKEN: &str = "mock-session-token";

#[derive(Clone)]
pub struct SessionContext {
    pub role: String,
    pub warehouse: Option<String>,
    pub account: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            role: "SYSADMIN".to_string(),
            warehouse: Some("COMPUTE_WH".to_string()),
            account: "XY12345".to_string(),
        }
    }
}

pub struct MockSnowflake {
    pub addr: SocketAddr,
    /// `path?query` of every request served, in order.
    pub requests: Arc<Mutex<Vec<String>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for MockSnowflake {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl MockSnowflake {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Environment pointing login-option resolution at this server, with an
    /// empty `SNOWFLAKE_HOME` so no real connections file is read.
    pub fn env(&self, home: &TempDir, extra: &[(&str, &str)]) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = [
            ("SNOWFLAKE_HOME", home.path().to_str().unwrap_or_default()),
            ("SNOWFLAKE_ACCOUNT", "xy12345"),
            ("SNOWFLAKE_USER", "jdoe"),
            ("SNOWFLAKE_PASSWORD", PASSWORD),
            ("SNOWFLAKE_HOST", "127.0.0.1"),
            ("SNOWFLAKE_PROTOCOL", "http"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        env.insert("SNOWFLAKE_PORT".to_string(), self.port().to_string());
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        env
    }
}

pub async fn spawn_mock(context: SessionContext) -> MockSnowflake {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener address");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let (tx, mut rx) = oneshot::channel::<()>();

    let log = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                res = listener.accept() => {
                    let Ok((stream, _peer)) = res else { continue };
                    let context = context.clone();
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        let svc = service_fn(move |req| {
                            handler(req, context.clone(), Arc::clone(&log))
                        });
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), svc)
                            .await;
                    });
                }
                _ = &mut rx => break,
            }
        }
    });

    MockSnowflake {
        addr,
        requests,
        shutdown: Some(tx),
    }
}

async fn handler(
    req: Request<Incoming>,
    context: SessionContext,
    log: Arc<Mutex<Vec<String>>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let entry = match req.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.clone(),
    };
    log.lock().unwrap().push(entry);

    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!(r#"Snowflake Token="{SESSION_TOKEN}""#));
    let method = req.method().clone();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let reply = match (method, path.as_str()) {
        (Method::POST, "/session/v1/login-request") => login_reply(&body),
        (Method::POST, "/queries/v1/query-request") if !authorized => json!({
            "data": null,
            "code": "390112",
            "message": "Session no longer exists.  New login required to access the service.",
            "success": false
        }),
        (Method::POST, "/queries/v1/query-request") => query_reply(&body, &context),
        _ => {
            return Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::from_static(b"not found")))
                .unwrap());
        }
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(reply.to_string())))
        .unwrap())
}

fn login_reply(body: &Value) -> Value {
    let data = &body["data"];
    let signed_jwt = data["AUTHENTICATOR"] == "SNOWFLAKE_JWT"
        && data["TOKEN"]
            .as_str()
            .is_some_and(|token| token.split('.').count() == 3);
    let accepted =
        data["PASSWORD"] == PASSWORD || data["AUTHENTICATOR"] == "OAUTH" || signed_jwt;
    if accepted {
        json!({
            "data": { "token": SESSION_TOKEN, "masterToken": "mock-master-token" },
            "code": null,
            "message": null,
            "success": true
        })
    } else {
        json!({
            "data": null,
            "code": "390100",
            "message": "Incorrect username or password was specified.",
            "success": false
        })
    }
}

fn query_reply(body: &Value, context: &SessionContext) -> Value {
    let sql = body["sqlText"].as_str().unwrap_or_default();
    let (column, value) = if sql.contains("CURRENT_ROLE") {
        ("CURRENT_ROLE", Some(context.role.clone()))
    } else if sql.contains("CURRENT_WAREHOUSE") {
        ("CURRENT_WAREHOUSE", context.warehouse.clone())
    } else if sql.contains("CURRENT_ACCOUNT") {
        ("CURRENT_ACCOUNT", Some(context.account.clone()))
    } else {
        return json!({
            "data": null,
            "code": "001003",
            "message": format!("SQL compilation error: unexpected '{sql}'"),
            "success": false
        });
    };
    json!({
        "data": {
            "queryId": "01b2c3d4-0000-0000-0000-000000000001",
            "rowtype": [{
                "name": column,
                "database": "",
                "schema": "",
                "table": "",
                "nullable": true,
                "type": "text"
            }],
            "rowset": [[value]],
            "returned": 1,
            "total": 1,
            "queryResultFormat": "json"
        },
        "code": null,
        "message": null,
        "success": true
    })
}
