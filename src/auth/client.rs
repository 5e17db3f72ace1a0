use serde_json::{Value, json};

pub(super) fn client_app_id() -> &'static str {
    env!("CARGO_PKG_NAME")
}

pub(super) fn client_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub(crate) fn user_agent() -> String {
    format!("{}/{}", client_app_id(), client_app_version())
}

/// Client description attached to every login request.
pub(super) fn client_environment(login_timeout: Option<u64>) -> Value {
    json!({
        "APPLICATION": client_app_id(),
        "OS": std::env::consts::OS,
        "LOGIN_TIMEOUT": login_timeout,
    })
}
