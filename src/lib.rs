//! # Snowflake Session Bootstrap
//!
//! Opens one Snowflake session at process start and exposes the settings
//! derived from it (role, warehouse, account, user, password and session
//! timeout) as a single immutable [`ProcessSessionConfig`].
//!
//! ```rust,no_run
//! # use snowflake_session_bootstrap::{ProcessEnv, Result, SnowflakeConnector, bootstrap};
//! # async fn run() -> Result<()> {
//! let bootstrapped = bootstrap(&SnowflakeConnector::default(), &ProcessEnv).await?;
//! let config = bootstrapped.config();
//! println!("role={} timeout={}s", config.role(), config.session_timeout_seconds());
//! # Ok(())
//! # }
//! ```
//!
//! Code that prefers a process-wide value can fill the global slot once with
//! [`init`] (or [`init_blocking`] from synchronous startup code) and read it
//! anywhere with [`get`].

mod auth;
mod bootstrap;
mod env;
mod error;
mod login_options;
mod query;
mod row;
mod session;

use std::time::Duration;

pub use bootstrap::{
    ProcessSessionConfig, SessionBootstrap, SessionConnector, SnowflakeConnector,
    WarehouseSession, bootstrap, bootstrap_from_env, get, init, init_blocking,
};
pub use env::{DEFAULT_SESSION_TIMEOUT_SECONDS, EnvSource, ProcessEnv};
pub use error::{Error, Result};
pub use login_options::{Authenticator, LoginOptions};
pub use session::SnowflakeSession;

use auth::login;

use reqwest::{Client, ClientBuilder};

#[derive(Clone)]
pub struct SnowflakeClient {
    http: Client,

    username: String,
    auth: SnowflakeAuthMethod,
    config: SnowflakeClientConfig,
    connection_config: Option<SnowflakeConnectionConfig>,
}

#[derive(Default, Clone, Debug)]
pub struct SnowflakeClientConfig {
    pub account: String,

    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Default, Clone, Debug)]
pub(crate) struct SnowflakeConnectionConfig {
    pub(crate) host: String,
    pub(crate) port: Option<u16>,
    pub(crate) protocol: Option<String>,
}

#[derive(Clone)]
pub enum SnowflakeAuthMethod {
    Password(String),
    KeyPair {
        pem: String,
        passphrase: Option<Vec<u8>>,
    },
    Oauth {
        token: String,
    },
}

impl std::fmt::Debug for SnowflakeAuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnowflakeAuthMethod::Password(_) => f.write_str("Password(..)"),
            SnowflakeAuthMethod::KeyPair { .. } => f.write_str("KeyPair { .. }"),
            SnowflakeAuthMethod::Oauth { .. } => f.write_str("Oauth { .. }"),
        }
    }
}

impl SnowflakeClient {
    pub fn new(
        username: &str,
        auth: SnowflakeAuthMethod,
        config: SnowflakeClientConfig,
    ) -> Result<Self> {
        let client = ClientBuilder::new().gzip(true).build()?;
        Ok(Self {
            http: client,
            username: username.to_string(),
            auth,
            config,
            connection_config: None,
        })
    }

    pub fn with_address(
        self,
        host: &str,
        port: Option<u16>,
        protocol: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: self.http,
            username: self.username,
            auth: self.auth,
            config: self.config,
            connection_config: Some(SnowflakeConnectionConfig {
                host: host.to_string(),
                port,
                protocol,
            }),
        })
    }

    pub async fn create_session(&self) -> Result<SnowflakeSession> {
        let session_token = login(
            &self.http,
            &self.username,
            &self.auth,
            &self.config,
            &self.connection_config,
        )
        .await?;
        Ok(SnowflakeSession {
            http: self.http.clone(),
            base_url: auth::get_base_url(&self.config, &self.connection_config)?,
            session_token,
            timeout: self.config.timeout,
        })
    }
}
