//! One-shot session bootstrap.
//!
//! [`bootstrap`] resolves login options, opens a session, and captures the
//! session's role, warehouse and account together with the timeout and
//! credential variables into a [`ProcessSessionConfig`]. There are no retries;
//! the first failure is returned unchanged.

use std::future::Future;
use std::sync::OnceLock;

use crate::{
    EnvSource, Error, LoginOptions, ProcessEnv, Result, SnowflakeSession, env,
};

/// Opens sessions from resolved login options.
pub trait SessionConnector {
    type Session: WarehouseSession;

    fn connect(&self, options: &LoginOptions) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// The context queries bootstrap issues against an open session.
pub trait WarehouseSession {
    fn current_role(&self) -> impl Future<Output = Result<String>> + Send;
    fn current_warehouse(&self) -> impl Future<Output = Result<Option<String>>> + Send;
    fn current_account(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Connects over HTTPS with [`crate::SnowflakeClient`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeConnector;

impl SessionConnector for SnowflakeConnector {
    type Session = SnowflakeSession;

    async fn connect(&self, options: &LoginOptions) -> Result<SnowflakeSession> {
        options.client()?.create_session().await
    }
}

impl WarehouseSession for SnowflakeSession {
    async fn current_role(&self) -> Result<String> {
        SnowflakeSession::current_role(self).await
    }

    async fn current_warehouse(&self) -> Result<Option<String>> {
        SnowflakeSession::current_warehouse(self).await
    }

    async fn current_account(&self) -> Result<String> {
        SnowflakeSession::current_account(self).await
    }
}

/// Settings captured once at startup. Fields never change after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessSessionConfig {
    session_timeout_seconds: i64,
    role: String,
    warehouse: Option<String>,
    host: String,
    user: Option<String>,
    password: Option<String>,
}

impl ProcessSessionConfig {
    /// `SNOWFLAKE_SESSION_TIMEOUT_SEC`, or 120. Not applied by bootstrap.
    pub fn session_timeout_seconds(&self) -> i64 {
        self.session_timeout_seconds
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    /// The account identifier reported by the session.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl std::fmt::Debug for ProcessSessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSessionConfig")
            .field("session_timeout_seconds", &self.session_timeout_seconds)
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A bootstrapped session: the captured config and the session it came from.
#[derive(Debug)]
pub struct SessionBootstrap<S> {
    config: ProcessSessionConfig,
    session: S,
}

impl<S> SessionBootstrap<S> {
    pub fn config(&self) -> &ProcessSessionConfig {
        &self.config
    }

    pub fn into_config(self) -> ProcessSessionConfig {
        self.config
    }

    pub fn into_parts(self) -> (ProcessSessionConfig, S) {
        (self.config, self.session)
    }
}

pub async fn bootstrap<C, E>(connector: &C, env: &E) -> Result<SessionBootstrap<C::Session>>
where
    C: SessionConnector,
    E: EnvSource,
{
    let options = LoginOptions::from_env(env)?;
    tracing::debug!(account = %options.account, "opening session");
    let session = connector.connect(&options).await?;

    let session_timeout_seconds = env::session_timeout_seconds(env)?;
    let role = session.current_role().await?;
    let warehouse = session.current_warehouse().await?;
    let host = session.current_account().await?;
    let user = env::user(env);
    let password = env::password(env);

    tracing::info!(
        %role,
        warehouse = warehouse.as_deref().unwrap_or("<none>"),
        %host,
        session_timeout_seconds,
        "session bootstrapped"
    );

    Ok(SessionBootstrap {
        config: ProcessSessionConfig {
            session_timeout_seconds,
            role,
            warehouse,
            host,
            user,
            password,
        },
        session,
    })
}

/// Bootstraps against Snowflake using the process environment.
pub async fn bootstrap_from_env() -> Result<SessionBootstrap<SnowflakeSession>> {
    bootstrap(&SnowflakeConnector, &ProcessEnv).await
}

static PROCESS_SESSION_CONFIG: OnceLock<ProcessSessionConfig> = OnceLock::new();

/// Bootstraps and stores the result in the process-wide slot.
///
/// Fails with [`Error::AlreadyInitialized`] once the slot is filled. On any
/// bootstrap error the slot stays empty.
pub async fn init<C, E>(connector: &C, env: &E) -> Result<&'static ProcessSessionConfig>
where
    C: SessionConnector,
    E: EnvSource,
{
    if PROCESS_SESSION_CONFIG.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }
    let config = bootstrap(connector, env).await?.into_config();
    PROCESS_SESSION_CONFIG
        .set(config)
        .map_err(|_| Error::AlreadyInitialized)?;
    get().ok_or(Error::AlreadyInitialized)
}

/// Runs [`init`] for the process environment on a current-thread runtime.
///
/// Must not be called from inside an async runtime.
pub fn init_blocking() -> Result<&'static ProcessSessionConfig> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(init(&SnowflakeConnector, &ProcessEnv))
}

/// The process-wide config, if [`init`] has succeeded.
pub fn get() -> Option<&'static ProcessSessionConfig> {
    PROCESS_SESSION_CONFIG.get()
}
