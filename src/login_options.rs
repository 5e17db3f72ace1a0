//! Ambient login-option resolution.
//!
//! Options come from the named table of `connections.toml` (in
//! `$SNOWFLAKE_HOME`, or `~/.snowflake` when unset) with `SNOWFLAKE_*`
//! environment variables layered on top.
//!
//! ```toml
//! [default]
//! account = "xy12345.ap-northeast-1.aws"
//! user = "jdoe"
//! password = "..."
//! warehouse = "COMPUTE_WH"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::{
    EnvSource, Error, Result, SnowflakeAuthMethod, SnowflakeClient, SnowflakeClientConfig, env,
};

const HOME_VAR: &str = "SNOWFLAKE_HOME";
const CONNECTION_NAME_VAR: &str = "SNOWFLAKE_DEFAULT_CONNECTION_NAME";
const DEFAULT_CONNECTION_NAME: &str = "default";
const CONNECTIONS_FILE: &str = "connections.toml";

/// How the client proves its identity at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authenticator {
    /// User name and password.
    Snowflake,
    /// Key-pair JWT.
    SnowflakeJwt,
    Oauth,
}

impl FromStr for Authenticator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowflake" => Ok(Authenticator::Snowflake),
            "snowflake_jwt" => Ok(Authenticator::SnowflakeJwt),
            "oauth" => Ok(Authenticator::Oauth),
            _ => Err(Error::UnsupportedAuthenticator(s.to_string())),
        }
    }
}

/// Fully resolved options for opening a session.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub account: String,
    pub user: String,
    pub authenticator: Authenticator,
    pub auth: SnowflakeAuthMethod,

    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,

    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub login_timeout: Option<Duration>,
}

/// One table of `connections.toml`. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawConnection {
    account: Option<String>,
    user: Option<String>,
    password: Option<String>,
    role: Option<String>,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    protocol: Option<String>,
    authenticator: Option<String>,
    #[serde(alias = "private_key_path")]
    private_key_file: Option<PathBuf>,
    private_key_file_pwd: Option<String>,
    token: Option<String>,
    token_file_path: Option<PathBuf>,
    login_timeout: Option<u64>,
}

impl LoginOptions {
    /// Resolves options from the connections file and environment of `env`.
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        let path = match env.var(HOME_VAR)? {
            Some(home) => Some(PathBuf::from(home).join(CONNECTIONS_FILE)),
            None => dirs::home_dir().map(|home| home.join(".snowflake").join(CONNECTIONS_FILE)),
        };
        let connection_name = env.var(CONNECTION_NAME_VAR)?;
        Self::resolve(path.as_deref(), connection_name.as_deref(), env)
    }

    /// Resolves options from an explicit connections file.
    ///
    /// A missing file is treated as empty. When `connection_name` is given the
    /// table must exist; otherwise a missing `default` table is ignored.
    pub fn resolve(
        connections_file: Option<&Path>,
        connection_name: Option<&str>,
        env: &impl EnvSource,
    ) -> Result<Self> {
        let name = connection_name.unwrap_or(DEFAULT_CONNECTION_NAME);
        let mut connections = match connections_file {
            Some(path) => read_connections(path)?,
            None => HashMap::new(),
        };
        let file = match connections.remove(name) {
            Some(connection) => {
                tracing::debug!(connection = name, "using connection from connections file");
                connection
            }
            None if connection_name.is_some() => {
                return Err(Error::ConnectionNotFound(name.to_string()));
            }
            None => RawConnection::default(),
        };
        merge(file, env)?.into_options()
    }

    pub fn client_config(&self) -> SnowflakeClientConfig {
        SnowflakeClientConfig {
            account: self.account.clone(),
            warehouse: self.warehouse.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            role: self.role.clone(),
            timeout: self.login_timeout,
        }
    }

    /// Builds a client that logs in with these options.
    pub fn client(&self) -> Result<SnowflakeClient> {
        let client = SnowflakeClient::new(&self.user, self.auth.clone(), self.client_config())?;
        match &self.host {
            Some(host) => client.with_address(host, self.port, self.protocol.clone()),
            None => Ok(client),
        }
    }
}

fn read_connections(path: &Path) -> Result<HashMap<String, RawConnection>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no connections file");
            return Ok(HashMap::new());
        }
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&content).map_err(|source| Error::Config {
        path: path.display().to_string(),
        source,
    })
}

/// Layers `SNOWFLAKE_*` variables over the file's values.
fn merge(file: RawConnection, env: &impl EnvSource) -> Result<RawConnection> {
    let port = match env.var("SNOWFLAKE_PORT")? {
        Some(port) => Some(port.trim().parse().map_err(|_| Error::InvalidLoginOption {
            name: "SNOWFLAKE_PORT",
            value: port,
        })?),
        None => file.port,
    };
    let login_timeout = match env.var("SNOWFLAKE_LOGIN_TIMEOUT")? {
        Some(secs) => Some(secs.trim().parse().map_err(|_| Error::InvalidLoginOption {
            name: "SNOWFLAKE_LOGIN_TIMEOUT",
            value: secs,
        })?),
        None => file.login_timeout,
    };

    Ok(RawConnection {
        account: env.var("SNOWFLAKE_ACCOUNT")?.or(file.account),
        user: env::user(env).or(file.user),
        password: env::password(env).or(file.password),
        role: env.var("SNOWFLAKE_ROLE")?.or(file.role),
        warehouse: env.var("SNOWFLAKE_WAREHOUSE")?.or(file.warehouse),
        database: env.var("SNOWFLAKE_DATABASE")?.or(file.database),
        schema: env.var("SNOWFLAKE_SCHEMA")?.or(file.schema),
        host: env.var("SNOWFLAKE_HOST")?.or(file.host),
        port,
        protocol: env.var("SNOWFLAKE_PROTOCOL")?.or(file.protocol),
        authenticator: env.var("SNOWFLAKE_AUTHENTICATOR")?.or(file.authenticator),
        private_key_file: env
            .var("SNOWFLAKE_PRIVATE_KEY_PATH")?
            .map(PathBuf::from)
            .or(file.private_key_file),
        private_key_file_pwd: env
            .var("SNOWFLAKE_PRIVATE_KEY_PASSPHRASE")?
            .or(file.private_key_file_pwd),
        token: env.var("SNOWFLAKE_TOKEN")?.or(file.token),
        token_file_path: env
            .var("SNOWFLAKE_TOKEN_FILE_PATH")?
            .map(PathBuf::from)
            .or(file.token_file_path),
        login_timeout,
    })
}

impl RawConnection {
    fn into_options(self) -> Result<LoginOptions> {
        let account = self
            .account
            .filter(|account| !account.is_empty())
            .ok_or(Error::MissingLoginOption("account"))?;

        let authenticator = match self.authenticator.as_deref() {
            Some(name) => name.parse()?,
            None if self.private_key_file.is_some() => Authenticator::SnowflakeJwt,
            None => Authenticator::Snowflake,
        };

        let auth = match authenticator {
            Authenticator::Snowflake => SnowflakeAuthMethod::Password(
                self.password
                    .ok_or(Error::MissingLoginOption("password"))?,
            ),
            Authenticator::SnowflakeJwt => {
                let path = self
                    .private_key_file
                    .ok_or(Error::MissingLoginOption("private_key_file"))?;
                SnowflakeAuthMethod::KeyPair {
                    pem: std::fs::read_to_string(path)?,
                    passphrase: self.private_key_file_pwd.map(String::into_bytes),
                }
            }
            Authenticator::Oauth => {
                let token = match (self.token, self.token_file_path) {
                    (Some(token), _) => token,
                    (None, Some(path)) => std::fs::read_to_string(path)?.trim().to_string(),
                    (None, None) => return Err(Error::MissingLoginOption("token")),
                };
                SnowflakeAuthMethod::Oauth { token }
            }
        };

        let user = match authenticator {
            Authenticator::Oauth => self.user.unwrap_or_default(),
            _ => self.user.ok_or(Error::MissingLoginOption("user"))?,
        };

        tracing::debug!(%account, ?authenticator, host = ?self.host, "resolved login options");

        Ok(LoginOptions {
            account,
            user,
            authenticator,
            auth,
            role: self.role,
            warehouse: self.warehouse,
            database: self.database,
            schema: self.schema,
            host: self.host,
            port: self.port,
            protocol: self.protocol,
            login_timeout: self.login_timeout.map(Duration::from_secs),
        })
    }
}
