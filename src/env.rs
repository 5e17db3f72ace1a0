//! Environment access for bootstrap and login-option resolution.
//!
//! Everything that reads a variable goes through [`EnvSource`] so callers can
//! bootstrap against a fixed map instead of the real process environment.

use std::collections::HashMap;
use std::ffi::OsString;

use crate::{Error, Result};

pub const SESSION_TIMEOUT_VAR: &str = "SNOWFLAKE_SESSION_TIMEOUT_SEC";
pub const USER_VAR: &str = "SNOWFLAKE_USER";
pub const PASSWORD_VAR: &str = "SNOWFLAKE_PASSWORD";

pub const DEFAULT_SESSION_TIMEOUT_SECONDS: i64 = 120;

/// A source of environment variables.
pub trait EnvSource {
    /// The raw value, `None` when unset.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Returns `Ok(None)` when the variable is unset and an error when it is
    /// not valid unicode.
    fn var(&self, key: &str) -> Result<Option<String>> {
        self.var_os(key)
            .map(|value| {
                value
                    .into_string()
                    .map_err(|_| Error::EnvNotUnicode(key.to_string()))
            })
            .transpose()
    }

    /// Like [`EnvSource::var`], replacing invalid unicode instead of failing.
    fn var_lossy(&self, key: &str) -> Option<String> {
        self.var_os(key)
            .map(|value| value.to_string_lossy().into_owned())
    }
}

/// The environment of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

impl EnvSource for HashMap<String, String> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).map(OsString::from)
    }
}

impl EnvSource for HashMap<String, OsString> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var_os(&self, key: &str) -> Option<OsString> {
        (**self).var_os(key)
    }
}

/// Reads `SNOWFLAKE_SESSION_TIMEOUT_SEC`, falling back to 120 when unset.
///
/// Any integer is accepted, negative ones included. A set but non-numeric
/// value (the empty string included) is an error.
pub fn session_timeout_seconds(env: &impl EnvSource) -> Result<i64> {
    match env.var(SESSION_TIMEOUT_VAR)? {
        None => Ok(DEFAULT_SESSION_TIMEOUT_SECONDS),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|source| Error::InvalidSessionTimeout { value, source }),
    }
}

/// `SNOWFLAKE_USER`. Invalid unicode is replaced rather than rejected.
pub fn user(env: &impl EnvSource) -> Option<String> {
    env.var_lossy(USER_VAR)
}

/// `SNOWFLAKE_PASSWORD`. Invalid unicode is replaced rather than rejected.
pub fn password(env: &impl EnvSource) -> Option<String> {
    env.var_lossy(PASSWORD_VAR)
}
