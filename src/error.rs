use std::num::ParseIntError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("communication error: {0}")]
    Communication(String),

    #[error("url error: {0}")]
    Url(String),

    #[error("session expired")]
    SessionExpired,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("json error: {0}, body: {1}")]
    Json(serde_json::Error, String),

    #[error("pkcs8 error: {0}")]
    Pkcs8(#[from] pkcs8::Error),

    #[error("spki error: {0}")]
    Spki(#[from] pkcs8::spki::Error),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("failed to parse {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("connection '{0}' not found in connections file")]
    ConnectionNotFound(String),

    #[error("missing login option: {0}")]
    MissingLoginOption(&'static str),

    #[error("invalid login option {name}: '{value}'")]
    InvalidLoginOption { name: &'static str, value: String },

    #[error("unsupported authenticator: {0}")]
    UnsupportedAuthenticator(String),

    #[error("environment variable {0} is not valid unicode")]
    EnvNotUnicode(String),

    #[error("invalid SNOWFLAKE_SESSION_TIMEOUT_SEC '{value}': {source}")]
    InvalidSessionTimeout {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("process session config is already initialized")]
    AlreadyInitialized,
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Url(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
