//! Bootstraps the process-wide session config and prints it.
//!
//! ```sh
//! SNOWFLAKE_ACCOUNT=xy12345 SNOWFLAKE_USER=jdoe SNOWFLAKE_PASSWORD=... \
//!     RUST_LOG=snowflake_session_bootstrap=debug cargo run --example bootstrap
//! ```

use snowflake_session_bootstrap::{Result, get, init_blocking};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    init_blocking()?;

    if let Some(config) = get() {
        println!("role:     {}", config.role());
        println!("warehouse: {}", config.warehouse().unwrap_or("<none>"));
        println!("host:     {}", config.host());
        println!("user:     {}", config.user().unwrap_or("<unset>"));
        println!("timeout:  {}s", config.session_timeout_seconds());
    }

    Ok(())
}
