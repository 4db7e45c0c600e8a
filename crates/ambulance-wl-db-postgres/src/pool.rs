//! Opening the sqlx pool behind the document store.

use std::time::Duration;

use sqlx_postgres::{PgPool, PgPoolOptions};
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::PostgresError;

fn pool_options(config: &PostgresConfig) -> PgPoolOptions {
    let options = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .min_connections(config.effective_min_connections())
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .max_lifetime(Duration::from_secs(config.effective_max_lifetime_secs()));
    match config.idle_timeout_ms {
        Some(ms) => options.idle_timeout(Duration::from_millis(ms)),
        None => options.idle_timeout(None),
    }
}

/// Connects a pool sized and timed by `config`.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool, PostgresError> {
    let pool = pool_options(config).connect(&config.url).await?;
    debug!(
        max = config.pool_size,
        min = config.effective_min_connections(),
        "ambulance pool ready"
    );
    Ok(pool)
}

/// Hides the password of a connection URL so it can be logged.
pub fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map_or(0, |p| p + 3);
    let Some(at) = url.rfind('@') else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':') {
        Some(colon) => format!("{}:****{}", &url[..scheme_end + colon], &url[at..]),
        None => url.to_string(),
    }
}
