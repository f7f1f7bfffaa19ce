//! `rpmorder load` command implementation.

use crate::error::Result;
use rpmorder_config::Config;

/// Populate the cache for the configured release and report where it lives.
pub async fn run(config: &Config) -> Result<()> {
    let index = super::open(config).await?;
    for (key, _) in index.databases().iter() {
        tracing::debug!(db = %key, "opened");
    }
    index.close().await;
    println!(
        "{} {} ready in {}",
        config.repository.uri,
        config.repository.version,
        config.repository.cache_dir.join(&config.repository.version).display()
    );
    Ok(())
}
