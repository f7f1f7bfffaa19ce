//! CLI command implementations.

mod display;

pub mod load;
pub mod order;
pub mod query;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rpmorder_config::Config;
use rpmorder_metadata::{PackageIndex, Repository};

/// Bring the configured release into the cache and open it for queries.
pub async fn open(config: &Config) -> Result<PackageIndex> {
    let repository = Repository::new(
        config.repository.uri.as_str(),
        config.repository.version.as_str(),
        config.repository.cache_dir.as_path(),
    );
    let retriever = rpmorder_fetch::for_source(repository.uri())
        .or_raise(|| ErrorKind::Source(repository.uri().to_string()))?;
    let dbs = repository
        .load(retriever.as_ref(), config.fetch.max_concurrent)
        .await
        .or_raise(|| ErrorKind::Load)?;
    Ok(PackageIndex::new(dbs))
}
