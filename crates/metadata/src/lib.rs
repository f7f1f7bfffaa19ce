//! Repository metadata for build ordering.
//!
//! A repository release publishes six SQLite metadata databases: `filelists`,
//! `other` and `primary`, once for the binary tree and once for the source
//! tree. [`Repository::load`] brings them into a local cache (downloading only
//! what is missing) and opens them; [`PackageIndex`] answers package, file and
//! capability questions across them, and plugs into graph construction as a
//! [`CapabilityIndex`](rpmorder_graph::CapabilityIndex).
//!
//! # Cache layout
//! ```text
//! {cache_root}/{version}/db/bin-repomd.xml
//! {cache_root}/{version}/db/src-repomd.xml
//! {cache_root}/{version}/db/{bin,src}-{filelists,other,primary}
//! ```

mod db;
mod descriptor;
pub mod error;
#[cfg(test)]
mod fixture;
mod loader;
mod models;
mod query;
mod repo;

pub use crate::db::Database;
pub use crate::descriptor::Descriptor;
pub use crate::models::PackageFile;
pub use crate::query::{DuplicateProviders, PackageIndex};
pub use crate::repo::{DbKey, DbMap, DbName, FLOATING_VERSION, RepoType, Repository};

/// The six opened metadata databases of one repository release.
pub type MetadataSet = DbMap<Database>;
