//! Package, file and capability lookups against a loaded release.

use super::display::{print_group, print_names};
use crate::error::{ErrorKind, Result};
use clap::Subcommand;
use exn::ResultExt;
use rpmorder_config::Config;
use rpmorder_metadata::PackageIndex;

#[derive(Debug, Subcommand)]
pub enum Query {
    /// Binary packages owning files whose directory contains PATH
    Owners { path: String },

    /// Files (with owning package id) whose directory contains PATH
    Files { path: String },

    /// Every capability required by any binary or source package
    Requires,

    /// Required capabilities provided by more than one source package
    Duplicates,

    /// Capabilities provided by the binary subpackages of a source package
    Provides { package: String },

    /// Build requirements declared by a source package
    BuildRequires { package: String },

    /// Source packages build-requiring any of the given capabilities
    Dependents {
        #[arg(required = true)]
        capabilities: Vec<String>,
    },

    /// Binary packages built from a source package
    Subpackages { package: String },

    /// Location of a source package's source RPM
    Location { package: String },
}

pub async fn run(config: &Config, query: Query) -> Result<()> {
    let index = super::open(config).await?;
    let result = answer(&index, query).await;
    index.close().await;
    result
}

async fn answer(index: &PackageIndex, query: Query) -> Result<()> {
    let failed = || ErrorKind::Query;
    match query {
        Query::Owners { path } => {
            let owners = index.packages_owning_path(&path).await.or_raise(failed)?;
            print_names(&owners, &format!("no package owns files under `{path}`"));
        },
        Query::Files { path } => {
            let files = index.files_under_path(&path).await.or_raise(failed)?;
            if files.is_empty() {
                eprintln!("no files under `{path}`");
            }
            for file in files {
                println!("{}\t{}", file.path, file.pkg_id);
            }
        },
        Query::Requires => {
            let capabilities = index.all_required_capabilities().await.or_raise(failed)?;
            print_names(&capabilities, "no required capabilities");
        },
        Query::Duplicates => {
            let duplicates = index.duplicate_providers().await.or_raise(failed)?;
            if duplicates.is_empty() {
                eprintln!("no duplicate providers");
            }
            for (capability, providers) in &duplicates {
                print_group(capability, providers);
            }
        },
        Query::Provides { package } => {
            let provides = index.capabilities_provided_by(&package).await.or_raise(failed)?;
            print_names(&provides, &format!("`{package}` provides nothing"));
        },
        Query::BuildRequires { package } => {
            let requirements = index.build_requirements(&package).await.or_raise(failed)?;
            print_names(&requirements, &format!("`{package}` has no build requirements"));
        },
        Query::Dependents { capabilities } => {
            let dependents = index.packages_requiring(&capabilities).await.or_raise(failed)?;
            print_names(&dependents, "no package build-requires these capabilities");
        },
        Query::Subpackages { package } => {
            let subpackages = index.binary_subpackages(&package).await.or_raise(failed)?;
            print_names(&subpackages, &format!("`{package}` has no binary subpackages"));
        },
        Query::Location { package } => {
            println!("{}", index.source_location(&package).await.or_raise(failed)?);
        },
    }
    Ok(())
}
