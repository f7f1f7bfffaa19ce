//! `rpmorder order` command implementation.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rpmorder_config::Config;
use rpmorder_graph::{BuildGraph, Progress};
use std::collections::BTreeSet;

/// Print the build waves for `packages`: each line holds the packages that
/// can be built once every earlier line has been built.
pub async fn run(config: &Config, packages: Vec<String>) -> Result<()> {
    let packages: BTreeSet<String> = packages.into_iter().collect();
    let index = super::open(config).await?;
    let graph = BuildGraph::build(&index, &packages).await.or_raise(|| ErrorKind::Query);
    index.close().await;
    let mut graph = graph?;

    let schedule = schedule(&mut graph);
    for (number, wave) in schedule.waves.iter().enumerate() {
        super::display::print_group(&(number + 1).to_string(), wave);
    }
    if schedule.stalled.is_empty() {
        return Ok(());
    }
    eprintln!("no package is ready; remaining packages depend on each other:");
    for (pkg, deps) in graph.depends_on() {
        let deps = deps.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        eprintln!("  {pkg} -> {deps}");
    }
    exn::bail!(ErrorKind::Stalled(schedule.stalled.len()))
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub waves: Vec<BTreeSet<String>>,
    /// Packages left when no further package became ready.
    pub stalled: BTreeSet<String>,
}

/// Drain `graph` wave by wave, breaking simple loops before each wave.
///
/// On a stall the graph is left holding the packages that could not be
/// scheduled.
pub fn schedule(graph: &mut BuildGraph) -> Schedule {
    let mut schedule = Schedule::default();
    loop {
        for (pkg, dep) in graph.break_simple_loops() {
            tracing::warn!(package = %pkg, dependency = %dep, "ignoring circular build dependency");
        }
        match graph.progress() {
            Progress::Complete => return schedule,
            Progress::Ready(ready) => {
                graph.trim(&ready);
                schedule.waves.push(ready);
            },
            Progress::Stalled(remaining) => {
                schedule.stalled = remaining;
                return schedule;
            },
        }
    }
}
