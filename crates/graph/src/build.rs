use crate::error::{ErrorKind, Result};
use crate::{CapabilityIndex, Graph, ops};
use exn::ResultExt;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// Where a graph stands, from a scheduler's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Every package has been trimmed.
    Complete,
    /// These packages have no outstanding dependencies and can be built now.
    Ready(BTreeSet<String>),
    /// Packages remain but none of them is ready: they are held by a cycle
    /// that loop breaking cannot resolve.
    Stalled(BTreeSet<String>),
}

/// Forward and reverse build dependencies over a set of source packages.
///
/// `depends_on[pkg]` holds the packages that must be built before `pkg`;
/// `needed_by[dep]` holds the packages waiting on `dep`. Every edge appears in
/// both directions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildGraph {
    depends_on: Graph,
    needed_by: Graph,
}

impl BuildGraph {
    /// Build the graphs for `pkgs`.
    ///
    /// A package depends on another when one of its build requirements is
    /// provided by a binary subpackage of the other. Provides that no package
    /// in the set requires are ignored. When two packages provide the same
    /// required capability the later one (in name order) wins and the conflict
    /// is logged.
    ///
    /// Every package in `pkgs` is a key of [`depends_on`](Self::depends_on),
    /// with an empty set when nothing in the set provides what it needs.
    #[instrument(skip_all, fields(packages = pkgs.len()))]
    pub async fn build<I>(index: &I, pkgs: &BTreeSet<String>) -> Result<Self>
    where
        I: CapabilityIndex + ?Sized,
    {
        let mut requirements = BTreeMap::new();
        let mut all_requirements = BTreeSet::new();
        for pkg in pkgs {
            let reqs = index.build_requirements(pkg).await.or_raise(|| ErrorKind::Lookup(pkg.clone()))?;
            all_requirements.extend(reqs.iter().cloned());
            requirements.insert(pkg, reqs);
        }

        let mut providers: BTreeMap<String, &String> = BTreeMap::new();
        for pkg in pkgs {
            let provides = index.capabilities_provided_by(pkg).await.or_raise(|| ErrorKind::Lookup(pkg.clone()))?;
            for capability in provides.into_iter().filter(|c| all_requirements.contains(c)) {
                if let Some(previous) = providers.insert(capability.clone(), pkg)
                    && previous != pkg
                {
                    tracing::warn!(%capability, %previous, current = %pkg, "duplicate provide");
                }
            }
        }

        let mut graph = Self::default();
        for (pkg, reqs) in requirements {
            let deps = graph.depends_on.entry(pkg.clone()).or_default();
            for dep in reqs.iter().filter_map(|req| providers.get(req)) {
                deps.insert((*dep).clone());
                graph.needed_by.entry((*dep).clone()).or_default().insert(pkg.clone());
            }
        }
        tracing::debug!(edges = graph.edge_count(), "built dependency graph");
        Ok(graph)
    }

    /// Assemble a graph from existing mappings.
    pub fn from_parts(depends_on: Graph, needed_by: Graph) -> Self {
        Self { depends_on, needed_by }
    }

    pub fn into_parts(self) -> (Graph, Graph) {
        (self.depends_on, self.needed_by)
    }

    pub fn depends_on(&self) -> &Graph {
        &self.depends_on
    }

    pub fn needed_by(&self) -> &Graph {
        &self.needed_by
    }

    /// Number of packages not yet trimmed.
    pub fn len(&self) -> usize {
        self.depends_on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty()
    }

    fn edge_count(&self) -> usize {
        self.depends_on.values().map(BTreeSet::len).sum()
    }

    /// Mark packages as built. See [`ops::trim_graph`].
    pub fn trim<S: AsRef<str>>(&mut self, completed: impl IntoIterator<Item = S>) {
        ops::trim_graph(&mut self.depends_on, &self.needed_by, completed);
    }

    /// Break self-loops and mutual pairs in the forward graph, dropping the
    /// mirrored edges from the reverse graph. See [`ops::break_simple_loops`].
    pub fn break_simple_loops(&mut self) -> Vec<(String, String)> {
        let removed = ops::break_simple_loops(&mut self.depends_on);
        for (pkg, dep) in &removed {
            if let Some(dependents) = self.needed_by.get_mut(dep) {
                dependents.remove(pkg);
            }
        }
        if !removed.is_empty() {
            tracing::debug!(?removed, "broke simple loops");
        }
        removed
    }

    /// Packages with no outstanding dependencies.
    pub fn ready(&self) -> BTreeSet<String> {
        self.depends_on.iter().filter(|(_, deps)| deps.is_empty()).map(|(pkg, _)| pkg.clone()).collect()
    }

    pub fn progress(&self) -> Progress {
        if self.is_empty() {
            return Progress::Complete;
        }
        let ready = self.ready();
        if ready.is_empty() {
            Progress::Stalled(self.depends_on.keys().cloned().collect())
        } else {
            Progress::Ready(ready)
        }
    }
}
