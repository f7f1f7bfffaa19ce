//! In-place graph mutations.
//!
//! These work on bare [`Graph`] mappings so that callers holding their own
//! forward/reverse pair can use them directly. [`BuildGraph`](crate::BuildGraph)
//! wraps them and keeps both directions consistent.

use crate::Graph;

/// Remove every package in `completed` from the forward graph.
///
/// Each completed package is dropped from the dependency set of every package
/// that `needed_by` says depends on it, and its own entry in `depends_on` is
/// removed. `needed_by` is not touched. Packages that were already trimmed, or
/// never present, are ignored, so overlapping calls are safe.
pub fn trim_graph<S: AsRef<str>>(depends_on: &mut Graph, needed_by: &Graph, completed: impl IntoIterator<Item = S>) {
    for pkg in completed {
        let pkg = pkg.as_ref();
        if let Some(dependents) = needed_by.get(pkg) {
            for dependent in dependents {
                if let Some(deps) = depends_on.get_mut(dependent) {
                    deps.remove(pkg);
                }
            }
        }
        depends_on.remove(pkg);
    }
}

/// Break self-loops and mutual two-package loops.
///
/// Keys are visited in order. A key listed in its own set is removed from it;
/// then, if the key depends on exactly one package and that package depends on
/// exactly (and only) the key, both sets are cleared. Longer cycles are left
/// alone. A dependency that is not a key of `graph` counts as having no
/// dependencies.
///
/// Returns the removed `(package, dependency)` edges in removal order.
pub fn break_simple_loops(graph: &mut Graph) -> Vec<(String, String)> {
    let mut removed = Vec::new();
    let keys: Vec<String> = graph.keys().cloned().collect();
    for key in keys {
        let Some(deps) = graph.get_mut(&key) else { continue };
        if deps.remove(&key) {
            removed.push((key.clone(), key.clone()));
        }
        if deps.len() != 1 {
            continue;
        }
        let Some(other) = deps.first().cloned() else { continue };
        let mutual = graph.get(&other).is_some_and(|back| back.len() == 1 && back.contains(&key));
        if !mutual {
            continue;
        }
        if let Some(deps) = graph.get_mut(&key) {
            deps.clear();
        }
        if let Some(back) = graph.get_mut(&other) {
            back.clear();
        }
        removed.push((key.clone(), other.clone()));
        removed.push((other, key));
    }
    removed
}
