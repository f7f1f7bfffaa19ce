//! Build-order graphs over a set of source packages.
//!
//! [`BuildGraph::build`] asks a [`CapabilityIndex`] what each package needs
//! and provides, and links packages whose build requirements are satisfied by
//! another package in the set. A scheduler then repeatedly takes the
//! [`ready`](BuildGraph::ready) packages, builds them, and
//! [`trim`](BuildGraph::trim)s them out. [`break_simple_loops`] clears
//! self-loops and mutual pairs; anything longer shows up as
//! [`Progress::Stalled`].

mod build;
pub mod error;
mod index;
mod ops;

pub use crate::build::{BuildGraph, Progress};
pub use crate::index::CapabilityIndex;
pub use crate::ops::{break_simple_loops, trim_graph};
use std::collections::{BTreeMap, BTreeSet};

/// Package name to the set of package names it is linked to.
pub type Graph = BTreeMap<String, BTreeSet<String>>;
