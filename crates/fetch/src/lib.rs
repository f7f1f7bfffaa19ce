//! Bounded concurrent retrieval of repository artifacts.
//!
//! A [`Retriever`] knows how to turn a source location into a byte stream
//! (HTTP, a local mirror, or an in-memory mock). [`fetch_all`] drives a batch
//! of [`FetchItem`]s through a retriever with a concurrency bound, streaming
//! each one to disk (decompressing on the way when asked), and skips any item
//! whose destination is already present.

mod batch;
pub mod error;
pub mod retriever;

pub use crate::batch::{FetchItem, Fetched, fetch_all};
pub use crate::retriever::{BoxAsyncRead, Retriever, for_source};
use std::sync::Arc;

pub type RetrieverHandle = Arc<dyn Retriever + Send + Sync>;
