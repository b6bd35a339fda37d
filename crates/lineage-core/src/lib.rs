//! Core types and capability traits for the lineage reconciliation engine.
//!
//! No HTTP or database dependencies live here. The
//! engine, the SQLite store and the CLI all depend on it; it depends on
//! nothing but serialisation and error plumbing.

// Native `async fn` in traits; futures are spelled out with `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod citation;
pub mod edge;
pub mod error;
pub mod event;
pub mod payload;
pub mod person;
pub mod report;
pub mod tree;
pub mod upstream;

pub use error::{Error, Result};
