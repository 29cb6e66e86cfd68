//! Input/output helpers.
//!
//! - CSV ingest + normalization (`ingest`)
//! - index snapshots (`snapshot`)
//! - aligned-table and image exports (`export`)

pub mod export;
pub mod ingest;
pub mod snapshot;

pub use export::*;
pub use ingest::*;
pub use snapshot::*;
