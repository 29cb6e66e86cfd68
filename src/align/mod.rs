//! Range filtering and nearest-prior (as-of) alignment.
//!
//! Both operations are pure: no I/O, no shared state, deterministic for a
//! given input.

pub mod asof;
pub mod filter;

pub use asof::align;
pub use filter::filter;
