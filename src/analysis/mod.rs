//! Analysis over estimated graphs.

pub mod filter;

pub use filter::*;
