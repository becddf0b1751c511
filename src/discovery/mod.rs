//! Git-aware file enumeration.
//!
//! Uses the `ignore` crate to respect .gitignore and walk directories
//! in parallel, then snapshots each in-scope file with a freshness token.

mod files;

pub use files::FileGroup;
