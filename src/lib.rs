//! Umbrella package for the mend engine workspace.
//!
//! The engine itself lives in the `lib/` crates and the `bin/cli` binary;
//! this package hosts the cross-crate integration tests under `tests/`.
