//! # Source-program model used by the mend repair engine
//!
//! This crate holds everything the engine knows about the program under
//! repair before any mutation happens: the abstract syntax tree of a small
//! C subset, the pass that gives every mutatable statement a dense numeric
//! identity, and the [`store::AtomStore`] which freezes the parsed program
//! together with its scope tables and donor code bank.
//!
//! ## Statement identities
//!
//! Statements are addressed by [`ast::StatementId`], a dense positive
//! integer assigned in a single numbering pass. Id `0` is reserved for
//! statements that must never be touched, which is also the id every cloned
//! statement is reset to before it is inlined somewhere else.
//!
//! ## Scope information
//!
//! For every numbered statement the store records which variables are in
//! scope at that location (`locals_have`) and which non-global variables the
//! statement's subtree actually reads or writes (`locals_used`). The scope
//! predicate built on top of the two tables is what keeps transplanted code
//! compilable.
//!
//! ## Coverage
//!
//! [`instrument`] renders an instrumented copy of a file which reports every
//! executed numbered statement to a trace file, one id per line.

pub mod ast;
pub mod instrument;
pub mod provider;
pub mod store;

mod error;

pub use self::error::{Error, Result};
