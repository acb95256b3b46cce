//! # Candidate variants
//!
//! A variant is the original program plus an ordered list of [`Edit`]s.
//! This crate owns the edit model, the wire format used to ship edit
//! histories between demes, the fault/fix localization attached to every
//! variant, and the two interchangeable representation flavors:
//!
//! - [`PatchProgram`] shares the frozen [`program::store::AtomStore`] and
//!   keeps only the edit history; the mutated tree is materialized on
//!   demand.
//! - [`TreeProgram`] owns a deep copy of the tree and applies every edit
//!   eagerly; its history is provenance.
//!
//! Both implement [`Representation`], which is all the search layer sees.

pub mod codec;
pub mod localization;
pub mod template;

mod context;
mod edit;
mod error;
mod repr;

pub use self::{
    context::{CoreContext, SemanticCheck},
    edit::{Edit, EditHistory},
    error::{Error, Result},
    localization::{Localization, WeightedAtom},
    repr::{PatchProgram, Representation, TreeProgram},
    template::{Template, TemplateCatalog},
};
