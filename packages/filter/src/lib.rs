#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query composition and shared filter state for the dashboard views.
//!
//! [`compose`] maps the shared filters plus view-local overrides to an
//! ordered parameter set whose encoding is stable enough to use as a
//! re-fetch key. [`FilterStore`] owns the session's filters and option
//! catalog and notifies every view when they are replaced.

pub mod compose;
pub mod store;

pub use compose::{QueryParams, compose, query_string};
pub use roadwatch_filter_models::{
    FilterDimension, FilterError, FilterState, OptionCatalog, QueryOverrides,
};
pub use store::{FilterSnapshot, FilterStore};
