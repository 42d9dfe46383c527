#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client-side analytics for the road accident dashboard.
//!
//! The remote service pre-aggregates everything it can; this crate does
//! the reshaping that the views need once a response has been validated:
//!
//! * [`segments::aggregate`] flattens KM buckets into stacked-series rows
//!   and extracts the most critical segment.
//! * [`trend::merge`] joins the historical and forecast series, applying
//!   the reduction lever and uncertainty band to forecast points.
//!
//! Both are synchronous and total: any batch, including an empty one, has
//! a well-defined result.

pub mod segments;
pub mod severity;
pub mod trend;

pub use segments::aggregate;
pub use trend::merge;
