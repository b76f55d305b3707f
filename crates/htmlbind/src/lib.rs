//! htmlbind — declarative decoding of HTML documents into typed Rust values.
//!
//! Annotate a struct with `#[derive(Bind)]` and per-field
//! `#[bind(sel = "...", src = "...")]` attributes, then call
//! [`Document::scan`] or [`Selection::scan`] to fill it.

extern crate self as htmlbind;

pub mod coerce;
pub mod config;
pub mod decode;
pub mod document;
pub mod error;
pub mod extractor;
pub mod node;
pub mod policy;
pub mod units;

pub use coerce::{Bind, Field, TextDecode};
pub use config::{Config, CONCURRENT_ENV};
pub use decode::decode;
pub use document::{Document, Selection};
pub use error::{ScanError, ScanResult};
pub use extractor::Extractor;
pub use htmlbind_derive::Bind;
pub use node::BindingNode;
pub use policy::{resolve_policy, SKIP_POLICY};
pub use units::{FloatUnitValue, IntUnitValue, Timestamp};
