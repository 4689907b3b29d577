//! The definition-site data model.
//!
//! This module defines how writes to memory are described: a byte [`Offset`] with a
//! distinguished unknown top, a [`DefSite`] naming a byte range of an abstract memory
//! object, and the [`DefinitionsMap`] that associates each object with the set of
//! writer nodes whose effects may still be observed there.
//!
//! # Key Components
//!
//! - [`Offset`] - Finite byte offset or `Unknown`, with saturating arithmetic
//! - [`DefSite`] / [`DefSiteSet`] - A `(target, offset, length)` byte range
//! - [`DefinitionsMap`] / [`WriterSet`] - Interval-keyed writer sets with a bounded
//!   precision cap

mod defmap;
mod defsite;
mod offset;

pub use defmap::{DefinitionsMap, WriterSet};
pub use defsite::{DefSite, DefSiteSet};
pub use offset::Offset;
