//! Document formatting pipeline for Pressmark.
//!
//! Ties together cover-image resolution, date normalization, optional AI
//! enrichment, and serialization into a single [`Formatter`].

pub mod dates;
pub mod formatter;

pub use dates::{parse_date, to_iso};
pub use formatter::{Enricher, Enrichment, Formatter, ImageResolver, Serializer};
