//! Streaming JPEG segment scanning and metadata removal.
//!
//! A JPEG stream is a sequence of marker-delimited segments followed by raw
//! entropy-coded scan data. [`strip`] walks that structure once, front to
//! back, and copies, drops, or prefix-inspects each segment according to a
//! [`RuleSet`] built from [`MetadataKind`] categories. The compressed image
//! data is passed through untouched, so the output is the input minus
//! exactly the matched metadata segments.
//!
//! - [`MetadataKind`] / [`RuleSet`] — the removal policy (which markers,
//!   which payload signatures)
//! - [`strip`] — the scanner/rewriter itself

mod policy;
mod scanner;

pub use policy::{
    APP1, APP2, COM, EXIF_PREFIX, MetadataKind, PolicyError, RuleSet, SegmentRule, XMP_PREFIX,
};
pub use scanner::{StripError, strip};
