//! # exif-cleaner
//!
//! Strip EXIF, XMP, ICC profile, and comment metadata from JPEG images
//! without re-encoding. The scanner walks the marker-delimited segment
//! structure of a JPEG stream and excises exactly the selected metadata
//! segments — the compressed image data and every other segment pass
//! through byte-for-byte intact.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline module,
//! which handles whole files (collection, temp-file output, backups):
//!
//! ```rust,no_run
//! use exif_cleaner::config::Config;
//! use exif_cleaner::jpeg::RuleSet;
//! use exif_cleaner::pipeline::{collect_images, process_file};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let rules = RuleSet::from_names(&config.strip.categories)?;
//!
//!     for path in collect_images(&[PathBuf::from("./photos")]) {
//!         let report = process_file(&path, &rules, &config);
//!         match report.error {
//!             None => println!(
//!                 "{} -> {} ({} bytes removed)",
//!                 report.path.display(),
//!                 report.output_path.unwrap().display(),
//!                 report.bytes_in - report.bytes_out,
//!             ),
//!             Some(err) => eprintln!("{}: {err}", report.path.display()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! For more control, build a [`RuleSet`](jpeg::RuleSet) yourself and run
//! the scanner over any `Read`/`Write` pair — a network body, an
//! in-memory buffer, a file:
//!
//! ```rust,no_run
//! use exif_cleaner::jpeg::{strip, MetadataKind, RuleSet};
//!
//! fn main() -> anyhow::Result<()> {
//!     let rules = RuleSet::from_kinds([MetadataKind::Exif, MetadataKind::Xmp])?;
//!
//!     let input = std::fs::read("photo.jpg")?;
//!     let mut cleaned = Vec::with_capacity(input.len());
//!     strip(input.as_slice(), &mut cleaned, &rules)?;
//!
//!     std::fs::write("cleaned.jpg", &cleaned)?;
//!     Ok(())
//! }
//! ```
//!
//! The scanner reads its input once, front to back, and streams the
//! entropy-coded scan data in bounded chunks, so arbitrarily large images
//! never have to fit in memory. Malformed inputs are rejected with
//! structured errors ([`StripError`](jpeg::StripError)) the embedding
//! service can map to its own status codes.
//!
//! ## Metadata Categories
//!
//! | Category | Segment | Identified by |
//! |----------|---------|---------------|
//! | `exif` | APP1 | `Exif\0\0` payload signature |
//! | `xmp` | APP1 | `http://ns.adobe.com/xap/1.0/` payload signature |
//! | `icc` | APP2 | marker alone |
//! | `comment` (or `com`) | COM | marker alone |
//!
//! ## Modules
//!
//! - [`jpeg`] — segment scanner/rewriter and removal policy
//! - [`config`] — configuration types and loading/saving
//! - [`pipeline`] — file collection and per-file processing

pub mod config;
pub mod jpeg;
pub mod pipeline;
