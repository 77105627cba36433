//! Migration diagnostics
//!
//! Provides:
//! - A typed [`Catalog`] of `category.code` entries loaded from YAML
//! - Positional message templates
//! - A [`Report`] that deduplicates entries, annotates documents with
//!   comments and derives success/error ratios

pub mod catalog;
pub mod entry;
pub mod error;
pub mod report;
pub mod template;

pub use catalog::{Catalog, CatalogEntry, Level};
pub use entry::{EntryKey, ReportEntry, COMPATIBILITY_PREFIX};
pub use error::{CatalogError, ReportError};
pub use report::{Report, ReportSummary};
