//! Printable reports and the data export.
//!
//! Every report is built as a [`Report`] value and rendered by [`render`]; nothing else in the
//! crate writes report HTML.

pub mod history;
pub mod system;
pub mod template;

pub use history::{bin_report, driver_report};
pub use system::{export_document, system_report, ExportDocument};
pub use template::{render, Block, Metric, Report, Section, Table, Tone};
