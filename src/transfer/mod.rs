//! Exporting and importing every receipt as newline delimited JSON, either
//! on its own or packed in a zip archive.

mod core;
mod endpoints;

pub use core::{
    ImportSummary, SCHEMA_VERSION, export_receipts, export_receipts_zip, import_receipts,
    read_ndjson_from_zip,
};
pub use endpoints::{
    export_receipts_endpoint, export_receipts_zip_endpoint, import_receipts_endpoint,
};
