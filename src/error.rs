//! Error type for statement-kpis.
//!
//! Only fatal conditions live here. Unparseable cells, label misses and
//! zero denominators are recovered locally and never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("Failed to open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("Sheet not found in workbook: {0}")]
    MissingSheet(String),

    #[error("Failed to read sheet {name}: {source}")]
    Sheet {
        name: String,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Layout parse error: {0}")]
    LayoutParse(#[from] serde_yaml_ng::Error),

    #[error("XLSX export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KpiError>;
