use thiserror::Error;

pub mod csv_log;
pub mod queue;
pub mod snapshot;

pub use csv_log::{ExportLog, ExportOutcome, HEADER, LogRow, export, first_column, image_already_logged};
pub use queue::{ImageQueue, compare_names, find_next_unprocessed};
pub use snapshot::{SNAPSHOT_DIR, snapshot_path, write_snapshot};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export not ready: a graph, an image file and an output file are required")]
    NotReady,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Malformed log row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
