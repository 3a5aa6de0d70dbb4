use crate::ExportError;
use crate::csv_log::ExportLog;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Dictionary-style name order: case-insensitive first, then ordinal as a
/// tie-break so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

// A file named exactly `.png` has no extension as far as `Path` is
// concerned, so it is skipped.
fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The `.png` files of one folder, in name order.
#[derive(Debug, Clone)]
pub struct ImageQueue {
    folder: PathBuf,
}

impl ImageQueue {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Every eligible image directly inside the folder, sorted by name.
    ///
    /// An empty folder path (the parent of a bare file name) means the
    /// working directory, and the listed paths stay bare names.
    pub fn images(&self) -> Result<Vec<PathBuf>, ExportError> {
        let here = self.folder.as_os_str().is_empty();
        let root = if here { Path::new(".") } else { self.folder.as_path() };

        let mut images = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() && is_png(entry.path()) {
                let path = entry.into_path();
                let path = match path.strip_prefix(".") {
                    Ok(bare) if here => bare.to_path_buf(),
                    _ => path,
                };
                images.push(path);
            }
        }
        images.sort_by(|a, b| compare_names(&file_name(a), &file_name(b)));
        Ok(images)
    }

    /// First image, in name order, that the log at `output_path` has not
    /// recorded yet. `None` when the folder is exhausted.
    pub fn next_unprocessed(&self, output_path: Option<&Path>) -> Result<Option<PathBuf>, ExportError> {
        self.next_unprocessed_after(output_path, None)
    }

    /// Like [`ImageQueue::next_unprocessed`], but also treats `pending` as
    /// processed. Used to pick the next image before `pending` is logged.
    pub fn next_unprocessed_after(
        &self,
        output_path: Option<&Path>,
        pending: Option<&str>,
    ) -> Result<Option<PathBuf>, ExportError> {
        let output_path = output_path.ok_or_else(|| {
            ExportError::InvalidState("an output file is required to find the next image".to_string())
        })?;
        let mut processed = ExportLog::new(output_path).processed_images()?;
        processed.extend(pending.map(str::to_string));

        let next = self
            .images()?
            .into_iter()
            .find(|path| !processed.contains(&file_name(path)));
        match &next {
            Some(path) => tracing::debug!("Next unprocessed image: {}", path.display()),
            None => tracing::info!("No unprocessed images left in {}", self.folder.display()),
        }
        Ok(next)
    }
}

/// Convenience wrapper over [`ImageQueue::next_unprocessed`].
pub fn find_next_unprocessed(
    folder: &Path,
    output_path: Option<&Path>,
) -> Result<Option<PathBuf>, ExportError> {
    ImageQueue::new(folder).next_unprocessed(output_path)
}
