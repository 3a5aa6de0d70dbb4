use crate::ExportError;
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder, beside the source images, that holds annotated snapshots.
pub const SNAPSHOT_DIR: &str = "ConceptMapperScreenshots";

/// `<folder>/ConceptMapperScreenshots/<stem>_nodes<.ext>` for `image_path`.
pub fn snapshot_path(image_path: &Path) -> PathBuf {
    let folder = image_path.parent().unwrap_or(Path::new("."));
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = image_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    folder
        .join(SNAPSHOT_DIR)
        .join(format!("{stem}_nodes{extension}"))
}

/// Save `canvas` as PNG at [`snapshot_path`], creating the folder on demand.
pub fn write_snapshot(image_path: &Path, canvas: &RgbaImage) -> Result<PathBuf, ExportError> {
    let path = snapshot_path(image_path);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    canvas.save_with_format(&path, ImageFormat::Png)?;
    tracing::debug!("Saved snapshot {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_path() {
        assert_eq!(
            snapshot_path(Path::new("/maps/student 1.PNG")),
            PathBuf::from("/maps/ConceptMapperScreenshots/student 1_nodes.PNG")
        );
        assert_eq!(
            snapshot_path(Path::new("maps/noext")),
            PathBuf::from("maps/ConceptMapperScreenshots/noext_nodes")
        );
    }

    #[test]
    fn test_write_snapshot_creates_folder() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let image_path = dir.path().join("map.png");

        let mut canvas = RgbaImage::new(4, 3);
        canvas.put_pixel(1, 1, image::Rgba([255, 0, 0, 128]));
        let written = write_snapshot(&image_path, &canvas)?;

        assert_eq!(written, dir.path().join(SNAPSHOT_DIR).join("map_nodes.png"));
        let reloaded = image::open(&written)?.to_rgba8();
        assert_eq!(reloaded.dimensions(), (4, 3));
        assert_eq!(reloaded.get_pixel(1, 1), &image::Rgba([255, 0, 0, 128]));

        // A second write into the existing folder overwrites in place.
        write_snapshot(&image_path, &RgbaImage::new(2, 2))?;
        assert_eq!(image::open(&written)?.to_rgba8().dimensions(), (2, 2));
        Ok(())
    }
}
