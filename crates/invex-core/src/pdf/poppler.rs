//! Page rendering through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tracing::{debug, info};

use super::{Rasterizer, Result};
use crate::error::PdfError;

/// Renders every page to PNG with `pdftoppm` and loads the results.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    program: PathBuf,
    dpi: u32,
}

impl PopplerRasterizer {
    /// Create a rasterizer using `pdftoppm` from `PATH`.
    pub fn new(dpi: u32) -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            dpi,
        }
    }

    /// Use a specific `pdftoppm` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new(300)
    }
}

impl Rasterizer for PopplerRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>> {
        let temp_dir = tempfile::tempdir()?;
        let prefix = temp_dir.path().join("page");

        info!("Rendering {} at {} dpi", path.display(), self.dpi);

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(path)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                PdfError::Render(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(PdfError::Render(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        files.sort_by_key(|p| page_number(p));

        let images = files
            .iter()
            .map(|p| image::open(p).map_err(|e| PdfError::Render(format!("{}: {}", p.display(), e))))
            .collect::<Result<Vec<_>>>()?;

        debug!("Rendered {} pages from {}", images.len(), path.display());
        Ok(images)
    }
}

/// Page number from a `pdftoppm` output name such as `page-07.png`.
///
/// Zero padding depends on the page count, so names are ordered numerically.
fn page_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('-').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_ordering() {
        let mut files = vec![
            PathBuf::from("/tmp/page-10.png"),
            PathBuf::from("/tmp/page-2.png"),
            PathBuf::from("/tmp/page-1.png"),
        ];
        files.sort_by_key(|p| page_number(p));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/tmp/page-1.png"),
                PathBuf::from("/tmp/page-2.png"),
                PathBuf::from("/tmp/page-10.png"),
            ]
        );
        assert_eq!(page_number(Path::new("/tmp/page-007.png")), 7);
    }

    #[test]
    fn test_missing_program_is_render_error() {
        let rasterizer = PopplerRasterizer::new(150).with_program("/nonexistent/pdftoppm");
        let result = rasterizer.rasterize(Path::new("invoice.pdf"));
        assert!(matches!(result, Err(PdfError::Render(_))));
    }
}
