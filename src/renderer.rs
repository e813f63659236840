use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use pdfium_render::prelude::*;
use thiserror::Error;

/// Errors surfaced to the user when opening a document fails. The
/// application stays in its previous state on any of these.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("PDFium library is not available: {0}")]
    Library(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("{}: not a valid PDF document ({reason})", .path.display())]
    InvalidPdf { path: PathBuf, reason: String },
}

/// Narrow interface the viewer talks to, keeping the rendering library
/// substitutable.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Page size in PDF points at the page's current rotation.
    fn page_size(&self, page_index: usize) -> Result<(f32, f32)>;

    /// Add `delta_degrees` (a multiple of 90) to the page's rotation,
    /// normalized modulo 360. The change lasts for the session only and is
    /// never written back to the file.
    fn rotate_page(&mut self, page_index: usize, delta_degrees: i32) -> Result<()>;

    /// Rasterize the page with the same scale factor applied to both axes.
    fn rasterize(&self, page_index: usize, scale: f32) -> Result<RgbaImage>;
}

/// PDF renderer bound to the PDFium shared library.
pub struct PdfRenderer {
    pdfium: &'static Pdfium,
}

impl PdfRenderer {
    /// Bind PDFium, searching next to the executable first, then the working
    /// directory, then the system library path. The binding is leaked so
    /// loaded documents can outlive this call; it is created once and reused
    /// for every subsequent open.
    pub fn new() -> Result<Self, OpenError> {
        let bindings = Self::bindings().map_err(|e| OpenError::Library(e.to_string()))?;
        Ok(Self {
            pdfium: Box::leak(Box::new(Pdfium::new(bindings))),
        })
    }

    fn bindings() -> Result<Box<dyn PdfiumLibraryBindings>, PdfiumError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));

        if let Some(dir) = exe_dir {
            if let Ok(bindings) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            {
                return Ok(bindings);
            }
        }

        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
    }

    /// Open a document, classifying filesystem problems before handing the
    /// path to PDFium. A document without any pages is rejected.
    pub fn open_document(&self, path: &Path) -> Result<PdfiumSource, OpenError> {
        probe(path)?;

        let document =
            self.pdfium
                .load_pdf_from_file(path, None)
                .map_err(|e| OpenError::InvalidPdf {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        if document.pages().len() == 0 {
            return Err(OpenError::InvalidPdf {
                path: path.to_path_buf(),
                reason: String::from("document has no pages"),
            });
        }

        Ok(PdfiumSource { inner: document })
    }
}

/// Document handle backed by PDFium.
pub struct PdfiumSource {
    inner: PdfDocument<'static>,
}

impl PageSource for PdfiumSource {
    fn page_count(&self) -> usize {
        self.inner.pages().len() as usize
    }

    fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
        let page = self
            .inner
            .pages()
            .get(page_index as u16)
            .context("page index out of bounds")?;

        Ok((page.width().value, page.height().value))
    }

    fn rotate_page(&mut self, page_index: usize, delta_degrees: i32) -> Result<()> {
        let mut page = self
            .inner
            .pages()
            .get(page_index as u16)
            .context("page index out of bounds")?;

        let current = rotation_degrees(page.rotation().context("failed to read page rotation")?);
        page.set_rotation(rotation_from_degrees(current + delta_degrees));

        Ok(())
    }

    fn rasterize(&self, page_index: usize, scale: f32) -> Result<RgbaImage> {
        let page = self
            .inner
            .pages()
            .get(page_index as u16)
            .context("page index out of bounds")?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap = page
            .render_with_config(&config)
            .context("failed to render page")?;

        Ok(bitmap.as_image().into_rgba8())
    }
}

/// Normalize an accumulated rotation into [0, 360).
pub fn normalize_rotation(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

fn rotation_degrees(rotation: PdfPageRenderRotation) -> i32 {
    match rotation {
        PdfPageRenderRotation::None => 0,
        PdfPageRenderRotation::Degrees90 => 90,
        PdfPageRenderRotation::Degrees180 => 180,
        PdfPageRenderRotation::Degrees270 => 270,
    }
}

fn rotation_from_degrees(degrees: i32) -> PdfPageRenderRotation {
    match normalize_rotation(degrees) {
        90 => PdfPageRenderRotation::Degrees90,
        180 => PdfPageRenderRotation::Degrees180,
        270 => PdfPageRenderRotation::Degrees270,
        _ => PdfPageRenderRotation::None,
    }
}

fn probe(path: &Path) -> Result<(), OpenError> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            Err(OpenError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(OpenError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_normalizes_to_a_quarter_turn() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(-360), 0);
    }

    #[test]
    fn four_quarter_turns_return_to_the_start() {
        let mut degrees = 0;
        for _ in 0..4 {
            degrees = normalize_rotation(degrees + 90);
        }
        assert_eq!(degrees, 0);
        for _ in 0..4 {
            degrees = normalize_rotation(degrees - 90);
        }
        assert_eq!(degrees, 0);
    }

    #[test]
    fn rotation_round_trips_through_the_library_enum() {
        for degrees in [0, 90, 180, 270] {
            assert_eq!(rotation_degrees(rotation_from_degrees(degrees)), degrees);
        }
    }

    #[test]
    fn probing_a_missing_file_reports_not_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.pdf");
        assert!(matches!(probe(&path), Err(OpenError::NotFound(_))));
    }

    #[test]
    fn probing_an_existing_file_succeeds() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        assert!(probe(file.path()).is_ok());
    }
}
