use std::path::PathBuf;

use anyhow::Result;
use iced::widget::image::Handle;

use crate::renderer::{PageSource, PdfiumSource};

/// An open document paired with the path it was loaded from. All page state
/// (count, sizes, rotations) lives in the underlying source; the session is
/// discarded wholesale when a new document is opened.
pub struct PdfDocument<S = PdfiumSource> {
    path: PathBuf,
    source: S,
}

impl<S: PageSource> PdfDocument<S> {
    pub fn new(path: PathBuf, source: S) -> Self {
        Self { path, source }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Untitled")
            .to_string()
    }

    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
        self.source.page_size(page_index)
    }

    pub fn rotate_page(&mut self, page_index: usize, delta_degrees: i32) -> Result<()> {
        self.source.rotate_page(page_index, delta_degrees)
    }

    /// Rasterize a page and hand the pixels to the image widget. The handle
    /// returned here replaces the previously displayed one; dropping the old
    /// handle releases its backing buffer. Render failures are logged and
    /// leave the canvas empty for this action.
    pub fn render_page(&self, page_index: usize, zoom: f32) -> Option<Handle> {
        match self.source.rasterize(page_index, zoom) {
            Ok(img) => {
                let width = img.width();
                let height = img.height();
                Some(Handle::from_rgba(width, height, img.into_raw()))
            }
            Err(e) => {
                tracing::error!("failed to render page {}: {:#}", page_index, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::normalize_rotation;
    use anyhow::{anyhow, bail};
    use image::RgbaImage;

    struct FakeSource {
        sizes: Vec<(f32, f32)>,
        rotations: Vec<i32>,
        broken: bool,
    }

    impl FakeSource {
        fn with_pages(sizes: &[(f32, f32)]) -> Self {
            Self {
                sizes: sizes.to_vec(),
                rotations: vec![0; sizes.len()],
                broken: false,
            }
        }
    }

    impl PageSource for FakeSource {
        fn page_count(&self) -> usize {
            self.sizes.len()
        }

        fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
            let (width, height) = self
                .sizes
                .get(page_index)
                .copied()
                .ok_or_else(|| anyhow!("page {page_index} out of bounds"))?;

            match self.rotations[page_index] {
                90 | 270 => Ok((height, width)),
                _ => Ok((width, height)),
            }
        }

        fn rotate_page(&mut self, page_index: usize, delta_degrees: i32) -> Result<()> {
            let rotation = self
                .rotations
                .get_mut(page_index)
                .ok_or_else(|| anyhow!("page {page_index} out of bounds"))?;

            *rotation = normalize_rotation(*rotation + delta_degrees);
            Ok(())
        }

        fn rasterize(&self, page_index: usize, scale: f32) -> Result<RgbaImage> {
            if self.broken {
                bail!("raster backend unavailable");
            }
            let (width, height) = self.page_size(page_index)?;
            Ok(RgbaImage::new((width * scale) as u32, (height * scale) as u32))
        }
    }

    fn document(sizes: &[(f32, f32)]) -> PdfDocument<FakeSource> {
        PdfDocument::new(
            PathBuf::from("fixtures/sample.pdf"),
            FakeSource::with_pages(sizes),
        )
    }

    #[test]
    fn file_name_comes_from_the_path() {
        let doc = document(&[(500.0, 800.0)]);
        assert_eq!(doc.file_name(), "sample.pdf");
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn quarter_turns_swap_the_reported_page_size() {
        let mut doc = document(&[(500.0, 800.0)]);
        doc.rotate_page(0, 90).expect("rotate");
        assert_eq!(doc.page_size(0).expect("size"), (800.0, 500.0));
        doc.rotate_page(0, 90).expect("rotate");
        assert_eq!(doc.page_size(0).expect("size"), (500.0, 800.0));
    }

    #[test]
    fn rotations_accumulate_modulo_360() {
        let mut doc = document(&[(500.0, 800.0)]);
        for _ in 0..4 {
            doc.rotate_page(0, 90).expect("rotate");
        }
        assert_eq!(doc.page_size(0).expect("size"), (500.0, 800.0));

        doc.rotate_page(0, -90).expect("rotate");
        assert_eq!(doc.page_size(0).expect("size"), (800.0, 500.0));
    }

    #[test]
    fn rendering_a_valid_page_yields_a_handle() {
        let doc = document(&[(500.0, 800.0)]);
        assert!(doc.render_page(0, 1.0).is_some());
    }

    #[test]
    fn rendering_an_out_of_bounds_page_yields_nothing() {
        let doc = document(&[(500.0, 800.0)]);
        assert!(doc.render_page(5, 1.0).is_none());
    }

    #[test]
    fn render_failures_are_swallowed() {
        let mut source = FakeSource::with_pages(&[(500.0, 800.0)]);
        source.broken = true;
        let doc = PdfDocument::new(PathBuf::from("broken.pdf"), source);
        assert!(doc.render_page(0, 1.0).is_none());
    }
}
