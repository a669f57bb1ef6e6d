use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hayro::{render as render_page, Pdf, RenderSettings};
use hayro_interpret::InterpreterSettings;
use log::{debug, info};

use crate::adapter::{ForeignPaintTarget, PaintSource, PixelSnapshot, SnapshotError};
use crate::error::{Error, Result};
use crate::surface::{PixmapProvider, Surface, SurfaceProvider};
use crate::writer::ImageWriter;

/// The options that should be applied when rendering a PDF to a pixmap.
#[derive(Copy, Clone, Debug)]
pub struct RenderOptions {
    /// By how much the original size should be scaled.
    pub scale: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl RenderOptions {
    fn validate(&self) -> Result<()> {
        if self.scale.is_finite() && self.scale > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!("invalid scale factor {}", self.scale)))
        }
    }
}

/// The pixel size a page is rendered at.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// The width in whole pixels.
    pub width: u32,
    /// The height in whole pixels.
    pub height: u32,
    /// The scale factor relative to the page's size in points.
    pub scale: f32,
}

impl Viewport {
    /// Compute the viewport of a page that is `page_width` x `page_height`
    /// points large. Fractional pixels are truncated.
    pub fn new(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            width: (page_width * scale).floor() as u32,
            height: (page_height * scale).floor() as u32,
            scale,
        }
    }
}

/// A page whose surface is ready to be written.
#[derive(Debug)]
pub struct RenderedPage {
    /// The 1-based page number.
    pub number: usize,
    /// The surface the page was rendered into.
    pub surface: Surface,
}

/// A document rendered as PNG images.
pub type RenderedDocument = Vec<Vec<u8>>;

/// The pixmap hayro renders into, seen as a foreign paint target.
struct EnginePixmap<'a> {
    width: u32,
    height: u32,
    // premultiplied RGBA8
    data: &'a [u8],
}

impl ForeignPaintTarget for EnginePixmap<'_> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn read_pixels(&self) -> std::result::Result<PixelSnapshot, SnapshotError> {
        Ok(PixelSnapshot {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
            premultiplied: true,
        })
    }
}

/// Renders every page of a document into surfaces from a [`SurfaceProvider`].
///
/// Pages are rendered strictly in order. Each surface is destroyed once the
/// page has been handed off, before the next page starts.
pub struct PageRenderer<P = PixmapProvider> {
    provider: P,
    interpreter_settings: InterpreterSettings,
}

impl PageRenderer<PixmapProvider> {
    /// Create a renderer backed by `tiny-skia` pixmaps.
    pub fn new() -> Self {
        Self::with_provider(PixmapProvider)
    }
}

impl Default for PageRenderer<PixmapProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SurfaceProvider> PageRenderer<P> {
    /// Create a renderer that allocates surfaces through `provider`.
    pub fn with_provider(provider: P) -> Self {
        Self {
            provider,
            interpreter_settings: InterpreterSettings::default(),
        }
    }

    /// The surface provider in use.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Render each page of `buf` and pass it to `sink`.
    ///
    /// Stops at the first failure; pages already handed to `sink` stay
    /// handled. Returns the number of pages in the document.
    pub fn render_pages<F>(
        &self,
        buf: &[u8],
        options: &RenderOptions,
        mut sink: F,
    ) -> Result<usize>
    where
        F: FnMut(&RenderedPage) -> Result<()>,
    {
        options.validate()?;

        let pdf = Pdf::new(Arc::new(buf.to_vec()))
            .map_err(|e| Error::EngineFailure(format!("unable to load pdf document: {:?}", e)))?;
        let pages = pdf.pages();
        info!("PDF document loaded with {} pages", pages.len());

        for (index, page) in pages.iter().enumerate() {
            let (page_width, page_height) = page.render_dimensions();
            let viewport = Viewport::new(page_width, page_height, options.scale);
            debug!("rendering page {} at {:?}", index + 1, viewport);

            let mut rendered = RenderedPage {
                number: index + 1,
                surface: self.provider.create(viewport.width, viewport.height)?,
            };

            let render_settings = RenderSettings {
                x_scale: viewport.scale,
                y_scale: viewport.scale,
                ..Default::default()
            };
            let pixmap = render_page(page, &self.interpreter_settings, &render_settings);

            let painted = rendered.surface.context().map(|mut ctx| {
                let target = EnginePixmap {
                    width: u32::from(pixmap.width()),
                    height: u32::from(pixmap.height()),
                    data: pixmap.data_as_u8_slice(),
                };
                ctx.draw_image(PaintSource::Foreign(&target), 0, 0);
            });
            // Release the engine's page buffer before handing the page off.
            drop(pixmap);

            let handled = painted.and_then(|()| sink(&rendered));
            let destroyed = self.provider.destroy(&mut rendered.surface);
            handled?;
            destroyed?;
        }

        Ok(pages.len())
    }

    /// Render a PDF file as a sequence of PNG images.
    pub fn render_as_png(&self, buf: &[u8], options: &RenderOptions) -> Result<RenderedDocument> {
        let mut pages = vec![];
        self.render_pages(buf, options, |page| {
            pages.push(page.surface.encode_png()?);
            Ok(())
        })?;

        Ok(pages)
    }

    /// Render a PDF file into `out_dir` as `page-<N>.png` files.
    pub fn render_to_dir(
        &self,
        buf: &[u8],
        out_dir: &Path,
        options: &RenderOptions,
    ) -> Result<Vec<PathBuf>> {
        let writer = ImageWriter::new(out_dir);
        let mut written = vec![];

        self.render_pages(buf, options, |page| {
            let path = writer.write(&page.surface, page.number)?;
            info!("page {} rendered and saved as {}", page.number, path.display());
            written.push(path);
            Ok(())
        })?;

        Ok(written)
    }
}

/// Render the PDF at `pdf_path` into `output_dir` at `scale`.
pub fn render(pdf_path: &Path, output_dir: &Path, scale: f32) -> Result<Vec<PathBuf>> {
    let buf = fs::read(pdf_path)?;
    PageRenderer::new().render_to_dir(&buf, output_dir, &RenderOptions { scale })
}
