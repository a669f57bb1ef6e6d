/*!
Rasterize PDF pages to PNG images.

# Pipeline
A [`PageRenderer`] loads a document with [hayro](https://crates.io/crates/hayro) and
walks its pages in order. For every page it asks a [`SurfaceProvider`] for a
surface sized to the page's viewport, lets hayro paint the page, and hands the
surface to an [`ImageWriter`], which stores it as `page-<N>.png`. The surface is
destroyed before the next page starts.

hayro paints into its own pixmap type, which `tiny-skia` doesn't know how to
draw. The [`adapter`] module converts such foreign paint targets into local
surfaces at every `draw_image` and `create_pattern` call, so the renderer never
needs to know which library produced a pixmap.

# Usage

```rust,ignore
use pdf2png::{PageRenderer, RenderOptions};

let pdf_bytes = std::fs::read("document.pdf")?;
let pages = PageRenderer::new().render_as_png(&pdf_bytes, &RenderOptions { scale: 1.5 })?;
```

# Scraping
With the `scrape` feature enabled, the `scrape` module drives a headless Chrome
to a page, waits for a completion marker and extracts results from the DOM.
It is unrelated to the rasterization pipeline.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
mod error;
mod renderer;
#[cfg(feature = "scrape")]
pub mod scrape;
mod surface;
mod writer;

pub use adapter::{CanvasElementAdapter, DrawingContext, ForeignPaintTarget, PaintSource};
pub use error::{Error, Result};
pub use renderer::*;
pub use surface::{PixmapProvider, Surface, SurfaceProvider};
pub use writer::{page_path, rendered_pages, ImageWriter};
