/*!
Reconciles paint targets produced by the PDF engine with local surfaces.

The engine renders into its own pixmap type, which the canvas backend can't
draw directly. Anything the engine hands over is wrapped in
[`PaintSource::Foreign`] and converted into a local [`Surface`] before it
reaches a drawing primitive. Conversion first tries a pixel snapshot, then a
data URL, and otherwise settles for a blank surface. It never fails.
*/

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use log::debug;
use thiserror::Error;
use tiny_skia::{
    ColorU8, FilterQuality, Paint, Pattern, Pixmap, PixmapPaint, PixmapRef, Rect, Shader,
    SpreadMode, Transform,
};

use crate::surface::{Surface, SurfaceProvider};

/// A raw RGBA8 copy of a paint target's pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSnapshot {
    /// The width in pixels.
    pub width: u32,
    /// The height in pixels.
    pub height: u32,
    /// Row-major RGBA8 samples, `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Whether the color channels are already multiplied by alpha.
    pub premultiplied: bool,
}

/// Why a pixel snapshot couldn't be taken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The target has no 2D context to read from.
    #[error("paint target has no 2d context")]
    NoContext,
    /// The target refused the read or returned unusable data.
    #[error("unreadable pixel snapshot: {0}")]
    Unreadable(String),
}

/// An intermediate paint target owned by the PDF engine.
pub trait ForeignPaintTarget {
    /// The width in pixels.
    fn width(&self) -> u32;

    /// The height in pixels.
    fn height(&self) -> u32;

    /// Read the target's pixels.
    fn read_pixels(&self) -> Result<PixelSnapshot, SnapshotError>;

    /// Encode the target as a `data:` URL, if it supports that.
    fn to_data_url(&self) -> Option<String> {
        None
    }
}

/// Anything that can be passed to `draw_image` or `create_pattern`.
#[derive(Copy, Clone)]
pub enum PaintSource<'a> {
    /// A pixmap of the local canvas backend.
    Native(PixmapRef<'a>),
    /// A paint target produced by the PDF engine.
    Foreign(&'a dyn ForeignPaintTarget),
}

impl<'a> From<&'a Pixmap> for PaintSource<'a> {
    fn from(pixmap: &'a Pixmap) -> Self {
        PaintSource::Native(pixmap.as_ref())
    }
}

/// The result of adapting a [`PaintSource`].
#[derive(Debug)]
pub enum Drawable<'a> {
    /// A native pixmap, passed through untouched.
    Native(PixmapRef<'a>),
    /// A foreign target copied into a new local surface.
    Converted(Surface),
    /// A foreign target without any pixels to draw.
    Blank,
}

impl Drawable<'_> {
    /// The pixmap to hand to the canvas backend, if there is one.
    pub fn pixmap(&self) -> Option<PixmapRef<'_>> {
        match self {
            Drawable::Native(pixmap) => Some(*pixmap),
            Drawable::Converted(surface) => surface.pixmap().map(Pixmap::as_ref),
            Drawable::Blank => None,
        }
    }
}

/// Converts foreign paint targets into local surfaces.
#[derive(Copy, Clone)]
pub struct CanvasElementAdapter<'p> {
    provider: &'p dyn SurfaceProvider,
}

impl<'p> CanvasElementAdapter<'p> {
    /// Create an adapter that allocates converted surfaces through `provider`.
    pub fn new(provider: &'p dyn SurfaceProvider) -> Self {
        Self { provider }
    }

    /// Make `source` drawable by the local canvas backend.
    pub fn adapt<'s>(&self, source: PaintSource<'s>) -> Drawable<'s> {
        match source {
            PaintSource::Native(pixmap) => Drawable::Native(pixmap),
            PaintSource::Foreign(target) => self.convert(target),
        }
    }

    fn convert(&self, target: &dyn ForeignPaintTarget) -> Drawable<'static> {
        let mut surface = match self.provider.create(target.width(), target.height()) {
            Ok(surface) => surface,
            Err(err) => {
                debug!("not converting foreign paint target: {}", err);
                return Drawable::Blank;
            }
        };

        let Ok(pixmap) = surface.pixmap_mut() else {
            return Drawable::Blank;
        };

        let copied = target
            .read_pixels()
            .and_then(|snapshot| put_image_data(pixmap, &snapshot));

        if let Err(err) = copied {
            debug!("{}, falling back to data url", err);

            match target.to_data_url() {
                Some(url) => {
                    if let Err(err) = draw_data_url(pixmap, &url) {
                        debug!("leaving converted surface blank: {}", err);
                    }
                }
                None => debug!("paint target has no data url, leaving converted surface blank"),
            }
        }

        Drawable::Converted(surface)
    }

    /// Hand a converted surface back to the provider that created it.
    pub fn release(&self, drawable: Drawable<'_>) {
        if let Drawable::Converted(mut surface) = drawable {
            if let Err(err) = self.provider.destroy(&mut surface) {
                debug!("unable to release converted surface: {}", err);
            }
        }
    }
}

/// A repeating fill built from an adapted paint source.
///
/// A converted image is released to its provider when the pattern is dropped.
pub struct CanvasPattern<'a> {
    image: Drawable<'a>,
    spread: SpreadMode,
    adapter: CanvasElementAdapter<'a>,
}

impl CanvasPattern<'_> {
    /// The adapted image the pattern repeats.
    pub fn image(&self) -> &Drawable<'_> {
        &self.image
    }

    /// A shader for the pattern, or `None` when the image is blank.
    pub fn shader(&self, transform: Transform) -> Option<Shader<'_>> {
        let pixmap = self.image.pixmap()?;
        Some(Pattern::new(
            pixmap,
            self.spread,
            FilterQuality::Nearest,
            1.0,
            transform,
        ))
    }
}

impl Drop for CanvasPattern<'_> {
    fn drop(&mut self) {
        let image = std::mem::replace(&mut self.image, Drawable::Blank);
        self.adapter.release(image);
    }
}

/// A 2D drawing context over a surface.
///
/// Every image or pattern source passes through the adapter first, so foreign
/// paint targets never reach the canvas backend.
pub struct DrawingContext<'a> {
    pixmap: &'a mut Pixmap,
    adapter: CanvasElementAdapter<'a>,
}

impl<'a> DrawingContext<'a> {
    pub(crate) fn new(pixmap: &'a mut Pixmap, adapter: CanvasElementAdapter<'a>) -> Self {
        Self { pixmap, adapter }
    }

    /// The width of the underlying surface.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// The height of the underlying surface.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Draw `source` with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, source: PaintSource<'_>, x: i32, y: i32) {
        self.blit(source, x, y, Transform::identity());
    }

    /// Draw `source` at the origin, mapped through `transform`.
    ///
    /// Covers the sized and cropped forms of `drawImage`: scale to a
    /// destination size, translate to move a source rectangle into place.
    pub fn draw_image_with_transform(&mut self, source: PaintSource<'_>, transform: Transform) {
        self.blit(source, 0, 0, transform);
    }

    fn blit(&mut self, source: PaintSource<'_>, x: i32, y: i32, transform: Transform) {
        let drawable = self.adapter.adapt(source);
        if let Some(image) = drawable.pixmap() {
            self.pixmap
                .draw_pixmap(x, y, image, &PixmapPaint::default(), transform, None);
        }
        self.adapter.release(drawable);
    }

    /// Build a pattern from `source`.
    pub fn create_pattern<'r>(
        &self,
        source: PaintSource<'r>,
        spread: SpreadMode,
    ) -> CanvasPattern<'r>
    where
        'a: 'r,
    {
        CanvasPattern {
            image: self.adapter.adapt(source),
            spread,
            adapter: self.adapter,
        }
    }

    /// Fill `rect` with a solid or shader paint.
    pub fn fill_rect(&mut self, rect: Rect, paint: &Paint<'_>) {
        self.pixmap.fill_rect(rect, paint, Transform::identity(), None);
    }

    /// Fill `rect` with `pattern`. Blank patterns draw nothing.
    pub fn fill_rect_with_pattern(
        &mut self,
        rect: Rect,
        pattern: &CanvasPattern<'_>,
        transform: Transform,
    ) {
        if let Some(shader) = pattern.shader(Transform::identity()) {
            let paint = Paint {
                shader,
                ..Paint::default()
            };
            self.pixmap.fill_rect(rect, &paint, transform, None);
        }
    }

    /// Read the whole surface as straight-alpha RGBA8.
    pub fn get_image_data(&self) -> PixelSnapshot {
        let data = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let c = pixel.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        PixelSnapshot {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            data,
            premultiplied: false,
        }
    }
}

fn put_image_data(pixmap: &mut Pixmap, snapshot: &PixelSnapshot) -> Result<(), SnapshotError> {
    let expected = snapshot.width as usize * snapshot.height as usize * 4;
    if snapshot.data.len() != expected {
        return Err(SnapshotError::Unreadable(format!(
            "got {} bytes for a {}x{} snapshot",
            snapshot.data.len(),
            snapshot.width,
            snapshot.height
        )));
    }

    let dst_width = pixmap.width() as usize;
    let src_width = snapshot.width as usize;
    let cols = src_width.min(dst_width);
    let rows = (snapshot.height as usize).min(pixmap.height() as usize);

    for y in 0..rows {
        let src_row = &snapshot.data[y * src_width * 4..][..cols * 4];

        if snapshot.premultiplied {
            pixmap.data_mut()[y * dst_width * 4..][..cols * 4].copy_from_slice(src_row);
        } else {
            let dst_row = &mut pixmap.pixels_mut()[y * dst_width..][..cols];
            for (dst, src) in dst_row.iter_mut().zip(src_row.chunks_exact(4)) {
                *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
            }
        }
    }

    Ok(())
}

fn draw_data_url(pixmap: &mut Pixmap, url: &str) -> Result<(), String> {
    let (mime, payload) = parse_data_url(url)?;
    let format =
        ImageFormat::from_mime_type(mime).ok_or_else(|| format!("unsupported image type {}", mime))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| format!("invalid base64 payload: {}", e))?;
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| format!("unable to decode image: {}", e))?
        .to_rgba8();

    let (width, height) = decoded.dimensions();
    let mut image = Pixmap::new(width, height).ok_or("decoded image is empty")?;
    put_image_data(
        &mut image,
        &PixelSnapshot {
            width,
            height,
            data: decoded.into_raw(),
            premultiplied: false,
        },
    )
    .map_err(|e| e.to_string())?;

    pixmap.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    Ok(())
}

/// Split a `data:<mime>;base64,<payload>` URL into its MIME type and payload.
fn parse_data_url(url: &str) -> Result<(&str, &str), String> {
    let rest = url.strip_prefix("data:").ok_or("not a data url")?;
    let (header, payload) = rest.split_once(',').ok_or("data url has no payload")?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err("only base64 data urls are supported".to_string());
    }

    Ok((mime, payload))
}
