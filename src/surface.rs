use log::debug;
use tiny_skia::Pixmap;

use crate::adapter::{CanvasElementAdapter, DrawingContext};
use crate::error::{Error, Result};

/// An owned raster drawing target.
///
/// The backing pixmap is released explicitly through
/// [`SurfaceProvider::destroy`]; afterwards every operation on the surface
/// fails with [`Error::MissingSurface`].
#[derive(Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    pixmap: Option<Pixmap>,
}

impl Surface {
    pub(crate) fn allocate(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            width,
            height,
            pixmap: Some(new_pixmap(width, height)?),
        })
    }

    /// The width in pixels, 0 once destroyed.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels, 0 once destroyed.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the surface still owns its backing pixmap.
    pub fn is_live(&self) -> bool {
        self.pixmap.is_some()
    }

    /// The backing pixmap, if the surface hasn't been destroyed.
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub(crate) fn pixmap_mut(&mut self) -> Result<&mut Pixmap> {
        self.pixmap.as_mut().ok_or(Error::MissingSurface)
    }

    /// Acquire a 2D drawing context for this surface.
    pub fn context(&mut self) -> Result<DrawingContext<'_>> {
        self.context_with(&PixmapProvider)
    }

    /// Acquire a drawing context whose foreign-target conversions allocate
    /// through `provider`.
    pub fn context_with<'a>(
        &'a mut self,
        provider: &'a dyn SurfaceProvider,
    ) -> Result<DrawingContext<'a>> {
        let pixmap = self.pixmap_mut()?;
        Ok(DrawingContext::new(pixmap, CanvasElementAdapter::new(provider)))
    }

    /// Serialize the surface as a PNG image.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .as_ref()
            .ok_or(Error::MissingSurface)?
            .encode_png()
            .map_err(|e| Error::Encode(e.to_string()))
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or(Error::InvalidDimension { width, height })
}

/// The allocation contract the page renderer relies on.
///
/// Every surface handed out by `create` is expected to be passed to `destroy`
/// exactly once.
pub trait SurfaceProvider {
    /// Allocate a new surface. Fails with [`Error::InvalidDimension`] if
    /// either dimension is zero.
    fn create(&self, width: u32, height: u32) -> Result<Surface>;

    /// Resize `surface` in place. Its previous content is not preserved.
    fn reset(&self, surface: &mut Surface, width: u32, height: u32) -> Result<()>;

    /// Release the backing pixmap and zero the dimensions.
    fn destroy(&self, surface: &mut Surface) -> Result<()>;
}

/// The default provider, backed by `tiny-skia` pixmaps.
#[derive(Debug, Default, Copy, Clone)]
pub struct PixmapProvider;

impl SurfaceProvider for PixmapProvider {
    fn create(&self, width: u32, height: u32) -> Result<Surface> {
        debug!("creating {}x{} surface", width, height);
        Surface::allocate(width, height)
    }

    fn reset(&self, surface: &mut Surface, width: u32, height: u32) -> Result<()> {
        if surface.pixmap.is_none() {
            return Err(Error::MissingSurface);
        }

        surface.pixmap = Some(new_pixmap(width, height)?);
        surface.width = width;
        surface.height = height;

        Ok(())
    }

    fn destroy(&self, surface: &mut Surface) -> Result<()> {
        if surface.pixmap.take().is_none() {
            return Err(Error::MissingSurface);
        }

        surface.width = 0;
        surface.height = 0;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_reports_requested_size() {
        for (w, h) in [(1, 1), (10, 3), (612, 792)] {
            let surface = PixmapProvider.create(w, h).unwrap();
            assert_eq!((surface.width(), surface.height()), (w, h));
            let pixmap = surface.pixmap().unwrap();
            assert_eq!((pixmap.width(), pixmap.height()), (w, h));
        }
    }

    #[test]
    fn create_rejects_zero_dimensions() {
        for (w, h) in [(0, 10), (10, 0), (0, 0)] {
            assert!(matches!(
                PixmapProvider.create(w, h),
                Err(Error::InvalidDimension { .. })
            ));
        }
    }

    #[test]
    fn reset_resizes_and_clears() {
        let provider = PixmapProvider;
        let mut surface = provider.create(4, 4).unwrap();
        surface
            .pixmap_mut()
            .unwrap()
            .fill(tiny_skia::Color::BLACK);

        provider.reset(&mut surface, 8, 2).unwrap();
        assert_eq!((surface.width(), surface.height()), (8, 2));
        assert!(surface
            .pixmap()
            .unwrap()
            .pixels()
            .iter()
            .all(|p| p.alpha() == 0));

        assert!(matches!(
            provider.reset(&mut surface, 0, 2),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn destroyed_surface_fails_fast() {
        let provider = PixmapProvider;
        let mut surface = provider.create(5, 5).unwrap();
        provider.destroy(&mut surface).unwrap();

        assert!(!surface.is_live());
        assert_eq!((surface.width(), surface.height()), (0, 0));
        assert!(matches!(
            provider.destroy(&mut surface),
            Err(Error::MissingSurface)
        ));
        assert!(matches!(
            provider.reset(&mut surface, 5, 5),
            Err(Error::MissingSurface)
        ));
        assert!(matches!(surface.context(), Err(Error::MissingSurface)));
        assert!(matches!(surface.encode_png(), Err(Error::MissingSurface)));
    }
}
