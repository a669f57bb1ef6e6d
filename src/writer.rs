use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::Result;
use crate::surface::Surface;

/// Writes finished surfaces as `page-<N>.png` files.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    out_dir: PathBuf,
}

impl ImageWriter {
    /// Create a writer for `out_dir`. The directory must already exist.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Encode `surface` as PNG and write it for `page_number`, replacing any
    /// existing file.
    pub fn write(&self, surface: &Surface, page_number: usize) -> Result<PathBuf> {
        let png = surface.encode_png()?;
        let path = page_path(&self.out_dir, page_number);
        fs::write(&path, png)?;

        Ok(path)
    }
}

/// The output path of a page.
pub fn page_path(dir: &Path, page_number: usize) -> PathBuf {
    dir.join(format!("page-{}.png", page_number))
}

/// List the `page-<N>.png` files in `dir`, ordered by page number.
pub fn rendered_pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let pattern = Regex::new(r"^page-(\d+)\.png$").expect("valid page file pattern");

    let mut pages: Vec<(usize, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let num = pattern.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((num, path.clone()))
        })
        .collect();

    pages.sort_by_key(|e| e.0);

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{PixmapProvider, SurfaceProvider};
    use tempdir::TempDir;

    #[test]
    fn writes_and_overwrites_page_files() {
        let dir = TempDir::new("pdf2png").unwrap();
        let writer = ImageWriter::new(dir.path());
        let surface = PixmapProvider.create(3, 2).unwrap();

        let first = writer.write(&surface, 7).unwrap();
        assert_eq!(first, dir.path().join("page-7.png"));
        let second = writer.write(&surface, 7).unwrap();
        assert_eq!(first, second);

        let png = fs::read(&first).unwrap();
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
        let size = imagesize::blob_size(&png).unwrap();
        assert_eq!((size.width, size.height), (3, 2));
    }

    #[test]
    fn destroyed_surface_is_not_written() {
        let dir = TempDir::new("pdf2png").unwrap();
        let provider = PixmapProvider;
        let mut surface = provider.create(3, 2).unwrap();
        provider.destroy(&mut surface).unwrap();

        assert!(ImageWriter::new(dir.path()).write(&surface, 1).is_err());
        assert!(!page_path(dir.path(), 1).exists());
    }

    #[test]
    fn lists_pages_in_numeric_order() {
        let dir = TempDir::new("pdf2png").unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt", "page-x.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let numbers: Vec<usize> = rendered_pages(dir.path())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }
}
