use image::{DynamicImage, ImageFormat};
use omero_batch_core::{Error, Image, ImageIo, Probe};
use std::path::Path;

const EXTENSIONS: [&str; 6] = ["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

/// Single-plane raster formats read with the `image` crate. Every file is
/// one series; nothing is stitched.
pub struct RasterIo;

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl ImageIo for RasterIo {
    fn probe(&self, path: &Path) -> Result<Probe, Error> {
        if !is_supported(path) {
            return Err(Error::Decode(format!("unsupported format: {}", path.display())));
        }
        image::image_dimensions(path)
            .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Probe {
            series_count: 1,
            used_files: vec![path.to_path_buf()],
        })
    }

    fn open_series(&self, path: &Path, series: usize) -> Result<Image, Error> {
        if series != 0 {
            return Err(Error::Decode(format!(
                "{} has a single series, not {}",
                path.display(),
                series
            )));
        }
        let pixels =
            image::open(path).map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Image::new(title).with_buffer(pixels))
    }

    fn save_tiff(&self, image: &Image, path: &Path) -> Result<(), Error> {
        let pixels = image
            .buffer::<DynamicImage>()
            .ok_or_else(|| Error::Other(format!("{} has no pixel data", image.title)))?;
        pixels
            .save_with_format(path, ImageFormat::Tiff)
            .map_err(|e| Error::Other(format!("cannot write {}: {}", path.display(), e)))
    }
}
