pub mod local;
pub mod remote;
pub mod walk;

use crate::error::Error;
use crate::image::{Image, ImageIo};
use crate::remote::{RemoteImageRef, RemoteStore};
use std::fmt;
use std::path::PathBuf;

pub use local::LocalImages;
pub use remote::RemoteImages;

#[derive(Debug, Clone, PartialEq)]
pub enum UnitHandle {
    Local { path: PathBuf, series: usize },
    Remote(RemoteImageRef),
}

/// One image to process. Opening it decodes the image; the caller owns the
/// result for one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUnit {
    pub handle: UnitHandle,
    /// Human-readable position, e.g. `Image 3/10`.
    pub progress: String,
}

impl BatchUnit {
    pub fn remote_id(&self) -> Option<i64> {
        match &self.handle {
            UnitHandle::Local { .. } => None,
            UnitHandle::Remote(image) => Some(image.id),
        }
    }

    pub fn open(
        &self,
        io: &dyn ImageIo,
        store: Option<&mut (dyn RemoteStore + 'static)>,
    ) -> Result<Image, Error> {
        match &self.handle {
            UnitHandle::Local { path, series } => io.open_series(path, *series),
            UnitHandle::Remote(image) => {
                let store = store.ok_or_else(|| {
                    Error::Remote(format!("no remote store to open image {}", image.id))
                })?;
                let mut opened = store.open_image(image)?;
                opened.remote_id = Some(image.id);
                Ok(opened)
            }
        }
    }
}

impl fmt::Display for BatchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.handle {
            UnitHandle::Local { path, series } => {
                write!(f, "{} (series {})", path.display(), series)
            }
            UnitHandle::Remote(image) => write!(f, "{} (image {})", image.name, image.id),
        }
    }
}

/// Where the units of a run come from.
#[derive(Debug)]
pub enum ImageSource {
    Local(LocalImages),
    Remote(RemoteImages),
}

impl ImageSource {
    pub fn size(&self) -> usize {
        match self {
            ImageSource::Local(images) => images.size(),
            ImageSource::Remote(images) => images.size(),
        }
    }

    pub fn into_units(self) -> Vec<BatchUnit> {
        match self {
            ImageSource::Local(images) => images.into_units().collect(),
            ImageSource::Remote(images) => images.units().collect(),
        }
    }
}
