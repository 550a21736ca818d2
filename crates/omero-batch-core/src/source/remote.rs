use super::{BatchUnit, UnitHandle};
use crate::error::Error;
use crate::remote::{RemoteImageRef, RemoteStore};
use tracing::debug;

/// Images listed from a remote dataset. The list lives in memory, so the
/// units can be walked any number of times.
#[derive(Debug, Clone, Default)]
pub struct RemoteImages {
    images: Vec<RemoteImageRef>,
}

impl RemoteImages {
    pub fn fetch(store: &mut dyn RemoteStore, dataset_id: i64) -> Result<Self, Error> {
        let images = store.list_images(dataset_id)?;
        debug!("{} images in dataset {}", images.len(), dataset_id);
        Ok(Self { images })
    }

    pub fn size(&self) -> usize {
        self.images.len()
    }

    pub fn units(&self) -> impl Iterator<Item = BatchUnit> + '_ {
        let total = self.images.len();
        self.images.iter().enumerate().map(move |(i, image)| BatchUnit {
            handle: UnitHandle::Remote(image.clone()),
            progress: format!("Image {}/{}", i + 1, total),
        })
    }
}
