use crate::error::Error;
use crate::roi::Roi;
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle of an image opened in a [`Workbench`](crate::workbench::Workbench).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An opened image. The pixel buffer is opaque to the engine and belongs to
/// whichever [`ImageIo`] decoded it.
#[derive(Clone)]
pub struct Image {
    pub title: String,
    pub remote_id: Option<i64>,
    /// Whether the acting user may attach ROIs to the remote image.
    /// `None` for images that did not come from the remote store.
    pub annotable: Option<bool>,
    pub overlay: Vec<Roi>,
    /// Unsaved-changes marker.
    pub changes: bool,
    buffer: Option<Arc<dyn Any + Send + Sync>>,
}

impl Image {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            remote_id: None,
            annotable: None,
            overlay: Vec::new(),
            changes: false,
            buffer: None,
        }
    }

    pub fn with_buffer<T: Any + Send + Sync>(mut self, buffer: T) -> Self {
        self.buffer = Some(Arc::new(buffer));
        self
    }

    pub fn buffer<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.buffer.as_deref().and_then(|b| b.downcast_ref::<T>())
    }

    pub fn is_annotable(&self) -> bool {
        self.annotable.unwrap_or(false)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("title", &self.title)
            .field("remote_id", &self.remote_id)
            .field("annotable", &self.annotable)
            .field("overlay", &self.overlay.len())
            .field("changes", &self.changes)
            .finish()
    }
}

/// What decoding a path revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub series_count: usize,
    /// Every file read by this decode. A stitched sequence lists all its
    /// members; a plain file lists itself or nothing.
    pub used_files: Vec<PathBuf>,
}

/// The image decoding library.
pub trait ImageIo: Send {
    fn probe(&self, path: &Path) -> Result<Probe, Error>;

    fn open_series(&self, path: &Path, series: usize) -> Result<Image, Error>;

    fn save_tiff(&self, image: &Image, path: &Path) -> Result<(), Error>;
}
