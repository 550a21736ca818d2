use crate::error::Error;
use crate::image::Image;
use crate::results::RemoteTable;
use crate::roi::{Position, Shape};
use std::fmt;
use std::path::Path;

/// An image listed in a remote dataset, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImageRef {
    pub id: i64,
    pub name: String,
}

/// Remote containers a results table can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Project(i64),
    Screen(i64),
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Project(id) => write!(f, "project {}", id),
            Container::Screen(id) => write!(f, "screen {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteShape {
    pub id: Option<i64>,
    pub text: Option<String>,
    pub geometry: Shape,
    pub position: Position,
}

/// A remote ROI: one or more shapes sharing an id. `id` and `owner_id` are
/// assigned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRoi {
    pub id: Option<i64>,
    pub owner_id: Option<i64>,
    pub shapes: Vec<RemoteShape>,
}

/// Client for the remote image repository.
///
/// Calls block until the server answers; any timeout policy lives in the
/// implementation.
pub trait RemoteStore: Send {
    /// Identity of the acting user, used for ROI ownership checks.
    fn current_user_id(&self) -> i64;

    fn list_images(&mut self, dataset_id: i64) -> Result<Vec<RemoteImageRef>, Error>;

    /// Downloads an image; `annotable` and `remote_id` must be stamped on it.
    fn open_image(&mut self, image: &RemoteImageRef) -> Result<Image, Error>;

    fn get_rois(&mut self, image_id: i64) -> Result<Vec<RemoteRoi>, Error>;

    fn save_roi(&mut self, image_id: i64, roi: &RemoteRoi) -> Result<RemoteRoi, Error>;

    fn delete_roi(&mut self, roi_id: i64) -> Result<(), Error>;

    /// Imports a local file; returns the ids of the images it produced.
    fn import_image(&mut self, dataset_id: i64, path: &Path) -> Result<Vec<i64>, Error>;

    fn add_file_attachment(&mut self, image_id: i64, path: &Path) -> Result<(), Error>;

    fn attach_table(&mut self, target: Container, table: &RemoteTable) -> Result<(), Error>;
}
