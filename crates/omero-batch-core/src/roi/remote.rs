use super::{to_local, to_remote, Roi};
use crate::error::Error;
use crate::remote::RemoteStore;
use tracing::{debug, warn};

/// Fetches the ROIs of a remote image as local ROIs.
pub fn load_from_remote(
    store: &mut dyn RemoteStore,
    image_id: i64,
    property: &str,
) -> Result<Vec<Roi>, Error> {
    let remote = store.get_rois(image_id)?;
    Ok(to_local(&remote, property))
}

/// Deletes every ROI of the image owned by the acting user. Returns how many
/// were removed.
pub fn delete_owned_rois(store: &mut dyn RemoteStore, image_id: i64) -> Result<usize, Error> {
    let user = store.current_user_id();
    let mut deleted = 0;
    for roi in store.get_rois(image_id)? {
        if roi.owner_id != Some(user) {
            continue;
        }
        if let Some(id) = roi.id {
            store.delete_roi(id)?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

/// Uploads `rois` to a remote image and returns the server's view of the
/// image's ROIs afterwards.
///
/// With `clear_existing`, the user's ROIs are deleted first. Not atomic: an
/// upload failing halfway leaves the image with fewer ROIs than before.
pub fn save_to_remote(
    store: &mut dyn RemoteStore,
    image_id: i64,
    rois: &[Roi],
    clear_existing: bool,
    property: &str,
) -> Result<Vec<Roi>, Error> {
    if clear_existing {
        match delete_owned_rois(store, image_id) {
            Ok(n) => debug!("Deleted {} ROIs from image {}", n, image_id),
            Err(e) => warn!("ROIs deletion from image {} failed: {}", image_id, e),
        }
    }

    for roi in to_remote(rois, property) {
        store.save_roi(image_id, &roi)?;
    }

    load_from_remote(store, image_id, property)
}
