use super::Roi;
use crate::remote::{RemoteRoi, RemoteShape};

/// Groups local ROIs into remote ROIs.
///
/// ROIs carrying the same value for `property` end up in one remote ROI, in
/// order of first appearance. ROIs without the property stand alone.
pub fn to_remote(rois: &[Roi], property: &str) -> Vec<RemoteRoi> {
    let mut remote: Vec<RemoteRoi> = Vec::new();
    let mut groups: Vec<(String, usize)> = Vec::new();

    for roi in rois {
        let shape = RemoteShape {
            id: None,
            text: roi.name.clone(),
            geometry: roi.shape.clone(),
            position: roi.position,
        };

        let group = roi.property(property).filter(|value| !value.is_empty());
        match group {
            Some(key) => match groups.iter().find(|(k, _)| k == key) {
                Some((_, index)) => remote[*index].shapes.push(shape),
                None => {
                    groups.push((key.to_string(), remote.len()));
                    remote.push(RemoteRoi {
                        id: None,
                        owner_id: None,
                        shapes: vec![shape],
                    });
                }
            },
            None => remote.push(RemoteRoi {
                id: None,
                owner_id: None,
                shapes: vec![shape],
            }),
        }
    }

    remote
}

/// Flattens remote ROIs into local ones, one per shape.
///
/// Every shape is stamped with `property` = the remote ROI id, or the ROI's
/// ordinal when it has not been saved yet, so grouping survives a round trip.
pub fn to_local(remote: &[RemoteRoi], property: &str) -> Vec<Roi> {
    let mut rois = Vec::new();
    for (index, roi) in remote.iter().enumerate() {
        let group = roi
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("local-{}", index + 1));
        for shape in &roi.shapes {
            let mut local = Roi::new(shape.geometry.clone()).with_property(property, group.clone());
            local.name = shape.text.clone();
            local.position = shape.position;
            rois.push(local);
        }
    }
    rois
}
