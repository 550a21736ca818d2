pub mod archive;
pub mod convert;
pub mod remote;

use crate::image::ImageId;
use crate::workbench::Workbench;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use archive::{persist_local_archive, read_local_archive};
pub use convert::{to_local, to_remote};
pub use remote::{delete_owned_rois, load_from_remote, save_to_remote};

/// Property used to group local shapes into one remote ROI.
pub const GROUP_PROPERTY: &str = "ROI";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rectangle { x: f64, y: f64, width: f64, height: f64 },
    Ellipse { x: f64, y: f64, width: f64, height: f64 },
    Point { x: f64, y: f64 },
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
    Polygon { points: Vec<(f64, f64)> },
    Polyline { points: Vec<(f64, f64)> },
    Text { x: f64, y: f64, text: String },
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Rectangle { .. } => "rectangle",
            Shape::Ellipse { .. } => "ellipse",
            Shape::Point { .. } => "point",
            Shape::Line { .. } => "line",
            Shape::Polygon { .. } => "polygon",
            Shape::Polyline { .. } => "polyline",
            Shape::Text { .. } => "text",
        }
    }
}

/// Plane a shape is attached to. `None` means all planes along that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub channel: Option<u32>,
    pub z: Option<u32>,
    pub t: Option<u32>,
}

/// A local region of interest, as found on an overlay or in the ROI manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub name: Option<String>,
    pub shape: Shape,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Roi {
    pub fn new(shape: Shape) -> Self {
        Self {
            name: None,
            shape,
            position: Position::default(),
            properties: BTreeMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Name used for archive entries and row matching.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.shape.kind())
    }
}

/// The two places a ROI can live on the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiSource {
    Overlay,
    Manager,
}

impl RoiSource {
    /// Snapshot of the shapes held by this source for `image`.
    pub fn extract(self, bench: &Workbench, image: ImageId) -> Vec<Roi> {
        match self {
            RoiSource::Overlay => extract_overlay(bench, image),
            RoiSource::Manager => extract_managed(bench),
        }
    }

    /// Replaces the shapes held by this source.
    pub fn replace(self, bench: &mut Workbench, image: ImageId, rois: Vec<Roi>) {
        match self {
            RoiSource::Overlay => {
                if let Some(img) = bench.image_mut(image) {
                    img.overlay = rois;
                }
            }
            RoiSource::Manager => {
                let manager = bench.roi_manager_mut();
                manager.reset();
                for roi in rois {
                    manager.add(roi);
                }
            }
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RoiSource::Overlay => "overlay ROIs",
            RoiSource::Manager => "ROIs",
        }
    }
}

pub fn extract_overlay(bench: &Workbench, image: ImageId) -> Vec<Roi> {
    bench
        .image(image)
        .map(|img| img.overlay.clone())
        .unwrap_or_default()
}

pub fn extract_managed(bench: &Workbench) -> Vec<Roi> {
    bench.roi_manager().rois().to_vec()
}
