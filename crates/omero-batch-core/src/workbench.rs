//! Per-run stand-in for the image tool's display state: open images, the
//! active image, the ROI manager, results windows and the log window.
//!
//! One workbench belongs to one run. Scripts receive it by `&mut` and mutate
//! it the way a macro mutates the desktop.

use crate::image::{Image, ImageId};
use crate::results::{ResultsTable, DEFAULT_TABLE};
use crate::roi::Roi;

#[derive(Debug, Default, Clone)]
pub struct RoiManager {
    rois: Vec<Roi>,
}

impl RoiManager {
    pub fn add(&mut self, roi: Roi) {
        self.rois.push(roi);
    }

    pub fn rois(&self) -> &[Roi] {
        &self.rois
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn reset(&mut self) {
        self.rois.clear();
    }
}

#[derive(Debug, Default)]
pub struct Workbench {
    images: Vec<(ImageId, Image)>,
    current: Option<ImageId>,
    next_id: u32,
    roi_manager: RoiManager,
    tables: Vec<ResultsTable>,
    log: Vec<String>,
}

impl Workbench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a window for `image` and makes it the active one.
    pub fn show(&mut self, image: Image) -> ImageId {
        self.next_id += 1;
        let id = ImageId(self.next_id);
        self.images.push((id, image));
        self.current = Some(id);
        id
    }

    pub fn current_image(&self) -> Option<ImageId> {
        self.current
    }

    /// Activates an open image. Returns false when `id` is not open.
    pub fn select(&mut self, id: ImageId) -> bool {
        if self.is_open(id) {
            self.current = Some(id);
            true
        } else {
            false
        }
    }

    pub fn is_open(&self, id: ImageId) -> bool {
        self.images.iter().any(|(i, _)| *i == id)
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|(i, _)| *i == id).map(|(_, img)| img)
    }

    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.images
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, img)| img)
    }

    /// Open images, in the order their windows were opened.
    pub fn ids(&self) -> Vec<ImageId> {
        self.images.iter().map(|(id, _)| *id).collect()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Closes one window; the most recently opened remaining image becomes active.
    pub fn close(&mut self, id: ImageId) -> Option<Image> {
        let pos = self.images.iter().position(|(i, _)| *i == id)?;
        let (_, image) = self.images.remove(pos);
        if self.current == Some(id) {
            self.current = self.images.last().map(|(i, _)| *i);
        }
        Some(image)
    }

    pub fn close_all(&mut self) {
        self.images.clear();
        self.current = None;
    }

    pub fn roi_manager(&self) -> &RoiManager {
        &self.roi_manager
    }

    pub fn roi_manager_mut(&mut self) -> &mut RoiManager {
        &mut self.roi_manager
    }

    /// The default results window, created on first use.
    pub fn results(&mut self) -> &mut ResultsTable {
        self.table_mut(DEFAULT_TABLE)
    }

    pub fn table(&self, name: &str) -> Option<&ResultsTable> {
        self.tables.iter().find(|t| t.title() == name)
    }

    /// Named results window, created on first use.
    pub fn table_mut(&mut self, name: &str) -> &mut ResultsTable {
        let pos = match self.tables.iter().position(|t| t.title() == name) {
            Some(pos) => pos,
            None => {
                self.tables.push(ResultsTable::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[pos]
    }

    /// Titles of the open results windows, in opening order.
    pub fn table_titles(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.title().to_string()).collect()
    }

    /// Closes every results window without saving.
    pub fn close_tables(&mut self) {
        self.tables.clear();
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub fn log_text(&self) -> String {
        let mut text = self.log.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Drops everything a unit may have left behind, except the log.
    pub fn close_unit_windows(&mut self) {
        self.close_tables();
        self.roi_manager.reset();
        self.close_all();
    }
}
