//! Decides which images left open by a script are outputs, and under which
//! remote identity ROIs, results and logs get attached.

use crate::image::ImageId;
use crate::params::BatchParameters;
use crate::workbench::Workbench;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Image ROIs and results are read from: the active image, or the input.
    pub current: ImageId,
    /// Every open image, `current` first.
    pub candidates: Vec<ImageId>,
    /// Images to write out (and import when remote output is on).
    pub to_save: Vec<ImageId>,
    /// True when the script left the input as the active image.
    pub input_is_output: bool,
}

impl Resolution {
    /// Only the input is open: the script produced no new window.
    pub fn has_no_new_image(&self, input: ImageId) -> bool {
        self.candidates.iter().all(|id| *id == input)
    }
}

/// Open images after the script ran, `current` first, the rest in opening order.
pub fn candidate_outputs(bench: &Workbench, input: ImageId) -> (ImageId, Vec<ImageId>) {
    let current = bench
        .current_image()
        .filter(|id| bench.is_open(*id))
        .unwrap_or(input);
    let mut candidates = vec![current];
    candidates.extend(bench.ids().into_iter().filter(|id| *id != current));
    (current, candidates)
}

/// Applies the input-exclusion rule.
///
/// The input stays in the save set only when remote output and ROI saving
/// are both on, the input may not be annotated, and it is still the active
/// image: it then has to be imported as a new image to carry the ROIs. In
/// every other case the input is never re-saved.
pub fn resolve(
    params: &BatchParameters,
    bench: &Workbench,
    input: ImageId,
    input_annotable: bool,
) -> Resolution {
    let (current, candidates) = candidate_outputs(bench, input);
    let input_is_output = current == input;

    let keep_input =
        params.output_on_remote && params.save_rois && !input_annotable && input_is_output;

    let to_save = candidates
        .iter()
        .copied()
        .filter(|id| keep_input || *id != input)
        .collect();

    Resolution {
        current,
        candidates,
        to_save,
        input_is_output,
    }
}

/// Remote id ROIs, results and logs attach to: the first newly imported
/// image when the script replaced the input, the input's own id otherwise.
pub fn attachment_id(
    resolution: &Resolution,
    input_remote_id: Option<i64>,
    imported: &[i64],
) -> Option<i64> {
    match imported.first() {
        Some(id) if !resolution.input_is_output => Some(*id),
        _ => input_remote_id,
    }
}
