use serde::Deserialize;
use std::path::PathBuf;

/// Where ROIs stored on the remote image go before the script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoiMode {
    #[default]
    DoNotLoad,
    ToManager,
    ToOverlay,
}

/// Per-run settings. Built once by the front end and never mutated by the runner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchParameters {
    pub roi_mode: RoiMode,
    pub save_image: bool,
    pub save_rois: bool,
    pub save_results: bool,
    pub save_log: bool,
    pub clear_rois: bool,
    pub output_on_remote: bool,
    pub output_on_local: bool,
    pub output_dataset_id: Option<i64>,
    pub output_project_id: Option<i64>,
    pub output_screen_id: Option<i64>,
    pub local_output_dir: Option<PathBuf>,
    pub suffix: String,
}

impl Default for BatchParameters {
    fn default() -> Self {
        Self {
            roi_mode: RoiMode::DoNotLoad,
            save_image: false,
            save_rois: false,
            save_results: false,
            save_log: false,
            clear_rois: false,
            output_on_remote: false,
            output_on_local: false,
            output_dataset_id: None,
            output_project_id: None,
            output_screen_id: None,
            local_output_dir: None,
            suffix: String::new(),
        }
    }
}

impl BatchParameters {
    /// Local archives are written only into a directory the user asked for.
    pub fn writes_local_archives(&self) -> bool {
        self.output_on_local && self.local_output_dir.is_some()
    }

    /// Images can only be imported when a target dataset is known.
    pub fn imports_images(&self) -> bool {
        self.output_on_remote && self.output_dataset_id.is_some()
    }

    /// Tables are transmitted when remote results are requested and a container resolves.
    pub fn publishes_tables(&self) -> bool {
        self.output_on_remote
            && self.save_results
            && (self.output_project_id.is_some() || self.output_screen_id.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_save_nothing() {
        let params = BatchParameters::default();
        assert!(!params.writes_local_archives());
        assert!(!params.publishes_tables());
        assert_eq!(params.roi_mode, RoiMode::DoNotLoad);
    }

    #[test]
    fn test_local_archives_need_directory() {
        let mut params = BatchParameters {
            output_on_local: true,
            ..Default::default()
        };
        assert!(!params.writes_local_archives());

        params.local_output_dir = Some(PathBuf::from("/tmp/out"));
        assert!(params.writes_local_archives());
    }

    #[test]
    fn test_imports_need_a_dataset() {
        let mut params = BatchParameters {
            output_on_remote: true,
            ..Default::default()
        };
        assert!(!params.imports_images());

        params.output_dataset_id = Some(12);
        assert!(params.imports_images());
    }

    #[test]
    fn test_tables_need_a_container() {
        let mut params = BatchParameters {
            output_on_remote: true,
            save_results: true,
            ..Default::default()
        };
        assert!(!params.publishes_tables());

        params.output_screen_id = Some(3);
        assert!(params.publishes_tables());
    }
}
