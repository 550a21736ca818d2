#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use omero_batch_core::image::{Image, ImageId, ImageIo, Probe};
use omero_batch_core::progress::RunReport;
use omero_batch_core::remote::{Container, RemoteImageRef, RemoteRoi, RemoteStore};
use omero_batch_core::results::RemoteTable;
use omero_batch_core::script::{Inputs, ScriptRunner};
use omero_batch_core::workbench::Workbench;
use omero_batch_core::Error;

/// Reads text files standing in for images:
///   `IMAGE`            one series
///   `SERIES n`         n series
///   `STITCH a,b`       one series that also consumes sibling files a and b
/// Anything else fails to decode.
#[derive(Clone, Default)]
pub struct FakeImageIo {
    pub saved: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeImageIo {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(path: &Path) -> Result<Probe, Error> {
        let text = fs::read_to_string(path).map_err(|e| Error::Decode(e.to_string()))?;
        let text = text.trim();
        if text == "IMAGE" {
            return Ok(Probe {
                series_count: 1,
                used_files: vec![path.to_path_buf()],
            });
        }
        if let Some(n) = text.strip_prefix("SERIES ") {
            let series_count = n
                .trim()
                .parse()
                .map_err(|_| Error::Decode(format!("bad series count in {}", path.display())))?;
            return Ok(Probe {
                series_count,
                used_files: vec![path.to_path_buf()],
            });
        }
        if let Some(members) = text.strip_prefix("STITCH ") {
            let dir = path.parent().unwrap_or(Path::new("."));
            let mut used_files = vec![path.to_path_buf()];
            used_files.extend(members.split(',').map(|m| dir.join(m.trim())));
            return Ok(Probe {
                series_count: 1,
                used_files,
            });
        }
        Err(Error::Decode(format!("unknown format: {}", path.display())))
    }
}

impl ImageIo for FakeImageIo {
    fn probe(&self, path: &Path) -> Result<Probe, Error> {
        Self::parse(path)
    }

    fn open_series(&self, path: &Path, series: usize) -> Result<Image, Error> {
        let probe = Self::parse(path)?;
        if series >= probe.series_count {
            return Err(Error::Decode(format!("no series {} in {}", series, path.display())));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = if probe.series_count == 1 {
            name
        } else {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{}_s{}.tif", stem, series + 1)
        };
        Ok(Image::new(title))
    }

    fn save_tiff(&self, image: &Image, path: &Path) -> Result<(), Error> {
        fs::write(path, format!("TIFF {}", image.title))?;
        self.saved.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RemoteState {
    pub user_id: i64,
    pub next_id: i64,
    pub datasets: HashMap<i64, Vec<RemoteImageRef>>,
    /// Images that may not be annotated by the acting user.
    pub read_only: Vec<i64>,
    pub rois: HashMap<i64, Vec<RemoteRoi>>,
    pub imports: Vec<(i64, PathBuf)>,
    pub attachments: Vec<(i64, String)>,
    pub tables: Vec<(Container, RemoteTable)>,
    pub failing_tables: Vec<String>,
    pub calls: usize,
}

impl RemoteState {
    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory remote repository. Clones share state so tests can inspect it
/// after the runner consumed its copy.
#[derive(Clone, Default)]
pub struct FakeRemote {
    pub state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub fn new(user_id: i64) -> Self {
        let remote = Self::default();
        {
            let mut state = remote.state.lock().unwrap();
            state.user_id = user_id;
            state.next_id = 1000;
        }
        remote
    }

    pub fn add_dataset(&self, dataset_id: i64, names: &[&str]) -> Vec<i64> {
        let mut state = self.state.lock().unwrap();
        let mut ids = Vec::new();
        for name in names {
            let id = state.fresh_id();
            state.datasets.entry(dataset_id).or_default().push(RemoteImageRef {
                id,
                name: name.to_string(),
            });
            ids.push(id);
        }
        ids
    }

    /// Stores a ROI owned by `owner_id` directly on the server.
    pub fn seed_roi(&self, image_id: i64, owner_id: i64, roi: RemoteRoi) {
        let mut state = self.state.lock().unwrap();
        let id = state.fresh_id();
        let mut roi = roi;
        roi.id = Some(id);
        roi.owner_id = Some(owner_id);
        state.rois.entry(image_id).or_default().push(roi);
    }

    pub fn roi_count(&self, image_id: i64) -> usize {
        self.state
            .lock()
            .unwrap()
            .rois
            .get(&image_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

impl RemoteStore for FakeRemote {
    fn current_user_id(&self) -> i64 {
        self.state.lock().unwrap().user_id
    }

    fn list_images(&mut self, dataset_id: i64) -> Result<Vec<RemoteImageRef>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state
            .datasets
            .get(&dataset_id)
            .cloned()
            .ok_or_else(|| Error::Remote(format!("no dataset {}", dataset_id)))
    }

    fn open_image(&mut self, image: &RemoteImageRef) -> Result<Image, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let mut opened = Image::new(image.name.clone());
        opened.remote_id = Some(image.id);
        opened.annotable = Some(!state.read_only.contains(&image.id));
        Ok(opened)
    }

    fn get_rois(&mut self, image_id: i64) -> Result<Vec<RemoteRoi>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state.rois.get(&image_id).cloned().unwrap_or_default())
    }

    fn save_roi(&mut self, image_id: i64, roi: &RemoteRoi) -> Result<RemoteRoi, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let mut saved = roi.clone();
        saved.id = Some(state.fresh_id());
        saved.owner_id = Some(state.user_id);
        for shape in &mut saved.shapes {
            shape.id = Some(state.fresh_id());
        }
        state.rois.entry(image_id).or_default().push(saved.clone());
        Ok(saved)
    }

    fn delete_roi(&mut self, roi_id: i64) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        for rois in state.rois.values_mut() {
            rois.retain(|roi| roi.id != Some(roi_id));
        }
        Ok(())
    }

    fn import_image(&mut self, dataset_id: i64, path: &Path) -> Result<Vec<i64>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let id = state.fresh_id();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        state
            .datasets
            .entry(dataset_id)
            .or_default()
            .push(RemoteImageRef { id, name });
        state.imports.push((dataset_id, path.to_path_buf()));
        Ok(vec![id])
    }

    fn add_file_attachment(&mut self, image_id: i64, path: &Path) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if !path.is_file() {
            return Err(Error::Remote(format!("missing file {}", path.display())));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        state.attachments.push((image_id, name));
        Ok(())
    }

    fn attach_table(&mut self, target: Container, table: &RemoteTable) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.failing_tables.iter().any(|name| table.name.ends_with(name.as_str())) {
            return Err(Error::Remote(format!("cannot attach {}", table.name)));
        }
        state.tables.push((target, table.clone()));
        Ok(())
    }
}

type Body = Box<dyn FnMut(ImageId, &mut Workbench) -> Result<(), Error> + Send>;

/// Script whose body is a closure over the bound image and the workbench.
pub struct FnScript {
    body: Body,
    declared: Inputs,
    bound: Option<ImageId>,
    pub seen_inputs: Arc<Mutex<Vec<Inputs>>>,
    inputs: Inputs,
}

impl FnScript {
    pub fn new<F>(body: F) -> Self
    where
        F: FnMut(ImageId, &mut Workbench) -> Result<(), Error> + Send + 'static,
    {
        Self {
            body: Box::new(body),
            declared: Inputs::new(),
            bound: None,
            seen_inputs: Arc::new(Mutex::new(Vec::new())),
            inputs: Inputs::new(),
        }
    }

    pub fn declaring(mut self, declared: Inputs) -> Self {
        self.declared = declared;
        self
    }
}

impl ScriptRunner for FnScript {
    fn declared_inputs(&self) -> Inputs {
        self.declared.clone()
    }

    fn bind_image(&mut self, image: ImageId) {
        self.bound = Some(image);
    }

    fn set_inputs(&mut self, inputs: Inputs) {
        self.inputs = inputs;
    }

    fn run(&mut self, bench: &mut Workbench) -> Result<(), Error> {
        let image = self
            .bound
            .ok_or_else(|| Error::Script("no image bound".to_string()))?;
        self.seen_inputs.lock().unwrap().push(self.inputs.clone());
        (self.body)(image, bench)
    }

    fn reset_bindings(&mut self) {
        self.bound = None;
    }
}

/// Listener recording every report it receives.
pub fn recording_listener() -> (Arc<Mutex<Vec<RunReport>>>, impl Fn(&RunReport) + Send) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let listener = move |report: &RunReport| sink.lock().unwrap().push(report.clone());
    (reports, listener)
}

pub fn write_images(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, body) in files {
        fs::write(dir.join(name), body).unwrap();
    }
}

pub fn files_ending_with(dir: &Path, suffix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(suffix))
        .collect();
    names.sort();
    names
}
