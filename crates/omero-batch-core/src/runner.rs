use crate::config::InputConfig;
use crate::error::Error;
use crate::image::{ImageId, ImageIo};
use crate::output;
use crate::params::{BatchParameters, RoiMode};
use crate::progress::{BatchListener, LogMonitor, ProgressMonitor, RunReport, RunStatus};
use crate::remote::{Container, RemoteStore};
use crate::results::{discover_tables, save_locally, ResultsAccumulator};
use crate::roi::{
    extract_managed, extract_overlay, load_from_remote, persist_local_archive, save_to_remote,
    RoiSource, GROUP_PROPERTY,
};
use crate::script::{merge_inputs, Inputs, ScriptRunner};
use crate::source::{BatchUnit, ImageSource, LocalImages, RemoteImages};
use crate::utils::{remove_extension, timestamp};
use crate::workbench::Workbench;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

const TEMP_PREFIX: &str = "omero_batch_";

/// Staging directory for the artifacts of one run.
enum Workspace {
    /// Deleted at the end of the run.
    Temporary(TempDir),
    /// The user's output directory; left in place.
    Directory(PathBuf),
}

impl Workspace {
    fn path(&self) -> &Path {
        match self {
            Workspace::Temporary(dir) => dir.path(),
            Workspace::Directory(path) => path,
        }
    }

    fn cleanup(self) -> Result<(), Error> {
        match self {
            Workspace::Temporary(dir) => dir.close().map_err(Error::from),
            Workspace::Directory(_) => Ok(()),
        }
    }
}

/// Runs a script over every image of a source and persists what it produces.
///
/// A runner is single-use: [`run`](Self::run) and [`spawn`](Self::spawn)
/// consume it. All collaborators are `Send`, so the whole runner can move
/// onto its worker thread.
pub struct BatchRunner {
    input: InputConfig,
    params: BatchParameters,
    io: Box<dyn ImageIo>,
    store: Option<Box<dyn RemoteStore>>,
    script: Box<dyn ScriptRunner>,
    monitor: Box<dyn ProgressMonitor>,
    listener: Option<Box<dyn BatchListener>>,
    inputs: Inputs,
    property: String,
    cancel: Arc<AtomicBool>,
    bench: Workbench,
    accumulator: ResultsAccumulator,
}

impl BatchRunner {
    pub fn new(
        input: InputConfig,
        params: BatchParameters,
        io: Box<dyn ImageIo>,
        script: Box<dyn ScriptRunner>,
    ) -> Self {
        Self {
            input,
            params,
            io,
            store: None,
            script,
            monitor: Box::new(LogMonitor),
            listener: None,
            inputs: Inputs::new(),
            property: GROUP_PROPERTY.to_string(),
            cancel: Arc::new(AtomicBool::new(false)),
            bench: Workbench::new(),
            accumulator: ResultsAccumulator::new(),
        }
    }

    pub fn with_store(mut self, store: Box<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_monitor(mut self, monitor: Box<dyn ProgressMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_listener(mut self, listener: Box<dyn BatchListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Values overriding the script's declared inputs.
    pub fn with_inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }

    /// ROI property used to group shapes into remote ROIs.
    pub fn with_group_property(mut self, property: &str) -> Self {
        self.property = property.to_string();
        self
    }

    /// Setting the token stops the run before the next unit.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs the batch on a dedicated thread. When the thread cannot be
    /// started the listener is still notified, with a failed report.
    pub fn spawn(self) -> Result<JoinHandle<RunReport>, Error> {
        self.spawn_on(thread::Builder::new().name("omero-batch".to_string()))
    }

    fn spawn_on(mut self, builder: thread::Builder) -> Result<JoinHandle<RunReport>, Error> {
        // Held outside the closure so it survives a failed spawn.
        let slot = Arc::new(Mutex::new(self.listener.take()));
        let worker_slot = Arc::clone(&slot);

        let spawned = builder.spawn(move || {
            self.listener = worker_slot.lock().ok().and_then(|mut listener| listener.take());
            self.run()
        });

        match spawned {
            Ok(handle) => Ok(handle),
            Err(e) => {
                error!("Could not start the batch thread: {}", e);
                let report = failed_report(format!("cannot start batch thread: {}", e));
                if let Some(listener) = slot.lock().ok().and_then(|mut listener| listener.take()) {
                    listener.on_finished(&report);
                }
                Err(e.into())
            }
        }
    }

    /// Runs the batch on the calling thread. The listener is notified once,
    /// whatever the outcome, including a panic inside a collaborator.
    pub fn run(mut self) -> RunReport {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute()));
        let report = outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!("Batch aborted: {}", message);
            failed_report(message)
        });

        self.monitor.set_done();
        info!(
            "Batch {}: {} processed, {} failed",
            report.status, report.processed_units, report.failed_units
        );
        if let Some(listener) = &self.listener {
            listener.on_finished(&report);
        }
        report
    }

    fn execute(&mut self) -> RunReport {
        let mut report = RunReport {
            status: RunStatus::Completed,
            total_units: 0,
            processed_units: 0,
            failed_units: 0,
            tables_published: 0,
            workspace: None,
        };

        let workspace = match self.create_workspace() {
            Ok(workspace) => workspace,
            Err(e) => {
                error!("Could not create the output directory: {}", e);
                report.status = RunStatus::Failed(e.to_string());
                return report;
            }
        };
        report.workspace = Some(workspace.path().to_path_buf());

        let units = match self.fetch_source() {
            Ok(source) => source.into_units(),
            Err(e) => {
                error!("Could not list input images: {}", e);
                self.bench.log(format!("Could not list input images: {}", e));
                report.status = RunStatus::Failed(format!("could not list input images: {}", e));
                Vec::new()
            }
        };
        report.total_units = units.len();

        let inputs = merge_inputs(self.script.declared_inputs(), self.inputs.clone());
        self.monitor.set_state("Macro running...");
        for unit in &units {
            if self.cancel.load(Ordering::SeqCst) {
                info!("Cancellation requested, skipping remaining images");
                report.status = RunStatus::Cancelled;
                break;
            }

            self.monitor.set_progress(&unit.progress);
            self.script.set_inputs(inputs.clone());
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.process_unit(unit, workspace.path())
            }))
            .unwrap_or_else(|payload| {
                Err(Error::Script(format!("panicked: {}", panic_message(payload.as_ref()))))
            });
            self.script.reset_bindings();
            self.bench.close_unit_windows();

            match result {
                Ok(()) => report.processed_units += 1,
                Err(Error::Cancelled) => {
                    warn!("Script cancelled on {}", unit);
                    report.failed_units += 1;
                    report.status = RunStatus::Cancelled;
                    break;
                }
                Err(e) => {
                    error!("Skipping {}: {}", unit, e);
                    self.bench.log(format!("{}: {}", unit, e));
                    report.failed_units += 1;
                }
            }
        }
        self.monitor.set_progress("");

        report.tables_published = self.upload_tables();

        if matches!(workspace, Workspace::Temporary(_)) {
            self.monitor.set_state("Temporary directory deletion...");
        }
        if let Err(e) = workspace.cleanup() {
            error!("Temp directory may not be deleted: {}", e);
            self.bench.log("Temp directory may not be deleted.");
        }
        self.monitor.set_state("");

        report
    }

    fn create_workspace(&self) -> Result<Workspace, Error> {
        if let (true, Some(dir)) = (self.params.output_on_local, &self.params.local_output_dir) {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Workspace(format!("cannot create {}: {}", dir.display(), e))
            })?;
            return Ok(Workspace::Directory(dir.clone()));
        }

        self.monitor.set_state("Temporary directory creation...");
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| Error::Workspace(format!("cannot create temporary directory: {}", e)))?;
        debug!("Staging artifacts in {}", dir.path().display());
        Ok(Workspace::Temporary(dir))
    }

    fn fetch_source(&mut self) -> Result<ImageSource, Error> {
        match &self.input {
            InputConfig::Local {
                directory,
                recursive,
                ignore_patterns,
            } => {
                self.monitor.set_state("Images recovery from input folder...");
                let images =
                    LocalImages::scan(self.io.as_ref(), directory, *recursive, ignore_patterns)?;
                for (path, reason) in images.failures() {
                    self.bench.log(format!("Could not read {}: {}", path.display(), reason));
                }
                info!(
                    "{} images in {} files under {}",
                    images.size(),
                    images.file_count(),
                    directory.display()
                );
                Ok(ImageSource::Local(images))
            }
            InputConfig::Remote { dataset_id } => {
                self.monitor.set_state("Images recovery from OMERO...");
                let store = self.store.as_deref_mut().ok_or_else(missing_store)?;
                let images = RemoteImages::fetch(store, *dataset_id)?;
                info!("{} images in dataset {}", images.size(), dataset_id);
                Ok(ImageSource::Remote(images))
            }
        }
    }

    fn process_unit(&mut self, unit: &BatchUnit, dir: &Path) -> Result<(), Error> {
        self.bench.roi_manager_mut().reset();

        if unit.remote_id().is_some() {
            self.monitor.set_state("Opening image from OMERO...");
        }
        let image = unit.open(self.io.as_ref(), self.store.as_deref_mut())?;
        let input_remote_id = image.remote_id;
        let annotable = image.is_annotable();
        let input = self.bench.show(image);

        if let Some(remote_id) = input_remote_id {
            self.load_rois(input, remote_id);
        }

        self.script.bind_image(input);
        self.script.run(&mut self.bench)?;

        if let Some(image) = self.bench.image_mut(input) {
            image.changes = false;
        }
        self.save(input, input_remote_id, annotable, dir);
        Ok(())
    }

    fn load_rois(&mut self, input: ImageId, remote_id: i64) {
        let target = match self.params.roi_mode {
            RoiMode::DoNotLoad => return,
            RoiMode::ToManager => RoiSource::Manager,
            RoiMode::ToOverlay => RoiSource::Overlay,
        };
        let Some(store) = self.store.as_deref_mut() else {
            return;
        };
        match load_from_remote(store, remote_id, &self.property) {
            Ok(rois) => {
                debug!("Loaded {} ROIs from image {}", rois.len(), remote_id);
                target.replace(&mut self.bench, input, rois);
            }
            Err(e) => {
                error!("Could not load ROIs: {}", e);
                self.bench.log(format!("Could not load ROIs: {}", e));
            }
        }
    }

    fn save(&mut self, input: ImageId, input_remote_id: Option<i64>, annotable: bool, dir: &Path) {
        let title = self
            .bench
            .image(input)
            .map(|image| remove_extension(&image.title))
            .unwrap_or_default();

        let resolution = output::resolve(&self.params, &self.bench, input, annotable);
        if resolution.has_no_new_image(input) {
            warn!("No new image for {}", title);
            self.bench.log("Warning: there is no new image.");
        }

        let mut output_id = input_remote_id;
        if self.params.save_image {
            let mut imported = Vec::new();
            for id in &resolution.to_save {
                imported.extend(self.save_image(*id, dir));
            }
            output_id = output::attachment_id(&resolution, input_remote_id, &imported);
        }

        let current = resolution.current;
        if self.params.save_rois {
            if !self.params.save_image {
                self.save_rois(RoiSource::Overlay, current, output_id, &title, dir);
            }
            self.save_rois(RoiSource::Manager, current, output_id, &title, dir);
        }
        if self.params.save_results {
            self.save_results(current, output_id, &title, dir);
        }
        if self.params.save_log {
            self.save_log(output_id, &title, dir);
        }
    }

    /// Writes one output as TIFF and imports it when remote output is on.
    /// Returns the ids of the remote images created.
    fn save_image(&mut self, id: ImageId, dir: &Path) -> Vec<i64> {
        let Some(image) = self.bench.image(id) else {
            return Vec::new();
        };
        let title = remove_extension(&image.title);
        let path = dir.join(format!("{}{}.tif", title, self.params.suffix));
        if let Err(e) = self.io.save_tiff(image, &path) {
            error!("Could not save image {}: {}", path.display(), e);
            self.bench.log(format!("Could not save image: {}", e));
            return Vec::new();
        }
        debug!("Saved {}", path.display());

        let ids = if self.params.output_on_remote {
            self.import_image(&path)
        } else {
            Vec::new()
        };

        if self.params.save_rois {
            self.save_rois(RoiSource::Overlay, id, ids.first().copied(), &title, dir);
        }
        ids
    }

    fn import_image(&mut self, path: &Path) -> Vec<i64> {
        let (true, Some(dataset_id)) = (self.params.imports_images(), self.params.output_dataset_id)
        else {
            warn!("No output dataset, {} not imported", path.display());
            return Vec::new();
        };
        let Some(store) = self.store.as_deref_mut() else {
            warn!("{}", missing_store());
            return Vec::new();
        };

        self.monitor.set_state("Import on OMERO...");
        match store.import_image(dataset_id, path) {
            Ok(ids) => {
                info!("Imported {} as {:?}", path.display(), ids);
                ids
            }
            Err(e) => {
                error!("Could not import image: {}", e);
                self.bench.log(format!("Could not import image: {}", e));
                Vec::new()
            }
        }
    }

    /// Archives and/or uploads the ROIs held by `source`. Remote ROIs are
    /// read back into `source` after an upload.
    fn save_rois(
        &mut self,
        source: RoiSource,
        image: ImageId,
        remote_id: Option<i64>,
        title: &str,
        dir: &Path,
    ) {
        let rois = source.extract(&self.bench, image);

        if self.params.writes_local_archives() && !rois.is_empty() {
            self.monitor.set_state(&format!("Saving {}...", source.describe()));
            let path = archive_path(dir, title);
            match persist_local_archive(&rois, &path) {
                Ok(()) => debug!("Saved {} ROIs to {}", rois.len(), path.display()),
                Err(e) => {
                    error!("Error while saving ROI file: {}", e);
                    self.bench.log(format!("Error while saving ROI file: {}", e));
                }
            }
        }

        let Some(remote_id) = remote_id.filter(|_| self.params.output_on_remote) else {
            return;
        };
        let Some(store) = self.store.as_deref_mut() else {
            warn!("{}", missing_store());
            return;
        };
        self.monitor
            .set_state(&format!("Saving {} on OMERO...", source.describe()));
        match save_to_remote(store, remote_id, &rois, self.params.clear_rois, &self.property) {
            Ok(reloaded) => source.replace(&mut self.bench, image, reloaded),
            Err(e) => {
                error!("Could not import {} to OMERO: {}", source.describe(), e);
                self.bench
                    .log(format!("Could not import {} to OMERO: {}", source.describe(), e));
            }
        }
    }

    fn save_results(&mut self, current: ImageId, output_id: Option<i64>, title: &str, dir: &Path) {
        self.monitor.set_state("Saving results files...");
        let mut rois = extract_overlay(&self.bench, current);
        rois.extend(extract_managed(&self.bench));
        let ts = timestamp();

        for name in discover_tables(&self.bench) {
            let path = dir.join(format!("{}_{}_{}.csv", name, title, ts));
            let table = self.bench.table_mut(&name);
            if self.params.output_on_remote {
                self.accumulator.append(table, output_id, &rois, &self.property);
            }
            if let Err(e) = save_locally(table, &path) {
                table.reset();
                error!("Could not save results {}: {}", path.display(), e);
                self.bench.log(format!("Could not save results: {}", e));
                continue;
            }
            if self.params.output_on_remote {
                self.upload_file(output_id, &path);
            }
        }
    }

    fn save_log(&mut self, output_id: Option<i64>, title: &str, dir: &Path) {
        let path = dir.join(format!("{}_log.txt", title));
        if let Err(e) = fs::write(&path, self.bench.log_text()) {
            error!("Could not save log {}: {}", path.display(), e);
            return;
        }
        if self.params.output_on_remote {
            self.upload_file(output_id, &path);
        }
    }

    fn upload_file(&mut self, image_id: Option<i64>, path: &Path) {
        let Some(image_id) = image_id else {
            return;
        };
        let Some(store) = self.store.as_deref_mut() else {
            warn!("{}", missing_store());
            return;
        };
        self.monitor.set_state("Uploading results files...");
        if let Err(e) = store.add_file_attachment(image_id, path) {
            error!("Error adding file to image {}: {}", image_id, e);
            self.bench.log(format!("Error adding file to image: {}", e));
        }
    }

    /// Sends the accumulated tables. Returns how many were published.
    fn upload_tables(&mut self) -> usize {
        if !self.params.publishes_tables() {
            if self.params.output_on_remote && !self.accumulator.is_empty() {
                warn!(
                    "No project or screen to attach {} tables to",
                    self.accumulator.len()
                );
            }
            return 0;
        }
        let target = match (self.params.output_project_id, self.params.output_screen_id) {
            (Some(project), _) => Container::Project(project),
            (None, Some(screen)) => Container::Screen(screen),
            (None, None) => return 0,
        };
        let Some(store) = self.store.as_deref_mut() else {
            warn!("{}", missing_store());
            return 0;
        };

        self.monitor.set_state("Uploading tables...");
        let outcome = self.accumulator.flush(store, target, &timestamp());
        for (name, e) in &outcome.failures {
            self.bench.log(format!("Could not save table {}: {}", name, e));
        }
        outcome.published
    }
}

/// `<title>_<timestamp>_RoiSet.zip`, numbered when an archive of the same
/// name was already written during this second.
fn archive_path(dir: &Path, title: &str) -> PathBuf {
    let stem = format!("{}_{}_RoiSet", title, timestamp());
    let mut path = dir.join(format!("{}.zip", stem));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.zip", stem, n));
        n += 1;
    }
    path
}

fn failed_report(message: String) -> RunReport {
    RunReport {
        status: RunStatus::Failed(message),
        total_units: 0,
        processed_units: 0,
        failed_units: 0,
        tables_published: 0,
        workspace: None,
    }
}

fn missing_store() -> Error {
    Error::Remote("no remote store configured".to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
