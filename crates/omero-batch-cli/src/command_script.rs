use crate::raster::RasterIo;
use omero_batch_core::roi::Roi;
use omero_batch_core::{Error, ImageId, ImageIo, Inputs, ScriptRunner, Workbench};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 4] = ["tif", "tiff", "png", "jpg"];

/// Runs an external program once per image.
///
/// The bound image is written to a scratch TIFF passed in `BATCH_IMAGE`.
/// Inputs are exported as `BATCH_ARG_<NAME>`. Whatever the program leaves
/// in `BATCH_OUTPUT_DIR` is brought back into the workbench:
///
/// - `<name>.csv`: a results table titled `<name>`
/// - `*.tif`, `*.png`, ...: a new image, opened in name order
/// - `*.rois.json`: ROIs added to the ROI manager
/// - `*.overlay.json`: ROIs replacing the input's overlay
///
/// Standard output lines go to the log.
pub struct CommandScript {
    command: String,
    args: Vec<String>,
    declared: Inputs,
    inputs: Inputs,
    bound: Option<ImageId>,
}

impl CommandScript {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            declared: Inputs::new(),
            inputs: Inputs::new(),
            bound: None,
        }
    }

    pub fn with_declared(mut self, declared: Inputs) -> Self {
        self.declared = declared;
        self
    }

    fn command_for(&self, image: &Path, title: &str, output_dir: &Path) -> Command {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .env("BATCH_IMAGE", image)
            .env("BATCH_IMAGE_TITLE", title)
            .env("BATCH_OUTPUT_DIR", output_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (name, value) in &self.inputs {
            command.env(format!("BATCH_ARG_{}", name.to_uppercase()), value.to_string());
        }
        command
    }
}

impl ScriptRunner for CommandScript {
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
        let input = self
            .bound
            .ok_or_else(|| Error::Script("no image bound".to_string()))?;
        let image = bench
            .image(input)
            .ok_or_else(|| Error::Script(format!("image {} is not open", input)))?;

        let scratch = tempfile::Builder::new()
            .prefix("omero_batch_script_")
            .tempdir()?;
        let image_path = scratch.path().join("input.tif");
        let output_dir = scratch.path().join("output");
        fs::create_dir(&output_dir)?;
        RasterIo.save_tiff(image, &image_path)?;

        let title = image.title.clone();
        debug!("Running {} on {}", self.command, title);
        let output = self
            .command_for(&image_path, &title, &output_dir)
            .output()
            .map_err(|e| Error::Script(format!("cannot start {}: {}", self.command, e)))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            bench.log(line);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Script(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        collect_outputs(bench, input, &output_dir)?;
        scratch.close()?;
        Ok(())
    }

    fn reset_bindings(&mut self) {
        self.bound = None;
    }
}

/// Loads what the program wrote into the workbench.
fn collect_outputs(bench: &mut Workbench, input: ImageId, dir: &Path) -> Result<(), Error> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if name.ends_with(".rois.json") {
            for roi in read_rois(&path)? {
                bench.roi_manager_mut().add(roi);
            }
        } else if name.ends_with(".overlay.json") {
            let rois = read_rois(&path)?;
            if let Some(image) = bench.image_mut(input) {
                image.overlay = rois;
            }
        } else if extension == "csv" {
            read_table(bench, &path)?;
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            let image = RasterIo.open_series(&path, 0)?;
            bench.show(image);
        } else {
            warn!("Ignoring script output {}", name);
        }
    }
    Ok(())
}

fn read_rois(path: &Path) -> Result<Vec<Roi>, Error> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn read_table(bench: &mut Workbench, path: &Path) -> Result<(), Error> {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| Error::Script(format!("{}: {}", path.display(), e)))?;
    let headers = reader
        .headers()
        .map_err(|e| Error::Script(format!("{}: {}", path.display(), e)))?
        .clone();

    let table = bench.table_mut(&title);
    for record in reader.records() {
        let record = record.map_err(|e| Error::Script(format!("{}: {}", path.display(), e)))?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        table.add_row(cells);
    }
    Ok(())
}
