pub mod config;
pub mod error;
pub mod image;
pub mod output;
pub mod params;
pub mod progress;
pub mod remote;
pub mod results;
pub mod roi;
pub mod runner;
pub mod script;
pub mod source;
pub mod utils;
pub mod workbench;

pub use config::{AppConfig, InputConfig, ScriptConfig};
pub use error::Error;
pub use image::{Image, ImageId, ImageIo, Probe};
pub use params::{BatchParameters, RoiMode};
pub use progress::{BatchListener, LogMonitor, ProgressMonitor, RunReport, RunStatus, SilentMonitor};
pub use remote::{Container, RemoteImageRef, RemoteStore};
pub use results::{ResultsAccumulator, ResultsTable};
pub use roi::{Roi, Shape};
pub use runner::BatchRunner;
pub use script::{InputValue, Inputs, ScriptRunner};
pub use source::{BatchUnit, ImageSource};
pub use workbench::Workbench;
