use crate::error::Error;
use crate::image::ImageId;
use crate::workbench::Workbench;
use std::collections::BTreeMap;
use std::fmt;

/// A script input value.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl InputValue {
    /// Numbers when the text parses as one, text otherwise.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(n) = raw.parse::<i64>() {
            InputValue::Integer(n)
        } else if let Ok(x) = raw.parse::<f64>() {
            InputValue::Float(x)
        } else {
            InputValue::Text(raw.to_string())
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Integer(n) => write!(f, "{}", n),
            InputValue::Float(x) => write!(f, "{}", x),
            InputValue::Text(s) => write!(f, "{}", s),
        }
    }
}

pub type Inputs = BTreeMap<String, InputValue>;

/// Parses the legacy `var1=x,var2=y` argument string.
pub fn parse_arguments(arguments: &str) -> Result<Inputs, Error> {
    let mut inputs = Inputs::new();
    if arguments.trim().is_empty() {
        return Ok(inputs);
    }
    for pair in arguments.split(',') {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::Script(format!("Wrong format for arguments: '{}'", pair)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Script(format!("Wrong format for arguments: '{}'", pair)));
        }
        inputs.insert(name.to_string(), InputValue::parse(value));
    }
    Ok(inputs)
}

/// Overlays configured values on the script's declared defaults.
pub fn merge_inputs(declared: Inputs, configured: Inputs) -> Inputs {
    let mut merged = declared;
    merged.extend(configured);
    merged
}

/// The script engine, whatever language it runs.
///
/// The runner binds the unit's image, runs the script against the run's
/// workbench, then resets the bindings before the next unit.
pub trait ScriptRunner: Send {
    /// Inputs the script declares, with their default values.
    fn declared_inputs(&self) -> Inputs;

    fn bind_image(&mut self, image: ImageId);

    fn set_inputs(&mut self, inputs: Inputs);

    fn run(&mut self, bench: &mut Workbench) -> Result<(), Error>;

    fn reset_bindings(&mut self);
}
