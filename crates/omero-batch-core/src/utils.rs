use chrono::Local;

/// Format used for every run timestamp: file names and remote table names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Strips the last extension from an image title for use in output names.
///
/// QPTIFF titles keep everything after the extension (`a.qptiff - 1`
/// becomes `a_ - 1`), since the series name follows it. Titles starting
/// with their only dot are left alone.
pub fn remove_extension(title: &str) -> String {
    if title.contains("qptiff") {
        return title.replace(".qptiff", "_");
    }
    match title.rfind('.') {
        None | Some(0) => title.to_string(),
        Some(index) => title[..index].to_string(),
    }
}
