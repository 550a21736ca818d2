use super::Roi;
use crate::error::Error;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Entry name for the ROI at `index`: `<index>-<label>.roi`.
///
/// Readers that strip the index prefix see duplicate labels again.
pub fn entry_name(index: usize, roi: &Roi) -> String {
    format!("{}-{}.roi", index, roi.label())
}

/// Writes one archive entry per ROI, in order.
pub fn persist_local_archive(rois: &[Roi], path: &Path) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default();

    for (index, roi) in rois.iter().enumerate() {
        zip.start_file(entry_name(index, roi), options)?;
        let body = serde_json::to_vec(roi)?;
        zip.write_all(&body)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}

/// Reads back an archive written by [`persist_local_archive`].
pub fn read_local_archive(path: &Path) -> Result<Vec<Roi>, Error> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut rois = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let mut body = Vec::new();
        entry.read_to_end(&mut body)?;
        rois.push(serde_json::from_slice(&body)?);
    }

    Ok(rois)
}
