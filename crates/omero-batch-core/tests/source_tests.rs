mod common;

use common::{write_images, FakeImageIo, FakeRemote};
use omero_batch_core::source::{ImageSource, LocalImages, RemoteImages, UnitHandle};
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_undecodable_files_are_recorded_not_fatal() {
    let tmp = tempdir().unwrap();
    write_images(
        tmp.path(),
        &[
            ("a.tif", "IMAGE"),
            ("b.tif", "IMAGE"),
            ("c.tif", "IMAGE"),
            ("broken.tif", "BAD"),
            ("notes.txt", "hello"),
        ],
    );

    let images = LocalImages::scan(&FakeImageIo::new(), tmp.path(), false, &[]).unwrap();
    assert_eq!(images.size(), 3);
    assert_eq!(images.file_count(), 5);

    let failed: Vec<PathBuf> = images.failures().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(
        failed,
        vec![tmp.path().join("broken.tif"), tmp.path().join("notes.txt")]
    );
}

#[test]
fn test_each_series_is_a_unit() {
    let tmp = tempdir().unwrap();
    write_images(tmp.path(), &[("multi.lif", "SERIES 3"), ("single.tif", "IMAGE")]);

    let images = LocalImages::scan(&FakeImageIo::new(), tmp.path(), false, &[]).unwrap();
    let units: Vec<_> = images.into_units().collect();
    assert_eq!(units.len(), 4);

    let series: Vec<usize> = units
        .iter()
        .filter_map(|u| match &u.handle {
            UnitHandle::Local { path, series } if path.ends_with("multi.lif") => Some(*series),
            _ => None,
        })
        .collect();
    assert_eq!(series, vec![0, 1, 2]);

    assert_eq!(units[0].progress, "File 1/2, image 1/3");
    assert_eq!(units[2].progress, "File 1/2, image 3/3");
    assert_eq!(units[3].progress, "File 2/2, image 1/1");
}

#[test]
fn test_stitched_members_are_not_enumerated_again() {
    let tmp = tempdir().unwrap();
    write_images(
        tmp.path(),
        &[
            ("plane_0.tif", "STITCH plane_1.tif,plane_2.tif"),
            ("plane_1.tif", "IMAGE"),
            ("plane_2.tif", "IMAGE"),
            ("zz_other.tif", "IMAGE"),
        ],
    );

    let images = LocalImages::scan(&FakeImageIo::new(), tmp.path(), false, &[]).unwrap();
    let units: Vec<_> = images.into_units().collect();
    assert_eq!(units.len(), 2);
    assert!(matches!(
        &units[0].handle,
        UnitHandle::Local { path, series: 0 } if path.ends_with("plane_0.tif")
    ));
    assert_eq!(units[1].progress, "File 4/4, image 1/1");
}

#[test]
fn test_ignore_patterns_and_recursion() {
    let tmp = tempdir().unwrap();
    write_images(tmp.path(), &[("top.tif", "IMAGE")]);
    write_images(&tmp.path().join("nested"), &[("deep.tif", "IMAGE")]);
    write_images(&tmp.path().join("skip"), &[("skipped.tif", "IMAGE")]);

    let io = FakeImageIo::new();
    let flat = LocalImages::scan(&io, tmp.path(), false, &[]).unwrap();
    assert_eq!(flat.size(), 1);

    let ignore = vec!["**/skip/**".to_string()];
    let deep = LocalImages::scan(&io, tmp.path(), true, &ignore).unwrap();
    assert_eq!(deep.size(), 2);
}

#[test]
fn test_missing_directory_yields_no_units() {
    let tmp = tempdir().unwrap();
    let images =
        LocalImages::scan(&FakeImageIo::new(), &tmp.path().join("absent"), false, &[]).unwrap();
    assert_eq!(images.size(), 0);
    assert!(images.failures().is_empty());
}

#[test]
fn test_remote_units_are_restartable_and_open_with_identity() {
    let mut remote = FakeRemote::new(7);
    let ids = remote.add_dataset(1, &["a.tif", "b.tif"]);
    remote.state.lock().unwrap().read_only.push(ids[1]);

    let images = RemoteImages::fetch(&mut remote, 1).unwrap();
    assert_eq!(images.size(), 2);

    let first: Vec<_> = images.units().collect();
    let second: Vec<_> = images.units().collect();
    assert_eq!(first, second);
    assert_eq!(first[1].progress, "Image 2/2");
    assert_eq!(first[0].remote_id(), Some(ids[0]));

    let io = FakeImageIo::new();
    let opened = first[1].open(&io, Some(&mut remote)).unwrap();
    assert_eq!(opened.remote_id, Some(ids[1]));
    assert_eq!(opened.annotable, Some(false));

    let source = ImageSource::Remote(images);
    assert_eq!(source.size(), 2);
    assert_eq!(source.into_units().len(), 2);
}

#[test]
fn test_remote_unit_without_store_fails() {
    let mut remote = FakeRemote::new(7);
    remote.add_dataset(1, &["a.tif"]);
    let images = RemoteImages::fetch(&mut remote, 1).unwrap();
    let unit = images.units().next().unwrap();
    assert!(unit.open(&FakeImageIo::new(), None).is_err());
}

#[test]
fn test_unknown_dataset_is_an_error() {
    let mut remote = FakeRemote::new(7);
    assert!(RemoteImages::fetch(&mut remote, 99).is_err());
}
