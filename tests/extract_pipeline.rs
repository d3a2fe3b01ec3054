mod support;

use imgcorpus::dataset::{BuildOptions, LABELS_FILE_NAME, build_dataset};
use imgcorpus::samples::{
    EXPORT_MANIFEST_FILE_NAME, ExtractError, ExtractOptions, extract_samples,
    read_export_manifest,
};
use support::npz::{Member, frames, write_npz};
use support::tree::{file_names, touch};
use tempfile::tempdir;

#[test]
fn limit_caps_exported_files() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("samples_10x4x4x3.npz");
    let pixels = frames(10, 4, 4, 3);
    write_npz(
        &container,
        &[("arr_0", Member::U8 { shape: &[10, 4, 4, 3], data: &pixels })],
    );
    let out = dir.path().join("out");

    let summary = extract_samples(&ExtractOptions {
        limit: 3,
        ..ExtractOptions::new(&container, &out)
    })
    .unwrap();
    assert_eq!(summary.exported, 3);
    assert_eq!(
        file_names(&out),
        vec![
            EXPORT_MANIFEST_FILE_NAME,
            "sample_000000.png",
            "sample_000001.png",
            "sample_000002.png",
        ]
    );
}

#[test]
fn unlabeled_samples_use_generic_names() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("samples.npz");
    let pixels = frames(5, 8, 8, 3);
    write_npz(
        &container,
        &[("arr_0", Member::U8 { shape: &[5, 8, 8, 3], data: &pixels })],
    );
    let out = dir.path().join("out");

    let summary = extract_samples(&ExtractOptions::new(&container, &out)).unwrap();
    assert_eq!(summary.exported, 5);
    assert_eq!(summary.image_array, "arr_0");
    assert_eq!(summary.label_array, None);

    let records = read_export_manifest(&summary.manifest).unwrap();
    let names: Vec<_> = records.iter().map(|record| record.filename.as_str()).collect();
    assert_eq!(
        names,
        [
            "sample_000000.png",
            "sample_000001.png",
            "sample_000002.png",
            "sample_000003.png",
            "sample_000004.png",
        ]
    );
    assert!(records.iter().all(|record| record.label_index.is_none()));
    assert!(records.iter().all(|record| record.label_name.is_none()));

    let decoded = image::open(out.join("sample_000003.png")).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (8, 8));
    assert_eq!(decoded.get_pixel(2, 5).0, [3, 3, 3]);
}

#[test]
fn labels_and_map_name_each_sample() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("samples.npz");
    let pixels = frames(5, 8, 8, 3);
    write_npz(
        &container,
        &[
            ("arr_0", Member::U8 { shape: &[5, 8, 8, 3], data: &pixels }),
            ("arr_1", Member::I64 { shape: &[5], data: &[0, 1, 0, 1, 0] }),
        ],
    );
    let label_map = dir.path().join("map.json");
    std::fs::write(&label_map, r#"{"index_to_label": {"0": "cat", "1": "dog"}}"#).unwrap();
    let out = dir.path().join("out");

    let summary = extract_samples(&ExtractOptions {
        label_map_path: Some(label_map),
        ..ExtractOptions::new(&container, &out)
    })
    .unwrap();
    assert_eq!(summary.label_array.as_deref(), Some("arr_1"));

    let records = read_export_manifest(&summary.manifest).unwrap();
    let names: Vec<_> = records.iter().map(|record| record.filename.as_str()).collect();
    assert_eq!(
        names,
        [
            "cat_000000.png",
            "dog_000001.png",
            "cat_000002.png",
            "dog_000003.png",
            "cat_000004.png",
        ]
    );
    assert_eq!(records[1].label_index, Some(1));
    assert_eq!(records[1].label_name.as_deref(), Some("dog"));
    for name in names {
        assert!(out.join(name).is_file());
    }
}

#[test]
fn subdirs_group_named_samples_by_class() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("samples.npz");
    let pixels = frames(3, 2, 2, 4);
    write_npz(
        &container,
        &[
            ("images", Member::U8 { shape: &[3, 2, 2, 4], data: &pixels }),
            ("y", Member::I64 { shape: &[3], data: &[0, 5, 1] }),
        ],
    );
    std::fs::write(
        dir.path().join(LABELS_FILE_NAME),
        r#"{"label_to_index": {"tabby cat": 0, "dog": 1}}"#,
    )
    .unwrap();
    let out = dir.path().join("out");

    let summary = extract_samples(&ExtractOptions {
        use_subdirs: true,
        ..ExtractOptions::new(&container, &out)
    })
    .unwrap();
    let records = read_export_manifest(&summary.manifest).unwrap();
    assert_eq!(records[0].filename, "tabby_cat/tabby_cat_000000.png");
    assert_eq!(records[0].label_name.as_deref(), Some("tabby cat"));
    assert_eq!(records[1].filename, "class5_000001.png");
    assert_eq!(records[1].label_name, None);
    assert_eq!(records[2].filename, "dog/dog_000002.png");
    assert!(out.join("tabby_cat/tabby_cat_000000.png").is_file());

    let decoded = image::open(out.join("dog/dog_000002.png")).unwrap();
    assert_eq!(decoded.color(), image::ColorType::Rgba8);
}

#[test]
fn single_channel_samples_decode_as_grayscale() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("gray.npz");
    let pixels = frames(2, 6, 5, 1);
    write_npz(
        &container,
        &[("arr_0", Member::U8 { shape: &[2, 6, 5, 1], data: &pixels })],
    );
    let out = dir.path().join("out");
    extract_samples(&ExtractOptions::new(&container, &out)).unwrap();

    let decoded = image::open(out.join("sample_000001.png")).unwrap();
    assert_eq!(decoded.color(), image::ColorType::L8);
    let gray = decoded.to_luma8();
    assert_eq!(gray.dimensions(), (5, 6));
    assert!(gray.pixels().all(|pixel| pixel.0 == [1]));
}

#[test]
fn empty_container_writes_nothing() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("empty.npz");
    write_npz(&container, &[]);
    let out = dir.path().join("out");

    let err = extract_samples(&ExtractOptions::new(&container, &out)).unwrap_err();
    assert!(matches!(err, ExtractError::EmptyContainer));
    assert!(!out.exists());
}

#[test]
fn missing_container_is_reported_first() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let err = extract_samples(&ExtractOptions::new(dir.path().join("nope.npz"), &out))
        .unwrap_err();
    assert!(matches!(err, ExtractError::ContainerNotFound(_)));
    assert!(!out.exists());
}

#[test]
fn malformed_samples_abort_the_run() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("bad.npz");
    let values = vec![0.5_f32; 2 * 3 * 3 * 3];
    write_npz(
        &container,
        &[("arr_0", Member::F32 { shape: &[2, 3, 3, 3], data: &values })],
    );
    let out = dir.path().join("out");

    let err = extract_samples(&ExtractOptions::new(&container, &out)).unwrap_err();
    match err {
        ExtractError::MalformedSample { index, shape, .. } => {
            assert_eq!(index, 0);
            assert_eq!(shape, vec![3, 3, 3]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out.exists());
}

#[test]
fn two_channel_images_are_malformed() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("two.npz");
    let pixels = frames(1, 2, 2, 2);
    write_npz(
        &container,
        &[("arr_0", Member::U8 { shape: &[1, 2, 2, 2], data: &pixels })],
    );
    let err = extract_samples(&ExtractOptions::new(&container, dir.path().join("out")))
        .unwrap_err();
    assert!(matches!(err, ExtractError::MalformedSample { .. }));
}

#[test]
fn built_label_map_names_extracted_samples() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    touch(&src.join("Dogs/a.png"), b"a");
    touch(&src.join("Cats/b.png"), b"b");
    let built = build_dataset(&src, &dir.path().join("built"), &BuildOptions::default()).unwrap();

    let container = dir.path().join("samples.npz");
    let pixels = frames(2, 3, 3, 3);
    write_npz(
        &container,
        &[
            ("arr_0", Member::U8 { shape: &[2, 3, 3, 3], data: &pixels }),
            ("arr_1", Member::I64 { shape: &[2], data: &[1, 0] }),
        ],
    );
    let summary = extract_samples(&ExtractOptions {
        label_map_path: Some(built.labels_json),
        ..ExtractOptions::new(&container, dir.path().join("out"))
    })
    .unwrap();
    let records = read_export_manifest(&summary.manifest).unwrap();
    assert_eq!(records[0].filename, "dogs_000000.png");
    assert_eq!(records[1].filename, "cats_000001.png");
}

#[test]
fn empty_class_name_stays_inside_out_dir() {
    let dir = tempdir().unwrap();
    let container = dir.path().join("samples.npz");
    let pixels = frames(1, 2, 2, 3);
    write_npz(
        &container,
        &[
            ("arr_0", Member::U8 { shape: &[1, 2, 2, 3], data: &pixels }),
            ("arr_1", Member::I64 { shape: &[1], data: &[0] }),
        ],
    );
    std::fs::write(
        dir.path().join(LABELS_FILE_NAME),
        r#"{"index_to_label": {"0": ""}}"#,
    )
    .unwrap();
    let out = dir.path().join("out");

    let summary = extract_samples(&ExtractOptions {
        use_subdirs: true,
        ..ExtractOptions::new(&container, &out)
    })
    .unwrap();
    let records = read_export_manifest(&summary.manifest).unwrap();
    assert_eq!(records[0].filename, "_000000.png");
    assert_eq!(records[0].label_index, Some(0));
    assert!(out.join("_000000.png").is_file());
}
