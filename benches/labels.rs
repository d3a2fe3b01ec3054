use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use imgcorpus::dataset::{BuildOptions, LabelMap, SequentialTokens, build_dataset_with, normalize_label};
use tempfile::tempdir;

const FOLDER_COUNT: usize = 1_000;
const IMAGES_PER_CLASS: usize = 20;

fn raw_folder_names() -> Vec<String> {
    (0..FOLDER_COUNT)
        .map(|i| format!("  Class {i} -- Photos (set_{})!! ", i % 7))
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let names = raw_folder_names();
    c.bench_with_input(
        BenchmarkId::new("normalize_label", FOLDER_COUNT),
        &names,
        |b, names| {
            b.iter(|| {
                for name in names {
                    black_box(normalize_label(black_box(name)));
                }
            });
        },
    );
}

fn bench_label_map(c: &mut Criterion) {
    let names = raw_folder_names();
    c.bench_with_input(
        BenchmarkId::new("label_map_from_raw", FOLDER_COUNT),
        &names,
        |b, names| {
            b.iter(|| black_box(LabelMap::from_raw_labels(names.iter())));
        },
    );
}

fn bench_build(c: &mut Criterion) {
    let source = tempdir().expect("tempdir");
    for class in ["cats", "dogs", "birds"] {
        let dir = source.path().join(class);
        std::fs::create_dir_all(&dir).expect("class dir");
        for i in 0..IMAGES_PER_CLASS {
            std::fs::write(dir.join(format!("{i}.png")), [0u8; 64]).expect("seed image");
        }
    }
    c.bench_function("build_dataset_copy", |b| {
        b.iter(|| {
            let out = tempdir().expect("out tempdir");
            let mut tokens = SequentialTokens::default();
            let mut progress = None;
            build_dataset_with(
                source.path(),
                out.path(),
                &BuildOptions::default(),
                &mut tokens,
                &mut progress,
            )
            .expect("build")
        });
    });
}

criterion_group!(benches, bench_normalize, bench_label_map, bench_build);
criterion_main!(benches);
