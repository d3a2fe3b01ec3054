use std::fs::File;
use std::io::Write;
use std::path::Path;

use npyz::WriterBuilder;

/// One member of a fixture container.
pub enum Member<'a> {
    U8 { shape: &'a [u64], data: &'a [u8] },
    I64 { shape: &'a [u64], data: &'a [i64] },
    F32 { shape: &'a [u64], data: &'a [f32] },
}

fn encode<T: npyz::AutoSerialize + Copy>(shape: &[u64], data: &[T]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut writer = npyz::WriteOptions::<T>::new()
        .default_dtype()
        .shape(shape)
        .writer(&mut bytes)
        .begin_nd()
        .expect("begin npy");
    writer.extend(data.iter().copied()).expect("write npy data");
    writer.finish().expect("finish npy");
    bytes
}

/// Write an `.npz` archive with members in the given order.
pub fn write_npz(path: &Path, members: &[(&str, Member<'_>)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create npz parent dirs");
    }
    let file = File::create(path).expect("create npz");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, member) in members {
        let bytes = match member {
            Member::U8 { shape, data } => encode::<u8>(shape, data),
            Member::I64 { shape, data } => encode::<i64>(shape, data),
            Member::F32 { shape, data } => encode::<f32>(shape, data),
        };
        zip.start_file(format!("{name}.npy"), options)
            .expect("start npz member");
        zip.write_all(&bytes).expect("write npz member");
    }
    zip.finish().expect("finish npz");
}

/// `count` frames of `h x w x c` where every byte of frame `i` equals `i`.
pub fn frames(count: usize, h: usize, w: usize, c: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| std::iter::repeat_n(i as u8, h * w * c))
        .collect()
}
