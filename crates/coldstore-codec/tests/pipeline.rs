use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use coldstore_codec::{
    CompressionEngine, CompressionParameters, DeterministicSerializer, check_tar_readable, read_frame_header,
    unpack_tar_file, window_log_for_size,
};
use walkdir::WalkDir;

fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("sub/deeper")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("a.txt"), b"alpha").unwrap();
    fs::write(root.join("sub/b.txt"), b"bravo").unwrap();
    fs::write(root.join("sub/deeper/c.bin"), vec![0xAB; 70_000]).unwrap();
}

/// Relative path to contents (`None` for directories).
fn snapshot(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            let content = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
            (rel, content)
        })
        .collect()
}

fn fast() -> CompressionEngine {
    CompressionEngine::new(CompressionParameters {
        level:     3,
        threads:   0,
        long_mode: true,
    })
}

#[test]
fn serialization_is_byte_identical_across_runs_and_copies() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    build_tree(&first);
    // Same content created in a different order.
    fs::create_dir_all(second.join("empty")).unwrap();
    fs::create_dir_all(second.join("sub/deeper")).unwrap();
    fs::write(second.join("sub/deeper/c.bin"), vec![0xAB; 70_000]).unwrap();
    fs::write(second.join("sub/b.txt"), b"bravo").unwrap();
    fs::write(second.join("a.txt"), b"alpha").unwrap();

    let serializer = DeterministicSerializer::new();
    let (one, _) = serializer.serialize_to(&first, Vec::new()).unwrap();
    let (two, _) = serializer.serialize_to(&first, Vec::new()).unwrap();
    let (three, _) = serializer.serialize_to(&second, Vec::new()).unwrap();
    assert_eq!(one, two);
    assert_eq!(one, three);
}

#[test]
fn tree_round_trips_through_tar_and_zstd() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    build_tree(&src);

    let tar_path = dir.path().join("src.tar");
    let report = DeterministicSerializer::new().serialize(&src, &tar_path).unwrap();
    assert_eq!(report.files, 3);
    assert_eq!(report.directories, 3);
    check_tar_readable(&tar_path).unwrap();

    let artifact = dir.path().join("src.tar.zst");
    let engine = fast();
    let compressed = engine.compress(&tar_path, &artifact).unwrap();
    assert!(engine.verify_integrity(&artifact));
    engine.verify_stream(&artifact).unwrap();

    let info = engine.archive_info(&artifact).unwrap();
    assert_eq!((info.files, info.folders), (3, 3));
    assert_eq!(info.total_size, 5 + 5 + 70_000);
    assert_eq!(info.compressed_size, compressed.output_size);
    assert_eq!(info.memory_required_mb, 1);

    let restored_tar = dir.path().join("restored.tar");
    engine.decompress(&artifact, &restored_tar).unwrap();
    let out = dir.path().join("out");
    let unpacked = unpack_tar_file(&restored_tar, &out).unwrap();
    assert!(unpacked.skipped.is_empty());

    assert_eq!(snapshot(&src), snapshot(&out));
}

#[test]
fn header_window_log_matches_chosen_one() {
    let dir = tempfile::tempdir().unwrap();
    let engine = fast();
    for size in [10_usize, 1 << 20, 3 << 20] {
        let input = dir.path().join(format!("in-{size}"));
        fs::write(&input, vec![b'q'; size]).unwrap();
        let output = dir.path().join(format!("in-{size}.zst"));
        let report = engine.compress(&input, &output).unwrap();
        assert_eq!(report.window_log, window_log_for_size(size as u64));
        assert_eq!(read_frame_header(&output).unwrap().window_log(), report.window_log);
    }
}

#[test]
fn flipped_byte_is_caught_by_stream_verification() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("noise.bin");
    let data: Vec<u8> = (0..400_000u64).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8).collect();
    fs::write(&input, data).unwrap();
    let artifact = dir.path().join("noise.bin.zst");
    let engine = fast();
    engine.compress(&input, &artifact).unwrap();

    let mut bytes = fs::read(&artifact).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&artifact, bytes).unwrap();

    assert!(engine.verify_integrity(&artifact), "header is untouched");
    assert!(engine.verify_stream(&artifact).is_err());
}
