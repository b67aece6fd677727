//! Integration tests for writing C3D files and verifying round-trip.

use std::fs::OpenOptions;
use std::io::Write;

use c3d::{C3dReader, C3dWriter, Error, ParamValue, PointEncoding};
use glam::Vec3;
use tempfile::NamedTempFile;

fn write_basic_file(path: &std::path::Path, scale: f32, frames: &[Vec<Option<Vec3>>]) {
    let mut writer = C3dWriter::new();
    writer
        .set_labels(&["Hip", "Knee", "Ankle"])
        .expect("Failed to set labels");
    writer.set_scale(scale).expect("Failed to set scale");
    writer.set_frame_rate(60.0).expect("Failed to set rate");
    writer.open(path).expect("Failed to open writer");
    for frame in frames {
        if scale < 0.0 {
            writer.write_float_frame(frame).expect("Failed to write frame");
        } else {
            writer.write_int_frame(frame).expect("Failed to write frame");
        }
    }
    writer.close().expect("Failed to close writer");
}

#[test]
fn test_int_roundtrip_with_sentinel() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let frame = vec![
        Some(Vec3::new(10.0, 20.0, 30.0)),
        Some(Vec3::ZERO),
        Some(Vec3::new(40.0, 50.0, 60.0)),
    ];
    write_basic_file(temp.path(), 1.0, &[frame]);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(reader.point_count(), 3);
    assert_eq!(reader.frame_count(), 1);
    assert_eq!(reader.labels(), &["Hip", "Knee", "Ankle"]);
    assert_eq!(
        reader.parameter("POINT:FRAMES").unwrap().value,
        ParamValue::Int16(1)
    );
    assert!(matches!(
        reader.encoding(),
        PointEncoding::Integer { scale } if scale == 1.0
    ));

    let frame = reader.read_frame().expect("Failed to read frame").unwrap();
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.points()[0], Some(Vec3::new(10.0, 20.0, 30.0)));
    // A raw all-zero point is the unobserved sentinel, not the origin.
    assert_eq!(frame.points()[1], None);
    assert_eq!(frame.points()[2], Some(Vec3::new(40.0, 50.0, 60.0)));

    assert_eq!(reader.point_by_label("Knee").unwrap(), None);
    assert_eq!(
        reader.point_by_label("ankle").unwrap(),
        Some(Vec3::new(40.0, 50.0, 60.0))
    );
    assert_eq!(reader.label_index("ANKLE").unwrap(), 2);
    assert!(matches!(
        reader.label_index("Toe").unwrap_err(),
        Error::LabelNotFound(_)
    ));
}

#[test]
fn test_float_roundtrip_many_frames() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let frames: Vec<Vec<Option<Vec3>>> = (0..100)
        .map(|i| {
            let base = i as f32 * 0.25 + 0.1;
            vec![
                Some(Vec3::new(base, base + 0.5, base - 3.75)),
                Some(Vec3::new(-base, base * 2.0, 0.125)),
                None,
            ]
        })
        .collect();
    write_basic_file(temp.path(), -1.0, &frames);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(reader.frame_count(), 100);
    assert!(matches!(reader.encoding(), PointEncoding::Float));

    let mut last_progress = reader.progress_percent();
    for expected in &frames {
        let frame = reader.read_frame().expect("Failed to read frame").unwrap();
        // Float mode stores coordinates exactly.
        assert_eq!(frame.points(), expected.as_slice());
        // Progress never moves backwards while draining.
        let progress = reader.progress_percent();
        assert!(progress >= last_progress && progress <= 100);
        last_progress = progress;
    }
    assert_eq!(reader.frames_read(), 100);
    assert_eq!(reader.progress_percent(), 100);
    assert!(reader.read_frame().expect("Clean end expected").is_none());
}

#[test]
fn test_missing_group_is_format_error() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_basic_file(temp.path(), -1.0, &[]);

    let reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    let err = reader.parameter("NOGROUP:NOPARAM").unwrap_err();
    assert!(matches!(err, Error::GroupNotFound(_)));
    assert!(err.is_format());

    let err = reader.parameter("POINT:NOPARAM").unwrap_err();
    assert!(matches!(err, Error::ParameterNotFound(_)));
    assert!(err.is_format());
}

#[test]
fn test_new_parameter_after_open_is_state_error() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let mut writer = C3dWriter::new();
    writer.set_labels(&["A"]).expect("Failed to set labels");
    writer.open(temp.path()).expect("Failed to open writer");

    // Brand-new group after open.
    let err = writer.set_parameter("NEWGROUP:X", 1i16).unwrap_err();
    assert!(matches!(err, Error::ParameterAfterOpen(_)));
    assert!(err.is_state());

    // New parameter in an existing group is just as illegal.
    let err = writer.set_parameter("POINT:EXTRA", 1i16).unwrap_err();
    assert!(matches!(err, Error::ParameterAfterOpen(_)));
    assert!(err.is_state());

    writer.close().expect("Failed to close writer");
}

#[test]
fn test_data_start_layout() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let frame = vec![Some(Vec3::ONE), Some(Vec3::ONE), None];
    write_basic_file(temp.path(), 1.0, &[frame.clone(), frame]);

    let bytes = std::fs::read(temp.path()).expect("Failed to read file back");
    // Directory prologue sits at the start of block 2.
    assert_eq!(bytes[512], 0x01);
    assert_eq!(bytes[513], 0x50);
    let n_blocks = bytes[514] as u16;
    assert_eq!(bytes[515], 84);

    let header_data_start = u16::from_le_bytes([bytes[16], bytes[17]]);
    assert_eq!(header_data_start, n_blocks + 2);

    let reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(reader.header().data_start(), n_blocks + 2);
    assert_eq!(
        reader.parameter("POINT:DATA_START").unwrap().value,
        ParamValue::Int16((n_blocks + 2) as i16)
    );

    // Two int frames of three points, eight bytes per point.
    let data_offset = 512 * (header_data_start as usize - 1);
    assert_eq!(bytes.len(), data_offset + 2 * 3 * 8);
}

#[test]
fn test_patch_in_place() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let mut writer = C3dWriter::new();
    writer.set_labels(&["A"]).expect("Failed to set labels");
    writer.set_frame_rate(60.0).expect("Failed to set rate");
    writer
        .set_parameter("POINT:UNITS", "mm")
        .expect("Failed to set units");
    writer.open(temp.path()).expect("Failed to open writer");

    // Same type and shape: patched in the already-written directory.
    writer
        .set_parameter("POINT:RATE", 120.0f32)
        .expect("Failed to patch rate");
    writer
        .set_parameter("POINT:UNITS", "cm")
        .expect("Failed to patch units");

    // Different encoded length.
    let err = writer.set_parameter("POINT:UNITS", "meters").unwrap_err();
    assert!(matches!(
        err,
        Error::PatchSizeMismatch {
            expected: 2,
            actual: 6,
            ..
        }
    ));
    assert!(err.is_state());

    // Same encoded length but a different type.
    let err = writer.set_parameter("POINT:UNITS", 5i16).unwrap_err();
    assert!(matches!(err, Error::PatchShapeMismatch { .. }));
    assert!(err.is_state());

    writer
        .write_float_frame(&[Some(Vec3::ONE)])
        .expect("Failed to write frame");
    writer.close().expect("Failed to close writer");

    let reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(reader.frame_rate(), 120.0);
    assert_eq!(
        reader.parameter("POINT:UNITS").unwrap().value.as_str().unwrap(),
        "cm"
    );
}

#[test]
fn test_int_quantization_truncates_toward_zero() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let frame = vec![
        Some(Vec3::new(10.25, -3.7, 7.9)),
        Some(Vec3::new(0.2, 0.0, 0.0)),
        Some(Vec3::new(100.0, 200.0, 300.0)),
    ];
    write_basic_file(temp.path(), 0.5, &[frame]);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    let frame = reader.read_frame().expect("Failed to read frame").unwrap();
    // raw = trunc(value / 0.5), decoded = raw * 0.5
    assert_eq!(frame.points()[0], Some(Vec3::new(10.0, -3.5, 7.5)));
    // (0.2, 0, 0) quantizes to raw (0, 0, 0): indistinguishable from
    // unobserved by the sentinel rule.
    assert_eq!(frame.points()[1], None);
    assert_eq!(frame.points()[2], Some(Vec3::new(100.0, 200.0, 300.0)));
}

#[test]
fn test_zero_frame_file() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_basic_file(temp.path(), -1.0, &[]);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(reader.frame_count(), 0);
    assert_eq!(
        reader.parameter("POINT:FRAMES").unwrap().value,
        ParamValue::Int16(0)
    );
    assert_eq!(reader.header().last_sample(), 0);
    assert!(reader.read_frame().expect("Clean end expected").is_none());
}

#[test]
fn test_truncated_data_ends_cleanly() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let frame = vec![Some(Vec3::ONE), None, Some(Vec3::ONE)];
    write_basic_file(temp.path(), -1.0, &[frame.clone(), frame.clone(), frame]);

    // Chop off exactly the last frame (three float points, 16 bytes each).
    let len = std::fs::metadata(temp.path()).unwrap().len();
    let file = OpenOptions::new().write(true).open(temp.path()).unwrap();
    file.set_len(len - 48).unwrap();
    drop(file);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(reader.frame_count(), 3);
    assert!(reader.read_frame().unwrap().is_some());
    assert!(reader.read_frame().unwrap().is_some());
    // The declared third frame is gone; the stream just ends.
    assert!(reader.read_frame().unwrap().is_none());
    assert_eq!(reader.frames_read(), 2);
}

#[test]
fn test_reading_past_declared_count_is_state_error() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let frame = vec![Some(Vec3::ONE), None, Some(Vec3::ONE)];
    write_basic_file(temp.path(), -1.0, &[frame.clone(), frame]);

    // Trailing bytes the frame counter does not cover.
    let mut file = OpenOptions::new().append(true).open(temp.path()).unwrap();
    file.write_all(&[0xAB; 48]).unwrap();
    drop(file);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert!(reader.read_frame().unwrap().is_some());
    assert!(reader.read_frame().unwrap().is_some());
    let err = reader.read_frame().unwrap_err();
    assert!(matches!(err, Error::PastLastFrame { count: 2 }));
    assert!(err.is_state());
}

#[test]
fn test_error_families() {
    let err = C3dReader::open("/no/such/file.c3d").unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    assert!(err.is_io());

    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_basic_file(temp.path(), -1.0, &[vec![Some(Vec3::ONE), None, None]]);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    let err = reader.parameter("POINTUSED").unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
    assert!(err.is_format());

    // Type mismatch on typed access is a format fault.
    let err = reader
        .parameter("POINT:USED")
        .unwrap()
        .value
        .as_f32()
        .unwrap_err();
    assert!(err.is_format());

    reader.read_frame().expect("Failed to read frame");
    let err = reader.point(7).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 7, count: 3 }));
    assert!(err.is_state());
}

#[test]
fn test_case_insensitive_lookups() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    write_basic_file(temp.path(), -1.0, &[vec![Some(Vec3::ONE), None, None]]);

    let mut reader = C3dReader::open(temp.path()).expect("Failed to reopen");
    assert_eq!(
        reader.parameter("point:used").unwrap().value,
        ParamValue::Int16(3)
    );
    reader.read_frame().expect("Failed to read frame");
    assert_eq!(reader.point_by_label("HIP").unwrap(), Some(Vec3::ONE));
    assert_eq!(reader.point_by_label("hip").unwrap(), Some(Vec3::ONE));
}

#[test]
fn test_transcode_int_to_float() {
    let int_file = NamedTempFile::new().expect("Failed to create temp file");
    let frames: Vec<Vec<Option<Vec3>>> = (1..=5)
        .map(|i| {
            let v = i as f32;
            vec![Some(Vec3::new(v, v * 2.0, v * 3.0)), None, Some(Vec3::ONE)]
        })
        .collect();
    write_basic_file(int_file.path(), 1.0, &frames);

    // Read the int file and write its frames back out in float mode.
    let float_file = NamedTempFile::new().expect("Failed to create temp file");
    {
        let mut reader = C3dReader::open(int_file.path()).expect("Failed to open input");
        let mut writer = C3dWriter::new();
        let labels = reader.labels().to_vec();
        writer.set_labels(&labels).expect("Failed to copy labels");
        writer.set_scale(-1.0).expect("Failed to set scale");
        writer
            .set_frame_rate(reader.frame_rate())
            .expect("Failed to copy rate");
        writer.open(float_file.path()).expect("Failed to open output");
        while let Some(frame) = reader.read_frame().expect("Failed to read frame") {
            writer
                .write_float_frame(frame.points())
                .expect("Failed to write frame");
        }
        writer.close().expect("Failed to close output");
    }

    let mut reader = C3dReader::open(float_file.path()).expect("Failed to reopen output");
    assert!(matches!(reader.encoding(), PointEncoding::Float));
    assert_eq!(reader.frame_count(), 5);
    assert_eq!(reader.labels(), &["Hip", "Knee", "Ankle"]);
    for expected in &frames {
        let frame = reader.read_frame().expect("Failed to read frame").unwrap();
        assert_eq!(frame.points(), expected.as_slice());
    }
}
