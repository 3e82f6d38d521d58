//! Tests for the FFmpeg-backed media layer.
//!
//! Most tests encode a short synthetic source first, so they only need the
//! FFmpeg libraries. The fixture tests need `tests/fixtures/sample_video.mp4`
//! and return early when it is absent.

mod common;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use common::{Workspace, file_names, synthetic};
use framesplit::{
    BatchDriver, EncodeOptions, FailureKind, FfmpegBackend, FfmpegFrames, FrameSampler,
    FrameSource, Ledger, MediaBackend, MediaFile, MemoryBackend, Segmenter, SplitConfig,
    VideoCodec, VideoOutcome,
};
use image::GenericImageView;

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

#[test]
fn open_nonexistent_file() {
    let error = MediaFile::open("this_file_does_not_exist.mp4").unwrap_err();
    assert!(
        error.to_string().contains("Failed to open media file"),
        "Error message should mention file open failure: {error}",
    );
}

#[test]
fn probe_rejects_garbage() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    fs::write(&invalid_file_path, b"this is not a media file").expect("Failed to write file");

    let error = FfmpegBackend::default()
        .probe_duration(&invalid_file_path)
        .unwrap_err();
    assert_eq!(error.kind(), FailureKind::Decode);
}

#[test]
fn garbage_source_fails_without_marking() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temporary_directory.path();
    let config = SplitConfig::new()
        .with_input_dir(root.join("in"))
        .with_segment_dir(root.join("segments"))
        .with_frame_dir(root.join("frames"));
    fs::create_dir_all(root.join("in")).unwrap();
    fs::write(root.join("in/broken.mp4"), b"this is not a media file").unwrap();

    let driver = BatchDriver::new(config, FfmpegBackend::default());
    let mut ledger = Ledger::new(MemoryBackend::new());
    let report = driver.run_once(&mut ledger).expect("run_once");

    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.videos[0].outcome,
        VideoOutcome::Failed {
            kind: FailureKind::Decode,
            ..
        }
    ));
    assert!(ledger.entries().unwrap().is_empty());
}

/// MPEG-4 ships with every FFmpeg build, unlike libx264.
fn portable_backend() -> FfmpegBackend {
    FfmpegBackend::new(EncodeOptions::default().video_codec(VideoCodec::Mpeg4))
}

fn twelve_second_source(workspace: &Workspace) -> PathBuf {
    fs::create_dir_all(workspace.input()).expect("create input dir");
    let source = workspace.input().join("clip.mp4");
    synthetic::write_video(&source, 12, true).expect("write synthetic source");
    source
}

fn assert_close(actual: Duration, expected: f64) {
    let seconds = actual.as_secs_f64();
    assert!(
        (seconds - expected).abs() < 0.5,
        "expected about {expected}s, got {seconds}s"
    );
}

fn brightness(image: &image::DynamicImage) -> u8 {
    let (width, height) = image.dimensions();
    image.to_rgb8().get_pixel(width / 2, height / 2)[0]
}

#[test]
fn synthetic_source_reports_its_shape() {
    let workspace = Workspace::new();
    let source = twelve_second_source(&workspace);

    let media = MediaFile::open(&source).expect("open");
    let video = media.metadata().video.clone().expect("video stream");
    assert_eq!(video.width, synthetic::WIDTH);
    assert_eq!(video.height, synthetic::HEIGHT);
    assert!((video.frames_per_second - 10.0).abs() < 0.01);
    assert!(media.metadata().audio.is_some());
    assert_close(portable_backend().probe_duration(&source).expect("duration"), 12.0);
}

#[test]
fn twelve_seconds_become_three_real_segments() {
    let workspace = Workspace::new();
    let source = twelve_second_source(&workspace);
    let backend = portable_backend();

    let segments = Segmenter::new(&backend)
        .segment(&source, &workspace.segments(), 5)
        .expect("segment");

    assert_eq!(
        file_names(&workspace.segments()),
        vec![
            "clip_segment_001.mp4",
            "clip_segment_002.mp4",
            "clip_segment_003.mp4"
        ]
    );
    for (segment, expected) in segments.iter().zip([5.0, 5.0, 2.0]) {
        let written = backend.probe_duration(&segment.path).expect("segment duration");
        assert_close(written, expected);

        let media = MediaFile::open(&segment.path).expect("open segment");
        assert!(media.metadata().audio.is_some(), "audio was dropped");
    }
}

#[test]
fn real_segments_sample_one_frame_per_second() {
    let workspace = Workspace::new();
    let source = twelve_second_source(&workspace);
    let backend = portable_backend();
    let segments = Segmenter::new(&backend)
        .segment(&source, &workspace.segments(), 5)
        .expect("segment");

    let sampler = FrameSampler::new(&backend);
    let first = sampler
        .sample(&segments[0].path, &workspace.frames(), &segments[0].label)
        .expect("sample first");
    let last = sampler
        .sample(&segments[2].path, &workspace.frames(), &segments[2].label)
        .expect("sample last");

    assert_eq!(first, 5);
    assert_eq!(last, 2);
    assert_eq!(
        file_names(&workspace.frames()),
        vec![
            "clip_segment_001_frame_000.png",
            "clip_segment_001_frame_001.png",
            "clip_segment_001_frame_002.png",
            "clip_segment_001_frame_003.png",
            "clip_segment_001_frame_004.png",
            "clip_segment_003_frame_000.png",
            "clip_segment_003_frame_001.png",
        ]
    );

    let still = image::open(workspace.frames().join("clip_segment_001_frame_000.png"))
        .expect("decode sampled frame");
    assert_eq!(still.dimensions(), (synthetic::WIDTH, synthetic::HEIGHT));
}

#[test]
fn frames_are_found_by_number() {
    let workspace = Workspace::new();
    let source = twelve_second_source(&workspace);

    let mut frames = FfmpegFrames::open(&source).expect("open frames");
    assert_eq!(frames.frame_count(), 120);

    // Each synthetic frame is brighter than the one ten frames before it.
    let dark = brightness(&frames.decode_frame(0).expect("frame 0"));
    let middle = brightness(&frames.decode_frame(10).expect("frame 10"));
    let bright = brightness(&frames.decode_frame(20).expect("frame 20"));
    assert!(dark < middle && middle < bright, "{dark} {middle} {bright}");

    // Going backwards needs a seek.
    assert_eq!(brightness(&frames.decode_frame(10).expect("frame 10 again")), middle);
    assert!(frames.decode_frame(120).is_err());
}

#[test]
fn real_batch_processes_and_marks_once() {
    let workspace = Workspace::new();
    let source = twelve_second_source(&workspace);
    let driver = BatchDriver::new(workspace.config(), portable_backend());
    let mut ledger = Ledger::new(MemoryBackend::new());

    let report = driver.run_once(&mut ledger).expect("run_once");
    match &report.videos[0].outcome {
        VideoOutcome::Processed {
            segments,
            frames,
            sampling_failures,
        } => {
            assert_eq!(segments.len(), 3);
            assert_eq!(*frames, 12);
            assert_eq!(*sampling_failures, 0);
        }
        other => panic!("expected Processed, got {other:?}"),
    }
    assert_eq!(file_names(&workspace.frames()).len(), 12);
    assert_eq!(ledger.entries().unwrap().len(), 1);
    assert!(source.exists());

    let again = driver.run_once(&mut ledger).expect("second run");
    assert_eq!(again.skipped(), 1);
}

#[test]
fn silent_source_segments_without_audio() {
    let workspace = Workspace::new();
    fs::create_dir_all(workspace.input()).expect("create input dir");
    let source = workspace.input().join("silent.mp4");
    synthetic::write_video(&source, 6, false).expect("write synthetic source");
    let backend = portable_backend();

    let segments = Segmenter::new(&backend)
        .segment(&source, &workspace.segments(), 5)
        .expect("segment");

    assert_eq!(segments.len(), 2);
    let tail = MediaFile::open(&segments[1].path).expect("open segment");
    assert!(tail.metadata().audio.is_none());
    assert_close(backend.probe_duration(&segments[1].path).expect("duration"), 1.0);
}

#[test]
fn fixture_segments_and_samples() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let segment_dir = temporary_directory.path().join("segments");
    let frame_dir = temporary_directory.path().join("frames");
    let backend = FfmpegBackend::default();

    let duration = backend.probe_duration(Path::new(SAMPLE_VIDEO)).expect("duration");
    let segments = Segmenter::new(&backend)
        .segment(Path::new(SAMPLE_VIDEO), &segment_dir, 5)
        .expect("segment");
    assert_eq!(
        segments.len() as u64,
        duration.as_secs().div_ceil(5),
        "one segment per started five seconds"
    );
    for segment in &segments {
        assert!(segment.path.exists(), "missing {}", segment.path.display());
        let written = backend.probe_duration(&segment.path).expect("segment duration");
        assert!(written.as_secs_f64() > 0.0);
    }

    let Some(first) = segments.first() else {
        return;
    };
    let frames = FrameSampler::new(&backend)
        .sample(&first.path, &frame_dir, &first.label)
        .expect("sample");
    assert!(frames >= 1);

    let still = image::open(frame_dir.join(format!("{}_frame_000.png", first.label)))
        .expect("decode sampled frame");
    assert!(still.width() > 0 && still.height() > 0);
}

#[test]
fn fixture_first_frame_decodes() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let mut frames = FfmpegFrames::open(SAMPLE_VIDEO).expect("open frames");
    assert!(frames.frames_per_second() > 0.0);
    assert!(frames.frame_count() > 0);

    let image = frames.decode_frame(0).expect("decode frame 0");
    assert!(image.width() > 0);

    let past_end = frames.frame_count();
    assert!(frames.decode_frame(past_end).is_err());
}
