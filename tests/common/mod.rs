//! A codec-free media backend for driving the pipeline in tests.
//!
//! Sources are text files containing `duration=<seconds>`. Anything else is
//! treated as an unopenable file. Clips are written as `<start> <end>` and
//! read back at 10 frames per second. `duration=unknown` stands for a
//! container that does not report its length.

#![allow(dead_code)]

pub mod synthetic;

use std::{
    cell::RefCell,
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use framesplit::{
    FrameSource, MediaBackend, SegmentSpan, SplitConfig, SplitError,
};
use image::DynamicImage;

pub const FAKE_FPS: f64 = 10.0;

#[derive(Default)]
pub struct FakeBackend {
    /// Segment labels whose write should fail.
    pub failing_clips: HashSet<String>,
    /// Segment labels whose frames cannot be opened.
    pub failing_samples: HashSet<String>,
    /// Every clip written, in order.
    pub written: RefCell<Vec<PathBuf>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_clip(mut self, label: &str) -> Self {
        self.failing_clips.insert(label.to_string());
        self
    }

    pub fn fail_sampling(mut self, label: &str) -> Self {
        self.failing_samples.insert(label.to_string());
        self
    }

    pub fn writes(&self) -> usize {
        self.written.borrow().len()
    }
}

fn label_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn unreadable(path: &Path) -> SplitError {
    SplitError::FileOpen {
        path: path.to_path_buf(),
        reason: "Invalid data found when processing input".to_string(),
    }
}

impl MediaBackend for FakeBackend {
    type Frames = FakeFrames;

    fn probe_duration(&self, path: &Path) -> Result<Duration, SplitError> {
        let contents = fs::read_to_string(path).map_err(|_| unreadable(path))?;
        if contents.trim() == "duration=unknown" {
            return Err(SplitError::UnknownDuration(path.to_path_buf()));
        }
        let seconds: f64 = contents
            .trim()
            .strip_prefix("duration=")
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| unreadable(path))?;
        Ok(Duration::from_secs_f64(seconds))
    }

    fn write_clip(
        &self,
        source: &Path,
        span: &SegmentSpan,
        output: &Path,
    ) -> Result<(), SplitError> {
        self.probe_duration(source)?;
        if self.failing_clips.contains(&label_of(output)) {
            return Err(SplitError::VideoEncodeError(format!(
                "refusing to write {}",
                output.display()
            )));
        }
        fs::write(output, format!("{} {}", span.start, span.end))?;
        self.written.borrow_mut().push(output.to_path_buf());
        Ok(())
    }

    fn open_frames(&self, path: &Path) -> Result<FakeFrames, SplitError> {
        if self.failing_samples.contains(&label_of(path)) {
            return Err(unreadable(path));
        }
        let contents = fs::read_to_string(path).map_err(|_| unreadable(path))?;
        let mut bounds = contents.split_whitespace().map(str::parse::<f64>);
        let (Some(Ok(start)), Some(Ok(end))) = (bounds.next(), bounds.next()) else {
            return Err(unreadable(path));
        };
        Ok(FakeFrames {
            frame_count: ((end - start) * FAKE_FPS).round() as u64,
        })
    }
}

pub struct FakeFrames {
    frame_count: u64,
}

impl FrameSource for FakeFrames {
    fn frames_per_second(&self) -> f64 {
        FAKE_FPS
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn decode_frame(&mut self, frame_number: u64) -> Result<DynamicImage, SplitError> {
        if frame_number >= self.frame_count {
            return Err(SplitError::VideoDecodeError(format!(
                "end of stream before frame {frame_number}"
            )));
        }
        Ok(DynamicImage::new_rgb8(4, 4))
    }
}

/// Directory layout under a temporary root.
pub struct Workspace {
    pub root: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn input(&self) -> PathBuf {
        self.root.path().join("BeforeSplit")
    }

    pub fn segments(&self) -> PathBuf {
        self.root.path().join("AfterSplit")
    }

    pub fn frames(&self) -> PathBuf {
        self.root.path().join("ExtractedFrames")
    }

    pub fn config(&self) -> SplitConfig {
        SplitConfig::new()
            .with_input_dir(self.input())
            .with_segment_dir(self.segments())
            .with_frame_dir(self.frames())
            .with_ledger_path(self.root.path().join(".processed_videos"))
    }

    /// Write a fake source of `seconds` length and return its path.
    pub fn add_video(&self, name: &str, seconds: f64) -> PathBuf {
        fs::create_dir_all(self.input()).expect("create input dir");
        let path = self.input().join(name);
        fs::write(&path, format!("duration={seconds}")).expect("write source");
        path
    }

    /// Write a source whose container has no duration.
    pub fn add_unknown_duration(&self, name: &str) -> PathBuf {
        fs::create_dir_all(self.input()).expect("create input dir");
        let path = self.input().join(name);
        fs::write(&path, "duration=unknown").expect("write source");
        path
    }

    /// Write a file that no backend can open.
    pub fn add_garbage(&self, name: &str) -> PathBuf {
        fs::create_dir_all(self.input()).expect("create input dir");
        let path = self.input().join(name);
        fs::write(&path, b"this is not a media file").expect("write garbage");
        path
    }
}

/// Sorted file names in `dir`, or nothing if it does not exist.
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
