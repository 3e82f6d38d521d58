//! Media metadata types.
//!
//! Metadata is read once when a [`MediaFile`](crate::MediaFile) is opened
//! and cached for its lifetime.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Container-level and per-stream metadata for one media file.
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Best video stream, if any.
    pub video: Option<VideoMetadata>,
    /// Best audio stream, if any.
    pub audio: Option<AudioMetadata>,
    /// Total duration, or `None` when neither the container nor the video
    /// stream reports one.
    pub duration: Option<Duration>,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

/// Pick a duration from what FFmpeg reports.
///
/// `container_micros` is the container duration in AV_TIME_BASE units;
/// `stream_ticks` is the video stream's duration in `time_base`. FFmpeg marks
/// a missing value with a negative sentinel, so negatives count as unknown.
/// A known zero is a real zero-length file and is returned as such.
pub fn resolve_duration(
    container_micros: i64,
    stream_ticks: i64,
    time_base: Rational,
) -> Option<Duration> {
    if let Ok(micros) = u64::try_from(container_micros) {
        return Some(Duration::from_micros(micros));
    }
    if stream_ticks < 0 || time_base.numerator() <= 0 || time_base.denominator() <= 0 {
        return None;
    }
    let seconds = stream_ticks as f64 * f64::from(time_base.numerator())
        / f64::from(time_base.denominator());
    Some(Duration::from_secs_f64(seconds))
}

/// Metadata for a video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second.
    pub frames_per_second: f64,
    /// Frame count reported by the container, or estimated from duration
    /// and frame rate when the container does not store one.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Stream index inside the container.
    pub stream_index: usize,
    /// Stream time base.
    pub time_base: Rational,
}

/// Metadata for an audio stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudioMetadata {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Codec name (e.g. `"aac"`).
    pub codec: String,
    /// Stream index inside the container.
    pub stream_index: usize,
}
