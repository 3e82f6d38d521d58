//! The media seam between the pipeline and FFmpeg.
//!
//! [`Segmenter`](crate::Segmenter) and [`FrameSampler`](crate::FrameSampler)
//! only talk to a [`MediaBackend`]. [`FfmpegBackend`] is the real one; tests
//! plug in a fake that writes plain files so the batch logic can be exercised
//! without codecs.

use std::{path::Path, time::Duration};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{
    conversion,
    encode::EncodeOptions,
    error::SplitError,
    media::MediaFile,
    segment::SegmentSpan,
    transcode::Transcoder,
};

/// Random access to the frames of one opened video.
pub trait FrameSource {
    /// Average frame rate of the video.
    fn frames_per_second(&self) -> f64;

    /// Total number of frames.
    fn frame_count(&self) -> u64;

    /// Decode the frame at `frame_number`.
    ///
    /// # Errors
    ///
    /// Any error here (including reading past the end) tells the sampler to
    /// stop.
    fn decode_frame(&mut self, frame_number: u64) -> Result<DynamicImage, SplitError>;
}

/// Everything the pipeline needs from a media library.
pub trait MediaBackend {
    /// Frame reader returned by [`open_frames`](MediaBackend::open_frames).
    type Frames: FrameSource;

    /// Duration of the video at `path`.
    ///
    /// # Errors
    ///
    /// Decode-class errors if the file cannot be opened or holds no video.
    fn probe_duration(&self, path: &Path) -> Result<Duration, SplitError>;

    /// Write `span` of `source` to `output` as a standalone video.
    ///
    /// # Errors
    ///
    /// Decode-class errors for the source, encode-class errors for the
    /// output.
    fn write_clip(&self, source: &Path, span: &SegmentSpan, output: &Path)
    -> Result<(), SplitError>;

    /// Open `path` for frame-accurate reads.
    ///
    /// # Errors
    ///
    /// Decode-class errors if the file cannot be opened or holds no video.
    fn open_frames(&self, path: &Path) -> Result<Self::Frames, SplitError>;
}

/// [`MediaBackend`] backed by FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    options: EncodeOptions,
}

impl FfmpegBackend {
    /// Backend that re-encodes segments with `options`.
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Encoder settings used for segments.
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }
}

impl MediaBackend for FfmpegBackend {
    type Frames = FfmpegFrames;

    fn probe_duration(&self, path: &Path) -> Result<Duration, SplitError> {
        let media = MediaFile::open(path)?;
        media.require_video()?;
        media
            .metadata
            .duration
            .ok_or_else(|| SplitError::UnknownDuration(path.to_path_buf()))
    }

    fn write_clip(
        &self,
        source: &Path,
        span: &SegmentSpan,
        output: &Path,
    ) -> Result<(), SplitError> {
        let mut media = MediaFile::open(source)?;
        Transcoder::new(&mut media, &self.options)
            .range(
                Duration::from_secs(span.start),
                Duration::from_secs(span.end),
            )
            .run(output)
    }

    fn open_frames(&self, path: &Path) -> Result<FfmpegFrames, SplitError> {
        FfmpegFrames::open(path)
    }
}

/// Frame-accurate reader over one file, decoding to RGB.
///
/// Each read seeks to the nearest keyframe before the target and decodes
/// forward, so out-of-order reads are fine.
pub struct FfmpegFrames {
    media: MediaFile,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    stream_index: usize,
    time_base: Rational,
    origin: i64,
    frames_per_second: f64,
    frame_count: u64,
    width: u32,
    height: u32,
}

impl FfmpegFrames {
    /// Open `path` and prepare its best video stream for decoding.
    ///
    /// # Errors
    ///
    /// - [`SplitError::FileOpen`] if the file cannot be opened.
    /// - [`SplitError::NoVideoStream`] if it has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SplitError> {
        let media = MediaFile::open(path)?;
        let video = media.require_video()?;
        let stream = media
            .input_context
            .stream(video.stream_index)
            .ok_or_else(|| SplitError::NoVideoStream(media.file_path.clone()))?;
        let start_time = stream.start_time();
        let origin = if start_time == conversion::NO_TIMESTAMP {
            0
        } else {
            start_time
        };
        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;

        Ok(Self {
            decoder,
            scaler: None,
            stream_index: video.stream_index,
            time_base: video.time_base,
            origin,
            frames_per_second: video.frames_per_second,
            frame_count: video.frame_count,
            width: video.width,
            height: video.height,
            media,
        })
    }

    fn to_image(&mut self, decoded: &VideoFrame) -> Result<DynamicImage, SplitError> {
        if self.scaler.is_none() {
            let scaler = ScalingContext::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                Pixel::RGB24,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;
            self.scaler = Some(scaler);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(SplitError::VideoDecodeError("no pixel converter".to_string()));
        };

        let mut rgb_frame = VideoFrame::empty();
        scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;

        let buffer = conversion::frame_to_buffer(&rgb_frame, self.width, self.height, 3);
        RgbImage::from_raw(self.width, self.height, buffer)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| {
                SplitError::VideoDecodeError("decoded frame has an unexpected size".to_string())
            })
    }
}

/// Frame number of a decoded frame, from its presentation time.
fn frame_number_of(
    decoded: &VideoFrame,
    origin: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(origin);
    let seconds = conversion::pts_to_seconds(pts - origin, time_base);
    conversion::seconds_to_frame_number(seconds, frames_per_second)
}

impl FrameSource for FfmpegFrames {
    fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn decode_frame(&mut self, frame_number: u64) -> Result<DynamicImage, SplitError> {
        if self.frame_count > 0 && frame_number >= self.frame_count {
            return Err(SplitError::VideoDecodeError(format!(
                "frame {frame_number} is past the last frame ({} total)",
                self.frame_count
            )));
        }

        let target =
            conversion::frame_number_to_seek_timestamp(frame_number, self.frames_per_second);
        self.media
            .input_context
            .seek(target, ..target)
            .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;
        self.decoder.flush();

        let (origin, time_base, rate) = (self.origin, self.time_base, self.frames_per_second);
        let reached = |decoded: &VideoFrame| {
            frame_number_of(decoded, origin, time_base, rate) >= frame_number
        };
        let mut decoded = VideoFrame::empty();
        let mut found = false;
        for (stream, packet) in self.media.input_context.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if reached(&decoded) {
                    found = true;
                    break;
                }
            }
            if found {
                break;
            }
        }

        if !found {
            let _ = self.decoder.send_eof();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                if reached(&decoded) {
                    found = true;
                    break;
                }
            }
        }

        if found {
            self.to_image(&decoded)
        } else {
            Err(SplitError::VideoDecodeError(format!(
                "could not locate frame {frame_number} in {}",
                self.media.file_path.display()
            )))
        }
    }
}
