//! Opening media files with FFmpeg.
//!
//! [`MediaFile`] wraps the demuxer context together with metadata read at
//! open time. Both the segment transcoder and the FFmpeg frame source start
//! from one.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational, Stream, codec::context::Context as CodecContext, format::context::Input,
    media::Type,
};

use crate::{
    conversion,
    error::SplitError,
    metadata::{AudioMetadata, MediaMetadata, VideoMetadata, resolve_duration},
};

/// An opened media file and its cached metadata.
pub struct MediaFile {
    pub(crate) input_context: Input,
    pub(crate) metadata: MediaMetadata,
    pub(crate) file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a media file and read its metadata.
    ///
    /// Initialises FFmpeg (idempotent), opens the container, and inspects the
    /// best video and audio streams.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::FileOpen`] if the file cannot be opened or its
    /// streams cannot be inspected.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SplitError> {
        let file_path = path.as_ref().to_path_buf();
        let open_error = |reason: String| SplitError::FileOpen {
            path: file_path.clone(),
            reason,
        };

        log::debug!("Opening media file: {}", file_path.display());

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input_context =
            ffmpeg_next::format::input(&file_path).map_err(|error| open_error(error.to_string()))?;

        let (stream_ticks, stream_time_base) = input_context
            .streams()
            .best(Type::Video)
            .map_or((-1, Rational(0, 1)), |stream| (stream.duration(), stream.time_base()));
        let duration = resolve_duration(input_context.duration(), stream_ticks, stream_time_base);

        let video = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| read_video(&stream, duration))
            .transpose()
            .map_err(&open_error)?;
        let audio = input_context
            .streams()
            .best(Type::Audio)
            .map(|stream| read_audio(&stream))
            .transpose()
            .map_err(&open_error)?;

        let metadata = MediaMetadata {
            video,
            audio,
            duration,
            format: input_context.format().name().to_string(),
        };
        log_metadata(&file_path, &metadata);

        Ok(Self {
            input_context,
            metadata,
            file_path,
        })
    }

    /// Cached metadata.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Video stream metadata, or [`SplitError::NoVideoStream`].
    pub(crate) fn require_video(&self) -> Result<VideoMetadata, SplitError> {
        self.metadata
            .video
            .clone()
            .ok_or_else(|| SplitError::NoVideoStream(self.file_path.clone()))
    }
}

fn codec_name(codec: Option<ffmpeg_next::Codec>) -> String {
    codec.map_or_else(|| "unknown".to_string(), |codec| codec.name().to_string())
}

fn read_video(stream: &Stream, duration: Option<Duration>) -> Result<VideoMetadata, String> {
    let index = stream.index();
    let decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|error| format!("Failed to create video decoder for stream {index}: {error}"))?;

    let frames_per_second = match conversion::rational_to_fps(stream.avg_frame_rate()) {
        rate if rate > 0.0 => rate,
        _ => conversion::rational_to_fps(stream.rate()),
    };
    // Some containers (Matroska, raw streams) do not store a frame count.
    let frame_count = match u64::try_from(stream.frames()) {
        Ok(count) if count > 0 => count,
        _ if frames_per_second > 0.0 => duration
            .map_or(0, |duration| (duration.as_secs_f64() * frames_per_second) as u64),
        _ => 0,
    };

    Ok(VideoMetadata {
        width: decoder.width(),
        height: decoder.height(),
        frames_per_second,
        frame_count,
        codec: codec_name(decoder.codec()),
        stream_index: index,
        time_base: stream.time_base(),
    })
}

fn read_audio(stream: &Stream) -> Result<AudioMetadata, String> {
    let index = stream.index();
    let decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().audio())
        .map_err(|error| format!("Failed to create audio decoder for stream {index}: {error}"))?;

    Ok(AudioMetadata {
        sample_rate: decoder.rate(),
        channels: decoder.channels(),
        codec: codec_name(decoder.codec()),
        stream_index: index,
    })
}

fn log_metadata(path: &Path, metadata: &MediaMetadata) {
    match metadata.duration {
        Some(duration) => log::info!(
            "Opened {} ({}, {:.2}s)",
            path.display(),
            metadata.format,
            duration.as_secs_f64(),
        ),
        None => log::info!(
            "Opened {} ({}, unknown duration)",
            path.display(),
            metadata.format,
        ),
    }
    if let Some(video) = &metadata.video {
        log::debug!(
            "  video #{}: {} {}x{} @ {:.3} fps, {} frames",
            video.stream_index,
            video.codec,
            video.width,
            video.height,
            video.frames_per_second,
            video.frame_count,
        );
    }
    if let Some(audio) = &metadata.audio {
        log::debug!(
            "  audio #{}: {} {} Hz x{}",
            audio.stream_index,
            audio.codec,
            audio.sample_rate,
            audio.channels,
        );
    }
}
