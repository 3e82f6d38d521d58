//! Fixed encoding settings for re-encoded segments.
//!
//! Segments are always re-encoded (never stream-copied) so every segment
//! starts on a decodable frame exactly at its start offset. The settings are
//! chosen once per run and are not exposed per call.

use ffmpeg_next::{Dictionary, codec::Id, format::Pixel};

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC. This is the default.
    #[default]
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2, available in every FFmpeg build.
    Mpeg4,
}

impl VideoCodec {
    pub(crate) fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }

    /// Preferred encoder implementation, tried before the generic codec id.
    pub(crate) fn encoder_name(self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Mpeg4 => "mpeg4",
        }
    }

    pub(crate) fn input_pixel_format(self) -> Pixel {
        Pixel::YUV420P
    }
}

/// Encoder settings used for every segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Output video codec (default: H.264).
    pub video_codec: VideoCodec,
    /// Constant Rate Factor (default: 23). Ignored by encoders without CRF support.
    pub crf: Option<u32>,
    /// Encoder speed preset (default: `medium`).
    pub preset: Option<String>,
    /// AAC bitrate in bits per second (default: 128 kb/s).
    pub audio_bitrate: usize,
    /// Whether to carry the source's audio track into the segments.
    pub include_audio: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            video_codec: VideoCodec::H264,
            crf: Some(23),
            preset: Some("medium".to_string()),
            audio_bitrate: 128_000,
            include_audio: true,
        }
    }
}

impl EncodeOptions {
    /// Set the video codec.
    #[must_use]
    pub fn video_codec(mut self, codec: VideoCodec) -> Self {
        self.video_codec = codec;
        self
    }

    /// Set the CRF quality value.
    #[must_use]
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Set the AAC bitrate in bits per second.
    #[must_use]
    pub fn audio_bitrate(mut self, bitrate: usize) -> Self {
        self.audio_bitrate = bitrate;
        self
    }

    /// Drop audio from the segments.
    #[must_use]
    pub fn without_audio(mut self) -> Self {
        self.include_audio = false;
        self
    }

    /// Private encoder options (`crf`, `preset`) for the video encoder.
    ///
    /// MPEG-4 Part 2 has neither option, so nothing is passed for it.
    pub(crate) fn video_dictionary(&self) -> Dictionary<'static> {
        let mut dictionary = Dictionary::new();
        if self.video_codec == VideoCodec::Mpeg4 {
            return dictionary;
        }
        if let Some(crf) = self.crf {
            dictionary.set("crf", &crf.to_string());
        }
        if let Some(preset) = &self.preset {
            dictionary.set("preset", preset);
        }
        dictionary
    }
}
