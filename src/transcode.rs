//! Re-encoding a time range of a source into its own container.
//!
//! [`Transcoder`] decodes the best video stream (and, unless disabled, the
//! best audio stream) of an opened [`MediaFile`], keeps the frames that fall
//! inside `[start, end)`, and encodes them into a new file whose format is
//! inferred from the output extension. Timestamps are rebased so every
//! output starts at zero.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use framesplit::{EncodeOptions, MediaFile, SplitError, Transcoder};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! Transcoder::new(&mut media, &EncodeOptions::default())
//!     .range(Duration::from_secs(5), Duration::from_secs(10))
//!     .run("input_segment_002.mp4")?;
//! # Ok::<(), SplitError>(())
//! ```

use std::{path::Path, time::Duration};

use ffmpeg_next::{
    ChannelLayout, Packet, Rational,
    codec::{self, Id, context::Context as CodecContext},
    decoder::{Audio as AudioDecoder, Video as VideoDecoder},
    encoder::{Audio as AudioEncoder, Video as VideoEncoder},
    format::{self, Pixel, Sample, context::Output},
    frame::{Audio as AudioFrame, Video as VideoFrame},
    software::{
        resampling::Context as ResamplingContext,
        scaling::{Context as ScalingContext, Flags as ScalingFlags},
    },
};

use crate::{conversion, encode::EncodeOptions, error::SplitError, media::MediaFile};

/// Builder for a single range re-encode.
///
/// Obtained via [`Transcoder::new`]. Without a call to
/// [`range`](Transcoder::range) the whole source is re-encoded.
pub struct Transcoder<'a> {
    media: &'a mut MediaFile,
    options: &'a EncodeOptions,
    start: Duration,
    end: Option<Duration>,
}

impl<'a> Transcoder<'a> {
    /// Create a transcoder reading from `media` with the given settings.
    pub fn new(media: &'a mut MediaFile, options: &'a EncodeOptions) -> Self {
        Self {
            media,
            options,
            start: Duration::ZERO,
            end: None,
        }
    }

    /// Restrict the output to `[start, end)` of the source.
    #[must_use]
    pub fn range(mut self, start: Duration, end: Duration) -> Self {
        self.start = start;
        self.end = Some(end);
        self
    }

    /// Encode the selected range to `path`.
    ///
    /// # Errors
    ///
    /// - [`SplitError::NoVideoStream`] if the source has no video.
    /// - [`SplitError::UnknownDuration`] if no range was given and the source
    ///   length is unknown.
    /// - [`SplitError::VideoDecodeError`] / [`SplitError::AudioDecodeError`]
    ///   if the source cannot be decoded.
    /// - [`SplitError::VideoEncodeError`] / [`SplitError::AudioEncodeError`]
    ///   if the output cannot be created or written.
    pub fn run<P: AsRef<Path>>(self, path: P) -> Result<(), SplitError> {
        let path = path.as_ref();
        let video_metadata = self.media.require_video()?;
        let start_seconds = self.start.as_secs_f64();
        let end_seconds = self
            .end
            .or(self.media.metadata.duration)
            .ok_or_else(|| SplitError::UnknownDuration(self.media.file_path.clone()))?
            .as_secs_f64();

        if end_seconds <= start_seconds {
            return Err(SplitError::VideoEncodeError(format!(
                "empty range [{start_seconds}s, {end_seconds}s) for {}",
                path.display()
            )));
        }

        log::debug!(
            "Transcoding {} [{start_seconds}s, {end_seconds}s) to {}",
            self.media.file_path.display(),
            path.display(),
        );

        let mut output = format::output(&path).map_err(|error| {
            SplitError::VideoEncodeError(format!("cannot create {}: {error}", path.display()))
        })?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let window = (start_seconds, end_seconds);
        let mut video = VideoLane::open(
            self.media,
            video_metadata.stream_index,
            &mut output,
            self.options,
            global_header,
            window,
        )?;

        let audio_index = self
            .media
            .metadata
            .audio
            .as_ref()
            .filter(|_| self.options.include_audio)
            .map(|audio| audio.stream_index);
        let mut audio = match audio_index {
            Some(index) => Some(AudioLane::open(
                self.media,
                index,
                &mut output,
                self.options,
                global_header,
                window,
            )?),
            None => None,
        };

        output
            .write_header()
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
        video.bind_output(&output)?;
        if let Some(audio) = audio.as_mut() {
            audio.bind_output(&output)?;
        }

        if start_seconds > 0.0 {
            let target = conversion::seconds_to_seek_timestamp(start_seconds);
            self.media
                .input_context
                .seek(target, ..target)
                .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;
        }

        for (stream, packet) in self.media.input_context.packets() {
            let audio_done = audio.as_ref().is_none_or(|audio| audio.done);
            if video.done && audio_done {
                break;
            }

            let index = stream.index();
            if index == video.input_index && !video.done {
                video.push_packet(&packet, &mut output)?;
            } else if let Some(audio) = audio.as_mut()
                && index == audio.input_index
                && !audio.done
            {
                audio.push_packet(&packet, &mut output)?;
            }
        }

        video.finish(&mut output)?;
        if let Some(audio) = audio.as_mut() {
            audio.finish(&mut output)?;
        }

        output
            .write_trailer()
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;

        log::debug!(
            "Wrote {} video frame(s) and {} audio sample(s) to {}",
            video.frames_written,
            audio.as_ref().map_or(0, |audio| audio.queue.next_pts),
            path.display(),
        );

        Ok(())
    }
}

/// Stream start offset in its own time base; zero when unknown.
fn stream_origin(start_time: i64) -> i64 {
    if start_time == conversion::NO_TIMESTAMP {
        0
    } else {
        start_time
    }
}

/// Time base for the video encoder: one tick per frame when the rate is
/// known, otherwise the source stream's own time base.
fn video_encoder_time_base(frame_rate: Rational, stream_time_base: Rational) -> Rational {
    if frame_rate.numerator() > 0 && frame_rate.denominator() > 0 {
        frame_rate.invert()
    } else {
        stream_time_base
    }
}

/// Decode and re-encode state for the video stream.
struct VideoLane {
    input_index: usize,
    input_time_base: Rational,
    origin: i64,
    window: (f64, f64),
    decoder: VideoDecoder,
    encoder: VideoEncoder,
    encoder_time_base: Rational,
    width: u32,
    height: u32,
    output_index: usize,
    output_time_base: Rational,
    scaler: Option<ScalingContext>,
    last_pts: Option<i64>,
    frames_written: u64,
    done: bool,
}

impl VideoLane {
    fn open(
        media: &MediaFile,
        input_index: usize,
        output: &mut Output,
        options: &EncodeOptions,
        global_header: bool,
        window: (f64, f64),
    ) -> Result<Self, SplitError> {
        let stream = media
            .input_context
            .stream(input_index)
            .ok_or_else(|| SplitError::NoVideoStream(media.file_path.clone()))?;
        let input_time_base = stream.time_base();
        let origin = stream_origin(stream.start_time());
        let frame_rate = stream.avg_frame_rate();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;

        let codec_choice = options.video_codec;
        let video_codec = ffmpeg_next::encoder::find_by_name(codec_choice.encoder_name())
            .or_else(|| ffmpeg_next::encoder::find(codec_choice.to_codec_id()))
            .ok_or_else(|| {
                SplitError::VideoEncodeError(format!("no encoder available for {codec_choice:?}"))
            })?;

        let encoder_time_base = video_encoder_time_base(frame_rate, input_time_base);
        let (width, height) = (decoder.width(), decoder.height());
        let mut encoder_context = CodecContext::new()
            .encoder()
            .video()
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
        encoder_context.set_width(width);
        encoder_context.set_height(height);
        encoder_context.set_aspect_ratio(decoder.aspect_ratio());
        encoder_context.set_format(codec_choice.input_pixel_format());
        encoder_context.set_time_base(encoder_time_base);
        if frame_rate.numerator() > 0 {
            encoder_context.set_frame_rate(Some(frame_rate));
        }
        if global_header {
            encoder_context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_context
            .open_as_with(video_codec, options.video_dictionary())
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;

        let output_index = {
            let mut output_stream = output
                .add_stream(video_codec)
                .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
            output_stream.set_parameters(&encoder);
            output_stream.set_time_base(encoder_time_base);
            output_stream.index()
        };

        Ok(Self {
            input_index,
            input_time_base,
            origin,
            window,
            decoder,
            encoder,
            encoder_time_base,
            width,
            height,
            output_index,
            output_time_base: encoder_time_base,
            scaler: None,
            last_pts: None,
            frames_written: 0,
            done: false,
        })
    }

    /// The muxer may change the stream time base while writing the header.
    fn bind_output(&mut self, output: &Output) -> Result<(), SplitError> {
        self.output_time_base = output
            .stream(self.output_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| SplitError::VideoEncodeError("output stream vanished".to_string()))?;
        Ok(())
    }

    fn push_packet(&mut self, packet: &Packet, output: &mut Output) -> Result<(), SplitError> {
        self.decoder
            .send_packet(packet)
            .map_err(|error| SplitError::VideoDecodeError(error.to_string()))?;
        self.drain_decoder(output)
    }

    fn drain_decoder(&mut self, output: &mut Output) -> Result<(), SplitError> {
        let mut decoded = VideoFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let Some(pts) = decoded.timestamp().or(decoded.pts()) else {
                continue;
            };
            let seconds = conversion::pts_to_seconds(pts - self.origin, self.input_time_base);
            let (start, end) = self.window;
            if seconds < start {
                continue;
            }
            if seconds >= end {
                self.done = true;
                break;
            }
            self.encode_frame(&decoded, seconds - start, output)?;
        }
        Ok(())
    }

    fn encode_frame(
        &mut self,
        decoded: &VideoFrame,
        offset_seconds: f64,
        output: &mut Output,
    ) -> Result<(), SplitError> {
        if self.scaler.is_none() {
            let scaler = ScalingContext::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                Pixel::YUV420P,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
            self.scaler = Some(scaler);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(SplitError::VideoEncodeError("no pixel converter".to_string()));
        };

        let mut converted = VideoFrame::empty();
        scaler
            .run(decoded, &mut converted)
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;

        // Encoders reject non-increasing timestamps.
        let mut pts = (offset_seconds * self.encoder_time_base.denominator() as f64
            / self.encoder_time_base.numerator() as f64)
            .round() as i64;
        if let Some(last) = self.last_pts
            && pts <= last
        {
            pts = last + 1;
        }
        self.last_pts = Some(pts);
        converted.set_pts(Some(pts));

        self.encoder
            .send_frame(&converted)
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
        self.frames_written += 1;
        self.write_packets(output)
    }

    fn write_packets(&mut self, output: &mut Output) -> Result<(), SplitError> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.output_index);
            encoded.rescale_ts(self.encoder_time_base, self.output_time_base);
            encoded
                .write_interleaved(output)
                .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
        }
        Ok(())
    }

    fn finish(&mut self, output: &mut Output) -> Result<(), SplitError> {
        if !self.done {
            let _ = self.decoder.send_eof();
            self.drain_decoder(output)?;
        }
        self.encoder
            .send_eof()
            .map_err(|error| SplitError::VideoEncodeError(error.to_string()))?;
        self.write_packets(output)
    }
}

/// Decode, resample, and AAC-encode state for the audio stream.
struct AudioLane {
    input_index: usize,
    input_time_base: Rational,
    origin: i64,
    window: (f64, f64),
    decoder: AudioDecoder,
    resampler: ResamplingContext,
    encoder: AudioEncoder,
    encoder_time_base: Rational,
    output_index: usize,
    output_time_base: Rational,
    queue: SampleQueue,
    done: bool,
}

impl AudioLane {
    fn open(
        media: &MediaFile,
        input_index: usize,
        output: &mut Output,
        options: &EncodeOptions,
        global_header: bool,
        window: (f64, f64),
    ) -> Result<Self, SplitError> {
        let stream = media
            .input_context
            .stream(input_index)
            .ok_or_else(|| SplitError::AudioDecodeError("audio stream vanished".to_string()))?;
        let input_time_base = stream.time_base();
        let origin = stream_origin(stream.start_time());

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().audio())
            .map_err(|error| SplitError::AudioDecodeError(error.to_string()))?;

        let audio_codec = ffmpeg_next::encoder::find(Id::AAC)
            .ok_or_else(|| SplitError::AudioEncodeError("no AAC encoder available".to_string()))?;
        let sample_format = audio_codec
            .audio()
            .ok()
            .and_then(|audio| audio.formats())
            .and_then(|mut formats| formats.next())
            .unwrap_or(Sample::F32(format::sample::Type::Planar));

        let sample_rate = decoder.rate();
        let channel_layout: ChannelLayout = decoder.channel_layout();
        let encoder_time_base = Rational(1, sample_rate as i32);

        let mut encoder_context = CodecContext::new()
            .encoder()
            .audio()
            .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;
        encoder_context.set_rate(sample_rate as i32);
        encoder_context.set_channel_layout(channel_layout);
        encoder_context.set_format(sample_format);
        encoder_context.set_time_base(encoder_time_base);
        encoder_context.set_bit_rate(options.audio_bitrate);
        if global_header {
            encoder_context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_context
            .open_as(audio_codec)
            .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;

        let output_index = {
            let mut output_stream = output
                .add_stream(audio_codec)
                .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;
            output_stream.set_parameters(&encoder);
            output_stream.set_time_base(encoder_time_base);
            output_stream.index()
        };

        let resampler = ResamplingContext::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            sample_format,
            channel_layout,
            sample_rate,
        )
        .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;

        let queue = SampleQueue::new(
            sample_format,
            channel_layout,
            sample_rate,
            encoder.frame_size() as usize,
        );

        Ok(Self {
            input_index,
            input_time_base,
            origin,
            window,
            decoder,
            resampler,
            encoder,
            encoder_time_base,
            output_index,
            output_time_base: encoder_time_base,
            queue,
            done: false,
        })
    }

    fn bind_output(&mut self, output: &Output) -> Result<(), SplitError> {
        self.output_time_base = output
            .stream(self.output_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| SplitError::AudioEncodeError("output stream vanished".to_string()))?;
        Ok(())
    }

    fn push_packet(&mut self, packet: &Packet, output: &mut Output) -> Result<(), SplitError> {
        self.decoder
            .send_packet(packet)
            .map_err(|error| SplitError::AudioDecodeError(error.to_string()))?;
        self.drain_decoder(output)
    }

    fn drain_decoder(&mut self, output: &mut Output) -> Result<(), SplitError> {
        let mut decoded = AudioFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let Some(pts) = decoded.timestamp().or(decoded.pts()) else {
                continue;
            };
            let seconds = conversion::pts_to_seconds(pts - self.origin, self.input_time_base);
            let (start, end) = self.window;
            if seconds < start {
                continue;
            }
            if seconds >= end {
                self.done = true;
                break;
            }

            let mut resampled = AudioFrame::empty();
            self.resampler
                .run(&decoded, &mut resampled)
                .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;
            self.queue.push(&resampled);

            while let Some(frame) = self.queue.pop(false) {
                self.encode_frame(&frame, output)?;
            }
        }
        Ok(())
    }

    fn encode_frame(&mut self, frame: &AudioFrame, output: &mut Output) -> Result<(), SplitError> {
        self.encoder
            .send_frame(frame)
            .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;
        self.write_packets(output)
    }

    fn write_packets(&mut self, output: &mut Output) -> Result<(), SplitError> {
        let mut encoded = Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.output_index);
            encoded.rescale_ts(self.encoder_time_base, self.output_time_base);
            encoded
                .write_interleaved(output)
                .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;
        }
        Ok(())
    }

    fn finish(&mut self, output: &mut Output) -> Result<(), SplitError> {
        if !self.done {
            let _ = self.decoder.send_eof();
            self.drain_decoder(output)?;
        }
        while let Some(frame) = self.queue.pop(true) {
            self.encode_frame(&frame, output)?;
        }
        self.encoder
            .send_eof()
            .map_err(|error| SplitError::AudioEncodeError(error.to_string()))?;
        self.write_packets(output)
    }
}

/// Re-chunks resampled audio into the fixed frame size AAC requires.
///
/// Output timestamps count samples from zero, in a `1/rate` time base.
struct SampleQueue {
    format: Sample,
    layout: ChannelLayout,
    rate: u32,
    frame_size: usize,
    planes: Vec<Vec<u8>>,
    bytes_per_sample: usize,
    next_pts: i64,
}

impl SampleQueue {
    fn new(format: Sample, layout: ChannelLayout, rate: u32, frame_size: usize) -> Self {
        Self {
            format,
            layout,
            rate,
            frame_size,
            planes: Vec::new(),
            bytes_per_sample: 0,
            next_pts: 0,
        }
    }

    fn push(&mut self, frame: &AudioFrame) {
        let samples = frame.samples();
        if samples == 0 {
            return;
        }
        if self.planes.is_empty() {
            self.planes = vec![Vec::new(); frame.planes()];
            self.bytes_per_sample = if self.format.is_planar() {
                self.format.bytes()
            } else {
                self.format.bytes() * frame.channels() as usize
            };
        }
        let length = samples * self.bytes_per_sample;
        for (plane, buffer) in self.planes.iter_mut().enumerate() {
            buffer.extend_from_slice(&frame.data(plane)[..length]);
        }
    }

    /// Next full frame, or with `drain` whatever is left.
    fn pop(&mut self, drain: bool) -> Option<AudioFrame> {
        if self.bytes_per_sample == 0 {
            return None;
        }
        let available = self.planes.first().map_or(0, Vec::len) / self.bytes_per_sample;
        if available == 0 || (!drain && self.frame_size > 0 && available < self.frame_size) {
            return None;
        }
        let samples = if self.frame_size == 0 {
            available
        } else {
            available.min(self.frame_size)
        };

        let mut frame = AudioFrame::new(self.format, samples, self.layout);
        frame.set_rate(self.rate);
        let length = samples * self.bytes_per_sample;
        for (plane, buffer) in self.planes.iter_mut().enumerate() {
            frame.data_mut(plane)[..length].copy_from_slice(&buffer[..length]);
            buffer.drain(..length);
        }
        frame.set_pts(Some(self.next_pts));
        self.next_pts += samples as i64;
        Some(frame)
    }
}
