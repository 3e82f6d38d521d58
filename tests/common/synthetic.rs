//! Writes small real videos with FFmpeg so the codec paths can be tested
//! without checked-in fixtures.

use std::path::Path;

use ffmpeg_next::{
    ChannelLayout, Error as FfmpegError, Packet, Rational,
    codec::{self, Id, context::Context as CodecContext},
    encoder::{Audio as AudioEncoder, Video as VideoEncoder},
    format::{self, Pixel, Sample, context::Output},
    frame::{Audio as AudioFrame, Video as VideoFrame},
};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;
pub const FRAME_RATE: i32 = 10;
pub const SAMPLE_RATE: i32 = 44_100;

/// Write `seconds` of MPEG-4 video at [`FRAME_RATE`] to `path`, with a mono
/// AAC sine tone when `with_audio` is set. Each frame has its own brightness.
pub fn write_video(path: &Path, seconds: u32, with_audio: bool) -> Result<(), FfmpegError> {
    ffmpeg_next::init()?;
    let mut output = format::output(&path)?;
    let global_header = output
        .format()
        .flags()
        .contains(format::Flags::GLOBAL_HEADER);

    let video_time_base = Rational(1, FRAME_RATE);
    let (mut video, video_index) = open_video(&mut output, global_header)?;
    let mut audio = if with_audio {
        Some(open_audio(&mut output, global_header)?)
    } else {
        None
    };

    output.write_header()?;
    let video_stream_base = stream_time_base(&output, video_index)?;

    let mut audio_pts: i64 = 0;
    for index in 0..(seconds as i64 * FRAME_RATE as i64) {
        let mut frame = VideoFrame::new(Pixel::YUV420P, WIDTH, HEIGHT);
        frame.data_mut(0).fill((16 + index * 3 % 220) as u8);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        frame.set_pts(Some(index));
        video.send_frame(&frame)?;
        drain(&mut video, &mut output, video_index, video_time_base, video_stream_base)?;

        // Keep audio level with the video written so far.
        if let Some((encoder, audio_index)) = audio.as_mut() {
            let until = (index + 1) * SAMPLE_RATE as i64 / FRAME_RATE as i64;
            let frame_size = encoder.frame_size().max(1) as i64;
            let audio_stream_base = stream_time_base(&output, *audio_index)?;
            while audio_pts < until {
                let tone = sine_frame(audio_pts, frame_size as usize);
                encoder.send_frame(&tone)?;
                audio_pts += frame_size;
                drain_audio(encoder, &mut output, *audio_index, audio_stream_base)?;
            }
        }
    }

    video.send_eof()?;
    drain(&mut video, &mut output, video_index, video_time_base, video_stream_base)?;
    if let Some((encoder, audio_index)) = audio.as_mut() {
        encoder.send_eof()?;
        let audio_stream_base = stream_time_base(&output, *audio_index)?;
        drain_audio(encoder, &mut output, *audio_index, audio_stream_base)?;
    }

    output.write_trailer()
}

fn open_video(
    output: &mut Output,
    global_header: bool,
) -> Result<(VideoEncoder, usize), FfmpegError> {
    let mpeg4 = ffmpeg_next::encoder::find(Id::MPEG4).ok_or(FfmpegError::EncoderNotFound)?;
    let mut context = CodecContext::new().encoder().video()?;
    context.set_width(WIDTH);
    context.set_height(HEIGHT);
    context.set_format(Pixel::YUV420P);
    context.set_time_base(Rational(1, FRAME_RATE));
    context.set_frame_rate(Some(Rational(FRAME_RATE, 1)));
    context.set_gop(FRAME_RATE as u32);
    context.set_max_b_frames(0);
    if global_header {
        context.set_flags(codec::Flags::GLOBAL_HEADER);
    }
    let encoder = context.open_as(mpeg4)?;

    let mut stream = output.add_stream(mpeg4)?;
    stream.set_parameters(&encoder);
    stream.set_time_base(Rational(1, FRAME_RATE));
    Ok((encoder, stream.index()))
}

fn open_audio(
    output: &mut Output,
    global_header: bool,
) -> Result<(AudioEncoder, usize), FfmpegError> {
    let aac = ffmpeg_next::encoder::find(Id::AAC).ok_or(FfmpegError::EncoderNotFound)?;
    let mut context = CodecContext::new().encoder().audio()?;
    context.set_rate(SAMPLE_RATE);
    context.set_channel_layout(ChannelLayout::MONO);
    context.set_format(Sample::F32(format::sample::Type::Planar));
    context.set_time_base(Rational(1, SAMPLE_RATE));
    context.set_bit_rate(64_000);
    if global_header {
        context.set_flags(codec::Flags::GLOBAL_HEADER);
    }
    let encoder = context.open_as(aac)?;

    let mut stream = output.add_stream(aac)?;
    stream.set_parameters(&encoder);
    stream.set_time_base(Rational(1, SAMPLE_RATE));
    Ok((encoder, stream.index()))
}

fn stream_time_base(output: &Output, index: usize) -> Result<Rational, FfmpegError> {
    output
        .stream(index)
        .map(|stream| stream.time_base())
        .ok_or(FfmpegError::StreamNotFound)
}

/// 440 Hz tone starting at sample `first`.
fn sine_frame(first: i64, samples: usize) -> AudioFrame {
    let mut frame = AudioFrame::new(
        Sample::F32(format::sample::Type::Planar),
        samples,
        ChannelLayout::MONO,
    );
    frame.set_rate(SAMPLE_RATE as u32);
    frame.set_pts(Some(first));
    let plane = frame.data_mut(0);
    for offset in 0..samples {
        let t = (first + offset as i64) as f32 / SAMPLE_RATE as f32;
        let value = (t * 440.0 * std::f32::consts::TAU).sin() * 0.25;
        plane[offset * 4..offset * 4 + 4].copy_from_slice(&value.to_ne_bytes());
    }
    frame
}

fn drain(
    encoder: &mut VideoEncoder,
    output: &mut Output,
    index: usize,
    from: Rational,
    to: Rational,
) -> Result<(), FfmpegError> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(from, to);
        packet.write_interleaved(output)?;
    }
    Ok(())
}

fn drain_audio(
    encoder: &mut AudioEncoder,
    output: &mut Output,
    index: usize,
    to: Rational,
) -> Result<(), FfmpegError> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(index);
        packet.rescale_ts(Rational(1, SAMPLE_RATE), to);
        packet.write_interleaved(output)?;
    }
    Ok(())
}
