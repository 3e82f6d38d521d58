//! Internal timestamp and pixel-buffer helpers.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Sentinel FFmpeg uses for "no timestamp".
pub(crate) const NO_TIMESTAMP: i64 = ffmpeg_sys_next::AV_NOPTS_VALUE;

/// Plane 0 of `video_frame` with row padding removed, ready for
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    pack_rows(
        video_frame.data(0),
        video_frame.stride(0),
        width as usize * bytes_per_pixel,
        height as usize,
    )
}

/// Keep the first `row_len` bytes of each `stride`-long row.
fn pack_rows(data: &[u8], stride: usize, row_len: usize, rows: usize) -> Vec<u8> {
    if stride == row_len {
        return data[..row_len * rows].to_vec();
    }
    data.chunks(stride)
        .take(rows)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect()
}

/// Rescale a PTS value from a stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Seconds to a container-level seek target in AV_TIME_BASE (microseconds).
///
/// `Input::seek` with no stream selected expects AV_TIME_BASE units.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds * 1_000_000.0) as i64
}

/// Frame number to a container-level seek target in AV_TIME_BASE.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    seconds_to_seek_timestamp(frame_number as f64 / frames_per_second)
}

/// Nearest frame number for a presentation time in seconds.
pub(crate) fn seconds_to_frame_number(seconds: f64, frames_per_second: f64) -> u64 {
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Frames per second from a rational rate, or 0.0 if undefined.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}
