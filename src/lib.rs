//! # framesplit
//!
//! Cut videos into fixed-length segments and sample one frame per second
//! from each segment, processing every source video at most once.
//!
//! Media work goes through FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; frames are
//! written as PNG with [`image`]. Which sources are done is tracked in an
//! append-only [`Ledger`] keyed by a name-and-size [`Fingerprint`].
//!
//! ## Quick Start
//!
//! ### One pass over a directory
//!
//! ```no_run
//! use framesplit::{BatchDriver, FfmpegBackend, FileBackend, Ledger, SplitConfig};
//!
//! let config = SplitConfig::new().with_segment_duration(5);
//! let backend = FfmpegBackend::new(config.encode_options().clone());
//! let mut ledger = Ledger::new(FileBackend::new(config.ledger_path()));
//!
//! let report = BatchDriver::new(config, backend).run_once(&mut ledger)?;
//! println!("{} processed, {} skipped", report.processed(), report.skipped());
//! # Ok::<(), framesplit::SplitError>(())
//! ```
//!
//! ### Watch a directory
//!
//! ```no_run
//! use framesplit::{
//!     BatchDriver, CancellationToken, FfmpegBackend, FileBackend, Ledger, SplitConfig, watch,
//! };
//!
//! let config = SplitConfig::new();
//! let interval = config.watch_interval();
//! let backend = FfmpegBackend::new(config.encode_options().clone());
//! let mut ledger = Ledger::new(FileBackend::new(config.ledger_path()));
//! let driver = BatchDriver::new(config, backend);
//!
//! let token = CancellationToken::new();
//! watch(&driver, &mut ledger, interval, &token, |cycle, _| {
//!     println!("cycle {cycle} done");
//! })?;
//! # Ok::<(), framesplit::SplitError>(())
//! ```
//!
//! ### Plan without touching files
//!
//! ```
//! use framesplit::{plan_segments, sample_offsets};
//!
//! let spans = plan_segments(12, 5);
//! assert_eq!(spans.len(), 3);
//! assert_eq!((spans[2].start, spans[2].end), (10, 12));
//!
//! // A 4.7 second segment at 10 fps yields samples for seconds 0..=4.
//! assert_eq!(sample_offsets(10.0, 47).len(), 5);
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod backend;
pub mod batch;
pub mod config;
mod conversion;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod fingerprint;
pub mod ledger;
pub mod media;
pub mod metadata;
pub mod progress;
pub mod sampler;
pub mod segment;
pub mod transcode;
pub mod watch;

pub use backend::{FfmpegBackend, FfmpegFrames, FrameSource, MediaBackend};
pub use batch::{BatchDriver, BatchReport, VideoOutcome, VideoReport, discover_videos};
pub use config::SplitConfig;
pub use encode::{EncodeOptions, VideoCodec};
pub use error::{FailureKind, SplitError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use fingerprint::Fingerprint;
pub use ledger::{FileBackend, Ledger, LedgerBackend, MemoryBackend};
pub use media::MediaFile;
pub use metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{FrameSampler, SampleOffset, frame_file_name, sample_offsets};
pub use segment::{Segment, SegmentSpan, Segmenter, plan_segments};
pub use transcode::Transcoder;
pub use watch::watch;
