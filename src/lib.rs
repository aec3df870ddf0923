//! dcpwriter assembles multi-reel digital cinema packages from independently encoded frames.
//!
//! Picture units arrive from many encoder threads in any order and are sequenced into one
//! picture asset per reel. A recovery index beside each asset lets an interrupted run resume
//! without re-encoding intact frames. Sound, text and immersive audio are routed to the reel
//! covering their timeline position.
//!
//! - Describe the package with a [`PackageSpec`]
//! - Create a [`Writer`], [`start`](Writer::start) it, and feed it from any number of threads
//! - [`finish`](Writer::finish) it to get a [`CompositionPlaylist`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod audio;
pub(crate) mod package;
pub(crate) mod recovery;
pub(crate) mod reel;
pub(crate) mod writer;

pub use crate::foundation::core::{Eyes, Fps, Frame, MAX_DCP_AUDIO_CHANNELS};
pub use crate::foundation::digest::{
    ContentDigest, DIGEST_LEN, Digester, Fingerprint, digest_file, digest_hex,
};
pub use crate::foundation::error::{DcpError, DcpResult};
pub use crate::foundation::time::{ContentTime, DcpTime, HZ, TimePeriod};

pub use crate::audio::buffers::{AudioBuffers, db_to_linear};
pub use crate::audio::content::{
    AudioContent, AudioContentState, AudioProperty, ChangePhase, ContentChange, ContentObserver,
    VideoFades,
};
pub use crate::audio::fade::{FadeEnvelope, fade_in_curve, fade_out_curve};
pub use crate::audio::mapping::{AudioMapping, CENTRE_CHANNEL};
pub use crate::audio::stream::AudioStream;

pub use crate::package::job::Job;
pub use crate::package::opts::WriterOpts;
pub use crate::package::spec::PackageSpec;

pub use crate::recovery::check::{existing_frame_ok, first_nonexistent_frame, last_recorded_frame};
pub use crate::recovery::frame_info::FrameInfo;
pub use crate::recovery::handle::{InfoFileHandle, InfoFiles};

pub use crate::reel::atmos::AtmosMetadata;
pub use crate::reel::manifest::{
    AssetKind, CompositionPlaylist, ManifestAsset, ReelManifest, ReferencedReelAsset, WriteCounts,
};
pub use crate::reel::picture::PictureAssetReader;
pub use crate::reel::text::{FontData, HangingText, PlayerText, TextType};
pub use crate::reel::writer::ReelWriter;

pub use crate::writer::engine::{Writer, WriterState, WriterStats};
