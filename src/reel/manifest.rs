use std::path::PathBuf;

use crate::foundation::core::Frame;
use crate::foundation::time::TimePeriod;

/// Kind of asset a reel can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Picture track.
    Picture,
    /// Sound track.
    Sound,
    /// Open subtitles.
    Subtitle,
    /// Closed captions.
    ClosedCaption,
    /// Immersive audio.
    Atmos,
}

/// One asset as listed in a reel of the composition playlist.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ManifestAsset {
    /// What the asset carries.
    pub kind: AssetKind,
    /// Asset identity.
    pub id: uuid::Uuid,
    /// File holding the asset.
    pub path: PathBuf,
    /// Length in picture frames.
    pub duration: Frame,
    /// Lower-case hex SHA-256 of the file, once calculated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Closed-caption track name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    /// `true` when the asset comes from an existing package rather than this build.
    #[serde(default)]
    pub referenced: bool,
}

/// An asset from an existing package, reused verbatim for a period of the timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferencedReelAsset {
    /// The asset, with `referenced` set.
    pub asset: ManifestAsset,
    /// Timeline period it covers.
    pub period: TimePeriod,
}

/// Assets of one reel, in the order a playlist lists them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReelManifest {
    /// Reel index.
    pub index: usize,
    /// Timeline period.
    pub period: TimePeriod,
    /// Picture asset.
    pub picture: Option<ManifestAsset>,
    /// Sound asset.
    pub sound: Option<ManifestAsset>,
    /// Subtitle asset.
    pub subtitle: Option<ManifestAsset>,
    /// Closed-caption assets, one per track.
    pub closed_captions: Vec<ManifestAsset>,
    /// Immersive audio asset.
    pub atmos: Option<ManifestAsset>,
    /// Font ids used by the text assets of this reel.
    pub fonts: Vec<String>,
}

/// Counts of how picture frames reached the package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WriteCounts {
    /// Freshly supplied frames.
    pub full: u64,
    /// Frames found intact on disk.
    pub fake: u64,
    /// Duplicated frames.
    pub repeat: u64,
    /// Frames that were spilled to disk while waiting their turn.
    pub pushed_to_disk: u64,
}

/// Composition playlist written as `CPL.json` into the output directory.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositionPlaylist {
    /// Playlist identity.
    pub id: uuid::Uuid,
    /// Package name.
    pub name: String,
    /// Picture edit rate as `num/den`.
    pub edit_rate: String,
    /// Stereoscopic picture.
    pub three_d: bool,
    /// Reels in timeline order.
    pub reels: Vec<ReelManifest>,
    /// How picture frames were produced.
    pub counts: WriteCounts,
}
