use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::buffers::AudioBuffers;
use crate::foundation::core::{Eyes, Frame};
use crate::foundation::digest::{digest_file, digest_hex};
use crate::foundation::error::{DcpError, DcpResult};
use crate::foundation::time::{DcpTime, TimePeriod};
use crate::package::job::Job;
use crate::package::spec::PackageSpec;
use crate::recovery::check::first_nonexistent_frame;
use crate::recovery::frame_info::FrameInfo;
use crate::recovery::handle::InfoFiles;
use crate::reel::atmos::{AtmosAssetWriter, AtmosMetadata};
use crate::reel::manifest::{AssetKind, ManifestAsset, ReelManifest, ReferencedReelAsset};
use crate::reel::picture::PictureAssetWriter;
use crate::reel::sound::SoundAssetWriter;
use crate::reel::text::{FontData, PlayerText, TextAssetWriter, TextType};

struct PictureTrack {
    writer: PictureAssetWriter,
    /// Bytes of the last FULL write per eye; cleared by a FAKE write.
    last: HashMap<Eyes, Arc<[u8]>>,
}

#[derive(Default)]
struct Finished {
    assets: Vec<ManifestAsset>,
    fonts: BTreeSet<String>,
}

/// Owns the asset files of one reel.
///
/// Each asset sits behind its own lock so the sequencing thread can write picture while the
/// controlling thread writes sound and text.
pub struct ReelWriter {
    index: usize,
    period: TimePeriod,
    spec: Arc<PackageSpec>,
    info_files: Arc<InfoFiles>,
    info_path: PathBuf,
    first_nonexistent_frame: Frame,
    picture: Mutex<PictureTrack>,
    sound: Mutex<SoundAssetWriter>,
    subtitle: Mutex<Option<TextAssetWriter>>,
    captions: Mutex<BTreeMap<String, TextAssetWriter>>,
    atmos: Mutex<Option<AtmosAssetWriter>>,
    finished: Mutex<Option<Finished>>,
}

impl std::fmt::Debug for ReelWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelWriter")
            .field("index", &self.index)
            .field("period", &self.period)
            .field("first_nonexistent_frame", &self.first_nonexistent_frame)
            .finish_non_exhaustive()
    }
}

fn move_file(from: &Path, to: &Path) -> DcpResult<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| DcpError::io(to, "copy asset into package", e))?;
    std::fs::remove_file(from).map_err(|e| DcpError::io(from, "remove scratch asset", e))
}

fn link_or_copy(from: &Path, to: &Path) -> DcpResult<()> {
    if to.exists() {
        std::fs::remove_file(to).map_err(|e| DcpError::io(to, "replace packaged asset", e))?;
    }
    if let Err(e) = std::fs::hard_link(from, to) {
        tracing::warn!(
            from = %from.display(),
            to = %to.display(),
            error = %e,
            "hard link failed; copying picture asset"
        );
        std::fs::copy(from, to).map_err(|e| DcpError::io(to, "copy picture asset", e))?;
    }
    Ok(())
}

impl ReelWriter {
    /// Prepare reel `index` covering `period`, resuming its picture asset where possible.
    pub fn new(
        spec: Arc<PackageSpec>,
        info_files: Arc<InfoFiles>,
        index: usize,
        period: TimePeriod,
        job: Option<&dyn Job>,
    ) -> DcpResult<Self> {
        let asset = spec.video_path(period);
        let info_path = spec.info_file(period);

        if let Some(job) = job {
            job.sub("Checking existing image data");
        }
        let first = first_nonexistent_frame(&info_files, &asset, &info_path, spec.three_d)?;

        let picture = PictureAssetWriter::start(
            &asset,
            spec.picture_asset_id(period),
            spec.three_d,
            first > 0,
        )?;
        let sound = SoundAssetWriter::start(
            &spec.scratch_dir().join(format!("reel{index}_pcm.wav")),
            spec.audio_channels,
            spec.audio_frame_rate,
        )?;

        tracing::debug!(index, first, asset = %asset.display(), "reel writer ready");
        Ok(Self {
            index,
            period,
            spec,
            info_files,
            info_path,
            first_nonexistent_frame: first,
            picture: Mutex::new(PictureTrack {
                writer: picture,
                last: HashMap::new(),
            }),
            sound: Mutex::new(sound),
            subtitle: Mutex::new(None),
            captions: Mutex::new(BTreeMap::new()),
            atmos: Mutex::new(None),
            finished: Mutex::new(None),
        })
    }

    /// Reel index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Timeline period.
    pub fn period(&self) -> TimePeriod {
        self.period
    }

    /// First timeline frame of the reel.
    pub fn start(&self) -> Frame {
        self.period.from.frames_round(self.spec.fps())
    }

    /// First reel-relative frame that was not found intact on disk.
    pub fn first_nonexistent_frame(&self) -> Frame {
        self.first_nonexistent_frame
    }

    /// Recovery index file of this reel.
    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Recorded size of reel-relative `(frame, eyes)`, if the index has it.
    pub fn recorded_frame(&self, frame: Frame, eyes: Eyes) -> DcpResult<Option<FrameInfo>> {
        let mut h = match self.info_files.open(&self.info_path, true) {
            Ok(h) => h,
            Err(DcpError::Io { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        FrameInfo::read(&mut h, frame, eyes)
    }

    fn record(&self, info: &FrameInfo, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        let mut h = self.info_files.open(&self.info_path, false)?;
        info.write(&mut h, frame, eyes)
    }

    /// Append newly encoded picture data for reel-relative `(frame, eyes)`.
    pub fn write(&self, data: Arc<[u8]>, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        let mut pic = self.picture.lock();
        let info = pic.writer.write(&data)?;
        pic.last.insert(eyes, data);
        self.record(&info, frame, eyes)
    }

    /// Skip over `size` bytes already correct on disk.
    pub fn fake_write(&self, size: u64, eyes: Eyes) -> DcpResult<()> {
        let mut pic = self.picture.lock();
        pic.writer.fake_write(size)?;
        pic.last.remove(&eyes);
        Ok(())
    }

    /// Write the bytes of the previous frame again as reel-relative `(frame, eyes)`.
    pub fn repeat_write(&self, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        let mut pic = self.picture.lock();
        let cached = pic.last.get(&eyes).cloned();
        let data = match cached {
            Some(d) => d,
            None => {
                let prev = self.recorded_frame(frame - 1, eyes)?.ok_or_else(|| {
                    DcpError::contract(format!(
                        "reel {} cannot repeat frame {frame} ({eyes}): nothing recorded before it",
                        self.index
                    ))
                })?;
                Arc::from(pic.writer.read_at(prev.offset, prev.size)?)
            }
        };
        let info = pic.writer.write(&data)?;
        pic.last.insert(eyes, data);
        self.record(&info, frame, eyes)
    }

    /// Append sound.
    pub fn write_audio(&self, audio: &AudioBuffers) -> DcpResult<()> {
        self.sound.lock().write(audio)
    }

    /// Add a text cue to the subtitle track or to a caption track.
    pub fn write_text(
        &self,
        text: PlayerText,
        kind: TextType,
        track: Option<&str>,
        period: TimePeriod,
    ) -> DcpResult<()> {
        let fps = self.spec.fps();
        match kind {
            TextType::OpenSubtitle => self
                .subtitle
                .lock()
                .get_or_insert_with(|| TextAssetWriter::new(kind, None, self.period.from, fps))
                .write(text, period),
            TextType::ClosedCaption => {
                let track = track.ok_or_else(|| {
                    DcpError::contract("closed caption written without a track")
                })?;
                self.captions
                    .lock()
                    .entry(track.to_string())
                    .or_insert_with(|| {
                        TextAssetWriter::new(kind, Some(track.to_string()), self.period.from, fps)
                    })
                    .write(text, period)
            }
        }
    }

    /// Append an immersive audio frame; the first frame's metadata heads the asset.
    pub fn write_atmos(&self, data: &[u8], metadata: &AtmosMetadata) -> DcpResult<()> {
        let mut atmos = self.atmos.lock();
        if atmos.is_none() {
            let path = self
                .spec
                .scratch_dir()
                .join(format!("reel{}_atmos.atmos", self.index));
            *atmos = Some(AtmosAssetWriter::start(&path, metadata.clone())?);
        }
        match atmos.as_mut() {
            Some(w) => {
                if w.metadata() != metadata {
                    tracing::warn!(
                        reel = self.index,
                        "atmos metadata changed within a reel; keeping the first"
                    );
                }
                w.write(data)
            }
            None => Err(DcpError::contract("atmos writer vanished")),
        }
    }

    fn frames_for_samples(&self, samples: u64) -> Frame {
        DcpTime::from_frames(samples as Frame, f64::from(self.spec.audio_frame_rate))
            .frames_round(self.spec.fps())
    }

    /// Close every asset and place it in `output`.
    #[tracing::instrument(skip(self, output), fields(reel = self.index))]
    pub fn finish(&self, output: &Path) -> DcpResult<()> {
        std::fs::create_dir_all(output)
            .map_err(|e| DcpError::io(output, "create package directory", e))?;
        let mut done = Finished::default();
        let reel_frames = self.spec.frames_in(self.period);

        {
            let mut pic = self.picture.lock();
            let units = pic.writer.finalize()?;
            if units > 0 {
                let id = pic.writer.id();
                let dest = output.join(format!("j2c_{id}.pic"));
                link_or_copy(pic.writer.path(), &dest)?;
                let eyes = self.spec.eyes().len() as u64;
                done.assets.push(ManifestAsset {
                    kind: AssetKind::Picture,
                    id,
                    path: dest,
                    duration: (units / eyes) as Frame,
                    digest: None,
                    track: None,
                    referenced: false,
                });
            }
        }

        {
            let mut sound = self.sound.lock();
            sound.finalize()?;
            if sound.frames() > 0 {
                let dest = output.join(format!("pcm_{}.wav", sound.id()));
                move_file(sound.path(), &dest)?;
                done.assets.push(ManifestAsset {
                    kind: AssetKind::Sound,
                    id: sound.id(),
                    path: dest,
                    duration: self.frames_for_samples(sound.frames()),
                    digest: None,
                    track: None,
                    referenced: false,
                });
            } else if let Err(e) = std::fs::remove_file(sound.path()) {
                tracing::warn!(
                    path = %sound.path().display(),
                    error = %e,
                    "could not remove empty sound asset"
                );
            }
        }

        let subtitle = self.subtitle.lock();
        let captions = self.captions.lock();
        let texts = subtitle
            .iter()
            .map(|t| (AssetKind::Subtitle, "sub", t))
            .chain(captions.values().map(|t| (AssetKind::ClosedCaption, "ccap", t)));
        for (kind, prefix, text) in texts {
            let dest = output.join(format!("{prefix}_{}.json", text.id()));
            text.finalize(&dest)?;
            done.fonts.extend(text.fonts().map(str::to_string));
            done.assets.push(ManifestAsset {
                kind,
                id: text.id(),
                path: dest,
                duration: reel_frames,
                digest: None,
                track: text.track().map(str::to_string),
                referenced: false,
            });
        }

        if let Some(atmos) = self.atmos.lock().as_mut() {
            atmos.finalize()?;
            let dest = output.join(format!("atmos_{}.atmos", atmos.id()));
            move_file(atmos.path(), &dest)?;
            done.assets.push(ManifestAsset {
                kind: AssetKind::Atmos,
                id: atmos.id(),
                path: dest,
                duration: atmos.frames() as Frame,
                digest: None,
                track: None,
                referenced: false,
            });
        }

        tracing::debug!(assets = done.assets.len(), "reel finished");
        *self.finished.lock() = Some(done);
        Ok(())
    }

    /// SHA-256 of every asset this reel produced, reported to `progress` as a fraction.
    pub fn calculate_digests(&self, progress: &(dyn Fn(f32) + Sync)) -> DcpResult<()> {
        let mut finished = self.finished.lock();
        let Some(done) = finished.as_mut() else {
            return Err(DcpError::contract(format!(
                "digests requested for unfinished reel {}",
                self.index
            )));
        };
        let total: u64 = done
            .assets
            .iter()
            .map(|a| std::fs::metadata(&a.path).map(|m| m.len()).unwrap_or(0))
            .sum::<u64>()
            .max(1);
        let mut before = 0u64;
        for asset in &mut done.assets {
            let mut size = 0;
            let digest = digest_file(&asset.path, |n| {
                size = n;
                progress((before + n) as f32 / total as f32);
            })?;
            before += size;
            asset.digest = Some(digest_hex(&digest));
        }
        progress(1.0);
        Ok(())
    }

    /// Playlist entry for this reel.
    ///
    /// Kinds this reel did not produce are taken from `refs` when one covers the same period.
    pub fn create_reel(
        &self,
        refs: &[ReferencedReelAsset],
        fonts: &[FontData],
    ) -> DcpResult<ReelManifest> {
        let finished = self.finished.lock();
        let Some(done) = finished.as_ref() else {
            return Err(DcpError::contract(format!(
                "reel {} has not been finished",
                self.index
            )));
        };

        let own = |kind: AssetKind| done.assets.iter().find(|a| a.kind == kind).cloned();
        let referenced = |kind: AssetKind| {
            refs.iter()
                .find(|r| r.period == self.period && r.asset.kind == kind)
                .map(|r| r.asset.clone())
        };
        let pick = |kind: AssetKind| own(kind).or_else(|| referenced(kind));

        let mut closed_captions: Vec<ManifestAsset> = done
            .assets
            .iter()
            .filter(|a| a.kind == AssetKind::ClosedCaption)
            .cloned()
            .collect();
        if closed_captions.is_empty() {
            closed_captions = refs
                .iter()
                .filter(|r| r.period == self.period && r.asset.kind == AssetKind::ClosedCaption)
                .map(|r| r.asset.clone())
                .collect();
        }

        let mut used = Vec::new();
        for id in &done.fonts {
            if fonts.iter().any(|f| &f.id == id) {
                used.push(id.clone());
            } else {
                tracing::warn!(reel = self.index, font = %id, "text uses a font that was never supplied");
            }
        }

        Ok(ReelManifest {
            index: self.index,
            period: self.period,
            picture: pick(AssetKind::Picture),
            sound: pick(AssetKind::Sound),
            subtitle: pick(AssetKind::Subtitle),
            closed_captions,
            atmos: pick(AssetKind::Atmos),
            fonts: used,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/reel/writer.rs"]
mod tests;
