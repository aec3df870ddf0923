use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::audio::buffers::AudioBuffers;
use crate::foundation::core::{Eyes, Frame};
use crate::foundation::error::{DcpError, DcpResult};
use crate::foundation::time::{DcpTime, TimePeriod};
use crate::package::job::Job;
use crate::package::opts::WriterOpts;
use crate::package::spec::PackageSpec;
use crate::recovery::handle::InfoFiles;
use crate::reel::atmos::AtmosMetadata;
use crate::reel::manifest::{CompositionPlaylist, ReferencedReelAsset, WriteCounts};
use crate::reel::text::{FontData, HangingText, PlayerText, TextType};
use crate::reel::writer::ReelWriter;
use crate::writer::digest::{
    DigestProgress, build_thread_pool, calculate_reel_digests, calculate_referenced_digests,
};
use crate::writer::queue::{LastWritten, QueueItem, QueueItemKind, QueueKey};

/// Lifecycle of a [`Writer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// Constructed; picture producers must wait for [`Writer::start`].
    NotStarted,
    /// Writer thread is sequencing picture units.
    Running,
    /// Writer thread is draining; no more units are accepted.
    Finishing,
    /// Package written.
    Finished,
}

/// Snapshot of the sequencing counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Units committed from freshly encoded data.
    pub full: u64,
    /// Units committed from intact on-disk data.
    pub fake: u64,
    /// Units committed as a copy of the previous frame.
    pub repeat: u64,
    /// FULL units spilled to disk while waiting their turn.
    pub pushed_to_disk: u64,
    /// Units waiting in the queue.
    pub queued: usize,
    /// FULL units currently held in memory.
    pub in_memory: usize,
    /// Highest value `in_memory` reached.
    pub peak_in_memory: usize,
    /// Current ceiling on `in_memory`.
    pub max_in_memory: usize,
}

struct QueueState {
    state: WriterState,
    finish: bool,
    failed: bool,
    queue: BTreeMap<QueueKey, QueueItem>,
    last_written: Vec<LastWritten>,
    full_in_memory: usize,
    peak_full_in_memory: usize,
    max_in_memory: usize,
    reserve: usize,
    max_queue: usize,
    counts: WriteCounts,
}

impl QueueState {
    fn head_sequenceable(&self) -> bool {
        self.queue
            .first_key_value()
            .is_some_and(|(k, _)| self.last_written[k.reel].next(k))
    }

    /// The writer thread keeps `reserve` slots free so a blocked producer can always proceed.
    fn must_spill(&self) -> bool {
        self.full_in_memory > self.max_in_memory.saturating_sub(self.reserve)
    }

    fn committed(&self) -> u64 {
        self.counts.full + self.counts.fake + self.counts.repeat
    }

    fn set_ceilings(&mut self, opts: &WriterOpts, threads: usize) {
        let k = (threads as f64 * opts.frames_in_memory_multiplier).round() as usize;
        self.max_in_memory = k.max(self.reserve);
        self.max_queue = threads * opts.queue_size_multiplier;
    }

    fn check_insertable(&self, key: &QueueKey) -> DcpResult<()> {
        if self.last_written[key.reel].is_past(key) {
            return Err(DcpError::contract(format!(
                "reel {} frame {} ({}) was already written",
                key.reel, key.frame, key.eyes
            )));
        }
        if self.queue.contains_key(key) {
            return Err(DcpError::contract(format!(
                "reel {} frame {} ({}) queued twice",
                key.reel, key.frame, key.eyes
            )));
        }
        Ok(())
    }
}

struct Shared {
    spec: Arc<PackageSpec>,
    reels: Arc<Vec<ReelWriter>>,
    job: Option<Arc<dyn Job>>,
    queue: Mutex<QueueState>,
    /// Wakes the writer thread.
    empty_condition: Condvar,
    /// Wakes producers waiting for room.
    full_condition: Condvar,
    error: Mutex<Option<DcpError>>,
}

impl Shared {
    fn thread_main(&self) {
        if let Err(e) = self.run() {
            tracing::error!(error = %e, "writer thread failed");
            *self.error.lock() = Some(e);
            {
                let mut q = self.queue.lock();
                q.finish = true;
                q.failed = true;
            }
            self.empty_condition.notify_all();
            self.full_condition.notify_all();
        }
    }

    fn run(&self) -> DcpResult<()> {
        let total = self.spec.total_picture_units().max(1);
        let mut q = self.queue.lock();
        loop {
            while !(q.finish || q.head_sequenceable() || q.must_spill()) {
                self.empty_condition.wait(&mut q);
            }

            if q.finish && !q.head_sequenceable() {
                if !q.queue.is_empty() {
                    tracing::warn!(
                        left = q.queue.len(),
                        "writer finishing with units that can never be written"
                    );
                    for (key, item) in &q.queue {
                        tracing::warn!(
                            reel = key.reel,
                            frame = key.frame,
                            eyes = %key.eyes,
                            kind = ?item.kind,
                            "unwritten unit"
                        );
                    }
                }
                return Ok(());
            }

            while q.head_sequenceable() {
                let Some((key, item)) = q.queue.pop_first() else {
                    break;
                };
                q.last_written[key.reel].update(&key);
                let kind = item.kind;
                let in_memory = item.in_memory();
                MutexGuard::unlocked(&mut q, || self.commit(key, item))?;

                if in_memory {
                    q.full_in_memory -= 1;
                }
                match kind {
                    QueueItemKind::Full => q.counts.full += 1,
                    QueueItemKind::Fake => q.counts.fake += 1,
                    QueueItemKind::Repeat => q.counts.repeat += 1,
                }
                let done = q.committed();
                self.full_condition.notify_all();
                if let Some(job) = &self.job {
                    MutexGuard::unlocked(&mut q, || {
                        job.set_progress(done as f32 / total as f32)
                    });
                }
            }

            while q.must_spill() && !q.head_sequenceable() {
                let victim = q
                    .queue
                    .iter()
                    .rev()
                    .find_map(|(k, i)| if i.in_memory() { i.encoded.clone().map(|d| (*k, d)) } else { None });
                let Some((key, data)) = victim else {
                    return Err(DcpError::contract(format!(
                        "{} FULL units counted in memory but none queued",
                        q.full_in_memory
                    )));
                };
                let awaiting = q
                    .queue
                    .first_key_value()
                    .map(|(k, _)| q.last_written[k.reel].frame() + 1);
                tracing::debug!(
                    reel = key.reel,
                    frame = key.frame,
                    eyes = %key.eyes,
                    ?awaiting,
                    "writer full; pushing frame to disk"
                );
                MutexGuard::unlocked(&mut q, || self.spill(&key, &data))?;
                drop(data);

                if let Some(item) = q.queue.get_mut(&key) {
                    item.encoded = None;
                }
                q.full_in_memory -= 1;
                q.counts.pushed_to_disk += 1;
                self.full_condition.notify_all();
            }
        }
    }

    fn commit(&self, key: QueueKey, item: QueueItem) -> DcpResult<()> {
        let reel = &self.reels[key.reel];
        match item.kind {
            QueueItemKind::Full => {
                let data = match item.encoded {
                    Some(data) => data,
                    None => self.reload(&key)?,
                };
                tracing::trace!(reel = key.reel, frame = key.frame, eyes = %key.eyes, "FULL write");
                reel.write(data, key.frame, key.eyes)
            }
            QueueItemKind::Fake => {
                tracing::trace!(reel = key.reel, frame = key.frame, eyes = %key.eyes, "FAKE write");
                reel.fake_write(item.size, key.eyes)
            }
            QueueItemKind::Repeat => {
                tracing::trace!(reel = key.reel, frame = key.frame, eyes = %key.eyes, "REPEAT write");
                reel.repeat_write(key.frame, key.eyes)
            }
        }
    }

    fn spill(&self, key: &QueueKey, data: &[u8]) -> DcpResult<()> {
        let path = self.spec.j2c_path(key.reel, key.frame, key.eyes);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| DcpError::io(dir, "create spill directory", e))?;
        }
        let tmp = path.with_extension("j2c.tmp");
        std::fs::write(&tmp, data).map_err(|e| DcpError::io(&tmp, "write spilled frame", e))?;
        std::fs::rename(&tmp, &path).map_err(|e| DcpError::io(&path, "rename spilled frame", e))
    }

    fn reload(&self, key: &QueueKey) -> DcpResult<Arc<[u8]>> {
        let path = self.spec.j2c_path(key.reel, key.frame, key.eyes);
        let data = std::fs::read(&path).map_err(|e| DcpError::io(&path, "reload spilled frame", e))?;
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove spill file");
        }
        Ok(Arc::from(data))
    }
}

fn writer_stopped() -> DcpError {
    DcpError::contract("writer thread stopped after an earlier error")
}

/// State owned by the controlling thread: audio, text, fonts and referenced assets.
struct Control {
    audio_reel: usize,
    last_audio_time: Option<DcpTime>,
    subtitle_reel: usize,
    caption_reels: HashMap<String, usize>,
    atmos_reel: usize,
    hanging_text: Vec<HangingText>,
    fonts: Vec<FontData>,
    reel_assets: Vec<ReferencedReelAsset>,
}

fn write_hanging_text(hanging: &mut Vec<HangingText>, reel: &ReelWriter) -> DcpResult<()> {
    let from = reel.period().from;
    let (now, later): (Vec<_>, Vec<_>) = std::mem::take(hanging)
        .into_iter()
        .partition(|h| h.period.from == from);
    *hanging = later;
    for h in now {
        reel.write_text(h.text, h.kind, h.track.as_deref(), h.period)?;
    }
    Ok(())
}

fn font_file_name(id: &str) -> String {
    id.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Sequences picture units from many producer threads into per-reel assets and assembles the
/// finished package.
///
/// Picture producers call [`write`](Self::write), [`fake_write`](Self::fake_write) and
/// [`repeat`](Self::repeat) from any thread and in any order; a single writer thread commits
/// units in `(reel, frame, eye)` order. Audio, text and the other controller-side writes must
/// come from one thread in timeline order.
pub struct Writer {
    shared: Arc<Shared>,
    opts: WriterOpts,
    control: Mutex<Control>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("name", &self.shared.spec.name)
            .field("reels", &self.shared.reels.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Writer {
    /// Prepare every reel, checking existing picture data so intact frames can be skipped.
    #[tracing::instrument(skip_all, fields(name = %spec.name))]
    pub fn new(spec: PackageSpec, opts: WriterOpts, job: Option<Arc<dyn Job>>) -> DcpResult<Self> {
        spec.validate()?;
        opts.validate()?;

        for dir in [spec.video_dir(), spec.scratch_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| DcpError::io(&dir, "create working directory", e))?;
        }

        let spec = Arc::new(spec);
        let info_files = Arc::new(InfoFiles::new());
        let reels = spec
            .reels
            .iter()
            .enumerate()
            .map(|(i, period)| {
                ReelWriter::new(spec.clone(), info_files.clone(), i, *period, job.as_deref())
            })
            .collect::<DcpResult<Vec<_>>>()?;

        let reserve = spec.eyes().len();
        let mut queue = QueueState {
            state: WriterState::NotStarted,
            finish: false,
            failed: false,
            queue: BTreeMap::new(),
            last_written: vec![LastWritten::default(); reels.len()],
            full_in_memory: 0,
            peak_full_in_memory: 0,
            max_in_memory: 0,
            reserve,
            max_queue: 0,
            counts: WriteCounts::default(),
        };
        queue.set_ceilings(&opts, opts.encoder_threads);

        let control = Control {
            audio_reel: 0,
            last_audio_time: None,
            subtitle_reel: 0,
            caption_reels: spec
                .closed_caption_tracks
                .iter()
                .map(|t| (t.clone(), 0))
                .collect(),
            atmos_reel: 0,
            hanging_text: Vec::new(),
            fonts: Vec::new(),
            reel_assets: Vec::new(),
        };

        tracing::info!(
            reels = reels.len(),
            max_in_memory = queue.max_in_memory,
            max_queue = queue.max_queue,
            "writer ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                spec,
                reels: Arc::new(reels),
                job,
                queue: Mutex::new(queue),
                empty_condition: Condvar::new(),
                full_condition: Condvar::new(),
                error: Mutex::new(None),
            }),
            opts,
            control: Mutex::new(control),
            thread: Mutex::new(None),
        })
    }

    /// Package parameters.
    pub fn spec(&self) -> &PackageSpec {
        &self.shared.spec
    }

    /// Reel writers in timeline order.
    pub fn reels(&self) -> &[ReelWriter] {
        &self.shared.reels
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WriterState {
        self.shared.queue.lock().state
    }

    /// Launch the writer thread.
    pub fn start(&self) -> DcpResult<()> {
        {
            let mut q = self.shared.queue.lock();
            if q.state != WriterState::NotStarted {
                return Err(DcpError::contract(format!(
                    "writer cannot start from {:?}",
                    q.state
                )));
            }
            q.state = WriterState::Running;
        }
        if let Some(job) = &self.shared.job {
            job.sub("Encoding picture");
        }
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("dcp-writer".to_string())
            .spawn(move || shared.thread_main())
            .map_err(|e| DcpError::Other(anyhow::Error::new(e).context("spawn writer thread")))?;
        *self.thread.lock() = Some(handle);
        Ok(())
    }

    /// Return the error the writer thread stopped with, if any.
    ///
    /// The original error is returned once; after that every call reports that the thread has
    /// stopped.
    pub fn rethrow(&self) -> DcpResult<()> {
        if let Some(e) = self.shared.error.lock().take() {
            return Err(e);
        }
        if self.shared.queue.lock().failed {
            return Err(writer_stopped());
        }
        Ok(())
    }

    /// Current counters.
    pub fn stats(&self) -> WriterStats {
        let q = self.shared.queue.lock();
        WriterStats {
            full: q.counts.full,
            fake: q.counts.fake,
            repeat: q.counts.repeat,
            pushed_to_disk: q.counts.pushed_to_disk,
            queued: q.queue.len(),
            in_memory: q.full_in_memory,
            peak_in_memory: q.peak_full_in_memory,
            max_in_memory: q.max_in_memory,
        }
    }

    /// Tell the backpressure policy how many encoder threads are feeding picture.
    pub fn set_encoder_threads(&self, threads: usize) -> DcpResult<()> {
        if threads == 0 {
            return Err(DcpError::validation("encoder threads must be >= 1"));
        }
        {
            let mut q = self.shared.queue.lock();
            q.set_ceilings(&self.opts, threads);
            tracing::debug!(
                threads,
                max_in_memory = q.max_in_memory,
                max_queue = q.max_queue,
                "encoder threads changed"
            );
        }
        self.shared.empty_condition.notify_all();
        self.shared.full_condition.notify_all();
        Ok(())
    }

    /// Index of the reel containing timeline `frame`.
    pub fn video_reel(&self, frame: Frame) -> DcpResult<usize> {
        let t = DcpTime::from_frames(frame, self.spec().fps());
        self.reels()
            .iter()
            .position(|r| r.period().contains(t))
            .ok_or_else(|| DcpError::contract(format!("frame {frame} lies outside every reel")))
    }

    /// Return `true` if timeline `frame` is already intact on disk and may be FAKE-written.
    ///
    /// The first frame of a reel always needs a real write.
    pub fn can_fake_write(&self, frame: Frame) -> bool {
        let Ok(index) = self.video_reel(frame) else {
            return false;
        };
        let reel = &self.reels()[index];
        let rel = frame - reel.start();
        rel != 0 && rel < reel.first_nonexistent_frame()
    }

    /// Return `true` if timeline `frame` has a predecessor in its reel to copy.
    pub fn can_repeat(&self, frame: Frame) -> bool {
        match self.video_reel(frame) {
            Ok(index) => frame > self.reels()[index].start(),
            Err(_) => false,
        }
    }

    /// Queue freshly encoded picture data for timeline `frame`.
    ///
    /// Blocks while too many FULL units are in memory.
    pub fn write(&self, data: Arc<[u8]>, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        self.rethrow()?;
        let keys = self.unit_keys(frame, eyes)?;
        let needed = keys.len();
        let shared = &self.shared;

        let mut q = shared.queue.lock();
        self.check_accepting(&q)?;
        while q.full_in_memory + needed > q.max_in_memory && !q.finish {
            shared.empty_condition.notify_all();
            shared.full_condition.wait(&mut q);
        }
        self.check_accepting(&q)?;
        for key in &keys {
            q.check_insertable(key)?;
        }
        for key in keys {
            q.queue.insert(key, QueueItem::full(data.clone()));
        }
        q.full_in_memory += needed;
        q.peak_full_in_memory = q.peak_full_in_memory.max(q.full_in_memory);
        drop(q);
        shared.empty_condition.notify_all();
        Ok(())
    }

    /// Queue a FAKE unit: timeline `frame` is already intact in the reel's picture asset.
    pub fn fake_write(&self, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        self.rethrow()?;
        if !self.can_fake_write(frame) {
            return Err(DcpError::contract(format!(
                "frame {frame} is not intact on disk and cannot be fake-written"
            )));
        }
        let keys = self.unit_keys(frame, eyes)?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let info = self.reels()[key.reel]
                .recorded_frame(key.frame, key.eyes)?
                .ok_or_else(|| {
                    DcpError::contract(format!(
                        "no recovery record for reel {} frame {} ({})",
                        key.reel, key.frame, key.eyes
                    ))
                })?;
            items.push((key, QueueItem::fake(info.size)));
        }
        self.enqueue_light(items)
    }

    /// Queue a REPEAT unit: timeline `frame` is a copy of the frame before it.
    pub fn repeat(&self, frame: Frame, eyes: Eyes) -> DcpResult<()> {
        self.rethrow()?;
        if !self.can_repeat(frame) {
            return Err(DcpError::contract(format!(
                "frame {frame} starts its reel and cannot be repeated"
            )));
        }
        let items = self
            .unit_keys(frame, eyes)?
            .into_iter()
            .map(|key| (key, QueueItem::repeat()))
            .collect();
        self.enqueue_light(items)
    }

    fn unit_keys(&self, frame: Frame, eyes: Eyes) -> DcpResult<Vec<QueueKey>> {
        let reel = self.video_reel(frame)?;
        let frame = frame - self.reels()[reel].start();
        let key = |eyes| QueueKey { reel, frame, eyes };
        match (self.spec().three_d, eyes) {
            (true, Eyes::Both) => Ok(vec![key(Eyes::Left), key(Eyes::Right)]),
            (true, eyes) | (false, eyes @ Eyes::Both) => Ok(vec![key(eyes)]),
            (false, eyes) => Err(DcpError::contract(format!(
                "{eyes} eye supplied to a 2D package"
            ))),
        }
    }

    fn check_accepting(&self, q: &QueueState) -> DcpResult<()> {
        if q.failed {
            return Err(self.shared.error.lock().take().unwrap_or_else(writer_stopped));
        }
        match q.state {
            WriterState::Running => Ok(()),
            state => Err(DcpError::contract(format!(
                "writer is {state:?}; picture units are not accepted"
            ))),
        }
    }

    fn enqueue_light(&self, items: Vec<(QueueKey, QueueItem)>) -> DcpResult<()> {
        let shared = &self.shared;
        let mut q = shared.queue.lock();
        self.check_accepting(&q)?;
        while q.queue.len() > q.max_queue && q.head_sequenceable() && !q.finish {
            shared.empty_condition.notify_all();
            shared.full_condition.wait(&mut q);
        }
        self.check_accepting(&q)?;
        for (key, _) in &items {
            q.check_insertable(key)?;
        }
        q.queue.extend(items);
        drop(q);
        shared.empty_condition.notify_all();
        Ok(())
    }

    fn ensure_open(&self) -> DcpResult<()> {
        match self.state() {
            WriterState::NotStarted | WriterState::Running => Ok(()),
            state => Err(DcpError::contract(format!("writer is {state:?}"))),
        }
    }

    /// Write sound starting at timeline `time`, splitting it across reel boundaries.
    ///
    /// Audio beyond the last reel is dropped.
    pub fn write_audio(&self, audio: &AudioBuffers, time: DcpTime) -> DcpResult<()> {
        self.rethrow()?;
        self.ensure_open()?;
        let reels = self.reels();
        let rate = f64::from(self.spec().audio_frame_rate);

        let mut c = self.control.lock();
        if let Some(last) = c.last_audio_time
            && time < last
        {
            return Err(DcpError::contract(format!(
                "audio at {} arrived after audio at {}",
                time.get(),
                last.get()
            )));
        }
        c.last_audio_time = Some(time);

        let end = time + DcpTime::from_frames(audio.frames() as Frame, rate);
        let mut t = time;
        let mut offset = 0usize;
        while t < end {
            let Some(reel) = reels.get(c.audio_reel) else {
                tracing::debug!(time = t.get(), "audio past the last reel ignored");
                return Ok(());
            };
            let reel_end = reel.period().to;
            if end <= reel_end {
                if offset == 0 {
                    reel.write_audio(audio)?;
                } else if offset < audio.frames() {
                    reel.write_audio(&audio.slice(audio.frames() - offset, offset)?)?;
                }
                t = end;
            } else if reel_end <= t {
                c.audio_reel += 1;
            } else {
                let first = ((reel_end - t).frames_ceil(rate).max(0) as usize)
                    .min(audio.frames() - offset);
                if first > 0 {
                    reel.write_audio(&audio.slice(first, offset)?)?;
                }
                offset += first;
                c.audio_reel += 1;
                t = reel_end;
            }
        }
        Ok(())
    }

    /// Write a subtitle or caption cue covering timeline `period`.
    ///
    /// A cue that runs past the end of its reel is cut there and ends two frames early; the
    /// remainder is parked unchanged and written when the following reels become current.
    pub fn write_text(
        &self,
        text: PlayerText,
        kind: TextType,
        track: Option<&str>,
        period: TimePeriod,
    ) -> DcpResult<()> {
        self.rethrow()?;
        self.ensure_open()?;
        let reels = self.reels();
        let back_off_by = DcpTime::from_frames(2, self.spec().fps());
        let back_off = |p: TimePeriod| {
            let to = p.to - back_off_by;
            (to > p.from).then_some(TimePeriod::new(p.from, to))
        };

        let mut guard = self.control.lock();
        let c = &mut *guard;
        let cursor = match kind {
            TextType::OpenSubtitle => &mut c.subtitle_reel,
            TextType::ClosedCaption => {
                let track = track
                    .ok_or_else(|| DcpError::contract("closed caption written without a track"))?;
                c.caption_reels.get_mut(track).ok_or_else(|| {
                    DcpError::contract(format!("unknown closed caption track '{track}'"))
                })?
            }
        };

        loop {
            let reel = reels.get(*cursor).ok_or_else(|| {
                DcpError::contract(format!("text at {} is after the last reel", period.from.get()))
            })?;
            if reel.period().to > period.from {
                break;
            }
            *cursor += 1;
            if let Some(next) = reels.get(*cursor) {
                write_hanging_text(&mut c.hanging_text, next)?;
            }
        }

        let reel = &reels[*cursor];
        let mut period = period;
        if period.to > reel.period().to {
            for later in &reels[*cursor + 1..] {
                if let Some(part) = later.period().overlap(period) {
                    c.hanging_text.push(HangingText {
                        text: text.clone(),
                        kind,
                        track: track.map(str::to_string),
                        period: part,
                    });
                }
            }
            period.to = reel.period().to;
            match back_off(period) {
                Some(p) => period = p,
                None => {
                    tracing::debug!(from = period.from.get(), "text too short to keep before reel end");
                    return Ok(());
                }
            }
        }
        reel.write_text(text, kind, track, period)
    }

    /// Register fonts used by text; fonts with an id seen before are ignored.
    pub fn write_fonts(&self, fonts: impl IntoIterator<Item = FontData>) {
        let mut c = self.control.lock();
        for mut font in fonts {
            if font.id.is_empty() {
                font.id = "font".to_string();
            }
            if c.fonts.iter().any(|f| f.id == font.id) {
                continue;
            }
            tracing::debug!(id = %font.id, bytes = font.data.len(), "font registered");
            c.fonts.push(font);
        }
    }

    /// Reuse an asset from an existing package for a reel period.
    pub fn write_referenced(&self, asset: ReferencedReelAsset) {
        self.control.lock().reel_assets.push(asset);
    }

    /// Write one picture frame's worth of immersive audio at timeline `time`.
    pub fn write_atmos(&self, data: &[u8], time: DcpTime, metadata: &AtmosMetadata) -> DcpResult<()> {
        self.rethrow()?;
        self.ensure_open()?;
        let reels = self.reels();
        let mut c = self.control.lock();
        loop {
            let reel = reels.get(c.atmos_reel).ok_or_else(|| {
                DcpError::contract(format!("atmos at {} is after the last reel", time.get()))
            })?;
            if reel.period().to > time {
                return reel.write_atmos(data, metadata);
            }
            c.atmos_reel += 1;
        }
    }

    /// Stop the writer thread once every sequenceable unit is committed.
    ///
    /// With `can_throw`, an error from the thread is returned.
    pub fn terminate_thread(&self, can_throw: bool) -> DcpResult<()> {
        {
            let mut q = self.shared.queue.lock();
            q.finish = true;
            if q.state == WriterState::Running {
                q.state = WriterState::Finishing;
            }
        }
        self.shared.empty_condition.notify_all();
        self.shared.full_condition.notify_all();

        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            let e = DcpError::contract("writer thread panicked");
            if can_throw {
                return Err(e);
            }
            tracing::error!(error = %e, "writer thread ended abnormally");
        }
        if can_throw {
            self.rethrow()?;
        }
        Ok(())
    }

    /// Drain the queue, close every reel, compute digests and write the package into `output`.
    #[tracing::instrument(skip(self, output), fields(output = %output.display()))]
    pub fn finish(&self, output: &Path) -> DcpResult<CompositionPlaylist> {
        self.rethrow()?;
        {
            let q = self.shared.queue.lock();
            if q.state != WriterState::Running {
                return Err(DcpError::contract(format!("cannot finish a writer that is {:?}", q.state)));
            }
        }
        self.terminate_thread(true)?;

        let job = self.shared.job.as_deref();
        let reels = self.reels();
        let mut c = self.control.lock();

        if let Some(job) = job {
            job.sub("Finishing reels");
        }
        for reel in reels {
            write_hanging_text(&mut c.hanging_text, reel)?;
            reel.finish(output)?;
        }

        if let Some(job) = job {
            job.sub("Computing digests");
        }
        let pool = build_thread_pool(self.opts.digest_threads)?;
        let progress = DigestProgress::new(job, reels.len());
        calculate_reel_digests(&pool, reels, &progress)?;
        calculate_referenced_digests(&pool, &mut c.reel_assets)?;

        let manifests = reels
            .iter()
            .map(|r| r.create_reel(&c.reel_assets, &c.fonts))
            .collect::<DcpResult<Vec<_>>>()?;

        if !c.fonts.is_empty() {
            let dir = output.join("fonts");
            std::fs::create_dir_all(&dir).map_err(|e| DcpError::io(&dir, "create font directory", e))?;
            for font in &c.fonts {
                let path = dir.join(font_file_name(&font.id));
                std::fs::write(&path, &font.data).map_err(|e| DcpError::io(&path, "write font", e))?;
            }
        }

        let counts = self.shared.queue.lock().counts;
        let spec = self.spec();
        let cpl = CompositionPlaylist {
            id: uuid::Uuid::new_v4(),
            name: spec.name.clone(),
            edit_rate: spec.video_frame_rate.to_string(),
            three_d: spec.three_d,
            reels: manifests,
            counts,
        };
        let path = output.join("CPL.json");
        let json = serde_json::to_vec_pretty(&cpl).map_err(|e| DcpError::serde(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| DcpError::io(&path, "write composition playlist", e))?;

        self.shared.queue.lock().state = WriterState::Finished;
        tracing::info!(
            "Wrote {} FULL, {} FAKE, {} REPEAT; {} pushed to disk",
            counts.full,
            counts.fake,
            counts.repeat,
            counts.pushed_to_disk
        );
        Ok(cpl)
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        let _ = self.terminate_thread(false);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/writer/engine.rs"]
mod tests;
