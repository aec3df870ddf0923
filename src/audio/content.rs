use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::fade::FadeEnvelope;
use crate::audio::mapping::AudioMapping;
use crate::audio::stream::AudioStream;
use crate::foundation::core::{Frame, MAX_DCP_AUDIO_CHANNELS};
use crate::foundation::error::{DcpError, DcpResult};
use crate::foundation::time::ContentTime;

/// Property of an [`AudioContent`] that a setter touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioProperty {
    /// Stream list or any stream's mapping.
    Streams,
    /// Gain in dB.
    Gain,
    /// Delay in milliseconds.
    Delay,
    /// Fade-in length.
    FadeIn,
    /// Fade-out length.
    FadeOut,
    /// Whether fades follow the sibling video.
    UseSameFadesAsVideo,
    /// Start or end trim.
    Trim,
    /// Sibling video fade information.
    VideoFades,
}

/// Whether a change is about to happen or has happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangePhase {
    /// Emitted before the new value is stored.
    Pending,
    /// Emitted after the new value is stored.
    Done,
}

/// Notification sent to observers by every setter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentChange {
    /// What changed.
    pub property: AudioProperty,
    /// Before or after.
    pub phase: ChangePhase,
}

/// Receiver of [`ContentChange`] notifications.
pub trait ContentObserver: Send + Sync {
    /// Called outside the content lock.
    fn content_changed(&self, change: ContentChange);
}

/// Fade lengths of the video that shares this content item.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoFades {
    /// Fade-in in video frames.
    pub fade_in: Frame,
    /// Fade-out in video frames.
    pub fade_out: Frame,
    /// Video frame rate.
    pub frame_rate: f64,
}

/// Persisted state of an [`AudioContent`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioContentState {
    /// Gain in dB.
    pub gain: f64,
    /// Delay in milliseconds; positive delays the audio.
    pub delay: i32,
    /// Fade-in length.
    pub fade_in: ContentTime,
    /// Fade-out length.
    pub fade_out: ContentTime,
    /// Take fades from the sibling video when there is one.
    pub use_same_fades_as_video: bool,
    /// Time trimmed from the start.
    pub trim_start: ContentTime,
    /// Time trimmed from the end.
    pub trim_end: ContentTime,
    /// Sibling video fades, if the content has video.
    pub video: Option<VideoFades>,
    /// Streams in index order.
    pub streams: Vec<AudioStream>,
}

impl AudioContentState {
    /// Parse state from JSON.
    pub fn from_json(s: &str) -> DcpResult<Self> {
        serde_json::from_str(s).map_err(|e| DcpError::serde(e.to_string()))
    }

    /// Serialize state to JSON.
    pub fn to_json(&self) -> DcpResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DcpError::serde(e.to_string()))
    }
}

/// Audio part of a content item: gain, delay, fades, trims and streams.
///
/// Safe to share between a mixing thread and a UI thread. Setters notify observers before and
/// after each change, never while holding the lock.
#[derive(Default)]
pub struct AudioContent {
    state: Mutex<AudioContentState>,
    observers: Mutex<Vec<Arc<dyn ContentObserver>>>,
}

impl std::fmt::Debug for AudioContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContent")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl AudioContent {
    /// Content with the given streams and everything else neutral.
    pub fn new(streams: Vec<AudioStream>) -> Self {
        Self::from_state(AudioContentState {
            streams,
            ..AudioContentState::default()
        })
    }

    /// Restore content from persisted state.
    pub fn from_state(state: AudioContentState) -> Self {
        Self {
            state: Mutex::new(state),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current state for persistence.
    pub fn state(&self) -> AudioContentState {
        self.state.lock().clone()
    }

    /// Register an observer for subsequent changes.
    pub fn add_observer(&self, observer: Arc<dyn ContentObserver>) {
        self.observers.lock().push(observer);
    }

    fn notify(&self, property: AudioProperty, phase: ChangePhase) {
        let observers = self.observers.lock().clone();
        for o in observers {
            o.content_changed(ContentChange { property, phase });
        }
    }

    fn change(&self, property: AudioProperty, f: impl FnOnce(&mut AudioContentState)) {
        self.notify(property, ChangePhase::Pending);
        f(&mut *self.state.lock());
        self.notify(property, ChangePhase::Done);
    }

    /// Gain in dB.
    pub fn gain(&self) -> f64 {
        self.state.lock().gain
    }

    /// Gain as a linear multiplier.
    pub fn gain_linear(&self) -> f64 {
        10f64.powf(self.gain() / 20.0)
    }

    /// Set the gain in dB.
    pub fn set_gain(&self, db: f64) {
        self.change(AudioProperty::Gain, |s| s.gain = db);
    }

    /// Delay in milliseconds.
    pub fn delay(&self) -> i32 {
        self.state.lock().delay
    }

    /// Set the delay in milliseconds.
    pub fn set_delay(&self, ms: i32) {
        self.change(AudioProperty::Delay, |s| s.delay = ms);
    }

    /// Effective fade-in, taken from the video when configured and available.
    pub fn fade_in(&self) -> ContentTime {
        let s = self.state.lock();
        match (s.use_same_fades_as_video, s.video) {
            (true, Some(v)) => ContentTime::from_frames(v.fade_in, v.frame_rate),
            _ => s.fade_in,
        }
    }

    /// Effective fade-out, taken from the video when configured and available.
    pub fn fade_out(&self) -> ContentTime {
        let s = self.state.lock();
        match (s.use_same_fades_as_video, s.video) {
            (true, Some(v)) => ContentTime::from_frames(v.fade_out, v.frame_rate),
            _ => s.fade_out,
        }
    }

    /// Set the audio's own fade-in.
    pub fn set_fade_in(&self, t: ContentTime) {
        self.change(AudioProperty::FadeIn, |s| s.fade_in = t);
    }

    /// Set the audio's own fade-out.
    pub fn set_fade_out(&self, t: ContentTime) {
        self.change(AudioProperty::FadeOut, |s| s.fade_out = t);
    }

    /// Whether fades follow the sibling video.
    pub fn use_same_fades_as_video(&self) -> bool {
        self.state.lock().use_same_fades_as_video
    }

    /// Make fades follow (or stop following) the sibling video.
    pub fn set_use_same_fades_as_video(&self, yes: bool) {
        self.change(AudioProperty::UseSameFadesAsVideo, |s| {
            s.use_same_fades_as_video = yes
        });
    }

    /// Attach or detach sibling video fade information.
    pub fn set_video_fades(&self, video: Option<VideoFades>) {
        self.change(AudioProperty::VideoFades, |s| s.video = video);
    }

    /// Start trim.
    pub fn trim_start(&self) -> ContentTime {
        self.state.lock().trim_start
    }

    /// End trim.
    pub fn trim_end(&self) -> ContentTime {
        self.state.lock().trim_end
    }

    /// Set the start trim.
    pub fn set_trim_start(&self, t: ContentTime) {
        self.change(AudioProperty::Trim, |s| s.trim_start = t);
    }

    /// Set the end trim.
    pub fn set_trim_end(&self, t: ContentTime) {
        self.change(AudioProperty::Trim, |s| s.trim_end = t);
    }

    /// Streams in index order.
    pub fn streams(&self) -> Vec<AudioStream> {
        self.state.lock().streams.clone()
    }

    /// First stream, for single-stream content.
    pub fn stream(&self) -> Option<AudioStream> {
        self.state.lock().streams.first().cloned()
    }

    /// Replace the stream list.
    pub fn set_streams(&self, streams: Vec<AudioStream>) {
        self.change(AudioProperty::Streams, |s| s.streams = streams);
    }

    /// All streams' mappings stacked into one matrix with a row per content channel.
    pub fn mapping(&self) -> AudioMapping {
        let s = self.state.lock();
        let channels = s.streams.iter().map(AudioStream::channels).sum();
        let mut merged = AudioMapping::new(channels, MAX_DCP_AUDIO_CHANNELS);
        merged.make_zero();
        let mut c = 0;
        for stream in &s.streams {
            let m = &stream.mapping;
            for j in 0..m.input_channels() {
                for k in 0..MAX_DCP_AUDIO_CHANNELS.min(m.output_channels()) {
                    merged.set(c, k, m.get(j, k));
                }
                c += 1;
            }
        }
        merged
    }

    /// Split a merged mapping back into per-stream mappings.
    pub fn set_mapping(&self, mapping: &AudioMapping) {
        self.change(AudioProperty::Streams, |s| {
            let mut c = 0;
            for stream in &mut s.streams {
                let channels = stream.channels();
                let mut m = AudioMapping::new(channels, MAX_DCP_AUDIO_CHANNELS);
                for j in 0..channels {
                    for k in 0..MAX_DCP_AUDIO_CHANNELS {
                        m.set(j, k, mapping.get(c, k));
                    }
                    c += 1;
                }
                stream.mapping = m;
            }
        });
    }

    /// Per-sample gain envelope for `[frame, frame + length)` of `stream` at `rate`.
    ///
    /// Empty when the window needs no envelope.
    pub fn fade(&self, stream: &AudioStream, frame: Frame, length: usize, rate: u32) -> Vec<f32> {
        let envelope = FadeEnvelope {
            fade_in: self.fade_in(),
            fade_out: self.fade_out(),
            trim_start: self.trim_start(),
            trim_end: self.trim_end(),
            stream_length: stream.duration(),
        };
        envelope.coefficients(frame, length, rate)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/content.rs"]
mod tests;
