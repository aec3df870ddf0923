use crate::audio::mapping::AudioMapping;
use crate::foundation::core::{Frame, MAX_DCP_AUDIO_CHANNELS};
use crate::foundation::time::ContentTime;

/// One audio stream of a content item.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioStream {
    /// Position of this stream within its content, assigned by whoever builds the stream list.
    pub index: usize,
    /// Native sample rate.
    pub frame_rate: u32,
    /// Length in samples at `frame_rate`.
    pub length: Frame,
    /// Routing of this stream's channels to package channels.
    pub mapping: AudioMapping,
}

impl AudioStream {
    /// Stream of `channels` channels with the default routing.
    pub fn new(index: usize, frame_rate: u32, length: Frame, channels: usize) -> Self {
        Self {
            index,
            frame_rate,
            length,
            mapping: AudioMapping::make_default(channels, MAX_DCP_AUDIO_CHANNELS),
        }
    }

    /// Number of channels in the stream.
    pub fn channels(&self) -> usize {
        self.mapping.input_channels()
    }

    /// Untrimmed length as a time.
    pub fn duration(&self) -> ContentTime {
        ContentTime::from_frames(self.length, f64::from(self.frame_rate))
    }
}
