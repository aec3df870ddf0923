use crate::audio::mapping::AudioMapping;
use crate::foundation::error::{DcpError, DcpResult};

/// Planar block of `f32` samples: one vector per channel, all of equal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffers {
    data: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBuffers {
    /// Silent buffers of `channels` x `frames`.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![vec![0.0; frames]; channels],
            frames,
        }
    }

    /// Wrap existing planar data. Every channel must have the same length.
    pub fn from_planar(data: Vec<Vec<f32>>) -> DcpResult<Self> {
        let frames = data.first().map_or(0, Vec::len);
        if data.iter().any(|c| c.len() != frames) {
            return Err(DcpError::validation(
                "audio buffers need the same number of frames in every channel",
            ));
        }
        Ok(Self { data, frames })
    }

    /// De-interleave `samples` laid out as `frame * channels + channel`.
    pub fn from_interleaved(samples: &[f32], channels: usize) -> DcpResult<Self> {
        if channels == 0 || !samples.len().is_multiple_of(channels) {
            return Err(DcpError::validation(
                "interleaved sample count must be a multiple of the channel count",
            ));
        }
        let frames = samples.len() / channels;
        let mut out = Self::new(channels, frames);
        for (i, s) in samples.iter().enumerate() {
            out.data[i % channels][i / channels] = *s;
        }
        Ok(out)
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.data.len()
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Samples of channel `c`.
    pub fn channel(&self, c: usize) -> &[f32] {
        &self.data[c]
    }

    /// Mutable samples of channel `c`.
    pub fn channel_mut(&mut self, c: usize) -> &mut [f32] {
        &mut self.data[c]
    }

    /// Zero every sample.
    pub fn make_silent(&mut self) {
        for c in &mut self.data {
            c.fill(0.0);
        }
    }

    /// Copy of `frames` frames starting at `offset`.
    pub fn slice(&self, frames: usize, offset: usize) -> DcpResult<Self> {
        if offset + frames > self.frames {
            return Err(DcpError::contract(format!(
                "audio slice {offset}+{frames} exceeds buffer of {} frames",
                self.frames
            )));
        }
        Ok(Self {
            data: self
                .data
                .iter()
                .map(|c| c[offset..offset + frames].to_vec())
                .collect(),
            frames,
        })
    }

    /// Multiply every sample by `10^(db/20)`.
    pub fn apply_gain(&mut self, db: f32) {
        if db == 0.0 {
            return;
        }
        let linear = db_to_linear(db);
        for c in &mut self.data {
            for s in c.iter_mut() {
                *s *= linear;
            }
        }
    }

    /// Multiply frame `i` of every channel by `coeffs[i]`.
    ///
    /// An empty coefficient list is unity gain.
    pub fn apply_coefficients(&mut self, coeffs: &[f32]) -> DcpResult<()> {
        if coeffs.is_empty() {
            return Ok(());
        }
        if coeffs.len() != self.frames {
            return Err(DcpError::contract(format!(
                "{} fade coefficients for {} frames",
                coeffs.len(),
                self.frames
            )));
        }
        for c in &mut self.data {
            for (s, k) in c.iter_mut().zip(coeffs) {
                *s *= *k;
            }
        }
        Ok(())
    }

    /// Mix these buffers into `output_channels` channels through `mapping`.
    pub fn remap(&self, output_channels: usize, mapping: &AudioMapping) -> Self {
        let mut out = Self::new(output_channels, self.frames);
        let inputs = self.channels().min(mapping.input_channels());
        let outputs = output_channels.min(mapping.output_channels());
        for i in 0..inputs {
            for o in 0..outputs {
                let gain = mapping.get(i, o);
                if gain == 0.0 {
                    continue;
                }
                for (d, s) in out.data[o].iter_mut().zip(&self.data[i]) {
                    *d += s * gain;
                }
            }
        }
        out
    }

    /// Interleaved copy, laid out as `frame * channels + channel`.
    pub fn interleaved(&self) -> Vec<f32> {
        let channels = self.channels();
        let mut out = vec![0.0f32; self.frames * channels];
        for (c, data) in self.data.iter().enumerate() {
            for (f, s) in data.iter().enumerate() {
                out[f * channels + c] = *s;
            }
        }
        out
    }
}

/// Convert decibels to a linear multiplier.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/buffers.rs"]
mod tests;
