use crate::foundation::core::MAX_DCP_AUDIO_CHANNELS;

/// Index of the centre channel in package channel order (L, R, C, Lfe, Ls, Rs, ...).
pub const CENTRE_CHANNEL: usize = 2;

/// Gain matrix from input (content) channels to output (package) channels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioMapping {
    input_channels: usize,
    output_channels: usize,
    /// Row-major `input_channels x output_channels` linear gains.
    gain: Vec<f32>,
}

impl Default for AudioMapping {
    fn default() -> Self {
        Self::new(0, MAX_DCP_AUDIO_CHANNELS)
    }
}

impl AudioMapping {
    /// Mapping with every gain zero (silence).
    pub fn new(input_channels: usize, output_channels: usize) -> Self {
        Self {
            input_channels,
            output_channels,
            gain: vec![0.0; input_channels * output_channels],
        }
    }

    /// Sensible default routing: mono to centre, otherwise input `n` to output `n`.
    pub fn make_default(input_channels: usize, output_channels: usize) -> Self {
        let mut m = Self::new(input_channels, output_channels);
        if input_channels == 1 && output_channels > CENTRE_CHANNEL {
            m.set(0, CENTRE_CHANNEL, 1.0);
        } else {
            for i in 0..input_channels.min(output_channels) {
                m.set(i, i, 1.0);
            }
        }
        m
    }

    /// Reset every gain to zero.
    pub fn make_zero(&mut self) {
        self.gain.fill(0.0);
    }

    /// Number of input channels.
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Number of output channels.
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Gain from `input` to `output`; out-of-range pairs are silent.
    pub fn get(&self, input: usize, output: usize) -> f32 {
        if input >= self.input_channels || output >= self.output_channels {
            return 0.0;
        }
        self.gain[input * self.output_channels + output]
    }

    /// Set the gain from `input` to `output`; out-of-range pairs are ignored.
    pub fn set(&mut self, input: usize, output: usize, gain: f32) {
        if input >= self.input_channels || output >= self.output_channels {
            return;
        }
        self.gain[input * self.output_channels + output] = gain;
    }

    /// Output channels that receive any signal, ascending.
    pub fn mapped_output_channels(&self) -> Vec<usize> {
        (0..self.output_channels)
            .filter(|&o| (0..self.input_channels).any(|i| self.get(i, o).abs() > f32::EPSILON))
            .collect()
    }

    /// Short human-readable summary of the non-zero routes.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for i in 0..self.input_channels {
            for o in 0..self.output_channels {
                let g = self.get(i, o);
                if g != 0.0 {
                    parts.push(format!("{i}->{o}@{g:.2}"));
                }
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mapping.rs"]
mod tests;
