use crate::foundation::core::Frame;
use crate::foundation::time::ContentTime;

/// Logarithmic fade-in gain at normalized position `t`.
///
/// `t` is clamped to `[0, 1]`, so positions before the fade are silent and positions after it are
/// unity.
pub fn fade_in_curve(t: f32) -> f32 {
    let c = t.clamp(0.0, 1.0);
    (2.0 * (c - 1.0)).exp() * c
}

/// Logarithmic fade-out gain at normalized position `t`.
pub fn fade_out_curve(t: f32) -> f32 {
    let c = t.clamp(0.0, 1.0);
    (-2.0 * c).exp() * (1.0 - c)
}

/// Fade and trim parameters resolved for one stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FadeEnvelope {
    /// Length of the fade-in; zero for none.
    pub fade_in: ContentTime,
    /// Length of the fade-out; zero for none.
    pub fade_out: ContentTime,
    /// Time trimmed from the start of the content.
    pub trim_start: ContentTime,
    /// Time trimmed from the end of the content.
    pub trim_end: ContentTime,
    /// Untrimmed length of the stream.
    pub stream_length: ContentTime,
}

impl FadeEnvelope {
    /// Per-sample gain for `[frame, frame + length)` at `rate` samples per second.
    ///
    /// Returns an empty vector when the window needs no envelope at all. The fade-in starts at
    /// the trimmed start and the fade-out ends at the trimmed end; overlapping fades multiply.
    pub fn coefficients(&self, frame: Frame, length: usize, rate: u32) -> Vec<f32> {
        let rate = f64::from(rate);
        let fade_in = self.fade_in.frames_round(rate);
        let fade_out = self.fade_out.frames_round(rate);
        let trim_start = self.trim_start.frames_round(rate);
        let trim_end = (self.stream_length - self.trim_end).frames_round(rate);
        let length_frames = length as Frame;

        let after_fade_in = fade_in == 0 || frame >= trim_start + fade_in;
        let before_fade_out = fade_out == 0 || frame + length_frames < trim_end - fade_out;
        if after_fade_in && before_fade_out {
            return Vec::new();
        }

        let mut coeffs = vec![1.0f32; length];
        if fade_in > 0 {
            let start = frame - trim_start;
            for (i, c) in coeffs.iter_mut().enumerate() {
                *c *= fade_in_curve((start + i as Frame) as f32 / fade_in as f32);
            }
        }
        if fade_out > 0 {
            let start = frame - (trim_end - fade_out);
            for (i, c) in coeffs.iter_mut().enumerate() {
                *c *= fade_out_curve((start + i as Frame) as f32 / fade_out as f32);
            }
        }
        coeffs
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/fade.rs"]
mod tests;
