use crate::foundation::core::Frame;

/// Ticks per second of every time type in this crate.
pub const HZ: i64 = 96_000;

macro_rules! time_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// The zero time.
            pub const ZERO: Self = Self(0);

            /// Time at which frame `frames` starts when running at `rate` frames per second.
            pub fn from_frames(frames: Frame, rate: f64) -> Self {
                Self(((frames as f64) * (HZ as f64) / rate).round() as i64)
            }

            /// Time from a duration in seconds.
            pub fn from_seconds(secs: f64) -> Self {
                Self((secs * HZ as f64).round() as i64)
            }

            /// Time from a duration in milliseconds.
            pub fn from_millis(ms: i64) -> Self {
                Self(ms * HZ / 1000)
            }

            /// Raw tick count.
            pub fn get(self) -> i64 {
                self.0
            }

            /// Value in seconds.
            pub fn seconds(self) -> f64 {
                self.0 as f64 / HZ as f64
            }

            /// Frame count at `rate`, rounded to nearest.
            pub fn frames_round(self, rate: f64) -> Frame {
                ((self.0 as f64) * rate / (HZ as f64)).round() as Frame
            }

            /// Frame count at `rate`, rounded down.
            pub fn frames_floor(self, rate: f64) -> Frame {
                ((self.0 as f64) * rate / (HZ as f64)).floor() as Frame
            }

            /// Frame count at `rate`, rounded up.
            pub fn frames_ceil(self, rate: f64) -> Frame {
                ((self.0 as f64) * rate / (HZ as f64)).ceil() as Frame
            }

            /// Return `true` for the zero time.
            pub fn is_zero(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl std::ops::SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }
    };
}

time_type!(
    /// Position on the package timeline.
    DcpTime
);

time_type!(
    /// Position or duration within a piece of source content.
    ContentTime
);

/// Half-open period `[from, to)` on the package timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TimePeriod {
    /// Inclusive start.
    pub from: DcpTime,
    /// Exclusive end.
    pub to: DcpTime,
}

impl TimePeriod {
    /// Create a period from its bounds.
    pub fn new(from: DcpTime, to: DcpTime) -> Self {
        Self { from, to }
    }

    /// Length of the period.
    pub fn duration(self) -> DcpTime {
        self.to - self.from
    }

    /// Return `true` when `t` is inside `[from, to)`.
    pub fn contains(self, t: DcpTime) -> bool {
        self.from <= t && t < self.to
    }

    /// Intersection with `other`, if it is non-empty.
    pub fn overlap(self, other: TimePeriod) -> Option<TimePeriod> {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to);
        (from < to).then_some(TimePeriod { from, to })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/time.rs"]
mod tests;
