//! Time scales and the scale-tagged epoch type shared across crates.

use std::error::Error;
use std::fmt;

use crate::constants::{DAYS_PER_CENTURY, SECONDS_PER_DAY};

/// Astronomical time scales an [`Epoch`] can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeScale {
    /// Coordinated Universal Time.
    Utc,
    /// International Atomic Time.
    Tai,
    /// Terrestrial Time.
    Tt,
    /// Barycentric Dynamical Time.
    Tdb,
    /// Universal Time (Earth-rotation based).
    Ut1,
}

impl TimeScale {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utc => "UTC",
            Self::Tai => "TAI",
            Self::Tt => "TT",
            Self::Tdb => "TDB",
            Self::Ut1 => "UT1",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "UTC" => Some(Self::Utc),
            "TAI" => Some(Self::Tai),
            "TT" => Some(Self::Tt),
            "TDB" => Some(Self::Tdb),
            "UT1" => Some(Self::Ut1),
            _ => None,
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instant in time: a continuous count of seconds since the J2000
/// reference instant (2000-01-01 12:00:00 read on the tagged scale's own
/// calendar), tagged with its [`TimeScale`].
///
/// Epoch arithmetic never mixes scales silently: [`Epoch::duration_since`]
/// fails on a scale mismatch, and conversions go through a time-scale
/// provider explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    seconds: f64,
    scale: TimeScale,
}

impl Epoch {
    /// Epoch from seconds past J2000 in the given scale.
    pub fn from_seconds_since_j2000(seconds: f64, scale: TimeScale) -> Self {
        Self { seconds, scale }
    }

    /// Seconds past J2000 in this epoch's own scale.
    pub fn seconds_since_j2000(&self) -> f64 {
        self.seconds
    }

    /// Julian days past J2000 in this epoch's own scale.
    pub fn days_since_j2000(&self) -> f64 {
        self.seconds / SECONDS_PER_DAY
    }

    /// Julian centuries past J2000 in this epoch's own scale.
    pub fn centuries_since_j2000(&self) -> f64 {
        self.days_since_j2000() / DAYS_PER_CENTURY
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// A new epoch `seconds` later (earlier if negative) on the same scale.
    pub fn offset_by(&self, seconds: f64) -> Epoch {
        Epoch {
            seconds: self.seconds + seconds,
            scale: self.scale,
        }
    }

    /// Signed seconds elapsed from `other` to `self`. Both epochs must carry
    /// the same time scale; convert explicitly first otherwise.
    pub fn duration_since(&self, other: &Epoch) -> Result<f64, TimeError> {
        if self.scale != other.scale {
            return Err(TimeError::ScaleMismatch {
                left: self.scale,
                right: other.scale,
            });
        }
        Ok(self.seconds - other.seconds)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J2000{:+.3}s {}", self.seconds, self.scale)
    }
}

/// Errors from epoch arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Arithmetic attempted between epochs on different time scales.
    ScaleMismatch { left: TimeScale, right: TimeScale },
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::ScaleMismatch { left, right } => {
                write!(f, "epoch arithmetic mixed time scales {left} and {right}")
            }
        }
    }
}

impl Error for TimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_between_matching_scales() {
        let a = Epoch::from_seconds_since_j2000(100.0, TimeScale::Tdb);
        let b = Epoch::from_seconds_since_j2000(40.0, TimeScale::Tdb);
        assert_eq!(a.duration_since(&b).unwrap(), 60.0);
    }

    #[test]
    fn mixed_scales_are_rejected() {
        let a = Epoch::from_seconds_since_j2000(0.0, TimeScale::Utc);
        let b = Epoch::from_seconds_since_j2000(0.0, TimeScale::Tt);
        assert_eq!(
            a.duration_since(&b),
            Err(TimeError::ScaleMismatch {
                left: TimeScale::Utc,
                right: TimeScale::Tt,
            })
        );
    }

    #[test]
    fn offset_preserves_scale() {
        let a = Epoch::from_seconds_since_j2000(0.0, TimeScale::Tdb);
        let later = a.offset_by(5400.0);
        assert_eq!(later.scale(), TimeScale::Tdb);
        assert_eq!(later.duration_since(&a).unwrap(), 5400.0);
    }
}
