//! Animation drivers.
//!
//! A driver animates one channel (translation, rotation, or scale) of one
//! node with a time-indexed keyframe sequence. Drivers are created at scene
//! load and read-only afterwards; the per-frame walk samples them with the
//! current playback time.

use glam::{Quat, Vec3};

use crate::errors::{HeliosError, Result};
use crate::math;
use crate::s72::{self, Value};

/// Which transform channel a driver overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Translation,
    Rotation,
    Scale,
}

/// Keyframe interpolation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    Slerp,
}

/// Keyframe payload: Vec3 for translation/scale, Quat for rotation.
#[derive(Debug, Clone)]
pub enum Keyframes {
    Vec3(Vec<Vec3>),
    Quat(Vec<Quat>),
}

/// A sampled driver value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Vec3(Vec3),
    Quat(Quat),
}

#[derive(Debug, Clone)]
pub struct Driver {
    /// Document index of the target node.
    pub target: usize,
    pub channel: Channel,
    pub interpolation: Interpolation,
    /// Strictly increasing key times in seconds.
    pub times: Vec<f32>,
    pub values: Keyframes,
}

impl Driver {
    /// Builds a driver from a `DRIVER` document element.
    pub fn from_value(value: &Value) -> Result<Self> {
        let target = s72::require_number(value, "node", "DRIVER")? as usize;
        let channel = match s72::require_str(value, "channel", "DRIVER")? {
            "translation" => Channel::Translation,
            "rotation" => Channel::Rotation,
            "scale" => Channel::Scale,
            other => {
                return Err(HeliosError::Format(format!("unknown driver channel '{other}'")));
            }
        };
        let interpolation = match s72::require_str(value, "interpolation", "DRIVER")? {
            "STEP" => Interpolation::Step,
            "LINEAR" => Interpolation::Linear,
            "SLERP" => Interpolation::Slerp,
            other => {
                return Err(HeliosError::Format(format!(
                    "unknown driver interpolation '{other}'"
                )));
            }
        };

        let times: Vec<f32> = s72::require_array(value, "times", "DRIVER")?
            .iter()
            .map(|t| {
                t.as_number()
                    .ok_or_else(|| HeliosError::Format("driver time is not a number".into()))
            })
            .collect::<Result<_>>()?;
        if times.is_empty() {
            return Err(HeliosError::Format("driver has no keyframes".into()));
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HeliosError::Format(
                "driver times must be strictly increasing".into(),
            ));
        }

        let raw: Vec<f32> = s72::require_array(value, "values", "DRIVER")?
            .iter()
            .map(|v| {
                v.as_number()
                    .ok_or_else(|| HeliosError::Format("driver value is not a number".into()))
            })
            .collect::<Result<_>>()?;

        let lanes = if channel == Channel::Rotation { 4 } else { 3 };
        if raw.len() != times.len() * lanes {
            return Err(HeliosError::Format(format!(
                "driver has {} values for {} times (expected {} per key)",
                raw.len(),
                times.len(),
                lanes
            )));
        }

        let values = if channel == Channel::Rotation {
            Keyframes::Quat(
                raw.chunks_exact(4)
                    .map(|c| Quat::from_xyzw(c[0], c[1], c[2], c[3]))
                    .collect(),
            )
        } else {
            Keyframes::Vec3(
                raw.chunks_exact(3)
                    .map(|c| Vec3::new(c[0], c[1], c[2]))
                    .collect(),
            )
        };

        Ok(Self {
            target,
            channel,
            interpolation,
            times,
            values,
        })
    }

    /// Samples the driver at `time` seconds.
    ///
    /// The animation wraps modulo the last key time. Sampling at a key time
    /// returns that key's value exactly for every interpolation mode.
    #[must_use]
    pub fn sample(&self, time: f32) -> Sample {
        let last = *self.times.last().expect("driver has keys");
        let time = time.rem_euclid(last.max(f32::MIN_POSITIVE));

        // partition_point yields the first index with times[i] > time;
        // the segment start is the key before it.
        let upper = self.times.partition_point(|&t| t <= time);
        if upper == 0 {
            return self.key(0);
        }
        let lo = upper - 1;
        if upper >= self.times.len() {
            return self.key(self.times.len() - 1);
        }

        let t0 = self.times[lo];
        let t1 = self.times[upper];
        let span = t1 - t0;
        let t = if span > 1e-6 { (time - t0) / span } else { 0.0 };

        match self.interpolation {
            Interpolation::Step => self.key(lo),
            Interpolation::Linear => self.mix(lo, upper, t, false),
            Interpolation::Slerp => self.mix(lo, upper, t, true),
        }
    }

    fn key(&self, index: usize) -> Sample {
        match &self.values {
            Keyframes::Vec3(v) => Sample::Vec3(v[index]),
            Keyframes::Quat(q) => Sample::Quat(q[index]),
        }
    }

    fn mix(&self, lo: usize, hi: usize, t: f32, spherical: bool) -> Sample {
        match &self.values {
            Keyframes::Vec3(v) => Sample::Vec3(math::lerp(v[lo], v[hi], t)),
            Keyframes::Quat(q) => {
                if spherical {
                    Sample::Quat(math::slerp(q[lo], q[hi], t))
                } else {
                    // Componentwise mix, renormalized so the rotation stays unit.
                    Sample::Quat(q[lo].lerp(q[hi], t).normalize())
                }
            }
        }
    }
}
