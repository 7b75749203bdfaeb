use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// The rate and scale value that leaves speeds and sizes untouched.
pub const NEUTRAL_LEVEL: u8 = 128;

/// The three live parameters that modulate everything being projected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlValues {
    /// Brightness applied to every object's color
    pub intensity: u8,
    /// Motion speed; 128 is the authored speed
    pub rate: u8,
    /// Draw size; 128 is the authored radius
    pub scale: u8,
}

impl Default for ControlValues {
    fn default() -> Self {
        ControlValues {
            intensity: 255,
            rate: NEUTRAL_LEVEL,
            scale: NEUTRAL_LEVEL,
        }
    }
}

impl ControlValues {
    /// `(rate / 128)²`. Squared so low settings get more resolution than a
    /// linear slider would give them.
    pub fn rate_multiplier(&self) -> f64 {
        squared_level(self.rate)
    }

    /// `(scale / 128)²`, applied to draw radii.
    pub fn scale_multiplier(&self) -> f64 {
        squared_level(self.scale)
    }
}

fn squared_level(level: u8) -> f64 {
    (level as f64 / NEUTRAL_LEVEL as f64).powi(2)
}

/// Process-wide control values. Sliders, the Control-Net receiver and the
/// render loop all share one of these; every field is its own atomic, last
/// writer wins.
#[derive(Debug)]
pub struct SharedControls {
    intensity: AtomicU8,
    rate: AtomicU8,
    scale: AtomicU8,
}

impl SharedControls {
    pub fn new(initial: ControlValues) -> Self {
        Self {
            intensity: AtomicU8::new(initial.intensity),
            rate: AtomicU8::new(initial.rate),
            scale: AtomicU8::new(initial.scale),
        }
    }

    pub fn snapshot(&self) -> ControlValues {
        ControlValues {
            intensity: self.intensity.load(Ordering::Relaxed),
            rate: self.rate.load(Ordering::Relaxed),
            scale: self.scale.load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, values: ControlValues) {
        self.set_intensity(values.intensity);
        self.set_rate(values.rate);
        self.set_scale(values.scale);
    }

    pub fn set_intensity(&self, value: u8) {
        self.intensity.store(value, Ordering::Relaxed);
    }

    pub fn set_rate(&self, value: u8) {
        self.rate.store(value, Ordering::Relaxed);
    }

    pub fn set_scale(&self, value: u8) {
        self.scale.store(value, Ordering::Relaxed);
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new(ControlValues::default())
    }
}
