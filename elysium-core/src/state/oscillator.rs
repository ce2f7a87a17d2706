//! Periodic modulation sources for knobs.

use std::f64::consts::TAU;

use elysium_types::{OscillatorData, Waveform};

use crate::error::{EngineError, EngineResult};

/// A bounded periodic function of logical time (in steps).
///
/// Every shape stays inside `[minimum, maximum]` for all `t` and repeats
/// with `period`. Construction and updates reject a non-positive period and
/// an inverted range, so `sample` itself cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    shape: Waveform,
    enabled: bool,
    minimum: f32,
    maximum: f32,
    period: f32,
}

impl Oscillator {
    pub fn new(shape: Waveform, minimum: f32, maximum: f32, period: f32) -> EngineResult<Self> {
        check_period(period)?;
        check_range(minimum, maximum)?;
        Ok(Self {
            shape,
            enabled: true,
            minimum,
            maximum,
            period,
        })
    }

    pub fn sine(minimum: f32, maximum: f32, period: f32) -> EngineResult<Self> {
        Self::new(Waveform::Sine, minimum, maximum, period)
    }

    pub fn shape(&self) -> Waveform {
        self.shape
    }

    pub fn set_shape(&mut self, shape: Waveform) {
        self.shape = shape;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn minimum(&self) -> f32 {
        self.minimum
    }

    pub fn maximum(&self) -> f32 {
        self.maximum
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn set_period(&mut self, period: f32) -> EngineResult {
        check_period(period)?;
        self.period = period;
        Ok(())
    }

    pub fn set_range(&mut self, minimum: f32, maximum: f32) -> EngineResult {
        check_range(minimum, maximum)?;
        self.minimum = minimum;
        self.maximum = maximum;
        Ok(())
    }

    /// Value of the waveform at logical time `t`.
    pub fn sample(&self, t: f64) -> f32 {
        let min = self.minimum as f64;
        let max = self.maximum as f64;
        let range = max - min;
        let phase = (t / self.period as f64).rem_euclid(1.0);
        let value = match self.shape {
            Waveform::Sine => {
                let amplitude = range / 2.0;
                let offset = (max + min) / 2.0;
                offset + amplitude * (TAU * phase).sin()
            }
            Waveform::Square => {
                if phase < 0.5 {
                    max
                } else {
                    min
                }
            }
            Waveform::Saw => min + range * phase,
            Waveform::Triangle => {
                if phase < 0.5 {
                    min + range * phase * 2.0
                } else {
                    max - range * (phase * 2.0 - 1.0)
                }
            }
        };
        (value as f32).clamp(self.minimum, self.maximum)
    }

    pub fn to_data(&self) -> OscillatorData {
        OscillatorData {
            shape: self.shape,
            enabled: self.enabled,
            minimum: self.minimum,
            maximum: self.maximum,
            period: self.period,
        }
    }

    pub fn from_data(data: &OscillatorData) -> EngineResult<Self> {
        let mut osc = Self::new(data.shape, data.minimum, data.maximum, data.period)?;
        osc.enabled = data.enabled;
        Ok(osc)
    }
}

fn check_period(period: f32) -> EngineResult {
    if period.is_finite() && period > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidPeriod(period))
    }
}

fn check_range(minimum: f32, maximum: f32) -> EngineResult {
    if minimum.is_finite() && maximum.is_finite() && minimum <= maximum {
        Ok(())
    } else {
        Err(EngineError::InvalidRange { minimum, maximum, stepping: 0.0 })
    }
}
