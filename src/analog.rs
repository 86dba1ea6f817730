use core::num::NonZeroU16;
use core::time::Duration;

use crate::{
    InvalidConfig,
    duty::{FULL_SCALE, clamp_percent},
    hal::{AnalogInput, Clock},
    };

/// converter reference voltage, the value a 100% duty settles to after the RC filter
pub const VREF: f32 = 3.3;
/// number of conversions averaged by default
pub const DEFAULT_SAMPLES: NonZeroU16 = NonZeroU16::new(200).unwrap();

/**
    averages a burst of adc conversions into a voltage and a duty-cycle estimate.

    averaging suppresses the ripple left by the RC filter. The sum is kept in
    the integer domain so no rounding accumulates across draws.
*/
pub struct VoltageEstimator {
    samples: NonZeroU16,
    delay: Duration,
    vref: f32,
}

impl Default for VoltageEstimator {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            delay: Duration::ZERO,
            vref: VREF,
        }
    }
}

impl VoltageEstimator {
    /**
        configure a burst of `samples` conversions paced by `delay`.

        zero delay means back-to-back sampling. If the conversion hardware
        needs settling time between draws, raise the delay instead of
        spacing the bursts.
    */
    pub fn new(samples: u16, delay: Duration, vref: f32) -> Result<Self, InvalidConfig> {
        let samples = NonZeroU16::new(samples)
            .ok_or(InvalidConfig("sample count must be nonzero"))?;
        if !(vref > 0.0) {
            return Err(InvalidConfig("reference voltage must be positive"))
        }
        Ok(Self {samples, delay, vref})
    }

    /// draw one burst of conversions and return the averaged voltage in volts
    pub async fn measure<A: AnalogInput, C: Clock>(&self, adc: &mut A, clock: &C) -> f32 {
        let mut total: u32 = 0;
        for _ in 0 .. self.samples.get() {
            total += u32::from(adc.read_raw());
            if ! self.delay.is_zero() {
                clock.sleep(self.delay).await;
            }
        }
        let average = total as f32 / f32::from(self.samples.get());
        average / f32::from(FULL_SCALE) * self.vref
    }

    /// convert an averaged voltage into an estimated duty percentage, clamped to [0, 100]
    pub fn duty_percent(&self, voltage: f32) -> f32 {
        clamp_percent(voltage / self.vref * 100.0)
    }

    pub fn vref(&self) -> f32 {
        self.vref
    }
}
