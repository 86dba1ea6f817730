use log::*;

use crate::hal::PwmOutput;

/// full scale of the 16bit duty register
pub const FULL_SCALE: u16 = u16::MAX;

/// clamp a percentage into [0, 100], out-of-range input is corrected silently
pub fn clamp_percent(percent: f32) -> f32 {
    percent.clamp(0.0, 100.0)
}

/// convert a clamped percentage to the peripheral's 16bit fixed-point duty
pub fn duty_u16(percent: f32) -> u16 {
    // round to nearest, input is non-negative after clamping
    (percent / 100.0 * f32::from(FULL_SCALE) + 0.5) as u16
}

/**
    owns the commanded duty-cycle percentage and the pwm peripheral producing it.

    every state change is immediately reflected on the output pin, there is no
    deferred-apply mode. Dropping the controller disables the output, so the pin
    ends up in a safe state on every exit path of a session.
*/
pub struct DutyController<P: PwmOutput> {
    pwm: P,
    percent: f32,
}

impl<P: PwmOutput> DutyController<P> {
    /// take over the pwm peripheral, program its carrier frequency and start at 0%
    pub fn new(mut pwm: P, frequency_hz: u32) -> Self {
        pwm.set_frequency(frequency_hz);
        pwm.set_duty(0);
        Self {pwm, percent: 0.0}
    }

    /// clamp, store and drive the output, returns the value actually applied
    pub fn set(&mut self, percent: f32) -> f32 {
        let percent = clamp_percent(percent);
        self.percent = percent;
        self.pwm.set_duty(duty_u16(percent));
        debug!("duty set to {percent:.2}%");
        percent
    }

    /// last stored percentage
    pub fn current(&self) -> f32 {
        self.percent
    }
}

impl<P: PwmOutput> Drop for DutyController<P> {
    fn drop(&mut self) {
        self.pwm.disable();
    }
}
