/*!
    abstract peripheral interfaces consumed by the link roles.

    the crate never touches hardware directly, platform adapters implement
    these traits on top of the actual hal. Adapters for embedded-io-async
    uarts and host serial ports are provided behind the `embedded` and
    `host` features.
*/

use core::time::Duration;

/// pwm peripheral driving the output pin filtered by the RC network
pub trait PwmOutput {
    /// program the carrier frequency
    fn set_frequency(&mut self, hz: u32);
    /// program the duty register, full scale is 65535
    fn set_duty(&mut self, value: u16);
    /// stop driving the pin, called when the controller is released
    fn disable(&mut self);
}

/// adc peripheral sampling the RC filter output
pub trait AnalogInput {
    /// one blocking conversion, 16bit full scale
    fn read_raw(&mut self) -> u16;
}

/// byte-level serial transport joining the two nodes
///
/// line reassembly is not the transport's job, [LineParser](crate::LineParser)
/// buffers partial arrivals across reads
#[allow(async_fn_in_trait)]
pub trait SerialLink {
    type Error: core::fmt::Debug;

    /// queue the whole buffer for transmission
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
    /// true when at least one byte is ready, must not wait for data to arrive
    async fn has_data(&mut self) -> Result<bool, Self::Error>;
    /// read already-available bytes, may return 0 when nothing is pending
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

/// time source pacing the session loops and the adc sampling
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// suspend the current task for the given duration
    async fn sleep(&self, duration: Duration);
    /// monotonic timestamp, only differences are meaningful
    fn now(&self) -> Duration;
}
