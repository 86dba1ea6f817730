/*!
    transmitter role of the link.

    Drives the pwm output at the commanded duty cycle and periodically
    announces it on the serial link. Single-task cooperative polling: each
    cycle drains all buffered input before writing anything, announces, then
    keeps polling the link until the cadence deadline.
*/

use core::time::Duration;

use log::*;

use crate::{
    duty::DutyController,
    hal::{Clock, PwmOutput, SerialLink},
    protocol::{GreetingStyle, LineParser, MAX_LINE, Message, encode_greeting, encode_setpoint},
    };

/// what the transmitter periodically announces
///
/// the deployed firmwares diverged on this, so both behaviors are kept as
/// explicit configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Announce {
    /// the real protocol: the current duty as a `SET:` line
    Setpoint,
    /// the handshake greeting instead of a setpoint
    Greeting(GreetingStyle),
}

#[derive(Copy, Clone, Debug)]
pub struct TransmitterConfig {
    pub announce: Announce,
    /// period between two announcements
    pub cadence: Duration,
    /// pause between two input polls within one cadence
    pub poll_interval: Duration,
    /// pwm carrier frequency in Hz
    pub pwm_frequency: u32,
    /// duty percentage applied at startup
    pub initial_duty: f32,
    /// log received traffic at info level instead of debug
    pub log_traffic: bool,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            announce: Announce::Setpoint,
            cadence: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            pwm_frequency: 1000,
            initial_duty: 50.0,
            log_traffic: false,
        }
    }
}

/// transmitter session, owning the link, the clock and the pwm peripheral
pub struct Transmitter<B: SerialLink, P: PwmOutput, C: Clock> {
    link: B,
    clock: C,
    duty: DutyController<P>,
    parser: LineParser,
    config: TransmitterConfig,
    acknowledged: bool,
    last_measurement: Option<f32>,
    faults: u16,
}

impl<B: SerialLink, P: PwmOutput, C: Clock> Transmitter<B, P, C> {
    pub fn new(link: B, pwm: P, clock: C, config: TransmitterConfig) -> Self {
        let mut duty = DutyController::new(pwm, config.pwm_frequency);
        duty.set(config.initial_duty);
        Self {
            link, clock, duty, config,
            parser: LineParser::new(),
            acknowledged: false,
            last_measurement: None,
            faults: 0,
        }
    }

    /// command a new duty percentage, applied to the output immediately
    /// and announced at the next cadence
    pub fn set_duty(&mut self, percent: f32) -> f32 {
        self.duty.set(percent)
    }

    /// currently commanded duty percentage
    pub fn duty(&self) -> f32 {
        self.duty.current()
    }

    /// last duty estimate reported by the far side
    pub fn last_measurement(&self) -> Option<f32> {
        self.last_measurement
    }

    /// true once the far side acknowledged a greeting
    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// link faults absorbed by [run](Self::run) so far
    pub fn faults(&self) -> u16 {
        self.faults
    }

    /**
        one announcement followed by one cadence worth of input polling.

        buffered input is drained before the announcement, so a state change
        received on the link is observed before the next outgoing line.
    */
    pub async fn cycle(&mut self) -> Result<(), B::Error> {
        self.drain().await?;
        self.announce().await?;
        let deadline = self.clock.now() + self.config.cadence;
        while self.clock.now() < deadline {
            self.drain().await?;
            self.clock.sleep(self.config.poll_interval).await;
        }
        Ok(())
    }

    /// sweep the duty 0 → 100 → 0, announcing at every step
    pub async fn ramp(&mut self, step: f32, hold: Duration) -> Result<(), B::Error> {
        let mut percent = 0.0;
        while percent <= 100.0 {
            self.step(percent, hold).await?;
            percent += step;
        }
        let mut percent = 100.0;
        while percent >= 0.0 {
            self.step(percent, hold).await?;
            percent -= step;
        }
        Ok(())
    }

    async fn step(&mut self, percent: f32, hold: Duration) -> Result<(), B::Error> {
        self.set_duty(percent);
        self.drain().await?;
        self.announce().await?;
        self.clock.sleep(hold).await;
        Ok(())
    }

    /// run cycles forever, absorbing link faults so the loop stays available
    pub async fn run(&mut self) {
        loop {
            if let Err(error) = self.cycle().await {
                warn!("transmitter link fault: {error:?}");
                self.faults = self.faults.saturating_add(1);
            }
        }
    }

    async fn announce(&mut self) -> Result<(), B::Error> {
        let line = match self.config.announce {
            Announce::Setpoint => encode_setpoint(self.duty.current()),
            Announce::Greeting(style) => encode_greeting(style),
        };
        self.link.write_all(&line).await
    }

    /// parse and handle everything currently buffered on the link
    async fn drain(&mut self) -> Result<(), B::Error> {
        let mut chunk = [0u8; MAX_LINE];
        while self.link.has_data().await? {
            let count = self.link.read(&mut chunk).await?;
            if count == 0 {
                break
            }
            for message in self.parser.feed(&chunk[.. count]) {
                match message {
                    Ok(Message::Acknowledge) => {
                        self.acknowledged = true;
                        if self.config.log_traffic {
                            info!("greeting acknowledged");
                        }
                    },
                    Ok(Message::Measurement(percent)) => {
                        self.last_measurement = Some(percent);
                        if self.config.log_traffic {
                            info!("far side estimates {percent:.2}%");
                        }
                        else {
                            debug!("far side estimates {percent:.2}%");
                        }
                    },
                    // received setpoints stay informational, the local
                    // commands are the single writer of the duty value
                    Ok(other) => debug!("ignoring {other:?}"),
                    Err(error) => debug!("dropping line: {error}"),
                }
            }
        }
        Ok(())
    }
}
