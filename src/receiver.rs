/*!
    receiver role of the link.

    Samples the RC-filtered voltage produced by the far side's pwm output,
    averages it into a duty-cycle estimate and reports it back as a `MEAS:`
    line. Incoming setpoints are recorded for diagnostics only, this node
    does not drive an output of its own.
*/

use core::time::Duration;

use log::*;

use crate::{
    analog::VoltageEstimator,
    hal::{AnalogInput, Clock, SerialLink},
    protocol::{LineParser, MAX_LINE, Message, encode_ack, encode_measurement},
    };

#[derive(Copy, Clone, Debug)]
pub struct ReceiverConfig {
    /// period between two measurements
    pub cadence: Duration,
    /// reply `ACK:hello` to received greetings
    pub acknowledge: bool,
    /// log received traffic at info level instead of debug
    pub log_traffic: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(500),
            acknowledge: true,
            log_traffic: true,
        }
    }
}

/// receiver session, owning the link, the clock and the adc peripheral
pub struct Receiver<B: SerialLink, A: AnalogInput, C: Clock> {
    link: B,
    adc: A,
    clock: C,
    estimator: VoltageEstimator,
    parser: LineParser,
    config: ReceiverConfig,
    setpoint: Option<f32>,
    greeted: bool,
    faults: u16,
}

impl<B: SerialLink, A: AnalogInput, C: Clock> Receiver<B, A, C> {
    pub fn new(link: B, adc: A, clock: C, estimator: VoltageEstimator, config: ReceiverConfig) -> Self {
        Self {
            link, adc, clock, estimator, config,
            parser: LineParser::new(),
            setpoint: None,
            greeted: false,
            faults: 0,
        }
    }

    /// last setpoint announced by the far side, informational only
    pub fn last_setpoint(&self) -> Option<f32> {
        self.setpoint
    }

    /// link faults absorbed by [run](Self::run) so far
    pub fn faults(&self) -> u16 {
        self.faults
    }

    /**
        one measurement cycle: drain and handle buffered input, acknowledge a
        pending greeting, then sample, estimate and report.

        all buffered input is handled before anything is written, so a
        setpoint received in this cycle is already recorded when the
        measurement goes out.
    */
    pub async fn cycle(&mut self) -> Result<(), B::Error> {
        self.drain().await?;
        if core::mem::take(&mut self.greeted) && self.config.acknowledge {
            self.link.write_all(&encode_ack()).await?;
        }
        let voltage = self.estimator.measure(&mut self.adc, &self.clock).await;
        let duty = self.estimator.duty_percent(voltage);
        debug!("averaged {voltage:.3} V, estimated duty {duty:.2}%");
        self.link.write_all(&encode_measurement(duty)).await
    }

    /// run cycles on the configured cadence forever, absorbing link faults
    pub async fn run(&mut self) {
        loop {
            if let Err(error) = self.cycle().await {
                warn!("receiver link fault: {error:?}");
                self.faults = self.faults.saturating_add(1);
            }
            self.clock.sleep(self.config.cadence).await;
        }
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
                    Ok(Message::Setpoint(percent)) => {
                        self.setpoint = Some(percent);
                        if self.config.log_traffic {
                            info!("far side commands {percent:.2}%");
                        }
                    },
                    Ok(Message::Greeting) => {
                        self.greeted = true;
                        if self.config.log_traffic {
                            info!("greeting received");
                        }
                    },
                    Ok(Message::Unknown(text)) => {
                        if self.config.log_traffic {
                            info!("unclassified line: {text:?}");
                        }
                        else {
                            debug!("unclassified line: {text:?}");
                        }
                    },
                    Ok(other) => debug!("ignoring {other:?}"),
                    Err(error) => debug!("dropping line: {error}"),
                }
            }
        }
        Ok(())
    }
}
