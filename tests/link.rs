//! both link roles wired back to back over an in-memory serial pair,
//! with the RC filter idealized as an adc reading the pwm duty register

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::time::Duration;
use std::collections::VecDeque;
use std::rc::Rc;

use dutylink::{
    AnalogInput, Clock, GreetingStyle, LineParser, Message, PwmOutput, SerialLink,
    VoltageEstimator,
    receiver::{Receiver, ReceiverConfig},
    transmitter::{Announce, Transmitter, TransmitterConfig},
    };

/// one direction of the serial wire
#[derive(Clone, Default)]
struct Wire(Rc<RefCell<VecDeque<u8>>>);

struct TestLink {
    rx: Wire,
    tx: Wire,
}

/// two link endpoints joined crosswise
fn wire_pair() -> (TestLink, TestLink) {
    let _ = env_logger::builder().is_test(true).try_init();
    let a = Wire::default();
    let b = Wire::default();
    (
        TestLink {rx: a.clone(), tx: b.clone()},
        TestLink {rx: b, tx: a},
    )
}

impl SerialLink for TestLink {
    type Error = Infallible;

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.tx.0.borrow_mut().extend(bytes.iter().copied());
        Ok(())
    }
    async fn has_data(&mut self) -> Result<bool, Self::Error> {
        Ok(! self.rx.0.borrow().is_empty())
    }
    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let mut queue = self.rx.0.borrow_mut();
        let count = queue.len().min(buffer.len());
        for slot in &mut buffer[.. count] {
            *slot = queue.pop_front().unwrap();
        }
        Ok(count)
    }
}

/// virtual time advancing on every sleep, so cadence polling terminates instantly
#[derive(Clone, Default)]
struct TestClock(Rc<Cell<Duration>>);

impl Clock for TestClock {
    async fn sleep(&self, duration: Duration) {
        self.0.set(self.0.get() + duration);
    }
    fn now(&self) -> Duration {
        self.0.get()
    }
}

#[derive(Default)]
struct RigState {
    duty: u16,
    disabled: bool,
}

/// the bench: pwm output and adc input joined by a ripple-free RC filter
#[derive(Clone, Default)]
struct Rig(Rc<RefCell<RigState>>);

impl PwmOutput for Rig {
    fn set_frequency(&mut self, _hz: u32) {}
    fn set_duty(&mut self, value: u16) {
        self.0.borrow_mut().duty = value;
    }
    fn disable(&mut self) {
        self.0.borrow_mut().disabled = true;
    }
}
impl AnalogInput for Rig {
    fn read_raw(&mut self) -> u16 {
        self.0.borrow().duty
    }
}

fn transmitter(link: TestLink, rig: &Rig, clock: &TestClock, announce: Announce)
    -> Transmitter<TestLink, Rig, TestClock>
{
    Transmitter::new(link, rig.clone(), clock.clone(), TransmitterConfig {
        announce,
        ..Default::default()
        })
}

fn receiver(link: TestLink, rig: &Rig, clock: &TestClock) -> Receiver<TestLink, Rig, TestClock> {
    Receiver::new(
        link,
        rig.clone(),
        clock.clone(),
        VoltageEstimator::default(),
        ReceiverConfig::default(),
        )
}

#[tokio::test]
async fn handshake_and_measurement() {
    let (near, far) = wire_pair();
    let rig = Rig::default();
    let clock = TestClock::default();
    let mut tx = transmitter(near, &rig, &clock, Announce::Greeting(GreetingStyle::Plain));
    let mut rx = receiver(far, &rig, &clock);

    tx.cycle().await.unwrap();
    rx.cycle().await.unwrap();
    tx.cycle().await.unwrap();

    assert!(tx.acknowledged());
    let measured = tx.last_measurement().expect("no measurement came back");
    // default initial duty is 50%, the ideal rig reports it back unchanged
    assert!((measured - 50.0).abs() < 0.05, "measured {measured}");
}

#[tokio::test]
async fn setpoint_announcement_clamps() {
    let (near, far) = wire_pair();
    let to_receiver = near.tx.clone();
    let rig = Rig::default();
    let clock = TestClock::default();
    let mut tx = transmitter(near, &rig, &clock, Announce::Setpoint);
    let mut rx = receiver(far, &rig, &clock);

    assert_eq!(tx.set_duty(150.0), 100.0);
    tx.cycle().await.unwrap();

    // exact wire format of the announcement
    let announced: Vec<u8> = to_receiver.0.borrow().iter().copied().collect();
    assert_eq!(&announced[..], b"SET:100.00\n");

    rx.cycle().await.unwrap();
    assert_eq!(rx.last_setpoint(), Some(100.0));

    tx.cycle().await.unwrap();
    let measured = tx.last_measurement().expect("no measurement came back");
    assert!((measured - 100.0).abs() < 0.05, "measured {measured}");
}

#[tokio::test]
async fn measurement_tracks_duty() {
    let (near, far) = wire_pair();
    let rig = Rig::default();
    let clock = TestClock::default();
    let mut tx = transmitter(near, &rig, &clock, Announce::Setpoint);
    let mut rx = receiver(far, &rig, &clock);

    for duty in [0.0_f32, 25.5, 73.2, 100.0] {
        tx.set_duty(duty);
        tx.cycle().await.unwrap();
        rx.cycle().await.unwrap();
        tx.cycle().await.unwrap();
        let measured = tx.last_measurement().unwrap();
        assert!((measured - duty).abs() < 0.05, "commanded {duty}, measured {measured}");
    }
}

#[tokio::test]
async fn garbage_on_the_wire() {
    let (near, far) = wire_pair();
    let rig = Rig::default();
    let clock = TestClock::default();
    let mut rx = receiver(far, &rig, &clock);

    // malformed and unclassifiable lines keep the receiver available
    near.tx.0.borrow_mut()
        .extend(b"SET:oops\nnoise\n\xff\xfe\nSET:33.00\nSET:1".iter().copied());
    rx.cycle().await.unwrap();
    assert_eq!(rx.last_setpoint(), Some(33.0));
    assert_eq!(rx.faults(), 0);

    // the split line completes on the next arrival
    near.tx.0.borrow_mut().extend(b"2.00\n".iter().copied());
    rx.cycle().await.unwrap();
    assert_eq!(rx.last_setpoint(), Some(12.0));
}

#[tokio::test]
async fn ramp_sweeps_and_announces() {
    let (near, far) = wire_pair();
    let rig = Rig::default();
    let clock = TestClock::default();
    let mut tx = transmitter(near, &rig, &clock, Announce::Setpoint);

    tx.ramp(25.0, Duration::from_millis(10)).await.unwrap();
    assert_eq!(tx.duty(), 0.0);

    // 0..100 up then 100..0 down, one announcement per step
    let bytes: Vec<u8> = far.rx.0.borrow().iter().copied().collect();
    let mut parser = LineParser::new();
    let setpoints: Vec<f32> = parser.feed(&bytes)
        .map(|message| match message {
            Ok(Message::Setpoint(value)) => value,
            other => panic!("unexpected announcement {other:?}"),
            })
        .collect();
    assert_eq!(setpoints, [0.0, 25.0, 50.0, 75.0, 100.0, 100.0, 75.0, 50.0, 25.0, 0.0]);
}

#[tokio::test]
async fn pwm_released_with_session() {
    let (near, _far) = wire_pair();
    let rig = Rig::default();
    let clock = TestClock::default();
    let tx = transmitter(near, &rig, &clock, Announce::Setpoint);

    assert!(! rig.0.borrow().disabled);
    drop(tx);
    assert!(rig.0.borrow().disabled);
}
