//! Rotary encoder source and software quadrature decoder.

use std::cmp;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::source::{DigitalInput, Encoder, KeySource};
use super::state::KeyFsm;
use crate::key::{ROTARY_DIRECTIONS, RotaryDirection};

/// Quarter-step delta indexed by `previous phase << 2 | current phase`,
/// where a phase is `A << 1 | B`. Invalid double steps count as zero.
const QUADRATURE_STEPS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Rotary encoder exposed as two pseudo-keys, decrement and increment.
///
/// The encoder position is compared with the previous poll; at most one of
/// the two pseudo-keys is raw-pressed per poll.
pub struct RotaryEncoder {
    encoder: Box<dyn Encoder>,
    last: i64,
    invert: bool,
}

impl RotaryEncoder {
    /// Wrap `encoder`; the current position is the reference for the first poll
    pub fn new(encoder: impl Encoder + 'static, invert: bool) -> Self {
        let mut encoder: Box<dyn Encoder> = Box::new(encoder);
        let last = encoder.position();
        Self {
            encoder,
            last,
            invert,
        }
    }

    /// Read the encoder and derive the raw direction signals
    fn directions(&mut self) -> [bool; ROTARY_DIRECTIONS] {
        let position = self.encoder.position();
        let mut raw = [false; ROTARY_DIRECTIONS];
        match position.cmp(&self.last) {
            cmp::Ordering::Less => raw[RotaryDirection::Decrement as usize] = true,
            cmp::Ordering::Greater => raw[RotaryDirection::Increment as usize] = true,
            cmp::Ordering::Equal => {}
        }
        if self.invert {
            raw.swap(0, 1);
        }
        if position != self.last {
            trace!("encoder moved {} -> {}", self.last, position);
        }
        self.last = position;
        raw
    }
}

impl KeySource for RotaryEncoder {
    fn key_count(&self) -> usize {
        ROTARY_DIRECTIONS
    }

    fn fsm(&self) -> KeyFsm {
        KeyFsm::Rotary
    }

    fn scan(&mut self, sink: &mut dyn FnMut(usize, bool)) {
        for (i, raw) in self.directions().into_iter().enumerate() {
            sink(i, raw);
        }
    }
}

/// Quadrature decoder over two digital lines.
///
/// Every [`QuadratureDecoder::sample`] reads both lines once; rotation
/// faster than one quarter step per sample loses steps.
pub struct QuadratureDecoder<P: DigitalInput> {
    a: P,
    b: P,
    phase: u8,
    pending: i64,
    position: i64,
    steps_per_detent: i64,
}

impl<P: DigitalInput> QuadratureDecoder<P> {
    pub fn new(a: P, b: P, steps_per_detent: u32) -> Self {
        let mut decoder = Self {
            a,
            b,
            phase: 0,
            pending: 0,
            position: 0,
            steps_per_detent: i64::from(steps_per_detent.max(1)),
        };
        decoder.phase = decoder.read_phase();
        decoder
    }

    /// Read the lines and return the detent count
    pub fn sample(&mut self) -> i64 {
        let phase = self.read_phase();
        let step = QUADRATURE_STEPS[usize::from((self.phase << 2) | phase)];
        self.phase = phase;
        self.pending += i64::from(step);
        if self.pending.abs() >= self.steps_per_detent {
            self.position += self.pending.signum();
            self.pending = 0;
        }
        self.position
    }

    fn read_phase(&mut self) -> u8 {
        (u8::from(self.a.is_high()) << 1) | u8::from(self.b.is_high())
    }
}

/// Quadrature encoder sampled on its own thread.
///
/// The sampler runs every `sample_interval`, independent of the frame rate;
/// [`Encoder::position`] only reads the shared detent counter. The thread is
/// stopped and joined on drop.
pub struct QuadratureEncoder {
    position: Arc<AtomicI64>,
    exit: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

impl QuadratureEncoder {
    /// Start sampling `a` and `b`
    pub fn spawn<P>(a: P, b: P, steps_per_detent: u32, sample_interval: Duration) -> Self
    where
        P: DigitalInput + Send + 'static,
    {
        let position = Arc::new(AtomicI64::new(0));
        let exit = Arc::new(AtomicBool::new(false));
        let mut decoder = QuadratureDecoder::new(a, b, steps_per_detent);

        let counter = position.clone();
        let stop = exit.clone();
        let sampler = thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                counter.store(decoder.sample(), Ordering::SeqCst);
                thread::sleep(sample_interval);
            }
            debug!("quadrature sampler stopped");
        });

        Self {
            position,
            exit,
            sampler: Some(sampler),
        }
    }
}

impl Encoder for QuadratureEncoder {
    fn position(&mut self) -> i64 {
        self.position.load(Ordering::SeqCst)
    }
}

impl Drop for QuadratureEncoder {
    fn drop(&mut self) {
        self.exit.store(true, Ordering::SeqCst);
        if let Some(sampler) = self.sampler.take() {
            if sampler.join().is_err() {
                error!("quadrature sampler panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use std::time::Instant;

    use super::*;
    use crate::input::mock::{MockEncoder, MockPin};

    fn scan(encoder: &mut RotaryEncoder) -> Vec<bool> {
        let mut raw = vec![];
        encoder.scan(&mut |_, r| raw.push(r));
        raw
    }

    #[test]
    fn test_should_derive_direction_from_position() {
        let mock = MockEncoder::default();
        let mut encoder = RotaryEncoder::new(mock.clone(), false);

        assert_eq!(scan(&mut encoder), vec![false, false]);
        mock.set_position(3);
        assert_eq!(scan(&mut encoder), vec![false, true]);
        assert_eq!(scan(&mut encoder), vec![false, false]);
        mock.set_position(-1);
        assert_eq!(scan(&mut encoder), vec![true, false]);
    }

    #[test]
    fn test_should_swap_directions_when_inverted() {
        let mock = MockEncoder::default();
        let mut encoder = RotaryEncoder::new(mock.clone(), true);

        mock.set_position(1);
        assert_eq!(scan(&mut encoder), vec![true, false]);
    }

    #[test]
    fn test_should_use_initial_position_as_reference() {
        let mock = MockEncoder::default();
        mock.set_position(42);
        let mut encoder = RotaryEncoder::new(mock, false);

        assert_eq!(scan(&mut encoder), vec![false, false]);
    }

    #[test]
    fn test_should_never_raise_both_directions() {
        let mock = MockEncoder::default();
        let mut encoder = RotaryEncoder::new(mock.clone(), false);
        for position in [0, 5, 5, 2, -7, -7, 1, 0, 0, 9] {
            mock.set_position(position);
            let raw = scan(&mut encoder);
            assert!(!(raw[0] && raw[1]));
        }
    }

    fn turn<P: DigitalInput>(
        a: &MockPin,
        b: &MockPin,
        phases: &[(bool, bool)],
        decoder: &mut QuadratureDecoder<P>,
    ) -> i64 {
        let mut position = 0;
        for (pa, pb) in phases {
            a.set_high(*pa);
            b.set_high(*pb);
            position = decoder.sample();
        }
        position
    }

    const CLOCKWISE: [(bool, bool); 4] =
        [(true, false), (true, true), (false, true), (false, false)];
    const COUNTER: [(bool, bool); 4] =
        [(false, true), (true, true), (true, false), (false, false)];

    #[test]
    fn test_should_decode_quadrature_detents() {
        let a = MockPin::default();
        let b = MockPin::default();
        let mut decoder = QuadratureDecoder::new(a.clone(), b.clone(), 4);

        assert_eq!(turn(&a, &b, &CLOCKWISE[..2], &mut decoder), 0);
        assert_eq!(turn(&a, &b, &CLOCKWISE[2..], &mut decoder), 1);
        assert_eq!(turn(&a, &b, &CLOCKWISE, &mut decoder), 2);
        assert_eq!(turn(&a, &b, &COUNTER, &mut decoder), 1);
        assert_eq!(turn(&a, &b, &COUNTER, &mut decoder), 0);
        assert_eq!(turn(&a, &b, &COUNTER, &mut decoder), -1);
    }

    #[test]
    fn test_should_ignore_jitter_within_detent() {
        let a = MockPin::default();
        let b = MockPin::default();
        let mut decoder = QuadratureDecoder::new(a.clone(), b.clone(), 4);
        let jitter = [(true, false), (false, false), (true, false), (false, false)];

        assert_eq!(turn(&a, &b, &jitter, &mut decoder), 0);
    }

    fn wait_for_position(encoder: &mut QuadratureEncoder, expected: i64) -> i64 {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let position = encoder.position();
            if position == expected || Instant::now() > deadline {
                return position;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_should_count_detents_between_position_reads() {
        let a = MockPin::default();
        let b = MockPin::default();
        let mut encoder =
            QuadratureEncoder::spawn(a.clone(), b.clone(), 4, Duration::from_micros(200));

        // several quarter steps go by between two reads of the counter
        for (pa, pb) in CLOCKWISE.iter().chain(CLOCKWISE.iter()) {
            a.set_high(*pa);
            b.set_high(*pb);
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(wait_for_position(&mut encoder, 2), 2);

        for (pa, pb) in COUNTER {
            a.set_high(pa);
            b.set_high(pb);
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(wait_for_position(&mut encoder, 1), 1);
    }

    #[test]
    fn test_should_feed_rotary_keys_from_sampler() {
        let a = MockPin::default();
        let b = MockPin::default();
        let mut rotary = RotaryEncoder::new(
            QuadratureEncoder::spawn(a.clone(), b.clone(), 4, Duration::from_micros(200)),
            false,
        );

        for (pa, pb) in CLOCKWISE {
            a.set_high(pa);
            b.set_high(pb);
            thread::sleep(Duration::from_millis(10));
        }
        thread::sleep(Duration::from_millis(20));
        assert_eq!(scan(&mut rotary), vec![false, true]);
        assert_eq!(scan(&mut rotary), vec![false, false]);
    }
}
