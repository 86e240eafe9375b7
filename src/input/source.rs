//! Hardware capabilities and the generic source poller.

use super::events::FrameEvents;
use super::state::{KeyCell, KeyFsm, Transition};
use crate::key::Key;

/// A single digital line
pub trait DigitalInput {
    /// Current electrical level of the line
    fn is_high(&mut self) -> bool;
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn is_high(&mut self) -> bool {
        (**self).is_high()
    }
}

/// Row/column key matrix wiring.
///
/// Callers must not reconfigure the column pins while a scan is running.
pub trait MatrixBus {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    /// Drive `col` as an output high
    fn drive_high(&mut self, col: usize);
    /// Return `col` to a pulled-down input
    fn release(&mut self, col: usize);
    /// Level of `row` under the currently driven column
    fn read_row(&mut self, row: usize) -> bool;
}

/// Absolute rotation counter
pub trait Encoder {
    fn position(&mut self) -> i64;
}

/// Analog channel reduced to a pressed / not-pressed predicate
pub trait AnalogChannel {
    fn is_pressed(&mut self) -> bool;
}

impl<F> AnalogChannel for F
where
    F: FnMut() -> bool,
{
    fn is_pressed(&mut self) -> bool {
        self()
    }
}

/// Something producing one raw pressed signal per key on every poll.
pub trait KeySource {
    /// Number of keys the source occupies in the layout
    fn key_count(&self) -> usize;

    /// Transition table for the keys of this source
    fn fsm(&self) -> KeyFsm {
        KeyFsm::Standard
    }

    /// Report `(local index, raw pressed)` for every key of the source
    fn scan(&mut self, sink: &mut dyn FnMut(usize, bool));
}

/// A digital push button
pub struct Button {
    input: Box<dyn DigitalInput>,
    active_low: bool,
}

impl Button {
    /// Create a button; if `active_low` the button is pressed when the line is low
    pub fn new(input: impl DigitalInput + 'static, active_low: bool) -> Self {
        Self {
            input: Box::new(input),
            active_low,
        }
    }

    pub fn is_pressed(&mut self) -> bool {
        self.input.is_high() != self.active_low
    }
}

/// Independent GPIO buttons, one key each.
pub struct ButtonBank {
    buttons: Vec<Button>,
}

impl ButtonBank {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self { buttons }
    }
}

impl KeySource for ButtonBank {
    fn key_count(&self) -> usize {
        self.buttons.len()
    }

    fn scan(&mut self, sink: &mut dyn FnMut(usize, bool)) {
        for (i, button) in self.buttons.iter_mut().enumerate() {
            sink(i, button.is_pressed());
        }
    }
}

/// Column currently driven high on a [`MatrixBus`].
///
/// Holds the bus exclusively; the column is released when the guard drops.
pub struct DrivenColumn<'a, B: MatrixBus + ?Sized> {
    bus: &'a mut B,
    col: usize,
}

impl<'a, B: MatrixBus + ?Sized> DrivenColumn<'a, B> {
    pub fn drive(bus: &'a mut B, col: usize) -> Self {
        bus.drive_high(col);
        Self { bus, col }
    }

    pub fn read_row(&mut self, row: usize) -> bool {
        self.bus.read_row(row)
    }
}

impl<B: MatrixBus + ?Sized> Drop for DrivenColumn<'_, B> {
    fn drop(&mut self) {
        self.bus.release(self.col);
    }
}

/// Key matrix scanned column by column.
pub struct Matrix {
    bus: Box<dyn MatrixBus>,
}

impl Matrix {
    pub fn new(bus: Box<dyn MatrixBus>) -> Self {
        Self { bus }
    }

    /// Matrix dimensions as `(rows, cols)`
    pub fn size(&self) -> (usize, usize) {
        (self.bus.rows(), self.bus.cols())
    }
}

impl KeySource for Matrix {
    fn key_count(&self) -> usize {
        self.bus.rows() * self.bus.cols()
    }

    fn scan(&mut self, sink: &mut dyn FnMut(usize, bool)) {
        let (rows, cols) = self.size();
        for col in 0..cols {
            let mut column = DrivenColumn::drive(&mut *self.bus, col);
            for row in 0..rows {
                sink(row * cols + col, column.read_row(row));
            }
        }
    }
}

/// Analog joystick channels, one key each.
pub struct Joystick {
    channels: Vec<Box<dyn AnalogChannel>>,
}

impl Joystick {
    pub fn new(channels: Vec<Box<dyn AnalogChannel>>) -> Self {
        Self { channels }
    }
}

impl KeySource for Joystick {
    fn key_count(&self) -> usize {
        self.channels.len()
    }

    fn scan(&mut self, sink: &mut dyn FnMut(usize, bool)) {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            sink(i, channel.is_pressed());
        }
    }
}

/// One poll pass over the per-key cells
pub(crate) struct Pass<'a> {
    pub cells: &'a mut [KeyCell],
    pub events: &'a mut FrameEvents,
    pub threshold: u32,
}

impl Pass<'_> {
    /// Feed every key of `source` through the state machine, starting at `offset`
    pub fn run<S: KeySource + ?Sized>(&mut self, source: &mut S, offset: usize) {
        let fsm = source.fsm();
        let count = source.key_count();
        let threshold = self.threshold;
        let cells = &mut *self.cells;
        let events = &mut *self.events;

        source.scan(&mut |local, raw| {
            debug_assert!(local < count, "source reported key {local} of {count}");
            let index = offset + local;
            // the layout is checked to fit in u16 when the subsystem is built
            let Ok(raw_index) = u16::try_from(index) else {
                return;
            };
            let key = Key::new(raw_index);
            let cell = &mut cells[index];
            let transition = cell.step(fsm, raw, threshold);
            match transition {
                Transition::JustPressed => debug!("{key} just pressed"),
                Transition::JustReleased => debug!("{key} just released"),
                Transition::None | Transition::StillPressed => {}
            }
            events.record(key, transition, cell.state());
        });
    }
}
