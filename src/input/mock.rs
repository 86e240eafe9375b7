//! In-memory hardware doubles.
//!
//! Every double is a cheap handle over shared state: keep a clone to drive
//! the inputs while the original is owned by the [`crate::InputSubsystem`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::source::{DigitalInput, Encoder, MatrixBus};

/// Digital line with a settable level; can be sampled from another thread
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    level: Arc<AtomicBool>,
}

impl MockPin {
    pub fn set_high(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

impl DigitalInput for MockPin {
    fn is_high(&mut self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

/// Operation observed on a [`MockMatrix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Drive(usize),
    Release(usize),
    /// Row read, with the single driven column if exactly one was driven
    Read { row: usize, col: Option<usize> },
}

#[derive(Debug, Default)]
struct MatrixState {
    rows: usize,
    cols: usize,
    closed: Vec<bool>,
    driven: Vec<usize>,
    ops: Vec<BusOp>,
    overlaps: Vec<BusOp>,
}

/// Key matrix recording every bus operation
#[derive(Debug, Clone)]
pub struct MockMatrix {
    state: Rc<RefCell<MatrixState>>,
}

impl MockMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(MatrixState {
                rows,
                cols,
                closed: vec![false; rows * cols],
                ..Default::default()
            })),
        }
    }

    /// Close or open the switch at `row`, `col`
    pub fn press(&self, row: usize, col: usize, closed: bool) {
        let mut state = self.state.borrow_mut();
        let cols = state.cols;
        state.closed[row * cols + col] = closed;
    }

    /// Every operation observed so far
    pub fn ops(&self) -> Vec<BusOp> {
        self.state.borrow().ops.clone()
    }

    /// Drives and reads that happened while another column was driven
    pub fn overlaps(&self) -> Vec<BusOp> {
        self.state.borrow().overlaps.clone()
    }
}

impl MatrixBus for MockMatrix {
    fn rows(&self) -> usize {
        self.state.borrow().rows
    }

    fn cols(&self) -> usize {
        self.state.borrow().cols
    }

    fn drive_high(&mut self, col: usize) {
        let mut state = self.state.borrow_mut();
        let op = BusOp::Drive(col);
        if !state.driven.is_empty() {
            state.overlaps.push(op);
        }
        state.driven.push(col);
        state.ops.push(op);
    }

    fn release(&mut self, col: usize) {
        let mut state = self.state.borrow_mut();
        state.driven.retain(|c| *c != col);
        state.ops.push(BusOp::Release(col));
    }

    fn read_row(&mut self, row: usize) -> bool {
        let mut state = self.state.borrow_mut();
        let col = match state.driven.as_slice() {
            [col] => Some(*col),
            _ => None,
        };
        let op = BusOp::Read { row, col };
        state.ops.push(op);
        match col {
            Some(col) => state.closed[row * state.cols + col],
            None => {
                state.overlaps.push(op);
                false
            }
        }
    }
}

/// Encoder with a settable position
#[derive(Debug, Clone, Default)]
pub struct MockEncoder {
    position: Rc<Cell<i64>>,
}

impl MockEncoder {
    pub fn set_position(&self, position: i64) {
        self.position.set(position);
    }
}

impl Encoder for MockEncoder {
    fn position(&mut self) -> i64 {
        self.position.get()
    }
}
