//! Recording SPI peripheral for tests.

use std::sync::{Arc, Mutex};

use embedded_hal::spi::{ErrorKind, ErrorType, SpiBus};

use crate::apa102::{Format, Peripheral};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op {
    Format(Format),
    Alloc,
    Write(u8),
    Flush,
}

#[derive(Default)]
struct State {
    ops: Vec<Op>,
    fail_after: Option<usize>,
}

/// Peripheral whose handles log every operation into a shared trace.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    state: Arc<Mutex<State>>,
}

impl Recorder {
    /// A recorder whose handles fail once `n` bytes have been written.
    pub(crate) fn failing_after(n: usize) -> Self {
        let recorder = Self::default();
        recorder.state.lock().unwrap().fail_after = Some(n);
        recorder
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Bytes written so far, in order.
    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Write(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Bytes written so far, split at every flush.
    pub(crate) fn transfers(&self) -> Vec<Vec<u8>> {
        let mut transfers = vec![];
        let mut current = vec![];
        for op in self.ops() {
            match op {
                Op::Write(b) => current.push(b),
                Op::Flush => transfers.push(std::mem::take(&mut current)),
                _ => (),
            }
        }
        transfers
    }
}

impl Peripheral for Recorder {
    type Handle = Handle;

    fn set_format(&mut self, format: Format) -> Result<(), ErrorKind> {
        self.state.lock().unwrap().ops.push(Op::Format(format));
        Ok(())
    }

    fn alloc(&mut self) -> Result<Handle, ErrorKind> {
        self.state.lock().unwrap().ops.push(Op::Alloc);
        Ok(Handle {
            state: self.state.clone(),
        })
    }
}

pub(crate) struct Handle {
    state: Arc<Mutex<State>>,
}

impl ErrorType for Handle {
    type Error = ErrorKind;
}

impl SpiBus<u8> for Handle {
    fn read(&mut self, _words: &mut [u8]) -> Result<(), ErrorKind> {
        Err(ErrorKind::Other)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), ErrorKind> {
        let mut state = self.state.lock().unwrap();
        for &b in words {
            let written = state
                .ops
                .iter()
                .filter(|op| matches!(op, Op::Write(_)))
                .count();
            if state.fail_after.map_or(false, |n| written >= n) {
                return Err(ErrorKind::Other);
            }
            state.ops.push(Op::Write(b));
        }
        Ok(())
    }

    fn transfer(&mut self, _read: &mut [u8], write: &[u8]) -> Result<(), ErrorKind> {
        self.write(write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), ErrorKind> {
        let words = words.to_vec();
        self.write(&words)
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        self.state.lock().unwrap().ops.push(Op::Flush);
        Ok(())
    }
}
