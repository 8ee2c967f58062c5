//! Scripted terminal transport shared by the integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use jelcli::cli::config::Config;
use jelcli::transport::error::Error;
use jelcli::transport::{OutputChannel, SpinMutex, Timeout, Transport};

/// Mock terminal: every queued chunk is returned by reads until it is used up.
/// An empty queue, or a pause, reads as a timeout.
#[derive(Debug, Default)]
pub struct MockTerminal {
    input: RefCell<VecDeque<Vec<u8>>>,
    output: RefCell<Vec<u8>>,
    timeouts: RefCell<Vec<Timeout>>,
    closed: Cell<bool>,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if typed by the user.
    pub fn type_bytes(&self, bytes: &[u8]) {
        self.input.borrow_mut().push_back(bytes.to_vec());
    }

    /// Queue a read that times out.
    pub fn pause(&self) {
        self.input.borrow_mut().push_back(Vec::new());
    }

    /// Everything written so far, cleared.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut *self.output.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Timeouts passed to every read so far.
    pub fn timeouts(&self) -> Vec<Timeout> {
        self.timeouts.borrow().clone()
    }

    /// Fail every further operation.
    pub fn close(&self) {
        self.closed.set(true);
    }
}

impl Transport for MockTerminal {
    type Error = Error;

    fn read(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, Self::Error> {
        if self.closed.get() {
            return Err(Error::Closed);
        }
        self.timeouts.borrow_mut().push(timeout);
        let mut input = self.input.borrow_mut();
        let Some(chunk) = input.front_mut() else {
            return Ok(0);
        };
        let n = buf.len().min(chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            input.pop_front();
        }
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.closed.get() {
            return Err(Error::Closed);
        }
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&self) -> Result<(), Self::Error> {
        if self.closed.get() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

pub type Channel = OutputChannel<MockTerminal, SpinMutex>;

pub fn channel() -> Channel {
    OutputChannel::new(MockTerminal::new(), SpinMutex::new())
}

/// No echo, so output holds only what commands print.
pub fn quiet_config() -> Config {
    Config {
        echo: false,
        ..Config::default()
    }
}
