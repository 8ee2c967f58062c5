//! Transport abstraction and the shared output channel.
//!
//! The physical link (UART, USB CDC, RTT, ...) lives outside this crate. It is
//! reached through the [`Transport`] trait, and every byte of command output goes
//! through one [`OutputChannel`], which serializes writers with a runtime lock
//! primitive ([`RawMutex`]).
//!
//! ```text
//! ┌──────────────┐   write_str    ┌─────────────────┐   write   ┌─────────────┐
//! │ CLI session  │───────────────▶│  OutputChannel  │──────────▶│  Transport  │
//! └──────────────┘                │  (RawMutex)     │           │  (driver)   │
//! ┌──────────────┐   write_str    │                 │           │             │
//! │    Logger    │───────────────▶│                 │           │             │
//! └──────────────┘                └─────────────────┘           └─────────────┘
//! ```

#![deny(unsafe_code)]

use core::sync::atomic::{AtomicBool, Ordering};

/// Common error types for transports
pub mod error;

/// How long a blocking operation may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Do not wait at all.
    Immediate,
    /// Wait at most this many milliseconds.
    Millis(u32),
    /// Wait until the operation can complete.
    Forever,
}

impl Timeout {
    /// Builds a timeout from a millisecond count where `0` means "forever".
    ///
    /// This is the convention used by [`Config`](crate::cli::config::Config).
    pub fn from_millis_or_forever(ms: u32) -> Self {
        if ms == 0 {
            Timeout::Forever
        } else {
            Timeout::Millis(ms)
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Timeout {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Timeout::Immediate => defmt::write!(f, "Immediate"),
            Timeout::Millis(ms) => defmt::write!(f, "Millis({})", ms),
            Timeout::Forever => defmt::write!(f, "Forever"),
        }
    }
}

/// A byte-oriented, shareable link to the user's terminal.
///
/// Methods take `&self` so that one transport can be written from the session
/// thread and from the logger at the same time; drivers synchronize internally.
pub trait Transport {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Read available bytes into `buf`, waiting up to `timeout` for the first one.
    ///
    /// Returns `Ok(0)` when the timeout elapsed without any input.
    fn read(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, Self::Error>;

    /// Write bytes, returning how many were accepted.
    fn write(&self, buf: &[u8]) -> Result<usize, Self::Error>;

    /// Flush the write buffer
    fn flush(&self) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Error = T::Error;

    fn read(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, Self::Error> {
        (**self).read(buf, timeout)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(buf)
    }

    fn flush(&self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}

/// Non-reentrant lock primitive supplied by the runtime.
///
/// `lock` returns `false` if the lock could not be taken within `timeout`.
/// `unlock` must only be called by the current holder.
pub trait RawMutex {
    /// Take the lock, waiting at most `timeout`.
    fn lock(&self, timeout: Timeout) -> bool;

    /// Release the lock.
    fn unlock(&self);
}

/// Number of acquisition attempts [`SpinMutex`] makes per millisecond of timeout.
pub const SPINS_PER_MS: u32 = 1_000;

/// Atomic-flag lock for targets without an RTOS mutex.
///
/// There is no clock here, so finite timeouts are approximated by a spin budget
/// of [`SPINS_PER_MS`] attempts per millisecond.
#[derive(Debug, Default)]
pub struct SpinMutex {
    locked: AtomicBool,
}

impl SpinMutex {
    /// Create an unlocked mutex.
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Whether some holder currently owns the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl RawMutex for SpinMutex {
    fn lock(&self, timeout: Timeout) -> bool {
        match timeout {
            Timeout::Immediate => self.try_lock(),
            Timeout::Millis(ms) => {
                let budget = ms.saturating_mul(SPINS_PER_MS).max(1);
                for _ in 0..budget {
                    if self.try_lock() {
                        return true;
                    }
                    core::hint::spin_loop();
                }
                false
            }
            Timeout::Forever => {
                while !self.try_lock() {
                    core::hint::spin_loop();
                }
                true
            }
        }
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

/// Blocking lock for hosted targets, with exact timeouts.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Default)]
pub struct StdMutex {
    locked: std::sync::Mutex<bool>,
    released: std::sync::Condvar,
}

#[cfg(any(test, feature = "std"))]
impl StdMutex {
    /// Create an unlocked mutex.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "std"))]
impl RawMutex for StdMutex {
    fn lock(&self, timeout: Timeout) -> bool {
        let mut locked = self.locked.lock().unwrap_or_else(|e| e.into_inner());
        match timeout {
            Timeout::Immediate => {
                if *locked {
                    return false;
                }
            }
            Timeout::Millis(ms) => {
                let wait = std::time::Duration::from_millis(u64::from(ms));
                let (guard, _) = self
                    .released
                    .wait_timeout_while(locked, wait, |held| *held)
                    .unwrap_or_else(|e| e.into_inner());
                locked = guard;
                if *locked {
                    return false;
                }
            }
            Timeout::Forever => {
                while *locked {
                    locked = self.released.wait(locked).unwrap_or_else(|e| e.into_inner());
                }
            }
        }
        *locked = true;
        true
    }

    fn unlock(&self) {
        let mut locked = self.locked.lock().unwrap_or_else(|e| e.into_inner());
        *locked = false;
        self.released.notify_one();
    }
}

/// The single output path to the terminal, shared by commands and the logger.
///
/// Each [`write_str`](Self::write_str) call is atomic on its own. A sequence of
/// writes is atomic only while the caller holds the channel lock, which the
/// invocation façade exposes as [`Io::lock_output`](crate::cli::io::Io::lock_output).
#[derive(Debug)]
pub struct OutputChannel<T, M> {
    transport: T,
    mutex: M,
}

impl<T: Transport, M: RawMutex> OutputChannel<T, M> {
    /// Wrap a transport and the lock protecting it.
    pub const fn new(transport: T, mutex: M) -> Self {
        Self { transport, mutex }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Write a string as one uninterrupted unit.
    pub fn write_str(&self, text: &str) -> Result<(), crate::cli::Error> {
        self.mutex.lock(Timeout::Forever);
        let result = self.write_locked(text);
        self.mutex.unlock();
        result
    }

    /// Take the channel lock for a multi-write sequence.
    pub fn lock(&self, timeout: Timeout) -> bool {
        self.mutex.lock(timeout)
    }

    /// Release a lock taken with [`lock`](Self::lock).
    pub fn unlock(&self) {
        self.mutex.unlock()
    }

    /// Write while the caller already holds the lock.
    pub(crate) fn write_locked(&self, text: &str) -> Result<(), crate::cli::Error> {
        let mut bytes = text.as_bytes();
        while !bytes.is_empty() {
            match self.transport.write(bytes) {
                Ok(0) | Err(_) => return Err(crate::cli::Error::Transport),
                Ok(n) => bytes = &bytes[n..],
            }
        }
        self.transport
            .flush()
            .map_err(|_| crate::cli::Error::Transport)
    }

    /// Read raw input from the transport.
    pub(crate) fn read(&self, buf: &mut [u8], timeout: Timeout) -> Result<usize, crate::cli::Error> {
        self.transport
            .read(buf, timeout)
            .map_err(|_| crate::cli::Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_mutex_is_exclusive() {
        let mutex = SpinMutex::new();
        assert!(mutex.lock(Timeout::Immediate));
        assert!(!mutex.lock(Timeout::Immediate));
        assert!(!mutex.lock(Timeout::Millis(1)));
        mutex.unlock();
        assert!(mutex.lock(Timeout::Forever));
        assert!(mutex.is_locked());
    }

    #[test]
    fn std_mutex_times_out_while_held() {
        let mutex = StdMutex::new();
        assert!(mutex.lock(Timeout::Forever));
        assert!(!mutex.lock(Timeout::Immediate));
        assert!(!mutex.lock(Timeout::Millis(5)));
        mutex.unlock();
        assert!(mutex.lock(Timeout::Millis(5)));
    }

    #[test]
    fn std_mutex_hands_over_between_threads() {
        let mutex = std::sync::Arc::new(StdMutex::new());
        assert!(mutex.lock(Timeout::Forever));

        let waiter = {
            let mutex = mutex.clone();
            std::thread::spawn(move || mutex.lock(Timeout::Millis(2_000)))
        };
        std::thread::sleep(std::time::Duration::from_millis(10));
        mutex.unlock();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn zero_millis_means_forever() {
        assert_eq!(Timeout::from_millis_or_forever(0), Timeout::Forever);
        assert_eq!(Timeout::from_millis_or_forever(25), Timeout::Millis(25));
    }
}
