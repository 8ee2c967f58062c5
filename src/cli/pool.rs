//! Bounded pool of string slots.
//!
//! String arguments are the only variable-sized values the engine produces.
//! Their number is bounded by a [`StringPool`]: every live string holds a
//! [`StringLease`] on one slot, and dropping the lease hands the slot back.

use core::fmt;
use core::ops::Deref;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::String;

use super::Error;
use super::config::{MAX_STRING_LENGTH, STRING_POOL_SIZE};
use crate::logging::trace;

/// Most slots a pool can track (one bit each in an `AtomicU32`).
pub const MAX_POOL_SLOTS: usize = 32;

const _: () = assert!(STRING_POOL_SIZE <= MAX_POOL_SLOTS);

/// A fixed number of string slots shared by every parse.
#[derive(Debug)]
pub struct StringPool {
    used: AtomicU32,
    size: u8,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// A pool of [`STRING_POOL_SIZE`] slots.
    pub const fn new() -> Self {
        Self::with_size(STRING_POOL_SIZE)
    }

    /// A pool of `size` slots, capped at [`MAX_POOL_SLOTS`].
    pub const fn with_size(size: usize) -> Self {
        let size = if size > MAX_POOL_SLOTS {
            MAX_POOL_SLOTS
        } else {
            size
        };
        Self {
            used: AtomicU32::new(0),
            size: size as u8,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.size as usize
    }

    /// Number of slots not currently leased.
    pub fn free_count(&self) -> usize {
        let used = self.used.load(Ordering::Acquire).count_ones() as usize;
        self.capacity() - used
    }

    /// Lease a slot and copy `text` into it.
    ///
    /// Fails with [`Error::StringTooLong`] if `text` does not fit one slot and
    /// with [`Error::NoFreeStringsAvailable`] if every slot is taken.
    pub fn acquire(&self, text: &str) -> Result<StringLease<'_>, Error> {
        let mut value = String::new();
        value.push_str(text).map_err(|_| Error::StringTooLong)?;
        let slot = self.claim().ok_or(Error::NoFreeStringsAvailable)?;
        trace!("string slot {} leased", slot);
        Ok(StringLease {
            pool: self,
            slot,
            value,
        })
    }

    fn claim(&self) -> Option<u8> {
        let mask = if self.size as usize == MAX_POOL_SLOTS {
            u32::MAX
        } else {
            (1u32 << self.size) - 1
        };
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            let free = !current & mask;
            if free == 0 {
                return None;
            }
            let slot = free.trailing_zeros();
            match self.used.compare_exchange_weak(
                current,
                current | (1 << slot),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(slot as u8),
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self, slot: u8) {
        self.used.fetch_and(!(1u32 << slot), Ordering::AcqRel);
        trace!("string slot {} released", slot);
    }
}

/// Exclusive use of one [`StringPool`] slot, holding the string's text.
pub struct StringLease<'p> {
    pool: &'p StringPool,
    slot: u8,
    value: String<MAX_STRING_LENGTH>,
}

impl StringLease<'_> {
    /// The leased text.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Index of the slot this lease holds.
    pub fn slot(&self) -> usize {
        self.slot as usize
    }
}

impl Deref for StringLease<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.value
    }
}

impl PartialEq<str> for StringLease<'_> {
    fn eq(&self, other: &str) -> bool {
        self.value.as_str() == other
    }
}

impl PartialEq<&str> for StringLease<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.value.as_str() == *other
    }
}

impl fmt::Debug for StringLease<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringLease")
            .field("slot", &self.slot)
            .field("value", &self.value.as_str())
            .finish()
    }
}

impl Drop for StringLease<'_> {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}
