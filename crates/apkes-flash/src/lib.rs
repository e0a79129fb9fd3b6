//! # APKES Flash
//!
//! Append-only log of keying material on an erase-unit-aligned external
//! memory region (spec.md §4.6). No sector-spanning or wear-levelling is
//! implemented — that mirrors the original Contiki `apkes-flash.c`, which
//! targets a single fixed-offset erase unit on the Tmote Sky's external
//! flash.
//!
//! The actual hardware access (`xmem_pwrite`/`xmem_pread` in the original)
//! is behind the [`FlashBackend`] trait so the append-only bookkeeping is
//! fully testable without a flash chip; [`InMemoryFlash`] is the backend
//! used by tests and the demo binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

use thiserror::Error;

/// Errors raised while reading or writing the keying-material log.
#[derive(Debug, Error)]
pub enum FlashError {
    /// The requested write would run past the end of the erase unit.
    #[error("write of {len} bytes at cursor {cursor} overflows the {erase_unit}-byte erase unit")]
    WriteOverflow {
        /// Bytes requested.
        len: usize,
        /// Write cursor at the time of the request.
        cursor: usize,
        /// Size of the erase unit.
        erase_unit: usize,
    },

    /// The requested read would run past the end of the erase unit.
    #[error("read of {len} bytes at offset {offset} overflows the {erase_unit}-byte erase unit")]
    ReadOverflow {
        /// Bytes requested.
        len: usize,
        /// Offset the read was requested at.
        offset: usize,
        /// Size of the erase unit.
        erase_unit: usize,
    },
}

/// The raw byte-addressable backing store for the keying-material log.
///
/// Implementations own exactly one erase unit, anchored at whatever fixed
/// offset the platform reserves for keying material
/// (`APKES_FLASH_KEYING_MATERIAL_OFFSET` in the original). [`FlashLog`]
/// only ever addresses bytes `0..erase_unit_size()` of this trait; the
/// backend is responsible for translating that into the real device offset.
pub trait FlashBackend {
    /// Size of the single erase unit this backend manages.
    fn erase_unit_size(&self) -> usize;

    /// Erase the whole unit, logically resetting it to all-`0xFF`.
    fn erase(&mut self);

    /// Write `buf` starting at byte `offset` within the erase unit.
    fn write_at(&mut self, offset: usize, buf: &[u8]);

    /// Read `buf.len()` bytes starting at byte `offset` within the erase unit.
    fn read_at(&self, offset: usize, buf: &mut [u8]);
}

/// A [`FlashBackend`] that keeps the erase unit in a `Vec<u8>`. Used by
/// tests and the demo binary in place of a real external flash chip.
pub struct InMemoryFlash {
    data: Vec<u8>,
}

impl InMemoryFlash {
    /// Create a backend with an erase unit of `erase_unit_size` bytes,
    /// initialized to all-`0xFF` (the erased state of NOR flash).
    #[must_use]
    pub fn new(erase_unit_size: usize) -> Self {
        Self {
            data: vec![0xFFu8; erase_unit_size],
        }
    }
}

impl FlashBackend for InMemoryFlash {
    fn erase_unit_size(&self) -> usize {
        self.data.len()
    }

    fn erase(&mut self) {
        self.data.fill(0xFF);
    }

    fn write_at(&mut self, offset: usize, buf: &[u8]) {
        self.data[offset..offset + buf.len()].copy_from_slice(buf);
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
    }
}

/// The append-only keying-material log (spec.md §4.6).
///
/// `erase()` resets the write cursor to zero; `append()` writes at the
/// cursor and advances it; `restore()` reads from a caller-supplied offset
/// and does not touch the cursor. There is no compaction: once the erase
/// unit fills up, `append()` returns [`FlashError::WriteOverflow`] and the
/// caller (the neighbor table, typically, persisting a newly-promoted
/// neighbor's keying material) must erase and rewrite everything it still
/// needs.
pub struct FlashLog<B: FlashBackend> {
    backend: B,
    cursor: usize,
}

impl<B: FlashBackend> FlashLog<B> {
    /// Wrap `backend`. The cursor starts at `0`; call [`FlashLog::erase`]
    /// first if the backend's prior contents should not be trusted.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend, cursor: 0 }
    }

    /// Current write cursor (bytes appended since the last `erase`).
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Clear the erase unit and reset the write cursor to zero.
    pub fn erase(&mut self) {
        self.backend.erase();
        self.cursor = 0;
        tracing::debug!("flash: erased keying-material log");
    }

    /// Append `buf` at the current cursor and advance it by `buf.len()`.
    pub fn append(&mut self, buf: &[u8]) -> Result<(), FlashError> {
        let erase_unit = self.backend.erase_unit_size();
        if self.cursor + buf.len() > erase_unit {
            return Err(FlashError::WriteOverflow {
                len: buf.len(),
                cursor: self.cursor,
                erase_unit,
            });
        }
        self.backend.write_at(self.cursor, buf);
        self.cursor += buf.len();
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `offset`, independent of the
    /// write cursor.
    pub fn restore(&self, offset: usize, buf: &mut [u8]) -> Result<(), FlashError> {
        let erase_unit = self.backend.erase_unit_size();
        if offset + buf.len() > erase_unit {
            return Err(FlashError::ReadOverflow {
                len: buf.len(),
                offset,
                erase_unit,
            });
        }
        self.backend.read_at(offset, buf);
        Ok(())
    }
}
