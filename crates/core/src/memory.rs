//! Flat 64K RAM bus for hosting the CPU in tests and harness runs.

use crate::cpu_6502::{Memory6502, RESET_VECTOR};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Size of the 6502 address space.
pub const ADDRESS_SPACE: usize = 0x10000;

/// Errors raised while placing a binary image into memory.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("image of {len} bytes does not fit at ${offset:04X}")]
    DoesNotFit { offset: u16, len: usize },
    #[error("image is empty")]
    Empty,
}

/// 64K of plain RAM with no mirroring or I/O.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            data: vec![0; ADDRESS_SPACE],
        }
    }

    /// Copy `bytes` into memory starting at `offset`.
    pub fn load_image(&mut self, offset: u16, bytes: &[u8]) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let start = offset as usize;
        let end = start + bytes.len();
        if end > ADDRESS_SPACE {
            return Err(ImageError::DoesNotFit {
                offset,
                len: bytes.len(),
            });
        }
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Read a file from disk and place it at `offset`. Returns the byte count.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P, offset: u16) -> Result<usize, ImageError> {
        let bytes = fs::read(path)?;
        self.load_image(offset, &bytes)?;
        Ok(bytes.len())
    }

    /// Load a program into memory and point the reset vector at it.
    ///
    /// Bytes that would run past $FFFF are dropped.
    pub fn load_program(&mut self, offset: u16, program: &[u8]) {
        let start = offset as usize;
        let len = program.len().min(ADDRESS_SPACE - start);
        self.data[start..start + len].copy_from_slice(&program[..len]);
        self.set_reset_vector(offset);
    }

    pub fn set_reset_vector(&mut self, entry: u16) {
        let [lo, hi] = entry.to_le_bytes();
        self.data[RESET_VECTOR as usize] = lo;
        self.data[RESET_VECTOR as usize + 1] = hi;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for FlatMemory {
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }
}
