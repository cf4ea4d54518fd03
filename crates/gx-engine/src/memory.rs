//! Engine linear memory
//!
//! The core operates on one contiguous byte buffer. Host views alias
//! regions of it by offset, so every replacement of the backing storage
//! bumps a generation counter that views are checked against.

use gx_core::BridgeError;

/// Contiguous engine memory, word aligned
#[derive(Debug, Clone)]
pub struct LinearMemory {
    /// Backing storage (u32 keeps every 4-byte offset aligned for f32/u16 views)
    words: Vec<u32>,
    /// Length in bytes
    len: usize,
    /// Incremented whenever the backing storage is replaced
    generation: u64,
}

impl LinearMemory {
    /// Allocate zeroed memory of `len` bytes
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(4)],
            len,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reallocate to at least `new_len` bytes, preserving contents.
    ///
    /// Any view built before this call is invalidated.
    pub fn grow(&mut self, new_len: usize) {
        if new_len <= self.len {
            return;
        }

        let mut words = vec![0u32; new_len.div_ceil(4)];
        words[..self.words.len()].copy_from_slice(&self.words);
        self.words = words;
        self.len = new_len;
        self.generation += 1;

        tracing::debug!(
            "Linear memory grown to 0x{:x} bytes (generation {})",
            new_len,
            self.generation
        );
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..len]
    }

    /// Validate that `offset..offset + len` lies inside memory and is aligned
    pub fn check_region(
        &self,
        what: &'static str,
        offset: usize,
        len: usize,
        align: usize,
    ) -> Result<(), BridgeError> {
        if offset % align != 0 {
            return Err(BridgeError::Misaligned { what, offset, align });
        }

        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(BridgeError::OutOfBounds {
                what,
                offset,
                len,
                memory_len: self.len,
            }),
        }
    }

    pub fn region(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.as_bytes().get(offset..end)
    }

    pub fn region_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        let end = offset.checked_add(len)?;
        self.as_bytes_mut().get_mut(offset..end)
    }

    /// Copy `data` into memory at `offset`
    pub fn write(&mut self, what: &'static str, offset: usize, data: &[u8]) -> Result<(), BridgeError> {
        self.check_region(what, offset, data.len(), 1)?;
        let end = offset + data.len();
        self.as_bytes_mut()[offset..end].copy_from_slice(data);
        Ok(())
    }
}
