//! Memory-mapped device window backend
//!
//! Maps the CGRA configuration port (a UIO node, a `/dev/mem` slice or, for
//! testing, any regular file) into the process and issues each burst as a
//! run of volatile 32-bit stores. Entries land at consecutive 4-byte offset
//! steps; the words of a multi-word entry are all stored, in order, to that
//! entry's step, where the CGRA collects them.
//!
//! Unsafe is limited to mmap/munmap and the volatile stores, all behind
//! bounds checks.

use crate::bus::{BusType, BusWriter};
use crate::error::{CgraError, Result};
use cgra_chip::axi::{ADDRESS_SPACE_SIZE, TRANSFER_SIZE};
use cgra_chip::BusAddress;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::Path;
use std::ptr::NonNull;

/// Bus backed by a shared memory mapping.
#[derive(Debug)]
pub struct MmioBus {
    ptr: NonNull<u8>,
    size: usize,
    _file: File,
    path: String,
}

// SAFETY: Send - MmioBus owns the mapping exclusively; moving it between threads
// doesn't invalidate the mapping (mmap'd memory is process-wide).
unsafe impl Send for MmioBus {}

impl MmioBus {
    /// Map the full configuration address space of the device at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_size(path, ADDRESS_SPACE_SIZE)
    }

    /// Map `size` bytes of the device at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The device cannot be opened read/write
    /// - `size` is zero
    /// - mmap fails
    pub fn open_with_size(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        if size == 0 {
            return Err(CgraError::map_failed(path_str, "window size is 0"));
        }

        tracing::debug!("Mapping CGRA window: {path_str} ({size:#x} bytes)");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CgraError::map_failed(&path_str, format!("cannot open: {e}")))?;

        // SAFETY: mmap of a freshly opened fd.
        // - fd is valid (just opened) and kept alive in `_file` for the mapping's lifetime
        // - size is non-zero (checked above)
        // - PROT_READ|PROT_WRITE with MAP_SHARED so stores reach the device
        // - offset 0: the window starts at the configuration port base
        // - unmapped exactly once in Drop
        let ptr = unsafe {
            let addr = mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
            .map_err(|e| CgraError::map_failed(&path_str, format!("mmap failed: {e}")))?;

            NonNull::new(addr.cast::<u8>())
                .ok_or_else(|| CgraError::map_failed(&path_str, "mmap returned null"))?
        };

        tracing::info!("Mapped CGRA window {path_str} ({size:#x} bytes at {ptr:p})");

        Ok(Self {
            ptr,
            size,
            _file: file,
            path: path_str,
        })
    }

    /// Read back the 32-bit word at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if offset is out of bounds
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        if offset + TRANSFER_SIZE as usize > self.size {
            return Err(CgraError::OutOfBounds {
                address: u32::try_from(offset).unwrap_or(u32::MAX),
                words: 1,
                limit: self.size,
            });
        }

        // SAFETY: volatile read inside the mapping.
        // - offset + 4 <= size (checked above)
        // - ptr valid for size bytes (successful mmap)
        // - offsets used by the driver are 4-byte aligned (BusAddress layout)
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };
        Ok(value)
    }

    /// Path of the mapped device.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size of the mapping in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }
}

impl BusWriter for MmioBus {
    fn write(&mut self, address: BusAddress, data: &[u32], words_per_entry: usize) -> Result<()> {
        if words_per_entry == 0 || data.len() % words_per_entry != 0 {
            return Err(CgraError::transfer_failed(format!(
                "{} words are not whole {words_per_entry}-word entries",
                data.len()
            )));
        }

        let step = TRANSFER_SIZE as usize;
        let start = address.raw() as usize;
        let end = start + data.len() / words_per_entry * step;
        if end > self.size || start % step != 0 {
            return Err(CgraError::OutOfBounds {
                address: address.raw(),
                words: data.len(),
                limit: self.size,
            });
        }

        for (i, entry) in data.chunks(words_per_entry).enumerate() {
            let offset = start + i * step;
            for word in entry {
                tracing::trace!("Write u32 @ {offset:#x} = {word:#x}");

                // SAFETY: volatile store inside the mapping.
                // - every entry offset checked to end within size, start 4-byte aligned
                // - ptr valid for size bytes (successful mmap)
                // - write_volatile keeps the stores in burst order
                #[allow(clippy::cast_ptr_alignment)]
                unsafe {
                    self.ptr
                        .as_ptr()
                        .add(offset)
                        .cast::<u32>()
                        .write_volatile(*word);
                }
            }
        }

        Ok(())
    }

    fn bus_type(&self) -> BusType {
        BusType::Mmio
    }
}

impl Drop for MmioBus {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly the mapping created in open_with_size;
        // Drop runs once and no references into the mapping outlive self.
        unsafe {
            let _ = munmap(self.ptr.as_ptr().cast(), self.size);
        }
        tracing::debug!("Unmapped CGRA window {}", self.path);
    }
}
