//! # UIO Backend
//!
//! For register blocks that are exposed as memory-mapped windows via the
//! Linux UIO subsystem.
//!
//! ## Example Usage
//!
//! ```ignore
//! use xfcp_server_bridge::backends::uio::UioRegisterFile;
//! use xfcp_server::{endpoint::RegisterNode, fabric::Node, server::Builder};
//!
//! let file = UioRegisterFile::new("/dev/uio0", 64)?;
//! let root = Node::from(RegisterNode::new(file));
//! Builder::new().udp(&root).listen("127.0.0.1:1234")?;
//! ```
use std::{
    fs::OpenOptions,
    io,
    num::NonZero,
    path::Path,
    ptr::{NonNull, read_volatile, write_volatile},
};

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};

use xfcp_server::RegisterFile;

const MAP_SIZE: usize = 0x10000;

/// Register file backed by a UIO memory mapping.
///
/// Every access goes through a volatile 32-bit load or store, so reads and
/// writes reach the hardware registers in exactly the width and order the
/// endpoint issues them.
pub struct UioRegisterFile {
    regs: *mut u32,
    word_count: usize,
}

// The mapping is owned exclusively by this value and all access goes through
// the endpoint's lock, one request at a time.
unsafe impl Send for UioRegisterFile {}

impl UioRegisterFile {
    /// Maps the device at `path` and exposes its first `word_count` words.
    pub fn new(path: impl AsRef<Path>, word_count: usize) -> io::Result<UioRegisterFile> {
        let device_path = path.as_ref();
        log::debug!("Opening UIO device: {}", device_path.display());
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        log::debug!("UIO device file opened successfully");

        let word_count = word_count.min(MAP_SIZE / 4);
        let regs = unsafe {
            log::debug!("Mapping UIO memory (size=0x{:x})", MAP_SIZE);
            let ptr = mmap(
                None,
                NonZero::new(MAP_SIZE).unwrap(),
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )?;
            log::info!("UIO memory mapped successfully");
            ptr.as_ptr() as *mut u32
        };
        Ok(UioRegisterFile { regs, word_count })
    }
}

impl Drop for UioRegisterFile {
    fn drop(&mut self) {
        if let Some(ptr) = NonNull::new(self.regs) {
            unsafe {
                let _ = munmap(ptr.cast(), MAP_SIZE);
            }
        }
    }
}

impl RegisterFile for UioRegisterFile {
    fn word_count(&self) -> usize {
        self.word_count
    }

    fn read_word(&mut self, addr: usize) -> u32 {
        log::trace!("UIO read_word: addr=0x{:x}", addr);
        // SAFETY: the endpoint bounds-checks addr against word_count, which
        // is capped to the mapped window.
        unsafe { read_volatile(self.regs.add(addr)) }
    }

    fn write_word(&mut self, addr: usize, value: u32) {
        log::trace!("UIO write_word: addr=0x{:x}, value=0x{:08x}", addr, value);
        // SAFETY: as in read_word, addr lies inside the mapped window.
        unsafe { write_volatile(self.regs.add(addr), value) }
    }
}
