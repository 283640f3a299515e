//! Shared state word backed by POSIX shared memory
//!
//! Owns the descriptor, the mapping and the published name as one resource:
//! construction maps, drop unmaps then closes exactly once, and the two
//! release paths stay distinct: dropping detaches locally, while [`destroy`]
//! also removes the object from the system namespace.
//!
//! [`destroy`]: SharedWord::destroy

use crate::{Error, Result};
use log::{debug, error};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use std::num::NonZeroUsize;
use std::os::fd::OwnedFd;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

const WORD_LEN: NonZeroUsize = match NonZeroUsize::new(std::mem::size_of::<AtomicU32>()) {
    Some(len) => len,
    None => unreachable!(),
};

/// One machine word of shared state, mapped from a named shared object.
///
/// The word is the only data shared through the object; its value invariant
/// (0 = no pending signal, 1 = signal pending and unconsumed) is maintained by
/// the backend's compare-and-exchange transitions, never by this type.
pub struct SharedWord {
    name: String,
    // held only so the descriptor closes after the unmap in Drop
    _fd: OwnedFd,
    ptr: NonNull<AtomicU32>,
}

// Safety: the mapping stays valid for the life of the value, and the word it
// points at is only ever accessed through AtomicU32 operations.
unsafe impl Send for SharedWord {}
unsafe impl Sync for SharedWord {}

fn map_word(fd: &OwnedFd) -> nix::Result<NonNull<AtomicU32>> {
    let prot = ProtFlags::PROT_READ | ProtFlags::PROT_WRITE;
    // The word is touched from a real-time thread, so ask for a locked
    // mapping like the original server does; retry unlocked when the
    // mlock rlimit rejects a single page.
    let ptr = match unsafe {
        mmap(
            None,
            WORD_LEN,
            prot,
            MapFlags::MAP_SHARED | MapFlags::MAP_LOCKED,
            fd,
            0,
        )
    } {
        Ok(ptr) => ptr,
        Err(Errno::EPERM) | Err(Errno::ENOMEM) | Err(Errno::EAGAIN) => {
            unsafe { mmap(None, WORD_LEN, prot, MapFlags::MAP_SHARED, fd, 0) }?
        }
        Err(e) => return Err(e),
    };
    Ok(ptr.cast())
}

impl SharedWord {
    /// Publish a new named object and map its word, initialized to `initial`.
    ///
    /// Any partially created state (descriptor obtained but sizing or mapping
    /// failed) is unwound and the fresh name unlinked before the error is
    /// reported; a failed create leaves nothing reachable in the namespace.
    pub fn create(name: &str, initial: u32) -> Result<Self> {
        let publish_err = |errno: Errno| Error::Publish {
            name: name.to_string(),
            errno,
        };

        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::S_IRWXU | Mode::S_IRWXG | Mode::S_IRWXO,
        )
        .map_err(&publish_err)?;

        let mapped = match ftruncate(&fd, WORD_LEN.get() as i64).and_then(|_| map_word(&fd)) {
            Ok(ptr) => ptr,
            Err(errno) => {
                // unwind the partial allocation: close the descriptor and
                // take the fresh name back out of the namespace
                drop(fd);
                if let Err(e) = shm_unlink(name) {
                    error!("create: cannot roll back object {}: {}", name, e);
                }
                return Err(publish_err(errno));
            }
        };

        let word = Self {
            name: name.to_string(),
            _fd: fd,
            ptr: mapped,
        };
        word.word().store(initial, Ordering::Release);
        Ok(word)
    }

    /// Attach to an object previously published by [`create`](Self::create).
    pub fn open(name: &str) -> Result<Self> {
        let attach_err = |errno: Errno| Error::Attach {
            name: name.to_string(),
            errno,
        };

        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty()).map_err(&attach_err)?;
        let ptr = map_word(&fd).map_err(&attach_err)?;

        Ok(Self {
            name: name.to_string(),
            _fd: fd,
            ptr,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared state word
    pub fn word(&self) -> &AtomicU32 {
        unsafe { self.ptr.as_ref() }
    }

    /// Detach and remove the object from the system namespace.
    ///
    /// Other processes keep their attachments; only the name disappears, so
    /// no further connect can reach this object.
    pub fn destroy(self) {
        let name = self.name.clone();
        drop(self);
        if let Err(e) = shm_unlink(name.as_str()) {
            debug!("destroy: unlink {} failed: {}", name, e);
        }
    }
}

impl Drop for SharedWord {
    fn drop(&mut self) {
        // Unmap before the descriptor closes; the object itself survives
        // until someone unlinks the name.
        if let Err(e) = unsafe { munmap(self.ptr.cast(), WORD_LEN.get()) } {
            error!("detach: munmap {} failed: {}", self.name, e);
        }
    }
}
