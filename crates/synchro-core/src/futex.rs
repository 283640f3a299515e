//! Futex backend variant
//!
//! Reference wait/signal state machine: the shared word moves between 0 (no
//! pending signal) and 1 (signal pending, unconsumed) by compare-and-exchange
//! only. Signaling flips 0 to 1 before any wake syscall, so a wakeup can
//! never be lost; a failed flip means a signal is already pending and the
//! wake syscall is skipped entirely, so a producer racing ahead of a slow
//! consumer does not pay a syscall per event.

use crate::name::{build_name, NamingMode};
use crate::shm::SharedWord;
use crate::synchro::Synchro;
use crate::{Error, Result};
use log::{debug, error};
use nix::errno::Errno;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Synchro over a Linux futex word in named shared memory
pub struct FutexSynchro {
    state: Option<SharedWord>,
    private: bool,
    flushing: bool,
}

fn futex_call(
    word: &AtomicU32,
    op: libc::c_int,
    val: u32,
    timeout: Option<&libc::timespec>,
) -> std::result::Result<(), Errno> {
    let ts = timeout.map_or(std::ptr::null(), |t| t as *const libc::timespec);
    let res = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            op,
            val,
            ts,
            std::ptr::null::<u32>(),
            0u32,
        )
    };
    if res < 0 {
        Err(Errno::last())
    } else {
        Ok(())
    }
}

impl FutexSynchro {
    pub fn new() -> Self {
        Self {
            state: None,
            private: false,
            flushing: false,
        }
    }

    fn wake_op(&self) -> libc::c_int {
        if self.private {
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG
        } else {
            libc::FUTEX_WAKE
        }
    }

    fn wait_op(&self) -> libc::c_int {
        if self.private {
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG
        } else {
            libc::FUTEX_WAIT
        }
    }

    fn attached(&self, op: &str) -> Result<&SharedWord> {
        self.state.as_ref().ok_or_else(|| {
            error!("{}: synchro already deallocated", op);
            Error::AlreadyDeallocated
        })
    }
}

impl Default for FutexSynchro {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchro for FutexSynchro {
    fn allocate(
        &mut self,
        client_name: &str,
        server_name: &str,
        mode: NamingMode,
        initial: u32,
    ) -> Result<()> {
        let name = build_name(client_name, server_name, mode);
        debug!("allocate name = {} value = {}", name, initial);
        self.state = Some(SharedWord::create(&name, initial)?);
        Ok(())
    }

    fn connect(&mut self, client_name: &str, server_name: &str, mode: NamingMode) -> Result<()> {
        if let Some(state) = &self.state {
            debug!("connect: already attached to {}", state.name());
            return Ok(());
        }
        let name = build_name(client_name, server_name, mode);
        debug!("connect name = {}", name);
        self.state = Some(SharedWord::open(&name)?);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(state) = self.state.take() {
            debug!("disconnect name = {}", state.name());
        }
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(state) = self.state.take() {
            debug!("destroy name = {}", state.name());
            state.destroy();
        }
    }

    fn signal(&self) -> Result<()> {
        let state = self.attached("signal")?;

        if self.flushing {
            return Ok(());
        }

        if state
            .word()
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // a signal is already pending; do not wake the futex again
            return Ok(());
        }

        let _ = futex_call(state.word(), self.wake_op(), 1, None);
        Ok(())
    }

    fn wait(&self) -> Result<()> {
        let state = self.attached("wait")?;

        loop {
            if state
                .word()
                .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }

            match futex_call(state.word(), self.wait_op(), 0, None) {
                Ok(()) => {}
                // EAGAIN: the word changed before the kernel parked us;
                // EINTR: signal delivery. Both re-check and re-park.
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => {}
                Err(e) => return Err(Error::Wait(e)),
            }
        }
    }

    fn timed_wait(&self, timeout_us: u64) -> Result<()> {
        let state = self.attached("timed_wait")?;

        // One deadline for the whole call; every retry re-derives what is
        // left of it rather than re-arming the full timeout.
        let deadline = Instant::now() + Duration::from_micros(timeout_us);

        loop {
            if state
                .word()
                .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }

            let ts = libc::timespec {
                tv_sec: remaining.as_secs() as libc::time_t,
                tv_nsec: remaining.subsec_nanos() as libc::c_long,
            };

            match futex_call(state.word(), self.wait_op(), 0, Some(&ts)) {
                Ok(()) => {}
                Err(Errno::EAGAIN) | Err(Errno::EINTR) | Err(Errno::ETIMEDOUT) => {}
                Err(e) => return Err(Error::Wait(e)),
            }
        }
    }

    fn make_private(&mut self, private: bool) {
        self.private = private;
    }

    fn set_flushing(&mut self, flushing: bool) {
        self.flushing = flushing;
    }

    fn name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.name())
    }
}
