//! POSIX named-semaphore backend variant
//!
//! Same contract as the futex variant over `sem_*`: the semaphore value
//! stands in for the state word, held in {0, 1} by posting only when the
//! current value is 0. The elision check and the post are not one atomic
//! step, but each handle has a single signaling side, so no second post can
//! race in between.

use crate::name::{build_name, NamingMode};
use crate::synchro::Synchro;
use crate::{Error, Result};
use log::{debug, error};
use nix::errno::Errno;
use std::ffi::CString;
use std::ptr::NonNull;

/// Synchro over a named POSIX counting semaphore
pub struct SemaphoreSynchro {
    state: Option<SemHandle>,
    flushing: bool,
}

struct SemHandle {
    name: String,
    cname: CString,
    sem: NonNull<libc::sem_t>,
}

// Safety: sem_post/sem_wait on a named semaphore are async-signal-safe and
// thread-safe; the pointer stays valid until sem_close in Drop.
unsafe impl Send for SemHandle {}
unsafe impl Sync for SemHandle {}

impl SemHandle {
    fn destroy(self) {
        let cname = self.cname.clone();
        let name = self.name.clone();
        drop(self);
        if unsafe { libc::sem_unlink(cname.as_ptr()) } != 0 {
            debug!("destroy: unlink {} failed: {}", name, Errno::last());
        }
    }
}

impl Drop for SemHandle {
    fn drop(&mut self) {
        if unsafe { libc::sem_close(self.sem.as_ptr()) } != 0 {
            error!("detach: sem_close {} failed: {}", self.name, Errno::last());
        }
    }
}

fn to_cname(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| Error::Publish {
        name: name.to_string(),
        errno: Errno::EINVAL,
    })
}

impl SemaphoreSynchro {
    pub fn new() -> Self {
        Self {
            state: None,
            flushing: false,
        }
    }

    fn attached(&self, op: &str) -> Result<&SemHandle> {
        self.state.as_ref().ok_or_else(|| {
            error!("{}: synchro already deallocated", op);
            Error::AlreadyDeallocated
        })
    }
}

impl Default for SemaphoreSynchro {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchro for SemaphoreSynchro {
    fn allocate(
        &mut self,
        client_name: &str,
        server_name: &str,
        mode: NamingMode,
        initial: u32,
    ) -> Result<()> {
        let name = build_name(client_name, server_name, mode);
        debug!("allocate name = {} value = {}", name, initial);

        let cname = to_cname(&name)?;
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT,
                0o777 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(Error::Publish {
                name,
                errno: Errno::last(),
            });
        }
        self.state = NonNull::new(sem).map(|sem| SemHandle { name, cname, sem });
        Ok(())
    }

    fn connect(&mut self, client_name: &str, server_name: &str, mode: NamingMode) -> Result<()> {
        if let Some(state) = &self.state {
            debug!("connect: already attached to {}", state.name);
            return Ok(());
        }
        let name = build_name(client_name, server_name, mode);
        debug!("connect name = {}", name);

        let cname = to_cname(&name)?;
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(Error::Attach {
                name,
                errno: Errno::last(),
            });
        }
        self.state = NonNull::new(sem).map(|sem| SemHandle { name, cname, sem });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(state) = self.state.take() {
            debug!("disconnect name = {}", state.name);
        }
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(state) = self.state.take() {
            debug!("destroy name = {}", state.name);
            state.destroy();
        }
    }

    fn signal(&self) -> Result<()> {
        let state = self.attached("signal")?;

        if self.flushing {
            return Ok(());
        }

        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(state.sem.as_ptr(), &mut value) } == 0 && value > 0 {
            // a signal is already pending; keep the value in {0, 1}
            return Ok(());
        }

        if unsafe { libc::sem_post(state.sem.as_ptr()) } != 0 {
            error!("signal: sem_post {} failed: {}", state.name, Errno::last());
        }
        Ok(())
    }

    fn wait(&self) -> Result<()> {
        let state = self.attached("wait")?;

        loop {
            if unsafe { libc::sem_wait(state.sem.as_ptr()) } == 0 {
                return Ok(());
            }
            match Errno::last() {
                Errno::EINTR => {}
                e => return Err(Error::Wait(e)),
            }
        }
    }

    fn timed_wait(&self, timeout_us: u64) -> Result<()> {
        let state = self.attached("timed_wait")?;

        // Absolute deadline, so EINTR retries never stretch the budget
        let mut deadline = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut deadline) } != 0 {
            return Err(Error::Wait(Errno::last()));
        }
        deadline.tv_sec += (timeout_us / 1_000_000) as libc::time_t;
        deadline.tv_nsec += ((timeout_us % 1_000_000) * 1_000) as libc::c_long;
        if deadline.tv_nsec >= 1_000_000_000 {
            deadline.tv_sec += 1;
            deadline.tv_nsec -= 1_000_000_000;
        }

        loop {
            if unsafe { libc::sem_timedwait(state.sem.as_ptr(), &deadline) } == 0 {
                return Ok(());
            }
            match Errno::last() {
                Errno::EINTR => {}
                Errno::ETIMEDOUT => return Err(Error::Timeout),
                e => return Err(Error::Wait(e)),
            }
        }
    }

    fn make_private(&mut self, _private: bool) {
        // scope is a property of the named semaphore itself; nothing to do
    }

    fn set_flushing(&mut self, flushing: bool) {
        self.flushing = flushing;
    }

    fn name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.name.as_str())
    }
}
