//! The synchro contract
//!
//! Every backend variant implements this trait with identical guarantees; a
//! target platform picks exactly one variant at build time through
//! [`PlatformSynchro`], so the hot wait/signal path never goes through
//! dynamic dispatch.

use crate::name::NamingMode;
use crate::Result;

/// Named cross-process wakeup primitive.
///
/// One handle exists per (client, direction) pair. The server side publishes
/// the object with [`allocate`](Synchro::allocate) and tears it down with
/// [`destroy`](Synchro::destroy); each client side attaches with
/// [`connect`](Synchro::connect) and releases its mapping with
/// [`disconnect`](Synchro::disconnect). In between, one side blocks in
/// [`wait`](Synchro::wait)/[`timed_wait`](Synchro::timed_wait) once per audio
/// cycle while the other delivers [`signal`](Synchro::signal).
pub trait Synchro {
    /// Publish a new named object, its state word initialized to `initial`.
    ///
    /// Fails with `Publish` if the object cannot be created, sized or mapped,
    /// leaving nothing reachable in the namespace. Calling this on a handle
    /// that is already allocated must be avoided by the caller.
    fn allocate(
        &mut self,
        client_name: &str,
        server_name: &str,
        mode: NamingMode,
        initial: u32,
    ) -> Result<()>;

    /// Attach to an object previously published under the same identities.
    ///
    /// Fails with `Attach` if no such object exists or mapping fails.
    /// Connecting an already attached handle is a no-op success.
    fn connect(&mut self, client_name: &str, server_name: &str, mode: NamingMode) -> Result<()>;

    /// Attach the input direction of a pair; same as plain connect here.
    fn connect_input(
        &mut self,
        client_name: &str,
        server_name: &str,
        mode: NamingMode,
    ) -> Result<()> {
        self.connect(client_name, server_name, mode)
    }

    /// Attach the output direction of a pair; same as plain connect here.
    fn connect_output(
        &mut self,
        client_name: &str,
        server_name: &str,
        mode: NamingMode,
    ) -> Result<()> {
        self.connect(client_name, server_name, mode)
    }

    /// Release this process's mapping and descriptor. Idempotent; other
    /// processes' attachments and the object itself are unaffected.
    fn disconnect(&mut self) -> Result<()>;

    /// As [`disconnect`](Synchro::disconnect), plus removes the object from
    /// the system namespace. Server side only; no-op when already deallocated.
    fn destroy(&mut self);

    /// Deliver a single pending wakeup.
    ///
    /// At most one signal is ever outstanding: if one is already pending and
    /// unconsumed this is a no-op success, and no kernel wake is issued when
    /// no counterpart can be parked. While the handle is flushing the call
    /// succeeds without delivering anything.
    fn signal(&self) -> Result<()>;

    /// Equivalent to [`signal`](Synchro::signal): there is one event slot,
    /// and the kernel-level wake already reaches every parked thread.
    fn signal_all(&self) -> Result<()> {
        self.signal()
    }

    /// Block until a pending signal is consumed.
    ///
    /// Spurious kernel wakeups are absorbed by re-checking the state word and
    /// re-parking; only an unrecoverable kernel error surfaces as `Wait`.
    fn wait(&self) -> Result<()>;

    /// As [`wait`](Synchro::wait), but bounded to `timeout_us` microseconds
    /// across the whole call, spurious retries included. Expiry reports
    /// `Timeout`, distinguishable from delivery and from a hard error.
    fn timed_wait(&self, timeout_us: u64) -> Result<()>;

    /// Scope kernel wake/park calls to the current process.
    ///
    /// Valid only when signaler and waiter reach the state word through the
    /// same mapping (server and client in one process). Both sides must agree
    /// before the first wait/signal; flipping it mid-flight is undefined.
    fn make_private(&mut self, private: bool);

    /// Enter or leave draining mode: while set, signal acknowledges without
    /// waking anyone, until the caller clears the flag again.
    fn set_flushing(&mut self, flushing: bool);

    /// Resolved object name, when allocated or connected
    fn name(&self) -> Option<&str>;

    fn is_attached(&self) -> bool {
        self.name().is_some()
    }
}

/// The variant compiled for this platform
#[cfg(target_os = "linux")]
pub type PlatformSynchro = crate::futex::FutexSynchro;

#[cfg(all(unix, not(target_os = "linux")))]
pub type PlatformSynchro = crate::sema::SemaphoreSynchro;
