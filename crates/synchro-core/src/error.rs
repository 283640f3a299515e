//! Error types for synchro

use nix::errno::Errno;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked on a handle with no active backing object
    #[error("synchro already deallocated")]
    AlreadyDeallocated,

    /// Allocate could not create, size or map the backing object
    #[error("cannot publish synchro {name}: {errno}")]
    Publish { name: String, errno: Errno },

    /// Connect could not find or map an existing object
    #[error("cannot attach synchro {name}: {errno}")]
    Attach { name: String, errno: Errno },

    /// Unrecoverable kernel wait error, distinct from the benign spurious class
    #[error("wait failed: {0}")]
    Wait(Errno),

    /// TimedWait exhausted its budget without consuming a signal
    #[error("timed wait expired")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;
