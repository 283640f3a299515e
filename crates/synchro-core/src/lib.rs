//! synchro - Named cross-process wakeup primitive
//!
//! The activation path of a real-time audio server: the server wakes a client
//! process for one processing cycle through a named kernel object both sides
//! resolve independently, with no lost or duplicated wakeups and a bounded
//! wait when asked for one. Carries no payload; one pending event at most.

pub mod error;
#[cfg(target_os = "linux")]
pub mod futex;
pub mod name;
#[cfg(unix)]
pub mod sema;
#[cfg(target_os = "linux")]
pub mod shm;
pub mod synchro;

pub use error::{Error, Result};
#[cfg(target_os = "linux")]
pub use futex::FutexSynchro;
pub use name::{build_name, NamingMode, PROMISCUOUS_ENV, SYNC_MAX_NAME_SIZE};
#[cfg(unix)]
pub use sema::SemaphoreSynchro;
#[cfg(target_os = "linux")]
pub use shm::SharedWord;
pub use synchro::{PlatformSynchro, Synchro};
