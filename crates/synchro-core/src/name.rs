//! Object naming
//!
//! Two processes that share a synchro object never exchange its name over a
//! handshake; each side derives it independently from the (client, server)
//! identity pair, so the derivation must be deterministic and bounded.

use nix::unistd::Uid;

/// Maximum length of a resolved object name, including the leading slash.
/// POSIX shared object names are limited to NAME_MAX.
pub const SYNC_MAX_NAME_SIZE: usize = 255;

/// Scope of the resolved name in the system namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// Embed the calling user's uid so unrelated users on a shared host
    /// cannot collide
    UserScoped,
    /// Omit the uid; the object is discoverable regardless of owning user
    Promiscuous,
}

/// Environment toggle switching the resolver to promiscuous naming
pub const PROMISCUOUS_ENV: &str = "SYNCHRO_PROMISCUOUS_SERVER";

impl NamingMode {
    /// Resolve the active mode from the environment
    pub fn from_env() -> Self {
        if std::env::var_os(PROMISCUOUS_ENV).is_some() {
            NamingMode::Promiscuous
        } else {
            NamingMode::UserScoped
        }
    }
}

/// Rewrite an identity string so it is legal inside an object name.
/// Bytes outside `[A-Za-z0-9_-]` become `_`.
fn rewrite_identity(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the system-wide name both sides of a synchro pair resolve to.
///
/// Pure function of its inputs: identical (client, server, mode) triples yield
/// identical names in any process of the same user. Over-long identities are
/// truncated consistently so allocator and connector still agree.
pub fn build_name(client_name: &str, server_name: &str, mode: NamingMode) -> String {
    let client = rewrite_identity(client_name);
    let server = rewrite_identity(server_name);

    let mut name = match mode {
        NamingMode::UserScoped => {
            format!("/synchro.{}_{}_{}", Uid::current(), server, client)
        }
        NamingMode::Promiscuous => format!("/synchro.{}_{}", server, client),
    };

    name.truncate(SYNC_MAX_NAME_SIZE);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = build_name("capture", "default", NamingMode::UserScoped);
        let b = build_name("capture", "default", NamingMode::UserScoped);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_pairs_give_distinct_names() {
        let a = build_name("capture", "default", NamingMode::UserScoped);
        let b = build_name("playback", "default", NamingMode::UserScoped);
        let c = build_name("capture", "other", NamingMode::UserScoped);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn user_scoped_embeds_uid() {
        let scoped = build_name("cli", "srv", NamingMode::UserScoped);
        let open = build_name("cli", "srv", NamingMode::Promiscuous);
        assert_ne!(scoped, open);
        assert!(scoped.contains(&Uid::current().to_string()));
        assert!(!open.contains(&format!(".{}", Uid::current())));
    }

    #[test]
    fn illegal_bytes_are_rewritten() {
        let name = build_name("a/b c", "srv", NamingMode::Promiscuous);
        assert_eq!(name, "/synchro.srv_a_b_c");
    }

    #[test]
    fn over_long_identities_truncate_consistently() {
        let long = "x".repeat(400);
        let a = build_name(&long, "srv", NamingMode::UserScoped);
        let b = build_name(&long, "srv", NamingMode::UserScoped);
        assert_eq!(a.len(), SYNC_MAX_NAME_SIZE);
        assert_eq!(a, b);
    }
}
