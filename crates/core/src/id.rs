// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation and validation
//!
//! All externally visible identifiers are domain-prefixed hex tokens of the
//! form `<domain>-<32 lowercase hex>` (a v4 UUID without hyphens).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Errors from identifier validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("id '{id}' does not start with domain prefix '{prefix}-'")]
    WrongPrefix { id: String, prefix: &'static str },
    #[error("id '{id}' must end in 32 hexadecimal characters")]
    BadSuffix { id: String },
}

/// Identifier domains, each with its wire prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Thread,
    Run,
    AgentExecute,
}

impl Domain {
    pub fn prefix(&self) -> &'static str {
        match self {
            Domain::Thread => "thread",
            Domain::Run => "run",
            Domain::AgentExecute => "task_agent_execute",
        }
    }

    /// Generate a fresh domain-prefixed identifier.
    pub fn generate(&self, ids: &impl IdGen) -> String {
        format!("{}-{}", self.prefix(), ids.next())
    }
}

/// Check that `id` is `<domain prefix>-<32 hex>`.
///
/// Event UUIDs arrive from workers over the publish path and are validated
/// here before they reach the log.
pub fn validate_prefixed_id(domain: Domain, id: &str) -> Result<(), IdError> {
    let prefix = domain.prefix();
    let suffix = id
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .ok_or_else(|| IdError::WrongPrefix {
            id: id.to_string(),
            prefix,
        })?;

    if suffix.len() != 32 || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IdError::BadSuffix { id: id.to_string() });
    }
    Ok(())
}

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Generates the hex suffix of new identifiers
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> String;
}

/// UUID-based generator for production use (32 lowercase hex, no hyphens)
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Sequential generator for deterministic tests.
///
/// Produces 32-hex suffixes so generated ids still pass
/// [`validate_prefixed_id`].
#[derive(Clone)]
pub struct SequentialIdGen {
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{n:032x}")
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
