//! The core's small error taxonomy.
//!
//! Only resource exhaustion is recoverable: growing the node arena or the
//! depth-indexed leaf queue can fail like any other allocation. Everything
//! else — a missing suffix link, a caller handing us a shrinking
//! `common_prefix`, a reused end-of-string symbol — is either a broken
//! invariant (panic) or a caller contract violation (`debug_assert!` in
//! debug builds, unspecified otherwise). Those never produce an `EngineError`.

/// Failures the core can report to a caller.
///
/// `insert` and `output` are otherwise infallible: everything that is not
/// resource exhaustion is a programmer error and panics instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("allocation failed while growing the node arena")]
    ArenaExhausted,
    #[error("allocation failed while growing the leaf queue")]
    QueueExhausted,
}
