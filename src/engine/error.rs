//! Semantic error taxonomy for the allocator core.
//!
//! None of these ever cross the public `init`/`alloc`/`free` boundary as a
//! `Result` — those stay `bool`/`Option`/`()`. This enum exists for
//! [`log`] call sites and for the debug-assertion heap checker
//! ([`crate::engine::checker`]), purely internal error reporting.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// An arena's fixed-size mapping is exhausted.
    OutOfAddressSpace,
    /// The OS declined to provide a mapping.
    OutOfOsMemory,
    /// A pointer passed to `free` does not belong to any arena.
    InvalidFree,
    /// A boundary-tag consistency check failed (checker builds only).
    InvariantViolation,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::OutOfAddressSpace => "arena address space exhausted",
            Self::OutOfOsMemory => "OS declined to provide a memory mapping",
            Self::InvalidFree => "pointer does not belong to any arena",
            Self::InvariantViolation => "heap invariant violated",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for AllocError {}
