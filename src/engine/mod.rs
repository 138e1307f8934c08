//! The allocation engine: block codec, segregated free lists, heap manager,
//! arena registry and thread cache. Everything `unsafe` lives here, behind
//! the narrow seams documented in [`header`]; [`crate::facade`] is the only
//! other module allowed to call into it.

pub mod arena;
pub mod cache;
pub mod checker;
pub mod error;
pub mod header;
pub mod heap;
pub mod seglist;
