//! Route handlers.

pub mod system;
