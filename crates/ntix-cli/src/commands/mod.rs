//! Command implementations.

pub mod block;
pub mod find;
pub mod info;
pub mod ls;
