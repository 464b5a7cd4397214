//! Command implementations

pub mod calc;
pub mod completions;
pub mod eval;
pub mod import;
pub mod init;
pub mod new;
pub mod render;
pub mod validate;
