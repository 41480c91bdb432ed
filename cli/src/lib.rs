//! dytomate-cli library: command implementations exposed for tests.

pub mod commands;
pub mod replay;
