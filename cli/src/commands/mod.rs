pub mod cli;
pub mod save;
