pub mod cli;
pub mod record;
