pub mod command_reader;
pub mod replay;
