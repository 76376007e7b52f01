mod generate;

pub use generate::{generate_symbols_command, GenerateArgs};
