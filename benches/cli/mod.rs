pub mod parse;
pub mod terminal;
