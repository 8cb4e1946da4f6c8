pub mod client;
pub mod media_type;
pub mod parser;

pub use client::*;
pub use media_type::*;
pub use parser::*;
