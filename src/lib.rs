pub mod discover;
pub mod error;
pub mod inject;
pub mod parse;
pub mod pipeline;
pub mod render;
pub mod syntax;
