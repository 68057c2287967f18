pub mod completion;
pub mod rename;
pub mod snippet;
mod text;

pub use text::{identifier_prefix_slice, is_keyword, is_valid_identifier, Mapper};
