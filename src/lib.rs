#![allow(clippy::collapsible_if)]

pub mod analysis;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod language;
pub mod lsp;
pub mod packages;
pub mod types;

#[cfg(test)]
mod tests;
