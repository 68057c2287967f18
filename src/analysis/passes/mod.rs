pub mod appends;
pub mod inspect;

use super::Analyzer;

/// Every analyzer the crate ships, in registration order.
pub fn all() -> Vec<&'static Analyzer> {
    vec![&inspect::ANALYZER, &appends::ANALYZER]
}

/// Looks an analyzer up by name.
pub fn by_name(name: &str) -> Option<&'static Analyzer> {
    all().into_iter().find(|a| a.name == name)
}
