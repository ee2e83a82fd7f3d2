pub mod domain;
pub mod error;
pub mod events;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
