// src/core/mod.rs

pub mod errors;
pub mod interpolator;
pub mod invocation;
pub mod options;
pub mod registry;
pub mod result_parser;
pub mod selection;

#[cfg(test)]
pub(crate) mod test_support;
