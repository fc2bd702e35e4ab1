#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    variant_size_differences,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]

//! The reusable library powering `mamegen`: a small DSL for describing mock tabular data, and a
//! deterministic generator for it.
//!
//! The pipeline is lexer ([`token`]) → parser ([`parser`]) → analyser ([`analyser`]) → generator
//! ([`gen`]) → writer ([`writer`]).

pub mod analyser;
pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod error;
pub mod gen;
pub mod ir;
pub mod parser;
pub mod reference;
pub mod rules;
pub mod span;
pub mod token;
pub mod value;
pub mod writer;

pub use error::Error;
