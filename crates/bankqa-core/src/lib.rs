//! bankqa-core: bank model, validators, quality linter and report emitter.
//!
//! This crate defines the typed item-bank model and the checks that run
//! over it: structural schema validation, whole-bank distribution
//! analysis, citation policy checks, and the heuristic quality linter.
//! Everything is a pure function of one input file.

pub mod citation;
pub mod config;
pub mod distribution;
pub mod error;
pub mod finding;
pub mod lint;
pub mod model;
pub mod parser;
pub mod report;
pub mod schema;
pub mod text;

pub use error::BankError;
pub use finding::{Finding, Level};
pub use model::Bank;
