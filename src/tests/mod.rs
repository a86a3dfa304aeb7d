//! Crate-level test suite: scenario tests on real thread tables and
//! property checks driven by a seeded generator.

mod helpers;
mod property;
