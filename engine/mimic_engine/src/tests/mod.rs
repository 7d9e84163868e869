//! Scenario tests for the clone engine.
//!
//! Each file covers one behavioral area; shared type/graph setup lives
//! in `fixtures`.


mod concurrency_tests;
mod into_tests;
