//! QAT: QA Tolerance Toolkit
//!
//! Evaluates AERB diagnostic X-ray QA test tables against tolerances and
//! keeps reports as plain-text YAML files.

pub mod cli;
pub mod core;
pub mod entities;
pub mod import;
pub mod render;
pub mod yaml;
