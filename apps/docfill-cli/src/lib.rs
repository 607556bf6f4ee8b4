//! Offline tooling for docfill templates
//!
//! Each command works on bytes or a [`TemplateSource`](docfill_core::TemplateSource)
//! so the binary only handles argument parsing and file I/O.

pub mod commands;
