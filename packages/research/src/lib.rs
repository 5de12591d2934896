#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Research Graph.
//!
//! A five-role state machine — Coordinator → Planner → Supervisor ↔
//! Agent → Tools → Summary — driven over a `ResearchSession`'s message
//! log. Structurally identical for both tool-flavour variants
//! (`graph::ToolFlavor::Research` uses web tools, `::Rag` uses the
//! in-corpus `corpus_search` tool only); only the tool set and per-role
//! prompts differ.

pub mod graph;
pub mod roles;

pub use graph::{ResearchError, ToolFlavor, run_research};
