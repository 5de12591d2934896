//! Query functions, grouped by the entity they operate on.
//!
//! All queries use `db.query_raw_params`/`db.exec_raw_params` with
//! positional `$N` parameters rather than a query-builder DSL — the
//! summary coordinator in particular depends on hand-written
//! `INSERT ... ON CONFLICT` / conditional `UPDATE` statements it can
//! reason about precisely.

pub mod links;
pub mod paper_chat;
pub mod papers;
pub mod prompts;
pub mod recommender;
pub mod research;
pub mod seed;
pub mod summaries;
pub mod users;
