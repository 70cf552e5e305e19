//! Tessera: a user fact lifecycle engine for AI assistants.
//!
//! Tessera learns who a user is through a short guided interview, stores what
//! it learned as confidence-weighted facts, and later serves a compact,
//! decayed, deduplicated summary that can be injected into an assistant's
//! prompt. It runs as an [MCP](https://modelcontextprotocol.io/) server or from
//! the terminal.
//!
//! | Stage | Module | What happens |
//! |-------|--------|--------------|
//! | Elicit | [`interview`] | Four core questions, a branch decision, up to three follow-ups |
//! | Extract | [`interview::extractor`] | Each answer becomes categorized facts (caller-supplied or model-derived) |
//! | Persist | [`store`] | Session state after every turn; identity record and facts on completion |
//! | Serve | [`inject`] | Merge sources, decay confidence, rank by maturity, budget, render |
//!
//! # Modules
//!
//! - [`config`] — TOML configuration with environment overrides
//! - [`db`] — SQLite open, schema, migrations, and health checks
//! - [`completion`] — the text-completion capability the engine is given
//! - [`fact`] — fact types and the token-overlap similarity scorer
//! - [`interview`] — questions, extraction, branching, output building, the
//!   conductor state machine, and resumable sessions
//! - [`store`] — SQLite persistence for sessions, identity records, facts, and events
//! - [`inject`] — consumption-side merge, decay, and rendering

pub mod completion;
pub mod config;
pub mod db;
pub mod fact;
pub mod inject;
pub mod interview;
pub mod store;
