//! Consumption side: turn stored facts and events into a compact block of
//! text an assistant can be primed with.
//!
//! [`merge::merge_facts_for_injection`] reads every [`sources::FactSource`]
//! concurrently, applies [`decay`], deduplicates, enforces character budgets,
//! and [`render`] formats the result.

pub mod decay;
pub mod merge;
pub mod render;
pub mod sources;

pub use decay::{decay_and_rank, effective_confidence, ScoredFact};
pub use merge::{merge_facts_for_injection, InjectionContext};
pub use render::render_context;
pub use sources::{configured_sources, FactSource, LocalSource, RemoteSource};
