pub mod similarity;
pub mod types;

pub use similarity::jaccard;
pub use types::{
    clamp_confidence, ContextEvent, ExtractedFact, FactCategory, IdentityFact, Maturity,
    Visibility,
};
