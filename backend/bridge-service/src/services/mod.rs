pub mod activities;
pub mod content_index;
pub mod context;
pub mod generator;
pub mod interest;
pub mod lifecycle;
pub mod scoring;
pub mod similarity;
pub mod templates;
pub mod trust;

pub use content_index::ContentIndex;
pub use context::{ContextService, ContextSource};
pub use lifecycle::RecommendationService;
pub use similarity::ExampleMatcher;
