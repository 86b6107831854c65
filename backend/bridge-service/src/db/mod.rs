pub mod content_repo;
pub mod context_repo;
pub mod recommendation_repo;
pub mod settings_repo;
pub mod training_repo;

pub use content_repo::{ContentStore, InMemoryContentStore, PostgresContentStore};
pub use context_repo::PostgresContextSource;
pub use recommendation_repo::{
    InMemoryRecommendationStore, PostgresRecommendationStore, RecommendationStore,
};
pub use settings_repo::{InMemorySettingsStore, PostgresSettingsStore, ThresholdSource};
pub use training_repo::{ExampleStore, InMemoryExampleStore, PostgresExampleStore};
