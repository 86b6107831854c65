pub mod content;
pub mod context;
pub mod recommendation;
pub mod training;

pub use content::{
    ConsensusThresholds, ContentDocument, ContentSearchResult, ContentType, Engagement,
    IndexedContent, LowThresholds, SearchOptions, TierThresholds, TrustThresholds, TrustTier,
};
pub use context::{
    CityContext, CityKey, EventAttendance, EventSummary, GroupMembership, GroupSummary,
    InterestScore, InterestSource, UserContext,
};
pub use recommendation::{
    Recommendation, RecommendationFilter, RecommendationStats, RecommendationStatus,
    RecommendationType, Urgency,
};
pub use training::{ExampleRatings, ExampleStatus, SimilarQuery, TrainingExample};
