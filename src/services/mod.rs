pub mod genre_analysis;
pub mod providers;
pub mod recommendations;
pub mod scoring;
pub mod session;
pub mod stores;

pub use recommendations::RecommendationEngine;
pub use session::SessionRegistry;
