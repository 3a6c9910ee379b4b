//! commentlens - Topic and sentiment views for YouTube comments
//!
//! commentlens is the client side of a comment classification service. The
//! service labels comments with a topic ("politics", "sports", "threat", ...)
//! and a sentiment ("joy", "hate", ...); commentlens sends it work and turns
//! its answers into something a moderator can read at a glance.
//!
//! # Flows
//!
//! 1. **Single comment**: one comment in, its topic and sentiment out.
//!
//! 2. **Video analysis**: a video URL and a YouTube API key in, a results
//!    view out. The view has a headline topic and sentiment, percentage
//!    legends, pie charts, a bar chart of flagged categories and a row-by-row
//!    table with censorable rows highlighted. The API key is asked for once
//!    and cached in a local SQLite file.
//!
//! Flows render through the [`screen::Screen`] trait, so the same logic
//! drives the terminal, the local web UI and the tests.
//!
//! # Quick Start
//!
//! ```no_run
//! use commentlens::{Config, HttpService};
//! use commentlens::credential::MemoryStore;
//! use commentlens::flows::{Outcome, VideoAnalyzer};
//! use commentlens::charts::ChartRegistry;
//! use commentlens::screen::CapturedScreen;
//!
//! let config = Config::default();
//! let service = HttpService::new(config.server.clone()).unwrap();
//! let store = MemoryStore::new();
//! let mut analyzer = VideoAnalyzer::new(config, ChartRegistry::new());
//!
//! let mut screen = CapturedScreen::new().with_prompt_answer(Some("my-api-key".into()));
//! match analyzer.run(&service, &store, &mut screen, "https://youtu.be/dQw4w9WgXcQ") {
//!     Outcome::Done(view) => println!("Top topic: {}", view.top_topic),
//!     Outcome::Failed(msg) => println!("Failed: {}", msg),
//!     Outcome::Blocked => println!("Missing input: {:?}", screen.alerts),
//! }
//! ```
//!
//! # Headline Rules
//!
//! | Topic percentages                     | Headline            |
//! |---------------------------------------|---------------------|
//! | `{hate: 10, others: 50, joy: 40}`     | Joy and Others      |
//! | `{politics: 70, others: 30}`          | Politics            |
//! | `{threat: 90, others: 5, joy: 5}`     | Joy and Others      |
//!
//! "threat" and "abusive" never make the headline; "others" defers to the
//! runner-up when there is one.
//!
//! # Modules
//!
//! - [`api`]: classification service client
//! - [`flows`]: single-comment and video-analysis flows
//! - [`view`]: response → results view transformation
//! - [`charts`]: chart specs and owned chart slots
//! - [`credential`] / [`db`]: cached API key
//! - [`report`]: Output formatters (HTML, JSON)
//! - [`serve`]: local web UI
//! - [`backdrop`]: animated page background

pub mod api;
pub mod backdrop;
pub mod charts;
pub mod config;
pub mod credential;
pub mod db;
pub mod flows;
pub mod model;
pub mod panel;
pub mod report;
pub mod schema;
pub mod screen;
pub mod serve;
pub mod terminal;
pub mod view;

pub use api::{ApiError, ClassificationService, HttpService};
pub use config::{Config, Palette, Taxonomy};
pub use db::{Database, DbError};
pub use model::{AnalysisResponse, DetailedResult, Percentages, Prediction};
pub use panel::{PanelId, Panels};
pub use view::AnalysisView;

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is correct and documented.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _config = Config::default();
        let _taxonomy = Taxonomy::default();
        let _panels = Panels::default();
        let _ = PanelId::AdvancedResults;
    }

    #[test]
    fn test_view_from_crate_root() {
        let response = AnalysisResponse {
            topic_percentages: [("hate", 10.0), ("others", 50.0), ("joy", 40.0)].into_iter().collect(),
            ..Default::default()
        };
        let view = AnalysisView::build(&response, &Config::default());
        assert_eq!(view.top_topic, "Joy and Others");
        assert_eq!(view.top_sentiment, "");
    }

    #[test]
    fn test_http_service_accessible() {
        let service = HttpService::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(service.base_url(), "http://127.0.0.1:5000");
    }
}
