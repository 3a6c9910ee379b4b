//! Report generation for analysis results
//!
//! Writes one finished [`AnalysisView`] to a file:
//!
//! - **HTML**: standalone page with Chart.js charts, legends, collapsible
//!   panels and the detail table
//! - **JSON**: the serialized view plus report metadata
//!
//! # Usage
//!
//! ```ignore
//! use commentlens::report::{self, Report};
//!
//! let report = Report::new(url, &view);
//! report::generate("report.html", &report)?;  // HTML
//! report::generate("report.json", &report)?;  // JSON
//! ```

pub mod html;
pub mod json;

use crate::backdrop::Backdrop;
use crate::panel::Panels;
use crate::view::AnalysisView;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Everything a report file is rendered from
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    pub url: String,
    pub generated: String,
    pub summary: Summary,
    pub view: &'a AnalysisView,
    /// Initial state of the collapsible panels
    pub panels: Panels,
    /// Decorative SVG drawn behind the HTML page
    #[serde(skip)]
    pub backdrop: Option<String>,
}

impl<'a> Report<'a> {
    pub fn new(url: impl Into<String>, view: &'a AnalysisView) -> Self {
        Self {
            url: url.into(),
            generated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            summary: Summary::from_view(view),
            view,
            panels: Panels::default(),
            backdrop: None,
        }
    }

    pub fn with_panels(mut self, panels: Panels) -> Self {
        self.panels = panels;
        self
    }

    /// Freeze the backdrop's current layers into the page
    pub fn with_backdrop(mut self, backdrop: &Backdrop) -> Self {
        self.backdrop = Some(backdrop.to_svg());
        self
    }
}

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, report: &Report) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, report),
        _ => html::write(&mut file, report),
    }
}

/// Headline numbers shown at the top of a report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Comments the service analyzed, or the table length when it didn't say
    pub total: u64,
    pub censorable: u64,
    pub censorable_percentage: f64,
    /// Rows flagged in the detail table
    pub flagged_rows: usize,
    pub top_topic: String,
    pub top_sentiment: String,
}

impl Summary {
    pub fn from_view(view: &AnalysisView) -> Self {
        Self {
            total: view.total_comments.unwrap_or(view.rows.len() as u64),
            censorable: view.censorable_count,
            censorable_percentage: view.censorable_percentage,
            flagged_rows: view.censorable_rows().count(),
            top_topic: view.top_topic.clone(),
            top_sentiment: view.top_sentiment.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{AnalysisResponse, CensorableResults, DetailedResult, Percentages};

    // ==========================================================================
    // SUMMARY STATISTICS TESTS
    // ==========================================================================
    //
    // The Summary is displayed at the top of every report. The service's own
    // comment total wins over the number of table rows.
    // ==========================================================================

    pub(crate) fn sample_view() -> AnalysisView {
        let response = AnalysisResponse {
            topic_percentages: [("politics", 40.0), ("others", 35.0), ("threat", 25.0)]
                .into_iter()
                .collect::<Percentages>(),
            sentiment_percentages: [("neutral", 70.0), ("hate", 30.0)].into_iter().collect(),
            censorable_results: CensorableResults { count: 2, percentage: 66.7 },
            detailed_results: vec![
                DetailedResult::new("vote for me", "politics", "neutral"),
                DetailedResult::new("<b>watch out</b>", "Threat", "neutral"),
                DetailedResult::new("ugh", "others", "hate"),
            ],
            total_comments: None,
        };
        AnalysisView::build(&response, &Config::default())
    }

    #[test]
    fn test_summary_from_view() {
        let view = sample_view();
        let summary = Summary::from_view(&view);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.censorable, 2);
        assert_eq!(summary.flagged_rows, 2);
        assert_eq!(summary.top_topic, "Politics");
        assert_eq!(summary.top_sentiment, "neutral");
    }

    #[test]
    fn test_summary_prefers_service_total() {
        let mut view = sample_view();
        view.total_comments = Some(500);
        assert_eq!(Summary::from_view(&view).total, 500);
    }

    #[test]
    fn test_summary_default() {
        let summary = Summary::default();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.flagged_rows, 0);
        assert!(summary.top_topic.is_empty());
    }

    // ==========================================================================
    // FORMAT SELECTION TESTS
    // ==========================================================================

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let view = sample_view();
        let report = Report::new("https://youtu.be/abc", &view);

        let html_path = dir.path().join("out.HTML");
        let json_path = dir.path().join("out.json");
        let other_path = dir.path().join("out.txt");
        generate(&html_path, &report).unwrap();
        generate(&json_path, &report).unwrap();
        generate(&other_path, &report).unwrap();

        let html = std::fs::read_to_string(html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["url"], "https://youtu.be/abc");

        // Unknown extensions fall back to HTML
        let other = std::fs::read_to_string(other_path).unwrap();
        assert!(other.starts_with("<!DOCTYPE html>"));
    }
}
