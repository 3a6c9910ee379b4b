//! Output surface the flows write to
//!
//! A [`Screen`] is whatever shows results to the user: the terminal, the
//! browser page in serve mode, or a test recorder. Flows only ever talk to
//! this trait, never to a concrete output.

use crate::panel::Panels;
use crate::view::{DetailRow, LegendItem};

/// Placeholder written into the topic output while a prediction is in flight
pub const LOADING: &str = "Loading...";

/// Regions that flows show and hide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Single-comment result panel
    SingleResult,
    /// Card holding loading indicator and results of a video analysis
    AnalysisCard,
    Loading,
    Results,
}

/// Text outputs that flows write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    Topic,
    Sentiment,
    TopTopic,
    TopSentiment,
}

pub trait Screen {
    /// Blocking notice
    fn alert(&mut self, message: &str);

    /// Ask the user for a value; `None` when they decline
    fn prompt(&mut self, message: &str) -> Option<String>;

    fn set_text(&mut self, output: Output, text: &str);

    fn set_visible(&mut self, region: Region, visible: bool);

    /// Replace the results region with a failure banner
    fn show_failure(&mut self, message: &str);

    fn show_legends(&mut self, topics: &[LegendItem], sentiments: &[LegendItem]);

    fn show_table(&mut self, rows: &[DetailRow]);
}

/// Screen that remembers everything written to it.
///
/// Serve mode runs flows against one of these and ships the captured state to
/// the browser as JSON.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct CapturedScreen {
    pub alerts: Vec<String>,
    pub prompts: Vec<String>,
    pub texts: Vec<(Output, String)>,
    pub visible: Vec<Region>,
    pub failure: Option<String>,
    pub topic_legend: Vec<LegendItem>,
    pub sentiment_legend: Vec<LegendItem>,
    pub rows: Vec<DetailRow>,
    pub panels: Panels,
    #[serde(skip)]
    prompt_answer: Option<String>,
}

impl CapturedScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next prompt with `answer` (`None` declines)
    pub fn with_prompt_answer(mut self, answer: Option<String>) -> Self {
        self.prompt_answer = answer;
        self
    }

    /// Latest text written to `output`
    pub fn text(&self, output: Output) -> Option<&str> {
        self.texts
            .iter()
            .rev()
            .find(|(o, _)| *o == output)
            .map(|(_, t)| t.as_str())
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.visible.contains(&region)
    }
}

impl Screen for CapturedScreen {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn prompt(&mut self, message: &str) -> Option<String> {
        self.prompts.push(message.to_string());
        self.prompt_answer.take()
    }

    fn set_text(&mut self, output: Output, text: &str) {
        self.texts.push((output, text.to_string()));
    }

    fn set_visible(&mut self, region: Region, visible: bool) {
        self.visible.retain(|r| *r != region);
        if visible {
            self.visible.push(region);
        }
    }

    fn show_failure(&mut self, message: &str) {
        self.failure = Some(message.to_string());
    }

    fn show_legends(&mut self, topics: &[LegendItem], sentiments: &[LegendItem]) {
        self.topic_legend = topics.to_vec();
        self.sentiment_legend = sentiments.to_vec();
    }

    fn show_table(&mut self, rows: &[DetailRow]) {
        self.rows = rows.to_vec();
    }
}
