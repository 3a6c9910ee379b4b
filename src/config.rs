//! Runtime configuration
//!
//! [`Config`] collects everything a flow needs besides the service response:
//! where the service lives, where the credential cache is stored, which
//! category labels get special treatment, and how charts are colored and
//! sized. Defaults match the classification service's label set.

use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DB_PATH: &str = "commentlens.db";

/// Category labels with special meaning in the rendering pipeline.
///
/// Labels are compared after Unicode lowercasing, so `"Ärger"` matches
/// `"ärger"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    /// Topics never chosen as the headline topic
    pub excluded_topics: Vec<String>,
    /// Catch-all topic that defers to the runner-up in the headline
    pub catch_all: String,
    /// Topics that make a row censorable, in bar-chart order
    pub flagged_topics: Vec<String>,
    /// Sentiments that make a row censorable, in bar-chart order
    pub flagged_sentiments: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            excluded_topics: vec!["threat".to_string(), "abusive".to_string()],
            catch_all: "others".to_string(),
            flagged_topics: vec!["threat".to_string(), "abusive".to_string()],
            flagged_sentiments: vec!["hate".to_string()],
        }
    }
}

impl Taxonomy {
    pub fn is_excluded_topic(&self, label: &str) -> bool {
        contains_ci(&self.excluded_topics, label)
    }

    pub fn is_catch_all(&self, label: &str) -> bool {
        same_label(&self.catch_all, label)
    }

    pub fn is_flagged_topic(&self, label: &str) -> bool {
        contains_ci(&self.flagged_topics, label)
    }

    pub fn is_flagged_sentiment(&self, label: &str) -> bool {
        contains_ci(&self.flagged_sentiments, label)
    }
}

fn contains_ci(set: &[String], label: &str) -> bool {
    set.iter().any(|s| same_label(s, label))
}

/// Case-insensitive label equality
pub(crate) fn same_label(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Legend/slice colors, cycled by position
#[derive(Debug, Clone, PartialEq)]
pub struct Palette(Vec<String>);

impl Palette {
    pub fn new<S: Into<String>>(colors: impl IntoIterator<Item = S>) -> Self {
        Self(colors.into_iter().map(Into::into).collect())
    }

    pub fn topics() -> Self {
        Self::new([
            "#ff0000ff", "#ffe600ff", "#56adffff", "#5f5e00ff", "#00ff15ff",
            "#9966FF", "#FF9F40", "#cc5200ff", "#643000ff", "#702577ff",
        ])
    }

    pub fn sentiments() -> Self {
        Self::new(["#ff0000ff", "#ff7300ff", "#0051ffff", "#10d61aff"])
    }

    /// Color for the entry at `index`. An empty palette yields black.
    pub fn color(&self, index: usize) -> &str {
        if self.0.is_empty() {
            return "#000000";
        }
        &self.0[index % self.0.len()]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fixed canvas size in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl ChartSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub db_path: PathBuf,
    pub taxonomy: Taxonomy,
    pub topic_palette: Palette,
    pub sentiment_palette: Palette,
    pub topic_pie_size: ChartSize,
    pub sentiment_pie_size: ChartSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            taxonomy: Taxonomy::default(),
            topic_palette: Palette::topics(),
            sentiment_palette: Palette::sentiments(),
            topic_pie_size: ChartSize::new(175, 200),
            sentiment_pie_size: ChartSize::new(175, 145),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn with_palettes(mut self, topics: Palette, sentiments: Palette) -> Self {
        self.topic_palette = topics;
        self.sentiment_palette = sentiments;
        self
    }
}
