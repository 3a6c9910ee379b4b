//! Response-to-view transformation
//!
//! [`AnalysisView::build`] turns one [`AnalysisResponse`] into everything the
//! results view shows: the headline topic and sentiment, the two legends, the
//! flagged-category counts, three chart specs and the detail table. It is a
//! pure function of the response and the [`Config`]; nothing is cached
//! between analyses.
//!
//! # Headline topic
//!
//! Topics are ranked by percentage (descending, stable, so ties keep the
//! order the service sent them in). Excluded topics such as `threat` never
//! become the headline. When the best remaining topic is the catch-all
//! (`others`) and a runner-up exists, the headline reads
//! `"<Runner-up> and Others"`.

use crate::charts::ChartSpec;
use crate::config::{same_label, Config, Palette, Taxonomy};
use crate::model::{AnalysisResponse, DetailedResult, Percentages};
use serde::Serialize;

/// One colored entry of a percentage legend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub percentage: f64,
    /// Percentage with one decimal digit and a `%` suffix
    pub display: String,
    pub color: String,
}

/// Rows matching one flagged label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

/// Flagged-category counters from a single scan over the detail rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub topics: Vec<CategoryCount>,
    pub sentiments: Vec<CategoryCount>,
}

impl CategoryCounts {
    pub fn scan(rows: &[DetailedResult], taxonomy: &Taxonomy) -> Self {
        let mut topics: Vec<CategoryCount> = taxonomy
            .flagged_topics
            .iter()
            .map(|l| CategoryCount { label: l.clone(), count: 0 })
            .collect();
        let mut sentiments: Vec<CategoryCount> = taxonomy
            .flagged_sentiments
            .iter()
            .map(|l| CategoryCount { label: l.clone(), count: 0 })
            .collect();

        for row in rows {
            // A row has one topic and one sentiment, so at most one counter of each group moves
            if let Some(c) = topics.iter_mut().find(|c| same_label(&c.label, &row.topic)) {
                c.count += 1;
            }
            if let Some(c) = sentiments.iter_mut().find(|c| same_label(&c.label, &row.sentiment)) {
                c.count += 1;
            }
        }

        Self { topics, sentiments }
    }

    pub fn topic(&self, label: &str) -> u64 {
        find_count(&self.topics, label)
    }

    pub fn sentiment(&self, label: &str) -> u64 {
        find_count(&self.sentiments, label)
    }

    /// Topic counters then sentiment counters, in taxonomy order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryCount> {
        self.topics.iter().chain(self.sentiments.iter())
    }
}

fn find_count(counts: &[CategoryCount], label: &str) -> u64 {
    counts
        .iter()
        .find(|c| same_label(&c.label, label))
        .map(|c| c.count)
        .unwrap_or(0)
}

/// One line of the detail table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    /// 1-based position in the response
    pub index: usize,
    pub comment: String,
    pub topic: String,
    pub sentiment: String,
    pub censorable: bool,
}

/// Everything the results view displays for one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub top_topic: String,
    pub top_sentiment: String,
    pub total_comments: Option<u64>,
    pub topic_legend: Vec<LegendItem>,
    pub sentiment_legend: Vec<LegendItem>,
    pub counts: CategoryCounts,
    pub censorable_count: u64,
    pub censorable_percentage: f64,
    pub bar_chart: ChartSpec,
    pub topic_pie: ChartSpec,
    pub sentiment_pie: ChartSpec,
    pub rows: Vec<DetailRow>,
}

impl AnalysisView {
    pub fn build(response: &AnalysisResponse, config: &Config) -> Self {
        let taxonomy = &config.taxonomy;

        let top_topic = top_topic_display(&response.topic_percentages, taxonomy);
        let top_sentiment = top_label(&response.sentiment_percentages);

        let topic_legend = legend(&response.topic_percentages, &config.topic_palette);
        let sentiment_legend = legend(&response.sentiment_percentages, &config.sentiment_palette);

        let counts = CategoryCounts::scan(&response.detailed_results, taxonomy);
        let censorable = &response.censorable_results;
        let bar_chart = censorable_bar(&counts, censorable.count, censorable.percentage);

        let topic_pie = ChartSpec::pie(
            response.topic_percentages.labels(),
            response.topic_percentages.values(),
            &config.topic_palette,
            config.topic_pie_size,
        );
        let sentiment_pie = ChartSpec::pie(
            response.sentiment_percentages.labels(),
            response.sentiment_percentages.values(),
            &config.sentiment_palette,
            config.sentiment_pie_size,
        );

        let rows = detail_rows(&response.detailed_results, taxonomy);

        Self {
            top_topic,
            top_sentiment,
            total_comments: response.total_comments,
            topic_legend,
            sentiment_legend,
            counts,
            censorable_count: censorable.count,
            censorable_percentage: censorable.percentage,
            bar_chart,
            topic_pie,
            sentiment_pie,
            rows,
        }
    }

    pub fn censorable_rows(&self) -> impl Iterator<Item = &DetailRow> {
        self.rows.iter().filter(|r| r.censorable)
    }
}

/// Topics eligible for the headline, best first.
///
/// `sort_by` is stable, so equal percentages keep source order.
pub fn rank_topics<'a>(topics: &'a Percentages, taxonomy: &Taxonomy) -> Vec<(&'a str, f64)> {
    let mut ranked: Vec<(&str, f64)> = topics
        .iter()
        .filter(|(label, _)| !taxonomy.is_excluded_topic(label))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Headline topic text. Empty when no topic is eligible.
pub fn top_topic_display(topics: &Percentages, taxonomy: &Taxonomy) -> String {
    let ranked = rank_topics(topics, taxonomy);
    match ranked.as_slice() {
        [] => String::new(),
        [(first, _), (second, _), ..] if taxonomy.is_catch_all(first) => {
            format!("{} and Others", capitalize_first(second))
        }
        [(first, _), ..] => capitalize_first(first),
    }
}

/// Label with the strictly largest value; the first one wins ties.
///
/// Empty when the mapping is empty.
pub fn top_label(percentages: &Percentages) -> String {
    percentages
        .iter()
        .fold(None::<(&str, f64)>, |best, (label, value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((label, value)),
        })
        .map(|(label, _)| label.to_string())
        .unwrap_or_default()
}

/// Legend entries in source order, colors cycled from `palette`
pub fn legend(percentages: &Percentages, palette: &Palette) -> Vec<LegendItem> {
    percentages
        .iter()
        .enumerate()
        .map(|(i, (label, value))| LegendItem {
            label: label.to_string(),
            percentage: value,
            display: format_percent(value),
            color: palette.color(i).to_string(),
        })
        .collect()
}

pub fn detail_rows(rows: &[DetailedResult], taxonomy: &Taxonomy) -> Vec<DetailRow> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| DetailRow {
            index: i + 1,
            comment: r.comment.clone(),
            topic: r.topic.clone(),
            sentiment: r.sentiment.clone(),
            censorable: taxonomy.is_flagged_topic(&r.topic) || taxonomy.is_flagged_sentiment(&r.sentiment),
        })
        .collect()
}

/// Bar chart of flagged-category counts, titled with the service's own totals
pub fn censorable_bar(counts: &CategoryCounts, count: u64, percentage: f64) -> ChartSpec {
    let labels = counts.iter().map(|c| capitalize_first(&c.label)).collect();
    let values = counts.iter().map(|c| c.count as f64).collect();
    let colors = counts
        .topics
        .iter()
        .map(|_| "#ff6b6b".to_string())
        .chain(counts.sentiments.iter().map(|_| "#ffa94d".to_string()))
        .collect();
    ChartSpec::bar(
        format!("Censorable comments: {} ({:.1}%)", count, percentage),
        labels,
        values,
        colors,
    )
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Upper-case the first character, leave the rest untouched
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
