//! Chart specifications and owned chart handles
//!
//! A [`ChartSpec`] is a backend-neutral description of a pie or bar chart.
//! Surfaces (a terminal, a browser page, a test recorder) turn specs into
//! live chart instances through the [`ChartSurface`] trait.
//!
//! Each chart position is a [`ChartSlot`] that owns at most one live handle.
//! Replacing a chart always disposes the previous instance before the new one
//! is created, so repeated analyses never accumulate charts.

use crate::config::{ChartSize, Palette};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
}

/// Identifies one of the three chart positions on the results view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotId {
    TopicPie,
    SentimentPie,
    Censorable,
}

impl SlotId {
    /// DOM id of the canvas this slot draws into
    pub fn canvas_id(&self) -> &'static str {
        match self {
            SlotId::TopicPie => "topicChart",
            SlotId::SentimentPie => "sentimentChart",
            SlotId::Censorable => "censorableChart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
    /// Fixed canvas size; `None` lets the surface pick
    pub size: Option<ChartSize>,
    pub show_legend: bool,
    pub responsive: bool,
}

impl ChartSpec {
    /// Fixed-size pie without a legend
    pub fn pie(labels: Vec<String>, values: Vec<f64>, palette: &Palette, size: ChartSize) -> Self {
        let colors = (0..labels.len()).map(|i| palette.color(i).to_string()).collect();
        Self {
            kind: ChartKind::Pie,
            title: None,
            labels,
            values,
            colors,
            size: Some(size),
            show_legend: false,
            responsive: false,
        }
    }

    pub fn bar(title: impl Into<String>, labels: Vec<String>, values: Vec<f64>, colors: Vec<String>) -> Self {
        Self {
            kind: ChartKind::Bar,
            title: Some(title.into()),
            labels,
            values,
            colors,
            size: None,
            show_legend: false,
            responsive: true,
        }
    }

    /// Chart.js configuration object for browser surfaces
    pub fn to_chartjs(&self) -> Value {
        let mut plugins = json!({ "legend": { "display": self.show_legend } });
        if let Some(ref title) = self.title {
            plugins["title"] = json!({ "display": true, "text": title });
        }

        let mut options = json!({
            "responsive": self.responsive,
            "maintainAspectRatio": false,
            "plugins": plugins,
        });
        if self.kind == ChartKind::Bar {
            options["scales"] = json!({ "y": { "beginAtZero": true, "ticks": { "precision": 0 } } });
        }

        json!({
            "type": self.kind,
            "data": {
                "labels": self.labels,
                "datasets": [{
                    "data": self.values,
                    "backgroundColor": self.colors,
                    "borderWidth": 0,
                }],
            },
            "options": options,
        })
    }
}

/// Something that can host live charts
pub trait ChartSurface {
    type Handle;

    fn create(&mut self, slot: SlotId, spec: &ChartSpec) -> Self::Handle;

    /// Release a live chart. Called exactly once per handle.
    fn destroy(&mut self, handle: Self::Handle);
}

/// One chart position owning at most one live handle
#[derive(Debug)]
pub struct ChartSlot<H> {
    id: SlotId,
    handle: Option<H>,
}

impl<H> ChartSlot<H> {
    pub fn new(id: SlotId) -> Self {
        Self { id, handle: None }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Dispose the current chart (if any), then create one from `spec`
    pub fn replace<S>(&mut self, surface: &mut S, spec: &ChartSpec)
    where
        S: ChartSurface<Handle = H>,
    {
        self.clear(surface);
        self.handle = Some(surface.create(self.id, spec));
    }

    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: ChartSurface<Handle = H>,
    {
        if let Some(old) = self.handle.take() {
            surface.destroy(old);
        }
    }
}

/// The three chart slots of the results view plus the surface they draw on
pub struct ChartBoard<S: ChartSurface> {
    surface: S,
    topic: ChartSlot<S::Handle>,
    sentiment: ChartSlot<S::Handle>,
    censorable: ChartSlot<S::Handle>,
}

impl<S: ChartSurface> ChartBoard<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            topic: ChartSlot::new(SlotId::TopicPie),
            sentiment: ChartSlot::new(SlotId::SentimentPie),
            censorable: ChartSlot::new(SlotId::Censorable),
        }
    }

    /// Replace all three charts, bar chart first
    pub fn show(&mut self, bar: &ChartSpec, topic_pie: &ChartSpec, sentiment_pie: &ChartSpec) {
        self.censorable.replace(&mut self.surface, bar);
        self.topic.replace(&mut self.surface, topic_pie);
        self.sentiment.replace(&mut self.surface, sentiment_pie);
    }

    pub fn clear(&mut self) {
        self.censorable.clear(&mut self.surface);
        self.topic.clear(&mut self.surface);
        self.sentiment.clear(&mut self.surface);
    }

    pub fn live_slots(&self) -> usize {
        [&self.topic, &self.sentiment, &self.censorable]
            .iter()
            .filter(|s| s.is_live())
            .count()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: ChartSurface> Drop for ChartBoard<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Surface that keeps every live chart in memory.
///
/// Serve mode uses it to hold the charts of the latest analysis; tests use it
/// to count live instances.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    next_id: u64,
    live: Vec<(u64, SlotId, ChartSpec)>,
    created: u64,
    destroyed: u64,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> impl Iterator<Item = (SlotId, &ChartSpec)> {
        self.live.iter().map(|(_, slot, spec)| (*slot, spec))
    }

    pub fn live_in(&self, slot: SlotId) -> usize {
        self.live.iter().filter(|(_, s, _)| *s == slot).count()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }
}

impl ChartSurface for ChartRegistry {
    type Handle = u64;

    fn create(&mut self, slot: SlotId, spec: &ChartSpec) -> u64 {
        self.next_id += 1;
        self.created += 1;
        self.live.push((self.next_id, slot, spec.clone()));
        self.next_id
    }

    fn destroy(&mut self, handle: u64) {
        let before = self.live.len();
        self.live.retain(|(id, _, _)| *id != handle);
        if self.live.len() < before {
            self.destroyed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pie() -> ChartSpec {
        ChartSpec::pie(
            vec!["joy".into(), "others".into()],
            vec![40.0, 60.0],
            &Palette::topics(),
            ChartSize::new(175, 200),
        )
    }

    fn sample_bar() -> ChartSpec {
        ChartSpec::bar(
            "Censorable comments: 2 (10.0%)",
            vec!["Threat".into(), "Abusive".into(), "Hate".into()],
            vec![1.0, 0.0, 1.0],
            vec!["#f00".into(); 3],
        )
    }

    // ==========================================================================
    // CHART CONFIG TESTS
    // ==========================================================================

    #[test]
    fn test_pie_colors_follow_palette() {
        let spec = sample_pie();
        assert_eq!(spec.colors, vec!["#ff0000ff", "#ffe600ff"]);
        assert!(!spec.show_legend);
        assert!(!spec.responsive);
    }

    #[test]
    fn test_chartjs_pie_config() {
        let cfg = sample_pie().to_chartjs();
        assert_eq!(cfg["type"], "pie");
        assert_eq!(cfg["data"]["labels"][1], "others");
        assert_eq!(cfg["data"]["datasets"][0]["data"][0], 40.0);
        assert_eq!(cfg["options"]["responsive"], false);
        assert_eq!(cfg["options"]["plugins"]["legend"]["display"], false);
        assert!(cfg["options"].get("scales").is_none());
    }

    #[test]
    fn test_chartjs_bar_config_has_title() {
        let cfg = sample_bar().to_chartjs();
        assert_eq!(cfg["type"], "bar");
        assert_eq!(cfg["options"]["plugins"]["title"]["text"], "Censorable comments: 2 (10.0%)");
        assert_eq!(cfg["options"]["scales"]["y"]["beginAtZero"], true);
    }

    // ==========================================================================
    // LIFECYCLE TESTS
    // ==========================================================================
    //
    // A slot must dispose its previous chart before creating the next one.
    // ==========================================================================

    #[test]
    fn test_slot_replace_disposes_previous() {
        let mut reg = ChartRegistry::new();
        let mut slot = ChartSlot::new(SlotId::TopicPie);

        slot.replace(&mut reg, &sample_pie());
        slot.replace(&mut reg, &sample_pie());
        slot.replace(&mut reg, &sample_pie());

        assert_eq!(reg.live_count(), 1);
        assert_eq!(reg.created(), 3);
        assert_eq!(reg.destroyed(), 2);
    }

    #[test]
    fn test_slot_clear_is_idempotent() {
        let mut reg = ChartRegistry::new();
        let mut slot = ChartSlot::new(SlotId::Censorable);
        slot.clear(&mut reg);
        slot.replace(&mut reg, &sample_bar());
        slot.clear(&mut reg);
        slot.clear(&mut reg);
        assert!(!slot.is_live());
        assert_eq!(reg.live_count(), 0);
        assert_eq!(reg.destroyed(), 1);
    }

    #[test]
    fn test_board_keeps_one_chart_per_slot() {
        let mut board = ChartBoard::new(ChartRegistry::new());
        for _ in 0..2 {
            board.show(&sample_bar(), &sample_pie(), &sample_pie());
        }
        let reg = board.surface();
        assert_eq!(reg.live_in(SlotId::TopicPie), 1);
        assert_eq!(reg.live_in(SlotId::SentimentPie), 1);
        assert_eq!(reg.live_in(SlotId::Censorable), 1);
        assert_eq!(board.live_slots(), 3);
    }

    #[test]
    fn test_board_clear() {
        let mut board = ChartBoard::new(ChartRegistry::new());
        board.show(&sample_bar(), &sample_pie(), &sample_pie());
        board.clear();
        assert_eq!(board.live_slots(), 0);
        assert_eq!(board.surface().live_count(), 0);
    }
}
