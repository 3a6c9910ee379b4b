//! Collapsible result panels
//!
//! The results view has two collapsed-by-default panels: "advanced results"
//! (legends and pie charts) and "full results" (the detail table). Each toggle
//! flips its panel and reports the matching `aria-expanded` value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    AdvancedResults,
    FullResults,
}

impl PanelId {
    pub fn element_id(&self) -> &'static str {
        match self {
            PanelId::AdvancedResults => "advancedResults",
            PanelId::FullResults => "fullResults",
        }
    }

    pub fn button_id(&self) -> &'static str {
        match self {
            PanelId::AdvancedResults => "advancedResultsBtn",
            PanelId::FullResults => "fullResultsBtn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub id: PanelId,
    pub shown: bool,
}

impl Panel {
    pub fn new(id: PanelId) -> Self {
        Self { id, shown: false }
    }

    /// Flip visibility; returns the new state
    pub fn toggle(&mut self) -> bool {
        self.shown = !self.shown;
        self.shown
    }

    pub fn aria_expanded(&self) -> &'static str {
        if self.shown {
            "true"
        } else {
            "false"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Panels {
    pub advanced: Panel,
    pub full: Panel,
}

impl Default for Panels {
    fn default() -> Self {
        Self {
            advanced: Panel::new(PanelId::AdvancedResults),
            full: Panel::new(PanelId::FullResults),
        }
    }
}

impl Panels {
    pub fn toggle(&mut self, id: PanelId) -> bool {
        self.get_mut(id).toggle()
    }

    pub fn get(&self, id: PanelId) -> &Panel {
        match id {
            PanelId::AdvancedResults => &self.advanced,
            PanelId::FullResults => &self.full,
        }
    }

    fn get_mut(&mut self, id: PanelId) -> &mut Panel {
        match id {
            PanelId::AdvancedResults => &mut self.advanced,
            PanelId::FullResults => &mut self.full,
        }
    }
}
