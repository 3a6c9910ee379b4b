//! Terminal rendering for the CLI
//!
//! [`TerminalScreen`] prints flow output with ANSI colors and shows an
//! `indicatif` spinner while a request is in flight. [`TerminalCharts`] draws
//! chart specs as text: pies become one stacked bar, bar charts become one
//! horizontal bar per category.

use crate::charts::{ChartKind, ChartSpec, ChartSurface, SlotId};
use crate::panel::Panels;
use crate::screen::{Output, Region, Screen, LOADING};
use crate::view::{DetailRow, LegendItem};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::time::Duration;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GRAY: &str = "\x1b[90m";

pub struct TerminalScreen<W: Write, R: BufRead> {
    out: W,
    input: R,
    panels: Panels,
    spinner: Option<ProgressBar>,
    use_spinner: bool,
}

impl<W: Write, R: BufRead> TerminalScreen<W, R> {
    pub fn new(out: W, input: R) -> Self {
        Self {
            out,
            input,
            panels: Panels::default(),
            spinner: None,
            use_spinner: true,
        }
    }

    /// Panels decide whether legends and the detail table are printed
    pub fn with_panels(mut self, panels: Panels) -> Self {
        self.panels = panels;
        self
    }

    pub fn with_spinner(mut self, enabled: bool) -> Self {
        self.use_spinner = enabled;
        self
    }

    pub fn into_inner(mut self) -> W {
        self.stop_spinner();
        self.out
    }

    fn start_spinner(&mut self) {
        if !self.use_spinner || self.spinner.is_some() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(LOADING);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn line(&mut self, text: &str) {
        // Output errors (closed pipe) are not worth aborting a flow for
        writeln!(self.out, "{}", text).ok();
    }
}

impl<W: Write, R: BufRead> Screen for TerminalScreen<W, R> {
    fn alert(&mut self, message: &str) {
        self.stop_spinner();
        self.line(&format!("{}! {}{}", YELLOW, message, RESET));
    }

    fn prompt(&mut self, message: &str) -> Option<String> {
        self.stop_spinner();
        write!(self.out, "{} ", message).ok();
        self.out.flush().ok();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = answer.trim().to_string();
                if answer.is_empty() {
                    None
                } else {
                    Some(answer)
                }
            }
        }
    }

    fn set_text(&mut self, output: Output, text: &str) {
        if output == Output::Topic && text == LOADING {
            self.start_spinner();
            return;
        }
        self.stop_spinner();
        if text.is_empty() {
            return;
        }
        let label = match output {
            Output::Topic => "Topic",
            Output::Sentiment => "Sentiment",
            Output::TopTopic => "Top topic",
            Output::TopSentiment => "Top sentiment",
        };
        self.line(&format!("{}{:<14}{} {}", BOLD, format!("{}:", label), RESET, text));
    }

    fn set_visible(&mut self, region: Region, visible: bool) {
        if region == Region::Loading {
            if visible {
                self.start_spinner();
            } else {
                self.stop_spinner();
            }
        }
    }

    fn show_failure(&mut self, message: &str) {
        self.stop_spinner();
        self.line(&format!("{}✗ {}{}", RED, message, RESET));
    }

    fn show_legends(&mut self, topics: &[LegendItem], sentiments: &[LegendItem]) {
        if !self.panels.advanced.shown {
            return;
        }
        for (title, items) in [("Topics", topics), ("Sentiments", sentiments)] {
            self.line(&format!("\n{}{}{}", BOLD, title, RESET));
            for item in items {
                let swatch = color_block(&item.color, "■");
                self.line(&format!("  {} {:<20} {:>7}", swatch, item.label, item.display));
            }
        }
    }

    fn show_table(&mut self, rows: &[DetailRow]) {
        if !self.panels.full.shown {
            return;
        }
        self.line(&format!(
            "\n{}{:>4}  {:<50}  {:<12}  {:<12}{}",
            BOLD, "#", "COMMENT", "TOPIC", "SENTIMENT", RESET
        ));
        self.line(&"─".repeat(84));
        for row in rows {
            let (color, reset) = if row.censorable { (RED, RESET) } else { ("", "") };
            self.line(&format!(
                "{}{:>4}  {:<50}  {:<12}  {:<12}{}",
                color,
                row.index,
                truncate(&row.comment, 50),
                row.topic,
                row.sentiment,
                reset
            ));
        }
    }
}

/// Chart surface that prints charts once; terminal output cannot be erased,
/// so disposing a chart only forgets it.
pub struct TerminalCharts<W: Write> {
    out: W,
    width: usize,
    show_pies: bool,
}

impl<W: Write> TerminalCharts<W> {
    pub fn new(out: W) -> Self {
        Self { out, width: 40, show_pies: true }
    }

    pub fn with_pies(mut self, show: bool) -> Self {
        self.show_pies = show;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw_pie(&mut self, slot: SlotId, spec: &ChartSpec) {
        let total: f64 = spec.values.iter().filter(|v| **v > 0.0).sum();
        if total <= 0.0 {
            return;
        }
        let mut bar = String::new();
        for (value, color) in spec.values.iter().zip(spec.colors.iter()) {
            let cells = ((value.max(0.0) / total) * self.width as f64).round() as usize;
            bar.push_str(&color_block(color, &"█".repeat(cells)));
        }
        let name = match slot {
            SlotId::TopicPie => "Topic split",
            SlotId::SentimentPie => "Sentiment split",
            SlotId::Censorable => "Split",
        };
        writeln!(self.out, "{:<16} {}", name, bar).ok();
    }

    fn draw_bar(&mut self, spec: &ChartSpec) {
        if let Some(ref title) = spec.title {
            writeln!(self.out, "\n{}{}{}", BOLD, title, RESET).ok();
        }
        let max = spec.values.iter().cloned().fold(0.0_f64, f64::max);
        for (i, label) in spec.labels.iter().enumerate() {
            let value = spec.values.get(i).copied().unwrap_or(0.0);
            let cells = if max > 0.0 {
                ((value / max) * self.width as f64).round() as usize
            } else {
                0
            };
            let color = spec.colors.get(i).map(String::as_str).unwrap_or("#888888");
            writeln!(
                self.out,
                "  {:<10} {} {}",
                label,
                color_block(color, &"█".repeat(cells)),
                value
            )
            .ok();
        }
    }
}

impl<W: Write> ChartSurface for TerminalCharts<W> {
    type Handle = SlotId;

    fn create(&mut self, slot: SlotId, spec: &ChartSpec) -> SlotId {
        match spec.kind {
            ChartKind::Pie if self.show_pies => self.draw_pie(slot, spec),
            ChartKind::Pie => {}
            ChartKind::Bar => self.draw_bar(spec),
        }
        slot
    }

    fn destroy(&mut self, _handle: SlotId) {}
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (alpha ignored)
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let h = hex.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match h.len() {
        3 => {
            let mut it = h.chars().map(|c| u8::from_str_radix(&c.to_string(), 16).ok().map(|v| v * 17));
            Some((it.next()??, it.next()??, it.next()??))
        }
        6 | 8 => Some((channel(&h[0..2])?, channel(&h[2..4])?, channel(&h[4..6])?)),
        _ => None,
    }
}

fn color_block(hex: &str, text: &str) -> String {
    match parse_hex_color(hex) {
        Some((r, g, b)) => format!("\x1b[38;2;{};{};{}m{}{}", r, g, b, text, RESET),
        None => format!("{}{}{}", GRAY, text, RESET),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
