//! Animated triangulated background
//!
//! Two full-viewport layers sit on top of each other. Every
//! [`REPAINT_PERIOD`] a fresh pattern is painted into the hidden layer, which
//! then fades in over [`FADE_IN`] while the visible one fades out over the
//! longer [`FADE_OUT`]. The roles swap after each repaint. Resizing repaints
//! both layers in place without fading.
//!
//! [`BackdropTimer`] drives the repaints from a background thread and stops
//! when told to or when dropped.

use serde::Serialize;
use std::fmt::Write as _;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub const REPAINT_PERIOD: Duration = Duration::from_secs(5);
pub const FADE_IN: Duration = Duration::from_millis(1000);
pub const FADE_OUT: Duration = Duration::from_millis(2000);

/// Largest accepted viewport side in pixels
pub const MAX_SIDE: u32 = 8192;

const CELL_SIZE: f64 = 75.0;
const JITTER: f64 = 0.4;

/// Color ramps patterns are filled from; each repaint picks one
const RAMPS: &[&[(u8, u8, u8)]] = &[
    &[(0x0d, 0x11, 0x17), (0x1f, 0x3a, 0x5f), (0x58, 0xa6, 0xff)],
    &[(0x1a, 0x0b, 0x2e), (0x6a, 0x2c, 0x70), (0xf0, 0x8a, 0x5d)],
    &[(0x04, 0x2a, 0x2b), (0x1b, 0x6f, 0x5a), (0xa8, 0xe6, 0xcf)],
    &[(0x20, 0x20, 0x20), (0x5a, 0x5a, 0x5a), (0xc8, 0xc8, 0xc8)],
];

/// xorshift64* generator; patterns only need to look random
#[derive(Debug, Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        // A zero state would stay zero forever
        Self(seed ^ 0x9E37_79B9_7F4A_7C15 | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in [0, 1)
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triangle {
    pub points: [(f64, f64); 3],
    pub color: String,
}

/// One generated triangulation covering `width` x `height`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub triangles: Vec<Triangle>,
}

impl Pattern {
    /// Jittered grid split into triangles, colored by centroid along a ramp.
    ///
    /// Border points stay on the border so the viewport is fully covered.
    pub fn generate(width: u32, height: u32, seed: u64) -> Self {
        let mut rng = Rng::new(seed);
        let ramp = RAMPS[(rng.next_u64() % RAMPS.len() as u64) as usize];

        let cols = ((width as f64 / CELL_SIZE).ceil() as usize).max(1);
        let rows = ((height as f64 / CELL_SIZE).ceil() as usize).max(1);
        let cell_w = width as f64 / cols as f64;
        let cell_h = height as f64 / rows as f64;

        let mut grid = vec![vec![(0.0, 0.0); cols + 1]; rows + 1];
        for (r, row) in grid.iter_mut().enumerate() {
            for (c, point) in row.iter_mut().enumerate() {
                let mut x = c as f64 * cell_w;
                let mut y = r as f64 * cell_h;
                if c > 0 && c < cols {
                    x += (rng.next_f64() * 2.0 - 1.0) * JITTER * cell_w;
                }
                if r > 0 && r < rows {
                    y += (rng.next_f64() * 2.0 - 1.0) * JITTER * cell_h;
                }
                *point = (x, y);
            }
        }

        let mut triangles = Vec::with_capacity(rows * cols * 2);
        for r in 0..rows {
            for c in 0..cols {
                let tl = grid[r][c];
                let tr = grid[r][c + 1];
                let bl = grid[r + 1][c];
                let br = grid[r + 1][c + 1];
                // Alternate the diagonal so the mesh doesn't look striped
                let halves = if (r + c) % 2 == 0 {
                    [[tl, tr, br], [tl, br, bl]]
                } else {
                    [[tl, tr, bl], [tr, br, bl]]
                };
                for points in halves {
                    let color = shade(ramp, &points, width as f64, height as f64);
                    triangles.push(Triangle { points, color });
                }
            }
        }

        Self { width, height, seed, triangles }
    }

    pub fn to_svg(&self, opacity: f64) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" opacity="{o:.2}">"#,
            w = self.width,
            h = self.height,
            o = opacity
        );
        for t in &self.triangles {
            let [a, b, c] = t.points;
            // Stroke with the fill color to hide anti-aliasing seams
            let _ = write!(
                svg,
                r#"<polygon points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="{fill}" stroke="{fill}" stroke-width="1"/>"#,
                a.0, a.1, b.0, b.1, c.0, c.1,
                fill = t.color
            );
        }
        svg.push_str("</svg>");
        svg
    }
}

fn shade(ramp: &[(u8, u8, u8)], points: &[(f64, f64); 3], width: f64, height: f64) -> String {
    let cx = (points[0].0 + points[1].0 + points[2].0) / 3.0;
    let cy = (points[0].1 + points[1].1 + points[2].1) / 3.0;
    let t = if width + height > 0.0 {
        ((cx + cy) / (width + height)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let segments = (ramp.len() - 1).max(1) as f64;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(ramp.len().saturating_sub(2));
    let local = pos - i as f64;
    let (a, b) = (ramp[i], ramp[(i + 1).min(ramp.len() - 1)]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * local).round() as u8;

    format!("#{:02x}{:02x}{:02x}", lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// One of the two stacked layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub pattern: Pattern,
    /// Opacity the layer is heading to
    pub opacity: f64,
    /// How long the move to `opacity` takes; zero means instant
    #[serde(serialize_with = "serialize_millis")]
    pub fade: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Result of one repaint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Layer that got the new pattern and is fading in
    pub painted: usize,
    /// Layer fading out
    pub faded_out: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Backdrop {
    width: u32,
    height: u32,
    layers: [Layer; 2],
    hidden: usize,
    generation: u64,
    seed: u64,
}

fn clamp_size(width: u32, height: u32) -> (u32, u32) {
    (width.clamp(1, MAX_SIDE), height.clamp(1, MAX_SIDE))
}

impl Backdrop {
    /// Layer 0 starts visible, layer 1 hidden; both are painted.
    /// Sides are clamped to `1..=MAX_SIDE`.
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        let (width, height) = clamp_size(width, height);
        let layers = [
            Layer { pattern: Pattern::generate(width, height, seed), opacity: 1.0, fade: Duration::ZERO },
            Layer { pattern: Pattern::generate(width, height, seed.wrapping_add(1)), opacity: 0.0, fade: Duration::ZERO },
        ];
        Self { width, height, layers, hidden: 1, generation: 2, seed }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn hidden_layer(&self) -> usize {
        self.hidden
    }

    pub fn visible_layer(&self) -> usize {
        1 - self.hidden
    }

    pub fn layer(&self, index: usize) -> &Layer {
        &self.layers[index]
    }

    pub fn layers(&self) -> &[Layer; 2] {
        &self.layers
    }

    fn next_seed(&mut self) -> u64 {
        let seed = self.seed.wrapping_add(self.generation);
        self.generation += 1;
        seed
    }

    /// Paint the hidden layer and cross-fade it in
    pub fn tick(&mut self) -> Transition {
        let painted = self.hidden;
        let faded_out = 1 - painted;
        let seed = self.next_seed();

        self.layers[painted].pattern = Pattern::generate(self.width, self.height, seed);
        self.layers[painted].opacity = 1.0;
        self.layers[painted].fade = FADE_IN;
        self.layers[faded_out].opacity = 0.0;
        self.layers[faded_out].fade = FADE_OUT;
        self.hidden = faded_out;

        debug!("backdrop repaint: layer {} in, layer {} out", painted, faded_out);
        Transition { painted, faded_out }
    }

    /// Repaint both layers at the new size; opacities and roles are kept
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = clamp_size(width, height);
        self.width = width;
        self.height = height;
        for i in 0..2 {
            let seed = self.next_seed();
            self.layers[i].pattern = Pattern::generate(width, height, seed);
            self.layers[i].fade = Duration::ZERO;
        }
    }

    /// Both layers stacked into one SVG document at their target opacities
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        for layer in &self.layers {
            svg.push_str(&layer.pattern.to_svg(layer.opacity));
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Background thread repainting a shared [`Backdrop`] on a fixed period.
///
/// Stopping (or dropping) the timer wakes the thread immediately and joins it.
pub struct BackdropTimer {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackdropTimer {
    pub fn start(backdrop: Arc<Mutex<Backdrop>>, period: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => match backdrop.lock() {
                    Ok(mut b) => {
                        b.tick();
                    }
                    Err(_) => {
                        warn!("backdrop lock poisoned, stopping timer");
                        break;
                    }
                },
                // Explicit stop or the owner went away
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self { stop_tx: Some(stop_tx), handle: Some(handle) }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for BackdropTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    // ==========================================================================
    // PATTERN TESTS
    // ==========================================================================

    #[test]
    fn test_pattern_is_deterministic() {
        assert_eq!(Pattern::generate(300, 200, 7), Pattern::generate(300, 200, 7));
        assert_ne!(Pattern::generate(300, 200, 7), Pattern::generate(300, 200, 8));
    }

    #[test]
    fn test_pattern_covers_viewport() {
        let p = Pattern::generate(300, 150, 1);
        // 4 x 2 cells of two triangles each
        assert_eq!(p.triangles.len(), 16);
        for t in &p.triangles {
            for (x, y) in t.points {
                assert!((0.0..=300.0).contains(&x));
                assert!((0.0..=150.0).contains(&y));
            }
            assert!(t.color.starts_with('#') && t.color.len() == 7);
        }
    }

    #[test]
    fn test_tiny_viewport_still_has_a_cell() {
        let p = Pattern::generate(0, 0, 1);
        assert_eq!(p.triangles.len(), 2);
    }

    #[test]
    fn test_svg_output() {
        let svg = Pattern::generate(100, 100, 3).to_svg(0.5);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"opacity="0.50""#));
        assert!(svg.contains("<polygon"));
        assert!(svg.ends_with("</svg>"));
    }

    // ==========================================================================
    // CROSS-FADE TESTS
    // ==========================================================================

    #[test]
    fn test_initial_state() {
        let b = Backdrop::new(200, 100, 42);
        assert_eq!(b.hidden_layer(), 1);
        assert_eq!(b.visible_layer(), 0);
        assert_eq!(b.layer(0).opacity, 1.0);
        assert_eq!(b.layer(1).opacity, 0.0);
    }

    #[test]
    fn test_tick_paints_hidden_layer_and_flips() {
        let mut b = Backdrop::new(200, 100, 42);
        let before = b.layer(1).pattern.clone();

        let t = b.tick();

        assert_eq!(t, Transition { painted: 1, faded_out: 0 });
        assert_ne!(b.layer(1).pattern, before);
        assert_eq!(b.layer(1).opacity, 1.0);
        assert_eq!(b.layer(1).fade, FADE_IN);
        assert_eq!(b.layer(0).opacity, 0.0);
        assert_eq!(b.layer(0).fade, FADE_OUT);
        assert_eq!(b.hidden_layer(), 0);

        let t = b.tick();
        assert_eq!(t, Transition { painted: 0, faded_out: 1 });
        assert_eq!(b.hidden_layer(), 1);
    }

    #[test]
    fn test_fade_out_is_longer_than_fade_in() {
        assert!(FADE_OUT > FADE_IN);
    }

    #[test]
    fn test_resize_repaints_without_fade() {
        let mut b = Backdrop::new(200, 100, 42);
        b.tick();
        let hidden = b.hidden_layer();

        b.resize(400, 300);

        assert_eq!(b.size(), (400, 300));
        assert_eq!(b.hidden_layer(), hidden);
        for layer in b.layers() {
            assert_eq!(layer.pattern.width, 400);
            assert_eq!(layer.pattern.height, 300);
            assert_eq!(layer.fade, Duration::ZERO);
        }
        assert_eq!(b.layer(hidden).opacity, 0.0);
        assert_eq!(b.layer(1 - hidden).opacity, 1.0);
    }

    #[test]
    fn test_oversized_viewport_is_clamped() {
        let mut b = Backdrop::new(u32::MAX, 0, 3);
        assert_eq!(b.size(), (MAX_SIDE, 1));

        b.resize(100, u32::MAX);
        assert_eq!(b.size(), (100, MAX_SIDE));
        assert_eq!(b.layer(0).pattern.height, MAX_SIDE);
    }

    #[test]
    fn test_backdrop_svg_has_both_layers() {
        let svg = Backdrop::new(100, 100, 1).to_svg();
        assert_eq!(svg.matches("<svg").count(), 3);
    }

    // ==========================================================================
    // TIMER LIFECYCLE TESTS
    // ==========================================================================

    #[test]
    fn test_timer_ticks_then_stops() {
        let shared = Arc::new(Mutex::new(Backdrop::new(100, 100, 1)));
        let timer = BackdropTimer::start(Arc::clone(&shared), Duration::from_millis(10));

        let deadline = Instant::now() + Duration::from_secs(5);
        while shared.lock().unwrap().generation < 4 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(timer.is_running());
        timer.stop();

        let generation = shared.lock().unwrap().generation;
        assert!(generation >= 4);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(shared.lock().unwrap().generation, generation);
    }

    #[test]
    fn test_stop_does_not_wait_for_period() {
        let shared = Arc::new(Mutex::new(Backdrop::new(100, 100, 1)));
        let timer = BackdropTimer::start(shared, Duration::from_secs(3600));
        let started = Instant::now();
        drop(timer);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
