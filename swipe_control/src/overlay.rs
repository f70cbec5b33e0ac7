//! Software-rendered overlay using `minifb`, doubling as the mouse-driven
//! fingertip source.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  GESTURE: UP                                 │
//! │                                              │
//! │          ┌ ─ ─ ┐                             │
//! │     ~~~~~│  +  │   (trail, tip, threshold)   │
//! │          └ ─ ─ ┘                             │
//! │                                              │
//! │  status bar                                  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Hold the left mouse button and flick to swipe; the cursor stands in for
//! the index fingertip.  Releasing the button is the same as the hand
//! leaving the frame.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use swipe_gesture::{FingertipSample, Gesture};
use tracing::warn;

use crate::source::{FingertipSource, Frame};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 640;
pub const WIN_H:      usize = 480;
const STATUS_Y:       usize = WIN_H - 36;
const TRAIL_LEN:      usize = 24;
const BANNER_HOLD:    Duration = Duration::from_millis(1000);
const BG_COLOR:       u32   = 0xFF1A1A2E;
const TEXT_BG:        u32   = 0xFF0F3460;
const TRAIL_COLOR:    u32   = 0xFF33CCFF;
const TIP_COLOR:      u32   = 0xFFFFFFFF;
const REACH_COLOR:    u32   = 0xFF444466;
const BANNER_COLOR:   u32   = 0xFF00FF00;

// ════════════════════════════════════════════════════════════════════════════
// Canvas — the pixel buffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    pub buf: Vec<u32>,
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas { buf: vec![BG_COLOR; WIN_W * WIN_H] }
    }
}

impl Canvas {
    fn clear(&mut self) { self.buf.fill(BG_COLOR); }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        for x in x0..=x1 {
            self.set_pixel_i(x, y0, color);
            self.set_pixel_i(x, y1, color);
        }
        for y in y0..=y1 {
            self.set_pixel_i(x0, y, color);
            self.set_pixel_i(x1, y, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn set_pixel_i(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// Bresenham line.
    fn draw_line(&mut self, (x0, y0): (isize, isize), (x1, y1): (isize, isize), color: u32) {
        let dx  =  (x1 - x0).abs();
        let dy  = -(y1 - y0).abs();
        let sx  = if x0 < x1 { 1 } else { -1 };
        let sy  = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel_i(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    fn draw_cross(&mut self, (cx, cy): (isize, isize), r: isize, color: u32) {
        for d in -r..=r {
            self.set_pixel_i(cx + d, cy, color);
            self.set_pixel_i(cx, cy + d, color);
        }
    }

    /// Minimal bitmap font: 3×5 characters, each pixel drawn `scale`×`scale`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

/// Normalized sample → pixel position.
fn to_px(tip: FingertipSample) -> (isize, isize) {
    (
        (tip.x * (WIN_W - 1) as f32).round() as isize,
        (tip.y * (WIN_H - 1) as f32).round() as isize,
    )
}

/// Window-space mouse position → normalized sample.
fn from_px(x: f32, y: f32) -> FingertipSample {
    FingertipSample::new(x / (WIN_W - 1) as f32, y / (WIN_H - 1) as f32).clamped()
}

// ════════════════════════════════════════════════════════════════════════════
// OverlayState — what gets drawn, independent of the window
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct OverlayState {
    /// Most recent tips, oldest first.
    pub trail:  VecDeque<FingertipSample>,
    /// Last admitted gesture and when it fired.
    pub banner: Option<(Gesture, Duration)>,
    pub fired:  usize,
}

impl OverlayState {
    pub fn record(&mut self, frame: &Frame, fired: Option<Gesture>) {
        match frame.tip {
            Some(tip) => {
                self.trail.push_back(tip);
                while self.trail.len() > TRAIL_LEN { self.trail.pop_front(); }
            }
            None => self.trail.clear(),
        }
        if let Some(g) = fired {
            self.banner = Some((g, frame.at));
            self.fired += 1;
        }
    }

    /// The banner text to show at `now`, if it hasn't expired.
    pub fn banner_text(&self, now: Duration) -> Option<String> {
        let (g, at) = self.banner?;
        (now.saturating_sub(at) <= BANNER_HOLD).then(|| format!("Gesture: {g}"))
    }

    pub fn render(&self, canvas: &mut Canvas, now: Duration, threshold: f32) {
        canvas.clear();

        // ── Threshold reach around the latest tip ─────────────────────────
        if let Some(&tip) = self.trail.back() {
            let (cx, cy) = to_px(tip);
            let rx = (threshold * WIN_W as f32) as isize;
            let ry = (threshold * WIN_H as f32) as isize;
            canvas.draw_border(cx - rx, cy - ry, cx + rx, cy + ry, REACH_COLOR);
        }

        // ── Trail ─────────────────────────────────────────────────────────
        for (a, b) in self.trail.iter().zip(self.trail.iter().skip(1)) {
            canvas.draw_line(to_px(*a), to_px(*b), TRAIL_COLOR);
        }
        if let Some(&tip) = self.trail.back() {
            canvas.draw_cross(to_px(tip), 6, TIP_COLOR);
        }

        // ── Gesture banner ────────────────────────────────────────────────
        if let Some(text) = self.banner_text(now) {
            canvas.draw_label(&text, 10, 20, 4, BANNER_COLOR);
        }

        // ── Status bar ────────────────────────────────────────────────────
        canvas.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        let status = match self.trail.back() {
            Some(t) => format!("tip {:.2},{:.2}  fired {}", t.x, t.y, self.fired),
            None    => format!("no hand  fired {}", self.fired),
        };
        canvas.draw_label(&status, 10, STATUS_Y + 6, 2, 0xFFEEEEEE);
        canvas.draw_label("hold left button + flick = swipe   Q = quit",
            10, WIN_H - 12, 1, 0xFF888888);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Overlay — window + mouse source
// ════════════════════════════════════════════════════════════════════════════

pub struct Overlay {
    window:    Window,
    canvas:    Canvas,
    state:     OverlayState,
    started:   Instant,
    threshold: f32,
}

impl Overlay {
    /// Open the window.  `threshold` only sizes the on-screen reach box.
    pub fn new(threshold: f32) -> Result<Self> {
        let mut window = Window::new(
            "Subway Surfers Hand Control",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| anyhow!("cannot open overlay window: {e}"))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Overlay {
            window,
            canvas: Canvas::default(),
            state: OverlayState::default(),
            started: Instant::now(),
            threshold,
        })
    }

    fn quit_requested(&self) -> bool {
        !self.window.is_open()
            || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
    }

    fn mouse_tip(&self) -> Option<FingertipSample> {
        if !self.window.get_mouse_down(MouseButton::Left) {
            return None;
        }
        let (x, y) = self.window.get_mouse_pos(MouseMode::Discard)?;
        Some(from_px(x, y))
    }
}

impl FingertipSource for Overlay {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.quit_requested() {
            return Ok(None);
        }
        Ok(Some(Frame { at: self.started.elapsed(), tip: self.mouse_tip() }))
    }

    fn show(&mut self, frame: &Frame, fired: Option<Gesture>) {
        self.state.record(frame, fired);
        self.state.render(&mut self.canvas, frame.at, self.threshold);
        if let Err(e) = self.window.update_with_buffer(&self.canvas.buf, WIN_W, WIN_H) {
            warn!("overlay update failed: {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
