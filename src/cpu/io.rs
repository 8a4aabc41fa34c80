//! Memory-mapped framebuffer and input ports.
//!
//! The framebuffer is a 243×243 grid of pixels stored row-major right after
//! the program region. Each pixel is 9 trits: three 3-trit channels R, G, B
//! with values in [-13, 13]. Rendering it is left to an external consumer,
//! which maps channel values to intensities with [`channel_intensity`].
//!
//! The input ports are plain fields written by an external bridge between
//! bursts and read by the POLL opcodes.

use std::collections::HashSet;

use crate::cpu::memory::{Memory, PROGRAM_REGION_LEN};
use crate::ternary::Word;
use serde::{Serialize, Deserialize};

/// Framebuffer width in pixels.
pub const FRAMEBUFFER_WIDTH: usize = 243;
/// Framebuffer height in pixels.
pub const FRAMEBUFFER_HEIGHT: usize = 243;
/// Trits per pixel.
pub const PIXEL_TRITS: usize = 9;
/// Trits per color channel.
pub const CHANNEL_TRITS: usize = 3;
/// Largest channel value.
pub const CHANNEL_MAX: Word = 13;
/// First framebuffer cell.
pub const FRAMEBUFFER_BASE: usize = PROGRAM_REGION_LEN;
/// Framebuffer size in trits.
pub const FRAMEBUFFER_LEN: usize = FRAMEBUFFER_WIDTH * FRAMEBUFFER_HEIGHT * PIXEL_TRITS;

/// Value POLL_KEY reports for a held key.
pub const KEY_DOWN: Word = CHANNEL_MAX;

/// One framebuffer pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: Word,
    pub g: Word,
    pub b: Word,
}

/// A rectangle in framebuffer or screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    pub const fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Whether `(px, py)` lies inside the rectangle. Empty rectangles
    /// contain nothing.
    pub fn contains(&self, px: i64, py: i64) -> bool {
        px >= self.x
            && py >= self.y
            && px.saturating_sub(self.x) < self.w
            && py.saturating_sub(self.y) < self.h
    }

    /// Whether two rectangles share any point.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.w > 0
            && self.h > 0
            && other.w > 0
            && other.h > 0
            && self.x < other.x.saturating_add(other.w)
            && other.x < self.x.saturating_add(self.w)
            && self.y < other.y.saturating_add(other.h)
            && other.y < self.y.saturating_add(self.h)
    }
}

/// Address of pixel `(x, y)`, or `None` if it is off screen.
pub fn pixel_address(x: Word, y: Word) -> Option<i64> {
    let inside = (0..FRAMEBUFFER_WIDTH as Word).contains(&x)
        && (0..FRAMEBUFFER_HEIGHT as Word).contains(&y);
    inside.then(|| {
        let index = y as i64 * FRAMEBUFFER_WIDTH as i64 + x as i64;
        FRAMEBUFFER_BASE as i64 + index * PIXEL_TRITS as i64
    })
}

/// Fill a rectangle with one color.
///
/// Pixels outside the framebuffer are skipped. Only the visible part of the
/// rectangle is visited, so the cost is bounded by the screen size no matter
/// how large `w` and `h` are.
pub fn fill_rect(mem: &mut Memory, color: Rgb, x: Word, y: Word, w: Word, h: Word) {
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = x.saturating_add(w.max(0)).min(FRAMEBUFFER_WIDTH as Word);
    let y_end = y.saturating_add(h.max(0)).min(FRAMEBUFFER_HEIGHT as Word);

    for py in y_start..y_end {
        for px in x_start..x_end {
            if let Some(addr) = pixel_address(px, py) {
                write_pixel(mem, addr, color);
            }
        }
    }
}

fn write_pixel(mem: &mut Memory, addr: i64, color: Rgb) {
    let step = CHANNEL_TRITS as i64;
    mem.write_field(addr, CHANNEL_TRITS, color.r);
    mem.write_field(addr + step, CHANNEL_TRITS, color.g);
    mem.write_field(addr + 2 * step, CHANNEL_TRITS, color.b);
}

/// Read pixel `(x, y)`; off-screen pixels read as all-zero channels.
pub fn pixel(mem: &Memory, x: Word, y: Word) -> Rgb {
    let Some(addr) = pixel_address(x, y) else {
        return Rgb::default();
    };
    let step = CHANNEL_TRITS as i64;
    Rgb {
        r: mem.read_field(addr, CHANNEL_TRITS),
        g: mem.read_field(addr + step, CHANNEL_TRITS),
        b: mem.read_field(addr + 2 * step, CHANNEL_TRITS),
    }
}

/// Map a channel value in [-13, 13] to a display intensity in [0, 255].
///
/// Values beyond the channel range saturate.
pub fn channel_intensity(value: Word) -> u8 {
    let value = value.clamp(-CHANNEL_MAX, CHANNEL_MAX);
    let scaled = ((value + CHANNEL_MAX) as f64 * 255.0 / (2 * CHANNEL_MAX) as f64).round();
    scaled.clamp(0.0, 255.0) as u8
}

/// Live pointer and keyboard state.
///
/// Written by the host input bridge, read by POLL_MOUSE and POLL_KEY.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPorts {
    pub mouse_x: Word,
    pub mouse_y: Word,
    pub click: bool,
    keys: HashSet<Word>,
}

/// POLL_MOUSE selectors.
pub mod mouse_field {
    use crate::ternary::Word;

    pub const X: Word = 0;
    pub const Y: Word = 1;
    pub const CLICK: Word = 2;
}

impl InputPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the pointer.
    pub fn set_mouse(&mut self, x: Word, y: Word) {
        self.mouse_x = x;
        self.mouse_y = y;
    }

    /// Press or release the pointer button.
    pub fn set_click(&mut self, down: bool) {
        self.click = down;
    }

    /// Press or release a key.
    pub fn set_key(&mut self, code: Word, down: bool) {
        if down {
            self.keys.insert(code);
        } else {
            self.keys.remove(&code);
        }
    }

    /// Whether `code` is held.
    pub fn is_key_down(&self, code: Word) -> bool {
        self.keys.contains(&code)
    }

    /// Value POLL_MOUSE reports for `selector`. Unknown selectors read 0.
    pub fn mouse_field(&self, selector: Word) -> Word {
        match selector {
            mouse_field::X => self.mouse_x,
            mouse_field::Y => self.mouse_y,
            mouse_field::CLICK => Word::from(self.click),
            _ => 0,
        }
    }

    /// Value POLL_KEY reports for `code`.
    pub fn key_field(&self, code: Word) -> Word {
        if self.is_key_down(code) {
            KEY_DOWN
        } else {
            0
        }
    }
}
