//! Master/stack layout.
//!
//! The first managed window (insertion order) takes the left half of the
//! screen, every other window gets an equal slice of the right half. All
//! divisions truncate: the master width and the stack x offset are both
//! `width / 2`, every stack slice is `height / (n - 1)` tall and slice `i`
//! starts at `i * slice`. Pixels lost to truncation stay uncovered at the
//! right and bottom edges, so frames never overlap.

use crate::error::Result;
use crate::events::WindowId;
use crate::services::display::DisplayServer;
use crate::services::registry::{ManagedWindow, WindowRegistry};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

impl Screen {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Geometry assigned to one window for one tiling pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn overlaps(&self, other: &Frame) -> bool {
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) size ({}, {})", self.x, self.y, self.width, self.height)
    }
}

/// Compute one frame per window, in the order given.
pub fn compute_layout(windows: &[ManagedWindow], screen: Screen) -> Vec<(WindowId, Frame)> {
    let count = windows.len();
    match count {
        0 => Vec::new(),
        1 => vec![(
            windows[0].id(),
            Frame::new(0, 0, screen.width, screen.height),
        )],
        _ => {
            let master_width = screen.width / 2;
            let stack_height = screen.height / (count as u32 - 1);

            windows
                .iter()
                .enumerate()
                .map(|(index, managed)| {
                    let frame = if index == 0 {
                        Frame::new(0, 0, master_width, screen.height)
                    } else {
                        let slot = (index - 1) as u32;
                        Frame::new(
                            master_width as i32,
                            (slot * stack_height) as i32,
                            master_width,
                            stack_height,
                        )
                    };
                    (managed.id(), frame)
                })
                .collect()
        }
    }
}

/// Issue one configure request per managed window, in registry order,
/// followed by a single flush. An empty registry issues nothing.
pub fn apply_layout<D>(display: &mut D, registry: &WindowRegistry, screen: Screen) -> Result<usize>
where
    D: DisplayServer + ?Sized,
{
    let frames = compute_layout(registry.windows(), screen);
    if frames.is_empty() {
        debug!("Nothing to tile");
        return Ok(0);
    }

    for (index, (window, frame)) in frames.iter().enumerate() {
        if index == 0 {
            debug!("Tiling master window 0x{:x} at {}", window, frame);
        } else {
            debug!("Tiling stack window {} (0x{:x}) at {}", index - 1, window, frame);
        }
        display.configure(*window, *frame)?;
    }
    display.flush()?;

    debug!("Tiled {} window(s)", frames.len());
    Ok(frames.len())
}
