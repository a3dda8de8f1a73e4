use std::f64::consts::PI;

use crate::error::{ContractViolation, Result};
use crate::math::normalise_angle;

/// Number of view angles a directional sprite is drawn from by default.
pub const DEFAULT_VIEWS: usize = 8;

/// Source rectangle in a texture, in normalised coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FrameRect {
    pub const FULL: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
}

impl Default for FrameRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// One frame of an animation: a rectangle per view angle.
///
/// Part `i` is shown when the sprite is seen from roughly `i * 2π / n`
/// radians around it.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationFrame {
    parts: Vec<FrameRect>,
}

impl AnimationFrame {
    /// A frame with one rectangle per view. An empty list shows the whole texture.
    pub fn new(parts: Vec<FrameRect>) -> Self {
        if parts.is_empty() {
            return Self::uniform(FrameRect::FULL);
        }
        Self { parts }
    }

    /// The same rectangle from every direction.
    pub fn uniform(rect: FrameRect) -> Self {
        Self {
            parts: vec![rect; DEFAULT_VIEWS],
        }
    }

    pub fn views(&self) -> usize {
        self.parts.len()
    }

    /// The rectangle for a view angle in radians.
    pub fn part(&self, angle: f64) -> &FrameRect {
        let n = self.parts.len();
        let sector = 2.0 * PI / n as f64;
        let i = ((normalise_angle(angle) + 0.5 * sector) / sector).floor() as usize % n;
        &self.parts[i]
    }
}

/// A frame sequence played at a fixed rate.
#[derive(Clone, Debug)]
pub struct Animation {
    pub fps: f64,
    pub frames: Vec<AnimationFrame>,
    pub looping: bool,
    current_frame_index: usize,
    timer: f64,
    playing: bool,
}

impl Animation {
    pub fn new(fps: f64, frames: Vec<AnimationFrame>, looping: bool) -> Self {
        Self {
            fps,
            frames,
            looping,
            current_frame_index: 0,
            timer: 0.0,
            playing: true,
        }
    }

    /// A single still frame.
    pub fn still(frame: AnimationFrame) -> Self {
        Self::new(0.0, vec![frame], false)
    }

    /// Create an animation from a spritesheet grid.
    ///
    /// Each row of the sheet is one frame and each of the `views` columns
    /// is one view angle of that frame.
    pub fn from_grid(views: usize, frame_count: usize, fps: f64, looping: bool) -> Self {
        let views = views.max(1);
        let w = 1.0 / views as f64;
        let h = 1.0 / frame_count.max(1) as f64;

        let frames = (0..frame_count)
            .map(|row| {
                let parts = (0..views)
                    .map(|col| FrameRect::new(col as f64 * w, row as f64 * h, w, h))
                    .collect();
                AnimationFrame::new(parts)
            })
            .collect();

        Self::new(fps, frames, looping)
    }

    /// Advance by `dt` seconds. Animations with a non-positive rate never advance.
    pub fn update(&mut self, dt: f64) {
        if !self.playing || self.fps <= 0.0 || self.frames.len() < 2 {
            return;
        }

        let frame_duration = 1.0 / self.fps;
        self.timer += dt;

        while self.timer >= frame_duration {
            self.timer -= frame_duration;
            self.current_frame_index += 1;

            if self.current_frame_index >= self.frames.len() {
                if self.looping {
                    self.current_frame_index = 0;
                } else {
                    self.current_frame_index = self.frames.len() - 1;
                    self.playing = false;
                    self.timer = 0.0;
                    break;
                }
            }
        }
    }

    pub fn current_frame(&self) -> Option<&AnimationFrame> {
        self.frames.get(self.current_frame_index)
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Reset animation to start.
    pub fn reset(&mut self) {
        self.current_frame_index = 0;
        self.timer = 0.0;
        self.playing = true;
    }

    /// Jump to frame `index`.
    pub fn seek(&mut self, index: usize) -> Result<()> {
        if index >= self.frames.len() {
            return Err(ContractViolation::IndexOutOfBounds {
                index,
                len: self.frames.len(),
            }
            .into());
        }
        self.current_frame_index = index;
        self.timer = 0.0;
        Ok(())
    }
}
