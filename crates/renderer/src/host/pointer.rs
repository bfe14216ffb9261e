use field::Vec2;

use super::SurfaceSize;

/// Smoothed pointer in normalized page space (origin bottom-left).
///
/// Events only move the target; [`step`](Self::step) eases the current value
/// toward it once per rendered frame. Values outside `[0, 1]` are kept so a
/// pointer off the window still pulls the sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    target: Vec2,
    current: Vec2,
    smoothing: f32,
}

impl PointerState {
    pub fn new(smoothing: f32) -> Self {
        Self {
            target: Vec2::ZERO,
            current: Vec2::ZERO,
            smoothing,
        }
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Records a pointer position given in page pixels.
    pub fn track(&mut self, x: f64, y: f64, viewport: SurfaceSize) {
        if viewport.is_empty() {
            return;
        }
        let nx = x / f64::from(viewport.width);
        let ny = 1.0 - y / f64::from(viewport.height);
        self.target = Vec2::new(nx as f32, ny as f32);
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    pub fn step(&mut self) -> Vec2 {
        self.current += (self.target - self.current) * self.smoothing;
        self.current
    }
}
