//! Pointer gesture classification
//!
//! Turns a press/release pair into a swipe or a tap. Mouse drags and touch
//! strokes go through the same tracker.

/// Maximum travel (px) for a press/release pair to still be a tap
pub const TAP_SLOP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Finger moved right to left
    SwipeLeft,
    /// Finger moved left to right
    SwipeRight,
    Tap { x: f32, y: f32 },
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    swipe_threshold: f32,
    pressed_at: Option<(f32, f32)>,
}

impl GestureTracker {
    pub fn new(swipe_threshold: f32) -> Self {
        Self {
            swipe_threshold: swipe_threshold.max(TAP_SLOP),
            pressed_at: None,
        }
    }

    pub fn press(&mut self, x: f32, y: f32) {
        self.pressed_at = Some((x, y));
    }

    /// Drop a stroke that was interrupted (finger lost, window left)
    pub fn cancel(&mut self) {
        self.pressed_at = None;
    }

    /// Finish the stroke started by the last `press`
    pub fn release(&mut self, x: f32, y: f32) -> Option<Gesture> {
        let (start_x, start_y) = self.pressed_at.take()?;
        let dx = x - start_x;
        let dy = y - start_y;

        if dx.abs() >= self.swipe_threshold && dx.abs() > dy.abs() {
            return Some(if dx < 0.0 {
                Gesture::SwipeLeft
            } else {
                Gesture::SwipeRight
            });
        }
        if dx.hypot(dy) <= TAP_SLOP {
            return Some(Gesture::Tap { x, y });
        }
        None
    }
}
