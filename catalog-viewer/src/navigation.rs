//! Pagination and zoom state machine
//!
//! `NavigationState` is a plain value. `apply` returns the next state
//! together with the effects the shell has to carry out, so the decision
//! logic never touches widgets or bitmaps.

use crate::layout::{LayoutResult, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomLevel {
    Baseline,
    Zoomed,
}

/// Anchor of the zoom transform, in percent of the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformOrigin {
    pub x: f32,
    pub y: f32,
}

impl TransformOrigin {
    pub const CENTER: Self = Self { x: 50.0, y: 50.0 };

    /// Origin of a point relative to the frame's bounding box, clamped to it
    pub fn from_point(x: f32, y: f32, frame: &LayoutResult) -> Self {
        let percent = |offset: f32, extent: f32| {
            if extent > 0.0 && offset.is_finite() {
                (offset / extent * 100.0).clamp(0.0, 100.0)
            } else {
                50.0
            }
        };
        Self {
            x: percent(x - frame.left, frame.width),
            y: percent(y - frame.top, frame.height),
        }
    }
}

impl Default for TransformOrigin {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Part of the frame that stays visible under the zoom transform, as
/// fractions of the unzoomed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomWindow {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ZoomWindow {
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Next,
    Previous,
    First,
    /// Tap or click at window coordinates, with the frame it landed on
    ToggleZoom { x: f32, y: f32, frame: LayoutResult },
    Resize(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Re-run the layout engine
    Relayout,
    /// Repopulate the display with the current page surfaces
    RenderPages,
    Recenter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationState {
    current_page: usize,
    total_pages: usize,
    zoom: ZoomLevel,
    zoomed_factor: f32,
    origin: TransformOrigin,
}

impl NavigationState {
    pub const BASELINE_FACTOR: f32 = 1.0;

    /// Start at page 1, unzoomed. A catalog always has at least one page.
    pub fn new(total_pages: usize, zoomed_factor: f32) -> Self {
        Self {
            current_page: 1,
            total_pages: total_pages.max(1),
            zoom: ZoomLevel::Baseline,
            zoomed_factor: zoomed_factor.max(Self::BASELINE_FACTOR),
            origin: TransformOrigin::CENTER,
        }
    }

    /// 1-based
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom == ZoomLevel::Zoomed
    }

    pub fn zoom_factor(&self) -> f32 {
        match self.zoom {
            ZoomLevel::Baseline => Self::BASELINE_FACTOR,
            ZoomLevel::Zoomed => self.zoomed_factor,
        }
    }

    pub fn transform_origin(&self) -> TransformOrigin {
        self.origin
    }

    /// Visible window for a `scale(factor)` transform anchored at the origin
    pub fn zoom_window(&self) -> ZoomWindow {
        let factor = self.zoom_factor();
        if factor <= Self::BASELINE_FACTOR {
            return ZoomWindow::FULL;
        }
        let span = 1.0 / factor;
        ZoomWindow {
            x: self.origin.x / 100.0 * (1.0 - span),
            y: self.origin.y / 100.0 * (1.0 - span),
            width: span,
            height: span,
        }
    }

    /// Apply a command and return the resulting state and effects.
    ///
    /// Out-of-range navigation is ignored: the state comes back unchanged
    /// with no effects.
    #[must_use]
    pub fn apply(self, cmd: Command) -> (Self, Vec<Effect>) {
        let page_changed = vec![Effect::Relayout, Effect::RenderPages, Effect::Recenter];
        match cmd {
            Command::Next => {
                if self.current_page < self.total_pages && !self.is_zoomed() {
                    let next = Self {
                        current_page: self.current_page + 1,
                        ..self
                    };
                    (next, page_changed)
                } else {
                    (self, vec![])
                }
            }

            Command::Previous => {
                if self.current_page > 1 {
                    let prev = Self {
                        current_page: self.current_page - 1,
                        ..self
                    };
                    (prev, page_changed)
                } else {
                    (self, vec![])
                }
            }

            Command::First => (
                Self {
                    current_page: 1,
                    ..self
                },
                page_changed,
            ),

            Command::ToggleZoom { x, y, frame } => match self.zoom {
                ZoomLevel::Baseline => (
                    Self {
                        zoom: ZoomLevel::Zoomed,
                        origin: TransformOrigin::from_point(x, y, &frame),
                        ..self
                    },
                    vec![Effect::RenderPages],
                ),
                // Origin is kept so the zoom-out animates from where it went in
                ZoomLevel::Zoomed => (
                    Self {
                        zoom: ZoomLevel::Baseline,
                        ..self
                    },
                    vec![Effect::RenderPages],
                ),
            },

            Command::Resize(_) => (self, vec![Effect::Relayout, Effect::Recenter]),
        }
    }
}
