//! Responsive frame layout
//!
//! Fits the viewer frame inside a device-specific fraction of the viewport
//! while keeping the page aspect ratio, then centres it.

/// Width / height of an A4 portrait page, used when no page size is known
pub const DEFAULT_ASPECT_RATIO: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Phone,
    Tablet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Single,
    /// Two pages side by side
    Spread,
}

/// Fraction of the viewport the frame may occupy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitFractions {
    pub width: f32,
    pub height: f32,
}

/// Layout constants for one device class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub single: FitFractions,
    /// Fractions used for landscape spreads, `None` if the device never spreads
    pub spread: Option<FitFractions>,
    /// Floor applied to both frame dimensions
    pub min_size: f32,
    /// Magnification used by tap-to-zoom
    pub zoom_factor: f32,
}

impl DeviceProfile {
    pub const PHONE: Self = Self {
        class: DeviceClass::Phone,
        single: FitFractions {
            width: 0.92,
            height: 0.85,
        },
        spread: None,
        min_size: 50.0,
        zoom_factor: 2.0,
    };

    pub const TABLET: Self = Self {
        class: DeviceClass::Tablet,
        single: FitFractions {
            width: 0.9,
            height: 0.85,
        },
        spread: Some(FitFractions {
            width: 0.9,
            height: 0.8,
        }),
        min_size: 100.0,
        zoom_factor: 1.5,
    };

    pub fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Phone => Self::PHONE,
            DeviceClass::Tablet => Self::TABLET,
        }
    }

    /// Spreads are used only on devices that support them, in landscape
    pub fn display_mode(&self, viewport: Viewport) -> DisplayMode {
        if self.spread.is_some() && viewport.is_landscape() {
            DisplayMode::Spread
        } else {
            DisplayMode::Single
        }
    }

    fn fractions(&self, mode: DisplayMode) -> FitFractions {
        match mode {
            DisplayMode::Single => self.single,
            DisplayMode::Spread => self.spread.unwrap_or(self.single),
        }
    }
}

/// Window size in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Computed frame size and centring offsets
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutResult {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub top: f32,
}

impl LayoutResult {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }
}

/// Fit-by-constraint layout.
///
/// Both dimensions are floored at `profile.min_size`, so the aspect ratio
/// holds only while the constrained frame is above the floor.
pub fn compute_layout(
    viewport: Viewport,
    page_aspect_ratio: f32,
    profile: &DeviceProfile,
    mode: DisplayMode,
) -> LayoutResult {
    let page_ratio = sanitize_aspect_ratio(page_aspect_ratio);
    let effective_ratio = match mode {
        DisplayMode::Single => page_ratio,
        DisplayMode::Spread => page_ratio * 2.0,
    };
    let fractions = profile.fractions(mode);
    let viewport_w = non_negative(viewport.width);
    let viewport_h = non_negative(viewport.height);

    let max_w = viewport_w * fractions.width;
    let max_h = viewport_h * fractions.height;

    let (width, height) = if max_w / effective_ratio <= max_h {
        (max_w, max_w / effective_ratio)
    } else {
        (max_h * effective_ratio, max_h)
    };

    let width = width.max(profile.min_size);
    let height = height.max(profile.min_size);

    LayoutResult {
        width,
        height,
        left: ((viewport_w - width) / 2.0).max(0.0),
        top: ((viewport_h - height) / 2.0).max(0.0),
    }
}

/// Replace zero, negative or non-finite ratios with the A4 default
pub fn sanitize_aspect_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        DEFAULT_ASPECT_RATIO
    }
}

fn non_negative(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}
