use crate::layout::{compute_layout, DeviceProfile, DisplayMode, LayoutResult, Viewport};
use crate::navigation::{Command, Effect, NavigationState, ZoomWindow};
use crate::pipeline::{Catalog, LoadedCatalog};
use crate::surface::PageAsset;

/// One open catalog with its pages, viewport and navigation state
#[derive(Debug, Clone)]
pub struct ViewerSession {
    catalog: Catalog,
    pages: Vec<PageAsset>,
    aspect_ratio: f32,
    profile: DeviceProfile,
    viewport: Viewport,
    navigation: NavigationState,
}

/// Part of the frame showing one page slot
#[derive(Debug, Clone, Copy)]
pub struct VisibleSlice<'a> {
    /// `None` for the empty right half of a spread on the last page
    pub page: Option<&'a PageAsset>,
    /// Region of the page surface to show, as fractions of the page
    pub source: ZoomWindow,
    /// Share of the frame width this slice occupies
    pub width_fraction: f32,
}

impl ViewerSession {
    pub fn new(loaded: LoadedCatalog, profile: DeviceProfile, viewport: Viewport) -> Self {
        let navigation = NavigationState::new(loaded.pages.page_count(), profile.zoom_factor);
        Self {
            catalog: loaded.catalog,
            aspect_ratio: loaded.pages.aspect_ratio,
            pages: loaded.pages.pages,
            profile,
            viewport,
            navigation,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn pages(&self) -> &[PageAsset] {
        &self.pages
    }

    /// Run a command through the state machine and keep the result
    pub fn dispatch(&mut self, cmd: Command) -> Vec<Effect> {
        if let Command::Resize(viewport) = cmd {
            self.viewport = viewport;
        }
        let (next, effects) = self.navigation.apply(cmd);
        self.navigation = next;
        effects
    }

    /// Toggle zoom around a point in window coordinates
    pub fn toggle_zoom_at(&mut self, x: f32, y: f32) -> Vec<Effect> {
        let frame = self.layout();
        self.dispatch(Command::ToggleZoom { x, y, frame })
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.profile.display_mode(self.viewport)
    }

    /// Recomputed on every call from the current viewport
    pub fn layout(&self) -> LayoutResult {
        compute_layout(
            self.viewport,
            self.aspect_ratio,
            &self.profile,
            self.display_mode(),
        )
    }

    /// Page(s) currently shown: the current page, plus the next one in a spread
    pub fn visible_pages(&self) -> Vec<&PageAsset> {
        let slots = self.slot_count();
        let start = self.navigation.current_page() - 1;
        self.pages.iter().skip(start).take(slots).collect()
    }

    /// Split the zoom window across the page slots of the frame, dropping
    /// slots the zoom pushed entirely out of view.
    pub fn visible_slices(&self) -> Vec<VisibleSlice<'_>> {
        let slots = self.slot_count();
        let slot_width = 1.0 / slots as f32;
        let window = self.navigation.zoom_window();
        let first = self.navigation.current_page() - 1;

        (0..slots)
            .filter_map(|slot| {
                let start = slot as f32 * slot_width;
                let x0 = window.x.max(start);
                let x1 = (window.x + window.width).min(start + slot_width);
                if x1 - x0 <= f32::EPSILON {
                    return None;
                }
                Some(VisibleSlice {
                    page: self.pages.get(first + slot),
                    source: ZoomWindow {
                        x: (x0 - start) / slot_width,
                        y: window.y,
                        width: (x1 - x0) / slot_width,
                        height: window.height,
                    },
                    width_fraction: (x1 - x0) / window.width,
                })
            })
            .collect()
    }

    fn slot_count(&self) -> usize {
        match self.display_mode() {
            DisplayMode::Single => 1,
            DisplayMode::Spread => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadedPages;
    use crate::resolver::SourceKind;
    use crate::surface::PageSurface;
    use image::RgbaImage;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn session(pages: usize, profile: DeviceProfile, viewport: Viewport) -> ViewerSession {
        let assets = (1..=pages)
            .map(|index| PageAsset {
                index,
                surface: PageSurface::Image(RgbaImage::new(70, 100)),
            })
            .collect();
        let pages = LoadedPages::from_pages(SourceKind::Rasterized, assets);
        let loaded = LoadedCatalog {
            catalog: Catalog {
                id: "DEMO".to_string(),
                page_count: pages.page_count(),
                source: SourceKind::Rasterized,
            },
            pages,
        };
        ViewerSession::new(loaded, profile, viewport)
    }

    fn indices(session: &ViewerSession) -> Vec<usize> {
        session.visible_pages().iter().map(|p| p.index).collect()
    }

    #[test]
    fn mounts_first_page() {
        let s = session(3, DeviceProfile::PHONE, Viewport::new(375.0, 812.0));
        assert_eq!(indices(&s), vec![1]);
        assert_eq!(s.aspect_ratio(), 0.7);
    }

    #[test]
    fn landscape_tablet_shows_a_spread() {
        let mut s = session(3, DeviceProfile::TABLET, Viewport::new(1024.0, 768.0));
        assert_eq!(s.display_mode(), DisplayMode::Spread);
        assert_eq!(indices(&s), vec![1, 2]);

        s.dispatch(Command::Next);
        s.dispatch(Command::Next);
        assert_eq!(indices(&s), vec![3]);

        let slices = s.visible_slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].page.map(|p| p.index), Some(3));
        assert!(slices[1].page.is_none());
    }

    #[test]
    fn rotating_switches_between_single_and_spread() {
        let mut s = session(4, DeviceProfile::TABLET, Viewport::new(768.0, 1024.0));
        assert_eq!(indices(&s), vec![1]);

        let effects = s.dispatch(Command::Resize(Viewport::new(1024.0, 768.0)));
        assert_eq!(effects, vec![Effect::Relayout, Effect::Recenter]);
        assert_eq!(indices(&s), vec![1, 2]);
        let layout = s.layout();
        assert!((layout.width / layout.height - 1.4).abs() < 1e-3);
    }

    #[test]
    fn navigating_onto_a_placeholder_is_allowed() {
        let mut s = session(2, DeviceProfile::PHONE, Viewport::new(375.0, 812.0));
        s.pages[1].surface = PageSurface::placeholder(2, "404");

        s.dispatch(Command::Next);
        assert_eq!(s.navigation().current_page(), 2);
        assert!(s.visible_pages()[0].surface.is_placeholder());
    }

    #[test]
    fn zoom_uses_the_device_factor_and_tap_position() {
        let mut s = session(1, DeviceProfile::PHONE, Viewport::new(375.0, 812.0));
        let frame = s.layout();
        s.toggle_zoom_at(frame.left, frame.top);

        assert_eq!(s.navigation().zoom_factor(), DeviceProfile::PHONE.zoom_factor);
        let slices = s.visible_slices();
        assert_eq!(slices.len(), 1);
        assert_eq!(
            slices[0].source,
            ZoomWindow {
                x: 0.0,
                y: 0.0,
                width: 0.5,
                height: 0.5
            }
        );
        assert_eq!(slices[0].width_fraction, 1.0);
    }

    #[test]
    fn zoomed_spread_can_hide_a_page() {
        let mut s = session(2, DeviceProfile::TABLET, Viewport::new(1024.0, 768.0));
        let frame = s.layout();
        // Tap the left edge: the 1.5x window covers x in [0, 2/3]
        s.toggle_zoom_at(frame.left, frame.top + frame.height / 2.0);

        let slices = s.visible_slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].page.map(|p| p.index), Some(1));
        assert!((slices[0].source.width - 1.0).abs() < 1e-5);
        assert!((slices[1].source.width - 1.0 / 3.0).abs() < 1e-5);
        assert!((slices[0].width_fraction + slices[1].width_fraction - 1.0).abs() < 1e-5);

        // At 4x from the corner only the left page stays in view
        let mut s = session(2, DeviceProfile::TABLET, Viewport::new(1024.0, 768.0));
        let frame = s.layout();
        s.navigation = NavigationState::new(2, 4.0)
            .apply(Command::ToggleZoom {
                x: frame.left,
                y: frame.top,
                frame,
            })
            .0;
        let slices = s.visible_slices();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].page.map(|p| p.index), Some(1));
        assert_eq!(slices[0].width_fraction, 1.0);
    }

    proptest! {
        #[test]
        fn resizing_back_reproduces_the_layout(
            sizes in proptest::collection::vec((1.0f32..3000.0, 1.0f32..3000.0), 0..20),
            tablet in any::<bool>(),
        ) {
            let profile = if tablet { DeviceProfile::TABLET } else { DeviceProfile::PHONE };
            let original = Viewport::new(800.0, 600.0);
            let mut s = session(3, profile, original);
            s.dispatch(Command::Next);
            let before = s.layout();

            for (w, h) in sizes {
                s.dispatch(Command::Resize(Viewport::new(w, h)));
            }
            s.dispatch(Command::Resize(original));
            let after = s.layout();

            prop_assert!((before.width - after.width).abs() < 1e-3);
            prop_assert!((before.height - after.height).abs() < 1e-3);
            prop_assert!((before.left - after.left).abs() < 1e-3);
            prop_assert!((before.top - after.top).abs() < 1e-3);
            prop_assert_eq!(s.navigation().current_page(), 2);
        }
    }
}
