//! The viewer window
//!
//! Binds window, pointer and keyboard events to the session and draws the
//! current page(s). All decisions are made by [`ViewerSession`]; this
//! module only wires events and rebuilds the display.

use std::collections::HashMap;
use std::sync::Arc;

use iced::widget::image::Handle;
use iced::widget::{
    button, column, container, horizontal_space, image as img, row, stack, text, Space,
};
use iced::{
    event, keyboard, mouse, touch, window, Alignment, ContentFit, Element, Event, Length,
    Padding, Point, Size, Subscription, Task, Theme,
};
use image::RgbaImage;
use tracing::{debug, error, info};

use crate::config::ViewerConfig;
use crate::fetch::HttpFetcher;
use crate::gestures::{Gesture, GestureTracker};
use crate::layout::{DeviceProfile, LayoutResult, Viewport};
use crate::navigation::{Command, Effect, ZoomWindow};
use crate::pipeline::{open_catalog, LoadedCatalog};
use crate::renderer::PdfiumBackend;
use crate::session::ViewerSession;
use crate::surface::PageSurface;

/// Requested size; the device profile is chosen from the size the window
/// actually gets
const INITIAL_WINDOW: Size = Size::new(1024.0, 768.0);

pub fn run(config: ViewerConfig, catalog: String) -> iced::Result {
    iced::application("Catalog Viewer", CatalogViewer::update, CatalogViewer::view)
        .subscription(CatalogViewer::subscription)
        .theme(|_| Theme::Dark)
        .window_size(INITIAL_WINDOW)
        .run_with(move || CatalogViewer::new(config, catalog))
}

#[derive(Debug, Clone)]
enum Message {
    Loaded(Result<Arc<LoadedCatalog>, String>),
    Next,
    Previous,
    First,
    ToggleZoom,
    Resized(Size),
    CursorMoved(Point),
    PointerPressed,
    PointerReleased,
    FingerPressed(Point),
    FingerLifted(Point),
    FingerLost,
    Report,
    Dismiss,
    Retry,
}

/// What one page slot of the frame currently shows
enum SlotView {
    Image { handle: Handle, width_fraction: f32 },
    Placeholder { label: String, width_fraction: f32 },
    Blank { width_fraction: f32 },
}

/// What a slot shows, used to skip rebuilds that would change nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotKey {
    page: Option<usize>,
    window: WindowKey,
    width_fraction: u32,
}

type WindowKey = [u32; 4];

fn window_key(window: ZoomWindow) -> WindowKey {
    [
        window.x.to_bits(),
        window.y.to_bits(),
        window.width.to_bits(),
        window.height.to_bits(),
    ]
}

struct Ready {
    session: ViewerSession,
    frame: LayoutResult,
    /// Whole-page handles, uploaded once per page for the session
    page_handles: HashMap<usize, Handle>,
    /// Zoom crops of the frame currently shown
    crop_handles: HashMap<(usize, WindowKey), Handle>,
    shown: Vec<SlotKey>,
    display: Vec<SlotView>,
}

enum Screen {
    Loading,
    Ready(Box<Ready>),
    /// Session-fatal error, shown until dismissed
    Failed(String),
    Dismissed,
}

struct CatalogViewer {
    config: Arc<ViewerConfig>,
    catalog: String,
    fetcher: Arc<HttpFetcher>,
    backend: Arc<PdfiumBackend>,
    /// Chosen once the real window size is known
    profile: Option<DeviceProfile>,
    viewport: Viewport,
    gestures: GestureTracker,
    cursor: Point,
    screen: Screen,
}

impl CatalogViewer {
    fn new(config: ViewerConfig, catalog: String) -> (Self, Task<Message>) {
        let viewer = Self {
            backend: Arc::new(PdfiumBackend::new(config.pdfium_library_dir.clone())),
            fetcher: Arc::new(HttpFetcher::new()),
            gestures: GestureTracker::new(config.swipe_threshold),
            config: Arc::new(config),
            catalog,
            profile: None,
            viewport: Viewport::new(INITIAL_WINDOW.width, INITIAL_WINDOW.height),
            cursor: Point::ORIGIN,
            screen: Screen::Loading,
        };
        let size = window::get_latest().then(|id| match id {
            Some(id) => window::get_size(id).map(Message::Resized),
            None => Task::done(Message::Resized(INITIAL_WINDOW)),
        });
        (viewer, size)
    }

    /// Pick the device profile for the current viewport and start loading
    fn start(&mut self) -> Task<Message> {
        let class = self
            .config
            .device_class(self.viewport.width, self.viewport.height);
        let profile = DeviceProfile::for_class(class);
        info!(
            "opening {} as {:?} ({}x{})",
            self.catalog, profile.class, self.viewport.width, self.viewport.height
        );
        self.profile = Some(profile);
        self.load(profile)
    }

    fn load(&self, profile: DeviceProfile) -> Task<Message> {
        let config = Arc::clone(&self.config);
        let catalog = self.catalog.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let backend = Arc::clone(&self.backend);
        let viewport = self.viewport;

        Task::perform(
            async move {
                open_catalog(&config, &catalog, fetcher, backend, viewport, profile)
                    .await
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            },
            Message::Loaded,
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Loaded(Ok(loaded)) => {
                let Some(profile) = self.profile else {
                    return Task::none();
                };
                let loaded = Arc::try_unwrap(loaded).unwrap_or_else(|shared| (*shared).clone());
                let session = ViewerSession::new(loaded, profile, self.viewport);
                self.screen = Screen::Ready(Box::new(Ready::new(session)));
            }
            Message::Loaded(Err(e)) => {
                error!("{}: {}", self.catalog, e);
                self.screen = Screen::Failed(e);
            }
            Message::Next => self.dispatch(Command::Next),
            Message::Previous => self.dispatch(Command::Previous),
            Message::First => self.dispatch(Command::First),
            Message::ToggleZoom => {
                if let Screen::Ready(ready) = &mut self.screen {
                    let frame = ready.frame;
                    let (x, y) = (frame.left + frame.width / 2.0, frame.top + frame.height / 2.0);
                    let effects = ready.session.toggle_zoom_at(x, y);
                    ready.apply(&effects);
                }
            }
            Message::Resized(size) => {
                self.viewport = Viewport::new(size.width, size.height);
                if self.profile.is_none() {
                    return self.start();
                }
                self.dispatch(Command::Resize(self.viewport));
            }
            Message::CursorMoved(position) => self.cursor = position,
            Message::PointerPressed => self.gestures.press(self.cursor.x, self.cursor.y),
            Message::PointerReleased => {
                let gesture = self.gestures.release(self.cursor.x, self.cursor.y);
                self.on_gesture(gesture);
            }
            Message::FingerPressed(position) => self.gestures.press(position.x, position.y),
            Message::FingerLifted(position) => {
                let gesture = self.gestures.release(position.x, position.y);
                self.on_gesture(gesture);
            }
            Message::FingerLost => self.gestures.cancel(),
            Message::Report => {
                let url = self.config.report_url(&self.catalog);
                if let Err(e) = open::that_detached(&url) {
                    error!("could not open problem report {}: {}", url, e);
                }
            }
            Message::Dismiss => self.screen = Screen::Dismissed,
            Message::Retry => {
                self.screen = Screen::Loading;
                return match self.profile {
                    Some(profile) => self.load(profile),
                    None => self.start(),
                };
            }
        }
        Task::none()
    }

    fn dispatch(&mut self, cmd: Command) {
        if let Screen::Ready(ready) = &mut self.screen {
            let effects = ready.session.dispatch(cmd);
            ready.apply(&effects);
        }
    }

    fn on_gesture(&mut self, gesture: Option<Gesture>) {
        let Screen::Ready(ready) = &mut self.screen else {
            return;
        };
        let zoomed = ready.session.navigation().is_zoomed();
        if let Some(cmd) = gesture.and_then(|g| gesture_command(g, zoomed, ready.frame)) {
            let effects = ready.session.dispatch(cmd);
            ready.apply(&effects);
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            window::resize_events().map(|(_id, size)| Message::Resized(size)),
            event::listen_with(pointer_message),
            keyboard::on_key_press(key_message),
        ])
    }

    fn view(&self) -> Element<'_, Message> {
        let body: Element<'_, Message> = match &self.screen {
            Screen::Loading => centered(text(format!("Loading catalog {}...", self.catalog)).into()),
            Screen::Failed(message) => centered(
                column![
                    text("This catalog cannot be displayed").size(24),
                    text(message.as_str()),
                    button("Dismiss").on_press(Message::Dismiss),
                ]
                .spacing(12)
                .align_x(Alignment::Center)
                .into(),
            ),
            Screen::Dismissed => centered(
                column![
                    text(format!("Catalog {} is not open", self.catalog)),
                    button("Retry").on_press(Message::Retry),
                ]
                .spacing(12)
                .align_x(Alignment::Center)
                .into(),
            ),
            Screen::Ready(ready) => ready.view(),
        };

        stack![body, self.toolbar()].into()
    }

    fn toolbar(&self) -> Element<'_, Message> {
        let report = button("Report a problem").on_press(Message::Report);
        let Screen::Ready(ready) = &self.screen else {
            return row![horizontal_space(), report].padding(10).into();
        };

        let nav = ready.session.navigation();
        let page = nav.current_page();
        let total = nav.total_pages();
        let zoom_label = if nav.is_zoomed() { "Zoom out" } else { "Zoom in" };

        row![
            button("First").on_press_maybe((page > 1).then_some(Message::First)),
            button("◀").on_press_maybe((page > 1).then_some(Message::Previous)),
            text(format!("Page {page} of {total}")),
            button("▶").on_press_maybe(
                (page < total && !nav.is_zoomed()).then_some(Message::Next)
            ),
            button(zoom_label).on_press(Message::ToggleZoom),
            horizontal_space(),
            report,
        ]
        .spacing(10)
        .padding(10)
        .align_y(Alignment::Center)
        .into()
    }
}

impl Ready {
    fn new(session: ViewerSession) -> Self {
        let mut ready = Self {
            frame: session.layout(),
            session,
            page_handles: HashMap::new(),
            crop_handles: HashMap::new(),
            shown: Vec::new(),
            display: Vec::new(),
        };
        ready.rebuild_display();
        ready
    }

    fn apply(&mut self, effects: &[Effect]) {
        for effect in effects {
            debug!("effect {:?}", effect);
            match effect {
                Effect::Relayout => {
                    self.frame = self.session.layout();
                    // The page count per frame follows the orientation
                    self.rebuild_display();
                }
                Effect::RenderPages => self.rebuild_display(),
                Effect::Recenter => self.frame = self.session.layout(),
            }
        }
    }

    /// Repopulate the display with the current slices. Nothing happens when
    /// the slots are unchanged; whole pages and crops reuse their handles.
    fn rebuild_display(&mut self) {
        let slices = self.session.visible_slices();
        let keys: Vec<SlotKey> = slices
            .iter()
            .map(|slice| SlotKey {
                page: slice.page.map(|asset| asset.index),
                window: window_key(slice.source),
                width_fraction: slice.width_fraction.to_bits(),
            })
            .collect();
        if keys == self.shown {
            return;
        }

        let mut crops = HashMap::new();
        let mut display = Vec::with_capacity(slices.len());
        for slice in &slices {
            let width_fraction = slice.width_fraction;
            let view = match slice.page.map(|asset| (asset.index, &asset.surface)) {
                Some((index, PageSurface::Image(image))) if slice.source == ZoomWindow::FULL => {
                    let handle = self
                        .page_handles
                        .entry(index)
                        .or_insert_with(|| crop_handle(image, ZoomWindow::FULL));
                    SlotView::Image {
                        handle: handle.clone(),
                        width_fraction,
                    }
                }
                Some((index, PageSurface::Image(image))) => {
                    let key = (index, window_key(slice.source));
                    let handle = self
                        .crop_handles
                        .remove(&key)
                        .unwrap_or_else(|| crop_handle(image, slice.source));
                    crops.insert(key, handle.clone());
                    SlotView::Image {
                        handle,
                        width_fraction,
                    }
                }
                Some((_, placeholder)) => SlotView::Placeholder {
                    label: placeholder.label().unwrap_or_default(),
                    width_fraction,
                },
                None => SlotView::Blank { width_fraction },
            };
            display.push(view);
        }

        self.crop_handles = crops;
        self.display = display;
        self.shown = keys;
    }

    fn view(&self) -> Element<'_, Message> {
        let frame = self.frame;
        let slots = self.display.iter().map(|slot| slot.view(frame));

        container(row(slots).width(frame.width).height(frame.height))
            .padding(Padding {
                top: frame.top,
                left: frame.left,
                right: 0.0,
                bottom: 0.0,
            })
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

impl SlotView {
    fn view(&self, frame: LayoutResult) -> Element<'_, Message> {
        match self {
            Self::Image {
                handle,
                width_fraction,
            } => img(handle.clone())
                .width(frame.width * width_fraction)
                .height(frame.height)
                .content_fit(ContentFit::Fill)
                .into(),
            Self::Placeholder {
                label,
                width_fraction,
            } => container(text(label.as_str()))
                .center_x(frame.width * width_fraction)
                .center_y(frame.height)
                .style(container::bordered_box)
                .into(),
            Self::Blank { width_fraction } => {
                Space::new(frame.width * width_fraction, frame.height).into()
            }
        }
    }
}

/// Command a finished gesture stands for. Swipes page only at baseline
/// zoom; taps outside the frame are ignored.
fn gesture_command(gesture: Gesture, zoomed: bool, frame: LayoutResult) -> Option<Command> {
    match gesture {
        Gesture::SwipeLeft if !zoomed => Some(Command::Next),
        Gesture::SwipeRight if !zoomed => Some(Command::Previous),
        Gesture::SwipeLeft | Gesture::SwipeRight => None,
        Gesture::Tap { x, y } if frame.contains(x, y) => {
            Some(Command::ToggleZoom { x, y, frame })
        }
        Gesture::Tap { .. } => None,
    }
}

/// Handle for the part of `image` selected by `window`
fn crop_handle(image: &RgbaImage, window: ZoomWindow) -> Handle {
    if window == ZoomWindow::FULL {
        return Handle::from_rgba(image.width(), image.height(), image.as_raw().clone());
    }
    let (w, h) = (image.width() as f32, image.height() as f32);
    let x = (window.x * w).floor() as u32;
    let y = (window.y * h).floor() as u32;
    let crop_w = ((window.width * w).round() as u32).clamp(1, image.width().saturating_sub(x).max(1));
    let crop_h = ((window.height * h).round() as u32).clamp(1, image.height().saturating_sub(y).max(1));
    let cropped = image::imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();
    Handle::from_rgba(cropped.width(), cropped.height(), cropped.into_raw())
}

fn centered(content: Element<'_, Message>) -> Element<'_, Message> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

fn pointer_message(event: Event, status: event::Status, _window: window::Id) -> Option<Message> {
    if let Event::Mouse(mouse::Event::CursorMoved { position }) = event {
        return Some(Message::CursorMoved(position));
    }
    // Clicks on toolbar buttons are not gestures
    if status == event::Status::Captured {
        return None;
    }
    match event {
        Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
            Some(Message::PointerPressed)
        }
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
            Some(Message::PointerReleased)
        }
        Event::Touch(touch::Event::FingerPressed { position, .. }) => {
            Some(Message::FingerPressed(position))
        }
        Event::Touch(touch::Event::FingerLifted { position, .. }) => {
            Some(Message::FingerLifted(position))
        }
        Event::Touch(touch::Event::FingerLost { .. }) => Some(Message::FingerLost),
        _ => None,
    }
}

fn key_message(key: keyboard::Key, _modifiers: keyboard::Modifiers) -> Option<Message> {
    use keyboard::key::Named;

    match key.as_ref() {
        keyboard::Key::Named(Named::ArrowRight | Named::PageDown) => Some(Message::Next),
        keyboard::Key::Named(Named::ArrowLeft | Named::PageUp) => Some(Message::Previous),
        keyboard::Key::Named(Named::Home) => Some(Message::First),
        keyboard::Key::Character("z") => Some(Message::ToggleZoom),
        _ => None,
    }
}
