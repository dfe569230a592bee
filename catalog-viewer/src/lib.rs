//! Adaptive catalog viewer
//!
//! Opens a named catalog, acquires its pages either as pre-rendered images
//! or by rendering the original document, and presents them one page (or
//! one spread) at a time with tap-to-zoom.
//!
//! The pipeline runs leaf first:
//!
//! 1. [`resolver`] decides where the pages come from.
//! 2. [`loader`] acquires every page concurrently behind a [`gate::CompletionGate`].
//! 3. [`layout`] fits the frame to the viewport.
//! 4. [`navigation`] tracks page and zoom state.
//! 5. [`shell`] binds all of it to a window.

pub mod config;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod gestures;
pub mod layout;
pub mod loader;
pub mod navigation;
pub mod pipeline;
pub mod renderer;
pub mod resolver;
pub mod session;
pub mod shell;
pub mod surface;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use pipeline::{open_catalog, Catalog, LoadedCatalog};
pub use session::ViewerSession;
