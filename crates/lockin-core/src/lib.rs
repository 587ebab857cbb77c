#![forbid(unsafe_code)]

//! Lifecycle core for the Lock-in page widget.
//!
//! Guarantees a single live widget instance per execution context across
//! repeated activation requests, lets callers patch its configuration without
//! remounting, and tears everything down without leaving nodes behind.
//!
//! - [`mount::attach`]: one-off mount into a caller-owned container.
//! - [`controller::WidgetController`]: the singleton create/update/unmount
//!   lifecycle built on top of it.
//!
//! The page and the rendering layer are reached only through the
//! [`page::HostPage`] and [`render::Renderer`] traits.

pub mod config;
pub mod controller;
pub mod error;
pub mod mount;
pub mod page;
pub mod render;

pub use config::{
    ApiClient, ApiHandle, ConfigPatch, PageContext, StorageFuture, StorageHandle, ToggleCallback,
    ToggleHandler, WidgetConfig, WidgetMode, WidgetStorage,
};
pub use controller::{
    CONTAINER_ID, ControllerOptions, UpdateOutcome, WidgetController, WidgetHandle,
};
pub use error::{ConfigError, MountError, PageError, RenderError, Result, StorageError};
pub use mount::{MountHandle, attach};
pub use page::HostPage;
pub use render::{RenderRoot, Renderer};
