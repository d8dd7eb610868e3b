//! System tray presentation of the current security level.
//!
//! [`TrayNotifier`] subscribes to a
//! [`SecurityModeStore`](modeguard_security_mode::SecurityModeStore) and keeps
//! the tray icon in step with it on its own tokio task:
//! - [`icons`]: the compiled-in icon for each level
//! - [`TrayBackend`]: the OS tray seam (`set_icon` / `remove_icon`)
//! - [`RetryConfig`]: backoff for failed renders
//! - [`menu`]: the level picker shown in the tray context menu
//!
//! # Platform notes
//! - The backend owns the native tray handle; the notifier is its only caller
//! - Producers never wait on the backend: a slow or failing tray only delays
//!   the notifier's own task

mod backend;
pub mod icons;
pub mod menu;
mod notifier;
mod retry;

pub use backend::{RenderError, RenderFuture, TrayBackend};
pub use icons::{IconAsset, resolve};
pub use menu::{MenuItem, MenuState, TrayEvent};
pub use notifier::{NotifierError, NotifierStatus, StopHandle, TrayNotifier};
pub use retry::RetryConfig;
