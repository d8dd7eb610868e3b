//! The seam between the notifier and the native tray.

use std::future::Future;
use std::pin::Pin;

use crate::icons::IconAsset;

/// A boxed future returned by [`TrayBackend::set_icon`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RenderError>> + Send + 'a>>;

/// Native tray failures. All of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The tray host is missing or not ready (e.g. no StatusNotifierWatcher yet).
    #[error("tray unavailable: {0}")]
    Unavailable(String),

    /// The tray host refused the icon update.
    #[error("tray rejected icon: {0}")]
    Rejected(String),
}

/// Native tray API driven by [`TrayNotifier`](crate::TrayNotifier).
///
/// The notifier is the only caller and never issues two calls at once.
/// `set_icon` may be slow and may fail; it reports failure through its result
/// and never panics.
pub trait TrayBackend: Send + 'static {
    /// Shows `icon`, replacing whatever the tray displays.
    fn set_icon(&mut self, icon: &'static IconAsset) -> RenderFuture<'_>;

    /// Removes the icon and releases the native handle.
    fn remove_icon(&mut self);
}
