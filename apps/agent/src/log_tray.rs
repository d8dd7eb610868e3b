//! Tray backend that reports icon changes through the log.
//!
//! Stands in for a native tray on hosts without a notification area
//! (headless sessions, services).

use tracing::info;

use modeguard_security_mode::SecurityLevel;
use modeguard_tray::{IconAsset, MenuState, RenderFuture, TrayBackend};

#[derive(Debug, Default)]
pub struct LogTray {
    visible: Option<SecurityLevel>,
}

impl LogTray {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Renders the clickable menu entries, e.g. `["[x] Secure", "[ ] Quit"]`.
fn describe_menu(level: SecurityLevel) -> Vec<String> {
    MenuState::new(level)
        .build_menu()
        .into_iter()
        .filter(|item| item.action.is_some())
        .map(|item| {
            let mark = if item.checked { "x" } else { " " };
            format!("[{mark}] {}", item.label)
        })
        .collect()
}

impl TrayBackend for LogTray {
    fn set_icon(&mut self, icon: &'static IconAsset) -> RenderFuture<'_> {
        Box::pin(async move {
            let level = icon.level();
            info!(
                %level,
                icon_bytes = icon.bytes().len(),
                menu = ?describe_menu(level),
                "tray icon updated"
            );
            self.visible = Some(level);
            Ok(())
        })
    }

    fn remove_icon(&mut self) {
        if let Some(level) = self.visible.take() {
            info!(%level, "tray icon removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use modeguard_tray::resolve;

    use super::*;

    #[tokio::test]
    async fn set_icon_tracks_visible_level() {
        let mut tray = LogTray::new();
        assert_eq!(tray.visible, None);

        tray.set_icon(resolve(SecurityLevel::Secure)).await.unwrap();
        assert_eq!(tray.visible, Some(SecurityLevel::Secure));

        tray.set_icon(resolve(SecurityLevel::Off)).await.unwrap();
        assert_eq!(tray.visible, Some(SecurityLevel::Off));
    }

    #[tokio::test]
    async fn remove_icon_clears_visible_level() {
        let mut tray = LogTray::new();
        tray.set_icon(resolve(SecurityLevel::Fortress)).await.unwrap();
        tray.remove_icon();
        assert_eq!(tray.visible, None);

        // Removing twice is harmless.
        tray.remove_icon();
    }

    #[test]
    fn menu_description_marks_current_level() {
        let entries = describe_menu(SecurityLevel::Dynamic);
        assert_eq!(
            entries,
            vec!["[ ] Off", "[x] Dynamic", "[ ] Secure", "[ ] Fortress", "[ ] Quit"]
        );
    }
}
