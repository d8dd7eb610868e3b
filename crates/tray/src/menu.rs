//! Context menu for picking the security level from the tray.

use modeguard_security_mode::SecurityLevel;

/// Events emitted by the tray toward the agent core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    /// User picked a level from the menu.
    LevelSelected(SecurityLevel),
    /// User asked for the current icon to be shown again.
    RefreshRequested,
    /// User clicked "Quit".
    QuitRequested,
}

/// A single menu item.
#[derive(Debug, Clone)]
pub struct MenuItem {
    /// Display text.
    pub label: String,
    /// Whether the item is enabled (clickable).
    pub enabled: bool,
    /// Whether the item carries a check mark.
    pub checked: bool,
    /// Event emitted on click.
    pub action: Option<TrayEvent>,
}

impl MenuItem {
    fn text(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            checked: false,
            action: None,
        }
    }

    fn separator() -> Self {
        Self::text(String::new())
    }
}

/// State the context menu is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    /// Level currently shown in the tray.
    pub level: SecurityLevel,
}

impl MenuState {
    pub fn new(level: SecurityLevel) -> Self {
        Self { level }
    }

    /// Builds the menu items from the current state.
    pub fn build_menu(&self) -> Vec<MenuItem> {
        let mut items = vec![
            MenuItem::text(format!("Security level: {}", self.level.label())),
            MenuItem::separator(),
        ];

        // The current level stays clickable: re-selecting it re-commits the
        // level, which refreshes the icon.
        items.extend(SecurityLevel::ALL.into_iter().map(|level| MenuItem {
            label: level.label().into(),
            enabled: true,
            checked: level == self.level,
            action: Some(TrayEvent::LevelSelected(level)),
        }));

        items.push(MenuItem::separator());
        items.push(MenuItem {
            label: "Quit".into(),
            enabled: true,
            checked: false,
            action: Some(TrayEvent::QuitRequested),
        });

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_current_level() {
        let items = MenuState::new(SecurityLevel::Secure).build_menu();
        assert_eq!(items[0].label, "Security level: Secure");
        assert!(!items[0].enabled);
    }

    #[test]
    fn one_item_per_level_with_current_checked() {
        let items = MenuState::new(SecurityLevel::Fortress).build_menu();
        let levels: Vec<&MenuItem> = items
            .iter()
            .filter(|i| matches!(i.action, Some(TrayEvent::LevelSelected(_))))
            .collect();

        assert_eq!(levels.len(), 4);
        let checked: Vec<&str> = levels
            .iter()
            .filter(|i| i.checked)
            .map(|i| i.label.as_str())
            .collect();
        assert_eq!(checked, vec!["Fortress"]);
        assert!(levels.iter().all(|i| i.enabled));
    }

    #[test]
    fn level_items_in_restriction_order() {
        let items = MenuState::new(SecurityLevel::Off).build_menu();
        let order: Vec<SecurityLevel> = items
            .iter()
            .filter_map(|i| match i.action {
                Some(TrayEvent::LevelSelected(level)) => Some(level),
                _ => None,
            })
            .collect();
        assert_eq!(order, SecurityLevel::ALL);
    }

    #[test]
    fn quit_is_last_and_enabled() {
        let items = MenuState::new(SecurityLevel::Dynamic).build_menu();
        let quit = items.last().unwrap();
        assert_eq!(quit.label, "Quit");
        assert!(quit.enabled);
        assert_eq!(quit.action, Some(TrayEvent::QuitRequested));
    }

    #[test]
    fn separators_are_disabled() {
        let items = MenuState::new(SecurityLevel::Dynamic).build_menu();
        for item in items.iter().filter(|i| i.label.is_empty()) {
            assert!(!item.enabled);
            assert!(item.action.is_none());
        }
    }
}
