//! Compiled-in tray icons, one per security level.

use modeguard_security_mode::SecurityLevel;

/// Icon shown while protection is off.
pub const OFF_ICO: &[u8] = include_bytes!("../assets/off.ico");
/// Icon shown in dynamic mode.
pub const DYNAMIC_ICO: &[u8] = include_bytes!("../assets/dynamic.ico");
/// Icon shown in secure mode.
pub const SECURE_ICO: &[u8] = include_bytes!("../assets/secure.ico");
/// Icon shown in fortress mode.
pub const FORTRESS_ICO: &[u8] = include_bytes!("../assets/fortress.ico");

/// A pre-rendered `.ico` image and the level it depicts.
#[derive(Debug, PartialEq, Eq)]
pub struct IconAsset {
    level: SecurityLevel,
    bytes: &'static [u8],
}

impl IconAsset {
    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }
}

/// Indexed by [`SecurityLevel::index`].
static ICONS: [IconAsset; 4] = [
    IconAsset {
        level: SecurityLevel::Off,
        bytes: OFF_ICO,
    },
    IconAsset {
        level: SecurityLevel::Dynamic,
        bytes: DYNAMIC_ICO,
    },
    IconAsset {
        level: SecurityLevel::Secure,
        bytes: SECURE_ICO,
    },
    IconAsset {
        level: SecurityLevel::Fortress,
        bytes: FORTRESS_ICO,
    },
];

/// Returns the icon for `level`. Total over all levels.
pub fn resolve(level: SecurityLevel) -> &'static IconAsset {
    let icon = &ICONS[level.index()];
    debug_assert_eq!(icon.level, level, "icon table out of order");
    icon
}
