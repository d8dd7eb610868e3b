//! The four protection levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseLevelError;

/// Enforcement posture of the host, ordered by increasing restriction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SecurityLevel {
    Off = 0,
    Dynamic = 1,
    Secure = 2,
    Fortress = 3,
}

impl SecurityLevel {
    /// All levels, least restrictive first.
    pub const ALL: [SecurityLevel; 4] = [
        SecurityLevel::Off,
        SecurityLevel::Dynamic,
        SecurityLevel::Secure,
        SecurityLevel::Fortress,
    ];

    /// Position of this level in [`SecurityLevel::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase identifier used in config files and commands.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Dynamic => "dynamic",
            Self::Secure => "secure",
            Self::Fortress => "fortress",
        }
    }

    /// Human-readable name for menus and tooltips.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Dynamic => "Dynamic",
            Self::Secure => "Secure",
            Self::Fortress => "Fortress",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_ordered_by_restriction() {
        assert!(SecurityLevel::Off < SecurityLevel::Dynamic);
        assert!(SecurityLevel::Dynamic < SecurityLevel::Secure);
        assert!(SecurityLevel::Secure < SecurityLevel::Fortress);

        let mut shuffled = vec![
            SecurityLevel::Secure,
            SecurityLevel::Off,
            SecurityLevel::Fortress,
            SecurityLevel::Dynamic,
        ];
        shuffled.sort();
        assert_eq!(shuffled, SecurityLevel::ALL);
    }

    #[test]
    fn index_matches_position() {
        for (i, level) in SecurityLevel::ALL.iter().enumerate() {
            assert_eq!(level.index(), i);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("off".parse(), Ok(SecurityLevel::Off));
        assert_eq!("Dynamic".parse(), Ok(SecurityLevel::Dynamic));
        assert_eq!(" SECURE ".parse(), Ok(SecurityLevel::Secure));
        assert_eq!("fortress".parse(), Ok(SecurityLevel::Fortress));
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "paranoid".parse::<SecurityLevel>().unwrap_err();
        assert_eq!(err, ParseLevelError("paranoid".into()));
        assert!("".parse::<SecurityLevel>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for level in SecurityLevel::ALL {
            assert_eq!(level.to_string().parse(), Ok(level));
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&SecurityLevel::Fortress).unwrap();
        assert_eq!(json, "\"fortress\"");
        let parsed: SecurityLevel = serde_json::from_str("\"secure\"").unwrap();
        assert_eq!(parsed, SecurityLevel::Secure);
    }
}
