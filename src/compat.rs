//! Feature compatibility table
//!
//! Each feature lists the first version of every engine that supports it
//! natively. An engine missing from a feature's list never supported it.

use crate::targets::{Browser, Targets, Version};
use std::fmt;

use Browser::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    LabColors,
    OklabColors,
    P3Colors,
    ColorFunction,
    HexAlphaColors,
    Nesting,
    MediaRangeSyntax,
    IsSelector,
    HasSelector,
    ContainerQueries,
}

macro_rules! v {
    ($major:expr, $minor:expr) => {
        Version { major: $major, minor: $minor, patch: 0 }
    };
}

impl Feature {
    fn first_supported(self) -> &'static [(Browser, Version)] {
        match self {
            Feature::LabColors => &[
                (Android, v!(111, 0)), (Chrome, v!(111, 0)), (Edge, v!(111, 0)), (Firefox, v!(113, 0)),
                (IosSafari, v!(15, 0)), (Opera, v!(97, 0)), (Safari, v!(15, 0)), (Samsung, v!(22, 0)),
            ],
            Feature::OklabColors => &[
                (Android, v!(111, 0)), (Chrome, v!(111, 0)), (Edge, v!(111, 0)), (Firefox, v!(113, 0)),
                (IosSafari, v!(15, 4)), (Opera, v!(97, 0)), (Safari, v!(15, 4)), (Samsung, v!(22, 0)),
            ],
            Feature::P3Colors => &[
                (Android, v!(111, 0)), (Chrome, v!(111, 0)), (Edge, v!(111, 0)), (Firefox, v!(113, 0)),
                (IosSafari, v!(10, 0)), (Opera, v!(97, 0)), (Safari, v!(10, 0)), (Samsung, v!(22, 0)),
            ],
            Feature::ColorFunction => &[
                (Android, v!(111, 0)), (Chrome, v!(111, 0)), (Edge, v!(111, 0)), (Firefox, v!(113, 0)),
                (IosSafari, v!(15, 0)), (Opera, v!(97, 0)), (Safari, v!(15, 0)), (Samsung, v!(22, 0)),
            ],
            Feature::HexAlphaColors => &[
                (Android, v!(62, 0)), (Chrome, v!(62, 0)), (Edge, v!(79, 0)), (Firefox, v!(49, 0)),
                (IosSafari, v!(9, 3)), (Opera, v!(49, 0)), (Safari, v!(10, 0)), (Samsung, v!(8, 2)),
            ],
            Feature::Nesting => &[
                (Android, v!(120, 0)), (Chrome, v!(120, 0)), (Edge, v!(120, 0)), (Firefox, v!(117, 0)),
                (IosSafari, v!(17, 2)), (Opera, v!(106, 0)), (Safari, v!(17, 2)), (Samsung, v!(25, 0)),
            ],
            Feature::MediaRangeSyntax => &[
                (Android, v!(104, 0)), (Chrome, v!(104, 0)), (Edge, v!(104, 0)), (Firefox, v!(63, 0)),
                (IosSafari, v!(16, 4)), (Opera, v!(91, 0)), (Safari, v!(16, 4)), (Samsung, v!(20, 0)),
            ],
            Feature::IsSelector => &[
                (Android, v!(88, 0)), (Chrome, v!(88, 0)), (Edge, v!(88, 0)), (Firefox, v!(78, 0)),
                (IosSafari, v!(14, 0)), (Opera, v!(74, 0)), (Safari, v!(14, 0)), (Samsung, v!(15, 0)),
            ],
            Feature::HasSelector => &[
                (Android, v!(105, 0)), (Chrome, v!(105, 0)), (Edge, v!(105, 0)), (Firefox, v!(121, 0)),
                (IosSafari, v!(15, 4)), (Opera, v!(91, 0)), (Safari, v!(15, 4)), (Samsung, v!(20, 0)),
            ],
            Feature::ContainerQueries => &[
                (Android, v!(105, 0)), (Chrome, v!(105, 0)), (Edge, v!(105, 0)), (Firefox, v!(110, 0)),
                (IosSafari, v!(16, 0)), (Opera, v!(91, 0)), (Safari, v!(16, 0)), (Samsung, v!(20, 0)),
            ],
        }
    }

    /// Whether every targeted engine supports the feature natively.
    pub fn is_compatible(self, targets: &Targets) -> bool {
        let table = self.first_supported();
        targets.iter().all(|(browser, version)| {
            table
                .iter()
                .find(|(b, _)| *b == browser)
                .map_or(false, |(_, first)| version >= *first)
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::LabColors => "lab-colors",
            Feature::OklabColors => "oklab-colors",
            Feature::P3Colors => "p3-colors",
            Feature::ColorFunction => "color-function",
            Feature::HexAlphaColors => "hex-alpha-colors",
            Feature::Nesting => "nesting",
            Feature::MediaRangeSyntax => "media-range-syntax",
            Feature::IsSelector => ":is()",
            Feature::HasSelector => ":has()",
            Feature::ContainerQueries => "@container",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(entries: &[(Browser, Version)]) -> Targets {
        let mut targets = Targets::default();
        for (browser, version) in entries {
            targets.set(*browser, Some(*version));
        }
        targets
    }

    #[test]
    fn test_empty_targets_support_everything() {
        let empty = Targets::default();
        assert!(Feature::LabColors.is_compatible(&empty));
        assert!(Feature::Nesting.is_compatible(&empty));
    }

    #[test]
    fn test_minimum_version_boundaries() {
        assert!(Feature::LabColors.is_compatible(&targets(&[(Safari, v!(15, 0))])));
        assert!(!Feature::OklabColors.is_compatible(&targets(&[(Safari, v!(15, 0))])));
        assert!(Feature::OklabColors.is_compatible(&targets(&[(Safari, v!(15, 4))])));
    }

    #[test]
    fn test_one_old_engine_breaks_support() {
        let mixed = targets(&[(Chrome, v!(120, 0)), (Firefox, v!(100, 0))]);
        assert!(!Feature::LabColors.is_compatible(&mixed));
        assert!(Feature::HexAlphaColors.is_compatible(&mixed));
    }

    #[test]
    fn test_ie_never_supports_modern_features() {
        let ie = targets(&[(Ie, v!(11, 0))]);
        assert!(!Feature::HexAlphaColors.is_compatible(&ie));
        assert!(!Feature::IsSelector.is_compatible(&ie));
    }
}
