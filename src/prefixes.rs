//! Vendor prefix data for properties, values, selectors and at-rules
//!
//! A prefix is needed when some targeted engine is older than the first
//! version that accepts the unprefixed form.

use crate::targets::{Browser, Targets, Version};
use crate::types::VendorPrefix;

use Browser::*;

/// Never unprefixed in any released version.
const NEVER: Version = Version::new(255, 0, 0);

macro_rules! v {
    ($major:expr, $minor:expr) => {
        Version { major: $major, minor: $minor, patch: 0 }
    };
}

/// Engines needing `prefix`, each with the first version that does not.
type PrefixTable = &'static [(VendorPrefix, &'static [(Browser, Version)])];

/// Anything whose unprefixed form some targets lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixFeature {
    UserSelect,
    Appearance,
    BackdropFilter,
    TextSizeAdjust,
    Mask,
    BoxDecorationBreak,
    Hyphens,
    ClipPath,
    TabSize,
    PrintColorAdjust,
    TextEmphasis,
    BackgroundClipText,
    Sticky,
    FitContent,
    IntrinsicSize,
    ImageSet,
    Placeholder,
    Selection,
    Fullscreen,
    Backdrop,
    FileSelectorButton,
    AnyLink,
    ReadOnly,
    ReadWrite,
    Autofill,
    Keyframes,
}

impl PrefixFeature {
    fn table(self) -> PrefixTable {
        match self {
            PrefixFeature::UserSelect => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(54, 0)), (Chrome, v!(54, 0)), (IosSafari, NEVER), (Opera, v!(41, 0)),
                    (Safari, NEVER), (Samsung, v!(6, 2)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(69, 0))]),
                (VendorPrefix::MS, &[(Edge, v!(79, 0)), (Ie, NEVER)]),
            ],
            PrefixFeature::Appearance => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(84, 0)), (Chrome, v!(84, 0)), (IosSafari, v!(15, 4)), (Opera, v!(70, 0)),
                    (Safari, v!(15, 4)), (Samsung, v!(14, 0)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(80, 0))]),
            ],
            PrefixFeature::BackdropFilter => &[
                (VendorPrefix::WEBKIT, &[(IosSafari, v!(18, 0)), (Safari, v!(18, 0))]),
            ],
            PrefixFeature::TextSizeAdjust => &[
                (VendorPrefix::WEBKIT, &[(IosSafari, NEVER)]),
                (VendorPrefix::MS, &[(Edge, v!(79, 0))]),
            ],
            PrefixFeature::Mask => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(120, 0)), (Chrome, v!(120, 0)), (Edge, v!(120, 0)), (IosSafari, v!(15, 4)),
                    (Opera, v!(106, 0)), (Safari, v!(15, 4)), (Samsung, v!(25, 0)),
                ]),
            ],
            PrefixFeature::BoxDecorationBreak => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, NEVER), (Chrome, NEVER), (Edge, NEVER), (IosSafari, NEVER),
                    (Opera, NEVER), (Safari, NEVER), (Samsung, NEVER),
                ]),
            ],
            PrefixFeature::Hyphens => &[
                (VendorPrefix::WEBKIT, &[(IosSafari, v!(17, 0)), (Safari, v!(17, 0))]),
                (VendorPrefix::MOZ, &[(Firefox, v!(43, 0))]),
                (VendorPrefix::MS, &[(Edge, v!(79, 0)), (Ie, NEVER)]),
            ],
            PrefixFeature::ClipPath => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(55, 0)), (Chrome, v!(55, 0)), (IosSafari, v!(13, 2)), (Opera, v!(42, 0)),
                    (Safari, v!(13, 1)), (Samsung, v!(6, 0)),
                ]),
            ],
            PrefixFeature::TabSize => &[
                (VendorPrefix::MOZ, &[(Firefox, v!(91, 0))]),
                (VendorPrefix::O, &[(Opera, v!(15, 0))]),
            ],
            PrefixFeature::PrintColorAdjust => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, NEVER), (Chrome, NEVER), (Edge, NEVER), (IosSafari, v!(15, 4)),
                    (Opera, NEVER), (Safari, v!(15, 4)), (Samsung, NEVER),
                ]),
            ],
            PrefixFeature::TextEmphasis => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(99, 0)), (Chrome, v!(99, 0)), (Edge, v!(99, 0)), (IosSafari, v!(7, 0)),
                    (Opera, v!(85, 0)), (Safari, v!(7, 0)), (Samsung, v!(18, 0)),
                ]),
            ],
            PrefixFeature::BackgroundClipText => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(120, 0)), (Chrome, v!(120, 0)), (Edge, v!(120, 0)), (IosSafari, v!(14, 0)),
                    (Opera, v!(106, 0)), (Safari, v!(14, 0)), (Samsung, v!(25, 0)),
                ]),
            ],
            PrefixFeature::Sticky => &[
                (VendorPrefix::WEBKIT, &[(IosSafari, v!(13, 0)), (Safari, v!(13, 0))]),
            ],
            PrefixFeature::FitContent => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(46, 0)), (Chrome, v!(46, 0)), (IosSafari, v!(11, 0)), (Opera, v!(33, 0)),
                    (Safari, v!(11, 0)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(94, 0))]),
            ],
            PrefixFeature::IntrinsicSize => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(46, 0)), (Chrome, v!(46, 0)), (IosSafari, v!(11, 0)), (Opera, v!(33, 0)),
                    (Safari, v!(11, 0)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(66, 0))]),
            ],
            PrefixFeature::ImageSet => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(113, 0)), (Chrome, v!(113, 0)), (Edge, v!(113, 0)), (IosSafari, v!(14, 0)),
                    (Opera, v!(99, 0)), (Safari, v!(14, 0)), (Samsung, v!(23, 0)),
                ]),
            ],
            PrefixFeature::Placeholder => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(57, 0)), (Chrome, v!(57, 0)), (IosSafari, v!(10, 3)), (Opera, v!(44, 0)),
                    (Safari, v!(10, 1)), (Samsung, v!(7, 2)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(51, 0))]),
                (VendorPrefix::MS, &[(Edge, v!(79, 0)), (Ie, NEVER)]),
            ],
            PrefixFeature::Selection => &[(VendorPrefix::MOZ, &[(Firefox, v!(62, 0))])],
            PrefixFeature::Fullscreen => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(71, 0)), (Chrome, v!(71, 0)), (Opera, v!(58, 0)), (Safari, v!(16, 4)),
                    (Samsung, v!(10, 1)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(64, 0))]),
                (VendorPrefix::MS, &[(Edge, v!(79, 0)), (Ie, NEVER)]),
            ],
            PrefixFeature::Backdrop => &[
                (VendorPrefix::WEBKIT, &[(IosSafari, v!(15, 4)), (Safari, v!(15, 4))]),
            ],
            PrefixFeature::FileSelectorButton => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(89, 0)), (Chrome, v!(89, 0)), (Edge, v!(89, 0)), (IosSafari, v!(14, 5)),
                    (Opera, v!(75, 0)), (Safari, v!(14, 1)), (Samsung, v!(15, 0)),
                ]),
            ],
            PrefixFeature::AnyLink => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(65, 0)), (Chrome, v!(65, 0)), (IosSafari, v!(9, 0)), (Opera, v!(52, 0)),
                    (Safari, v!(9, 0)), (Samsung, v!(9, 2)),
                ]),
                (VendorPrefix::MOZ, &[(Firefox, v!(50, 0))]),
            ],
            PrefixFeature::ReadOnly | PrefixFeature::ReadWrite => {
                &[(VendorPrefix::MOZ, &[(Firefox, v!(78, 0))])]
            }
            PrefixFeature::Autofill => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(110, 0)), (Chrome, v!(110, 0)), (Edge, v!(110, 0)), (IosSafari, v!(15, 0)),
                    (Opera, v!(96, 0)), (Safari, v!(15, 0)), (Samsung, v!(21, 0)),
                ]),
            ],
            PrefixFeature::Keyframes => &[
                (VendorPrefix::WEBKIT, &[
                    (Android, v!(37, 0)), (Chrome, v!(43, 0)), (IosSafari, v!(9, 0)), (Opera, v!(30, 0)),
                    (Safari, v!(9, 0)), (Samsung, v!(4, 0)),
                ]),
            ],
        }
    }

    /// Prefixes some target needs for this feature.
    pub fn prefixes(self, targets: &Targets) -> VendorPrefix {
        let mut needed = VendorPrefix::NONE;

        for (prefix, engines) in self.table() {
            let required = engines.iter().any(|(browser, unprefixed)| {
                targets
                    .get(*browser)
                    .map_or(false, |version| version < *unprefixed)
            });
            if required {
                needed.insert(*prefix);
            }
        }

        needed
    }

    /// Feature for an unprefixed property name.
    pub fn for_property(name: &str) -> Option<Self> {
        let feature = match name.to_ascii_lowercase().as_str() {
            "user-select" => PrefixFeature::UserSelect,
            "appearance" => PrefixFeature::Appearance,
            "backdrop-filter" => PrefixFeature::BackdropFilter,
            "text-size-adjust" => PrefixFeature::TextSizeAdjust,
            "mask" | "mask-image" | "mask-size" | "mask-position" | "mask-repeat" | "mask-clip"
            | "mask-origin" => PrefixFeature::Mask,
            "box-decoration-break" => PrefixFeature::BoxDecorationBreak,
            "hyphens" => PrefixFeature::Hyphens,
            "clip-path" => PrefixFeature::ClipPath,
            "tab-size" => PrefixFeature::TabSize,
            "print-color-adjust" => PrefixFeature::PrintColorAdjust,
            "text-emphasis" | "text-emphasis-style" | "text-emphasis-color"
            | "text-emphasis-position" => PrefixFeature::TextEmphasis,
            _ => return None,
        };
        Some(feature)
    }

    /// Feature for an unprefixed pseudo-class or pseudo-element name.
    pub fn for_pseudo(name: &str, is_element: bool) -> Option<Self> {
        let feature = match (name.to_ascii_lowercase().as_str(), is_element) {
            ("placeholder", true) => PrefixFeature::Placeholder,
            ("selection", true) => PrefixFeature::Selection,
            ("backdrop", true) => PrefixFeature::Backdrop,
            ("file-selector-button", true) => PrefixFeature::FileSelectorButton,
            ("fullscreen", false) => PrefixFeature::Fullscreen,
            ("any-link", false) => PrefixFeature::AnyLink,
            ("read-only", false) => PrefixFeature::ReadOnly,
            ("read-write", false) => PrefixFeature::ReadWrite,
            ("autofill", false) => PrefixFeature::Autofill,
            _ => return None,
        };
        Some(feature)
    }

    /// The vendor spelling of a pseudo selector: its name and whether it is
    /// a pseudo-element.
    pub fn prefixed_pseudo(self, prefix: VendorPrefix) -> Option<(&'static str, bool)> {
        let spelled = match (self, prefix) {
            (PrefixFeature::Placeholder, VendorPrefix::WEBKIT) => ("-webkit-input-placeholder", true),
            (PrefixFeature::Placeholder, VendorPrefix::MOZ) => ("-moz-placeholder", true),
            (PrefixFeature::Placeholder, VendorPrefix::MS) => ("-ms-input-placeholder", true),
            (PrefixFeature::Selection, VendorPrefix::MOZ) => ("-moz-selection", true),
            (PrefixFeature::Backdrop, VendorPrefix::WEBKIT) => ("-webkit-backdrop", true),
            (PrefixFeature::FileSelectorButton, VendorPrefix::WEBKIT) => {
                ("-webkit-file-upload-button", true)
            }
            (PrefixFeature::Fullscreen, VendorPrefix::WEBKIT) => ("-webkit-full-screen", false),
            (PrefixFeature::Fullscreen, VendorPrefix::MOZ) => ("-moz-full-screen", false),
            (PrefixFeature::Fullscreen, VendorPrefix::MS) => ("-ms-fullscreen", false),
            (PrefixFeature::AnyLink, VendorPrefix::WEBKIT) => ("-webkit-any-link", false),
            (PrefixFeature::AnyLink, VendorPrefix::MOZ) => ("-moz-any-link", false),
            (PrefixFeature::ReadOnly, VendorPrefix::MOZ) => ("-moz-read-only", false),
            (PrefixFeature::ReadWrite, VendorPrefix::MOZ) => ("-moz-read-write", false),
            (PrefixFeature::Autofill, VendorPrefix::WEBKIT) => ("-webkit-autofill", false),
            _ => return None,
        };
        Some(spelled)
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
    fn test_no_targets_need_no_prefixes() {
        assert!(PrefixFeature::UserSelect.prefixes(&Targets::default()).is_empty());
    }

    #[test]
    fn test_user_select_prefixes() {
        let prefixes = PrefixFeature::UserSelect.prefixes(&targets(&[
            (Safari, v!(17, 0)),
            (Firefox, v!(60, 0)),
            (Chrome, v!(120, 0)),
        ]));
        assert!(prefixes.contains(VendorPrefix::WEBKIT));
        assert!(prefixes.contains(VendorPrefix::MOZ));
        assert!(!prefixes.contains(VendorPrefix::MS));
    }

    #[test]
    fn test_unprefixed_boundary() {
        let old = targets(&[(Safari, v!(12, 1))]);
        let new = targets(&[(Safari, v!(13, 0))]);
        assert_eq!(PrefixFeature::Sticky.prefixes(&old), VendorPrefix::WEBKIT);
        assert!(PrefixFeature::Sticky.prefixes(&new).is_empty());
    }

    #[test]
    fn test_pseudo_lookup() {
        let feature = PrefixFeature::for_pseudo("placeholder", true).unwrap();
        assert_eq!(
            feature.prefixed_pseudo(VendorPrefix::WEBKIT),
            Some(("-webkit-input-placeholder", true))
        );
        assert!(PrefixFeature::for_pseudo("placeholder", false).is_none());
        assert_eq!(PrefixFeature::for_property("Mask-Image"), Some(PrefixFeature::Mask));
    }
}
