//! Core types shared by every compilation phase

use serde::Serialize;
use std::fmt;
use std::ops::BitOr;

/// A position in the original source.
///
/// `line` and `column` are 0-based (the source map convention); `Display`
/// renders them 1-based for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self { offset, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Set of vendor prefixes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VendorPrefix(u8);

impl VendorPrefix {
    pub const NONE: VendorPrefix = VendorPrefix(0);
    pub const WEBKIT: VendorPrefix = VendorPrefix(1 << 0);
    pub const MOZ: VendorPrefix = VendorPrefix(1 << 1);
    pub const MS: VendorPrefix = VendorPrefix(1 << 2);
    pub const O: VendorPrefix = VendorPrefix(1 << 3);

    const ALL: [VendorPrefix; 4] = [Self::WEBKIT, Self::MOZ, Self::MS, Self::O];

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: VendorPrefix) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: VendorPrefix) {
        self.0 |= other.0;
    }

    /// Individual prefixes in emission order (webkit, moz, ms, o).
    pub fn iter(self) -> impl Iterator<Item = VendorPrefix> {
        Self::ALL.into_iter().filter(move |p| self.contains(*p))
    }

    /// The `-webkit-` style string for a single prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WEBKIT => "-webkit-",
            Self::MOZ => "-moz-",
            Self::MS => "-ms-",
            Self::O => "-o-",
            _ => "",
        }
    }

    /// Split a vendor-prefixed name into its prefix and the unprefixed rest.
    pub fn strip(name: &str) -> (VendorPrefix, &str) {
        for prefix in Self::ALL {
            let text = prefix.as_str();
            let head = name.get(..text.len());
            if name.len() > text.len() && head.map_or(false, |h| h.eq_ignore_ascii_case(text)) {
                return (prefix, &name[text.len()..]);
            }
        }
        (Self::NONE, name)
    }
}

impl BitOr for VendorPrefix {
    type Output = VendorPrefix;

    fn bitor(self, rhs: VendorPrefix) -> VendorPrefix {
        VendorPrefix(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_iteration_order() {
        let prefixes = VendorPrefix::MS | VendorPrefix::WEBKIT;
        let collected: Vec<_> = prefixes.iter().map(|p| p.as_str()).collect();
        assert_eq!(collected, vec!["-webkit-", "-ms-"]);
        assert!(!prefixes.contains(VendorPrefix::MOZ));
        assert!(VendorPrefix::NONE.is_empty());
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(VendorPrefix::strip("-webkit-user-select"), (VendorPrefix::WEBKIT, "user-select"));
        assert_eq!(VendorPrefix::strip("-MOZ-appearance"), (VendorPrefix::MOZ, "appearance"));
        assert_eq!(VendorPrefix::strip("color"), (VendorPrefix::NONE, "color"));
        assert_eq!(VendorPrefix::strip("-o-"), (VendorPrefix::NONE, "-o-"));
    }

    #[test]
    fn test_location_display_is_one_based() {
        assert_eq!(Location::new(10, 0, 4).to_string(), "1:5");
    }
}
