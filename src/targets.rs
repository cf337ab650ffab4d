//! Browser target matrix

use crate::error::{CssError, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// Browser engines tracked by the compatibility tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Browser {
    Android,
    Chrome,
    Edge,
    Firefox,
    Ie,
    IosSafari,
    Opera,
    Safari,
    Samsung,
}

impl Browser {
    pub const ALL: [Browser; 9] = [
        Browser::Android,
        Browser::Chrome,
        Browser::Edge,
        Browser::Firefox,
        Browser::Ie,
        Browser::IosSafari,
        Browser::Opera,
        Browser::Safari,
        Browser::Samsung,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Browser::Android => "android",
            Browser::Chrome => "chrome",
            Browser::Edge => "edge",
            Browser::Firefox => "firefox",
            Browser::Ie => "ie",
            Browser::IosSafari => "ios_saf",
            Browser::Opera => "opera",
            Browser::Safari => "safari",
            Browser::Samsung => "samsung",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A browser version, ordered by (major, minor, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

    /// Packed `major << 16 | minor << 8 | patch` form.
    pub fn packed(self) -> u32 {
        (self.major as u32) << 16 | (self.minor as u32) << 8 | self.patch as u32
    }

    pub fn from_packed(value: u32) -> Self {
        Self {
            major: ((value >> 16) & 0xff) as u8,
            minor: ((value >> 8) & 0xff) as u8,
            patch: (value & 0xff) as u8,
        }
    }

    /// Parse `major[.minor[.patch]]`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = [0u8; 3];
        let mut count = 0;

        for part in text.trim().split('.') {
            if count == 3 {
                return Err(CssError::InvalidFormat {
                    message: format!("Invalid version '{}'", text),
                });
            }
            parts[count] = part.parse::<u8>().map_err(|_| CssError::InvalidFormat {
                message: format!("Invalid version '{}'", text),
            })?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.minor, self.patch) {
            (0, 0) => write!(f, "{}", self.major),
            (minor, 0) => write!(f, "{}.{}", self.major, minor),
            (minor, patch) => write!(f, "{}.{}.{}", self.major, minor, patch),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.packed())
    }
}

/// Minimum supported version per engine. `None` means the engine is not
/// targeted; a matrix with no engines at all supports every feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Targets {
    pub android: Option<Version>,
    pub chrome: Option<Version>,
    pub edge: Option<Version>,
    pub firefox: Option<Version>,
    pub ie: Option<Version>,
    pub ios_saf: Option<Version>,
    pub opera: Option<Version>,
    pub safari: Option<Version>,
    pub samsung: Option<Version>,
}

impl Targets {
    pub fn get(&self, browser: Browser) -> Option<Version> {
        self.slots()[browser.index()]
    }

    pub fn set(&mut self, browser: Browser, version: Option<Version>) {
        *self.slot_mut(browser) = version;
    }

    /// Lower the minimum for `browser` to `version` if it is older.
    pub fn include(&mut self, browser: Browser, version: Version) {
        let slot = self.slot_mut(browser);
        match slot {
            Some(current) if *current <= version => {}
            _ => *slot = Some(version),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(Option::is_none)
    }

    /// Targeted engines with their minimum versions, in `Browser::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Browser, Version)> + '_ {
        Browser::ALL
            .into_iter()
            .filter_map(move |browser| self.get(browser).map(|v| (browser, v)))
    }

    fn slots(&self) -> [Option<Version>; 9] {
        [
            self.android,
            self.chrome,
            self.edge,
            self.firefox,
            self.ie,
            self.ios_saf,
            self.opera,
            self.safari,
            self.samsung,
        ]
    }

    fn slot_mut(&mut self, browser: Browser) -> &mut Option<Version> {
        match browser {
            Browser::Android => &mut self.android,
            Browser::Chrome => &mut self.chrome,
            Browser::Edge => &mut self.edge,
            Browser::Firefox => &mut self.firefox,
            Browser::Ie => &mut self.ie,
            Browser::IosSafari => &mut self.ios_saf,
            Browser::Opera => &mut self.opera,
            Browser::Safari => &mut self.safari,
            Browser::Samsung => &mut self.samsung,
        }
    }
}

impl fmt::Display for Targets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(no targets)");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(browser, version)| format!("{} {}", browser, version))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
