//! Browserslist query resolution
//!
//! Resolves queries such as `"last 2 versions, not IE <= 11"` against a
//! release/usage table compiled into the binary and reduces the selection to
//! a [`Targets`] matrix holding the oldest selected version of each engine.

use crate::error::{CssError, Result};
use crate::targets::{Browser, Targets, Version};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// A selection of (agent index, version) pairs.
type Selection = BTreeSet<(usize, Version)>;

struct Agent {
    name: &'static str,
    aliases: &'static [&'static str],
    engine: Option<Browser>,
    /// Released versions, oldest first.
    versions: Vec<Version>,
}

const DEFAULTS_QUERY: &str = "> 0.5%, last 2 versions, Firefox ESR, not dead";
const DEAD_QUERY: &str = "ie <= 11, ie_mob <= 11, bb <= 10, op_mob <= 12.1, samsung 4, baidu all";
const FIREFOX_ESR: [u8; 2] = [115, 128];

/// Global usage share (percent) for versions with a measurable share.
/// Unlisted versions count as 0%.
const USAGE: &[(&str, u8, u8, f32)] = &[
    ("and_chr", 130, 0, 41.2),
    ("chrome", 130, 0, 9.1),
    ("chrome", 129, 0, 6.4),
    ("chrome", 128, 0, 1.3),
    ("chrome", 127, 0, 0.6),
    ("chrome", 126, 0, 0.4),
    ("chrome", 109, 0, 0.5),
    ("ios_saf", 18, 0, 4.6),
    ("ios_saf", 17, 6, 3.2),
    ("ios_saf", 16, 6, 0.9),
    ("ios_saf", 18, 1, 0.3),
    ("safari", 18, 0, 1.1),
    ("safari", 17, 6, 1.0),
    ("safari", 18, 1, 0.2),
    ("edge", 130, 0, 4.1),
    ("edge", 129, 0, 0.6),
    ("firefox", 132, 0, 1.7),
    ("firefox", 131, 0, 0.9),
    ("firefox", 128, 0, 0.3),
    ("firefox", 115, 0, 0.2),
    ("and_ff", 132, 0, 0.5),
    ("samsung", 26, 0, 2.3),
    ("samsung", 25, 0, 0.3),
    ("opera", 114, 0, 1.2),
    ("op_mob", 80, 0, 0.1),
    ("op_mini", 0, 0, 1.4),
    ("and_uc", 15, 5, 1.0),
    ("and_qq", 14, 9, 0.2),
    ("android", 130, 0, 0.3),
    ("ie", 11, 0, 0.2),
    ("kaios", 3, 0, 0.1),
];

lazy_static! {
    static ref AGENTS: Vec<Agent> = build_agents();

    static ref LAST_VERSIONS: Regex =
        Regex::new(r"(?i)^last\s+(\d+)\s+(major\s+)?versions?$").unwrap();
    static ref LAST_BROWSER_VERSIONS: Regex =
        Regex::new(r"(?i)^last\s+(\d+)\s+(\w+)\s+(major\s+)?versions?$").unwrap();
    static ref POPULARITY: Regex = Regex::new(r"^(>=|<=|>|<)\s*(\d+(?:\.\d+)?)%$").unwrap();
    static ref COVER: Regex = Regex::new(r"(?i)^cover\s+(\d+(?:\.\d+)?)%$").unwrap();
    static ref BROWSER_RANGE: Regex =
        Regex::new(r"^(\w+)\s+(\d+(?:\.\d+){0,2})\s*-\s*(\d+(?:\.\d+){0,2})$").unwrap();
    static ref BROWSER_COMPARE: Regex =
        Regex::new(r"^(\w+)\s*(>=|<=|>|<)\s*(\d+(?:\.\d+){0,2})$").unwrap();
    static ref BROWSER_VERSION: Regex = Regex::new(r"^(\w+)\s+(\d+(?:\.\d+){0,2})$").unwrap();
    static ref BROWSER_ALL: Regex = Regex::new(r"(?i)^(\w+)\s+all$").unwrap();
    static ref UNRELEASED: Regex = Regex::new(r"(?i)^unreleased(\s+\w+)?\s+versions$").unwrap();
    static ref SEPARATOR: Regex = Regex::new(r"(?i)\s*,\s*|\s+(or|and)\s+").unwrap();
}

fn majors(range: RangeInclusive<u8>) -> Vec<Version> {
    range.map(|major| Version::new(major, 0, 0)).collect()
}

fn list(versions: &[(u8, u8)]) -> Vec<Version> {
    versions
        .iter()
        .map(|&(major, minor)| Version::new(major, minor, 0))
        .collect()
}

fn build_agents() -> Vec<Agent> {
    let mut android = list(&[(2, 1), (2, 2), (2, 3), (3, 0), (4, 0), (4, 1), (4, 2), (4, 4)]);
    android.push(Version::new(4, 4, 3));
    android.extend(majors(37..=130));

    let mut edge = majors(12..=18);
    edge.extend(majors(79..=130));

    let mut opera = list(&[
        (9, 0), (9, 5), (10, 0), (10, 1), (10, 5), (10, 6), (11, 0), (11, 1), (11, 5), (11, 6),
        (12, 0), (12, 1),
    ]);
    opera.extend(majors(15..=114));

    let safari = list(&[
        (3, 1), (3, 2), (4, 0), (5, 0), (5, 1), (6, 0), (6, 1), (7, 0), (7, 1), (8, 0), (9, 0),
        (9, 1), (10, 0), (10, 1), (11, 0), (11, 1), (12, 0), (12, 1), (13, 0), (13, 1), (14, 0),
        (14, 1), (15, 0), (15, 1), (15, 2), (15, 4), (15, 5), (15, 6), (16, 0), (16, 1), (16, 2),
        (16, 3), (16, 4), (16, 5), (16, 6), (17, 0), (17, 1), (17, 2), (17, 3), (17, 4), (17, 5),
        (17, 6), (18, 0), (18, 1),
    ]);

    let ios = list(&[
        (3, 2), (4, 0), (4, 2), (5, 0), (6, 0), (7, 0), (8, 0), (8, 1), (9, 0), (9, 3), (10, 0),
        (10, 3), (11, 0), (11, 3), (12, 0), (12, 2), (13, 0), (13, 2), (13, 4), (14, 0), (14, 5),
        (15, 0), (15, 2), (15, 4), (15, 5), (15, 6), (16, 0), (16, 1), (16, 2), (16, 3), (16, 4),
        (16, 5), (16, 6), (17, 0), (17, 1), (17, 2), (17, 3), (17, 4), (17, 5), (17, 6), (18, 0),
        (18, 1),
    ]);

    let samsung = list(&[
        (4, 0), (5, 0), (6, 2), (7, 2), (8, 2), (9, 2), (10, 1), (11, 1), (12, 0), (13, 0),
        (14, 0), (15, 0), (16, 0), (17, 0), (18, 0), (19, 0), (20, 0), (21, 0), (22, 0), (23, 0),
        (24, 0), (25, 0), (26, 0),
    ]);

    vec![
        Agent { name: "android", aliases: &[], engine: Some(Browser::Android), versions: android },
        Agent { name: "chrome", aliases: &[], engine: Some(Browser::Chrome), versions: majors(4..=130) },
        Agent {
            name: "and_chr",
            aliases: &["chromeandroid"],
            engine: Some(Browser::Chrome),
            versions: majors(130..=130),
        },
        Agent { name: "edge", aliases: &[], engine: Some(Browser::Edge), versions: edge },
        Agent {
            name: "firefox",
            aliases: &["ff", "fx"],
            engine: Some(Browser::Firefox),
            versions: majors(2..=132),
        },
        Agent {
            name: "and_ff",
            aliases: &["firefoxandroid"],
            engine: Some(Browser::Firefox),
            versions: majors(132..=132),
        },
        Agent {
            name: "ie",
            aliases: &["explorer"],
            engine: Some(Browser::Ie),
            versions: list(&[(5, 5), (6, 0), (7, 0), (8, 0), (9, 0), (10, 0), (11, 0)]),
        },
        Agent { name: "ios_saf", aliases: &["ios"], engine: Some(Browser::IosSafari), versions: ios },
        Agent { name: "opera", aliases: &[], engine: Some(Browser::Opera), versions: opera },
        Agent {
            name: "op_mob",
            aliases: &["operamobile"],
            engine: Some(Browser::Opera),
            versions: list(&[(10, 0), (11, 0), (11, 1), (11, 5), (12, 0), (12, 1), (80, 0)]),
        },
        Agent { name: "safari", aliases: &[], engine: Some(Browser::Safari), versions: safari },
        Agent { name: "samsung", aliases: &[], engine: Some(Browser::Samsung), versions: samsung },
        // Known agents without a tracked engine: accepted, contribute nothing.
        Agent { name: "op_mini", aliases: &["operamini"], engine: None, versions: list(&[(0, 0)]) },
        Agent { name: "ie_mob", aliases: &["explorermobile"], engine: None, versions: list(&[(10, 0), (11, 0)]) },
        Agent { name: "and_uc", aliases: &["ucandroid"], engine: None, versions: list(&[(15, 5)]) },
        Agent { name: "and_qq", aliases: &["qqandroid"], engine: None, versions: list(&[(14, 9)]) },
        Agent { name: "baidu", aliases: &[], engine: None, versions: list(&[(13, 52)]) },
        Agent { name: "kaios", aliases: &[], engine: None, versions: list(&[(2, 5), (3, 0)]) },
        Agent { name: "bb", aliases: &["blackberry"], engine: None, versions: list(&[(7, 0), (10, 0)]) },
        Agent { name: "node", aliases: &[], engine: None, versions: majors(0..=23) },
    ]
}

fn find_agent(query: &str, name: &str) -> Result<usize> {
    let lower = name.to_ascii_lowercase();
    AGENTS
        .iter()
        .position(|agent| agent.name == lower || agent.aliases.contains(&lower.as_str()))
        .ok_or_else(|| CssError::query(query, format!("Unknown browser '{}'", name)))
}

fn usage_of(agent: &Agent, version: Version) -> f32 {
    USAGE
        .iter()
        .find(|(name, major, minor, _)| {
            *name == agent.name && Version::new(*major, *minor, 0) == version
        })
        .map(|(_, _, _, share)| *share)
        .unwrap_or(0.0)
}

fn parse_version(query: &str, text: &str) -> Result<Version> {
    Version::parse(text).map_err(|_| CssError::query(query, format!("Invalid version '{}'", text)))
}

/// Resolve a browserslist query into a target matrix.
pub fn resolve(query: &str) -> Result<Targets> {
    let selection = evaluate(query)?;

    let mut targets = Targets::default();
    for (index, version) in selection {
        if let Some(engine) = AGENTS[index].engine {
            targets.include(engine, version);
        }
    }

    log::debug!("Resolved '{}' to {}", query, targets);
    Ok(targets)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Or,
    And,
}

/// Split a query into its parts and the combinator preceding each one.
fn split_query(query: &str) -> Vec<(Combinator, &str)> {
    let mut parts = Vec::new();
    let mut last = 0;
    let mut combinator = Combinator::Or;

    for captures in SEPARATOR.captures_iter(query) {
        let (Some(whole), keyword) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        parts.push((combinator, query[last..whole.start()].trim()));
        combinator = match keyword {
            Some(word) if word.as_str().eq_ignore_ascii_case("and") => Combinator::And,
            _ => Combinator::Or,
        };
        last = whole.end();
    }
    parts.push((combinator, query[last..].trim()));

    parts
}

fn evaluate(query: &str) -> Result<Selection> {
    let mut result = Selection::new();

    for (position, (combinator, part)) in split_query(query).into_iter().enumerate() {
        if part.is_empty() {
            return Err(CssError::query(query, "Empty query part"));
        }

        let (negated, text) = match strip_not(part) {
            Some(rest) => (true, rest),
            None => (false, part),
        };

        if negated && position == 0 {
            return Err(CssError::query(
                query,
                "A 'not' query cannot be the first one; nothing to exclude from",
            ));
        }

        let selected = evaluate_single(query, text)?;

        if negated {
            result.retain(|entry| !selected.contains(entry));
        } else {
            match combinator {
                Combinator::Or => result.extend(selected),
                Combinator::And => result.retain(|entry| selected.contains(entry)),
            }
        }
    }

    Ok(result)
}

fn strip_not(part: &str) -> Option<&str> {
    let head = part.get(..4)?;
    if head.eq_ignore_ascii_case("not ") {
        Some(part[4..].trim_start())
    } else {
        None
    }
}

fn evaluate_single(query: &str, text: &str) -> Result<Selection> {
    let lower = text.to_ascii_lowercase();

    match lower.as_str() {
        "defaults" => return evaluate(DEFAULTS_QUERY),
        "dead" => return evaluate(DEAD_QUERY),
        "firefox esr" | "ff esr" | "fx esr" => {
            let index = find_agent(query, "firefox")?;
            return Ok(FIREFOX_ESR
                .iter()
                .map(|&major| (index, Version::new(major, 0, 0)))
                .collect());
        }
        _ => {}
    }

    if let Some(captures) = UNRELEASED.captures(text) {
        if let Some(name) = captures.get(1) {
            find_agent(query, name.as_str().trim())?;
        }
        // The compiled table only lists released versions.
        return Ok(Selection::new());
    }

    if let Some(captures) = LAST_VERSIONS.captures(text) {
        let count = parse_count(query, &captures[1])?;
        let major = captures.get(2).is_some();
        let mut selection = Selection::new();
        for index in 0..AGENTS.len() {
            selection.extend(last_versions(index, count, major));
        }
        return Ok(selection);
    }

    if let Some(captures) = LAST_BROWSER_VERSIONS.captures(text) {
        let count = parse_count(query, &captures[1])?;
        let index = find_agent(query, &captures[2])?;
        return Ok(last_versions(index, count, captures.get(3).is_some()));
    }

    if let Some(captures) = POPULARITY.captures(text) {
        let threshold: f32 = captures[2]
            .parse()
            .map_err(|_| CssError::query(query, "Invalid usage percentage"))?;
        let operator = captures[1].to_string();
        return Ok(select_all(|agent, version| {
            let share = usage_of(agent, version);
            match operator.as_str() {
                ">" => share > threshold,
                ">=" => share >= threshold,
                "<" => share < threshold,
                _ => share <= threshold,
            }
        }));
    }

    if let Some(captures) = COVER.captures(text) {
        let coverage: f32 = captures[1]
            .parse()
            .map_err(|_| CssError::query(query, "Invalid coverage percentage"))?;
        return Ok(cover(coverage));
    }

    if let Some(captures) = BROWSER_RANGE.captures(text) {
        let index = find_agent(query, &captures[1])?;
        let from = parse_version(query, &captures[2])?;
        let to = parse_version(query, &captures[3])?;
        return Ok(select_agent(index, |version| version >= from && version <= to));
    }

    if let Some(captures) = BROWSER_COMPARE.captures(text) {
        let index = find_agent(query, &captures[1])?;
        let bound = parse_version(query, &captures[3])?;
        let operator = captures[2].to_string();
        return Ok(select_agent(index, |version| match operator.as_str() {
            ">" => version > bound,
            ">=" => version >= bound,
            "<" => version < bound,
            _ => version <= bound,
        }));
    }

    if let Some(captures) = BROWSER_ALL.captures(text) {
        let index = find_agent(query, &captures[1])?;
        return Ok(select_agent(index, |_| true));
    }

    if let Some(captures) = BROWSER_VERSION.captures(text) {
        let index = find_agent(query, &captures[1])?;
        let version = parse_version(query, &captures[2])?;
        let agent = &AGENTS[index];
        if agent.engine.is_some() && !agent.versions.contains(&version) {
            return Err(CssError::query(
                query,
                format!("Unknown version {} of {}", version, agent.name),
            ));
        }
        return Ok(std::iter::once((index, version)).collect());
    }

    Err(CssError::query(query, format!("Unknown browser query '{}'", text)))
}

fn parse_count(query: &str, text: &str) -> Result<usize> {
    text.parse()
        .map_err(|_| CssError::query(query, format!("Invalid count '{}'", text)))
}

fn last_versions(index: usize, count: usize, major: bool) -> Selection {
    let versions = &AGENTS[index].versions;

    if !major {
        return versions
            .iter()
            .rev()
            .take(count)
            .map(|version| (index, *version))
            .collect();
    }

    let mut majors: Vec<u8> = versions.iter().map(|v| v.major).collect();
    majors.dedup();
    let keep: Vec<u8> = majors.into_iter().rev().take(count).collect();

    versions
        .iter()
        .filter(|version| keep.contains(&version.major))
        .map(|version| (index, *version))
        .collect()
}

fn select_agent(index: usize, predicate: impl Fn(Version) -> bool) -> Selection {
    AGENTS[index]
        .versions
        .iter()
        .filter(|version| predicate(**version))
        .map(|version| (index, *version))
        .collect()
}

fn select_all(predicate: impl Fn(&Agent, Version) -> bool) -> Selection {
    let mut selection = Selection::new();
    for (index, agent) in AGENTS.iter().enumerate() {
        for version in &agent.versions {
            if predicate(agent, *version) {
                selection.insert((index, *version));
            }
        }
    }
    selection
}

/// Most popular versions until their combined share reaches `coverage`.
fn cover(coverage: f32) -> Selection {
    let mut ranked: Vec<(f32, usize, Version)> = Vec::new();
    for (index, agent) in AGENTS.iter().enumerate() {
        for version in &agent.versions {
            let share = usage_of(agent, *version);
            if share > 0.0 {
                ranked.push((share, index, *version));
            }
        }
    }
    // Stable tie-break on (agent, version) keeps the result deterministic.
    ranked.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then((a.1, a.2).cmp(&(b.1, b.2)))
    });

    let mut total = 0.0;
    let mut selection = Selection::new();
    for (share, index, version) in ranked {
        if total >= coverage {
            break;
        }
        total += share;
        selection.insert((index, version));
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_comparison() {
        let targets = resolve("safari >= 15, chrome > 100").unwrap();
        assert_eq!(targets.safari, Some(Version::new(15, 0, 0)));
        assert_eq!(targets.chrome, Some(Version::new(101, 0, 0)));
        assert!(targets.firefox.is_none());
    }

    #[test]
    fn test_last_versions_excluding_ie() {
        let targets = resolve("last 2 versions, not IE <= 11").unwrap();
        assert!(targets.ie.is_none());
        assert_eq!(targets.chrome, Some(Version::new(129, 0, 0)));
        assert_eq!(targets.firefox, Some(Version::new(131, 0, 0)));
        assert_eq!(targets.safari, Some(Version::new(18, 0, 0)));
        // op_mob feeds the opera engine.
        assert_eq!(targets.opera, Some(Version::new(12, 1, 0)));
    }

    #[test]
    fn test_last_major_versions() {
        let targets = resolve("last 2 safari major versions").unwrap();
        assert_eq!(targets.safari, Some(Version::new(17, 0, 0)));
    }

    #[test]
    fn test_and_intersects() {
        let targets = resolve("> 0.5% and chrome > 120").unwrap();
        assert_eq!(targets.chrome, Some(Version::new(127, 0, 0)));
        assert!(targets.safari.is_none());
    }

    #[test]
    fn test_range_and_exact_versions() {
        let targets = resolve("firefox 100-110, ie 11").unwrap();
        assert_eq!(targets.firefox, Some(Version::new(100, 0, 0)));
        assert_eq!(targets.ie, Some(Version::new(11, 0, 0)));
    }

    #[test]
    fn test_defaults_and_esr() {
        let targets = resolve("defaults").unwrap();
        assert!(targets.ie.is_none());
        assert_eq!(targets.firefox, Some(Version::new(115, 0, 0)));

        let esr = resolve("Firefox ESR").unwrap();
        assert_eq!(esr.firefox, Some(Version::new(115, 0, 0)));
    }

    #[test]
    fn test_untracked_browsers_contribute_nothing() {
        let targets = resolve("op_mini all, node 18").unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_unreleased_versions_is_empty() {
        let targets = resolve("unreleased versions").unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_invalid_queries() {
        assert!(matches!(resolve("not a real browser"), Err(CssError::Query { .. })));
        assert!(matches!(resolve("netscape 4"), Err(CssError::Query { .. })));
        assert!(matches!(resolve("chrome 9999.1"), Err(CssError::Query { .. })));
        assert!(matches!(resolve("last 2 versions,"), Err(CssError::Query { .. })));
    }

    #[test]
    fn test_resolution_is_pure() {
        let query = "last 2 versions, not IE <= 11";
        assert_eq!(resolve(query).unwrap(), resolve(query).unwrap());
    }

    #[test]
    fn test_cover() {
        let targets = resolve("cover 40%").unwrap();
        assert_eq!(targets.chrome, Some(Version::new(130, 0, 0)));
        assert!(targets.firefox.is_none());
    }
}
