// src/domain/states.rs

use crate::geos::{state_name_for_abbr, REGIONS, US_STATES};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Sentinel returned instead of a state list when a recall went everywhere.
pub const NATIONWIDE: &str = "Nationwide";

const NATIONWIDE_PHRASES: [&str; 5] = [
    "nationwide",
    "nation wide",
    "all states",
    "throughout the united states",
    "all 50 states",
];

/// Only consulted when nothing more specific was found.
const USA_WIDE_PHRASES: [&str; 12] = [
    "throughout the usa",
    "throughout the u.s.",
    "throughout the us",
    "across the united states",
    "across the usa",
    "across the u.s.",
    "distributed in the united states",
    "distributed in the usa",
    "distributed in the u.s.",
    "distributed to the united states",
    "domestic distribution",
    "distributed domestically",
];

struct NamedPattern {
    name: &'static str,
    re: Regex,
}

/// Whitespace-tolerant pattern for a lowercase phrase.
fn phrase_body(phrase: &str) -> String {
    regex::escape(&phrase.to_lowercase()).replace(' ', r"\s+")
}

fn word_pattern(phrase: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", phrase_body(phrase))).expect("static phrase compiles")
}

fn substring_pattern(phrase: &str) -> Regex {
    Regex::new(&phrase_body(phrase)).expect("static phrase compiles")
}

// Longest first so "west virginia" is claimed before "virginia" can see it.
static STATE_NAMES: LazyLock<Vec<NamedPattern>> = LazyLock::new(|| {
    let mut names: Vec<&'static str> = US_STATES.iter().map(|(_, name)| *name).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names
        .into_iter()
        .map(|name| NamedPattern {
            name,
            re: word_pattern(name),
        })
        .collect()
});

// "west virginia", "south dakota" and friends, masked out before regions run.
static STATES_WITH_REGION_WORDS: LazyLock<Vec<&'static NamedPattern>> = LazyLock::new(|| {
    STATE_NAMES
        .iter()
        .filter(|state| {
            let lowered = state.name.to_lowercase();
            REGIONS.iter().any(|(region, _)| lowered.contains(region))
        })
        .collect()
});

// Substring matches, so "midwestern" counts. Same ordering rule: "west coast"
// and "midwest" must claim their text before "west" sees it.
static REGION_NAMES: LazyLock<Vec<(NamedPattern, &'static [&'static str])>> =
    LazyLock::new(|| {
        let mut regions = REGIONS.to_vec();
        regions.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
        regions
            .into_iter()
            .map(|(name, members)| {
                (
                    NamedPattern {
                        name,
                        re: substring_pattern(name),
                    },
                    members,
                )
            })
            .collect()
    });

// Upper-case only, so prose like "in" or "or" never reads as IN / OR.
static ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s,;])([A-Z]{2})(?:[\s,;.]|$)").expect("static pattern compiles")
});

/// Maps a free-text distribution pattern to canonical region identifiers.
///
/// The result is sorted and deduplicated. If the text describes nationwide
/// distribution the result is exactly `["Nationwide"]`. Text with no
/// recognisable location yields an empty list; this never fails.
pub fn resolve_affected_states(pattern: &str) -> Vec<String> {
    if pattern.trim().is_empty() {
        return Vec::new();
    }

    let lowered = pattern.to_lowercase();
    if NATIONWIDE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return vec![NATIONWIDE.to_string()];
    }

    let mut found: BTreeSet<&'static str> = BTreeSet::new();

    // Matched spans are blanked so shorter names can't re-match them.
    let mut region_text = lowered.clone();
    for state in STATES_WITH_REGION_WORDS.iter() {
        claim_matches(&state.re, &mut region_text);
    }
    for (region, members) in REGION_NAMES.iter() {
        if claim_matches(&region.re, &mut region_text) {
            found.extend(members.iter().copied());
        }
    }

    let mut remaining = lowered.clone();
    for state in STATE_NAMES.iter() {
        if claim_matches(&state.re, &mut remaining) {
            found.insert(state.name);
        }
    }

    // Runs on the original text; case is what separates "IN" from "in".
    let mut pos = 0;
    while let Some(caps) = ABBREVIATION.captures_at(pattern, pos) {
        let Some(token) = caps.get(1) else { break };
        if let Some(name) = state_name_for_abbr(token.as_str()) {
            found.insert(name);
        }
        // Resume at the token end so its trailing delimiter can lead the next one.
        pos = token.end();
    }

    if found.is_empty() && USA_WIDE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return vec![NATIONWIDE.to_string()];
    }

    found.into_iter().map(str::to_string).collect()
}

/// Blanks every match of `re` in `text`, returning whether anything matched.
fn claim_matches(re: &Regex, text: &mut String) -> bool {
    let spans: Vec<(usize, usize)> = re.find_iter(text).map(|m| (m.start(), m.end())).collect();
    if spans.is_empty() {
        return false;
    }
    for (start, end) in spans {
        text.replace_range(start..end, &" ".repeat(end - start));
    }
    true
}
