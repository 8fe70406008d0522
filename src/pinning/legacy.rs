// src/pinning/legacy.rs

//! Legacy build-string prefixes.
//!
//! Older builds carry interpreter/library tags at the start of the build
//! string (`py38`, `np116`, `pl526`, ...). Renders done without a resolved
//! environment do not reproduce them, so an existing build
//! `py38h1a2b3c4_0` has to compare equal to a rendered `h1a2b3c4_0` unless
//! the variant really depends on the tagged package at build time.

use std::sync::LazyLock;

use regex::Regex;

/// A recognised prefix tag and the dependency that makes it load-bearing.
#[derive(Debug)]
pub struct LegacyTag {
    /// Dependency name, `-` folded to `_`.
    pub dependency: &'static str,
    /// Literal tag text before the version digits.
    pub tag: &'static str,
    /// Number of version components folded into the digits.
    pub components: usize,
    pattern: Regex,
}

impl LegacyTag {
    fn new(dependency: &'static str, tag: &'static str, min_digits: usize) -> Self {
        let pattern = Regex::new(&format!("^{tag}[0-9]{{{min_digits},9}}"))
            .expect("legacy tag patterns are built from fixed literals");
        Self {
            dependency,
            tag,
            components: min_digits,
            pattern,
        }
    }

    /// Tag text for a pinned version, e.g. `python 3.8.5` -> `py38`.
    pub fn render(&self, version: &str) -> Option<String> {
        let digits: String = version
            .split('.')
            .take(self.components)
            .map(|part| part.chars().filter(char::is_ascii_digit).collect::<String>())
            .collect();
        if digits.len() < self.components {
            return None;
        }
        Some(format!("{}{}", self.tag, digits))
    }
}

/// Tags in the order they are tried at each position.
pub static LEGACY_TAGS: LazyLock<Vec<LegacyTag>> = LazyLock::new(|| {
    vec![
        LegacyTag::new("numpy", "np", 2),
        LegacyTag::new("python", "py", 2),
        LegacyTag::new("perl", "pl", 2),
        LegacyTag::new("lua", "lua", 2),
        LegacyTag::new("r_base", "r", 2),
        LegacyTag::new("mro_base", "mro", 3),
    ]
});

/// Split the run of recognised tags at the start of `build_string`.
///
/// Returns `(tag, matched text)` pairs in order of appearance plus the rest
/// of the string.
pub fn split_legacy_prefix(build_string: &str) -> (Vec<(&'static LegacyTag, &str)>, &str) {
    let mut found = Vec::new();
    let mut rest = build_string;

    'outer: loop {
        for tag in LEGACY_TAGS.iter() {
            if let Some(m) = tag.pattern.find(rest) {
                found.push((tag, m.as_str()));
                rest = &rest[m.end()..];
                continue 'outer;
            }
        }
        break;
    }

    (found, rest)
}

/// Strip tags whose dependency is not among `build_deps`, then drop one
/// leading `_`.
///
/// `build_deps` are the build + host requirement names with `-` folded to
/// `_`.
pub fn normalize_build_string<S: AsRef<str>>(candidate: &str, build_deps: &[S]) -> String {
    let (tags, rest) = split_legacy_prefix(candidate);

    let mut trimmed: String = tags
        .into_iter()
        .filter(|(tag, _)| build_deps.iter().any(|d| d.as_ref() == tag.dependency))
        .map(|(_, text)| text)
        .collect();
    trimmed.push_str(rest);

    match trimmed.strip_prefix('_') {
        Some(stripped) => stripped.to_string(),
        None => trimmed,
    }
}

/// True if `candidate` equals `own` after legacy normalisation.
pub fn legacy_equivalent<S: AsRef<str>>(candidate: &str, own: &str, build_deps: &[S]) -> bool {
    normalize_build_string(candidate, build_deps) == own
}
