//! Extraction of sig (special interest group) tags from labels and test names.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn label_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sig/([a-zA-Z][a-zA-Z-]*)").expect("valid sig label pattern"))
}

fn test_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sig-[a-zA-Z]+").expect("valid sig test pattern"))
}

/// Sig of the first label that carries one, display-cased.
///
/// `sig/node` becomes `Node`, `sig/api-machinery` becomes `Api-Machinery`,
/// `sig/cli` becomes `CLI` and `sig/cluster-lifecycle` stays lower case.
pub fn sig_from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<String> {
    labels.into_iter().find_map(sig_from_label)
}

pub fn sig_from_label(label: &str) -> Option<String> {
    let name = label_pattern().captures(label)?.get(1)?.as_str();
    Some(display_case(name))
}

fn display_case(name: &str) -> String {
    if name.eq_ignore_ascii_case("cli") {
        return name.to_ascii_uppercase();
    }
    if name.eq_ignore_ascii_case("cluster-lifecycle") {
        return name.to_ascii_lowercase();
    }
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Every distinct `sig-<name>` mentioned across the given test names.
pub fn sigs_from_test_names<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    names
        .into_iter()
        .flat_map(|name| test_name_pattern().find_iter(name))
        .map(|m| m.as_str().to_string())
        .collect()
}
