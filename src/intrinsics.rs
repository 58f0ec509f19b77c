/// Whitelist of effect-producing primitives.
///
/// A call to one of these names is an intrinsic effect leaf: the calling
/// function performs an effect directly. The set is data, handed to the
/// call-graph builder through [`crate::config::AnalyzerConfig`], so the same
/// checker can be pointed at a different primitive list.
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectCategory {
    Io,
    Mutation,
    Random,
    Clock,
}

impl EffectCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectCategory::Io => "io",
            EffectCategory::Mutation => "mutation",
            EffectCategory::Random => "random",
            EffectCategory::Clock => "clock",
        }
    }
}

impl fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const IO: &[&str] = &[
    "print",
    "println",
    "eprint",
    "read_line",
    "read_file",
    "write_file",
    "http_get",
    "http_post",
];
const MUTATION: &[&str] = &["set_global", "swap_global"];
const RANDOM: &[&str] = &["random", "random_int"];
const CLOCK: &[&str] = &["read_clock", "now", "sleep"];

/// Ordered name → category map. Iteration follows insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntrinsicSet {
    entries: IndexMap<String, EffectCategory>,
}

impl IntrinsicSet {
    pub fn empty() -> Self {
        IntrinsicSet {
            entries: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: &str, category: EffectCategory) -> Self {
        self.insert(name, category);
        self
    }

    pub fn insert(&mut self, name: &str, category: EffectCategory) {
        self.entries.insert(name.to_string(), category);
    }

    pub fn category(&self, name: &str) -> Option<EffectCategory> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, EffectCategory)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for IntrinsicSet {
    fn default() -> Self {
        let mut set = IntrinsicSet::empty();
        let tables = [
            (IO, EffectCategory::Io),
            (MUTATION, EffectCategory::Mutation),
            (RANDOM, EffectCategory::Random),
            (CLOCK, EffectCategory::Clock),
        ];
        for (names, category) in tables {
            for name in names {
                set.insert(name, category);
            }
        }
        set
    }
}

impl FromIterator<(String, EffectCategory)> for IntrinsicSet {
    fn from_iter<I: IntoIterator<Item = (String, EffectCategory)>>(iter: I) -> Self {
        IntrinsicSet {
            entries: iter.into_iter().collect(),
        }
    }
}
