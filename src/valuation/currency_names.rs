//! Currency shorthand codes and their canonical names

use std::collections::HashMap;

/// Unit every sale is ultimately valued in
pub const CANONICAL_CURRENCY: &str = "Chaos Orb";

/// Note shorthand accepted by the trade site, lowercase
pub const STANDARD_CODES: [(&str, &str); 16] = [
    ("alch", "Orb of Alchemy"),
    ("alt", "Orb of Alteration"),
    ("blessed", "Blessed Orb"),
    ("chance", "Orb of Chance"),
    ("chaos", "Chaos Orb"),
    ("chisel", "Cartographer's Chisel"),
    ("chrom", "Chromatic Orb"),
    ("divine", "Divine Orb"),
    ("exa", "Exalted Orb"),
    ("fuse", "Orb of Fusing"),
    ("gcp", "Gemcutter's Prism"),
    ("jew", "Jeweller's Orb"),
    ("regal", "Regal Orb"),
    ("regret", "Orb of Regret"),
    ("scour", "Orb of Scouring"),
    ("vaal", "Vaal Orb"),
];

/// Maps note tokens to canonical currency names
///
/// Lookups are case-insensitive. Learned names (full currency names seen
/// in the summary table) are consulted only after the standard codes.
#[derive(Debug, Clone)]
pub struct CurrencyCatalog {
    codes: HashMap<String, String>,
    learned: HashMap<String, String>,
}

impl Default for CurrencyCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl CurrencyCatalog {
    pub fn standard() -> Self {
        let codes = STANDARD_CODES
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();
        Self {
            codes,
            learned: HashMap::new(),
        }
    }

    pub fn lookup(&self, token: &str) -> Option<&str> {
        let key = token.to_lowercase();
        self.codes
            .get(&key)
            .or_else(|| self.learned.get(&key))
            .map(String::as_str)
    }

    pub fn has_learned(&self) -> bool {
        !self.learned.is_empty()
    }

    /// Register spellings of full currency names
    ///
    /// "Orb of Alteration" answers to "orb of alteration",
    /// "orb-of-alteration"; "Cartographer's Chisel" additionally to
    /// "cartographers-chisel". Standard codes are never shadowed.
    /// Returns how many new aliases were added.
    pub fn learn_names<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for name in names {
            let name = name.as_ref();
            let lower = name.to_lowercase();
            let dashed = lower.replace(' ', "-");
            let bare = dashed.replace('\'', "");

            for alias in [lower, dashed, bare] {
                if self.codes.contains_key(&alias) || self.learned.contains_key(&alias) {
                    continue;
                }
                self.learned.insert(alias, name.to_string());
                added += 1;
            }
        }
        added
    }
}
