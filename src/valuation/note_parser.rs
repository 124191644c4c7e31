//! Price note parsing
//!
//! Notes look like `~price 2/3 chaos` or `~b/o 5 exa`. The first
//! `~price` / `~b/o` marker that is followed by whitespace, an amount
//! token, a single space and a currency token wins; anything after it is
//! ignored.

use super::currency_names::CurrencyCatalog;
use crate::types::ParsedPrice;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenStyle {
    /// Letters, digits and '_'
    Word,
    /// Word characters plus '-' and '\'', for learned full names
    Extended,
}

impl TokenStyle {
    fn accepts(self, c: char) -> bool {
        let word = c.is_alphanumeric() || c == '_';
        match self {
            TokenStyle::Word => word,
            TokenStyle::Extended => word || c == '-' || c == '\'',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PriceMarker<'a> {
    amount: &'a str,
    currency: &'a str,
    /// Everything after the space that follows the amount
    tail: &'a str,
}

fn marker_at(rest: &str, style: TokenStyle) -> Option<PriceMarker<'_>> {
    let rest = ["price", "b/o"]
        .iter()
        .find_map(|keyword| rest.strip_prefix(keyword))?;

    let spaced = rest.trim_start();
    if spaced.len() == rest.len() {
        return None;
    }

    let amount_end = spaced.find(char::is_whitespace).unwrap_or(spaced.len());
    if amount_end == 0 {
        return None;
    }
    let amount = &spaced[..amount_end];

    let tail = spaced[amount_end..].strip_prefix(' ')?;
    let currency_end = tail.find(|c: char| !style.accepts(c)).unwrap_or(tail.len());
    if currency_end == 0 {
        return None;
    }

    Some(PriceMarker {
        amount,
        currency: &tail[..currency_end],
        tail,
    })
}

fn find_marker(note: &str, style: TokenStyle) -> Option<PriceMarker<'_>> {
    note.match_indices('~')
        .find_map(|(start, _)| marker_at(&note[start + 1..], style))
}

/// Currency phrases at the start of `tail`, longest first
///
/// A phrase is a run of extended tokens joined by single spaces; it ends
/// at the first character that is neither.
fn phrase_candidates(tail: &str) -> Vec<&str> {
    let mut ends = Vec::new();
    let mut offset = 0;
    for word in tail.split(' ') {
        let len = word
            .find(|c: char| !TokenStyle::Extended.accepts(c))
            .unwrap_or(word.len());
        if len == 0 {
            break;
        }
        ends.push(offset + len);
        if len < word.len() {
            break;
        }
        offset += word.len() + 1;
    }
    ends.into_iter().rev().map(|end| &tail[..end]).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmountError {
    NotNumeric(String),
    ZeroDenominator,
    NotFinite,
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::NotNumeric(token) => write!(f, "not a number: {:?}", token),
            AmountError::ZeroDenominator => write!(f, "fraction with zero denominator"),
            AmountError::NotFinite => write!(f, "amount is not finite"),
        }
    }
}

impl std::error::Error for AmountError {}

fn parse_number(token: &str) -> Result<f64, AmountError> {
    token
        .parse::<f64>()
        .map_err(|_| AmountError::NotNumeric(token.to_string()))
}

/// Parse a decimal or `numerator/denominator` amount
pub fn parse_amount(token: &str) -> Result<f64, AmountError> {
    let value = match token.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator = parse_number(numerator)?;
            let denominator = parse_number(denominator)?;
            if denominator == 0.0 {
                return Err(AmountError::ZeroDenominator);
            }
            numerator / denominator
        }
        None => parse_number(token)?,
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(AmountError::NotFinite)
    }
}

/// Turns listing notes into prices in canonical currency names
#[derive(Debug, Clone, Default)]
pub struct NoteParser {
    catalog: CurrencyCatalog,
}

impl NoteParser {
    pub fn new(catalog: CurrencyCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CurrencyCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CurrencyCatalog {
        &mut self.catalog
    }

    /// Extract the price from `note`
    ///
    /// Returns `None` for a missing note, a note without a price marker,
    /// a malformed amount, or an unrecognized currency token.
    pub fn parse(&self, note: Option<&str>) -> Option<ParsedPrice> {
        let note = note?;
        let marker = find_marker(note, TokenStyle::Word)?;

        let amount = match parse_amount(marker.amount) {
            Ok(amount) => amount,
            Err(e) => {
                log::debug!("Invalid price amount in {:?}: {}", note, e);
                return None;
            }
        };

        if let Some(currency) = self.catalog.lookup(marker.currency) {
            return Some(ParsedPrice {
                amount,
                currency: currency.to_string(),
            });
        }

        // Learned names may contain spaces, '-' or '\'' which end a word
        // token early
        if self.catalog.has_learned() {
            let learned = find_marker(note, TokenStyle::Extended)
                .filter(|extended| extended.amount == marker.amount)
                .and_then(|extended| {
                    phrase_candidates(extended.tail)
                        .into_iter()
                        .find_map(|phrase| self.catalog.lookup(phrase))
                });
            if let Some(currency) = learned {
                return Some(ParsedPrice {
                    amount,
                    currency: currency.to_string(),
                });
            }
        }

        log::debug!("Unknown currency {:?} in note {:?}", marker.currency, note);
        None
    }
}
