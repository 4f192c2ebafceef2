// src/normalize.rs

use serde::{Deserialize, Serialize};

/// Canonical "not found" marker. Distinct from the empty string so that two
/// absent fields never compare equal by accident.
pub const SENTINEL: &str = "notfound";

/// How aggressively a captured value is canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Keep letters and digits only, case folded. For identifiers such as contract
    /// numbers, SWIFT codes or e-mail addresses.
    #[default]
    Strict,
    /// Punctuation becomes whitespace, runs of whitespace collapse to one
    /// space. Word boundaries survive, so substring comparison stays meaningful.
    Loose,
    /// Keep ASCII digits and the decimal point. For weights and amounts.
    Numeric,
}

/// Canonicalize `text` for comparison. Returns [`SENTINEL`] when nothing
/// comparable is left.
pub fn normalize(text: &str, mode: NormalizeMode) -> String {
    let out = match mode {
        // Lowercase first: some capitals expand into a letter plus a combining
        // mark, which the filter then drops.
        NormalizeMode::Strict => text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() && !is_combining_mark(*c))
            .collect::<String>(),
        NormalizeMode::Loose => {
            let spaced: String = text
                .to_lowercase()
                .chars()
                .filter(|c| !is_combining_mark(*c))
                .map(|c| if c.is_alphanumeric() { c } else { ' ' })
                .collect();
            spaced.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        NormalizeMode::Numeric => digits_only(text),
    };

    if out.is_empty() {
        SENTINEL.to_string()
    } else {
        out
    }
}

/// Combining Diacritical Marks block, e.g. the dot `İ` leaves behind after
/// lowercasing.
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Keep only ASCII digits and `.`.
pub fn digits_only(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

pub fn is_sentinel(value: &str) -> bool {
    value == SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_drops_punctuation_and_case() {
        assert_eq!(normalize("AGR-2024/001", NormalizeMode::Strict), "agr2024001");
        assert_eq!(normalize("  HDFC0001 ", NormalizeMode::Strict), "hdfc0001");
    }

    #[test]
    fn loose_keeps_word_boundaries() {
        assert_eq!(
            normalize("  Mumbai Port,\n  INDIA.  ", NormalizeMode::Loose),
            "mumbai port india"
        );
        assert_eq!(
            normalize("Nhava-Sheva\t(JNPT)", NormalizeMode::Loose),
            "nhava sheva jnpt"
        );
    }

    #[test]
    fn non_ascii_letters_survive() {
        assert_eq!(normalize("شركة الخليج", NormalizeMode::Loose), "شركة الخليج");
        assert_eq!(normalize("ООО «Альфа»", NormalizeMode::Loose), "ооо альфа");
        assert_eq!(
            normalize("Société Générale", NormalizeMode::Strict),
            "sociétégénérale"
        );
    }

    #[test]
    fn dotted_capital_i_is_stable() {
        let once = normalize("İSTANBUL", NormalizeMode::Strict);
        assert_eq!(once, "istanbul");
        assert_eq!(normalize(&once, NormalizeMode::Strict), once);
        let loose = normalize("İzmir Port", NormalizeMode::Loose);
        assert_eq!(loose, "izmir port");
        assert_eq!(normalize(&loose, NormalizeMode::Loose), loose);
    }

    #[test]
    fn numeric_keeps_decimal_point() {
        assert_eq!(normalize("1,250.50 MT", NormalizeMode::Numeric), "1250.50");
        assert_eq!(digits_only("1234-5678"), "12345678");
    }

    #[test]
    fn empty_input_is_sentinel() {
        for mode in [NormalizeMode::Strict, NormalizeMode::Loose, NormalizeMode::Numeric] {
            assert_eq!(normalize("", mode), SENTINEL);
            assert_eq!(normalize("   \n\t", mode), SENTINEL);
        }
        assert_eq!(normalize("---", NormalizeMode::Strict), SENTINEL);
        assert_eq!(normalize("kg", NormalizeMode::Numeric), SENTINEL);
    }

    #[test]
    fn sentinel_is_a_fixed_point() {
        assert_eq!(normalize(SENTINEL, NormalizeMode::Strict), SENTINEL);
        assert_eq!(normalize(SENTINEL, NormalizeMode::Loose), SENTINEL);
        assert!(is_sentinel(&normalize("", NormalizeMode::Loose)));
    }
}
