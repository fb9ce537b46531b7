//! Pure string transforms shared by slug derivation and metadata synthesis.
//!
//! Ghost titles and slugs arrive as arbitrary user-authored Unicode. Before
//! anything becomes a filename or URL it goes through some combination of
//! these transforms:
//!
//! | Transform | Example |
//! |-----------|---------|
//! | [`normalize_diacritics`] | `Grüße, Café` → `Gruesse, Cafe` |
//! | [`remove_pictographs`] | `Notes ☕🚀` → `Notes ` |
//! | [`normalize_dashes`] | `2019–2020` → `2019-2020` |
//! | [`strip_leading_hex_chains`] | `f0-9f-93-9a-my-post` → `my-post` |
//!
//! None of them allocate more than one output string and none can fail.

use regex::Regex;
use std::sync::LazyLock;

/// Two or more `hh-` groups at the start of a legacy slug.
///
/// Older Ghost versions percent-encoded emoji in titles and then replaced the
/// `%` signs with dashes, leaving byte chains such as `f0-9f-93-9a-` in front
/// of the readable part.
static LEADING_HEX_CHAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[0-9a-f]{2}(?:-|$)){2,}").expect("hex chain regex should compile")
});

/// ASCII replacement for a character, if the table knows one.
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'ä' => "ae",
        'ö' => "oe",
        'ü' => "ue",
        'Ä' => "Ae",
        'Ö' => "Oe",
        'Ü' => "Ue",
        'ß' => "ss",
        'ẞ' => "SS",
        'æ' => "ae",
        'Æ' => "Ae",
        'œ' => "oe",
        'Œ' => "Oe",
        'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Å' | 'Ā' | 'Ą' => "A",
        'ç' | 'ć' | 'č' => "c",
        'Ç' | 'Ć' | 'Č' => "C",
        'ď' | 'đ' | 'ð' => "d",
        'Ď' | 'Đ' | 'Ð' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'ğ' => "g",
        'Ğ' => "G",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'İ' => "I",
        'ł' => "l",
        'Ł' => "L",
        'ñ' | 'ń' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' | 'Ō' | 'Ő' => "O",
        'ř' => "r",
        'Ř' => "R",
        'ś' | 'š' | 'ş' => "s",
        'Ś' | 'Š' | 'Ş' => "S",
        'ť' | 'ţ' => "t",
        'Ť' | 'Ţ' => "T",
        'ù' | 'ú' | 'û' | 'ū' | 'ů' | 'ű' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ū' | 'Ů' | 'Ű' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'þ' => "th",
        'Þ' => "Th",
        _ => return None,
    };
    Some(folded)
}

/// Replace accented letters and ligatures with their ASCII spelling.
///
/// German umlauts become digraphs (`ü` → `ue`) rather than losing their
/// diaeresis, which is how German speakers transliterate them.
pub fn normalize_diacritics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match fold_char(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

fn is_pictograph(c: char) -> bool {
    matches!(
        c as u32,
        0x200D
            | 0x20E3
            | 0x2190..=0x21FF
            | 0x2300..=0x23FF
            | 0x2460..=0x24FF
            | 0x25A0..=0x27BF
            | 0x2900..=0x297F
            | 0x2B00..=0x2BFF
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0xFE00..=0xFE0F
            // Everything outside the BMP: emoji, flags, tag sequences.
            | 0x10000..
    )
}

/// Delete emoji, pictographs and decorative symbols.
pub fn remove_pictographs(text: &str) -> String {
    text.chars().filter(|&c| !is_pictograph(c)).collect()
}

/// Map every Unicode dash and hyphen variant to ASCII `-`.
pub fn normalize_dashes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{00AD}'
            | '\u{2010}'..='\u{2015}'
            | '\u{2212}'
            | '\u{2E3A}'
            | '\u{2E3B}'
            | '\u{FE58}'
            | '\u{FE63}'
            | '\u{FF0D}' => '-',
            other => other,
        })
        .collect()
}

/// Remove leading hex byte chains left over from legacy slug encoders.
///
/// Stripping repeats until the text no longer starts with a chain, and
/// separators exposed at the edges are trimmed.
pub fn strip_leading_hex_chains(text: &str) -> String {
    let mut current = text.trim().trim_matches('-').to_string();
    loop {
        let stripped = LEADING_HEX_CHAIN.replace(&current, "");
        if stripped.len() == current.len() {
            return current;
        }
        current = stripped.trim_matches('-').to_string();
    }
}
