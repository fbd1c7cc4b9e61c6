//! Text cleanup applied to raw playlist text before parsing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Trailing "filmleri"/"filmler" on category names ("Aksiyon Filmleri" -> "aksiyon")
    static ref FILM_SUFFIX: Regex = Regex::new(r"\s+filmleri?\b").unwrap();
}

/// Map a single character to its cleaned form.
/// `None` drops the character.
fn clean_char(c: char) -> Option<char> {
    match c {
        '\n' => Some('\n'),
        '\t' => Some(' '),
        c if (c as u32) < 0x20 || c == '\u{7f}' => None,
        // BOM and zero-width characters
        '\u{feff}' | '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}' => None,
        '\u{a0}' | '\u{202f}' | '\u{2007}' => Some(' '),
        '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\u{2033}' | '\u{ff02}' => Some('"'),
        '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' | '\u{2032}' => Some('\''),
        '\u{2013}' | '\u{2014}' | '\u{2012}' | '\u{2015}' | '\u{2212}' => Some('-'),
        '\u{ff06}' => Some('&'),
        c => Some(c),
    }
}

/// Clean one line: map characters, collapse runs of spaces, trim edges.
fn normalize_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last_space = false;

    for c in line.chars().filter_map(clean_char) {
        if c == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }

    out.trim().to_string()
}

/// Normalize raw playlist text.
///
/// Strips control characters (keeping newlines), replaces non-breaking
/// spaces, maps typographic quotes/dashes and the full-width ampersand to
/// their ASCII forms, collapses space runs and trims every line.
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    raw.split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase with Turkish letters folded to ASCII ("DİZİ" -> "dizi")
pub fn fold_turkish(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            'İ' | 'I' | 'ı' => vec!['i'],
            'Ç' | 'ç' => vec!['c'],
            'Ğ' | 'ğ' => vec!['g'],
            'Ö' | 'ö' => vec!['o'],
            'Ş' | 'ş' => vec!['s'],
            'Ü' | 'ü' => vec!['u'],
            c => c.to_lowercase().collect(),
        })
        .collect()
}

/// Key used to compare category and series names loosely.
///
/// Folds with [`fold_turkish`], drops a trailing "filmleri"/"filmler" and
/// collapses whitespace.
pub fn fold_key(s: &str) -> String {
    let lowered = fold_turkish(s);
    let without_suffix = FILM_SUFFIX.replace_all(&lowered, "");
    without_suffix.split_whitespace().collect::<Vec<_>>().join(" ")
}
