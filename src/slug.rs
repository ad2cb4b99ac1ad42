//! Slug derivation and validation.
//!
//! Titles are transliterated from Russian Cyrillic to Latin, lowercased, and
//! reduced to ASCII word characters joined by single hyphens.

use crate::entity::MAX_SLUG_LENGTH;

/// Convert arbitrary text into a URL-safe slug.
///
/// Word characters (`a-z`, `0-9`, `_`) are kept, whitespace and hyphen runs
/// collapse to one `-`, everything else is dropped. Leading and trailing
/// separators are trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
            continue;
        }

        let piece = match transliterate(ch) {
            Some(latin) => latin,
            None if ch.is_ascii_alphanumeric() || ch == '_' => {
                push_piece(&mut slug, &mut pending_separator, ch.encode_utf8(&mut [0; 4]));
                continue;
            }
            None => continue,
        };
        push_piece(&mut slug, &mut pending_separator, piece);
    }

    slug
}

/// Slug used when a note is saved without one: the slugified title, cut to
/// the maximum slug length.
pub fn derive_slug(title: &str) -> String {
    let mut slug = slugify(title);
    // slugify only emits ASCII, so byte truncation is char-safe
    slug.truncate(MAX_SLUG_LENGTH);
    slug
}

/// True when `slug` is non-empty and made only of ASCII letters, digits,
/// underscores or hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn push_piece(slug: &mut String, pending_separator: &mut bool, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if *pending_separator && !slug.is_empty() {
        slug.push('-');
    }
    *pending_separator = false;
    slug.push_str(piece);
}

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "ju",
        'я' => "ja",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_cyrillic_title() {
        assert_eq!(slugify("Заголовок"), "zagolovok");
        assert_eq!(slugify("Лев Толстой"), "lev-tolstoj");
        assert_eq!(slugify("Щука и ёж"), "schuka-i-yozh");
    }

    #[test]
    fn test_slugify_ascii() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("snake_case-and--dashes"), "snake_case-and-dashes");
        assert_eq!(slugify("Note 42"), "note-42");
    }

    #[test]
    fn test_slugify_drops_soft_and_hard_signs() {
        assert_eq!(slugify("объём"), "obyom");
        assert_eq!(slugify("Читатель"), "chitatel");
    }

    #[test]
    fn test_slugify_empty_and_symbols_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_derive_slug_truncates() {
        let title = "a".repeat(150);
        assert_eq!(derive_slug(&title).len(), MAX_SLUG_LENGTH);
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("slug_1-ok"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("has space"));
        assert!(!is_valid_slug("заметка"));
        assert!(!is_valid_slug("a/b"));
    }
}
