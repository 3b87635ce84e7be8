use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Comparison key for topic names: lowercase, whitespace-collapsed, with
/// German umlauts expanded and other diacritics stripped. Precomposed and
/// decomposed spellings fold to the same key.
pub fn fold_token(input: &str) -> String {
    let composed: String = normalize_whitespace(input).to_lowercase().nfc().collect();
    let mut expanded = String::with_capacity(composed.len());
    for ch in composed.chars() {
        match expand_char(ch) {
            Some(replacement) => expanded.push_str(replacement),
            None => expanded.push(ch),
        }
    }
    expanded
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

/// Like [`fold_token`] but keeps only ASCII letters and digits, so that
/// `sub_topics`, `subTopics` and `Sub Topics` compare equal.
pub fn fold_key_token(input: &str) -> String {
    fold_token(input)
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

/// Umlauts expand before accent stripping; the rest are letters without a
/// canonical decomposition.
fn expand_char(ch: char) -> Option<&'static str> {
    let expanded = match ch {
        'ä' => "ae",
        'ö' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'ł' => "l",
        'đ' => "d",
        'ı' => "i",
        'ħ' => "h",
        _ => return None,
    };
    Some(expanded)
}

pub fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{feff}').unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_whitespace_collapses_inner_runs() {
        assert_eq!(normalize_whitespace("  Netzwerke \t\n TCP  "), "Netzwerke TCP");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn fold_token_expands_umlauts_and_strips_accents() {
        assert_eq!(fold_token("ÜBER-Thema "), "ueber-thema");
        assert_eq!(fold_token("Straße"), "strasse");
        assert_eq!(fold_token("Café  Résumé"), "cafe resume");
    }

    #[test]
    fn decomposed_umlauts_fold_like_precomposed_ones() {
        assert_eq!(fold_token("U\u{308}ber-Thema"), "ueber-thema");
        assert_eq!(fold_token("Stra\u{df}e"), fold_token("STRASSE"));
    }

    #[test]
    fn accents_outside_western_european_letters_are_stripped() {
        assert_eq!(fold_token("Şcoală"), "scoala");
        assert_eq!(fold_token("Ștefan Ğ ő"), "stefan g o");
        assert_eq!(fold_token("Işık"), "isik");
        assert_eq!(fold_token("Łódź"), "lodz");
    }

    #[test]
    fn fold_key_token_drops_separators() {
        assert_eq!(fold_key_token("sub_topics"), "subtopics");
        assert_eq!(fold_key_token("Über Thema"), "ueberthema");
    }

    #[test]
    fn strip_bom_only_removes_leading_marker() {
        assert_eq!(strip_bom("\u{feff}{}"), "{}");
        assert_eq!(strip_bom("{}"), "{}");
    }
}
