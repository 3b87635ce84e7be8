use crate::text::normalize_whitespace;

// Longer tokens first so `->` is not read as a bare `>`.
const SEPARATORS: &[&str] = &["->", "::", ">", "/"];

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LegacyTopic {
    pub super_topic: String,
    pub sub_topic: String,
}

pub fn split_legacy_topic(text: &str) -> LegacyTopic {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return LegacyTopic::default();
    }

    for (index, _) in normalized.char_indices() {
        let rest = &normalized[index..];
        let Some(separator) = SEPARATORS.iter().find(|sep| rest.starts_with(**sep)) else {
            continue;
        };

        let left = normalized[..index].trim();
        let right = rest[separator.len()..].trim();
        if left.is_empty() || right.is_empty() {
            continue;
        }

        return LegacyTopic {
            super_topic: left.to_string(),
            sub_topic: right.to_string(),
        };
    }

    LegacyTopic {
        super_topic: normalized,
        sub_topic: String::new(),
    }
}
