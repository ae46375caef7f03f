//! Naming conventions shared by the providers.
//!
//! Schema naming is not guaranteed to match domain naming, so every column
//! or sequence lookup goes through [`name_candidates`]: the name as given,
//! then its UPPER and lower case variants.

use regex::Regex;

lazy_static::lazy_static! {
    static ref ACRONYM_BOUNDARY: Regex = Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap();
    static ref WORD_BOUNDARY: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

/// Strips a module path, e.g. `sample::OrderId` -> `OrderId`.
pub fn simple_type_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

/// `LineNoteId` -> `LINE_NOTE_ID`, `HTTPRoute` -> `HTTP_ROUTE`.
pub fn to_upper_snake_case(name: &str) -> String {
    let split = ACRONYM_BOUNDARY.replace_all(name, "${1}_${2}");
    let split = WORD_BOUNDARY.replace_all(&split, "${1}_${2}");
    split.replace(['-', ' '], "_").to_ascii_uppercase()
}

/// Exact, UPPER and lower variants of `name`, without duplicates.
pub fn name_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![name.to_string()];
    for variant in [name.to_ascii_uppercase(), name.to_ascii_lowercase()] {
        if !candidates.contains(&variant) {
            candidates.push(variant);
        }
    }
    candidates
}

/// Sequence candidates for an identity type: `OrderId` -> `ORDER_ID_SEQ`, `order_id_seq`.
pub fn identity_sequence_candidates(identity_type: &str, suffix: &str) -> Vec<String> {
    let base = format!("{}{}", to_upper_snake_case(simple_type_name(identity_type)), suffix);
    upper_lower(&base)
}

/// Sequence candidates for a record type: `order_tag` -> `ORDER_TAG_SEQ`, `order_tag_seq`.
pub fn record_sequence_candidates(record_type: &str, suffix: &str) -> Vec<String> {
    let base = format!("{}{}", record_type, suffix);
    upper_lower(&base)
}

fn upper_lower(name: &str) -> Vec<String> {
    let upper = name.to_ascii_uppercase();
    let lower = name.to_ascii_lowercase();
    if upper == lower {
        vec![upper]
    } else {
        vec![upper, lower]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_snake_case() {
        assert_eq!(to_upper_snake_case("OrderId"), "ORDER_ID");
        assert_eq!(to_upper_snake_case("LineNoteId"), "LINE_NOTE_ID");
        assert_eq!(to_upper_snake_case("HTTPRoute"), "HTTP_ROUTE");
        assert_eq!(to_upper_snake_case("order_tag"), "ORDER_TAG");
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("aggmirror::sample::OrderId"), "OrderId");
        assert_eq!(simple_type_name("OrderId"), "OrderId");
    }

    #[test]
    fn test_name_candidates_dedup() {
        assert_eq!(name_candidates("ID"), vec!["ID", "id"]);
        assert_eq!(name_candidates("Street"), vec!["Street", "STREET", "street"]);
    }

    #[test]
    fn test_sequence_candidates() {
        assert_eq!(
            identity_sequence_candidates("sample::OrderId", "_SEQ"),
            vec!["ORDER_ID_SEQ", "order_id_seq"]
        );
        assert_eq!(
            record_sequence_candidates("order_tag", "_SEQ"),
            vec!["ORDER_TAG_SEQ", "order_tag_seq"]
        );
    }
}
