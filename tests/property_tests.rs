/// Property-based tests using proptest
/// Invariants of keyword matching and the attribution window gate.
use chrono::{Duration, Utc};
use proptest::prelude::*;
use wmg_api::models::KeywordMapping;
use wmg_api::processor::match_keywords;
use wmg_api::sender::within_attribution_window;

fn mapping(id: i32, keyword: &str) -> KeywordMapping {
    KeywordMapping {
        id,
        keyword: keyword.to_string(),
        capi_event: "Purchase".to_string(),
        capi_event_custom_data: None,
        create_date: Utc::now(),
        modify_date: None,
    }
}

proptest! {
    #[test]
    fn matching_never_panics(body in "\\PC*", keyword in "\\PC*") {
        let mappings = vec![mapping(1, &keyword)];
        let _ = match_keywords(&body, &mappings);
    }

    #[test]
    fn matched_keywords_are_always_substrings(
        body in "[a-zA-Z ]{0,40}",
        keywords in prop::collection::vec("[a-zA-Z]{1,8}", 0..8)
    ) {
        let mappings: Vec<KeywordMapping> = keywords
            .iter()
            .enumerate()
            .map(|(i, k)| mapping(i as i32, k))
            .collect();

        for matched in match_keywords(&body, &mappings) {
            prop_assert!(body.contains(&matched.keyword));
        }
    }

    #[test]
    fn embedded_keyword_always_matches(
        prefix in "[a-z ]{0,20}",
        keyword in "[a-z]{1,10}",
        suffix in "[a-z ]{0,20}"
    ) {
        let body = format!("{}{}{}", prefix, keyword, suffix);
        let mappings = vec![mapping(1, &keyword)];
        prop_assert_eq!(match_keywords(&body, &mappings).len(), 1);
    }

    #[test]
    fn match_result_is_a_subsequence_of_the_table(
        body in "[a-z ]{0,40}",
        keywords in prop::collection::vec("[a-z]{1,6}", 0..10)
    ) {
        let mappings: Vec<KeywordMapping> = keywords
            .iter()
            .enumerate()
            .map(|(i, k)| mapping(i as i32, k))
            .collect();

        let ids: Vec<i32> = match_keywords(&body, &mappings).iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        // Table enumeration order is preserved, so ids come out ascending.
        prop_assert_eq!(ids, sorted);
    }

    #[test]
    fn signals_newer_than_the_window_pass(age_hours in 0i64..(7 * 24)) {
        let now = Utc::now();
        let event = now - Duration::hours(age_hours);
        prop_assert!(within_attribution_window(event, now, 7));
    }

    #[test]
    fn signals_older_than_the_window_are_gated(extra_hours in 1i64..1000) {
        let now = Utc::now();
        let event = now - Duration::days(7) - Duration::hours(extra_hours);
        prop_assert!(!within_attribution_window(event, now, 7));
    }
}
