//! Fuzzy ranking of cached contacts against a query.
//!
//! Each contact is scored against its display name, username and phone
//! number; the best of the three is the contact's similarity. Scores use the
//! Ratcliff/Obershelp ratio (`2 * matched / total`) over case-folded
//! characters, so identical strings score 1.0 and disjoint strings 0.0.

use portal_bridge_types::Contact;

/// Default number of results returned.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Default similarity threshold below which contacts are discarded.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.45;

/// Search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Upper bound on the number of results.
    pub max_results: usize,
    /// Results scoring below this are discarded.
    pub min_similarity: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

impl SearchOptions {
    /// Set the result limit.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the similarity threshold.
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// One ranked contact.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMatch {
    /// The matching contact.
    pub contact: Contact,
    /// Raw similarity in `[0, 1]`.
    pub similarity: f64,
    /// `similarity * 100`, rounded to one decimal.
    pub match_percent: f64,
}

/// Rank `contacts` against `query`.
///
/// Results are sorted by similarity, highest first. The sort is stable, so
/// contacts with equal scores keep their cache order.
pub fn rank_contacts<'a>(
    query: &str,
    contacts: impl IntoIterator<Item = &'a Contact>,
    options: SearchOptions,
) -> Vec<ContactMatch> {
    let mut results: Vec<ContactMatch> = contacts
        .into_iter()
        .filter_map(|contact| {
            let similarity = contact_similarity(query, contact);
            (similarity >= options.min_similarity).then(|| ContactMatch {
                contact: contact.clone(),
                similarity,
                match_percent: round_percent(similarity),
            })
        })
        .collect();

    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    results.truncate(options.max_results);
    results
}

/// Best similarity of `query` against any searchable field of `contact`.
///
/// Contacts without any searchable field score 0.
pub fn contact_similarity(query: &str, contact: &Contact) -> f64 {
    [
        contact.display_name(),
        contact.username.clone(),
        contact.phone_number.clone(),
    ]
    .into_iter()
    .flatten()
    .map(|field| similarity(query, &field))
    .fold(0.0, f64::max)
}

/// Ratcliff/Obershelp similarity of two strings, case-insensitive.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn round_percent(similarity: f64) -> f64 {
    (similarity * 1000.0).round() / 10.0
}

/// Characters covered by recursively taking the longest common block.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matched_chars(&a[..start_a], &b[..start_b])
        + matched_chars(&a[start_a + len..], &b[start_b + len..])
}

/// Longest common substring; earliest in `a`, then earliest in `b`, on ties.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // run[j + 1] = length of the common run ending at a[i], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut run = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            run[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            if run[j + 1] > best.2 {
                best = (i + 1 - run[j + 1], j + 1 - run[j + 1], run[j + 1]);
            }
        }
        std::mem::swap(&mut prev, &mut run);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_bridge_types::RemoteId;
    use proptest::prelude::*;

    fn contact(id: i64) -> Contact {
        Contact::new(RemoteId::new(id))
    }

    fn with_username(id: i64, username: &str) -> Contact {
        let mut c = contact(id);
        c.username = Some(username.into());
        c
    }

    fn with_phone(id: i64, phone: &str) -> Contact {
        let mut c = contact(id);
        c.phone_number = Some(phone.into());
        c
    }

    fn with_name(id: i64, first: &str, last: &str) -> Contact {
        let mut c = contact(id);
        c.first_name = Some(first.into());
        c.last_name = Some(last.into());
        c
    }

    // ===========================================
    // Similarity Metric Tests
    // ===========================================

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("alice", "alice"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity("alice", "5551234"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn similarity_is_case_insensitive() {
        assert_eq!(similarity("Alice", "aLICE"), 1.0);
    }

    #[test]
    fn partial_overlap_uses_ratcliff_obershelp() {
        // "abcd" vs "bcde": common block "bcd" -> 2*3/8
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-9);
        // "alice" vs "alicia": "alic" -> 2*4/11
        assert!((similarity("alice", "alicia") - 8.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn recursion_collects_blocks_on_both_sides() {
        // "xaby" vs "zabw": only "ab" matches -> 2*2/8
        assert!((similarity("xaby", "zabw") - 0.5).abs() < 1e-9);
        // "abxcd" vs "abycd": "ab" then "cd" -> 2*4/10
        assert!((similarity("abxcd", "abycd") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn similarity_stays_in_unit_interval() {
        for (a, b) in [("a", "aaaa"), ("hello", "world"), ("ü", "Ü"), ("x", "")] {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "{a} vs {b} -> {s}");
        }
    }

    // ===========================================
    // Contact Scoring Tests
    // ===========================================

    #[test]
    fn contact_takes_best_field() {
        let mut c = with_name(1, "Bob", "Builder");
        c.username = Some("alice".into());
        assert_eq!(contact_similarity("alice", &c), 1.0);
    }

    #[test]
    fn name_is_first_and_last_joined() {
        let c = with_name(1, "Alice", "Liddell");
        assert_eq!(contact_similarity("alice liddell", &c), 1.0);
    }

    #[test]
    fn empty_contact_scores_zero() {
        assert_eq!(contact_similarity("alice", &contact(1)), 0.0);
    }

    // ===========================================
    // Ranking Tests
    // ===========================================

    #[test]
    fn username_example_matches_only_alice() {
        let contacts = vec![with_username(1, "alice"), with_phone(2, "5551234")];
        let results = rank_contacts("alice", &contacts, SearchOptions::default());

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].contact.id, RemoteId::new(1));
        assert_eq!(results[0].similarity, 1.0);
        assert_eq!(results[0].match_percent, 100.0);
    }

    #[test]
    fn results_sorted_descending_and_above_threshold() {
        let contacts = vec![
            with_username(1, "alicia"),
            with_username(2, "bob"),
            with_username(3, "alice"),
            with_username(4, "malice"),
        ];
        let options = SearchOptions::default();
        let results = rank_contacts("alice", &contacts, options);

        assert!(results.iter().all(|r| r.similarity >= options.min_similarity));
        assert!(results
            .windows(2)
            .all(|pair| pair[0].similarity >= pair[1].similarity));
        assert_eq!(results[0].contact.id, RemoteId::new(3));
        assert!(results.iter().all(|r| r.contact.id != RemoteId::new(2)));
    }

    #[test]
    fn results_truncated_to_max() {
        let contacts: Vec<Contact> = (0..10).map(|i| with_username(i, "alice")).collect();
        let results = rank_contacts("alice", &contacts, SearchOptions::default().with_max_results(3));
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn equal_scores_keep_cache_order() {
        let contacts = vec![
            with_username(7, "alice"),
            with_username(3, "alice"),
            with_username(5, "alice"),
        ];
        let results = rank_contacts("alice", &contacts, SearchOptions::default());
        let order: Vec<i64> = results.iter().map(|r| r.contact.id.value()).collect();
        assert_eq!(order, vec![7, 3, 5]);
    }

    #[test]
    fn match_percent_rounds_to_one_decimal() {
        // "alice" vs "alicia" = 8/11 = 0.72727...
        let contacts = vec![with_username(1, "alicia")];
        let results = rank_contacts("alice", &contacts, SearchOptions::default());
        assert_eq!(results[0].match_percent, 72.7);
    }

    #[test]
    fn zero_threshold_keeps_everything_up_to_limit() {
        let contacts = vec![with_username(1, "zzz"), contact(2)];
        let options = SearchOptions::default().with_min_similarity(0.0);
        assert_eq!(rank_contacts("alice", &contacts, options).len(), 2);
    }

    // ===========================================
    // Ranking Properties
    // ===========================================

    type ContactFields = (Option<String>, Option<String>, Option<String>);

    fn contact_fields() -> impl Strategy<Value = ContactFields> {
        (
            prop::option::of("[a-eA-E ]{0,8}"),
            prop::option::of("[a-e]{1,8}"),
            prop::option::of("[0-9]{3,7}"),
        )
    }

    fn build_contacts(fields: Vec<ContactFields>) -> Vec<Contact> {
        fields
            .into_iter()
            .enumerate()
            .map(|(i, (first_name, username, phone_number))| Contact {
                first_name,
                username,
                phone_number,
                ..contact(i as i64)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn similarity_in_unit_interval(a in "[a-eA-E0-9 ]{0,10}", b in "[a-eA-E0-9 ]{0,10}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }

        #[test]
        fn ranking_holds_for_any_contact_set(
            fields in prop::collection::vec(contact_fields(), 0..20),
            query in "[a-e0-9]{0,6}",
            min_similarity in 0.0f64..=1.0,
            max_results in 0usize..8,
        ) {
            let contacts = build_contacts(fields);
            let options = SearchOptions { max_results, min_similarity };
            let results = rank_contacts(&query, &contacts, options);

            let qualifying = contacts
                .iter()
                .filter(|c| contact_similarity(&query, c) >= min_similarity)
                .count();
            prop_assert_eq!(results.len(), qualifying.min(max_results));

            for result in &results {
                prop_assert!(result.similarity >= min_similarity);
                prop_assert!(result.similarity <= 1.0);
            }
            for pair in results.windows(2) {
                prop_assert!(pair[0].similarity >= pair[1].similarity);
                // Ids follow cache position, so ties must keep ascending ids.
                if pair[0].similarity == pair[1].similarity {
                    prop_assert!(pair[0].contact.id.value() < pair[1].contact.id.value());
                }
            }
        }
    }
}
