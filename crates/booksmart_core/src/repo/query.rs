//! Book search query builder.
//!
//! # Responsibility
//! - Translate `BookParams` into a store `Filter` and find options.
//!
//! # Invariants
//! - Empty strings and zero numbers contribute no clause.
//! - Substring criteria are matched literally and case-insensitively.
//! - Pagination never leaks into the filter.

use crate::model::book::BookParams;
use crate::store::{Filter, FindOptions, Operator};

/// How a non-empty criterion is matched against its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    ContainsIgnoreCase,
    Exact,
}

/// Criterion value extracted from `BookParams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion<'a> {
    Text(&'a str),
    Number(u32),
}

impl Criterion<'_> {
    fn is_unset(self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Number(number) => number == 0,
        }
    }
}

/// One searchable book field.
#[derive(Clone, Copy)]
pub struct SearchRule {
    /// Wire field name.
    pub field: &'static str,
    pub rule: MatchRule,
    pub value: for<'a> fn(&'a BookParams) -> Criterion<'a>,
}

pub const BOOK_SEARCH_RULES: [SearchRule; 9] = [
    SearchRule {
        field: "title",
        rule: MatchRule::ContainsIgnoreCase,
        value: |p| Criterion::Text(&p.title),
    },
    SearchRule {
        field: "author",
        rule: MatchRule::ContainsIgnoreCase,
        value: |p| Criterion::Text(&p.author),
    },
    SearchRule {
        field: "publisher",
        rule: MatchRule::ContainsIgnoreCase,
        value: |p| Criterion::Text(&p.publisher),
    },
    SearchRule {
        field: "copies_number",
        rule: MatchRule::Exact,
        value: |p| Criterion::Number(p.copies_number),
    },
    SearchRule {
        field: "rarity",
        rule: MatchRule::Exact,
        value: |p| Criterion::Text(&p.rarity),
    },
    SearchRule {
        field: "genre",
        rule: MatchRule::ContainsIgnoreCase,
        value: |p| Criterion::Text(&p.genre),
    },
    SearchRule {
        field: "publishing_year",
        rule: MatchRule::Exact,
        value: |p| Criterion::Number(p.publishing_year),
    },
    SearchRule {
        field: "language",
        rule: MatchRule::ContainsIgnoreCase,
        value: |p| Criterion::Text(&p.language),
    },
    SearchRule {
        field: "age_limit",
        rule: MatchRule::Exact,
        value: |p| Criterion::Number(p.age_limit),
    },
];

/// Builds the conjunctive filter for every set criterion in `params`.
pub fn book_filter(params: &BookParams) -> Filter {
    let mut filter = Filter::new();
    for rule in &BOOK_SEARCH_RULES {
        let criterion = (rule.value)(params);
        if criterion.is_unset() {
            continue;
        }
        match (rule.rule, criterion) {
            (MatchRule::ContainsIgnoreCase, Criterion::Text(text)) => {
                filter.push(rule.field, Operator::ContainsIgnoreCase, text)
            }
            (_, Criterion::Text(text)) => filter.push(rule.field, Operator::Eq, text),
            // Numeric criteria are always exact.
            (_, Criterion::Number(number)) => {
                filter.push(rule.field, Operator::Eq, i64::from(number))
            }
        }
    }
    filter
}

/// Pagination of a parametric search; a zero limit returns every match.
pub fn find_options(params: &BookParams) -> FindOptions {
    FindOptions {
        skip: u64::from(params.offset),
        limit: (params.limit > 0).then_some(u64::from(params.limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::{book_filter, find_options, BOOK_SEARCH_RULES};
    use crate::model::book::BookParams;
    use crate::store::{Clause, Operator};
    use bson::{doc, Bson};

    #[test]
    fn default_params_build_an_empty_filter() {
        assert!(book_filter(&BookParams::default()).is_empty());
    }

    #[test]
    fn title_fragment_matches_case_insensitively() {
        let params = BookParams {
            title: "hob".to_string(),
            ..BookParams::default()
        };
        let filter = book_filter(&params);

        assert!(filter.matches(&doc! { "title": "The Hobbit" }));
        assert!(!filter.matches(&doc! { "title": "Dune" }));
    }

    #[test]
    fn text_is_not_interpreted_as_a_pattern() {
        let params = BookParams {
            title: "C++ (2nd".to_string(),
            ..BookParams::default()
        };
        let filter = book_filter(&params);

        assert!(filter.matches(&doc! { "title": "Effective C++ (2nd ed.)" }));
        assert!(!filter.matches(&doc! { "title": "CCC 2nd" }));
    }

    #[test]
    fn rarity_is_matched_exactly() {
        let params = BookParams {
            rarity: "Rare".to_string(),
            ..BookParams::default()
        };
        let filter = book_filter(&params);

        assert!(filter.matches(&doc! { "rarity": "Rare" }));
        assert!(!filter.matches(&doc! { "rarity": "Very Rare" }));
        assert!(!filter.matches(&doc! { "rarity": "rare" }));
    }

    #[test]
    fn numeric_criteria_are_exact_and_zero_is_omitted() {
        let params = BookParams {
            publishing_year: 1937,
            age_limit: 0,
            ..BookParams::default()
        };
        let filter = book_filter(&params);

        assert_eq!(filter.clauses().len(), 1);
        match &filter.clauses()[0] {
            Clause::Field { field, op, value } => {
                assert_eq!(field, "publishing_year");
                assert_eq!(*op, Operator::Eq);
                assert_eq!(*value, Bson::Int64(1937));
            }
            other => panic!("unexpected clause {other:?}"),
        }
        assert!(filter.matches(&doc! { "publishing_year": 1937_i32 }));
    }

    #[test]
    fn every_set_criterion_contributes_one_clause() {
        let params = BookParams {
            title: "a".into(),
            author: "b".into(),
            publisher: "c".into(),
            copies_number: 1,
            rarity: "d".into(),
            genre: "e".into(),
            publishing_year: 2,
            language: "f".into(),
            age_limit: 3,
            limit: 10,
            offset: 5,
        };
        assert_eq!(book_filter(&params).clauses().len(), BOOK_SEARCH_RULES.len());
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let params = BookParams {
            offset: 4,
            ..BookParams::default()
        };
        let options = find_options(&params);
        assert_eq!(options.skip, 4);
        assert_eq!(options.limit, None);

        let paged = BookParams {
            limit: 2,
            ..BookParams::default()
        };
        assert_eq!(find_options(&paged).limit, Some(2));
    }
}
