//! Document filters and `$set` patches evaluated by the embedded store.
//!
//! # Responsibility
//! - Represent a query as a list of `(field, operator, value)` clauses.
//! - Evaluate clauses against BSON documents with document-store semantics.
//!
//! # Invariants
//! - Clauses are conjunctive; `AnyOf` introduces disjunction.
//! - Text operators match literally: user text is never a pattern.
//! - A missing field fails `Eq`/`Lt`/`Lte`/`In` and passes `Nin`.
//! - `_id` cannot be assigned by a patch.

use bson::{Bson, Document};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

/// Comparison applied between a document field and a clause value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    /// Whole-field text equality ignoring case.
    EqIgnoreCase,
    /// Text substring match ignoring case.
    ContainsIgnoreCase,
    Lt,
    Lte,
    /// Field equals one of the values in an array operand.
    In,
    /// Field equals none of the values in an array operand.
    Nin,
}

/// One filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Field {
        field: String,
        op: Operator,
        value: Bson,
    },
    /// Satisfied when any alternative filter matches.
    AnyOf(Vec<Filter>),
}

/// Conjunction of clauses. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw `(field, operator, value)` triple.
    pub fn push(&mut self, field: impl Into<String>, op: Operator, value: impl Into<Bson>) {
        self.clauses.push(Clause::Field {
            field: field.into(),
            op,
            value: value.into(),
        });
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push(field, Operator::Eq, value);
        self
    }

    pub fn eq_ignore_case(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.push(field, Operator::EqIgnoreCase, text.into());
        self
    }

    pub fn contains_ignore_case(
        mut self,
        field: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.push(field, Operator::ContainsIgnoreCase, text.into());
        self
    }

    pub fn lt(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push(field, Operator::Lt, value);
        self
    }

    pub fn lte(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push(field, Operator::Lte, value);
        self
    }

    pub fn is_in<V: Into<Bson>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.push(field, Operator::In, values);
        self
    }

    pub fn not_in<V: Into<Bson>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Bson> = values.into_iter().map(Into::into).collect();
        self.push(field, Operator::Nin, values);
        self
    }

    pub fn any_of(mut self, alternatives: Vec<Filter>) -> Self {
        self.clauses.push(Clause::AnyOf(alternatives));
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns the operand when the filter is a single exact `_id` match.
    pub fn id_equality(&self) -> Option<&Bson> {
        match self.clauses.as_slice() {
            [Clause::Field {
                field,
                op: Operator::Eq,
                value,
            }] if field == "_id" => Some(value),
            _ => None,
        }
    }

    /// Prepares the filter for repeated evaluation.
    ///
    /// # Errors
    /// - Returns the regex error when a text clause exceeds engine limits.
    pub fn compile(&self) -> Result<Matcher, regex::Error> {
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            clauses.push(match clause {
                Clause::Field { field, op, value } => CompiledClause::Field {
                    field: field.clone(),
                    test: Test::compile(*op, value)?,
                },
                Clause::AnyOf(alternatives) => CompiledClause::AnyOf(
                    alternatives
                        .iter()
                        .map(Filter::compile)
                        .collect::<Result<_, _>>()?,
                ),
            });
        }
        Ok(Matcher { clauses })
    }

    #[cfg(test)]
    pub(crate) fn matches(&self, doc: &Document) -> bool {
        self.compile().expect("filter compiles").matches(doc)
    }
}

/// Compiled form of a [`Filter`].
#[derive(Debug)]
pub struct Matcher {
    clauses: Vec<CompiledClause>,
}

#[derive(Debug)]
enum CompiledClause {
    Field { field: String, test: Test },
    AnyOf(Vec<Matcher>),
}

#[derive(Debug)]
enum Test {
    Eq(Bson),
    Pattern(Regex),
    Lt(Bson),
    Lte(Bson),
    In(Vec<Bson>),
    Nin(Vec<Bson>),
}

impl Test {
    fn compile(op: Operator, value: &Bson) -> Result<Self, regex::Error> {
        Ok(match op {
            Operator::Eq => Self::Eq(value.clone()),
            Operator::EqIgnoreCase => {
                Self::Pattern(text_pattern(&format!("^{}$", escaped(value)))?)
            }
            Operator::ContainsIgnoreCase => Self::Pattern(text_pattern(&escaped(value))?),
            Operator::Lt => Self::Lt(value.clone()),
            Operator::Lte => Self::Lte(value.clone()),
            Operator::In => Self::In(operand_list(value)),
            Operator::Nin => Self::Nin(operand_list(value)),
        })
    }

    fn check(&self, field: Option<&Bson>) -> bool {
        match (self, field) {
            (Self::Nin(_), None) => true,
            (_, None) => false,
            (Self::Eq(expected), Some(actual)) => values_equal(actual, expected),
            (Self::Pattern(pattern), Some(Bson::String(text))) => pattern.is_match(text),
            (Self::Pattern(_), Some(_)) => false,
            (Self::Lt(bound), Some(actual)) => compare(actual, bound) == Some(Ordering::Less),
            (Self::Lte(bound), Some(actual)) => matches!(
                compare(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            (Self::In(values), Some(actual)) => values.iter().any(|v| values_equal(actual, v)),
            (Self::Nin(values), Some(actual)) => !values.iter().any(|v| values_equal(actual, v)),
        }
    }
}

impl Matcher {
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            CompiledClause::Field { field, test } => test.check(doc.get(field)),
            CompiledClause::AnyOf(alternatives) => alternatives.iter().any(|m| m.matches(doc)),
        })
    }
}

/// Field assignments applied by update operations (`$set`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetPatch {
    fields: Document,
}

impl SetPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Builds a patch that overwrites every field of `doc` except `_id`.
    pub fn overwrite_with(doc: &Document) -> Self {
        let mut fields = doc.clone();
        fields.remove("_id");
        Self { fields }
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn touches_id(&self) -> bool {
        self.fields.contains_key("_id")
    }

    pub fn apply(&self, doc: &mut Document) {
        for (field, value) in &self.fields {
            doc.insert(field.clone(), value.clone());
        }
    }
}

fn text_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn escaped(value: &Bson) -> String {
    match value {
        Bson::String(text) => regex::escape(text),
        other => regex::escape(&other.to_string()),
    }
}

fn operand_list(value: &Bson) -> Vec<Bson> {
    match value {
        Bson::Array(values) => values.clone(),
        single => vec![single.clone()],
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(v) => Some(Self::Int(i64::from(*v))),
            Bson::Int64(v) => Some(Self::Int(*v)),
            Bson::Double(v) => Some(Self::Float(*v)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    fn cmp(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

fn values_equal(actual: &Bson, expected: &Bson) -> bool {
    match (Number::of(actual), Number::of(expected)) {
        (Some(a), Some(b)) => a.cmp(b) == Some(Ordering::Equal),
        _ => actual == expected,
    }
}

fn compare(actual: &Bson, bound: &Bson) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (Number::of(actual), Number::of(bound)) {
        return a.cmp(b);
    }
    match (actual, bound) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Filter, Operator, SetPatch};
    use bson::{doc, Bson, DateTime};

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc! { "title": "Dune" }));
    }

    #[test]
    fn contains_ignore_case_is_literal_substring() {
        let filter = Filter::new().contains_ignore_case("title", "hob");
        assert!(filter.matches(&doc! { "title": "The Hobbit" }));
        assert!(!filter.matches(&doc! { "title": "Dune" }));

        let dotted = Filter::new().contains_ignore_case("title", "a.c");
        assert!(dotted.matches(&doc! { "title": "xA.Cx" }));
        assert!(!dotted.matches(&doc! { "title": "abc" }));
    }

    #[test]
    fn eq_ignore_case_requires_whole_field() {
        let filter = Filter::new().eq_ignore_case("title", "dune");
        assert!(filter.matches(&doc! { "title": "Dune" }));
        assert!(!filter.matches(&doc! { "title": "Dune Messiah" }));
    }

    #[test]
    fn numeric_equality_crosses_integer_widths() {
        let filter = Filter::new().eq("copies_number", 3_i64);
        assert!(filter.matches(&doc! { "copies_number": 3_i32 }));
        assert!(filter.matches(&doc! { "copies_number": 3.0_f64 }));
        assert!(!filter.matches(&doc! { "copies_number": 4_i64 }));
    }

    #[test]
    fn datetime_bounds_compare_by_millis() {
        let doc = doc! { "issue_date": DateTime::from_millis(1_000) };
        assert!(Filter::new()
            .lt("issue_date", DateTime::from_millis(1_001))
            .matches(&doc));
        assert!(!Filter::new()
            .lt("issue_date", DateTime::from_millis(1_000))
            .matches(&doc));
        assert!(Filter::new()
            .lte("issue_date", DateTime::from_millis(1_000))
            .matches(&doc));
    }

    #[test]
    fn missing_field_fails_in_and_passes_nin() {
        let doc = doc! { "title": "Dune" };
        assert!(!Filter::new().is_in("state", ["Issued"]).matches(&doc));
        assert!(Filter::new().not_in("state", ["Expired"]).matches(&doc));
        assert!(!Filter::new().lt("return_date", 5_i64).matches(&doc));
    }

    #[test]
    fn any_of_is_disjunction_and_clauses_are_conjunction() {
        let filter = Filter::new()
            .eq("reader_id", "r1")
            .any_of(vec![
                Filter::new().eq("state", "Expired"),
                Filter::new().lte("return_date", 10_i64),
            ]);

        assert!(filter.matches(&doc! { "reader_id": "r1", "state": "Expired", "return_date": 99_i64 }));
        assert!(filter.matches(&doc! { "reader_id": "r1", "state": "Issued", "return_date": 10_i64 }));
        assert!(!filter.matches(&doc! { "reader_id": "r1", "state": "Issued", "return_date": 11_i64 }));
        assert!(!filter.matches(&doc! { "reader_id": "r2", "state": "Expired" }));
    }

    #[test]
    fn text_operator_never_matches_non_string_field() {
        let mut filter = Filter::new();
        filter.push("age_limit", Operator::ContainsIgnoreCase, "1");
        assert!(!filter.matches(&doc! { "age_limit": 12_i64 }));
    }

    #[test]
    fn patch_applies_fields_and_overwrite_drops_id() {
        let mut doc = doc! { "_id": 1, "action_status": true };
        SetPatch::new().set("action_status", false).apply(&mut doc);
        assert_eq!(doc.get("action_status"), Some(&Bson::Boolean(false)));

        let patch = SetPatch::overwrite_with(&doc! { "_id": 2, "title": "Dune" });
        assert!(!patch.touches_id());
        assert!(patch.fields().contains_key("title"));
    }
}
