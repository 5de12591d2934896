//! The uniform filter shape every backend translates to its native
//! predicate.

/// A scalar metadata value to match against.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An integer field (`user_id`, `paper_id`, summary ids).
    Int(i64),
    /// A string field (`summary_type`, `llm_provider`, a tag).
    Str(String),
}

/// One `key = value` equality clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Metadata field name.
    pub key: String,
    /// Value it must equal.
    pub value: Value,
}

/// A conjunction (AND) of equality clauses.
#[derive(Debug, Clone, Default)]
pub struct Conjunction {
    pub(crate) clauses: Vec<Clause>,
}

impl Conjunction {
    /// Starts an empty conjunction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause, builder-style.
    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: Value) -> Self {
        self.clauses.push(Clause { key: key.into(), value });
        self
    }

    /// Convenience for the common `(user_id, paper_id)` restriction.
    #[must_use]
    pub fn for_user_paper(user_id: i64, paper_id: i64) -> Self {
        Self::new().eq("user_id", Value::Int(user_id)).eq("paper_id", Value::Int(paper_id))
    }

    /// Whether every clause matches the given metadata pairs.
    #[must_use]
    pub fn matches(&self, pairs: &[(String, Value)]) -> bool {
        self.clauses.iter().all(|clause| {
            pairs
                .iter()
                .any(|(k, v)| k == &clause.key && values_equal(v, &clause.value))
        })
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

/// A disjunction (OR) of conjunctions — `search_by_vector`'s filter shape:
/// a disjunction of per-user-paper conjunctions, used by RAG to restrict
/// search to a given user's corpus, optionally tag-filtered.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub(crate) conjunctions: Vec<Conjunction>,
}

impl Filter {
    /// An empty filter (every conjunction list empty matches nothing —
    /// callers build up from [`Filter::any_of`] or [`Filter::single`]).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter with exactly one conjunction (the common case: delete or
    /// restrict to a single `(user_id, paper_id)`).
    #[must_use]
    pub fn single(conjunction: Conjunction) -> Self {
        Self {
            conjunctions: vec![conjunction],
        }
    }

    /// A filter that is the disjunction of the given conjunctions.
    #[must_use]
    pub fn any_of(conjunctions: Vec<Conjunction>) -> Self {
        Self { conjunctions }
    }

    /// Whether the given metadata pairs satisfy at least one conjunction.
    #[must_use]
    pub fn matches(&self, pairs: &[(String, Value)]) -> bool {
        self.conjunctions.is_empty() || self.conjunctions.iter().any(|c| c.matches(pairs))
    }

    #[must_use]
    pub fn conjunctions(&self) -> &[Conjunction] {
        &self.conjunctions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjunction_requires_all_clauses() {
        let c = Conjunction::new().eq("user_id", Value::Int(1)).eq("paper_id", Value::Int(2));
        let pairs = vec![("user_id".to_string(), Value::Int(1)), ("paper_id".to_string(), Value::Int(2))];
        assert!(c.matches(&pairs));

        let partial = vec![("user_id".to_string(), Value::Int(1))];
        assert!(!c.matches(&partial));
    }

    #[test]
    fn filter_is_disjunction_of_conjunctions() {
        let f = Filter::any_of(vec![
            Conjunction::for_user_paper(1, 10),
            Conjunction::for_user_paper(1, 20),
        ]);
        assert!(f.matches(&[("user_id".to_string(), Value::Int(1)), ("paper_id".to_string(), Value::Int(20))]));
        assert!(!f.matches(&[("user_id".to_string(), Value::Int(1)), ("paper_id".to_string(), Value::Int(30))]));
    }
}
