//! Model formulas: predictors, terms, and term lists.
//!
//! Formulas are value types with stable labels (`z_pct_n ~ gdd + evi + gdd:evi`)
//! so ranking tables and exports read like the familiar model-selection output.

use serde::{Deserialize, Serialize};

/// A predictor available to candidate models.
///
/// `Year` and `Site` are categorical; the remaining three are continuous
/// site-level covariates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predictor {
    Year,
    Site,
    Gdd,
    Evi,
    Ndmi,
}

impl Predictor {
    pub fn name(self) -> &'static str {
        match self {
            Predictor::Year => "year",
            Predictor::Site => "site",
            Predictor::Gdd => "gdd",
            Predictor::Evi => "evi",
            Predictor::Ndmi => "ndmi",
        }
    }

    pub fn is_factor(self) -> bool {
        matches!(self, Predictor::Year | Predictor::Site)
    }
}

/// One additive term of a formula's right-hand side.
///
/// Interactions are always pairwise; three-way terms are not representable,
/// which is deliberate (the experimental design forbids them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Main(Predictor),
    Interaction(Predictor, Predictor),
}

impl Term {
    /// Canonical pairwise interaction (operands ordered, never equal).
    pub fn interaction(a: Predictor, b: Predictor) -> Term {
        debug_assert!(a != b, "self-interaction is not a term");
        if a <= b {
            Term::Interaction(a, b)
        } else {
            Term::Interaction(b, a)
        }
    }

    pub fn references(&self, p: Predictor) -> bool {
        match *self {
            Term::Main(m) => m == p,
            Term::Interaction(a, b) => a == p || b == p,
        }
    }

    pub fn label(&self) -> String {
        match *self {
            Term::Main(m) => m.name().to_string(),
            Term::Interaction(a, b) => format!("{}:{}", a.name(), b.name()),
        }
    }
}

/// A model specification: `response ~ intercept + terms`.
///
/// The intercept is always present; the null model has an empty term list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<Term>,
}

impl Formula {
    pub fn new(response: impl Into<String>, terms: Vec<Term>) -> Formula {
        Formula {
            response: response.into(),
            terms,
        }
    }

    /// Intercept-only model.
    pub fn null(response: impl Into<String>) -> Formula {
        Formula::new(response, Vec::new())
    }

    pub fn contains(&self, p: Predictor) -> bool {
        self.terms.iter().any(|t| t.references(p))
    }

    pub fn has_main(&self, p: Predictor) -> bool {
        self.terms.contains(&Term::Main(p))
    }

    /// Right-hand side as a label, `1` for the null model.
    pub fn rhs(&self) -> String {
        if self.terms.is_empty() {
            "1".to_string()
        } else {
            self.terms
                .iter()
                .map(Term::label)
                .collect::<Vec<_>>()
                .join(" + ")
        }
    }

    /// Marginality check: every interaction's main effects are present.
    pub fn respects_marginality(&self) -> bool {
        self.terms.iter().all(|t| match *t {
            Term::Main(_) => true,
            Term::Interaction(a, b) => self.has_main(a) && self.has_main(b),
        })
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.response, self.rhs())
    }
}
