//! Design-matrix construction.
//!
//! Categorical predictors use treatment coding against their sorted levels
//! (first level = reference). Interaction columns are elementwise products of
//! the operand blocks, so a factor × factor interaction expands to the full
//! dummy cross product and a continuous × continuous interaction stays a
//! single column.

use nalgebra::DMatrix;

use crate::domain::{Factor, ModelData};
use crate::model::formula::{Formula, Predictor, Term};

/// A labeled design-matrix column.
#[derive(Debug, Clone)]
pub struct Column {
    pub label: String,
    pub values: Vec<f64>,
}

/// Build the design matrix and its column labels for a formula.
///
/// The first column is always the intercept.
pub fn design_matrix(formula: &Formula, data: &ModelData) -> (DMatrix<f64>, Vec<String>) {
    let n = data.n();
    let mut cols: Vec<Column> = vec![Column {
        label: "(Intercept)".to_string(),
        values: vec![1.0; n],
    }];

    for term in &formula.terms {
        cols.extend(term_columns(term, data));
    }

    let labels = cols.iter().map(|c| c.label.clone()).collect();
    let mut x = DMatrix::zeros(n, cols.len());
    for (j, col) in cols.iter().enumerate() {
        for (i, &v) in col.values.iter().enumerate() {
            x[(i, j)] = v;
        }
    }
    (x, labels)
}

fn term_columns(term: &Term, data: &ModelData) -> Vec<Column> {
    match *term {
        Term::Main(p) => predictor_block(p, data),
        Term::Interaction(a, b) => {
            let left = predictor_block(a, data);
            let right = predictor_block(b, data);
            let mut out = Vec::with_capacity(left.len() * right.len());
            for lc in &left {
                for rc in &right {
                    let values = lc
                        .values
                        .iter()
                        .zip(rc.values.iter())
                        .map(|(&x, &y)| x * y)
                        .collect();
                    out.push(Column {
                        label: format!("{}:{}", lc.label, rc.label),
                        values,
                    });
                }
            }
            out
        }
    }
}

fn predictor_block(p: Predictor, data: &ModelData) -> Vec<Column> {
    match p {
        Predictor::Year => factor_dummies(&data.year),
        Predictor::Site => factor_dummies(&data.site),
        Predictor::Gdd => vec![continuous("gdd", &data.gdd)],
        Predictor::Evi => vec![continuous("evi", &data.evi)],
        Predictor::Ndmi => vec![continuous("ndmi", &data.ndmi)],
    }
}

fn continuous(label: &str, values: &[f64]) -> Column {
    Column {
        label: label.to_string(),
        values: values.to_vec(),
    }
}

/// Treatment-coded dummies for levels `1..` of a factor.
///
/// A single-level factor contributes no columns (it is constant within the
/// group and carries no information).
fn factor_dummies(factor: &Factor) -> Vec<Column> {
    (1..factor.n_levels())
        .map(|level| Column {
            label: format!("{}{}", factor.name, factor.levels[level]),
            values: factor
                .codes
                .iter()
                .map(|&c| if c == level { 1.0 } else { 0.0 })
                .collect(),
        })
        .collect()
}
