//! Chi-square test of independence for group × binary outcome tables.
//!
//! The test statistic follows the usual Pearson form with Yates' continuity
//! correction when the table has a single degree of freedom. The p-value is
//! the chi-square upper tail, computed from the regularized incomplete gamma
//! function.

use super::grouping::Grouping;
use crate::dataset::{is_event, Dataset};
use crate::error::{Availability, Unavailable};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts of one group across the two outcome values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyRow {
    pub key: String,
    /// Records with outcome 0 (anything but `"1"`).
    pub negative: u64,
    /// Records with outcome 1.
    pub positive: u64,
}

impl ContingencyRow {
    pub fn total(&self) -> u64 {
        self.negative + self.positive
    }
}

/// Group × {0, 1} cross-tabulation. Rows are sorted by key and every row
/// has at least one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub grouping: String,
    pub outcome: String,
    pub rows: Vec<ContingencyRow>,
}

/// Result of a chi-square test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub yates_corrected: bool,
}

impl ChiSquareResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Cross-tabulate a grouping against a binary outcome.
pub fn build_contingency(
    dataset: &Dataset,
    grouping: &Grouping,
    outcome: &str,
) -> Availability<ContingencyTable> {
    dataset.require(&grouping.field)?;
    dataset.require(outcome)?;

    let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for record in dataset.records() {
        let (Some(key), Some(value)) = (grouping.key_of(dataset, record), dataset.value(record, outcome))
        else {
            continue;
        };

        let cell = counts.entry(key).or_default();
        if is_event(value) {
            cell.1 += 1;
        } else {
            cell.0 += 1;
        }
    }

    Ok(ContingencyTable {
        grouping: grouping.label.clone(),
        outcome: outcome.to_string(),
        rows: counts
            .into_iter()
            .map(|(key, (negative, positive))| ContingencyRow {
                key,
                negative,
                positive,
            })
            .collect(),
    })
}

impl ContingencyTable {
    fn degenerate(&self, detail: &str) -> Unavailable {
        Unavailable::DegenerateContingencyTable {
            grouping: self.grouping.clone(),
            outcome: self.outcome.clone(),
            detail: detail.to_string(),
        }
    }

    pub fn total(&self) -> u64 {
        self.rows.iter().map(ContingencyRow::total).sum()
    }

    /// Run the test, or explain why the table cannot support it.
    pub fn chi_square(&self) -> Availability<ChiSquareResult> {
        if self.rows.len() < 2 {
            return Err(self.degenerate(&format!(
                "fewer than 2 groups ({})",
                self.rows.len()
            )));
        }

        let negatives: u64 = self.rows.iter().map(|r| r.negative).sum();
        let positives: u64 = self.rows.iter().map(|r| r.positive).sum();
        if negatives == 0 || positives == 0 {
            return Err(self.degenerate("outcome has a single value"));
        }

        let n = self.total() as f64;
        let column_totals = [negatives as f64, positives as f64];
        let degrees_of_freedom = self.rows.len() - 1;
        let yates_corrected = degrees_of_freedom == 1;

        let mut statistic = 0.0;
        for row in &self.rows {
            let row_total = row.total() as f64;
            for (observed, column_total) in [row.negative, row.positive].iter().zip(column_totals) {
                let expected = row_total * column_total / n;
                let mut diff = (*observed as f64 - expected).abs();
                if yates_corrected {
                    diff -= diff.min(0.5);
                }
                statistic += diff * diff / expected;
            }
        }

        Ok(ChiSquareResult {
            statistic,
            degrees_of_freedom,
            p_value: chi_square_upper_tail(statistic, degrees_of_freedom as f64),
            yates_corrected,
        })
    }
}

/// Build the table and test it in one step.
pub fn chi_square_test(
    dataset: &Dataset,
    grouping: &Grouping,
    outcome: &str,
) -> Availability<ChiSquareResult> {
    build_contingency(dataset, grouping, outcome)?.chi_square()
}

/// P(X > x) for X ~ chi-square with `dof` degrees of freedom.
pub fn chi_square_upper_tail(x: f64, dof: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    regularized_gamma_q(dof / 2.0, x / 2.0)
}

const GAMMA_EPSILON: f64 = 1e-15;
const GAMMA_MAX_ITERATIONS: usize = 500;

/// Natural log of the gamma function (Lanczos approximation, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (i, c) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Q(a, x) = 1 - P(a, x).
fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    }
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut term = 1.0 / a;
    let mut sum = term;
    for _ in 0..GAMMA_MAX_ITERATIONS {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * GAMMA_EPSILON {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

/// Lentz's method.
fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    const TINY: f64 = 1e-300;

    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;

    for i in 1..=GAMMA_MAX_ITERATIONS {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < GAMMA_EPSILON {
            break;
        }
    }

    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, u64, u64)]) -> ContingencyTable {
        ContingencyTable {
            grouping: "hospital".to_string(),
            outcome: "died_30day".to_string(),
            rows: rows
                .iter()
                .map(|(key, negative, positive)| ContingencyRow {
                    key: key.to_string(),
                    negative: *negative,
                    positive: *positive,
                })
                .collect(),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_two_by_two_uses_yates() {
        let result = table(&[("A", 10, 20), ("B", 30, 40)]).chi_square().unwrap();
        assert!(result.yates_corrected);
        assert_eq!(result.degrees_of_freedom, 1);
        assert_close(result.statistic, 0.446_428_571_428_571_4);
        assert_close(result.p_value, 0.504_035_866_452_504_8);
    }

    #[test]
    fn test_three_groups_without_correction() {
        let result = table(&[("A", 45, 5), ("B", 10, 10), ("C", 30, 20)])
            .chi_square()
            .unwrap();
        assert!(!result.yates_corrected);
        assert_eq!(result.degrees_of_freedom, 2);
        assert_close(result.statistic, 15.932_773_109_243_698);
        assert_close(result.p_value, 0.000_346_930_337_511_794_35);
        assert!(result.is_significant(0.05));
    }

    #[test]
    fn test_small_difference_is_clamped_by_yates() {
        let result = table(&[("A", 5, 45), ("B", 0, 10)]).chi_square().unwrap();
        assert_close(result.statistic, 0.174_545_454_545_454_6);
        assert_close(result.p_value, 0.676_103_314_023_146_8);
    }

    #[test]
    fn test_three_degrees_of_freedom() {
        let result = table(&[("A", 12, 8), ("B", 5, 15), ("C", 9, 11), ("D", 14, 6)])
            .chi_square()
            .unwrap();
        assert_close(result.statistic, 9.2);
        assert_close(result.p_value, 0.026_746_636_122_088_538);
    }

    #[test]
    fn test_single_group_is_degenerate() {
        let result = table(&[("A", 10, 2)]).chi_square();
        assert!(matches!(
            result,
            Err(Unavailable::DegenerateContingencyTable { .. })
        ));
    }

    #[test]
    fn test_single_outcome_value_is_degenerate() {
        let result = table(&[("A", 10, 0), ("B", 4, 0)]).chi_square();
        assert!(matches!(
            result,
            Err(Unavailable::DegenerateContingencyTable { .. })
        ));
    }

    #[test]
    fn test_build_contingency_from_dataset() {
        let csv = "hospital,died_30day\nMulago,1\nNaguru,0\nMulago,0\nKirrudu,NA\n,1\nNaguru,1\n";
        let dataset =
            crate::dataset::read_dataset(csv.as_bytes(), &["hospital", "died_30day"], "NA").unwrap();
        let contingency =
            build_contingency(&dataset, &Grouping::by_field("hospital"), "died_30day").unwrap();

        let keys: Vec<&str> = contingency.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Mulago", "Naguru"]);
        assert_eq!(contingency.rows[0].positive, 1);
        assert_eq!(contingency.rows[0].negative, 1);
        assert_eq!(contingency.total(), 4);
    }

    #[test]
    fn test_upper_tail_edges() {
        assert_eq!(chi_square_upper_tail(0.0, 2.0), 1.0);
        assert_close(chi_square_upper_tail(4.0, 2.0), (-2.0f64).exp());
        assert!(chi_square_upper_tail(500.0, 1.0) < 1e-100);
    }
}
