//! Fairness measurements over an allocation.

use serde::Serialize;

use crate::client::Client;
use crate::solution::Solution;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessMetrics {
    /// 1 = perfectly even, 1/n = one client gets everything.
    pub jains_index: f64,
    /// 0 = perfect equality.
    pub gini_coefficient: f64,
    /// Smallest `allocated / demand`.
    pub min_allocation_ratio: f64,
    /// Largest `allocated / demand`.
    pub max_allocation_ratio: f64,
    /// Population std over mean of the allocations.
    pub coefficient_of_variation: f64,
}

/// `(Σx)² / (n · Σx²)`
pub fn jains_index(allocations: &[f64]) -> f64 {
    if allocations.is_empty() {
        return 0.0;
    }
    let sum: f64 = allocations.iter().sum();
    let sum_sq: f64 = allocations.iter().map(|x| x * x).sum();
    if sum_sq == 0.0 {
        return 1.0;
    }
    (sum * sum) / (allocations.len() as f64 * sum_sq)
}

pub fn gini_coefficient(allocations: &[f64]) -> f64 {
    let total: f64 = allocations.iter().sum();
    if allocations.is_empty() || total <= 0.0 {
        return 0.0;
    }
    let mut sorted = allocations.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let ranked: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (i + 1) as f64 * x)
        .sum();
    (2.0 * ranked / (n * total) - (n + 1.0) / n).max(0.0)
}

/// `allocated / demand`; a zero-demand client scores 1 when unallocated.
pub fn allocation_ratio(demand: f64, allocated: f64) -> f64 {
    if demand > 0.0 {
        allocated / demand
    } else if allocated == 0.0 {
        1.0
    } else {
        f64::INFINITY
    }
}

fn coefficient_of_variation(allocations: &[f64]) -> f64 {
    if allocations.is_empty() {
        return 0.0;
    }
    let n = allocations.len() as f64;
    let mean = allocations.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = allocations.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() / mean
}

/// Fairness of `solution` over `clients`; clients missing from it count as zero.
pub fn evaluate_fairness(clients: &[Client], solution: &Solution) -> FairnessMetrics {
    let allocations: Vec<f64> = clients
        .iter()
        .map(|c| solution.rate(&c.id).unwrap_or(0.0))
        .collect();
    let ratios: Vec<f64> = clients
        .iter()
        .zip(&allocations)
        .map(|(c, &r)| allocation_ratio(c.demand, r))
        .collect();

    let (min_allocation_ratio, max_allocation_ratio) = if ratios.is_empty() {
        (0.0, 0.0)
    } else {
        (
            ratios.iter().copied().fold(f64::INFINITY, f64::min),
            ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    };

    FairnessMetrics {
        jains_index: jains_index(&allocations),
        gini_coefficient: gini_coefficient(&allocations),
        min_allocation_ratio,
        max_allocation_ratio,
        coefficient_of_variation: coefficient_of_variation(&allocations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::tests::solution_with;

    #[test]
    fn jain_bounds() {
        assert_eq!(jains_index(&[5.0, 5.0, 5.0]), 1.0);
        assert_eq!(jains_index(&[9.0, 0.0, 0.0]), 1.0 / 3.0);
        assert_eq!(jains_index(&[0.0, 0.0]), 1.0);
        assert_eq!(jains_index(&[]), 0.0);
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini_coefficient(&[4.0, 4.0, 4.0, 4.0]), 0.0);
        // One of four holds everything: 2·4·x/(4·x) - 5/4 = 0.75.
        assert!((gini_coefficient(&[0.0, 0.0, 0.0, 8.0]) - 0.75).abs() < 1e-12);
        assert_eq!(gini_coefficient(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn ratio_edge_cases() {
        assert_eq!(allocation_ratio(10.0, 5.0), 0.5);
        assert_eq!(allocation_ratio(0.0, 0.0), 1.0);
        assert_eq!(allocation_ratio(0.0, 1.0), f64::INFINITY);
    }

    #[test]
    fn evaluates_solution() {
        let clients = vec![Client::new("a", 60.0, 2.0), Client::new("b", 80.0, 1.0)];
        let solution = solution_with(&[("a", 60.0), ("b", 40.0)]);
        let metrics = evaluate_fairness(&clients, &solution);

        assert_eq!(metrics.min_allocation_ratio, 0.5);
        assert_eq!(metrics.max_allocation_ratio, 1.0);
        // (100)² / (2 · 5200)
        assert!((metrics.jains_index - 10_000.0 / 10_400.0).abs() < 1e-12);
        assert!((metrics.coefficient_of_variation - 0.2).abs() < 1e-12);
    }
}
