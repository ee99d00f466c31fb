//! Fuzz test suite
//!
//! Random client mixes against the allocation invariants: capacity, hard
//! minimums, demand bounds, backend agreement and warm-start optimality.

use crate::buffer::{DemandHistory, RobustBuffer};
use crate::client::{total_min_rate, Client};
use crate::config::{BufferConfig, ControllerConfig, ObjectiveMode, SolverKind};
use crate::controller::AllocationController;
use crate::problem::AllocationProblem;
use crate::solver::{solver_for, LpSolver};

use proptest::prelude::*;

/// Clients with demand, weight and a hard minimum of at most half the demand.
fn clients_strategy(max_clients: usize) -> impl Strategy<Value = Vec<Client>> {
    prop::collection::vec(
        (
            0.0..=100.0, // demand
            0.1..=10.0,  // weight
            0.0..=0.5,   // minimum as a share of demand
        ),
        1..=max_clients,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (demand, weight, share))| {
                Client::new(format!("client-{i}"), demand, weight).with_min_rate(demand * share)
            })
            .collect()
    })
}

/// A capacity that always fits the hard minimums.
fn feasible_capacity(clients: &[Client], fraction: f64) -> f64 {
    let demand: f64 = clients.iter().map(|c| c.demand).sum();
    (demand * fraction).max(total_min_rate(clients)) + 1.0
}

fn tolerance(scale: f64) -> f64 {
    1e-6 * (1.0 + scale.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property test: every backend respects capacity, minimums and demand
        #[test]
        fn property_allocation_bounds(
            clients in clients_strategy(12),
            fraction in 0.1..=1.5,
            kind in prop_oneof![Just(SolverKind::Simplex), Just(SolverKind::Greedy)],
        ) {
            let capacity = feasible_capacity(&clients, fraction);
            let problem =
                AllocationProblem::single_period(&clients, ObjectiveMode::Throughput, capacity);
            let outcome = solver_for(kind).solve(&problem).unwrap();
            let rates = &outcome.rates[0];

            prop_assert!(rates.iter().sum::<f64>() <= capacity + tolerance(capacity));
            for (client, rate) in clients.iter().zip(rates) {
                prop_assert!(*rate >= client.min_rate().min(client.demand) - 1e-6,
                    "{} got {rate} below its minimum", client.id);
                prop_assert!(*rate <= client.demand + 1e-6,
                    "{} got {rate} above its demand {}", client.id, client.demand);
            }
        }

        /// Property test: simplex and greedy find the same optimum and price
        #[test]
        fn property_backends_agree(
            clients in clients_strategy(10),
            fraction in 0.1..=1.5,
        ) {
            let capacity = feasible_capacity(&clients, fraction);
            let problem =
                AllocationProblem::single_period(&clients, ObjectiveMode::Throughput, capacity);

            let simplex = solver_for(SolverKind::Simplex).solve(&problem).unwrap();
            let greedy = solver_for(SolverKind::Greedy).solve(&problem).unwrap();

            prop_assert!(
                (simplex.objective - greedy.objective).abs() <= tolerance(greedy.objective),
                "simplex {} vs greedy {}",
                simplex.objective,
                greedy.objective
            );

            let period = &problem.periods[0];
            let simplex_price = period.capacity_dual(&simplex.rates[0]);
            let greedy_price = period.capacity_dual(&greedy.rates[0]);
            prop_assert!((simplex_price - greedy_price).abs() <= 1e-6,
                "simplex price {simplex_price} vs greedy price {greedy_price}");
        }

        /// Property test: a certified warm start never changes the optimum
        #[test]
        fn property_warm_start_objective(
            clients in clients_strategy(8),
            fraction in 0.2..=1.2,
            scales in prop::collection::vec(0.5..=1.5, 1..6),
        ) {
            let capacity = feasible_capacity(&clients, fraction);
            let cfg = ControllerConfig {
                buffer: BufferConfig { coefficient: 0.0, window: 10 },
                ..ControllerConfig::new(capacity)
            };
            let mut warm = AllocationController::new(cfg.clone()).unwrap();
            let mut cold = AllocationController::new(ControllerConfig {
                warm_start: false,
                ..cfg
            })
            .unwrap();

            for (t, scale) in scales.iter().enumerate() {
                // Minimums are fixed and capacity was sized for them.
                let tick: Vec<Client> = clients
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let demand = if i % 2 == 0 { c.demand * scale } else { c.demand };
                        Client { demand: demand.max(c.min_rate()), ..c.clone() }
                    })
                    .collect();

                let w = warm.force_resolve(&tick, t as f64).unwrap();
                let c = cold.force_resolve(&tick, t as f64).unwrap();
                prop_assert!(
                    (w.objective_value - c.objective_value).abs() <= tolerance(c.objective_value),
                    "warm {} vs cold {}",
                    w.objective_value,
                    c.objective_value
                );
            }
        }

        /// Property test: a larger risk coefficient never adds capacity
        #[test]
        fn property_buffer_monotone(
            samples in prop::collection::vec(0.0..=500.0, 2..=12),
            mut betas in prop::collection::vec(0.0..=5.0, 2..=6),
        ) {
            let mut history = DemandHistory::new(samples.len());
            for s in &samples {
                history.record(*s);
            }
            betas.sort_by(f64::total_cmp);

            let effective: Vec<f64> = betas
                .iter()
                .map(|&coefficient| {
                    RobustBuffer::new(&BufferConfig { coefficient, window: samples.len() })
                        .capacity_state(200.0, &history)
                        .effective
                })
                .collect();
            prop_assert!(effective.windows(2).all(|w| w[1] <= w[0] + 1e-12));
            prop_assert!(effective.iter().all(|e| *e >= 0.0 && *e <= 200.0));
        }
    }

    /// Regression test: all demand zero
    #[test]
    fn regression_zero_demand() {
        let clients = vec![
            Client::new("a", 0.0, 1.0).with_min_rate(5.0),
            Client::new("b", 0.0, 2.0),
        ];
        let mut ctl = AllocationController::new(ControllerConfig::new(10.0)).unwrap();
        let solution = ctl.evaluate(&clients, 0.0).unwrap();

        assert_eq!(solution.total_allocated(), 0.0);
        assert_eq!(solution.shadow_price, 0.0);
    }

    /// Regression test: revenue mode without prices allocates only minimums
    #[test]
    fn regression_revenue_without_prices() {
        let clients = vec![
            Client::new("a", 50.0, 1.0).with_min_rate(10.0),
            Client::new("b", 50.0, 1.0).with_willingness_to_pay(0.5),
        ];
        let problem = AllocationProblem::single_period(&clients, ObjectiveMode::Revenue, 40.0);

        for kind in [SolverKind::Simplex, SolverKind::Greedy] {
            let outcome = solver_for(kind).solve(&problem).unwrap();
            assert!((outcome.rates[0][0] - 10.0).abs() < 1e-6);
            assert!((outcome.rates[0][1] - 30.0).abs() < 1e-6);
            assert!((outcome.objective - 15.0).abs() < 1e-6);
        }
    }
}
