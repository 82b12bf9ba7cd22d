//! End-to-end dispatch tests on small reference feeders
//!
//! Tests cover:
//! - Power conservation along the radial feeder
//! - Heat pump / boiler exclusivity and ownership gating
//! - Comfort envelope and gas conversion in the solved schedule
//! - Tightness of the branch cones
//! - Deterministic model construction and solve
//! - Degraded statuses when the tree search is cut short

use gec_algo::{
    soc_tightness, ClarabelBranchAndBound, DispatchModel, DispatchResult, FormulationOptions,
    SolveStatus, SolverAdapter, SolverConfig,
};
use gec_core::{gas_flow_for_heat, ComfortBreakpoints, ParameterSet, ThermalDynamics};

fn solve(case: &ParameterSet) -> (DispatchModel, DispatchResult) {
    let model = DispatchModel::build(case, FormulationOptions::default()).expect("model builds");
    let outcome = ClarabelBranchAndBound
        .solve(&model, &SolverConfig::default())
        .expect("solver runs");
    let result = DispatchResult::extract(&model, case, &outcome).expect("solution present");
    (model, result)
}

fn small_case() -> ParameterSet {
    ParameterSet::reference_case(2).truncated(4)
}

#[test]
fn test_reference_case_solves() {
    let (_, result) = solve(&small_case());
    assert!(matches!(
        result.status,
        SolveStatus::Optimal | SolveStatus::TimeLimit
    ));
    assert_eq!(result.buses.len(), 3);
    assert_eq!(result.lines.len(), 2);
    assert_eq!(result.users.len(), 2);
    assert!(result.users.iter().all(|u| u.hp_power.len() == 4));

    let parts = result.costs.electricity + result.costs.gas + result.costs.comfort + result.costs.slack;
    assert!((parts - result.costs.total).abs() < 1e-9);
    assert!((result.objective - result.costs.total).abs() < 1e-4 * result.costs.total.abs().max(1.0));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["users"][1]["bus"], 2);
    assert_eq!(json["lines"][0]["loss"].as_array().unwrap().len(), 4);
}

#[test]
fn test_radial_balance() {
    let (_, result) = solve(&small_case());
    for (t, residual) in result.radial_balance_residual().iter().enumerate() {
        assert!(residual.abs() < 1e-6, "imbalance {residual} at t={t}");
    }
    // Night hours with positive load import from the grid
    assert!(result.grid_import().iter().all(|p| *p > 0.0));
}

#[test]
fn test_heat_pump_and_boiler_never_run_together() {
    let (_, result) = solve(&small_case());
    for user in &result.users {
        for t in 0..user.hp_on.len() {
            assert!(!(user.hp_on[t] && user.boiler_on[t]), "user {} both on at t={t}", user.user);
            if !user.hp_on[t] {
                assert!(user.hp_power[t].abs() < 1e-7);
            }
            if !user.boiler_on[t] {
                assert!(user.boiler_heat[t].abs() < 1e-7);
            }
        }
    }
}

#[test]
fn test_user_without_heat_pump_draws_no_heat_pump_power() {
    let mut case = small_case();
    case.users[1].owns_heat_pump = false;
    let (_, result) = solve(&case);
    let user = &result.users[1];
    assert!(user.hp_power.iter().all(|p| p.abs() < 1e-7));
    // Without a heat pump all heat comes from the boiler
    for t in 0..user.heat.len() {
        assert!((user.heat[t] - user.boiler_heat[t]).abs() < 1e-7);
    }
}

#[test]
fn test_ppd_follows_comfort_envelope() {
    let case = small_case();
    let (_, result) = solve(&case);
    for user in &result.users {
        for t in 0..user.ppd.len() {
            let expected = case.comfort.envelope(user.indoor_temp[t]).max(0.0);
            assert!(
                (user.ppd[t] - expected).abs() < 1e-4,
                "ppd {} vs envelope {} at t={t}",
                user.ppd[t],
                expected
            );
        }
    }
}

#[test]
fn test_boiler_gas_matches_heat() {
    let case = small_case();
    let (_, result) = solve(&case);
    let lhv = case.devices.gas_lhv_kwh_per_m3;
    for user in &result.users {
        for t in 0..user.boiler_gas.len() {
            let expected = gas_flow_for_heat(user.boiler_heat[t], lhv);
            assert!((user.boiler_gas[t] - expected).abs() < 1e-6);
        }
    }
}

#[test]
fn test_branch_cones_are_tight() {
    let case = ParameterSet::reference_case(2).truncated(2);
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let outcome = ClarabelBranchAndBound
        .solve(&model, &SolverConfig::default())
        .unwrap();
    let values = outcome.values.as_deref().expect("solution present");

    let checks = soc_tightness(&model, values);
    assert_eq!(checks.len(), 2 * 2);
    for check in checks {
        assert!(
            check.is_tight(1e-3),
            "line {} at t={} has gap {}",
            check.line,
            check.t,
            check.relative_gap
        );
    }
}

#[test]
fn test_single_household_feeder_cones_are_tight() {
    // Three buses, the only household at the feeder end
    let mut case = ParameterSet::reference_case(2).truncated(4);
    case.users.remove(0);
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let outcome = ClarabelBranchAndBound
        .solve(&model, &SolverConfig::default())
        .unwrap();
    let values = outcome.values.as_deref().expect("solution present");

    let checks = soc_tightness(&model, values);
    assert_eq!(checks.len(), 2 * 4);
    for check in checks {
        assert!(
            check.is_tight(1e-5),
            "line {} at t={} has gap {}",
            check.line,
            check.t,
            check.relative_gap
        );
    }
}

#[test]
fn test_state_space_dynamics_solve() {
    let mut case = ParameterSet::reference_case(1).truncated(2);
    case.thermal.dynamics = ThermalDynamics::reference_state_space();
    let (_, result) = solve(&case);
    assert!(result.users[0].indoor_temp.iter().all(|t| t.is_finite()));
}

#[test]
fn test_build_is_deterministic() {
    let case = small_case();
    let first = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let second = DispatchModel::build(&case, FormulationOptions::default()).unwrap();

    assert_eq!(first.stats(), second.stats());
    assert_eq!(first.constraints(), second.constraints());
    assert_eq!(first.objective(), second.objective());
    assert_eq!(first.variables().infos(), second.variables().infos());

    let config = SolverConfig::default();
    let a = ClarabelBranchAndBound.solve(&first, &config).unwrap();
    let b = ClarabelBranchAndBound.solve(&second, &config).unwrap();
    assert_eq!(a.status, b.status);
    assert_eq!(a.objective, b.objective);
    assert_eq!(a.nodes, b.nodes);
}

/// Small heating need against large device minimums: the relaxation turns
/// devices on fractionally and the search has to branch.
fn switching_case() -> ParameterSet {
    let mut case = ParameterSet::reference_case(1).truncated(4);
    case.devices.hp_min_mw = 4.9e-3;
    case.devices.boiler_min_mw = 14e-3;
    case.weather.ambient_c = vec![20.0; 4];
    case.thermal.initial_indoor_c = 21.0;
    case.prices.comfort_price = 5.0;
    case.comfort = ComfortBreakpoints::new(
        vec![19.0, 20.0, 21.0, 22.0, 23.0],
        vec![12.0, 8.0, 5.0, 8.0, 12.0],
    )
    .unwrap();
    case
}

#[test]
fn test_switching_case_branches_to_optimum() {
    let case = switching_case();
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let config = SolverConfig {
        mip_gap: 0.0,
        ..SolverConfig::default()
    };
    let outcome = ClarabelBranchAndBound.solve(&model, &config).unwrap();
    assert_eq!(outcome.status, SolveStatus::Optimal);
    assert!(outcome.nodes > 1);
    assert!(outcome.gap.unwrap() <= 1e-6);

    let result = DispatchResult::extract(&model, &case, &outcome).unwrap();
    let user = &result.users[0];
    for t in 0..4 {
        assert!(!(user.hp_on[t] && user.boiler_on[t]));
    }
}

#[test]
fn test_node_limit_reports_degraded_status() {
    let case = switching_case();
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let config = SolverConfig {
        mip_gap: 0.0,
        max_nodes: 1,
        ..SolverConfig::default()
    };
    let outcome = ClarabelBranchAndBound.solve(&model, &config).unwrap();
    assert_eq!(outcome.nodes, 1);
    assert_eq!(outcome.status, SolveStatus::Other("node limit reached".to_string()));
    // Any incumbent from the root rounding pass comes with an honest gap
    if outcome.has_solution() {
        assert!(outcome.gap.unwrap() > 0.0);
        assert!(outcome.best_bound.unwrap() <= outcome.objective.unwrap());
    }
}

fn congested_case() -> ParameterSet {
    // Forces an export at night, which no household can deliver
    let mut case = ParameterSet::reference_case(1).truncated(1);
    case.network.congestion.default_limit_mw = 0.01;
    case
}

#[test]
fn test_infeasible_case_reports_congestion_in_iis() {
    let case = congested_case();
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let config = SolverConfig::default();

    let outcome = ClarabelBranchAndBound.solve(&model, &config).unwrap();
    assert_eq!(outcome.status, SolveStatus::Infeasible);
    assert!(DispatchResult::extract(&model, &case, &outcome).is_err());

    let iis = ClarabelBranchAndBound.compute_iis(&model, &config).unwrap();
    assert!(iis.model_infeasible);
    assert!(iis.on_relaxation);
    assert!(iis.contains("congestion"));
    assert!(iis.len() < model.constraints().len());
}

#[test]
fn test_iis_of_feasible_model_is_empty() {
    let case = ParameterSet::reference_case(1).truncated(1);
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let iis = ClarabelBranchAndBound
        .compute_iis(&model, &SolverConfig::default())
        .unwrap();
    assert!(!iis.model_infeasible);
    assert!(iis.is_empty());
}

#[test]
fn test_soft_constraints_absorb_infeasibility() {
    let case = congested_case();
    let options = FormulationOptions {
        soft_constraints: Some(Default::default()),
        ..Default::default()
    };
    let model = DispatchModel::build(&case, options).unwrap();
    let outcome = ClarabelBranchAndBound
        .solve(&model, &SolverConfig::default())
        .unwrap();
    let result = DispatchResult::extract(&model, &case, &outcome).unwrap();

    // At least 0.01 MW of bus slack at 1e8 per MW
    assert!(result.costs.slack > 1e5, "slack cost {}", result.costs.slack);
}
