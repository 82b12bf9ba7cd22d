use std::fs;

use gec_algo::{
    ClarabelBranchAndBound, DispatchModel, DispatchResult, FormulationOptions, SolverAdapter,
    SolverConfig,
};
use gec_core::ParameterSet;
use gec_io::{load_parameters, write_artifacts, OutputConfig};
use tempfile::tempdir;

fn config(dir: &std::path::Path) -> OutputConfig {
    OutputConfig {
        output_dir: dir.to_path_buf(),
        output_name: "run".to_string(),
        save_model: true,
        save_solution: true,
        save_iis: true,
    }
}

#[test]
fn test_solved_run_writes_all_artifacts() {
    let dir = tempdir().unwrap();
    let case = ParameterSet::reference_case(1).truncated(2);
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let outcome = ClarabelBranchAndBound
        .solve(&model, &SolverConfig::default())
        .unwrap();
    let result = DispatchResult::extract(&model, &case, &outcome).unwrap();

    let config = config(dir.path());
    let artifacts = write_artifacts(&config, &model, &outcome, Some(&result), None).unwrap();
    assert_eq!(artifacts.written.len(), 5);
    assert!(!config.output_path(".ilp").exists());

    let lp = fs::read_to_string(config.output_path(".lp")).unwrap();
    assert!(lp.contains("Minimize"));
    assert!(lp.contains("Subject To"));
    assert!(lp.contains("network.branch_cone"));
    assert!(lp.contains("Binaries"));
    assert!(lp.trim_end().ends_with("End"));

    let sol = fs::read_to_string(config.output_path(".sol")).unwrap();
    assert!(sol.starts_with("# Objective value"));
    assert_eq!(sol.lines().count(), model.variables().len() + 1);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.output_path(".json")).unwrap()).unwrap();
    assert!(json["costs"]["total"].is_number());

    // Header plus one row per user and step
    let users = fs::read_to_string(config.output_path("_users.csv")).unwrap();
    assert_eq!(users.lines().count(), 1 + 2);
    assert!(users.starts_with("t,user,bus,hp_power_mw"));
    let buses = fs::read_to_string(config.output_path("_buses.csv")).unwrap();
    assert_eq!(buses.lines().count(), 1 + 2 * 2);
}

#[test]
fn test_infeasible_run_writes_iis() {
    let dir = tempdir().unwrap();
    let mut case = ParameterSet::reference_case(1).truncated(1);
    case.network.congestion.default_limit_mw = 0.01;
    let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
    let solver_config = SolverConfig::default();
    let outcome = ClarabelBranchAndBound.solve(&model, &solver_config).unwrap();
    assert!(!outcome.has_solution());
    let iis = ClarabelBranchAndBound
        .compute_iis(&model, &solver_config)
        .unwrap();

    let config = config(dir.path());
    let artifacts = write_artifacts(&config, &model, &outcome, None, Some(&iis)).unwrap();
    assert_eq!(artifacts.written, vec![config.output_path(".lp"), config.output_path(".ilp")]);

    let ilp = fs::read_to_string(config.output_path(".ilp")).unwrap();
    assert!(ilp.contains("network.congestion"));
    assert!(ilp.contains("continuous relaxation"));
}

#[test]
fn test_loader_reads_written_parameters() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");
    let case = ParameterSet::reference_case(3).truncated(12);
    fs::write(&path, serde_json::to_string_pretty(&case).unwrap()).unwrap();

    let loaded = load_parameters(&path).unwrap();
    assert_eq!(loaded.n_users(), 3);
    assert_eq!(loaded.weather.ambient_c.len(), 12);
}
