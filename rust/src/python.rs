//! Python bindings.
//!
//! Every function takes and returns JSON documents in the serde shapes of the
//! crate's types; errors are raised as `ValueError`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::baseline::{self, Baseline};
use crate::config::EngineConfig;
use crate::cpm::Scheduler;
use crate::progress::{ProgressEngine, ProgressUpdate};
use crate::snapshot::ScheduleSnapshot;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn load_config(config_json: Option<&str>) -> PyResult<EngineConfig> {
    match config_json {
        Some(json) => EngineConfig::from_json_str(json).map_err(value_error),
        None => Ok(EngineConfig::default()),
    }
}

fn load_snapshot(snapshot_json: &str) -> PyResult<ScheduleSnapshot> {
    serde_json::from_str(snapshot_json).map_err(value_error)
}

/// Schedule a snapshot.
///
/// # Returns
/// * JSON object with the scheduled `snapshot` and the run's `report`
///
/// # Raises
/// * ValueError on malformed input, a cyclic or dangling network, or a bad calendar
#[pyfunction]
#[pyo3(signature = (snapshot_json, config_json=None))]
fn schedule(snapshot_json: &str, config_json: Option<&str>) -> PyResult<String> {
    let config = load_config(config_json)?;
    let snapshot = load_snapshot(snapshot_json)?;
    let outcome = Scheduler::new(config.scheduler)
        .schedule(&snapshot)
        .map_err(value_error)?;
    serde_json::to_string(&outcome).map_err(value_error)
}

/// Apply a JSON list of progress updates and reschedule.
///
/// # Raises
/// * ValueError if any update is rejected; nothing is applied in that case
#[pyfunction]
#[pyo3(signature = (snapshot_json, updates_json, config_json=None))]
fn apply_progress(
    snapshot_json: &str,
    updates_json: &str,
    config_json: Option<&str>,
) -> PyResult<String> {
    let config = load_config(config_json)?;
    let snapshot = load_snapshot(snapshot_json)?;
    let updates: Vec<ProgressUpdate> = serde_json::from_str(updates_json).map_err(value_error)?;
    let outcome = ProgressEngine::new(config.scheduler)
        .apply(&snapshot, &updates)
        .map_err(value_error)?;
    serde_json::to_string(&outcome).map_err(value_error)
}

/// Capture a named baseline of a scheduled snapshot.
#[pyfunction]
fn capture_baseline(snapshot_json: &str, name: &str) -> PyResult<String> {
    let snapshot = load_snapshot(snapshot_json)?;
    let baseline = Baseline::capture(&snapshot, name).map_err(value_error)?;
    serde_json::to_string(&baseline).map_err(value_error)
}

/// Compare a scheduled snapshot against a baseline, returning the variance report.
#[pyfunction]
#[pyo3(signature = (baseline_json, snapshot_json, config_json=None))]
fn compare_baseline(
    baseline_json: &str,
    snapshot_json: &str,
    config_json: Option<&str>,
) -> PyResult<String> {
    let config = load_config(config_json)?;
    let baseline: Baseline = serde_json::from_str(baseline_json).map_err(value_error)?;
    let snapshot = load_snapshot(snapshot_json)?;
    let report = baseline::compare(&baseline, &snapshot, &config.variance).map_err(value_error)?;
    serde_json::to_string(&report).map_err(value_error)
}

/// The sitecpm Python module.
#[pymodule]
fn sitecpm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(schedule, m)?)?;
    m.add_function(wrap_pyfunction!(apply_progress, m)?)?;
    m.add_function(wrap_pyfunction!(capture_baseline, m)?)?;
    m.add_function(wrap_pyfunction!(compare_baseline, m)?)?;
    Ok(())
}
