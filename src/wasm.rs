//! WASM bindings for browser integration.
//!
//! JSON in, JSON out: instruments, tunings and study settings use the same documents as
//! the native API.

#![cfg(target_arch = "wasm32")]

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::StudyConfig;
use crate::geometry::Instrument;
use crate::optimization::types::OptimizationOutcome;
use crate::tuning::Tuning;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn parse_inputs(
    instrument_json: &str,
    tuning_json: &str,
    config_json: &str,
) -> Result<(Instrument, Tuning, StudyConfig), JsValue> {
    let instrument = Instrument::from_json(instrument_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid instrument JSON: {}", e)))?;
    let tuning = Tuning::from_json(tuning_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid tuning JSON: {}", e)))?;
    let config = if config_json.trim().is_empty() {
        StudyConfig::default()
    } else {
        StudyConfig::from_json(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid study JSON: {}", e)))?
    };
    Ok((instrument, tuning, config))
}

/// Predict the playing frequency of every fingering.
///
/// # Arguments
/// * `instrument_json` - Instrument document
/// * `tuning_json` - Tuning document
/// * `config_json` - Study settings; empty for defaults
///
/// # Returns
/// JSON array of per-note evaluations
#[wasm_bindgen]
pub fn calculate_tuning(
    instrument_json: &str,
    tuning_json: &str,
    config_json: &str,
) -> Result<String, JsValue> {
    let (instrument, tuning, config) = parse_inputs(instrument_json, tuning_json, config_json)?;
    let notes = config
        .calculate_tuning(&instrument, &tuning)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_json::to_string(&notes)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[derive(Serialize)]
struct OptimizeResponse {
    success: bool,
    state: String,
    initial_norm: f64,
    final_norm: f64,
    evaluations: usize,
    message: Option<String>,
    instrument: Instrument,
}

impl OptimizeResponse {
    fn new(outcome: OptimizationOutcome, mut instrument: Instrument) -> Self {
        instrument.convert_to_length_type();
        Self {
            success: outcome.success(),
            state: format!("{:?}", outcome.state),
            initial_norm: outcome.initial_norm,
            final_norm: outcome.final_norm,
            evaluations: outcome.evaluations,
            message: outcome.message,
            instrument,
        }
    }
}

/// Optimize the instrument for the tuning with the study's objective and optimizer.
///
/// # Returns
/// JSON object with the run outcome and the resulting instrument (in its declared unit)
#[wasm_bindgen]
pub fn optimize(
    instrument_json: &str,
    tuning_json: &str,
    config_json: &str,
) -> Result<String, JsValue> {
    let (instrument, tuning, config) = parse_inputs(instrument_json, tuning_json, config_json)?;
    let (instrument, outcome) = config
        .optimize(instrument, tuning, None)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_json::to_string(&OptimizeResponse::new(outcome, instrument))
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
