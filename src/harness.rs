use std::time::Instant;

use crate::catalog::QueryTemplate;
use crate::error::ProbeError;
use crate::params::ParameterBinding;
use crate::schema::{ColdHotBindingResult, PlainBindingResult};
use crate::session::QuerySession;

/// Executes one bound query to completion and returns elapsed seconds.
///
/// The clock covers issuing the query and draining every row. Failures are
/// returned as-is; a failed probe never yields a timing.
pub fn time_query<S: QuerySession + ?Sized>(
    session: &mut S,
    template: &QueryTemplate,
    binding: &ParameterBinding,
) -> Result<f64, ProbeError> {
    let start = Instant::now();
    session.run_to_completion(&template.text, binding)?;
    Ok(start.elapsed().as_secs_f64())
}

/// Arithmetic mean; an empty slice yields 0.0.
pub fn mean(values: &[f64]) -> f64 {
    let denom = values.len().max(1) as f64;
    values.iter().sum::<f64>() / denom
}

/// `runs` timed executions, no distinction between first and later ones.
pub fn measure_plain<S: QuerySession + ?Sized>(
    session: &mut S,
    template: &QueryTemplate,
    binding: &ParameterBinding,
    runs: usize,
) -> Result<PlainBindingResult, ProbeError> {
    let mut times = Vec::with_capacity(runs);
    for _ in 0..runs {
        times.push(time_query(session, template, binding)?);
    }
    Ok(PlainBindingResult {
        params: binding.clone(),
        mean: mean(&times),
        runs: times,
    })
}

/// One cold execution followed by `runs` hot ones.
pub fn measure_cold_hot<S: QuerySession + ?Sized>(
    session: &mut S,
    template: &QueryTemplate,
    binding: &ParameterBinding,
    runs: usize,
) -> Result<ColdHotBindingResult, ProbeError> {
    let cold_time = time_query(session, template, binding)?;
    let mut hot_times = Vec::with_capacity(runs);
    for _ in 0..runs {
        hot_times.push(time_query(session, template, binding)?);
    }
    Ok(ColdHotBindingResult {
        params: binding.clone(),
        cold_time,
        hot_mean: mean(&hot_times),
        hot_times,
    })
}
