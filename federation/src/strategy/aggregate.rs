use log::warn;
use rayon::prelude::*;

use super::AggregationErr;
use crate::parameters::{Parameters, Tensor};

/// Sample-count weighted element-wise average of many parameter sets.
///
/// For every tensor index `i`, `avg[i] = Σ(n_j × p_j[i]) / Σ n_j`. Results with zero samples
/// are skipped, sums are accumulated in `f64` and the tensors are averaged in parallel.
///
/// # Arguments
/// * `results` - Pairs of sample count and parameters.
///
/// # Returns
/// The averaged parameters, `AggregationErr::NoResults` if no result has a positive sample
/// count or `AggregationErr::ShapeMismatch` if the results don't share the same layout.
pub fn weighted_average(results: &[(u64, &Parameters)]) -> Result<Parameters, AggregationErr> {
    let eligible: Vec<_> = results.iter().filter(|(n, _)| *n > 0).collect();

    if eligible.len() < results.len() {
        warn!(
            "ignoring {} result(s) with zero samples",
            results.len() - eligible.len()
        );
    }

    let Some((_, first)) = eligible.first() else {
        return Err(AggregationErr::NoResults);
    };

    for (_, params) in &eligible[1..] {
        first.check_compatible(params)?;
    }

    let total: f64 = eligible.iter().map(|(n, _)| *n as f64).sum();

    let tensors = (0..first.len())
        .into_par_iter()
        .map(|i| {
            let reference = &first.tensors()[i];
            let mut acc = vec![0f64; reference.len()];

            for (n, params) in &eligible {
                let weight = *n as f64;
                let values = params.tensors()[i].data();

                acc.iter_mut()
                    .zip(values)
                    .for_each(|(a, v)| *a += weight * *v as f64);
            }

            let data = acc.into_iter().map(|a| (a / total) as f32).collect();
            Tensor::new(reference.shape().to_vec(), data)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Parameters::new(tensors))
}

/// Sample-count weighted average of scalar losses.
///
/// # Arguments
/// * `results` - Pairs of sample count and loss.
///
/// # Returns
/// The averaged loss or `AggregationErr::NoResults` if no result has a positive sample count.
pub fn weighted_loss(results: &[(u64, f64)]) -> Result<f64, AggregationErr> {
    let (weighted, total) = results
        .iter()
        .filter(|(n, _)| *n > 0)
        .fold((0., 0.), |(weighted, total), (n, loss)| {
            let n = *n as f64;
            (weighted + n * loss, total + n)
        });

    if total == 0. {
        return Err(AggregationErr::NoResults);
    }

    Ok(weighted / total)
}
