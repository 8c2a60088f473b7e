use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, StandardNormal, Uniform};

use crate::{model::LinearModel, spec::DataSpec};

/// The private samples of a participant.
#[derive(Debug, Clone)]
pub struct Partition {
    x: Array2<f32>,
    y: Array1<f32>,
}

impl Partition {
    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<'_, f32> {
        self.y.view()
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }
}

/// Generates `n` noisy samples of `truth`.
fn sample<R: Rng>(
    rng: &mut R,
    truth: &LinearModel,
    features: usize,
    n: usize,
    noise: f32,
) -> Partition {
    let x = Array2::<f32>::from_shape_simple_fn((n, features), || StandardNormal.sample(rng));
    let y = truth.predict(x.view());

    let y = match Normal::new(0., noise) {
        Ok(dist) => y.mapv(|v| v + dist.sample(rng)),
        Err(_) => y,
    };

    Partition { x, y }
}

/// The synthetic regression problem shared by every participant.
pub struct Federation {
    pub truth: LinearModel,
    pub partitions: Vec<Partition>,
    /// Samples no participant holds, used for centralized evaluation.
    pub held_out: Partition,
}

impl Federation {
    /// Generates a federation of `participants` partitions of varying size.
    pub fn generate(spec: &DataSpec, participants: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(spec.seed);

        let weights =
            Array1::<f32>::from_shape_simple_fn(spec.features, || StandardNormal.sample(&mut rng));
        let truth = LinearModel::new(weights, rng.random_range(-1.0..1.0));

        let min = spec.min_samples.max(1);
        let max = spec.max_samples.max(min);
        let sizes: Vec<usize> = match Uniform::new_inclusive(min, max) {
            Ok(sizes) => sizes.sample_iter(&mut rng).take(participants).collect(),
            Err(_) => vec![min; participants],
        };

        let partitions = sizes
            .into_iter()
            .map(|n| sample(&mut rng, &truth, spec.features, n, spec.noise))
            .collect();

        let held_out = sample(&mut rng, &truth, spec.features, spec.held_out, spec.noise);

        Self {
            truth,
            partitions,
            held_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> DataSpec {
        DataSpec {
            features: 3,
            min_samples: 10,
            max_samples: 50,
            held_out: 20,
            ..DataSpec::default()
        }
    }

    #[test]
    fn partitions_follow_the_spec() {
        let federation = Federation::generate(&spec(), 6);

        assert_eq!(federation.partitions.len(), 6);
        assert_eq!(federation.held_out.len(), 20);

        for partition in &federation.partitions {
            assert!((10..=50).contains(&partition.len()));
            assert_eq!(partition.x().ncols(), 3);
        }
    }

    #[test]
    fn seeded_generation_repeats() {
        let a = Federation::generate(&spec(), 4);
        let b = Federation::generate(&spec(), 4);

        assert_eq!(a.truth, b.truth);
        assert_eq!(a.partitions[3].y(), b.partitions[3].y());
    }
}
