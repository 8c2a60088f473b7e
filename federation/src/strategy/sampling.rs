use rand::{SeedableRng, rngs::StdRng, seq::index};

use crate::{error::ConfigErr, participant::ParticipantId};

/// Slack allowed when rounding `fraction × available` up, so that `0.3 × 10` asks for 3
/// participants and not 4.
const CEIL_EPSILON: f64 = 1e-9;

/// Draws the participants of a round.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Creates a new `Sampler`.
    ///
    /// # Arguments
    /// * `seed` - An optional seed, the same seed always yields the same selections.
    ///
    /// # Returns
    /// A new `Sampler` instance.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self { rng }
    }

    /// Returns the size of a selection, `clamp(ceil(fraction × available), minimum, available)`.
    ///
    /// # Arguments
    /// * `available` - The amount of participants to select from.
    /// * `fraction` - The fraction of `available` to select.
    /// * `minimum` - The least amount of participants to select.
    ///
    /// # Returns
    /// The selection size or a `ConfigErr` if the constraints can't be satisfied.
    pub fn selection_size(
        available: usize,
        fraction: f64,
        minimum: usize,
    ) -> Result<usize, ConfigErr> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigErr::InvalidFraction(fraction));
        }

        if minimum > available {
            return Err(ConfigErr::UnsatisfiableSelection { minimum, available });
        }

        let wanted = (fraction * available as f64 - CEIL_EPSILON).ceil().max(0.) as usize;
        Ok(wanted.clamp(minimum, available))
    }

    /// Selects distinct participants uniformly at random, without replacement.
    ///
    /// # Arguments
    /// * `available` - The ids to select from.
    /// * `fraction` - The fraction of `available` to select.
    /// * `minimum` - The least amount of participants to select.
    ///
    /// # Returns
    /// The selected ids in ascending order or a `ConfigErr` if `minimum` exceeds the amount
    /// of available participants or `fraction` isn't within `[0, 1]`.
    pub fn select(
        &mut self,
        available: &[ParticipantId],
        fraction: f64,
        minimum: usize,
    ) -> Result<Vec<ParticipantId>, ConfigErr> {
        let k = Self::selection_size(available.len(), fraction, minimum)?;

        let mut selected: Vec<_> = if k == available.len() {
            available.to_vec()
        } else {
            index::sample(&mut self.rng, available.len(), k)
                .into_iter()
                .map(|i| available[i])
                .collect()
        };

        selected.sort_unstable();
        selected.dedup();
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ids(n: usize) -> Vec<ParticipantId> {
        (0..n).collect()
    }

    #[test]
    fn full_fraction_selects_everyone() {
        let mut sampler = Sampler::new(Some(7));

        for _ in 0..20 {
            let selected = sampler.select(&ids(10), 1.0, 10).unwrap();
            assert_eq!(selected, ids(10));
        }
    }

    #[test]
    fn size_bounds() {
        let mut sampler = Sampler::new(Some(1));
        let available = ids(50);

        for (fraction, minimum) in [(0.0, 0), (0.0, 3), (0.1, 2), (0.33, 5), (0.5, 40), (1.0, 0)] {
            let selected = sampler.select(&available, fraction, minimum).unwrap();
            let expected = Sampler::selection_size(50, fraction, minimum).unwrap();

            assert_eq!(selected.len(), expected);
            assert!(selected.len() >= minimum);
            assert!(selected.len() <= available.len());

            let distinct: HashSet<_> = selected.iter().collect();
            assert_eq!(distinct.len(), selected.len());
            assert!(selected.iter().all(|id| available.contains(id)));
        }
    }

    #[test]
    fn ceil_ignores_float_noise() {
        assert_eq!(Sampler::selection_size(10, 0.3, 0).unwrap(), 3);
        assert_eq!(Sampler::selection_size(10, 0.31, 0).unwrap(), 4);
        assert_eq!(Sampler::selection_size(3, 0.5, 0).unwrap(), 2);
        assert_eq!(Sampler::selection_size(0, 1.0, 0).unwrap(), 0);
    }

    #[test]
    fn unsatisfiable_minimum_fails() {
        let mut sampler = Sampler::new(Some(0));

        for _ in 0..3 {
            let err = sampler.select(&ids(4), 1.0, 5).unwrap_err();
            assert_eq!(
                err,
                ConfigErr::UnsatisfiableSelection {
                    minimum: 5,
                    available: 4
                }
            );
        }
    }

    #[test]
    fn invalid_fraction_fails() {
        let mut sampler = Sampler::new(Some(0));

        assert!(sampler.select(&ids(4), 1.5, 0).is_err());
        assert!(sampler.select(&ids(4), -0.1, 0).is_err());
        assert!(sampler.select(&ids(4), f64::NAN, 0).is_err());
    }

    #[test]
    fn seeded_selection_is_deterministic() {
        let available = ids(100);
        let mut a = Sampler::new(Some(42));
        let mut b = Sampler::new(Some(42));

        for _ in 0..5 {
            assert_eq!(
                a.select(&available, 0.2, 1).unwrap(),
                b.select(&available, 0.2, 1).unwrap()
            );
        }
    }

    #[test]
    fn selection_maps_through_given_ids() {
        let available = vec![10, 20, 30, 40];
        let mut sampler = Sampler::new(Some(3));

        let selected = sampler.select(&available, 0.5, 1).unwrap();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|id| available.contains(id)));
    }
}
