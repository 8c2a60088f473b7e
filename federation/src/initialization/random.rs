use std::{cell::RefCell, rc::Rc};

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{ParamGen, Result, fans};

enum Init {
    Uniform(Uniform<f32>),
    Normal(Normal<f32>),
    XavierUniform,
    Kaiming,
}

/// A parameter generator that follows a certain probabilistic distribution.
///
/// Generators built from the same `rng` share its stream, so a seeded `rng` yields the same
/// parameters on every run regardless of how the generators are chained.
pub struct RandParamGen<R: Rng> {
    rng: Rc<RefCell<R>>,
    init: Init,
}

impl<R: Rng> RandParamGen<R> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: Rc<RefCell<R>>, low: f32, high: f32) -> Result<Self> {
        Ok(Self {
            rng,
            init: Init::Uniform(Uniform::new(low, high)?),
        })
    }

    /// Creates a new `RandParamGen` parameter generator with a normal distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(rng: Rc<RefCell<R>>, mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self {
            rng,
            init: Init::Normal(Normal::new(mean, std_dev)?),
        })
    }

    /// Creates a new `RandParamGen` parameter generator using Xavier uniform initialization,
    /// `U(-r, r)` with `r = sqrt(6 / (fan_in + fan_out))` taken from each tensor's shape.
    pub fn xavier_uniform(rng: Rc<RefCell<R>>) -> Self {
        Self {
            rng,
            init: Init::XavierUniform,
        }
    }

    /// Creates a new `RandParamGen` parameter generator using Kaiming normal initialization,
    /// `N(0, sqrt(2 / fan_in))` taken from each tensor's shape.
    pub fn kaiming(rng: Rc<RefCell<R>>) -> Self {
        Self {
            rng,
            init: Init::Kaiming,
        }
    }
}

fn draw<D: Distribution<f32>>(rng: &mut impl Rng, distribution: D, n: usize) -> Vec<f32> {
    distribution.sample_iter(rng).take(n).collect()
}

impl<R: Rng> ParamGen for RandParamGen<R> {
    fn sample(&mut self, shape: &[usize]) -> Result<Vec<f32>> {
        let n = shape.iter().product();
        let (fan_in, fan_out) = fans(shape);
        let mut rng = self.rng.borrow_mut();

        let sample = match &self.init {
            Init::Uniform(uniform) => draw(&mut *rng, uniform, n),
            Init::Normal(normal) => draw(&mut *rng, normal, n),
            Init::XavierUniform => {
                let range = (6. / (fan_in + fan_out) as f32).sqrt();
                draw(&mut *rng, Uniform::new(-range, range)?, n)
            }
            Init::Kaiming => {
                let std_dev = (2. / fan_in as f32).sqrt();
                draw(&mut *rng, Normal::new(0., std_dev)?, n)
            }
        };

        Ok(sample)
    }
}
