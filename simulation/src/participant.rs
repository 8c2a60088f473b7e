use std::sync::Arc;

use async_trait::async_trait;
use federation::{
    Config, EvaluateRes, FitRes, Metrics, Parameters, Participant, ParticipantErr, ParticipantId,
    participant,
};
use log::debug;
use rand::Rng;
use tokio::task;

use crate::{dataset::Partition, model::LinearModel};

const DEFAULT_EPOCHS: i64 = 1;
const DEFAULT_LEARNING_RATE: f64 = 0.01;
const DEFAULT_BATCH_SIZE: i64 = 32;

/// A participant training a linear regressor over its own partition.
pub struct LinearParticipant {
    id: ParticipantId,
    partition: Arc<Partition>,
    features: usize,
    failure_rate: f64,
}

impl LinearParticipant {
    /// Creates a new `LinearParticipant`.
    ///
    /// # Arguments
    /// * `id` - The participant's id.
    /// * `partition` - The participant's private samples.
    /// * `features` - The amount of inputs of the model.
    /// * `failure_rate` - The chance of every fit or evaluate call to fail.
    ///
    /// # Returns
    /// A new `LinearParticipant` instance.
    pub fn new(
        id: ParticipantId,
        partition: Arc<Partition>,
        features: usize,
        failure_rate: f64,
    ) -> Self {
        Self {
            id,
            partition,
            features,
            failure_rate,
        }
    }

    /// Simulates an unreliable device.
    fn flaky(&self) -> participant::Result<()> {
        if self.failure_rate > 0. && rand::rng().random_bool(self.failure_rate.min(1.)) {
            return Err(ParticipantErr::failed(format!(
                "participant {} dropped out",
                self.id
            )));
        }

        Ok(())
    }
}

fn read_int(config: &Config, key: &str, default: i64) -> participant::Result<i64> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| ParticipantErr::failed(format!("invalid {key}: {v}"))),
    }
}

fn read_float(config: &Config, key: &str, default: f64) -> participant::Result<f64> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| ParticipantErr::failed(format!("invalid {key}: {v}"))),
    }
}

#[async_trait]
impl Participant for LinearParticipant {
    async fn get_parameters(&mut self, _config: &Config) -> participant::Result<Parameters> {
        LinearModel::zeros(self.features).into_parameters()
    }

    async fn fit(
        &mut self,
        parameters: &Parameters,
        config: &Config,
    ) -> participant::Result<FitRes> {
        self.flaky()?;

        let epochs = read_int(config, "local_epochs", DEFAULT_EPOCHS)?.max(0) as usize;
        let learning_rate = read_float(config, "learning_rate", DEFAULT_LEARNING_RATE)? as f32;
        let batch_size = read_int(config, "batch_size", DEFAULT_BATCH_SIZE)?.max(1) as usize;

        let mut model = LinearModel::from_parameters(parameters, self.features)?;
        let partition = Arc::clone(&self.partition);

        let (model, mse) = task::spawn_blocking(move || {
            for _ in 0..epochs {
                model.sgd_epoch(partition.x(), partition.y(), batch_size, learning_rate);
            }

            let (mse, _) = model.errors(partition.x(), partition.y());
            (model, mse)
        })
        .await
        .map_err(|e| ParticipantErr::Aborted(e.to_string()))?;

        debug!(participant = self.id, epochs = epochs, mse = mse; "local training finished");

        Ok(FitRes {
            parameters: model.into_parameters()?,
            num_samples: self.partition.len() as u64,
            metrics: Metrics::from([("mse".to_string(), mse.into())]),
        })
    }

    async fn evaluate(
        &mut self,
        parameters: &Parameters,
        _config: &Config,
    ) -> participant::Result<EvaluateRes> {
        self.flaky()?;

        let model = LinearModel::from_parameters(parameters, self.features)?;
        let (mse, mae) = model.errors(self.partition.x(), self.partition.y());

        Ok(EvaluateRes {
            loss: mse,
            num_samples: self.partition.len() as u64,
            metrics: Metrics::from([
                ("mse".to_string(), mse.into()),
                ("mae".to_string(), mae.into()),
            ]),
        })
    }
}
