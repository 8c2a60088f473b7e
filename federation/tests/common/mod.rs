#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use federation::{
    Config, EvaluateRes, FitRes, Metrics, Parameters, Participant, ParticipantErr, ParticipantId,
    Scalar, Tensor, participant,
};
use parking_lot::Mutex;

/// How a mock participant answers its calls.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Returns `[value]` trained on `samples` samples after `delay`.
    Ok {
        value: f32,
        samples: u64,
        delay: Duration,
    },
    Fail,
    Panic,
    /// Sleeps way past any reasonable timeout.
    Hang,
    /// Returns a parameter layout that doesn't match the global one.
    WrongShape,
}

impl Mode {
    pub fn ok(value: f32, samples: u64) -> Self {
        Self::Ok {
            value,
            samples,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(value: f32, samples: u64, delay_ms: u64) -> Self {
        Self::Ok {
            value,
            samples,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// A single call received by a mock participant.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetParameters(ParticipantId),
    Fit(ParticipantId, Config),
    Evaluate(ParticipantId, Config),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct MockParticipant {
    id: ParticipantId,
    mode: Mode,
    log: CallLog,
}

pub fn scalar_params(value: f32) -> Parameters {
    Parameters::new(vec![Tensor::from_vec(vec![value])])
}

/// Returns the only value of a single scalar parameter set.
pub fn value_of(params: &Parameters) -> f32 {
    params.tensors()[0].data()[0]
}

/// Builds a participant factory following `modes`, one per participant id.
pub fn factory(
    modes: Vec<Mode>,
) -> (
    impl Fn(ParticipantId) -> MockParticipant + Send + Sync + 'static,
    CallLog,
) {
    let log = CallLog::default();
    let factory_log = Arc::clone(&log);

    let factory = move |id| MockParticipant {
        id,
        mode: modes[id].clone(),
        log: Arc::clone(&factory_log),
    };

    (factory, log)
}

impl MockParticipant {
    async fn answer(&self) -> participant::Result<(f32, u64)> {
        match &self.mode {
            Mode::Ok {
                value,
                samples,
                delay,
            } => {
                tokio::time::sleep(*delay).await;
                Ok((*value, *samples))
            }
            Mode::Fail => Err(ParticipantErr::failed("local data unavailable")),
            Mode::Panic => panic!("participant {} diverged", self.id),
            Mode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok((0., 0))
            }
            Mode::WrongShape => Ok((0., 1)),
        }
    }
}

#[async_trait]
impl Participant for MockParticipant {
    async fn get_parameters(&mut self, _config: &Config) -> participant::Result<Parameters> {
        self.log.lock().push(Call::GetParameters(self.id));
        Ok(scalar_params(100. + self.id as f32))
    }

    async fn fit(
        &mut self,
        _parameters: &Parameters,
        config: &Config,
    ) -> participant::Result<FitRes> {
        self.log.lock().push(Call::Fit(self.id, config.clone()));
        let (value, num_samples) = self.answer().await?;

        let parameters = match self.mode {
            Mode::WrongShape => Parameters::new(vec![Tensor::from_vec(vec![0., 0.])]),
            _ => scalar_params(value),
        };

        Ok(FitRes {
            parameters,
            num_samples,
            metrics: Metrics::from([("train_loss".to_string(), Scalar::Float(value as f64))]),
        })
    }

    async fn evaluate(
        &mut self,
        _parameters: &Parameters,
        config: &Config,
    ) -> participant::Result<EvaluateRes> {
        self.log.lock().push(Call::Evaluate(self.id, config.clone()));
        let (value, num_samples) = self.answer().await?;

        Ok(EvaluateRes {
            loss: value as f64,
            num_samples,
            metrics: Metrics::from([("accuracy".to_string(), Scalar::Float(value as f64 / 10.))]),
        })
    }
}
