use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    dispatch::dispatch,
    history::{EvaluateReport, Evaluation, FitReport, History, RoundEvent, RoundSummary},
};
use crate::{
    error::{ConfigErr, RunErr},
    parameters::{ParameterStore, Parameters, StoreErr},
    participant::{ParticipantErr, ParticipantFactory, ParticipantId},
    scalar::Config,
    strategy::{AggregationErr, Instructions, Strategy},
};

/// The result of a run.
#[derive(Debug)]
pub struct RunOutcome {
    pub history: History,
    /// The last committed global parameters.
    pub parameters: Arc<Parameters>,
    /// Whether the run was cancelled before completing every round.
    pub interrupted: bool,
}

/// Drives a federated run, round after round.
///
/// Every round the strategy selects the participants, their fit calls run concurrently and
/// the results are aggregated into the next global parameters. The parameters are then
/// evaluated, on the server if the strategy can and on a selection of participants.
pub struct RoundCoordinator<S: Strategy> {
    rounds: NonZeroUsize,
    participants: usize,
    strategy: S,
    factory: Arc<dyn ParticipantFactory>,
    store: Arc<ParameterStore>,
    call_timeout: Option<Duration>,
    events: Option<mpsc::UnboundedSender<RoundEvent>>,
}

impl<S: Strategy> RoundCoordinator<S> {
    /// Creates a new `RoundCoordinator`.
    ///
    /// # Arguments
    /// * `rounds` - The amount of rounds to run.
    /// * `participants` - The size of the participant universe, ids go from `0` to `participants - 1`.
    /// * `strategy` - Decides the selections, configs and aggregations.
    /// * `factory` - Creates a participant for every call.
    ///
    /// # Returns
    /// A new `RoundCoordinator` instance.
    pub fn new<F>(rounds: NonZeroUsize, participants: usize, strategy: S, factory: F) -> Self
    where
        F: ParticipantFactory + 'static,
    {
        Self {
            rounds,
            participants,
            strategy,
            factory: Arc::new(factory),
            store: Arc::new(ParameterStore::new()),
            call_timeout: None,
            events: None,
        }
    }

    /// Limits how long every single participant call may take.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Publishes the progress of the run on `events`.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<RoundEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns the store holding the global parameters.
    pub fn store(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.store)
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Runs every round.
    ///
    /// # Arguments
    /// * `shutdown` - Interrupts the run, the round in progress is abandoned.
    ///
    /// # Returns
    /// The run's outcome, or a `RunErr` if it couldn't start.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<RunOutcome, RunErr> {
        if self.participants == 0 {
            return Err(ConfigErr::NoParticipants.into());
        }

        self.strategy.validate(self.participants)?;

        let ids: Vec<ParticipantId> = (0..self.participants).collect();

        let initial = match self.strategy.initialize_parameters() {
            Some(parameters) => parameters,
            None => self.fetch_initial(ids[0], &shutdown).await?,
        };

        let initial = self.store.initialize(initial)?;
        info!(
            tensors = initial.len(), numel = initial.numel();
            "initialized global parameters"
        );

        let mut history = History {
            initial: self.centralized(0, &initial),
            rounds: Vec::with_capacity(self.rounds.get()),
        };

        let mut interrupted = false;

        for round in 1..=self.rounds.get() {
            if shutdown.is_cancelled() {
                interrupted = true;
                break;
            }

            info!(round = round; "round started");
            self.publish(RoundEvent::Started { round });

            let Some(summary) = self.run_round(round, &ids, &shutdown).await? else {
                warn!(round = round; "shutdown requested, abandoning round");
                interrupted = true;
                break;
            };

            info!(
                round = round, committed = summary.committed();
                "round completed"
            );

            self.publish(RoundEvent::Completed(summary.clone()));
            history.rounds.push(summary);
        }

        let parameters = self.current()?;

        Ok(RunOutcome {
            history,
            parameters,
            interrupted,
        })
    }

    /// Asks a participant for its parameters, used when the strategy doesn't provide
    /// the initial ones.
    async fn fetch_initial(
        &self,
        participant: ParticipantId,
        shutdown: &CancellationToken,
    ) -> Result<Parameters, RunErr> {
        info!(participant = participant; "requesting initial parameters from participant");

        let factory = Arc::clone(&self.factory);
        let call = async move {
            let config = Config::new();
            factory.make(participant).get_parameters(&config).await
        };

        let collected = dispatch([(participant, call)], self.call_timeout, shutdown).await;
        let Some(mut collected) = collected else {
            return Err(RunErr::Initialization(ParticipantErr::Aborted(
                "shutdown requested".to_string(),
            )));
        };

        if let Some(failure) = collected.failures.pop() {
            return Err(RunErr::Initialization(failure.error));
        }

        collected
            .results
            .pop()
            .map(|(_, parameters)| parameters)
            .ok_or_else(|| {
                RunErr::Initialization(ParticipantErr::failed("no initial parameters returned"))
            })
    }

    /// Runs the fit and evaluate phases of a round.
    ///
    /// The aggregated parameters are evaluated first and only committed once the whole round
    /// is done, a cancelled round leaves the store untouched.
    ///
    /// # Returns
    /// The round's summary or `None` if `shutdown` was cancelled during the round.
    async fn run_round(
        &mut self,
        round: usize,
        ids: &[ParticipantId],
        shutdown: &CancellationToken,
    ) -> Result<Option<RoundSummary>, RunErr> {
        let current = self.current()?;

        let instructions = self.strategy.configure_fit(round, &current, ids)?;
        let Some((fit, next)) = self.fit(round, &current, instructions, shutdown).await else {
            return Ok(None);
        };

        let parameters = next.unwrap_or(current);
        let centralized = self.centralized(round, &parameters);

        let evaluate = match self.strategy.configure_evaluate(round, &parameters, ids)? {
            Some(instructions) => {
                let Some(report) = self
                    .evaluate(round, &parameters, instructions, shutdown)
                    .await
                else {
                    return Ok(None);
                };
                Some(report)
            }
            None => None,
        };

        if fit.outcome.is_ok() {
            self.store.replace(Arc::unwrap_or_clone(parameters))?;
        }

        Ok(Some(RoundSummary {
            round,
            fit,
            centralized,
            evaluate,
        }))
    }

    /// Dispatches the fit calls of a round and aggregates them.
    ///
    /// # Returns
    /// The phase report and the aggregated parameters, if any, or `None` on shutdown.
    async fn fit(
        &mut self,
        round: usize,
        current: &Arc<Parameters>,
        instructions: Instructions,
        shutdown: &CancellationToken,
    ) -> Option<(FitReport, Option<Arc<Parameters>>)> {
        let Instructions {
            participants: selected,
            config,
        } = instructions;

        if selected.is_empty() {
            warn!(round = round; "no participants selected for fit");
            let report = FitReport {
                selected,
                succeeded: 0,
                failures: Vec::new(),
                outcome: Err(AggregationErr::NothingSelected),
            };
            return Some((report, None));
        }

        debug!(round = round, selected = selected.len(); "dispatching fit");

        let config = Arc::new(config);
        let calls = selected.iter().map(|&participant| {
            let factory = Arc::clone(&self.factory);
            let parameters = Arc::clone(current);
            let config = Arc::clone(&config);

            let call = async move {
                let res = factory.make(participant).fit(&parameters, &config).await?;
                parameters.check_compatible(&res.parameters)?;
                Ok::<_, ParticipantErr>(res)
            };

            (participant, call)
        });

        let collected = dispatch(calls, self.call_timeout, shutdown).await?;
        let succeeded = collected.results.len();

        let aggregated = self
            .strategy
            .aggregate_fit(round, collected.results, &collected.failures)
            .and_then(|(parameters, metrics)| {
                current
                    .check_compatible(&parameters)
                    .map_err(StoreErr::from)?;
                Ok((parameters, metrics))
            });

        let (outcome, next) = match aggregated {
            Ok((parameters, metrics)) => {
                debug!(round = round, results = succeeded; "aggregated fit results");
                (Ok(metrics), Some(Arc::new(parameters)))
            }
            Err(e) => {
                warn!(round = round; "fit aggregation skipped, keeping previous parameters: {e}");
                (Err(e), None)
            }
        };

        let report = FitReport {
            selected,
            succeeded,
            failures: collected.failures,
            outcome,
        };

        Some((report, next))
    }

    /// Dispatches the evaluate calls of a round and aggregates them.
    ///
    /// # Returns
    /// The phase report or `None` on shutdown.
    async fn evaluate(
        &mut self,
        round: usize,
        parameters: &Arc<Parameters>,
        instructions: Instructions,
        shutdown: &CancellationToken,
    ) -> Option<EvaluateReport> {
        let Instructions {
            participants: selected,
            config,
        } = instructions;

        if selected.is_empty() {
            warn!(round = round; "no participants selected for evaluation");
            return Some(EvaluateReport {
                selected,
                succeeded: 0,
                failures: Vec::new(),
                outcome: Err(AggregationErr::NothingSelected),
            });
        }

        debug!(round = round, selected = selected.len(); "dispatching evaluate");

        let config = Arc::new(config);
        let calls = selected.iter().map(|&participant| {
            let factory = Arc::clone(&self.factory);
            let parameters = Arc::clone(parameters);
            let config = Arc::clone(&config);

            let call = async move {
                factory
                    .make(participant)
                    .evaluate(&parameters, &config)
                    .await
            };

            (participant, call)
        });

        let collected = dispatch(calls, self.call_timeout, shutdown).await?;
        let succeeded = collected.results.len();

        let outcome = self
            .strategy
            .aggregate_evaluate(round, collected.results, &collected.failures)
            .map(Evaluation::from);

        match &outcome {
            Ok(evaluation) => info!(round = round, loss = evaluation.loss; "distributed evaluation"),
            Err(e) => warn!(round = round; "evaluation aggregation skipped: {e}"),
        }

        Some(EvaluateReport {
            selected,
            succeeded,
            failures: collected.failures,
            outcome,
        })
    }

    fn centralized(&mut self, round: usize, parameters: &Parameters) -> Option<Evaluation> {
        let evaluation = Evaluation::from(self.strategy.evaluate(round, parameters)?);
        info!(round = round, loss = evaluation.loss; "centralized evaluation");
        Some(evaluation)
    }

    fn current(&self) -> Result<Arc<Parameters>, StoreErr> {
        self.store.current().ok_or(StoreErr::Uninitialized)
    }

    fn publish(&self, event: RoundEvent) {
        let Some(events) = &self.events else {
            return;
        };

        if events.send(event).is_err() {
            debug!("round event receiver dropped");
        }
    }
}
