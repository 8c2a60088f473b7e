mod dataset;
mod model;
mod participant;
mod spec;

use std::sync::Arc;

use federation::{
    Metrics, Parameters, ParticipantId, RoundCoordinator, RoundEvent, StrategyBuilder,
};
use log::{info, warn};
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    dataset::Federation, model::LinearModel, participant::LinearParticipant, spec::SimulationSpec,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let SimulationSpec { run, data } = SimulationSpec::load()?;
    let federation = Federation::generate(&data, run.participants);
    info!(
        participants = run.participants, rounds = run.rounds.get(), features = data.features;
        "generated federation"
    );

    let held_out = Arc::new(federation.held_out);
    let features = data.features;
    let evaluate_fn = move |round: usize, params: &Parameters| -> Option<(f64, Metrics)> {
        let model = match LinearModel::from_parameters(params, features) {
            Ok(model) => model,
            Err(e) => {
                warn!(round = round; "skipping centralized evaluation: {e}");
                return None;
            }
        };
        let (mse, mae) = model.errors(held_out.x(), held_out.y());
        let metrics = Metrics::from([("mae".to_string(), mae.into())]);
        Some((mse, metrics))
    };

    let strategy = StrategyBuilder::new()
        .with_evaluate_fn(evaluate_fn)
        .build(run.strategy.clone())?;

    let partitions: Vec<_> = federation.partitions.into_iter().map(Arc::new).collect();
    let failure_rate = data.failure_rate;
    let factory = move |id: ParticipantId| {
        LinearParticipant::new(id, Arc::clone(&partitions[id]), features, failure_rate)
    };

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut coordinator = RoundCoordinator::new(run.rounds, run.participants, strategy, factory)
        .with_events(events_tx);

    if let Some(timeout) = run.call_timeout() {
        coordinator = coordinator.with_call_timeout(timeout);
    }

    let reporter = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let RoundEvent::Completed(summary) = event else {
                continue;
            };

            info!(
                round = summary.round,
                committed = summary.committed(),
                failures = summary.fit.failures.len();
                "round finished"
            );
        }
    });

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("received SIGINT, abandoning the current round");
            token.cancel();
        }
    });

    let outcome = coordinator.run(shutdown).await?;
    drop(coordinator);
    reporter.await?;

    for (round, loss) in outcome.history.losses_centralized() {
        info!(round = round, loss = loss; "centralized loss");
    }

    for (round, loss) in outcome.history.losses_distributed() {
        info!(round = round, loss = loss; "distributed loss");
    }

    let model = LinearModel::from_parameters(&outcome.parameters, features)?;
    info!(
        interrupted = outcome.interrupted, rounds = outcome.history.len();
        "run finished, truth {:?}, learned {:?}", federation.truth, model
    );

    Ok(())
}
