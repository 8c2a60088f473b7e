use std::{any::Any, collections::HashMap, future::Future, time::Duration};

use log::{debug, warn};
use tokio::{
    task::{JoinError, JoinSet},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::participant::{self, Failure, ParticipantErr, ParticipantId};

/// The settled calls of one phase, both ordered by participant id.
pub(super) struct Collected<T> {
    pub results: Vec<(ParticipantId, T)>,
    pub failures: Vec<Failure>,
}

/// Runs every call concurrently and waits for all of them to settle.
///
/// Errors, timeouts and panics are turned into failures of the owning participant, they
/// never abort the rest of the calls.
///
/// # Arguments
/// * `calls` - One future per participant.
/// * `limit` - An optional time limit for each call.
/// * `shutdown` - Aborts the in flight calls once cancelled.
///
/// # Returns
/// The collected results or `None` if `shutdown` was cancelled first.
pub(super) async fn dispatch<T, F, I>(
    calls: I,
    limit: Option<Duration>,
    shutdown: &CancellationToken,
) -> Option<Collected<T>>
where
    I: IntoIterator<Item = (ParticipantId, F)>,
    F: Future<Output = participant::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut tasks = JoinSet::new();
    let mut owners = HashMap::new();

    for (participant, call) in calls {
        let handle = tasks.spawn(with_limit(call, limit));
        owners.insert(handle.id(), participant);
    }

    debug!(calls = owners.len(); "dispatched participant calls");

    let mut results = Vec::with_capacity(owners.len());
    let mut failures = Vec::new();

    loop {
        let joined = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tasks.abort_all();
                return None;
            }
            joined = tasks.join_next_with_id() => joined,
        };

        let Some(joined) = joined else {
            break;
        };

        let (task_id, outcome) = match joined {
            Ok((task_id, outcome)) => (task_id, outcome),
            Err(e) => (e.id(), Err(ParticipantErr::Aborted(describe(e)))),
        };

        let Some(&participant) = owners.get(&task_id) else {
            continue;
        };

        match outcome {
            Ok(res) => results.push((participant, res)),
            Err(error) => {
                warn!(participant = participant; "participant call failed: {error}");
                failures.push(Failure { participant, error });
            }
        }
    }

    results.sort_by_key(|(participant, _)| *participant);
    failures.sort_by_key(|failure| failure.participant);

    Some(Collected { results, failures })
}

async fn with_limit<T>(
    call: impl Future<Output = participant::Result<T>>,
    limit: Option<Duration>,
) -> participant::Result<T> {
    let Some(limit) = limit else {
        return call.await;
    };

    time::timeout(limit, call)
        .await
        .unwrap_or(Err(ParticipantErr::TimedOut(limit)))
}

fn describe(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }

    let payload: Box<dyn Any + Send> = e.into_panic();

    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
