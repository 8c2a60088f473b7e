mod common;

use common::{Call, Mode, factory, value_of};
use federation::{RoundCoordinator, RunSpec, Scalar, StrategyBuilder};
use tokio_util::sync::CancellationToken;

const SPEC: &str = r#"{
    "rounds": 3,
    "participants": 4,
    "call_timeout_ms": 2000,
    "strategy": {
        "fraction_evaluate": 0.5,
        "seed": 5,
        "fit_config": { "local_epochs": 1 },
        "fit_config_overrides": [{ "from_round": 2, "config": { "local_epochs": 2 } }],
        "evaluate_metrics": ["accuracy"],
        "server_optimizer": { "gradient_descent": { "learning_rate": 0.5 } },
        "initialization": {
            "shapes": [[1]],
            "param_gen": { "const": { "value": 0.0 } }
        }
    }
}"#;

#[tokio::test]
async fn spec_driven_run() {
    let spec = RunSpec::from_json(SPEC).unwrap();
    let (factory, _) = factory(vec![Mode::ok(4., 10); 4]);

    let timeout = spec.call_timeout();
    let strategy = StrategyBuilder::new().build(spec.strategy).unwrap();
    let mut coordinator = RoundCoordinator::new(spec.rounds, spec.participants, strategy, factory);
    if let Some(timeout) = timeout {
        coordinator = coordinator.with_call_timeout(timeout);
    }

    let outcome = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.history.len(), 3);

    // Half way towards the participants' average every round: 2, 3, 3.5.
    assert!((value_of(&outcome.parameters) - 3.5).abs() < 1e-6);

    for summary in &outcome.history.rounds {
        let evaluate = summary.evaluate.as_ref().unwrap();
        assert_eq!(evaluate.selected.len(), 2);

        let accuracy = evaluate.outcome.as_ref().unwrap().metrics["accuracy"].as_f64();
        assert!((accuracy.unwrap() - 0.4).abs() < 1e-9);
    }
}

#[tokio::test]
async fn spec_overrides_reach_participants() {
    let spec = RunSpec::from_json(SPEC).unwrap();
    let (factory, log) = factory(vec![Mode::ok(4., 10); 4]);

    let strategy = StrategyBuilder::new().build(spec.strategy.clone()).unwrap();
    let mut coordinator = RoundCoordinator::new(spec.rounds, spec.participants, strategy, factory);
    coordinator.run(CancellationToken::new()).await.unwrap();

    let epochs: Vec<_> = log
        .lock()
        .iter()
        .filter_map(|call| match call {
            Call::Fit(_, config) => Some(config["local_epochs"].clone()),
            _ => None,
        })
        .collect();

    // Every participant fits in each of the 3 rounds, the override starts at round 2.
    assert_eq!(epochs.len(), 12);
    assert!(epochs[..4].iter().all(|e| *e == Scalar::Int(1)));
    assert!(epochs[4..].iter().all(|e| *e == Scalar::Int(2)));
}
