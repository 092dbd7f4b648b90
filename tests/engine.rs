//! Tests for the execution engine on hand-built graphs.
mod common;
use common::*;
use protograph::catalog::ConditionBlock;
use protograph::prelude::*;

fn set_time_step() -> Operation {
    Operation::SetTimeStep {
        interval: Time::from_secs(1.0),
    }
}

fn shake(container: &str) -> Operation {
    Operation::Shake {
        container: container.to_string(),
        frequency: q("5Hz"),
    }
}

fn assign(variable: &str, value: Expression) -> Operation {
    Operation::AssignVariable {
        variable: variable.to_string(),
        value,
    }
}

fn check(block: ConditionBlock) -> Operation {
    Operation::EvaluateCondition { block }
}

#[test]
fn test_join_runs_once_after_its_side_chain() {
    // start -> tick, start -> shake -> tick: the side chain runs first, the tick once.
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let tick = builder.add_node(Operation::Tick);
    let side = builder.add_node(shake("A"));
    builder
        .add_edge(start, tick, Predicate::Always)
        .add_edge(start, side, Predicate::Always)
        .add_edge(side, tick, Predicate::Always);
    let graph = builder.build().unwrap();

    let mut recorder = CommandRecorder::new();
    let summary = ExecutionEngine::new(&graph).run(&mut recorder).unwrap();
    assert_eq!(
        recorder.stream(),
        "setTimeStep(1000ms);shake(A,5Hz);timeStep();"
    );
    assert_eq!(summary.nodes_executed, 3);
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.elapsed, Time::from_secs(1.0));
}

#[test]
fn test_later_edges_run_first() {
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let a = builder.add_node(shake("A"));
    let b = builder.add_node(shake("B"));
    builder
        .add_edge(start, a, Predicate::Always)
        .add_edge(start, b, Predicate::Always);
    let graph = builder.build().unwrap();

    let mut recorder = CommandRecorder::new();
    ExecutionEngine::new(&graph).run(&mut recorder).unwrap();
    assert_eq!(
        recorder.stream(),
        "setTimeStep(1000ms);shake(B,5Hz);shake(A,5Hz);"
    );
}

fn counting_loop(limit: f64) -> ProtocolGraph {
    let mut builder = GraphBuilder::new(Time::from_millis(250.0));
    let start = builder.add_node(set_time_step());
    let init = builder.add_node(assign("n", num(0.0)));
    let guard = builder.add_node(check(ConditionBlock::Loop));
    let step = builder.add_node(assign("n", var("n").plus(num(1.0))));
    let tick = builder.add_node(Operation::Tick);
    let done = builder.add_node(shake("A"));
    let condition = var("n").less_than(num(limit));
    builder
        .add_edge(start, init, Predicate::Always)
        .add_edge(init, guard, Predicate::Always)
        .add_edge(guard, step, Predicate::When(condition.clone()))
        .add_edge(guard, done, Predicate::When(condition.not()))
        .add_edge(step, tick, Predicate::Always)
        .add_edge(tick, guard, Predicate::Always);
    builder.build().unwrap()
}

#[test]
fn test_loop_reenters_until_condition_fails() {
    let graph = counting_loop(3.0);
    let mut recorder = CommandRecorder::new();
    let summary = ExecutionEngine::new(&graph).run(&mut recorder).unwrap();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.elapsed, Time::from_millis(750.0));
    assert_eq!(
        recorder.stream(),
        format!("setTimeStep(1000ms);{}shake(A,5Hz);", t(3))
    );
}

#[test]
fn test_step_limit_stops_runaway_loops() {
    let graph = counting_loop(f64::INFINITY);
    let options = ExecutionOptions {
        max_steps: Some(10),
        ..ExecutionOptions::default()
    };
    let result = ExecutionEngine::new(&graph)
        .with_options(options)
        .run(&mut CommandRecorder::new());
    assert_eq!(result.unwrap_err(), ExecutionError::StepLimitExceeded(10));
}

fn ambiguous_branch() -> ProtocolGraph {
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let guard = builder.add_node(check(ConditionBlock::Branch));
    let a = builder.add_node(shake("A"));
    let b = builder.add_node(shake("B"));
    builder
        .add_edge(start, guard, Predicate::Always)
        .add_edge(guard, a, Predicate::When(Expression::boolean(true)))
        .add_edge(guard, b, Predicate::When(num(1.0).equals(num(1.0))));
    builder.build().unwrap()
}

#[test]
fn test_ambiguous_branch_is_reported_and_followed() {
    let graph = ambiguous_branch();
    let mut recorder = CommandRecorder::new();
    ExecutionEngine::new(&graph).run(&mut recorder).unwrap();
    assert_eq!(
        recorder.stream(),
        "setTimeStep(1000ms);shake(B,5Hz);shake(A,5Hz);"
    );
}

#[test]
fn test_ambiguous_branch_can_be_rejected() {
    let graph = ambiguous_branch();
    let options = ExecutionOptions {
        branch_policy: BranchPolicy::Reject,
        max_steps: None,
    };
    let result = ExecutionEngine::new(&graph)
        .with_options(options)
        .run(&mut CommandRecorder::new());
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::AmbiguousBranch { node: 1, count: 2 }
    );
}

#[test]
fn test_exhausted_measurements_fail_the_run() {
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let measure = builder.add_node(Operation::MeasureOd {
        container: "A".into(),
        frequency: q("5Hz"),
        wavelength: q("600nm"),
    });
    let read = builder.add_node(Operation::GetMeasureOd {
        container: "A".into(),
        bind: Some("od".into()),
    });
    builder
        .add_edge(start, measure, Predicate::Always)
        .add_edge(measure, read, Predicate::Always);
    let graph = builder.build().unwrap();

    let result = ExecutionEngine::new(&graph).run(&mut CommandRecorder::new());
    match result {
        Err(ExecutionError::Actuator { node, source }) => {
            assert_eq!(node, read);
            assert!(matches!(source, ActuatorError::MeasurementsExhausted(_)));
        }
        other => panic!("expected an actuator error, got {:?}", other),
    }
}

#[test]
fn test_measurement_binds_variable_for_later_edges() {
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let read = builder.add_node(Operation::GetMeasureFluorescence {
        container: "A".into(),
        bind: Some("f".into()),
    });
    let high = builder.add_node(shake("high"));
    let low = builder.add_node(shake("low"));
    let high_reading = var("f").greater_than(num(100.0));
    builder
        .add_edge(start, read, Predicate::Always)
        .add_edge(read, high, Predicate::When(high_reading.clone()))
        .add_edge(read, low, Predicate::When(high_reading.not()));
    let graph = builder.build().unwrap();

    let mut recorder = CommandRecorder::with_measurements([250.0]);
    ExecutionEngine::new(&graph).run(&mut recorder).unwrap();
    assert_eq!(
        recorder.stream(),
        "setTimeStep(1000ms);getMeasureFluorescence(A);shake(high,5Hz);"
    );
    assert_eq!(recorder.remaining_measurements(), 0);
}

#[test]
fn test_undefined_variable_in_edge_fails_at_its_node() {
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let next = builder.add_node(shake("A"));
    builder.add_edge(start, next, Predicate::When(var("ghost").greater_than(num(0.0))));
    let graph = builder.build().unwrap();

    let result = ExecutionEngine::new(&graph).run(&mut CommandRecorder::new());
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::Evaluation {
            node: start,
            source: EvaluationError::UndefinedVariable("ghost".to_string()),
        }
    );
}

#[test]
fn test_division_by_zero_in_argument_fails_at_its_node() {
    let mut builder = GraphBuilder::new(Time::from_secs(1.0));
    let start = builder.add_node(set_time_step());
    let pour = builder.add_node(Operation::Transfer {
        source: "A".into(),
        target: "B".into(),
        volume: Volume::of(num(1.0).divided_by(num(0.0)), VolumeUnit::Milliliter),
    });
    builder.add_edge(start, pour, Predicate::Always);
    let graph = builder.build().unwrap();

    let result = ExecutionEngine::new(&graph).run(&mut CommandRecorder::new());
    assert!(matches!(
        result,
        Err(ExecutionError::Evaluation {
            node,
            source: EvaluationError::DivisionByZero(_),
        }) if node == pour
    ));
}

#[test]
fn test_graph_builder_rejects_malformed_graphs() {
    assert_eq!(
        GraphBuilder::new(Time::from_secs(1.0)).build().unwrap_err(),
        GraphError::Empty
    );

    let mut dangling = GraphBuilder::new(Time::from_secs(1.0));
    let start = dangling.add_node(set_time_step());
    dangling.add_edge(start, 7, Predicate::Always);
    assert_eq!(
        dangling.build().unwrap_err(),
        GraphError::DanglingEdge {
            source_node: 0,
            target: 7
        }
    );

    let mut unknown_source = GraphBuilder::new(Time::from_secs(1.0));
    let start = unknown_source.add_node(set_time_step());
    unknown_source.add_edge(9, start, Predicate::Always);
    assert_eq!(unknown_source.build().unwrap_err(), GraphError::UnknownNode(9));

    let mut two_roots = GraphBuilder::new(Time::from_secs(1.0));
    two_roots.add_node(set_time_step());
    two_roots.add_node(Operation::Tick);
    assert_eq!(
        two_roots.build().unwrap_err(),
        GraphError::StartNode(vec![0, 1])
    );
}
