//! Unit tests for expressions, units, commands and artifacts.
mod common;
use common::*;
use protograph::prelude::*;
use protograph::units::format_number;

#[test]
fn test_value_display() {
    assert_eq!(format!("{}", Value::Number(42.0)), "42");
    assert_eq!(format!("{}", Value::Number(1.5)), "1.5");
    assert_eq!(format!("{}", Value::Bool(true)), "true");
}

#[test]
fn test_expression_display_respects_precedence() {
    let expr = var("rate").minus(var("rate").times(num(1.0).minus(var("OD"))));
    assert_eq!(expr.to_string(), "rate - rate * (1 - OD)");

    let cond = var("OD").less_than(num(1.0)).or(var("OD").greater_than(num(1.1)));
    assert_eq!(cond.to_string(), "OD < 1 or OD > 1.1");
    assert_eq!(cond.not().to_string(), "not (OD < 1 or OD > 1.1)");

    let left_assoc = num(8.0).minus(num(2.0).minus(num(1.0)));
    assert_eq!(left_assoc.to_string(), "8 - (2 - 1)");
}

#[test]
fn test_none_of_negates_every_condition() {
    let a = var("a").greater_than(num(0.0));
    let b = var("b").equals(num(0.0));
    let rest = Expression::none_of([&a, &b]);

    let store: VariableStore = [("a", Value::Number(-1.0)), ("b", Value::Number(2.0))]
        .into_iter()
        .collect();
    assert!(store.evaluate_bool(&rest).unwrap());
    assert_eq!(Expression::none_of([]), Expression::boolean(true));
}

#[test]
fn test_evaluation_arithmetic_and_comparison() {
    let mut store = VariableStore::new();
    store.set("x", Value::Number(4.0));
    assert_eq!(
        store.evaluate(&var("x").times(num(2.5)).plus(num(1.0))).unwrap(),
        Value::Number(11.0)
    );
    assert!(store.evaluate_bool(&var("x").greater_or_equal(num(4.0))).unwrap());
    assert!(!store.evaluate_bool(&var("x").not_equals(num(4.0))).unwrap());
}

#[test]
fn test_evaluation_errors() {
    let mut store = VariableStore::new();
    store.set("flag", Value::Bool(true));

    assert_eq!(
        store.evaluate(&var("nope")).unwrap_err(),
        EvaluationError::UndefinedVariable("nope".to_string())
    );
    assert!(matches!(
        store.evaluate(&num(1.0).divided_by(num(0.0))),
        Err(EvaluationError::DivisionByZero(_))
    ));
    assert!(matches!(
        store.evaluate(&var("flag").plus(num(1.0))),
        Err(EvaluationError::TypeMismatch { .. })
    ));
    assert!(matches!(
        store.evaluate(&var("flag").equals(num(1.0))),
        Err(EvaluationError::TypeMismatch { .. })
    ));
}

#[test]
fn test_logical_operators_short_circuit() {
    let store = VariableStore::new();
    // The right operands reference an undefined variable and are never evaluated.
    let or = Expression::boolean(true).or(var("missing"));
    let and = Expression::boolean(false).and(var("missing"));
    assert!(store.evaluate_bool(&or).unwrap());
    assert!(!store.evaluate_bool(&and).unwrap());
}

#[test]
fn test_quantities_convert_to_canonical_units() {
    let store = VariableStore::new();
    let rate: FlowRate = q("20ml/ms");
    assert_eq!(rate.evaluate(&store).unwrap(), 7.2e7);
    let speed: Frequency = q("50kHz");
    assert_eq!(speed.evaluate(&store).unwrap(), 50_000.0);
    let volume: Volume = q("250ul");
    assert_eq!(volume.evaluate(&store).unwrap(), 0.25);
    let temperature: Temperature = q("300K");
    assert!((temperature.evaluate(&store).unwrap() - 26.85).abs() < 1e-9);
    let degrees: Temperature = q("26ºC");
    assert_eq!(degrees.to_string(), "26Cº");
}

#[test]
fn test_quantity_parse_errors() {
    assert!(matches!(
        "10parsecs".parse::<Volume>(),
        Err(UnitError::UnknownUnit { .. })
    ));
    assert!(matches!(
        "ml".parse::<Volume>(),
        Err(UnitError::MissingMagnitude(_))
    ));
}

#[test]
fn test_quantity_with_variable_magnitude() {
    let rate = FlowRate::of(var("rate"), FlowUnit::MlPerMinute);
    let mut store = VariableStore::new();
    assert!(rate.evaluate(&store).is_err());
    store.set("rate", Value::Number(2.0));
    assert_eq!(rate.evaluate(&store).unwrap(), 120.0);

    assert_eq!(rate.to_string(), "rateml/min");
    let scaled = FlowRate::of(var("rate").plus(num(1.0)), FlowUnit::MlPerHour);
    assert_eq!(scaled.to_string(), "(rate + 1)ml/h");
}

#[test]
fn test_time_parsing_and_ticks() {
    let time: Time = q("1.5min");
    assert_eq!(time.as_millis(), 90_000.0);
    assert_eq!(Time::from_millis(500.0).ticks(q("200ms")), 3);
    assert_eq!(Time::from_secs(2.0).ticks(q("200ms")), 10);
    assert_eq!(Time::ZERO.ticks(q("1s")), 0);
    assert_eq!(Time::from_secs(2.0).to_string(), "2000ms");
}

#[test]
fn test_window_parsing() {
    let window: Window = q("[5s:10s]");
    assert_eq!(window.start, Start::At(Time::from_secs(5.0)));
    assert_eq!(window.fixed_duration(), Some(Time::from_secs(10.0)));

    for placeholder in ["[-:]", "[_:]", "[x:]", "[:]"] {
        let window: Window = q(placeholder);
        assert_eq!(window, Window::unspecified(), "{}", placeholder);
    }

    assert!(matches!(
        "0s:10s".parse::<Window>(),
        Err(UnitError::MalformedWindow(_))
    ));
    assert_eq!(q::<Window>("[0s:30s]").to_string(), "[0ms:30000ms]");
}

#[test]
fn test_number_formatting() {
    assert_eq!(format_number(0.0), "0");
    assert_eq!(format_number(10.0), "10");
    assert_eq!(format_number(151.2), "151.2");
    assert_eq!(format_number(7.2e7), "7.2e+07");
    assert_eq!(format_number(120.00000000000001), "120");
    assert_eq!(format_number(0.00001), "1e-05");
    assert_eq!(format_number(-2.5), "-2.5");
}

#[test]
fn test_command_vocabulary() {
    let flow = Command::SetContinuousFlow {
        source: "A".into(),
        target: "B".into(),
        ml_per_hour: 10.0,
    };
    assert_eq!(flow.to_string(), "setContinuosFlow(A,B,10ml/h)");

    let fluorescence = Command::MeasureFluorescence {
        container: "A".into(),
        hz: 50.0,
        excitation_nm: 650.0,
        emission_nm: 650.0,
    };
    assert_eq!(
        fluorescence.to_string(),
        "measureFluorescence(A,50Hz,650nm, 650nm)"
    );

    let field = Command::StartElectrophoresis {
        container: "A".into(),
        volts_per_cm: 2.0,
    };
    assert_eq!(field.to_string(), "startElectrophoresis(A,2V/cm)");
    assert_eq!(Command::TimeStep.to_string(), "timeStep()");
}

#[test]
fn test_timeline_formatter() {
    let mut recorder = CommandRecorder::new();
    let graph = Translator::builder(two_operations_parallel())
        .tick_interval(q("1s"))
        .build()
        .translate()
        .unwrap();
    ExecutionEngine::new(&graph).run(&mut recorder).unwrap();

    let lines = TimelineFormatter::lines(recorder.commands());
    assert_eq!(lines[0], "0ms:setTimeStep(1000ms)");
    assert!(lines.contains(&"5000ms:setContinuosFlow(C,D,20ml/h)".to_string()));
    assert_eq!(lines.last().unwrap(), "10000ms:stopContinuosFlow(C,D)");
    assert!(lines.iter().all(|line| !line.contains("timeStep()")));
}

#[test]
fn test_artifact_round_trip() {
    let graph = Translator::builder(turbidostat())
        .tick_interval(q("1s"))
        .build()
        .translate()
        .unwrap();

    let restored = ProtocolGraph::from_bytes(&graph.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, graph);

    let path = std::env::temp_dir().join(format!("protograph-{}.bin", std::process::id()));
    let path = path.to_str().unwrap();
    graph.save(path).unwrap();
    let loaded = ProtocolGraph::from_file(path).unwrap();
    std::fs::remove_file(path).unwrap();

    let run = |g: &ProtocolGraph| {
        let mut recorder = CommandRecorder::with_measurements([0.5, 0.8, 1.2, 1.05]);
        ExecutionEngine::new(g).run(&mut recorder).unwrap();
        recorder.stream()
    };
    assert_eq!(run(&loaded), run(&graph));
}

#[test]
fn test_artifact_errors() {
    assert!(matches!(
        ProtocolGraph::from_file("/nonexistent/protocol.bin"),
        Err(ArtifactError::Io { .. })
    ));
    assert!(matches!(
        ProtocolGraph::from_bytes(&[0xff, 0xff, 0xff]),
        Err(ArtifactError::Decode(_))
    ));
}

#[test]
fn test_graph_renderings() {
    let graph = Translator::builder(simple_if(true))
        .tick_interval(q("1s"))
        .build()
        .translate()
        .unwrap();

    let listing = GraphListing(&graph).to_string();
    assert!(listing.contains("PROTOCOL GRAPH"));
    assert!(listing.contains("[cpu] branch"));
    assert!(listing.contains("*0000 [act]"));

    let dot = DotGraph(&graph).to_string();
    assert!(dot.starts_with("digraph protocol {"));
    assert!(dot.contains("shape=diamond"));
    assert!(dot.contains("[label=\"true\"]"));

    let json = graph.to_json().unwrap();
    assert!(json.contains("EvaluateCondition"));
}

#[test]
fn test_error_display() {
    let error = TranslationError::UndefinedContainer("Z".to_string());
    assert_eq!(error.to_string(), "Container 'Z' is not declared");
    let error = ExecutionError::StepLimitExceeded(5);
    assert_eq!(error.to_string(), "Execution stopped after 5 steps");
}
