//! Common test utilities: reference protocols, primitive shorthands and a run helper.
use protograph::prelude::*;
use std::fmt::Debug;
use std::str::FromStr;

/// Parses a quantity, window or time literal.
#[allow(dead_code)]
pub fn q<T>(literal: &str) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    literal.parse().expect("valid literal")
}

/// `n` consecutive `timeStep();` calls.
#[allow(dead_code)]
pub fn t(n: usize) -> String {
    "timeStep();".repeat(n)
}

/// Translates with the given tick and runs against a scripted recorder, returning the stream.
#[allow(dead_code)]
pub fn run(description: ProtocolDescription, tick: &str, measurements: &[f64]) -> String {
    let graph = Translator::builder(description)
        .tick_interval(q(tick))
        .build()
        .translate()
        .expect("protocol translates");
    let mut recorder = CommandRecorder::with_measurements(measurements.iter().copied());
    ExecutionEngine::new(&graph)
        .run(&mut recorder)
        .expect("protocol runs");
    recorder.stream()
}

#[allow(dead_code)]
pub fn var(name: &str) -> Expression {
    Expression::variable(name)
}

#[allow(dead_code)]
pub fn num(n: f64) -> Expression {
    Expression::number(n)
}

// --- Primitive shorthands ---

#[allow(dead_code)]
pub fn flow(path: &[&str], rate: &str) -> Primitive {
    Primitive::ContinuousFlow {
        path: path.iter().map(|c| c.to_string()).collect(),
        rate: q(rate),
    }
}

#[allow(dead_code)]
pub fn transfer(source: &str, target: &str, volume: &str) -> Primitive {
    Primitive::Transfer {
        source: source.into(),
        target: target.into(),
        volume: q(volume),
    }
}

#[allow(dead_code)]
pub fn incubate(container: &str, temperature: &str, shaking: Option<&str>) -> Primitive {
    Primitive::Incubate {
        container: container.into(),
        temperature: q(temperature),
        shaking: shaking.map(q),
    }
}

#[allow(dead_code)]
pub fn centrifugation(container: &str, speed: &str, temperature: Option<&str>) -> Primitive {
    Primitive::Centrifugation {
        container: container.into(),
        speed: q(speed),
        temperature: temperature.map(q),
    }
}

#[allow(dead_code)]
pub fn stir(container: &str, frequency: &str) -> Primitive {
    Primitive::Mix {
        container: container.into(),
        kind: MixKind::Stir,
        frequency: q(frequency),
    }
}

#[allow(dead_code)]
pub fn electrophoresis(container: &str, field: &str) -> Primitive {
    Primitive::Electrophoresis {
        container: container.into(),
        field: q(field),
    }
}

#[allow(dead_code)]
pub fn measure_od(container: &str, frequency: &str, wavelength: &str, bind: &str) -> Primitive {
    Primitive::MeasureOd {
        container: container.into(),
        frequency: q(frequency),
        wavelength: q(wavelength),
        bind: Some(bind.into()),
    }
}

#[allow(dead_code)]
pub fn measure_fluorescence(container: &str, bind: &str) -> Primitive {
    Primitive::MeasureFluorescence {
        container: container.into(),
        frequency: q("50Hz"),
        excitation: q("650nm"),
        emission: q("650nm"),
        bind: Some(bind.into()),
    }
}

// --- Reference protocols ---

/// `continuousFlow[0s:30s](A,B,10ml/hr)`
#[allow(dead_code)]
pub fn one_operation() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("1ml"))
        .container("B", q("0ml"))
        .operation(q("[0s:30s]"), flow(&["A", "B"], "10ml/hr"))
        .build()
        .unwrap()
}

/// Two flows, the second starting when the first ends.
#[allow(dead_code)]
pub fn two_operations_linked() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("1ml"))
        .container("B", q("0ml"))
        .container("C", q("0ml"))
        .operation(q("[0s:10s]"), flow(&["A", "B"], "10ml/h"))
        .operation(q("[-:10s]"), flow(&["B", "C"], "20ml/ms"))
        .build()
        .unwrap()
}

/// Two overlapping flows ending together.
#[allow(dead_code)]
pub fn two_operations_parallel() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("0ml"))
        .container("B", q("0ml"))
        .container("C", q("0ml"))
        .container("D", q("0ml"))
        .operation(q("[0s:10s]"), flow(&["A", "B"], "10ml/hr"))
        .operation(q("[5s:5s]"), flow(&["C", "D"], "20ml/hr"))
        .build()
        .unwrap()
}

/// Sequential transfers whose durations come from their volumes.
#[allow(dead_code)]
pub fn unknown_duration_linked() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("0ml"))
        .container("B", q("0ml"))
        .container("C", q("0ml"))
        .operation(q("[0s:]"), transfer("A", "B", "5ml"))
        .operation(q("[-:]"), transfer("B", "C", "7ml"))
        .build()
        .unwrap()
}

/// Concurrent transfers whose durations come from their volumes.
#[allow(dead_code)]
pub fn unknown_duration_parallel() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("0ml"))
        .container("B", q("0ml"))
        .container("C", q("0ml"))
        .container("D", q("0ml"))
        .operation(q("[0s:]"), transfer("A", "B", "5ml"))
        .operation(q("[0s:]"), transfer("C", "D", "7ml"))
        .build()
        .unwrap()
}

/// `if (condition) { flow A->B for 3s }` followed by a flow B->C for 5s.
#[allow(dead_code)]
pub fn simple_if(condition: bool) -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("0ml"))
        .container("B", q("0ml"))
        .container("C", q("0ml"))
        .begin_if(q("[0s:]"), Expression::boolean(condition))
        .operation(q("[-:3s]"), flow(&["A", "B"], "10ml/hr"))
        .end_if()
        .operation(q("[-:5s]"), flow(&["B", "C"], "7ml/hr"))
        .build()
        .unwrap()
}

/// Measures OD, then conditionally transfers and incubates before a centrifugation.
#[allow(dead_code)]
pub fn complex_if() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("1ml"))
        .container("B", q("5ml"))
        .operation(q("[0s:2s]"), measure_od("A", "0Hz", "650nm", "OD"))
        .begin_if(q("[-:]"), var("OD").less_than(num(600.0)))
        .operation(q("[-:]"), transfer("B", "A", "2ml"))
        .operation(q("[-:3s]"), incubate("A", "26ºC", Some("5Hz")))
        .end_if()
        .operation(q("[-:5s]"), centrifugation("A", "50kHz", Some("26ºC")))
        .build()
        .unwrap()
}

/// `if (flag != 0) {...} else if (flag == 0) {...}` followed by a centrifugation.
#[allow(dead_code)]
pub fn elif(flag: f64) -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("B", q("0ml"))
        .container("A", q("0ml"))
        .assign("flag", num(flag))
        .begin_if(q("[-:]"), var("flag").not_equals(num(0.0)))
        .operation(q("[-:2s]"), flow(&["B", "A"], "5ml/hr"))
        .elif(var("flag").equals(num(0.0)))
        .operation(q("[-:3s]"), stir("A", "50Hz"))
        .end_if()
        .operation(q("[-:5s]"), centrifugation("A", "50Hz", Some("26ºC")))
        .build()
        .unwrap()
}

/// `if (flag > 0) {...} else if (flag == 0) {...}` where neither clause holds.
#[allow(dead_code)]
pub fn elif_no_branch() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("B", q("0ml"))
        .container("A", q("0ml"))
        .assign("flag", num(-1.0))
        .begin_if(q("[-:]"), var("flag").greater_than(num(0.0)))
        .operation(q("[-:2s]"), flow(&["B", "A"], "5ml/hr"))
        .elif(var("flag").equals(num(0.0)))
        .operation(q("[-:3s]"), stir("A", "50Hz"))
        .end_if()
        .operation(q("[-:5s]"), centrifugation("A", "50Hz", Some("26ºC")))
        .build()
        .unwrap()
}

/// `if (flag > 0) { flow [; incubate] } else { stir }` followed by a centrifugation.
#[allow(dead_code)]
pub fn if_else(flag: f64, incubate_in_branch: bool) -> ProtocolDescription {
    let mut builder = ProtocolBuilder::new()
        .container("B", q("0ml"))
        .container("A", q("0ml"))
        .assign("flag", num(flag))
        .begin_if(q("[-:]"), var("flag").greater_than(num(0.0)))
        .operation(q("[-:2s]"), flow(&["B", "A"], "5ml/hr"));
    if incubate_in_branch {
        builder = builder.operation(q("[-:3s]"), incubate("A", "26ºC", Some("50Hz")));
    }
    builder
        .otherwise()
        .operation(q("[-:3s]"), stir("A", "50Hz"))
        .end_if()
        .operation(q("[-:5s]"), centrifugation("A", "50Hz", Some("26ºC")))
        .build()
        .unwrap()
}

/// An OD-guarded block containing a fluorescence-guarded transfer, then an electrophoresis.
#[allow(dead_code)]
pub fn nested_ifs() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("1ml"))
        .container("B", q("1.5ml"))
        .container("C", q("0ml"))
        .operation(q("[0s:2s]"), measure_od("A", "50Hz", "650nm", "od"))
        .begin_if(q("[_:]"), var("od").less_than(num(600.0)))
        .operation(q("[-:]"), transfer("B", "A", "0.5ml"))
        .operation(q("[-:5s]"), incubate("A", "26ºC", Some("50Hz")))
        .operation(q("[-:2s]"), measure_fluorescence("A", "flur"))
        .begin_if(q("[-:]"), var("flur").less_than(num(600.0)))
        .operation(q("[-:]"), transfer("A", "C", "1.5ml"))
        .end_if()
        .end_if()
        .operation(q("[-:2s]"), electrophoresis("A", "2V/cm"))
        .build()
        .unwrap()
}

/// Incubates and measures until the OD exceeds 600, then transfers and centrifuges.
#[allow(dead_code)]
pub fn measurement_loop() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("10ml"))
        .container("B", q("0ml"))
        .assign("od", num(0.0))
        .begin_while(q("[0s:]"), var("od").less_or_equal(num(600.0)))
        .operation(q("[x:5s]"), incubate("A", "26ºC", Some("50Hz")))
        .operation(q("[x:1s]"), measure_od("A", "5Hz", "650nm", "od"))
        .end_while()
        .operation(q("[x:]"), transfer("A", "B", "1ml"))
        .operation(q("[x:3s]"), centrifugation("B", "50Hz", Some("26ºC")))
        .build()
        .unwrap()
}

/// Three cycles of 60ºC for 2s and 30ºC for 5s, then a centrifugation.
#[allow(dead_code)]
pub fn thermocycling() -> ProtocolDescription {
    ProtocolBuilder::new()
        .container("A", q("1ml"))
        .assign("cycles", num(3.0))
        .thermocycling(
            q("[0s:]"),
            "A",
            var("cycles"),
            vec![
                ThermalStep {
                    temperature: q("60ºC"),
                    duration: q("2s"),
                },
                ThermalStep {
                    temperature: q("30ºC"),
                    duration: q("5s"),
                },
            ],
        )
        .operation(q("[x:5s]"), centrifugation("A", "50Hz", Some("26ºC")))
        .build()
        .unwrap()
}

/// Adjusts a media flow through a culture until its OD settles between 1 and 1.1.
#[allow(dead_code)]
pub fn turbidostat() -> ProtocolDescription {
    let rate = var("rate").minus(var("rate").times(num(1.0).minus(var("OD"))));
    ProtocolBuilder::new()
        .container("Waste", q("0ml"))
        .container("cell", q("50ml"))
        .container("media", q("100ml"))
        .assign("rate", num(300.0))
        .assign("OD", num(0.0))
        .begin_while(
            Window::unspecified(),
            var("OD")
                .less_than(num(1.0))
                .or(var("OD").greater_than(num(1.1))),
        )
        .operation(q("[x:2s]"), measure_od("cell", "20Hz", "600nm", "OD"))
        .assign("rate", rate)
        .operation(
            q("[x:10s]"),
            Primitive::ContinuousFlow {
                path: vec!["media".into(), "cell".into(), "Waste".into()],
                rate: FlowRate::of(var("rate"), FlowUnit::MlPerHour),
            },
        )
        .end_while()
        .build()
        .unwrap()
}
