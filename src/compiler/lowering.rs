use super::builder::{Exit, Frontier, GraphEmitter, always, when};
use super::scope::{Scope, written_variables};
use super::timeline::Timeline;
use super::TranslatorConfig;
use crate::ast::{Expression, Value, ValueType};
use crate::catalog::{ConditionBlock, Operation};
use crate::error::TranslationError;
use crate::graph::{Predicate, ProtocolGraph};
use crate::protocol::{
    Block, Clause, MixKind, Primitive, ProtocolDescription, Start, Statement, ThermalStep, Window,
};
use crate::units::Time;
use itertools::Itertools;
use tracing::debug;

/// A maximal run of timed operations and assignments, or a single control statement.
enum Item<'s> {
    Segment(Vec<&'s Statement>),
    Control(&'s Statement),
}

/// Where a block sits, which decides how it ends and what it may assume.
#[derive(Debug, Clone, Copy)]
struct BlockContext {
    /// Duration handed down by the nearest enclosing block that declares one.
    inherited: Option<Time>,
    /// Whether the block must end on a tick (loop bodies).
    closing: bool,
    /// Whether the block may run zero or several times.
    conditional: bool,
}

/// Open exits that share how the protocol settles once execution leaves through them.
#[derive(Debug)]
struct Path {
    frontier: Frontier,
    /// Settle one tick short of the configured count.
    short_settle: bool,
}

impl Path {
    fn new(frontier: Frontier, short_settle: bool) -> Self {
        Self {
            frontier,
            short_settle,
        }
    }
}

/// Longest span, in ticks, a single schedule may cover.
const MAX_TICKS: u64 = 1 << 20;

/// Walks a protocol description once, emitting its graph.
pub(super) struct Lowering<'c> {
    config: &'c TranslatorConfig,
    emitter: GraphEmitter,
    scope: Scope,
}

impl<'c> Lowering<'c> {
    pub(super) fn new(config: &'c TranslatorConfig) -> Self {
        Self {
            config,
            emitter: GraphEmitter::new(config.tick_interval),
            scope: Scope::default(),
        }
    }

    pub(super) fn lower(
        mut self,
        description: &ProtocolDescription,
    ) -> Result<ProtocolGraph, TranslationError> {
        let start = self.emitter.node(Operation::SetTimeStep {
            interval: self.config.tick_interval,
        });
        let mut frontier = always(start);

        for container in &description.containers {
            self.scope.declare_container(&container.name)?;
            self.scope.check(
                &container.volume.magnitude,
                ValueType::Number,
                "container volume",
            )?;
            frontier = self.emitter.chain(
                frontier,
                [Operation::LoadContainer {
                    container: container.name.clone(),
                    volume: container.volume.clone(),
                }],
            );
        }

        let body = BlockContext {
            inherited: None,
            closing: false,
            conditional: false,
        };
        let paths = self.lower_block(Path::new(frontier, false), &description.body, body)?;
        let settle = self.config.settle_ticks as usize;
        for path in paths {
            let count = if path.short_settle {
                settle.saturating_sub(1)
            } else {
                settle
            };
            self.emitter.ticks(path.frontier, count);
        }
        Ok(self.emitter.finish()?)
    }

    fn lower_block(
        &mut self,
        mut path: Path,
        block: &[Statement],
        context: BlockContext,
    ) -> Result<Vec<Path>, TranslationError> {
        let items = group_items(block);
        debug!(
            statements = block.len(),
            items = items.len(),
            closing = context.closing,
            "lowering block"
        );
        if items.is_empty() && context.closing {
            path.frontier = self.emitter.ticks(path.frontier, 1);
            return Ok(vec![path]);
        }
        self.lower_items(path, &items, context)
    }

    fn lower_items(
        &mut self,
        mut path: Path,
        items: &[Item<'_>],
        context: BlockContext,
    ) -> Result<Vec<Path>, TranslationError> {
        for (index, item) in items.iter().enumerate() {
            let is_last = index + 1 == items.len();
            match item {
                Item::Segment(statements) => {
                    let timeline = self.schedule(statements, context)?;
                    let closing = if is_last {
                        context.closing
                    } else {
                        timeline.has_actuator()
                    };
                    path.frontier = self
                        .emitter
                        .segment(path.frontier, timeline.into_slots(), closing);
                }
                Item::Control(statement) => {
                    let mut paths = self.lower_control(path, statement, context)?;
                    if is_last {
                        if context.closing {
                            for path in &mut paths {
                                let frontier = std::mem::take(&mut path.frontier);
                                path.frontier = self.emitter.ticks(frontier, 1);
                            }
                        }
                        return Ok(paths);
                    }
                    // Paths that settle differently each get their own copy of the rest.
                    let rest = &items[index + 1..];
                    let mut lowered = Vec::new();
                    for path in paths {
                        lowered.extend(self.lower_items(path, rest, context)?);
                    }
                    return Ok(merge(lowered));
                }
            }
        }
        Ok(vec![path])
    }

    /// Whole ticks covering `span`, refusing spans no graph could hold.
    fn ticks(&self, span: Time, context: &str) -> Result<usize, TranslationError> {
        let count = span.ticks(self.config.tick_interval);
        if !span.as_millis().is_finite() || count > MAX_TICKS {
            return Err(TranslationError::UnschedulableSpan {
                context: context.to_string(),
                millis: span.as_millis(),
            });
        }
        Ok(count as usize)
    }

    fn schedule(
        &mut self,
        statements: &[&Statement],
        context: BlockContext,
    ) -> Result<Timeline, TranslationError> {
        let mut timeline = Timeline::new();
        for statement in statements {
            match statement {
                Statement::Assign { variable, value } => {
                    let value_type = self
                        .scope
                        .infer(value, &format!("the assignment to '{}'", variable))?;
                    if context.conditional {
                        self.scope.forget_constant(variable);
                    } else {
                        self.scope.assign_constant(variable, value);
                    }
                    self.scope.define(variable, value_type);
                    timeline.place_instant(Operation::AssignVariable {
                        variable: variable.clone(),
                        value: value.clone(),
                    });
                }
                Statement::Operation { primitive, window } => {
                    for container in primitive.containers() {
                        self.scope.require_container(container)?;
                    }
                    for magnitude in primitive.magnitudes() {
                        self.scope
                            .check(magnitude, ValueType::Number, primitive.name())?;
                    }
                    let start = match window.start {
                        Start::AfterPrevious => None,
                        Start::At(offset) => Some(self.ticks(offset, "start offset")?),
                    };
                    let duration = self.resolve_duration(primitive, window, context)?;
                    let length = self.ticks(duration, "duration")?;
                    let (starts, stops) = expand(primitive)?;
                    let end = timeline.place(start, length, starts, stops);
                    if end.is_none_or(|end| end as u64 > MAX_TICKS) {
                        return Err(TranslationError::UnschedulableSpan {
                            context: format!("'{}' ending", primitive.name()),
                            millis: duration.as_millis(),
                        });
                    }
                    if let Some(variable) = primitive.binding() {
                        self.scope.define(variable, ValueType::Number);
                        self.scope.forget_constant(variable);
                    }
                }
                Statement::If { .. }
                | Statement::While { .. }
                | Statement::Thermocycling { .. } => {
                    return Err(TranslationError::Structural(
                        "control statement inside a timed segment".to_string(),
                    ));
                }
            }
        }
        Ok(timeline)
    }

    fn resolve_duration(
        &self,
        primitive: &Primitive,
        window: &Window,
        context: BlockContext,
    ) -> Result<Time, TranslationError> {
        if let Some(duration) = window.fixed_duration().or(context.inherited) {
            return Ok(duration);
        }
        match primitive {
            Primitive::Transfer { volume, .. } => volume
                .constant(self.scope.constants())
                .map(|ml| Time::from_millis(ml * 3.6e6 / self.config.transfer_rate))
                .ok_or_else(|| TranslationError::UnresolvedDuration(primitive.name().to_string())),
            _ => Err(TranslationError::UnresolvedDuration(
                primitive.name().to_string(),
            )),
        }
    }

    fn lower_control(
        &mut self,
        path: Path,
        statement: &Statement,
        context: BlockContext,
    ) -> Result<Vec<Path>, TranslationError> {
        match statement {
            Statement::If {
                window,
                clauses,
                otherwise,
            } => self.lower_if(path, window, clauses, otherwise.as_ref(), context),
            Statement::While {
                window,
                condition,
                body,
            } => self.lower_while(path, window, condition, body, context),
            Statement::Thermocycling {
                window,
                container,
                cycles,
                steps,
            } => self.lower_thermocycling(path, window, container, cycles, steps),
            Statement::Assign { .. } | Statement::Operation { .. } => Err(
                TranslationError::Structural("timed statement lowered as control".to_string()),
            ),
        }
    }

    fn lower_if(
        &mut self,
        path: Path,
        window: &Window,
        clauses: &[Clause],
        otherwise: Option<&Block>,
        context: BlockContext,
    ) -> Result<Vec<Path>, TranslationError> {
        if clauses.is_empty() {
            return Err(TranslationError::Structural(
                "'if' without any clause".to_string(),
            ));
        }
        // Every guard is evaluated at the branch node, before any clause body runs.
        for clause in clauses {
            self.scope
                .check(&clause.condition, ValueType::Bool, "an 'if' condition")?;
        }

        let frontier = self.delay(path.frontier, window.start)?;
        let check = self.emitter.node(Operation::EvaluateCondition {
            block: ConditionBlock::Branch,
        });
        self.emitter.attach(frontier, check);

        let body = BlockContext {
            inherited: window.fixed_duration().or(context.inherited),
            closing: false,
            conditional: true,
        };
        // Leaving through a clause settles one tick short, except through a first clause
        // that holds a single operation.
        let mut exits = Vec::new();
        for (index, clause) in clauses.iter().enumerate() {
            let single =
                index == 0 && matches!(clause.body.as_slice(), [Statement::Operation { .. }]);
            let entry = Path::new(
                when(check, Predicate::When(clause.condition.clone())),
                path.short_settle || !single,
            );
            exits.extend(self.lower_block(entry, &clause.body, body)?);
        }
        let rest = Predicate::When(Expression::none_of(clauses.iter().map(|c| &c.condition)));
        match otherwise {
            Some(block) => {
                let entry = Path::new(when(check, rest), true);
                exits.extend(self.lower_block(entry, block, body)?);
            }
            None => exits.push(Path::new(
                vec![Exit {
                    from: check,
                    condition: rest,
                }],
                path.short_settle,
            )),
        }
        debug!(
            node = check,
            clauses = clauses.len(),
            has_else = otherwise.is_some(),
            "lowered branch"
        );
        Ok(merge(exits))
    }

    fn lower_while(
        &mut self,
        path: Path,
        window: &Window,
        condition: &Expression,
        body: &Block,
        context: BlockContext,
    ) -> Result<Vec<Path>, TranslationError> {
        self.scope
            .check(condition, ValueType::Bool, "a 'while' condition")?;
        // Values written by the body change between iterations.
        for variable in written_variables(body) {
            self.scope.forget_constant(variable);
        }

        let frontier = self.delay(path.frontier, window.start)?;
        let check = self.emitter.node(Operation::EvaluateCondition {
            block: ConditionBlock::Loop,
        });
        self.emitter.attach(frontier, check);

        let inner = BlockContext {
            inherited: window.fixed_duration().or(context.inherited),
            closing: true,
            conditional: true,
        };
        let entry = Path::new(
            when(check, Predicate::When(condition.clone())),
            path.short_settle,
        );
        for exit in self.lower_block(entry, body, inner)? {
            self.emitter.attach(exit.frontier, check);
        }
        debug!(node = check, condition = %condition, "lowered loop");

        Ok(vec![Path::new(
            when(check, Predicate::When(condition.clone().not())),
            path.short_settle,
        )])
    }

    fn lower_thermocycling(
        &mut self,
        path: Path,
        window: &Window,
        container: &str,
        cycles: &Expression,
        steps: &[ThermalStep],
    ) -> Result<Vec<Path>, TranslationError> {
        self.scope.require_container(container)?;
        if steps.is_empty() {
            return Err(TranslationError::Structural(
                "thermocycling without steps".to_string(),
            ));
        }
        self.scope
            .check(cycles, ValueType::Number, "the thermocycling cycle count")?;
        for step in steps {
            self.scope.check(
                &step.temperature.magnitude,
                ValueType::Number,
                "a thermocycling temperature",
            )?;
        }
        let count = match self.scope.fold(cycles) {
            Some(Value::Number(n))
                if n >= 0.0 && n.fract() == 0.0 && n <= MAX_TICKS as f64 =>
            {
                n as usize
            }
            Some(other) => {
                return Err(TranslationError::Structural(format!(
                    "thermocycling needs a whole, non-negative number of cycles, got {}",
                    other
                )));
            }
            None => {
                return Err(TranslationError::NonConstant {
                    context: "The thermocycling cycle count".to_string(),
                    expression: cycles.to_string(),
                });
            }
        };

        let lengths = steps
            .iter()
            .map(|step| self.ticks(step.duration, "thermocycling step"))
            .collect::<Result<Vec<_>, _>>()?;
        let program = lengths.iter().sum::<usize>() as u64;
        if program.saturating_mul(count as u64) > MAX_TICKS {
            return Err(TranslationError::UnschedulableSpan {
                context: "thermocycling program".to_string(),
                millis: steps.iter().map(|s| s.duration.as_millis()).sum::<f64>() * count as f64,
            });
        }
        let mut frontier = self.delay(path.frontier, window.start)?;
        for _ in 0..count {
            let mut timeline = Timeline::new();
            for (step, length) in steps.iter().zip(&lengths) {
                let end = timeline.place(
                    None,
                    *length,
                    vec![Operation::ApplyTemperature {
                        container: container.to_string(),
                        temperature: step.temperature.clone(),
                    }],
                    vec![Operation::StopApplyTemperature {
                        container: container.to_string(),
                    }],
                );
                if end.is_none_or(|end| end as u64 > MAX_TICKS) {
                    return Err(TranslationError::UnschedulableSpan {
                        context: "thermocycling cycle".to_string(),
                        millis: step.duration.as_millis(),
                    });
                }
            }
            frontier = self.emitter.segment(frontier, timeline.into_slots(), true);
        }
        debug!(container, cycles = count, steps = steps.len(), "unrolled thermocycling");
        Ok(vec![Path::new(frontier, path.short_settle)])
    }

    fn delay(&mut self, frontier: Frontier, start: Start) -> Result<Frontier, TranslationError> {
        match start {
            Start::AfterPrevious => Ok(frontier),
            Start::At(offset) => {
                let ticks = self.ticks(offset, "block start offset")?;
                Ok(self.emitter.ticks(frontier, ticks))
            }
        }
    }
}

/// Joins paths that settle alike, so the rest of a block is lowered once per kind.
fn merge(paths: Vec<Path>) -> Vec<Path> {
    let (short, full): (Vec<Path>, Vec<Path>) = paths.into_iter().partition(|p| p.short_settle);
    [(full, false), (short, true)]
        .into_iter()
        .filter(|(group, _)| !group.is_empty())
        .map(|(group, short_settle)| {
            Path::new(
                group.into_iter().flat_map(|p| p.frontier).collect(),
                short_settle,
            )
        })
        .collect()
}

fn group_items(block: &[Statement]) -> Vec<Item<'_>> {
    let mut items = Vec::new();
    let mut pending: Vec<&Statement> = Vec::new();
    for statement in block {
        match statement {
            Statement::Assign { .. } | Statement::Operation { .. } => pending.push(statement),
            Statement::If { .. } | Statement::While { .. } | Statement::Thermocycling { .. } => {
                if !pending.is_empty() {
                    items.push(Item::Segment(std::mem::take(&mut pending)));
                }
                items.push(Item::Control(statement));
            }
        }
    }
    if !pending.is_empty() {
        items.push(Item::Segment(pending));
    }
    items
}

/// The start and stop calls a primitive turns into, in issue order.
fn expand(primitive: &Primitive) -> Result<(Vec<Operation>, Vec<Operation>), TranslationError> {
    let expanded = match primitive {
        Primitive::ContinuousFlow { path, rate } => {
            if path.len() < 2 {
                return Err(TranslationError::Structural(format!(
                    "a continuous flow needs at least two containers, got {}",
                    path.len()
                )));
            }
            path.iter()
                .tuple_windows()
                .map(|(source, target)| {
                    (
                        Operation::SetContinuousFlow {
                            source: source.clone(),
                            target: target.clone(),
                            rate: rate.clone(),
                        },
                        Operation::StopContinuousFlow {
                            source: source.clone(),
                            target: target.clone(),
                        },
                    )
                })
                .unzip()
        }
        Primitive::Transfer {
            source,
            target,
            volume,
        } => (
            vec![Operation::Transfer {
                source: source.clone(),
                target: target.clone(),
                volume: volume.clone(),
            }],
            vec![Operation::StopTransfer {
                source: source.clone(),
                target: target.clone(),
            }],
        ),
        Primitive::Incubate {
            container,
            temperature,
            shaking,
        } => {
            let mut starts = vec![Operation::ApplyTemperature {
                container: container.clone(),
                temperature: temperature.clone(),
            }];
            let mut stops = vec![Operation::StopApplyTemperature {
                container: container.clone(),
            }];
            if let Some(frequency) = shaking {
                starts.push(Operation::Shake {
                    container: container.clone(),
                    frequency: frequency.clone(),
                });
                stops.push(Operation::StopShake {
                    container: container.clone(),
                });
            }
            (starts, stops)
        }
        Primitive::Centrifugation {
            container,
            speed,
            temperature,
        } => {
            let mut starts = Vec::new();
            let mut stops = Vec::new();
            if let Some(temperature) = temperature {
                starts.push(Operation::ApplyTemperature {
                    container: container.clone(),
                    temperature: temperature.clone(),
                });
                stops.push(Operation::StopApplyTemperature {
                    container: container.clone(),
                });
            }
            starts.push(Operation::Centrifugate {
                container: container.clone(),
                speed: speed.clone(),
            });
            stops.push(Operation::StopCentrifugate {
                container: container.clone(),
            });
            (starts, stops)
        }
        Primitive::Mix {
            container,
            kind: MixKind::Stir,
            frequency,
        } => (
            vec![Operation::Stir {
                container: container.clone(),
                frequency: frequency.clone(),
            }],
            vec![Operation::StopStir {
                container: container.clone(),
            }],
        ),
        Primitive::Mix {
            container,
            kind: MixKind::Shake,
            frequency,
        } => (
            vec![Operation::Shake {
                container: container.clone(),
                frequency: frequency.clone(),
            }],
            vec![Operation::StopShake {
                container: container.clone(),
            }],
        ),
        Primitive::Electrophoresis { container, field } => (
            vec![Operation::StartElectrophoresis {
                container: container.clone(),
                field: field.clone(),
            }],
            vec![Operation::StopElectrophoresis {
                container: container.clone(),
            }],
        ),
        Primitive::MeasureOd {
            container,
            frequency,
            wavelength,
            bind,
        } => (
            vec![Operation::MeasureOd {
                container: container.clone(),
                frequency: frequency.clone(),
                wavelength: wavelength.clone(),
            }],
            vec![Operation::GetMeasureOd {
                container: container.clone(),
                bind: bind.clone(),
            }],
        ),
        Primitive::MeasureFluorescence {
            container,
            frequency,
            excitation,
            emission,
            bind,
        } => (
            vec![Operation::MeasureFluorescence {
                container: container.clone(),
                frequency: frequency.clone(),
                excitation: excitation.clone(),
                emission: emission.clone(),
            }],
            vec![Operation::GetMeasureFluorescence {
                container: container.clone(),
                bind: bind.clone(),
            }],
        ),
    };
    Ok(expanded)
}
