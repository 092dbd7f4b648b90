use super::definition::*;
use crate::ast::Expression;
use crate::error::TranslationError;
use crate::units::Volume;

enum Frame {
    If {
        window: Window,
        clauses: Vec<Clause>,
        otherwise: Option<Block>,
    },
    While {
        window: Window,
        condition: Expression,
        body: Block,
    },
}

/// Fluent, flat construction of a `ProtocolDescription`.
///
/// Blocks are opened and closed explicitly (`begin_if` ... `end_if`), mirroring how a
/// protocol reads top to bottom. Structural mistakes such as an `elif` outside an `if` are
/// remembered and reported by `build`.
///
/// ```rust
/// use protograph::prelude::*;
///
/// let description = ProtocolBuilder::new()
///     .container("A", "1ml".parse().unwrap())
///     .container("B", "0ml".parse().unwrap())
///     .assign("flag", Expression::number(1.0))
///     .begin_if(Window::unspecified(), Expression::variable("flag").greater_than(0.0.into()))
///     .operation(
///         "[-:2s]".parse().unwrap(),
///         Primitive::Transfer {
///             source: "A".into(),
///             target: "B".into(),
///             volume: "0.5ml".parse().unwrap(),
///         },
///     )
///     .end_if()
///     .build()
///     .unwrap();
/// assert_eq!(description.body.len(), 2);
/// ```
#[derive(Default)]
pub struct ProtocolBuilder {
    containers: Vec<ContainerDeclaration>,
    root: Block,
    frames: Vec<Frame>,
    error: Option<String>,
}

impl ProtocolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(mut self, name: &str, volume: Volume) -> Self {
        self.containers.push(ContainerDeclaration {
            name: name.to_string(),
            volume,
        });
        self
    }

    pub fn assign(self, variable: &str, value: Expression) -> Self {
        self.push(Statement::Assign {
            variable: variable.to_string(),
            value,
        })
    }

    pub fn operation(self, window: Window, primitive: Primitive) -> Self {
        self.push(Statement::Operation { primitive, window })
    }

    pub fn thermocycling(
        self,
        window: Window,
        container: &str,
        cycles: Expression,
        steps: Vec<ThermalStep>,
    ) -> Self {
        self.push(Statement::Thermocycling {
            window,
            container: container.to_string(),
            cycles,
            steps,
        })
    }

    /// Appends an already assembled statement to the innermost open block.
    pub fn statement(self, statement: Statement) -> Self {
        self.push(statement)
    }

    pub fn begin_if(mut self, window: Window, condition: Expression) -> Self {
        self.frames.push(Frame::If {
            window,
            clauses: vec![Clause {
                condition,
                body: Vec::new(),
            }],
            otherwise: None,
        });
        self
    }

    pub fn elif(mut self, condition: Expression) -> Self {
        let problem = match self.frames.last_mut() {
            Some(Frame::If {
                clauses,
                otherwise: None,
                ..
            }) => {
                clauses.push(Clause {
                    condition,
                    body: Vec::new(),
                });
                None
            }
            Some(Frame::If { .. }) => Some("'elif' after 'else'"),
            _ => Some("'elif' outside of an 'if' block"),
        };
        if let Some(message) = problem {
            self.fail(message);
        }
        self
    }

    pub fn otherwise(mut self) -> Self {
        let problem = match self.frames.last_mut() {
            Some(Frame::If { otherwise, .. }) => {
                if otherwise.is_some() {
                    Some("duplicate 'else'")
                } else {
                    *otherwise = Some(Vec::new());
                    None
                }
            }
            _ => Some("'else' outside of an 'if' block"),
        };
        if let Some(message) = problem {
            self.fail(message);
        }
        self
    }

    pub fn end_if(mut self) -> Self {
        match self.frames.pop() {
            Some(Frame::If {
                window,
                clauses,
                otherwise,
            }) => self.push(Statement::If {
                window,
                clauses,
                otherwise,
            }),
            Some(frame) => {
                self.frames.push(frame);
                self.fail("'end_if' closes a 'while' block");
                self
            }
            None => {
                self.fail("'end_if' without an open 'if' block");
                self
            }
        }
    }

    pub fn begin_while(mut self, window: Window, condition: Expression) -> Self {
        self.frames.push(Frame::While {
            window,
            condition,
            body: Vec::new(),
        });
        self
    }

    pub fn end_while(mut self) -> Self {
        match self.frames.pop() {
            Some(Frame::While {
                window,
                condition,
                body,
            }) => self.push(Statement::While {
                window,
                condition,
                body,
            }),
            Some(frame) => {
                self.frames.push(frame);
                self.fail("'end_while' closes an 'if' block");
                self
            }
            None => {
                self.fail("'end_while' without an open 'while' block");
                self
            }
        }
    }

    pub fn build(self) -> Result<ProtocolDescription, TranslationError> {
        if let Some(message) = self.error {
            return Err(TranslationError::Structural(message));
        }
        if !self.frames.is_empty() {
            return Err(TranslationError::Structural(format!(
                "{} block(s) left open",
                self.frames.len()
            )));
        }
        Ok(ProtocolDescription {
            containers: self.containers,
            body: self.root,
        })
    }

    fn push(mut self, statement: Statement) -> Self {
        let block = match self.frames.last_mut() {
            None => &mut self.root,
            Some(Frame::While { body, .. }) => body,
            Some(Frame::If {
                otherwise: Some(body),
                ..
            }) => body,
            Some(Frame::If { clauses, .. }) => match clauses.last_mut() {
                Some(clause) => &mut clause.body,
                None => &mut self.root,
            },
        };
        block.push(statement);
        self
    }

    fn fail(&mut self, message: &str) {
        self.error.get_or_insert_with(|| message.to_string());
    }
}
