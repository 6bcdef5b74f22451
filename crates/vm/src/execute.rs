//! Main execution loop and opcode dispatch.

use celvm_common::{
    map_get, ConditionRole, EvalError, Instruction, MapKey, Opcode, Program, Span, UnaryOperator,
    Value, ValueKind, ValueMap, STRIDE,
};
use tracing::{debug, trace};

use crate::environment::Environment;
use crate::machine::{IterState, VirtualMachine};

impl<'r> VirtualMachine<'r> {
    /// Execute `program` against `env`.
    ///
    /// Any error aborts the execution. Scopes pushed by this execution
    /// are popped before returning, whether it succeeded or not.
    pub fn execute(
        &mut self,
        program: &Program,
        env: &mut dyn Environment,
    ) -> Result<Value, EvalError> {
        self.reset(program);
        debug!(
            instructions = program.len(),
            registers = program.register_count,
            "execution started"
        );

        let result = self.run_loop(program, env);

        while self.open_scopes > 0 {
            env.pop_scope();
            self.open_scopes -= 1;
        }
        match &result {
            Ok(_) => debug!(idempotent = self.idempotent, "execution finished"),
            Err(e) => debug!(error = %e, "execution failed"),
        }
        result
    }

    fn run_loop(&mut self, program: &Program, env: &mut dyn Environment) -> Result<Value, EvalError> {
        let mut pc = 0usize;

        loop {
            if pc >= program.instructions.len() {
                return Err(EvalError::internal(
                    Span::default(),
                    format!("program ended without RETURN at offset {pc}"),
                ));
            }
            let instr = program.fetch(pc).map_err(|e| {
                EvalError::internal(Span::default(), format!("offset {pc}: {e}"))
            })?;
            let span = program.span(instr.span);
            pc += STRIDE;

            match instr.opcode {
                // Loads
                Opcode::LoadConst => {
                    let value = program
                        .constants
                        .get(instr.op1 as usize)
                        .cloned()
                        .ok_or_else(|| EvalError::internal(span, "constant index out of range"))?;
                    self.write(instr.dst, value, span)?;
                }
                Opcode::LoadVar => self.exec_load_var(program, env, &instr, span)?,
                Opcode::LoadTrue => self.write(instr.dst, Value::Bool(true), span)?,
                Opcode::LoadFalse => self.write(instr.dst, Value::Bool(false), span)?,
                Opcode::LoadNull => self.write(instr.dst, Value::Null, span)?,

                // Operators
                Opcode::Negate => self.exec_unary(UnaryOperator::Negate, &instr, span)?,
                Opcode::Not => self.exec_not(&instr, span)?,
                Opcode::BinaryOp => {
                    let registry = self.registry;
                    let value = registry.binary(
                        instr.op2 as usize,
                        self.read(instr.op1, span)?,
                        self.read(instr.op3, span)?,
                        span,
                    )?;
                    self.write(instr.dst, value, span)?;
                }

                // Control flow
                Opcode::JumpIfFalse => {
                    if self.read(instr.dst, span)?.as_bool() == Some(false) {
                        pc = instr.op1 as usize;
                    }
                }
                Opcode::JumpIfTrue => {
                    if self.read(instr.dst, span)?.as_bool() == Some(true) {
                        pc = instr.op1 as usize;
                    }
                }
                Opcode::Jump => pc = instr.op1 as usize,
                Opcode::CondCheck => self.exec_cond_check(&instr, span)?,

                // Access
                Opcode::MemberAccess => self.exec_member(program, &instr, span)?,
                Opcode::Index => self.exec_index(&instr, span)?,
                Opcode::HasField => self.exec_has_field(program, &instr, span)?,

                Opcode::Call => self.exec_call(program, &instr, span)?,

                // Construction
                Opcode::MakeList => {
                    let items = self.read_run(instr.op1, instr.op2, span)?;
                    self.write(instr.dst, Value::List(items), span)?;
                }
                Opcode::MakeMap => self.exec_make_map(&instr, span)?,
                Opcode::MakeMsg => self.exec_make_msg(program, &instr, span)?,

                // Loops
                Opcode::IterInit => self.exec_iter_init(&instr, span)?,
                Opcode::IterNext => {
                    let next = self
                        .iterators
                        .get_mut(&instr.op1)
                        .ok_or_else(|| {
                            EvalError::internal(span, format!("r{} is not an iterator", instr.op1))
                        })?
                        .next_item();
                    match next {
                        Some(item) => self.write(instr.dst, item, span)?,
                        None => pc = instr.op2 as usize,
                    }
                }
                Opcode::ScopePush => {
                    env.push_scope();
                    self.open_scopes += 1;
                    trace!(depth = self.open_scopes, "scope pushed");
                }
                Opcode::ScopePop => {
                    if self.open_scopes == 0 {
                        return Err(EvalError::internal(span, "SCOPE_POP without SCOPE_PUSH"));
                    }
                    env.pop_scope();
                    self.open_scopes -= 1;
                    trace!(depth = self.open_scopes, "scope popped");
                }
                Opcode::BindVar => {
                    let name = string_operand(program, instr.op1, span)?;
                    let value = self.read(instr.op2, span)?.clone();
                    env.add_variable(name, value);
                }
                Opcode::ListAppend => {
                    let value = self.read(instr.op1, span)?.clone();
                    self.append(instr.dst, value, span)?;
                }
                Opcode::IntInc => {
                    let next = match self.read(instr.dst, span)? {
                        Value::Int(i) => i
                            .checked_add(1)
                            .ok_or_else(|| EvalError::overflow(span, "int increment"))?,
                        other => {
                            return Err(EvalError::internal(
                                span,
                                format!("INT_INC on {}", other.kind()),
                            ))
                        }
                    };
                    self.write(instr.dst, Value::Int(next), span)?;
                }

                Opcode::Move => {
                    let value = self.materialize(instr.op1, span)?;
                    self.write(instr.dst, value, span)?;
                }
                Opcode::Return => return self.materialize(instr.op1, span),
            }
        }
    }

    // ---- Loads and operators ----

    fn exec_load_var(
        &mut self,
        program: &Program,
        env: &dyn Environment,
        instr: &Instruction,
        span: Span,
    ) -> Result<(), EvalError> {
        let name = string_operand(program, instr.op1, span)?;
        let value = env
            .get_variable(name)
            .cloned()
            .ok_or_else(|| EvalError::NoSuchVariable {
                span,
                name: name.to_string(),
            })?;
        self.write(instr.dst, value, span)
    }

    fn exec_unary(
        &mut self,
        op: UnaryOperator,
        instr: &Instruction,
        span: Span,
    ) -> Result<(), EvalError> {
        let registry = self.registry;
        let value = registry.unary(op, self.read(instr.op1, span)?, span)?;
        self.write(instr.dst, value, span)
    }

    fn exec_not(&mut self, instr: &Instruction, span: Span) -> Result<(), EvalError> {
        match self.read(instr.op1, span)? {
            Value::Bool(b) => {
                let negated = !*b;
                self.write(instr.dst, Value::Bool(negated), span)
            }
            _ => self.exec_unary(UnaryOperator::Not, instr, span),
        }
    }

    fn exec_cond_check(&mut self, instr: &Instruction, span: Span) -> Result<(), EvalError> {
        let found = self.read(instr.op1, span)?.kind();
        if found == ValueKind::Bool {
            return Ok(());
        }
        match ConditionRole::from_tag(instr.op2) {
            Some(ConditionRole::Conditional) => Err(EvalError::InvalidConditionType { span, found }),
            Some(ConditionRole::Predicate) => Err(EvalError::InvalidMacroCall {
                span,
                reason: format!("predicate must evaluate to bool, found {found}"),
            }),
            Some(ConditionRole::Filter) => Err(EvalError::InvalidMacroCall {
                span,
                reason: format!("filter must evaluate to bool, found {found}"),
            }),
            None => Err(EvalError::internal(
                span,
                format!("unknown condition role {}", instr.op2),
            )),
        }
    }

    // ---- Access ----

    fn exec_member(
        &mut self,
        program: &Program,
        instr: &Instruction,
        span: Span,
    ) -> Result<(), EvalError> {
        let field = string_operand(program, instr.op2, span)?;
        let value = match self.read(instr.op1, span)? {
            Value::Map(map) => map.get(&MapKey::String(field.to_string())).cloned(),
            Value::Message(msg) => msg.get(field).cloned(),
            other => {
                return Err(EvalError::InvalidMemberAccess {
                    span,
                    operand: other.kind(),
                    field: field.to_string(),
                })
            }
        }
        .ok_or_else(|| EvalError::NoSuchKey {
            span,
            key: field.to_string(),
        })?;
        self.write(instr.dst, value, span)
    }

    fn exec_index(&mut self, instr: &Instruction, span: Span) -> Result<(), EvalError> {
        let operand = self.read(instr.op1, span)?;
        let index = self.read(instr.op2, span)?;
        let value = match (operand, index) {
            (Value::List(items), Value::Int(_) | Value::UInt(_)) => list_position(index, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| EvalError::NoSuchKey {
                    span,
                    key: index.to_string(),
                })?,
            (Value::Map(map), Value::Int(_) | Value::UInt(_) | Value::String(_)) => {
                map_lookup(map, index).cloned().ok_or_else(|| EvalError::NoSuchKey {
                    span,
                    key: index.to_string(),
                })?
            }
            (Value::Message(msg), Value::String(field)) => {
                msg.get(field).cloned().ok_or_else(|| EvalError::NoSuchKey {
                    span,
                    key: field.clone(),
                })?
            }
            (operand, index) => {
                return Err(EvalError::InvalidIndexType {
                    span,
                    operand: operand.kind(),
                    index: index.kind(),
                })
            }
        };
        self.write(instr.dst, value, span)
    }

    fn exec_has_field(
        &mut self,
        program: &Program,
        instr: &Instruction,
        span: Span,
    ) -> Result<(), EvalError> {
        let field = string_operand(program, instr.op2, span)?;
        let present = match self.read(instr.op1, span)? {
            Value::Map(map) => map.contains_key(&MapKey::String(field.to_string())),
            Value::Message(msg) => msg.has(field),
            other => {
                return Err(EvalError::InvalidMacroCall {
                    span,
                    reason: format!("has() requires a map or message, found {}", other.kind()),
                })
            }
        };
        self.write(instr.dst, Value::Bool(present), span)
    }

    fn exec_call(
        &mut self,
        program: &Program,
        instr: &Instruction,
        span: Span,
    ) -> Result<(), EvalError> {
        let name = string_operand(program, instr.op1, span)?;
        let args = self.read_run(instr.op2, instr.op3, span)?;
        trace!(function = name, args = args.len(), "function dispatch");
        let (value, idempotent) = self.registry.call_function(name, &args, span)?;
        self.idempotent &= idempotent;
        self.write(instr.dst, value, span)
    }

    // ---- Construction ----

    fn exec_make_map(&mut self, instr: &Instruction, span: Span) -> Result<(), EvalError> {
        let slots = instr
            .op2
            .checked_mul(2)
            .ok_or_else(|| EvalError::internal(span, "map entry count out of range"))?;
        let run = self.read_run(instr.op1, slots, span)?;
        let mut map = ValueMap::with_capacity(instr.op2 as usize);
        let mut run = run.into_iter();
        while let (Some(key), Some(value)) = (run.next(), run.next()) {
            let key = MapKey::from_value(&key).ok_or(EvalError::UnexpectedMapKeyType {
                span,
                found: key.kind(),
            })?;
            // Re-inserting keeps the first position and the last value.
            map.insert(key, value);
        }
        self.write(instr.dst, Value::Map(map), span)
    }

    fn exec_make_msg(
        &mut self,
        program: &Program,
        instr: &Instruction,
        span: Span,
    ) -> Result<(), EvalError> {
        let names = program
            .message_fields
            .get(instr.op2 as usize)
            .ok_or_else(|| EvalError::internal(span, "message field table index out of range"))?;
        let type_name = string_operand(program, instr.op3, span)?;
        let count = u32::try_from(names.len())
            .map_err(|_| EvalError::internal(span, "message field count out of range"))?;
        let values = self.read_run(instr.op1, count, span)?;
        let types = self.types.ok_or_else(|| EvalError::NoSuchType {
            span,
            type_name: type_name.to_string(),
        })?;
        let fields = names.iter().cloned().zip(values).collect();
        let message = types.construct(type_name, fields, span)?;
        self.write(instr.dst, message, span)
    }

    // ---- Loops ----

    fn exec_iter_init(&mut self, instr: &Instruction, span: Span) -> Result<(), EvalError> {
        let items = match self.read(instr.op1, span)? {
            Value::List(items) => items.clone(),
            Value::Map(map) => map.keys().map(MapKey::to_value).collect(),
            other => {
                return Err(EvalError::InvalidMacroCall {
                    span,
                    reason: format!(
                        "comprehension target must be a list or map, found {}",
                        other.kind()
                    ),
                })
            }
        };
        self.iterators.insert(instr.dst, IterState::new(items));
        Ok(())
    }
}

fn string_operand(program: &Program, index: u32, span: Span) -> Result<&str, EvalError> {
    program
        .string(index)
        .ok_or_else(|| EvalError::internal(span, format!("string index {index} out of range")))
}

/// In-bounds list position for an int or uint index.
fn list_position(index: &Value, len: usize) -> Option<usize> {
    let i = match index {
        Value::Int(i) => usize::try_from(*i).ok()?,
        Value::UInt(u) => usize::try_from(*u).ok()?,
        _ => return None,
    };
    (i < len).then_some(i)
}

/// Map lookup with int and uint keys matching across kinds by value.
fn map_lookup<'m>(map: &'m ValueMap, key: &Value) -> Option<&'m Value> {
    MapKey::from_value(key).and_then(|k| map_get(map, &k))
}
