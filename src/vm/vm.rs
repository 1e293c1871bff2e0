use std::cell::RefCell;
use std::io;
use std::mem;
use std::rc::Rc;

use crate::common::data::Data;
use crate::common::lambda::Lambda;
use crate::common::opcode::Opcode;
use crate::common::span::Span;
use crate::vm::closure::Closure;
use crate::vm::env::Env;
use crate::vm::stack::Slot;
use crate::vm::trace::{Trace, TraceKind};

/// A `VM` executes compiled `Lambda`s over a value stack and an
/// environment chain. Each call to `run` (and each function call inside
/// it) gets a fresh stack; the environment is the caller's to keep, so a
/// repl can carry bindings from one input to the next.
///
/// Calls recurse through the host stack: a user function is just a
/// nested execution with its own frame.
pub struct VM {
    stack: Vec<Slot>,
    out: Rc<RefCell<dyn io::Write>>,
}

impl VM {
    /// A VM whose built-in I/O writes to `out`.
    pub fn new(out: Rc<RefCell<dyn io::Write>>) -> VM {
        VM { stack: vec![], out }
    }

    /// A VM writing to standard output.
    pub fn stdout() -> VM {
        VM::new(Rc::new(RefCell::new(io::stdout())))
    }

    /// Executes a compiled program against an environment,
    /// yielding the value left on top of the stack (None when empty).
    pub fn run(&mut self, program: &Lambda, env: &Env) -> Result<Data, Trace> {
        self.stack.clear();
        self.execute(program, env)
    }

    /// Runs one frame: parks the current stack, dispatches the lambda
    /// over a fresh one, and restores the caller's stack afterwards.
    fn execute(&mut self, lambda: &Lambda, env: &Env) -> Result<Data, Trace> {
        let saved = mem::take(&mut self.stack);
        let result = self.dispatch(lambda, env);
        self.stack = saved;
        result
    }

    /// The interpreter loop. Runs until the instruction pointer passes
    /// the end of the code or a `ReturnValue` executes; any error aborts
    /// the frame and propagates to the caller.
    fn dispatch(&mut self, lambda: &Lambda, env: &Env) -> Result<Data, Trace> {
        let mut pc = 0;

        while pc < lambda.code.len() {
            let span = &lambda.spans[pc];
            let mut next = pc + 1;

            match &lambda.code[pc] {
                Opcode::PushConst(Data::Lambda(body)) => {
                    // a function constant captures the environment it is
                    // pushed in - its defining environment
                    let closure = Closure::wrap(Rc::clone(body), env);
                    self.push(Data::Closure(closure));
                }
                Opcode::PushConst(constant) => self.push(constant.clone()),

                Opcode::PushName(name) => match env.get(name) {
                    Some(value) => self.push(value),
                    None => {
                        return Err(self.error(
                            TraceKind::Name,
                            &format!("name `{}` is not defined", name),
                            span,
                        ))
                    }
                },

                Opcode::StoreName(name) => {
                    let value = self.pop_data();
                    if !env.define(name, value) {
                        return Err(self.error(
                            TraceKind::Name,
                            &format!("`{}` is already defined in this scope", name),
                            span,
                        ));
                    }
                }

                Opcode::AssignName(name) => {
                    let value = self.pop_data();
                    if !env.assign(name, value) {
                        return Err(self.error(
                            TraceKind::Name,
                            &format!("cannot assign to undefined name `{}`", name),
                            span,
                        ));
                    }
                }

                Opcode::BinaryAdd => self.arithmetic(span, i64::checked_add)?,
                Opcode::BinarySub => self.arithmetic(span, i64::checked_sub)?,
                Opcode::BinaryMul => self.arithmetic(span, i64::checked_mul)?,
                Opcode::BinaryDiv => {
                    let left = self.pop_integer(span)?;
                    let right = self.pop_integer(span)?;
                    if right == 0 {
                        return Err(self.error(TraceKind::Arithmetic, "division by zero", span));
                    }
                    match left.checked_div(right) {
                        Some(value) => self.push(Data::Integer(value)),
                        None => {
                            return Err(self.error(
                                TraceKind::Arithmetic,
                                "integer overflow",
                                span,
                            ))
                        }
                    }
                }

                Opcode::BinaryEq => self.comparison(span, |l, r| l == r)?,
                Opcode::BinaryGt => self.comparison(span, |l, r| l > r)?,
                Opcode::BinaryLt => self.comparison(span, |l, r| l < r)?,
                Opcode::BinaryGe => self.comparison(span, |l, r| l >= r)?,
                Opcode::BinaryLe => self.comparison(span, |l, r| l <= r)?,

                Opcode::BinaryAnd => {
                    let left = self.pop_bool(span)?;
                    let right = self.pop_bool(span)?;
                    self.push(Data::Boolean(left && right));
                }
                Opcode::BinaryOr => {
                    let left = self.pop_bool(span)?;
                    let right = self.pop_bool(span)?;
                    self.push(Data::Boolean(left || right));
                }

                Opcode::BinaryIndex => {
                    let indexed = self.pop_data();
                    let index = self.pop_data();
                    let element = self.index(indexed, index, span)?;
                    self.push(element);
                }

                Opcode::UnaryMinus => {
                    let value = self.pop_integer(span)?;
                    match value.checked_neg() {
                        Some(negated) => self.push(Data::Integer(negated)),
                        None => {
                            return Err(self.error(
                                TraceKind::Arithmetic,
                                "integer overflow",
                                span,
                            ))
                        }
                    }
                }

                Opcode::CallFunction(count) => self.call(*count, span)?,

                Opcode::MakeList(count) => {
                    // the compiler emitted elements in reverse, so popping
                    // yields them in textual order
                    let items = (0..*count).map(|_| self.pop_data()).collect();
                    self.push(Data::list(items));
                }

                Opcode::MakeMap(count) => {
                    let mut pairs: Vec<(Data, Data)> = (0..*count)
                        .map(|_| {
                            let value = self.pop_data();
                            let key = self.pop_data();
                            (key, value)
                        })
                        .collect();
                    // popped back-to-front; maps preserve declaration order
                    pairs.reverse();
                    self.push(Data::map(pairs));
                }

                Opcode::ListNext(skip) => match self.list_next(pc, span)? {
                    Some(element) => self.push(element),
                    None => next = branch(pc, *skip),
                },

                Opcode::ReturnValue => return Ok(self.result()),

                Opcode::RelJump(offset) => next = branch(pc, *offset),

                Opcode::RelJumpIfFalse(offset) => {
                    if !self.pop_bool(span)? {
                        next = branch(pc, *offset);
                    }
                }
            }

            pc = next;
        }

        Ok(self.result())
    }

    // stack plumbing

    fn push(&mut self, data: Data) {
        self.stack.push(Slot::Data(data));
    }

    /// Pops a value the compiler guaranteed is there.
    fn pop_data(&mut self) -> Data {
        match self.stack.pop() {
            Some(Slot::Data(data)) => data,
            _ => unreachable!("compiled code never pops an empty stack"),
        }
    }

    fn pop_integer(&mut self, span: &Span) -> Result<i64, Trace> {
        match self.pop_data() {
            Data::Integer(value) => Ok(value),
            other => Err(self.error(
                TraceKind::Type,
                &format!("expected an integer, found {}", other.type_name()),
                span,
            )),
        }
    }

    fn pop_bool(&mut self, span: &Span) -> Result<bool, Trace> {
        match self.pop_data() {
            Data::Boolean(value) => Ok(value),
            other => Err(self.error(
                TraceKind::Type,
                &format!("expected a bool, found {}", other.type_name()),
                span,
            )),
        }
    }

    /// The value a finished frame yields: the top of stack, or None.
    fn result(&mut self) -> Data {
        match self.stack.pop() {
            Some(Slot::Data(data)) => data,
            _ => Data::None,
        }
    }

    fn error(&self, kind: TraceKind, message: &str, span: &Span) -> Trace {
        Trace::error(kind, message, vec![span.clone()])
    }

    // the meatier instructions

    fn arithmetic(
        &mut self,
        span: &Span,
        apply: fn(i64, i64) -> Option<i64>,
    ) -> Result<(), Trace> {
        let left = self.pop_integer(span)?;
        let right = self.pop_integer(span)?;
        match apply(left, right) {
            Some(value) => {
                self.push(Data::Integer(value));
                Ok(())
            }
            None => Err(self.error(TraceKind::Arithmetic, "integer overflow", span)),
        }
    }

    fn comparison(&mut self, span: &Span, apply: fn(i64, i64) -> bool) -> Result<(), Trace> {
        let left = self.pop_integer(span)?;
        let right = self.pop_integer(span)?;
        self.push(Data::Boolean(apply(left, right)));
        Ok(())
    }

    fn index(&mut self, indexed: Data, index: Data, span: &Span) -> Result<Data, Trace> {
        match indexed {
            Data::List(items) => {
                let items = items.borrow();
                let at = self.list_position(&index, items.len(), span)?;
                Ok(items[at].clone())
            }
            Data::String(bytes) => {
                // strings index by byte and yield the addressed byte
                let at = self.list_position(&index, bytes.len(), span)?;
                Ok(Data::String(vec![bytes[at]]))
            }
            Data::Map(map) => match map.borrow().get(&index.repr()) {
                Some((_, value)) => Ok(value.clone()),
                None => Err(self.error(
                    TraceKind::Index,
                    &format!("map has no key {}", index.repr()),
                    span,
                )),
            },
            other => Err(self.error(
                TraceKind::Type,
                &format!("{} is not indexable", other.type_name()),
                span,
            )),
        }
    }

    /// Checks that `index` is an integer in `[0, len)`.
    fn list_position(&self, index: &Data, len: usize, span: &Span) -> Result<usize, Trace> {
        match index {
            Data::Integer(at) if (0..len as i64).contains(at) => Ok(*at as usize),
            Data::Integer(at) => Err(self.error(
                TraceKind::Index,
                &format!("index {} out of range for length {}", at, len),
                span,
            )),
            other => Err(self.error(
                TraceKind::Type,
                &format!("expected an integer index, found {}", other.type_name()),
                span,
            )),
        }
    }

    fn call(&mut self, count: usize, span: &Span) -> Result<(), Trace> {
        let callee = self.pop_data();
        let mut args: Vec<Data> = (0..count).map(|_| self.pop_data()).collect();
        // the last popped is the textually-first argument
        args.reverse();

        match callee {
            Data::Builtin(builtin) => {
                let result = builtin
                    .call(&args, &mut *self.out.borrow_mut())
                    .map_err(|trace| trace.add_span(span.clone()))?;
                self.push(result);
            }

            Data::Closure(closure) => {
                let params = &closure.lambda.params;
                if params.len() != args.len() {
                    return Err(self.error(
                        TraceKind::Arity,
                        &format!(
                            "function takes {} argument{} but {} {} given",
                            params.len(),
                            if params.len() == 1 { "" } else { "s" },
                            args.len(),
                            if args.len() == 1 { "was" } else { "were" },
                        ),
                        span,
                    ));
                }

                // a fresh scope under the *defining* environment
                let frame = closure.env.child();
                for (param, arg) in params.iter().zip(args) {
                    if !frame.define(param, arg) {
                        return Err(self.error(
                            TraceKind::Name,
                            &format!("duplicate parameter `{}`", param),
                            span,
                        ));
                    }
                }

                let result = self
                    .execute(&closure.lambda, &frame)
                    .map_err(|trace| trace.add_span(span.clone()))?;
                self.push(result);
            }

            other => {
                return Err(self.error(
                    TraceKind::Type,
                    &format!("{} is not callable", other.type_name()),
                    span,
                ))
            }
        }
        Ok(())
    }

    /// Advances the iteration driven by the `ListNext` at `pc`.
    /// A list on top of the stack becomes an iterator slot owned by this
    /// instruction; each pass yields the next element. On exhaustion the
    /// slot (and anything left above it) is discarded and `None` signals
    /// the branch past the loop.
    fn list_next(&mut self, pc: usize, span: &Span) -> Result<Option<Data>, Trace> {
        if let Some(Slot::Data(Data::List(_))) = self.stack.last() {
            match self.stack.pop() {
                Some(Slot::Data(Data::List(items))) => {
                    self.stack.push(Slot::Iter { owner: pc, items, index: 0 });
                }
                _ => unreachable!(),
            }
        }

        let position = self
            .stack
            .iter()
            .rposition(|slot| matches!(slot, Slot::Iter { owner, .. } if *owner == pc));

        let Some(at) = position else {
            let found = match self.stack.last() {
                Some(Slot::Data(data)) => data.type_name(),
                _ => "nothing",
            };
            return Err(self.error(
                TraceKind::Type,
                &format!("for loops iterate over lists, found {}", found),
                span,
            ));
        };

        let Slot::Iter { items, index, .. } = &mut self.stack[at] else {
            unreachable!();
        };

        let element = items.borrow().get(*index).cloned();
        match element {
            Some(element) => {
                *index += 1;
                Ok(Some(element))
            }
            None => {
                self.stack.truncate(at);
                Ok(None)
            }
        }
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// The address after a taken branch: offsets count from the
/// instruction following the branch.
fn branch(pc: usize, offset: isize) -> usize {
    (pc as isize + 1 + offset) as usize
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;
    use crate::compiler::{gen, lex, parse};
    use crate::vm::builtins::prelude;

    fn run(source: &str) -> Result<Data, Trace> {
        let program = gen(&parse(lex(Source::source(source)).unwrap()).unwrap()).unwrap();
        VM::stdout().run(&program, &prelude())
    }

    fn value(source: &str) -> Data {
        run(source).unwrap()
    }

    fn failure(source: &str) -> Trace {
        run(source).unwrap_err()
    }

    #[test]
    fn arithmetic_and_grouping() {
        assert_eq!(value("(42 * (1 + 2 - 1)) / 2"), Data::Integer(42));
        assert_eq!(value("10 // 3"), Data::Integer(3));
        assert_eq!(value("-(1 + 2)"), Data::Integer(-3));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(value("1 < 2"), Data::Boolean(true));
        assert_eq!(value("2 <= 1"), Data::Boolean(false));
        assert_eq!(value("1 == 1 and 2 > 1"), Data::Boolean(true));
        assert_eq!(value("1 == 2 or 1 >= 2"), Data::Boolean(false));
    }

    #[test]
    fn let_and_assign() {
        assert_eq!(value("let x = 1\nx = x + 41\nx"), Data::Integer(42));
    }

    #[test]
    fn redefinition_is_a_name_error() {
        let trace = failure("let x = 1\nlet x = 2");
        assert_eq!(trace.kind, TraceKind::Name);
    }

    #[test]
    fn unbound_names() {
        assert_eq!(failure("missing").kind, TraceKind::Name);
        assert_eq!(failure("missing = 1").kind, TraceKind::Name);
    }

    #[test]
    fn division_by_zero() {
        let trace = failure("1 / 0");
        assert_eq!(trace.kind, TraceKind::Arithmetic);
        assert_eq!(trace.message, "division by zero");
    }

    #[test]
    fn overflow_is_checked() {
        assert_eq!(failure("9223372036854775807 + 1").kind, TraceKind::Arithmetic);
        assert_eq!(value("-9223372036854775807 - 1"), Data::Integer(i64::MIN));
        assert_eq!(failure("-9223372036854775807 - 2").kind, TraceKind::Arithmetic);
    }

    #[test]
    fn type_errors_in_operators() {
        assert_eq!(failure("1 + \"a\"").kind, TraceKind::Type);
        assert_eq!(failure("true and 1").kind, TraceKind::Type);
        assert_eq!(failure("\"a\" < \"b\"").kind, TraceKind::Type);
    }

    #[test]
    fn branching() {
        assert_eq!(
            value("let x = 0\nif true { x = 42 } else { x = 666 }\nx"),
            Data::Integer(42),
        );
        assert_eq!(
            value("let x = 0\nif false { x = 666 } elif x == 0 { x = 42 }\nx"),
            Data::Integer(42),
        );
        assert_eq!(
            value("let x = 0\nif false { x = 666 } elif x == 1 { x = 667 } else { x = 42 }\nx"),
            Data::Integer(42),
        );
    }

    #[test]
    fn while_loops() {
        assert_eq!(value("let x = 0\nwhile x < 42 { x = x + 1 }\nx"), Data::Integer(42));
    }

    #[test]
    fn for_loops() {
        assert_eq!(value("let x = 0\nfor i in range(6) { x = x + 7 }\nx"), Data::Integer(42));
        assert_eq!(value("let x = 0\nfor i in [1, 2, 3] { x = x + i }\nx"), Data::Integer(6));
        assert_eq!(value("let x = 42\nfor i in [] { x = 666 }\nx"), Data::Integer(42));
    }

    #[test]
    fn loop_variable_is_assigned_not_shadowed() {
        // the counter mutated inside the nested loop must be the outer one
        assert_eq!(
            value("let x = 0\nfor i in range(3) { for j in range(3) { x = x + 1 } }\nx"),
            Data::Integer(9),
        );
    }

    #[test]
    fn break_and_continue() {
        assert_eq!(
            value("let x = 0\nwhile true { x = x + 1\nif x == 42 { break } }\nx"),
            Data::Integer(42),
        );
        assert_eq!(
            value("let x = 0\nfor i in range(10) { if i > 3 { continue }\nx = x + i }\nx"),
            Data::Integer(6),
        );
        assert_eq!(
            value("let x = 0\nfor i in range(10) { if i == 4 { break }\nx = x + 1 }\nx"),
            Data::Integer(4),
        );
    }

    #[test]
    fn nested_break_does_not_derail_outer_loop() {
        // the inner loop abandons its iterator on the stack every pass;
        // the outer loop must keep iterating its own
        assert_eq!(
            value("let x = 0\nfor i in range(3) { for j in range(5) { break }\nx = x + 1 }\nx"),
            Data::Integer(3),
        );
    }

    #[test]
    fn expression_statements_in_loop_bodies_are_harmless() {
        // each pass leaves a value on the stack; iteration must survive
        assert_eq!(value("let x = 0\nfor i in range(4) { i\nx = x + i }\nx"), Data::Integer(6));
    }

    #[test]
    fn iterating_a_non_list() {
        assert_eq!(failure("for i in 42 { }").kind, TraceKind::Type);
    }

    #[test]
    fn functions_and_returns() {
        assert_eq!(value("fn return42() { return 42 }\nlet x = return42()\nx"), Data::Integer(42));
        assert_eq!(value("fn f(a, b) { return a + b }\nf(40, 2)"), Data::Integer(42));
        assert_eq!(value("fn f() { return }\nf()"), Data::None);
        // falling off the end yields the last expression value
        assert_eq!(value("fn f() { 42 }\nf()"), Data::Integer(42));
        assert_eq!(value("fn f() { let x = 1 }\nf()"), Data::None);
    }

    #[test]
    fn recursion() {
        assert_eq!(
            value("fn fac(n) { if n < 2 { return 1 }\nreturn n * fac(n - 1) }\nfac(5)"),
            Data::Integer(120),
        );
    }

    #[test]
    fn call_arity_is_checked() {
        let trace = failure("fn f(a, b) { return a + b }\nf(1, 2, 3)");
        assert_eq!(trace.kind, TraceKind::Arity);
        assert_eq!(failure("fn f(a) { return a }\nf()").kind, TraceKind::Arity);
    }

    #[test]
    fn calling_a_non_function() {
        assert_eq!(failure("let x = 1\nx(2)").kind, TraceKind::Type);
    }

    #[test]
    fn function_locals_are_dropped_with_the_call() {
        let trace = failure("fn f() { let local = 1\nreturn local }\nf()\nlocal");
        assert_eq!(trace.kind, TraceKind::Name);
    }

    #[test]
    fn functions_close_over_the_defining_environment() {
        // `base` is global; calls see it through the captured env,
        // not through the caller's locals
        assert_eq!(
            value("let base = 40\nfn add(n) { return base + n }\nfn caller() { let base = 0\nreturn add(2) }\ncaller()"),
            Data::Integer(42),
        );
    }

    #[test]
    fn tracebacks_collect_call_sites() {
        let trace = failure("fn inner() { return 1 / 0 }\nfn outer() { return inner() }\nouter()");
        assert_eq!(trace.kind, TraceKind::Arithmetic);
        // failing op, inner call site, outer call site
        assert_eq!(trace.spans.len(), 3);
    }

    #[test]
    fn indexing() {
        assert_eq!(value("[1, 2, 3][2]"), Data::Integer(3));
        assert_eq!(value("\"abc\"[0]"), Data::String(b"a".to_vec()));
        assert_eq!(value("let m = {\"one\": 1}\nm[\"one\"]"), Data::Integer(1));
        assert_eq!(value("let xs = [[1], [2]]\nxs[1][0]"), Data::Integer(2));
    }

    #[test]
    fn string_indexing_is_by_byte() {
        // "é" is the two-byte sequence 0xC3 0xA9; each index addresses
        // one raw byte, and the result is exactly that byte
        assert_eq!(value("\"é\"[0]"), Data::String(vec![0xC3]));
        assert_eq!(value("\"é\"[1]"), Data::String(vec![0xA9]));
        assert_eq!(failure("\"é\"[2]").kind, TraceKind::Index);
        assert_eq!(value("\"aé\"[0]"), Data::String(b"a".to_vec()));
    }

    #[test]
    fn index_failures() {
        assert_eq!(failure("[1, 2][2]").kind, TraceKind::Index);
        assert_eq!(failure("[1, 2][-1]").kind, TraceKind::Index);
        assert_eq!(failure("\"ab\"[5]").kind, TraceKind::Index);
        assert_eq!(failure("{\"a\": 1}[\"b\"]").kind, TraceKind::Index);
        assert_eq!(failure("42[0]").kind, TraceKind::Type);
        assert_eq!(failure("[1][\"0\"]").kind, TraceKind::Type);
    }

    #[test]
    fn map_keys_are_bucketed_by_repr() {
        // integer 1 and string "1" repr differently, so both fit
        assert_eq!(value("let m = {1: 10, \"1\": 20}\nm[1]"), Data::Integer(10));
        assert_eq!(value("let m = {1: 10, \"1\": 20}\nm[\"1\"]"), Data::Integer(20));
    }

    #[test]
    fn builtin_output_is_ordered() {
        let sink = Rc::new(RefCell::new(vec![]));
        let mut vm = VM::new(sink.clone());

        let source = "for i in range(3) { println(i) }\nprint(\"done\")";
        let program = gen(&parse(lex(Source::source(source)).unwrap()).unwrap()).unwrap();
        vm.run(&program, &prelude()).unwrap();

        assert_eq!(String::from_utf8(sink.borrow().clone()).unwrap(), "0\n1\n2\ndone");
    }

    #[test]
    fn statements_are_stack_neutral() {
        let sources = [
            "let x = 1",
            "let y = 1\ny = 2",
            "let z = 0\nif z == 0 { z = 1 } else { z = 2 }",
            "let w = 0\nwhile w < 3 { w = w + 1 }",
            "let v = 0\nfor i in range(3) { v = v + i }",
            "fn f() { return 1 }",
        ];

        for source in sources {
            let program = gen(&parse(lex(Source::source(source)).unwrap()).unwrap()).unwrap();
            let mut vm = VM::stdout();
            // nothing on the stack at the end: the result is None
            assert_eq!(vm.run(&program, &prelude()).unwrap(), Data::None, "{:?}", source);
            assert_eq!(vm.depth(), 0, "statements of {:?} left stack slots", source);
        }
    }

    #[test]
    fn each_run_gets_a_fresh_stack_and_keeps_the_env() {
        let env = prelude();
        let mut vm = VM::stdout();

        let first = gen(&parse(lex(Source::source("let x = 41")).unwrap()).unwrap()).unwrap();
        vm.run(&first, &env).unwrap();

        let second = gen(&parse(lex(Source::source("x + 1")).unwrap()).unwrap()).unwrap();
        assert_eq!(vm.run(&second, &env).unwrap(), Data::Integer(42));
    }

    #[test]
    fn scoping_across_blocks() {
        // a function-local `let` shadows the global without clobbering it
        assert_eq!(
            value("let x = 1\nfn f() { let x = 2\nreturn x }\nf()\nx"),
            Data::Integer(1),
        );
    }

    #[test]
    fn sequential_for_loops_share_their_variable() {
        // both loops reuse the one hoisted binding for `i`
        assert_eq!(
            value("let x = 0\nfor i in range(2) { x = x + i }\nfor i in range(3) { x = x + i }\nx"),
            Data::Integer(4),
        );
    }

    #[test]
    fn loop_variable_outlives_its_loop() {
        assert_eq!(value("for i in range(5) { }\ni"), Data::Integer(4));
    }

    #[test]
    fn loop_variable_collides_across_runs_in_one_env() {
        // the second input's prologue re-stores `i` into the same
        // persistent environment
        let env = prelude();
        let mut vm = VM::stdout();
        let program = gen(&parse(lex(Source::source("for i in range(2) { }")).unwrap()).unwrap()).unwrap();

        vm.run(&program, &env).unwrap();
        assert_eq!(vm.run(&program, &env).unwrap_err().kind, TraceKind::Name);
    }

    #[test]
    fn let_colliding_with_a_loop_variable() {
        // the for binding is created in the frame prologue, so a `let`
        // of the same name is a redefinition
        assert_eq!(failure("let i = 0\nfor i in range(2) { }").kind, TraceKind::Name);
    }
}
