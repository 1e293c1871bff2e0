use std::rc::Rc;

use crate::common::data::Data;
use crate::common::lambda::Lambda;
use crate::common::opcode::Opcode;
use crate::common::span::{Span, Spanned};
use crate::compiler::ast::{Block, Expr, Infix, Prefix, Stmt};
use crate::compiler::syntax::Syntax;

/// The bytecode generator walks the tree and emits a flat instruction
/// sequence with precomputed relative branch offsets - no labels survive
/// to the VM. Branches are emitted with a zero offset and patched once
/// the length of the code they skip is known.
pub fn gen(block: &Block) -> Result<Lambda, Syntax> {
    gen_lambda(vec![], block)
}

fn gen_lambda(params: Vec<String>, block: &Block) -> Result<Lambda, Syntax> {
    let mut gen = Gen {
        lambda: Lambda::empty(params),
        loops: vec![],
    };

    // hoist every for-loop variable into the frame prologue: the binding
    // is created once per execution, so re-entering a loop (or nesting
    // one inside another) reuses it instead of tripping the
    // redefinition check in `StoreName`
    let mut bindings = vec![];
    for_bindings(block, &mut bindings);
    for binding in &bindings {
        gen.emit(Opcode::PushConst(Data::None), &binding.span);
        gen.emit(Opcode::StoreName(binding.item.clone()), &binding.span);
    }

    gen.block(block)?;
    Ok(gen.lambda)
}

/// Collects the distinct for-loop variables of a lambda body, in first
/// appearance order. `fn` bodies are skipped: they compile to their own
/// lambdas with their own prologues.
fn for_bindings(block: &Block, names: &mut Vec<Spanned<String>>) {
    for statement in block {
        match &statement.item {
            Stmt::For { binding, body, .. } => {
                if !names.iter().any(|name| name.item == binding.item) {
                    names.push(binding.clone());
                }
                for_bindings(body, names);
            }
            Stmt::If { clauses, otherwise } => {
                for clause in clauses {
                    for_bindings(&clause.body, names);
                }
                if let Some(body) = otherwise {
                    for_bindings(body, names);
                }
            }
            Stmt::While { body, .. } => for_bindings(body, names),
            _ => (),
        }
    }
}

/// Branch targets of the loop currently being compiled.
/// `continue` jumps backwards to a known index; `break` jumps forward,
/// so its instructions are recorded and patched when the loop ends.
struct LoopFrame {
    continue_to: usize,
    breaks: Vec<usize>,
}

struct Gen {
    lambda: Lambda,
    loops: Vec<LoopFrame>,
}

impl Gen {
    fn emit(&mut self, op: Opcode, span: &Span) -> usize {
        self.lambda.emit(op, span)
    }

    fn here(&self) -> usize {
        self.lambda.code.len()
    }

    /// Points the branch at `at` to `target`.
    /// Offsets count from the instruction after the branch.
    fn patch(&mut self, at: usize, target: usize) {
        let offset = target as isize - (at as isize + 1);
        match &mut self.lambda.code[at] {
            Opcode::RelJump(k) | Opcode::RelJumpIfFalse(k) | Opcode::ListNext(k) => *k = offset,
            other => unreachable!("patched a non-branch instruction {:?}", other),
        }
    }

    fn block(&mut self, block: &Block) -> Result<(), Syntax> {
        for statement in block {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &Spanned<Stmt>) -> Result<(), Syntax> {
        let span = &statement.span;

        match &statement.item {
            Stmt::Expression(expr) => self.expression(expr),

            Stmt::Let { name, value } => {
                self.expression(value)?;
                self.emit(Opcode::StoreName(name.item.clone()), &name.span);
                Ok(())
            }

            Stmt::Assign { name, value } => {
                self.expression(value)?;
                self.emit(Opcode::AssignName(name.item.clone()), &name.span);
                Ok(())
            }

            Stmt::Fn { name, params, body } => {
                let params = params.iter().map(|param| param.item.clone()).collect();
                let lambda = gen_lambda(params, body)?;
                self.emit(Opcode::PushConst(Data::Lambda(Rc::new(lambda))), span);
                self.emit(Opcode::StoreName(name.item.clone()), &name.span);
                Ok(())
            }

            Stmt::Return(value) => {
                match value {
                    Some(expr) => self.expression(expr)?,
                    None => {
                        self.emit(Opcode::PushConst(Data::None), span);
                    }
                }
                self.emit(Opcode::ReturnValue, span);
                Ok(())
            }

            Stmt::If { clauses, otherwise } => {
                // each clause: cond, branch past its body if false,
                // body, jump to the end of the whole statement
                let mut ends = vec![];

                for clause in clauses {
                    self.expression(&clause.cond)?;
                    let skip = self.emit(Opcode::RelJumpIfFalse(0), &clause.cond.span);
                    self.block(&clause.body)?;
                    ends.push(self.emit(Opcode::RelJump(0), span));
                    let after = self.here();
                    self.patch(skip, after);
                }

                if let Some(body) = otherwise {
                    self.block(body)?;
                }

                let end = self.here();
                for jump in ends {
                    self.patch(jump, end);
                }
                Ok(())
            }

            Stmt::While { cond, body } => {
                let top = self.here();
                self.expression(cond)?;
                let exit = self.emit(Opcode::RelJumpIfFalse(0), &cond.span);

                self.loops.push(LoopFrame { continue_to: top, breaks: vec![] });
                self.block(body)?;
                let frame = self.loops.pop().unwrap();

                let back = self.emit(Opcode::RelJump(0), span);
                self.patch(back, top);

                let end = self.here();
                self.patch(exit, end);
                for jump in frame.breaks {
                    self.patch(jump, end);
                }
                Ok(())
            }

            Stmt::For { binding, iter, body } => {
                // the binding itself was created in the frame prologue
                self.expression(iter)?;
                let next = self.emit(Opcode::ListNext(0), &iter.span);
                self.emit(Opcode::AssignName(binding.item.clone()), &binding.span);

                self.loops.push(LoopFrame { continue_to: next, breaks: vec![] });
                self.block(body)?;
                let frame = self.loops.pop().unwrap();

                let back = self.emit(Opcode::RelJump(0), span);
                self.patch(back, next);

                let end = self.here();
                self.patch(next, end);
                for jump in frame.breaks {
                    self.patch(jump, end);
                }
                Ok(())
            }

            Stmt::Break => {
                if self.loops.is_empty() {
                    return Err(Syntax::compile("`break` outside of a loop", span.clone()));
                }
                let jump = self.emit(Opcode::RelJump(0), span);
                match self.loops.last_mut() {
                    Some(frame) => frame.breaks.push(jump),
                    None => unreachable!(),
                }
                Ok(())
            }

            Stmt::Continue => {
                let target = match self.loops.last() {
                    Some(frame) => frame.continue_to,
                    None => {
                        return Err(Syntax::compile(
                            "`continue` outside of a loop",
                            span.clone(),
                        ))
                    }
                };
                let jump = self.emit(Opcode::RelJump(0), span);
                self.patch(jump, target);
                Ok(())
            }
        }
    }

    fn expression(&mut self, expr: &Spanned<Expr>) -> Result<(), Syntax> {
        let span = &expr.span;

        match &expr.item {
            Expr::Integer(n) => {
                self.emit(Opcode::PushConst(Data::Integer(*n)), span);
            }
            Expr::Boolean(b) => {
                self.emit(Opcode::PushConst(Data::Boolean(*b)), span);
            }
            Expr::Str(s) => {
                self.emit(Opcode::PushConst(Data::String(s.clone().into_bytes())), span);
            }
            Expr::Symbol(name) => {
                self.emit(Opcode::PushName(name.clone()), span);
            }

            Expr::List(items) => {
                // emitted in reverse so the VM pops them in textual order
                for item in items.iter().rev() {
                    self.expression(item)?;
                }
                self.emit(Opcode::MakeList(items.len()), span);
            }

            Expr::Map(pairs) => {
                for (key, value) in pairs {
                    self.expression(key)?;
                    self.expression(value)?;
                }
                self.emit(Opcode::MakeMap(pairs.len()), span);
            }

            Expr::Prefix(Prefix::Negate, operand) => {
                self.expression(operand)?;
                self.emit(Opcode::UnaryMinus, span);
            }

            Expr::Infix(op, left, right) => {
                // right first: the VM pops left, then right
                self.expression(right)?;
                self.expression(left)?;
                self.emit(binary_opcode(*op), span);
            }

            Expr::Call { callee, args } => {
                for arg in args {
                    self.expression(arg)?;
                }
                self.expression(callee)?;
                self.emit(Opcode::CallFunction(args.len()), span);
            }

            Expr::Index { item, index } => {
                self.expression(index)?;
                self.expression(item)?;
                self.emit(Opcode::BinaryIndex, span);
            }
        }
        Ok(())
    }
}

fn binary_opcode(op: Infix) -> Opcode {
    match op {
        Infix::Add => Opcode::BinaryAdd,
        Infix::Sub => Opcode::BinarySub,
        Infix::Mul => Opcode::BinaryMul,
        // the value domain has no floats; `//` is ordinary division
        Infix::Div | Infix::FloorDiv => Opcode::BinaryDiv,
        Infix::Eq => Opcode::BinaryEq,
        Infix::Gt => Opcode::BinaryGt,
        Infix::Lt => Opcode::BinaryLt,
        Infix::Ge => Opcode::BinaryGe,
        Infix::Le => Opcode::BinaryLe,
        Infix::And => Opcode::BinaryAnd,
        Infix::Or => Opcode::BinaryOr,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;
    use crate::compiler::lex::lex;
    use crate::compiler::parse::parse;
    use crate::compiler::syntax::SyntaxKind;

    fn compiled(source: &str) -> Lambda {
        gen(&parse(lex(Source::source(source)).unwrap()).unwrap()).unwrap()
    }

    use Opcode::*;

    fn int(n: i64) -> Opcode {
        PushConst(Data::Integer(n))
    }

    fn name(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn literals_and_names() {
        assert_eq!(
            compiled("let x = 1\nx").code,
            vec![int(1), StoreName(name("x")), PushName(name("x"))],
        );
    }

    #[test]
    fn infix_pushes_right_operand_first() {
        assert_eq!(
            compiled("1 - 2").code,
            vec![int(2), int(1), BinarySub],
        );
    }

    #[test]
    fn call_arguments_in_textual_order() {
        assert_eq!(
            compiled("f(1, 2)").code,
            vec![int(1), int(2), PushName(name("f")), CallFunction(2)],
        );
    }

    #[test]
    fn list_elements_reversed_map_pairs_in_order() {
        assert_eq!(
            compiled("[1, 2, 3]").code,
            vec![int(3), int(2), int(1), MakeList(3)],
        );
        assert_eq!(
            compiled("{1: 2, 3: 4}").code,
            vec![int(1), int(2), int(3), int(4), MakeMap(2)],
        );
    }

    #[test]
    fn index_pushes_index_then_item() {
        assert_eq!(
            compiled("xs[0]").code,
            vec![int(0), PushName(name("xs")), BinaryIndex],
        );
    }

    #[test]
    fn if_else_offsets() {
        assert_eq!(
            compiled("if true { 1 } else { 2 }").code,
            vec![
                PushConst(Data::Boolean(true)),
                RelJumpIfFalse(2),
                int(1),
                RelJump(1),
                int(2),
            ],
        );
    }

    #[test]
    fn elif_chain_offsets() {
        assert_eq!(
            compiled("if a { 1 } elif b { 2 } else { 3 }").code,
            vec![
                PushName(name("a")),
                RelJumpIfFalse(2),
                int(1),
                RelJump(5), // to 9, the end
                PushName(name("b")),
                RelJumpIfFalse(2),
                int(2),
                RelJump(1), // to 9, the end
                int(3),
            ],
        );
    }

    #[test]
    fn while_offsets() {
        assert_eq!(
            compiled("while x < 42 { x = x + 1 }").code,
            vec![
                int(42),
                PushName(name("x")),
                BinaryLt,
                RelJumpIfFalse(5),
                int(1),
                PushName(name("x")),
                BinaryAdd,
                AssignName(name("x")),
                RelJump(-9),
            ],
        );
    }

    #[test]
    fn for_offsets() {
        assert_eq!(
            compiled("for i in xs { }").code,
            vec![
                PushConst(Data::None),
                StoreName(name("i")),
                PushName(name("xs")),
                ListNext(2),
                AssignName(name("i")),
                RelJump(-3),
            ],
        );
    }

    #[test]
    fn break_and_continue_offsets() {
        assert_eq!(
            compiled("while true { break\ncontinue }").code,
            vec![
                PushConst(Data::Boolean(true)),
                RelJumpIfFalse(3),
                RelJump(2),  // break: to 5, the end
                RelJump(-4), // continue: to 0, the condition
                RelJump(-5), // loop back edge
            ],
        );
    }

    #[test]
    fn for_variables_are_hoisted_once_per_frame() {
        // two loops over `i`, one nested loop over `j`: the prologue
        // creates each binding exactly once
        let program = compiled(
            "for i in xs { for j in ys { } }\nfor i in zs { }",
        );

        assert_eq!(
            program.code[..4],
            [
                PushConst(Data::None),
                StoreName(name("i")),
                PushConst(Data::None),
                StoreName(name("j")),
            ],
        );
        let stores = program
            .code
            .iter()
            .filter(|op| matches!(op, StoreName(_)))
            .count();
        assert_eq!(stores, 2);
    }

    #[test]
    fn break_outside_loop_is_a_compile_error() {
        let block = parse(lex(Source::source("break")).unwrap()).unwrap();
        let error = gen(&block).unwrap_err();
        assert_eq!(error.kind, SyntaxKind::Compile);
    }

    #[test]
    fn functions_compile_to_nested_lambdas() {
        let program = compiled("fn f(a, b) { return a + b }");
        assert_eq!(program.code.len(), 2);
        assert_eq!(program.code[1], StoreName(name("f")));

        match &program.code[0] {
            PushConst(Data::Lambda(lambda)) => {
                assert_eq!(lambda.params, vec![name("a"), name("b")]);
                assert_eq!(
                    lambda.code,
                    vec![
                        PushName(name("b")),
                        PushName(name("a")),
                        BinaryAdd,
                        ReturnValue,
                    ],
                );
            }
            other => panic!("expected a function constant, got {:?}", other),
        }
    }

    #[test]
    fn bare_return_pushes_none() {
        let program = compiled("fn f() { return }");
        match &program.code[0] {
            PushConst(Data::Lambda(lambda)) => {
                assert_eq!(lambda.code, vec![PushConst(Data::None), ReturnValue]);
            }
            other => panic!("expected a function constant, got {:?}", other),
        }
    }

    #[test]
    fn determinism() {
        let source = "let x = 0\nfor i in range(6) { x = x + 7 }\nif x > 10 { f(x) } else { }\nx";
        assert_eq!(compiled(source), compiled(source));
    }

    #[test]
    fn spans_cover_every_instruction() {
        let program = compiled("let x = 1\nwhile x < 3 { x = x + 1 }");
        assert_eq!(program.code.len(), program.spans.len());
    }
}
