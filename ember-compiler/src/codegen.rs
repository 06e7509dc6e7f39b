//! AST to bytecode (spec §4.H). A single-pass visitor that emits the
//! instruction stream, deduplicates the constant pool by equality, and
//! records a byte-offset-to-span side table for diagnostics.
//!
//! Function and type literals carry no captured environment — this language
//! has no closures, so both compile straight to constant-pool values built
//! once at codegen time, the same way an integer literal does. No opcode
//! beyond the table spec.md already calls "complete" is needed for either.

use crate::ast::{BinOp, Expr, FuncLit, Stmt, UnOp};
use ember_core::error::Error;
use ember_core::gc::Gc;
use ember_core::span::Span;
use ember_runtime::opcode::{Opcode, Operand};
use ember_runtime::types::code::Code;
use ember_runtime::types::func::{FuncObj, KFunc};
use ember_runtime::types::type_obj::TypeObj;
use ember_runtime::value::Value;

pub struct CodeGen {
    code: Vec<u8>,
    consts: Vec<Value>,
    spans: Vec<(u32, Span)>,
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            code: Vec::new(),
            consts: Vec::new(),
            spans: Vec::new(),
        }
    }

    /// Compile a whole program (spec §4.G: "A program is a block of
    /// statements") into one top-level `Code` object.
    pub fn compile_program(name: &str, program: &Stmt) -> Result<Gc<Code>, Error> {
        let mut cg = CodeGen::new();
        cg.emit_stmt(program)?;
        cg.emit_op(Opcode::RET_NONE);
        Ok(Gc::new(cg.finish(name)))
    }

    fn finish(self, name: &str) -> Code {
        Code::new(name, self.code, self.consts, self.spans)
    }

    // ---- low-level emission ----

    fn mark(&mut self, span: Span) {
        let offset = self.code.len() as u32;
        if self.spans.last().map(|(o, _)| *o) != Some(offset) {
            self.spans.push((offset, span));
        }
    }

    fn emit_op(&mut self, op: Opcode) {
        self.code.push(op as u8);
    }

    fn emit_u32_at(&mut self, pos: usize, value: u32) {
        self.code[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn emit_with_operand(&mut self, op: Opcode, operand: u32) {
        self.emit_op(op);
        self.code.extend_from_slice(&operand.to_le_bytes());
    }

    /// Emits `op` with a placeholder operand, returning the byte position of
    /// that operand so it can be patched once the target is known.
    fn emit_placeholder(&mut self, op: Opcode) -> usize {
        debug_assert!(matches!(
            op.operand(),
            Operand::RelJump | Operand::AbsJump
        ));
        self.emit_op(op);
        let pos = self.code.len();
        self.code.extend_from_slice(&0u32.to_le_bytes());
        pos
    }

    /// Patch a previously-emitted relative jump so it lands at the current
    /// position (spec §4.I: offset relative to the instruction after it).
    fn patch_rel_here(&mut self, operand_pos: usize) {
        let target = self.code.len() as i64;
        let base = (operand_pos + 4) as i64;
        let offset = (target - base) as i32;
        self.emit_u32_at(operand_pos, offset as u32);
    }

    fn patch_abs_here(&mut self, operand_pos: usize) {
        let target = self.code.len() as u32;
        self.emit_u32_at(operand_pos, target);
    }

    fn const_idx(&mut self, value: Value) -> u32 {
        if let Some(i) = self.consts.iter().position(|c| *c == value) {
            return i as u32;
        }
        self.consts.push(value);
        (self.consts.len() - 1) as u32
    }

    fn name_idx(&mut self, name: &str) -> u32 {
        self.const_idx(Value::str(name))
    }

    // ---- statements ----

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        self.mark(stmt.span());
        match stmt {
            Stmt::Expr(e) => {
                self.emit_expr(e)?;
                self.emit_op(Opcode::POPU);
            }
            Stmt::Ret(expr, _) => {
                match expr {
                    Some(e) => {
                        self.emit_expr(e)?;
                        self.emit_op(Opcode::RET);
                    }
                    None => self.emit_op(Opcode::RET_NONE),
                }
            }
            Stmt::Block(stmts, _) => {
                for s in stmts {
                    self.emit_stmt(s)?;
                }
            }
            Stmt::If {
                branches,
                else_branch,
                ..
            } => self.emit_if(branches, else_branch.as_deref())?,
            Stmt::While { cond, body, .. } => self.emit_while(cond, body)?,
            Stmt::Try {
                body,
                catch_name,
                handler,
                ..
            } => self.emit_try(body, catch_name.as_deref(), handler.as_deref())?,
            Stmt::For {
                vars, iter, body, ..
            } => self.emit_for(vars, iter, body)?,
            Stmt::Func(f) => self.emit_func_decl(f)?,
            Stmt::Type { name, methods, .. } => self.emit_type_decl(name, methods)?,
        }
        Ok(())
    }

    /// `if cond body (else alt)?` (spec §4.H): chained into nested
    /// `if`/`else` for each `elif`.
    fn emit_if(&mut self, branches: &[(Expr, Stmt)], else_branch: Option<&Stmt>) -> Result<(), Error> {
        let mut end_jumps = Vec::new();
        for (i, (cond, body)) in branches.iter().enumerate() {
            self.emit_expr(cond)?;
            let skip_body = self.emit_placeholder(Opcode::JMPF);
            self.emit_stmt(body)?;
            let is_last = i + 1 == branches.len();
            if !is_last || else_branch.is_some() {
                end_jumps.push(self.emit_placeholder(Opcode::JMP));
            }
            self.patch_rel_here(skip_body);
        }
        if let Some(alt) = else_branch {
            self.emit_stmt(alt)?;
        }
        for pos in end_jumps {
            self.patch_rel_here(pos);
        }
        Ok(())
    }

    /// `while cond body` (spec §4.H).
    fn emit_while(&mut self, cond: &Expr, body: &Stmt) -> Result<(), Error> {
        let loop_top = self.code.len();
        self.emit_expr(cond)?;
        let exit = self.emit_placeholder(Opcode::JMPF);
        self.emit_stmt(body)?;
        let back = self.emit_placeholder(Opcode::JMP);
        self.patch_jump_to(back, loop_top);
        self.patch_rel_here(exit);
        Ok(())
    }

    fn patch_jump_to(&mut self, operand_pos: usize, target: usize) {
        let base = (operand_pos + 4) as i64;
        let offset = (target as i64 - base) as i32;
        self.emit_u32_at(operand_pos, offset as u32);
    }

    /// `try body catch name? handler?` (spec §4.H): `EXC_ADD` registers the
    /// landing pad before the body, `EXC_REM` deregisters it after the body
    /// completes normally, and a `JMP` skips the handler in that case.
    fn emit_try(
        &mut self,
        body: &Stmt,
        catch_name: Option<&str>,
        handler: Option<&Stmt>,
    ) -> Result<(), Error> {
        let handler_patch = self.emit_placeholder(Opcode::EXC_ADD);
        self.emit_stmt(body)?;
        self.emit_op(Opcode::EXC_REM);
        let past_handler = self.emit_placeholder(Opcode::JMP);

        self.patch_abs_here(handler_patch);
        match catch_name {
            Some(name) => {
                let idx = self.name_idx(name);
                self.emit_with_operand(Opcode::STORE, idx);
            }
            None => self.emit_op(Opcode::POPU),
        }
        if let Some(h) = handler {
            self.emit_stmt(h)?;
        }
        self.patch_rel_here(past_handler);
        Ok(())
    }

    /// `for v in it body` / `for k, v in it body` (SPEC_FULL supplement 4):
    /// obtain an iterator via the `iter` builtin, then loop on `FOR_ITER`
    /// until it signals exhaustion.
    fn emit_for(&mut self, vars: &[String], iter_expr: &Expr, body: &Stmt) -> Result<(), Error> {
        let iter_name = self.name_idx("iter");
        self.emit_with_operand(Opcode::LOAD, iter_name);
        self.emit_expr(iter_expr)?;
        self.emit_with_operand(Opcode::CALL, 2);

        let loop_top = self.code.len();
        let exit = self.emit_placeholder(Opcode::FOR_ITER);

        match vars {
            [single] => {
                let idx = self.name_idx(single);
                self.emit_with_operand(Opcode::STORE, idx);
            }
            [first, second] => {
                self.emit_op(Opcode::DUP);
                let zero = self.const_idx(Value::int(0));
                self.emit_with_operand(Opcode::CONST, zero);
                self.emit_with_operand(Opcode::GETITEM, 2);
                let idx0 = self.name_idx(first);
                self.emit_with_operand(Opcode::STORE, idx0);

                self.emit_op(Opcode::DUP);
                let one = self.const_idx(Value::int(1));
                self.emit_with_operand(Opcode::CONST, one);
                self.emit_with_operand(Opcode::GETITEM, 2);
                let idx1 = self.name_idx(second);
                self.emit_with_operand(Opcode::STORE, idx1);

                self.emit_op(Opcode::POPU);
            }
            _ => unreachable!("parser only ever produces one or two for-loop variables"),
        }

        self.emit_stmt(body)?;
        let back = self.emit_placeholder(Opcode::JMP);
        self.patch_jump_to(back, loop_top);
        self.patch_rel_here(exit);
        Ok(())
    }

    fn emit_func_decl(&mut self, f: &FuncLit) -> Result<(), Error> {
        let func_value = Self::compile_func_literal(f)?;
        let idx = self.const_idx(func_value);
        self.emit_with_operand(Opcode::CONST, idx);
        let name_idx = self.name_idx(&f.name);
        self.emit_with_operand(Opcode::STORE, name_idx);
        Ok(())
    }

    fn compile_func_literal(f: &FuncLit) -> Result<Value, Error> {
        let code = CodeGen::compile_program(&f.name, &f.body)?;
        let kfunc = KFunc {
            name: f.name.clone(),
            code,
            params: f.params.clone(),
        };
        Ok(Value::Func(Gc::new(FuncObj::KFunc(kfunc))))
    }

    /// `type Name { func ... }` compiles the whole descriptor as one
    /// constant: a `TypeObj` with each member both registered in its
    /// attribute dictionary (general attribute lookup, bound-method wrapping
    /// per spec §4.D) and, for conventionally-named members, cached in the
    /// matching operator/protocol slot (spec §3 "Types").
    fn emit_type_decl(&mut self, name: &str, methods: &[FuncLit]) -> Result<(), Error> {
        let ty = TypeObj::new(name, Vec::new());
        for m in methods {
            let value = Self::compile_func_literal(m)?;
            ty.set_attr(&m.name, value.clone());
            let mut slots = ty.slots.borrow_mut();
            match m.name.as_str() {
                "new" => slots.new = Some(value),
                "init" => slots.init = Some(value),
                "str" => slots.str_ = Some(value),
                "repr" => slots.repr_ = Some(value),
                "hash" => slots.hash_ = Some(value),
                "call" => slots.call = Some(value),
                "getattr" => slots.getattr = Some(value),
                "setattr" => slots.setattr = Some(value),
                "getitem" => slots.getitem = Some(value),
                "setitem" => slots.setitem = Some(value),
                "add" => slots.add = Some(value),
                "sub" => slots.sub = Some(value),
                "mul" => slots.mul = Some(value),
                "div" => slots.div = Some(value),
                "mod" => slots.modulo = Some(value),
                "pow" => slots.pow = Some(value),
                "lt" => slots.lt = Some(value),
                "le" => slots.le = Some(value),
                "gt" => slots.gt = Some(value),
                "ge" => slots.ge = Some(value),
                "eq" => slots.eq = Some(value),
                "ne" => slots.ne = Some(value),
                "neg" => slots.neg = Some(value),
                "sqig" => slots.sqig = Some(value),
                _ => {}
            }
        }
        let idx = self.const_idx(Value::Type(Gc::new(ty)));
        self.emit_with_operand(Opcode::CONST, idx);
        let name_idx = self.name_idx(name);
        self.emit_with_operand(Opcode::STORE, name_idx);
        Ok(())
    }

    // ---- expressions ----

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), Error> {
        self.mark(expr.span());
        if let Some(folded) = fold_constant(expr) {
            let idx = self.const_idx(folded);
            self.emit_with_operand(Opcode::CONST, idx);
            return Ok(());
        }
        match expr {
            Expr::Int(v, _) => {
                let idx = self.const_idx(Value::Int(v.clone()));
                self.emit_with_operand(Opcode::CONST, idx);
            }
            Expr::Float(v, _) => {
                let idx = self.const_idx(Value::Float(*v));
                self.emit_with_operand(Opcode::CONST, idx);
            }
            Expr::Str(s, _) => {
                let idx = self.const_idx(Value::str(s.clone()));
                self.emit_with_operand(Opcode::CONST, idx);
            }
            Expr::Bool(true, _) => self.emit_op(Opcode::CONST_TRUE),
            Expr::Bool(false, _) => self.emit_op(Opcode::CONST_FALSE),
            Expr::None(_) => self.emit_op(Opcode::CONST_NONE),
            Expr::Var(name, _) => {
                let idx = self.name_idx(name);
                self.emit_with_operand(Opcode::LOAD, idx);
            }
            Expr::Attr(base, name, _) => {
                self.emit_expr(base)?;
                let idx = self.name_idx(name);
                self.emit_with_operand(Opcode::LOAD_A, idx);
            }
            Expr::Tuple(items, _) => {
                for item in items {
                    self.emit_expr(item)?;
                }
                self.emit_with_operand(Opcode::TUPLE, items.len() as u32);
            }
            Expr::List(items, _) => {
                for item in items {
                    self.emit_expr(item)?;
                }
                self.emit_with_operand(Opcode::LIST, items.len() as u32);
            }
            Expr::Dict(entries, _) => {
                for (k, v) in entries {
                    self.emit_expr(k)?;
                    self.emit_expr(v)?;
                }
                self.emit_with_operand(Opcode::DICT, (entries.len() * 2) as u32);
            }
            Expr::Call(callee, args, _) => {
                self.emit_expr(callee)?;
                for a in args {
                    self.emit_expr(a)?;
                }
                self.emit_with_operand(Opcode::CALL, (args.len() + 1) as u32);
            }
            Expr::Subscript(base, keys, _) => {
                self.emit_expr(base)?;
                for k in keys {
                    self.emit_expr(k)?;
                }
                self.emit_with_operand(Opcode::GETITEM, (keys.len() + 1) as u32);
            }
            Expr::Binary(op, lhs, rhs, _) => {
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                self.emit_op(binop_opcode(*op));
            }
            Expr::Unary(op, operand, _) => {
                self.emit_expr(operand)?;
                self.emit_op(unop_opcode(*op));
            }
            Expr::Assign(target, value, _) => self.emit_assign(target, value)?,
            Expr::And(lhs, rhs, _) => self.emit_short_circuit(lhs, rhs, Opcode::JMPF)?,
            Expr::Or(lhs, rhs, _) => self.emit_short_circuit(lhs, rhs, Opcode::JMPT)?,
        }
        Ok(())
    }

    /// `&&`/`||` lower via duplicate-and-branch jumps rather than an eager
    /// binary opcode (SPEC_FULL supplement 5, deciding spec §9's open
    /// question): evaluate `lhs`, keep a copy to test, and only evaluate
    /// `rhs` when the branch doesn't short-circuit.
    fn emit_short_circuit(&mut self, lhs: &Expr, rhs: &Expr, branch: Opcode) -> Result<(), Error> {
        self.emit_expr(lhs)?;
        self.emit_op(Opcode::DUP);
        let skip_rhs = self.emit_placeholder(branch);
        self.emit_op(Opcode::POPU);
        self.emit_expr(rhs)?;
        self.patch_rel_here(skip_rhs);
        Ok(())
    }

    /// Assignment always leaves exactly one value on the stack, matching
    /// every other expression (spec's instruction table has no push after
    /// `STORE`, so we read the binding straight back with a fresh `LOAD`;
    /// `STORE_A` and `SETITEM` already push the assigned value).
    fn emit_assign(&mut self, target: &Expr, value: &Expr) -> Result<(), Error> {
        match target {
            Expr::Var(name, _) => {
                self.emit_expr(value)?;
                let idx = self.name_idx(name);
                self.emit_with_operand(Opcode::STORE, idx);
                self.emit_with_operand(Opcode::LOAD, idx);
            }
            Expr::Attr(base, name, _) => {
                self.emit_expr(base)?;
                self.emit_expr(value)?;
                let idx = self.name_idx(name);
                self.emit_with_operand(Opcode::STORE_A, idx);
            }
            Expr::Subscript(base, keys, _) => {
                self.emit_expr(base)?;
                for k in keys {
                    self.emit_expr(k)?;
                }
                self.emit_expr(value)?;
                self.emit_with_operand(Opcode::SETITEM, (keys.len() + 2) as u32);
            }
            other => {
                return Err(Error::syntax("invalid assignment target").with_span(other.span()))
            }
        }
        Ok(())
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        CodeGen::new()
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::ADD,
        BinOp::Sub => Opcode::SUB,
        BinOp::Mul => Opcode::MUL,
        BinOp::Div => Opcode::DIV,
        BinOp::Mod => Opcode::MOD,
        BinOp::Pow => Opcode::POW,
        BinOp::Lt => Opcode::LT,
        BinOp::Le => Opcode::LE,
        BinOp::Gt => Opcode::GT,
        BinOp::Ge => Opcode::GE,
        BinOp::Eq => Opcode::EQ,
        BinOp::Ne => Opcode::NE,
    }
}

fn unop_opcode(op: UnOp) -> Opcode {
    match op {
        UnOp::Neg => Opcode::NEG,
        UnOp::Sqig => Opcode::SQIG,
    }
}

/// Constant folding for integer-literal operands only (spec §4.H: "binary
/// ops on two integer literals are evaluated at compile time... Non-integer
/// folding... [is an] explicit non-goal"). Recurses through subtrees that
/// are themselves entirely integer-literal arithmetic, so `1 + 2 * 3` folds
/// to a single `7` rather than leaving `2 * 3` unevaluated.
fn fold_constant(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Binary(..) | Expr::Unary(..) => eval_int(expr).map(Value::Int).or_else(|| {
            // Comparisons fold to bool, not int; retried separately since
            // `eval_int` only ever produces `IntVal`.
            eval_int_comparison(expr)
        }),
        _ => None,
    }
}

fn eval_int(expr: &Expr) -> Option<ember_runtime::types::int::IntVal> {
    match expr {
        Expr::Int(v, _) => Some(v.clone()),
        Expr::Unary(UnOp::Neg, operand, _) => Some(eval_int(operand)?.neg()),
        Expr::Unary(UnOp::Sqig, operand, _) => Some(eval_int(operand)?.bitnot()),
        Expr::Binary(op, lhs, rhs, _) => {
            let a = eval_int(lhs)?;
            let b = eval_int(rhs)?;
            match op {
                BinOp::Add => Some(a.add(&b)),
                BinOp::Sub => Some(a.sub(&b)),
                BinOp::Mul => Some(a.mul(&b)),
                BinOp::Div => a.div(&b).ok(),
                BinOp::Mod => a.modulo(&b).ok(),
                BinOp::Pow => Some(a.pow(&b)),
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne => None,
            }
        }
        _ => None,
    }
}

fn eval_int_comparison(expr: &Expr) -> Option<Value> {
    let Expr::Binary(op, lhs, rhs, _) = expr else {
        return None;
    };
    let a = eval_int(lhs)?;
    let b = eval_int(rhs)?;
    let ord = a.cmp(&b);
    Some(match op {
        BinOp::Lt => Value::Bool(ord == std::cmp::Ordering::Less),
        BinOp::Le => Value::Bool(ord != std::cmp::Ordering::Greater),
        BinOp::Gt => Value::Bool(ord == std::cmp::Ordering::Greater),
        BinOp::Ge => Value::Bool(ord != std::cmp::Ordering::Less),
        BinOp::Eq => Value::Bool(ord == std::cmp::Ordering::Equal),
        BinOp::Ne => Value::Bool(ord != std::cmp::Ordering::Equal),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(src: &str) -> Gc<Code> {
        let mut p = Parser::new(src).unwrap();
        let program = p.parse_program().unwrap();
        CodeGen::compile_program("<test>", &program).unwrap()
    }

    #[test]
    fn folds_integer_arithmetic_at_compile_time() {
        let code = compile("ret 1 + 2 * 3");
        // folded to a single CONST 7 then RET: CONST(1+4) + RET(1) + RET_NONE(1)
        assert_eq!(code.bytecode[0], Opcode::CONST as u8);
        assert_eq!(&code.consts, &[Value::int(7)]);
    }

    #[test]
    fn does_not_fold_float_literals() {
        let code = compile("ret 1.0 + 2.0");
        assert!(code
            .bytecode
            .iter()
            .any(|&b| b == Opcode::ADD as u8));
    }

    #[test]
    fn same_constant_is_deduplicated() {
        let code = compile("x = \"a\"; y = \"a\"");
        let str_consts: Vec<&Value> = code
            .consts
            .iter()
            .filter(|v| matches!(v, Value::Str(s) if s.as_str() == "a"))
            .collect();
        assert_eq!(str_consts.len(), 1);
    }

    #[test]
    fn codegen_is_deterministic() {
        let a = compile("ret 1 + 2 * 3");
        let b = compile("ret 1 + 2 * 3");
        assert_eq!(a.bytecode, b.bytecode);
        assert_eq!(a.consts, b.consts);
    }

    #[test]
    fn if_else_emits_balanced_jumps() {
        let code = compile("x = 5; if x > 0, ret \"pos\" else ret \"neg\"");
        assert!(code.bytecode.iter().any(|&b| b == Opcode::JMPF as u8));
        assert!(code.bytecode.iter().any(|&b| b == Opcode::JMP as u8));
    }

    #[test]
    fn try_catch_emits_handler_opcodes() {
        let code = compile("try { ret 1 / 0 } catch e { ret \"caught\" }");
        assert!(code.bytecode.iter().any(|&b| b == Opcode::EXC_ADD as u8));
        assert!(code.bytecode.iter().any(|&b| b == Opcode::EXC_REM as u8));
    }

    #[test]
    fn dict_literal_emits_dict_opcode() {
        let code = compile("d = {\"a\": 1}");
        assert!(code.bytecode.iter().any(|&b| b == Opcode::DICT as u8));
    }

    #[test]
    fn for_loop_emits_for_iter() {
        let code = compile("for k, v in d { s = s + v }");
        assert!(code.bytecode.iter().any(|&b| b == Opcode::FOR_ITER as u8));
    }

    #[test]
    fn type_literal_builds_constant_type_with_init_slot() {
        let code = compile(
            "type Pt { func init(self, x) { self.x = x } func get(self) { ret self.x } }",
        );
        let ty = code.consts.iter().find_map(|v| match v {
            Value::Type(t) => Some(t),
            _ => None,
        });
        assert!(ty.is_some());
        assert!(ty.unwrap().slots.borrow().init.is_some());
    }
}
