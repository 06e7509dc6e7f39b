//! Callables: native functions, script functions, and partial application
//! (spec §3 "Callables", §4.J).

use crate::types::code::Code;
use crate::value::Value;
use ember_core::error::Error;
use ember_core::gc::Gc;
use std::rc::Rc;

/// Signature of a native function: argument vector in, value-or-error out
/// (spec §3: "a native function pointer of signature `(argc, argv) ->
/// object-or-error`"). `Rc<dyn Fn>` rather than a bare function pointer so
/// native functions can close over host state (an embedder's open file
/// handles, a counter, ...), which a raw `fn` pointer could not.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, Error>;

#[derive(Clone)]
pub struct CFunc {
    pub name: String,
    pub signature: String,
    pub func: Rc<NativeFn>,
}

impl std::fmt::Debug for CFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CFunc").field("name", &self.name).finish()
    }
}

impl CFunc {
    pub fn new(
        name: impl Into<String>,
        signature: impl Into<String>,
        func: impl Fn(&[Value]) -> Result<Value, Error> + 'static,
    ) -> Self {
        CFunc {
            name: name.into(),
            signature: signature.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, Error> {
        (self.func)(args)
    }
}

/// A script-defined function: a code object plus the ordered parameter
/// names it binds its actual arguments to (spec §3 "kfunc").
#[derive(Debug, Clone)]
pub struct KFunc {
    pub name: String,
    pub code: Gc<Code>,
    pub params: Vec<String>,
}

/// One binding captured by a partial application, at the positional index
/// it will be spliced back into (spec §3 "pfunc").
#[derive(Debug, Clone)]
pub struct Binding {
    pub position: usize,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct PFunc {
    pub inner: Value,
    pub bindings: Vec<Binding>,
}

impl PFunc {
    /// Bind `self` at argument position 0, the mechanism §4.D's bound
    /// methods are built from.
    pub fn bind_self(inner: Value, self_value: Value) -> Self {
        PFunc {
            inner,
            bindings: vec![Binding {
                position: 0,
                value: self_value,
            }],
        }
    }

    /// Merge the call site's arguments with this partial's bound positions
    /// (spec §4.I "Call semantics": "constructs the merged argument vector
    /// (bound positions filled, remaining positions drawn from the call
    /// site in order)").
    pub fn splice_args(&self, call_args: &[Value]) -> Vec<Value> {
        let total = self.bindings.len() + call_args.len();
        let mut slots: Vec<Option<Value>> = vec![None; total];
        for b in &self.bindings {
            if b.position < total {
                slots[b.position] = Some(b.value.clone());
            }
        }
        let mut call_iter = call_args.iter().cloned();
        for slot in slots.iter_mut() {
            if slot.is_none() {
                *slot = call_iter.next();
            }
        }
        // Any leftover call-site arguments (shouldn't happen given `total`)
        // are appended defensively rather than dropped.
        let mut out: Vec<Value> = slots.into_iter().flatten().collect();
        out.extend(call_iter);
        out
    }
}

#[derive(Debug, Clone)]
pub enum FuncObj {
    CFunc(CFunc),
    KFunc(KFunc),
    PFunc(PFunc),
}

impl FuncObj {
    pub fn name(&self) -> &str {
        match self {
            FuncObj::CFunc(f) => &f.name,
            FuncObj::KFunc(f) => &f.name,
            FuncObj::PFunc(f) => match &f.inner {
                Value::Func(inner) => inner.name(),
                _ => "<partial>",
            },
        }
    }

    pub fn repr(&self) -> String {
        match self {
            FuncObj::CFunc(f) => format!("<cfunc {}>", f.signature),
            FuncObj::KFunc(f) => format!("<function {}>", f.name),
            FuncObj::PFunc(_) => format!("<bound method {}>", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_args_fills_bound_and_call_site_positions() {
        let pf = PFunc {
            inner: Value::None,
            bindings: vec![Binding {
                position: 0,
                value: Value::str("self"),
            }],
        };
        let merged = pf.splice_args(&[Value::int(42)]);
        assert_eq!(merged, vec![Value::str("self"), Value::int(42)]);
    }

    #[test]
    fn cfunc_calls_through() {
        let f = CFunc::new("identity", "identity(x)", |args| Ok(args[0].clone()));
        assert_eq!(f.call(&[Value::int(7)]).unwrap(), Value::int(7));
    }
}
