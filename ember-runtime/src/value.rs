//! The dynamic `Value`: every object the VM's stack, locals and containers
//! can hold (spec §3 "Primitive values" / "Containers" / "Callables" /
//! "Types" / "Code & AST").
//!
//! `none` and `bool` need no heap allocation at all: they become zero-cost
//! `Copy` variants of this enum, which gives them the pointer-equality
//! semantics the spec asks for (§3 invariant iv, "immortal... never freed")
//! for free — there is nothing to free, and equality is just `PartialEq` on
//! the enum. Every other variant wraps a [`Gc`] handle; dropping the last
//! handle is `decref`, and the payload's own `Drop` impl is the finalizer
//! (spec §4.A).

use crate::types::complex::Complex;
use crate::types::dict::KDict;
use crate::types::func::FuncObj;
use crate::types::instance::Instance;
use crate::types::int::IntVal;
use crate::types::iter::IterState;
use crate::types::kstr::KStr;
use crate::types::list::KList;
use crate::types::module::ModuleObj;
use crate::types::tuple::KTuple;
use crate::types::type_obj::TypeObj;
use ember_core::error::Error as KError;
use ember_core::gc::Gc;
use std::cell::RefCell;
use std::fmt;

pub type Code = crate::types::code::Code;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(IntVal),
    Float(f64),
    Complex(Complex),
    Str(Gc<KStr>),
    Tuple(Gc<KTuple>),
    List(Gc<RefCell<KList>>),
    Dict(Gc<RefCell<KDict>>),
    Type(Gc<TypeObj>),
    Instance(Gc<Instance>),
    Func(Gc<FuncObj>),
    Code(Gc<Code>),
    Module(Gc<ModuleObj>),
    Error(Gc<KError>),
    Iter(Gc<RefCell<IterState>>),
}

/// A type name string used for diagnostics and `type(x)` introspection
/// (spec §3 "Types": "a type object carries: its name string...").
impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Type(_) => "type",
            Value::Instance(i) => {
                // Leak-free static-ish name: instances carry their own type
                // name, but callers that only need a diagnostic label can
                // use this constant; full introspection goes through
                // `instance_type_name`.
                let _ = i;
                "instance"
            }
            Value::Func(_) => "function",
            Value::Code(_) => "code",
            Value::Module(_) => "module",
            Value::Error(_) => "error",
            Value::Iter(_) => "iter",
        }
    }

    /// For `Instance` values, the user-defined type's own name (spec §4.D).
    pub fn instance_type_name(&self) -> Option<&str> {
        match self {
            Value::Instance(i) => Some(i.ty.name.as_str()),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => !i.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Complex(c) => c.re != 0.0 || c.im != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Type(_) | Value::Instance(_) | Value::Func(_) => true,
            Value::Code(_) | Value::Module(_) | Value::Error(_) | Value::Iter(_) => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Func(_) | Value::Type(_))
    }

    pub fn none() -> Value {
        Value::None
    }
    pub fn bool(v: bool) -> Value {
        Value::Bool(v)
    }
    pub fn int(v: i64) -> Value {
        Value::Int(IntVal::from_i64(v))
    }
    pub fn str(v: impl Into<String>) -> Value {
        Value::Str(Gc::new(KStr::new(v)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a.cmp(b) == std::cmp::Ordering::Equal,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => a.to_f64() == *b,
            (Complex(a), Complex(b)) => a == b,
            (Str(a), Str(b)) => **a == **b,
            (Tuple(a), Tuple(b)) => **a == **b,
            (List(a), List(b)) => *a.borrow() == *b.borrow(),
            (Dict(a), Dict(b)) => *a.borrow() == *b.borrow(),
            (Type(a), Type(b)) => Gc::ptr_eq(a, b),
            (Instance(a), Instance(b)) => Gc::ptr_eq(a, b),
            (Func(a), Func(b)) => Gc::ptr_eq(a, b),
            (Code(a), Code(b)) => Gc::ptr_eq(a, b),
            (Module(a), Module(b)) => Gc::ptr_eq(a, b),
            (Iter(a), Iter(b)) => Gc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Hash for dict keys; mutable containers are unhashable (spec §3 "hash
    /// table from any hashable object").
    pub fn try_hash(&self) -> Result<u64, KError> {
        use crate::hashing::*;
        match self {
            Value::None => Ok(1),
            Value::Bool(b) => Ok(hash_bool(*b)),
            Value::Int(IntVal::Small(v)) => Ok(hash_i64(*v)),
            Value::Int(IntVal::Big(v)) => Ok(hash_bigint(v)),
            Value::Float(f) => Ok(hash_f64(*f)),
            Value::Str(s) => Ok(s.hash()),
            Value::Tuple(t) => {
                let mut h: u64 = 7;
                for item in t.iter() {
                    h = h.wrapping_mul(31).wrapping_add(item.try_hash()?);
                }
                Ok(if h == 0 { 1 } else { h })
            }
            _ => Err(KError::type_err(format!(
                "unhashable type: '{}'",
                self.type_name()
            ))),
        }
    }

    pub fn str_of(&self) -> String {
        match self {
            Value::None => "none".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => crate::types::float::repr(*f),
            Value::Complex(c) => c.to_string(),
            Value::Str(s) => s.as_str().to_string(),
            Value::Tuple(t) => t.repr(),
            Value::List(l) => l.borrow().repr(),
            Value::Dict(d) => d.borrow().repr(),
            Value::Type(t) => format!("<type '{}'>", t.name),
            Value::Instance(i) => format!("<{} instance>", i.ty.name),
            Value::Func(f) => f.repr(),
            Value::Code(_) => "<code>".to_string(),
            Value::Module(m) => format!("<module '{}'>", m.name),
            Value::Error(e) => format!("{}", e),
            Value::Iter(_) => "<iter>".to_string(),
        }
    }

    pub fn repr_of(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s.as_str()),
            _ => self.str_of(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str_of())
    }
}
