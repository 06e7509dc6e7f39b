//! The builtin type registry and the minimum native function surface a
//! script needs to be runnable end to end (SPEC_FULL supplement 3,
//! grounded in `examples/original_source/src/funcs.c` and
//! `src/library/numbers.c`): `len`, `print`, `str`, `repr`, `type`, `hash`,
//! `bool`, `iter`, `next`, `exit`.
//!
//! Builtin *type objects* (singletons used by `type(x)` and `issub`) live in
//! a thread-local registry, matching spec §5's "the interned type registry
//! ... are process-wide; only the VM thread may mutate them" — modeled here
//! as one registry per OS thread, since this design runs exactly one VM per
//! thread.

use crate::types::type_obj::TypeObj;
use crate::value::Value;
use ember_core::error::Error;
use ember_core::gc::Gc;
use std::cell::RefCell;

macro_rules! builtin_types {
    ($($field:ident : $name:expr),+ $(,)?) => {
        pub struct Registry {
            $(pub $field: Gc<TypeObj>),+
        }

        impl Registry {
            fn new() -> Self {
                Registry {
                    $($field: TypeObj::builtin($name)),+
                }
            }
        }
    };
}

builtin_types! {
    none_type: "none",
    bool_type: "bool",
    int_type: "int",
    float_type: "float",
    complex_type: "complex",
    str_type: "str",
    tuple_type: "tuple",
    list_type: "list",
    dict_type: "dict",
    type_type: "type",
    func_type: "function",
    code_type: "code",
    module_type: "module",
    error_type: "error",
    iter_type: "iter",
}

thread_local! {
    static REGISTRY: RefCell<Option<Registry>> = const { RefCell::new(None) };
}

fn with_registry<R>(f: impl FnOnce(&Registry) -> R) -> R {
    REGISTRY.with(|cell| {
        if cell.borrow().is_none() {
            *cell.borrow_mut() = Some(Registry::new());
        }
        f(cell.borrow().as_ref().unwrap())
    })
}

/// `type(x)` (spec §4.D, §3 "Types"): every builtin variant maps to its
/// singleton descriptor; `Instance` carries its own user-defined type.
pub fn type_of(v: &Value) -> Gc<TypeObj> {
    if let Value::Instance(i) = v {
        return Gc::newref(&i.ty);
    }
    if let Value::Type(_) = v {
        return with_registry(|r| Gc::newref(&r.type_type));
    }
    with_registry(|r| {
        Gc::newref(match v {
            Value::None => &r.none_type,
            Value::Bool(_) => &r.bool_type,
            Value::Int(_) => &r.int_type,
            Value::Float(_) => &r.float_type,
            Value::Complex(_) => &r.complex_type,
            Value::Str(_) => &r.str_type,
            Value::Tuple(_) => &r.tuple_type,
            Value::List(_) => &r.list_type,
            Value::Dict(_) => &r.dict_type,
            Value::Func(_) => &r.func_type,
            Value::Code(_) => &r.code_type,
            Value::Module(_) => &r.module_type,
            Value::Error(_) => &r.error_type,
            Value::Iter(_) => &r.iter_type,
            Value::Type(_) | Value::Instance(_) => unreachable!("handled above"),
        })
    })
}

fn require_argc(name: &str, args: &[Value], n: usize) -> Result<(), Error> {
    if args.len() != n {
        return Err(Error::arg(format!(
            "{name}() takes exactly {n} argument(s) ({} given)",
            args.len()
        )));
    }
    Ok(())
}

pub fn len(args: &[Value]) -> Result<Value, Error> {
    require_argc("len", args, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.len(),
        Value::Tuple(t) => t.len(),
        Value::List(l) => l.borrow().len(),
        Value::Dict(d) => d.borrow().len(),
        other => {
            return Err(Error::type_err(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::int(n as i64))
}

pub fn print(args: &[Value]) -> Result<Value, Error> {
    let parts: Vec<String> = args.iter().map(Value::str_of).collect();
    println!("{}", parts.join(" "));
    Ok(Value::None)
}

pub fn str_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("str", args, 1)?;
    Ok(Value::str(args[0].str_of()))
}

pub fn repr_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("repr", args, 1)?;
    Ok(Value::str(args[0].repr_of()))
}

pub fn type_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("type", args, 1)?;
    Ok(Value::Type(type_of(&args[0])))
}

pub fn hash_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("hash", args, 1)?;
    Ok(Value::int(args[0].try_hash()? as i64))
}

pub fn bool_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("bool", args, 1)?;
    Ok(Value::Bool(args[0].truthy()))
}

/// `iter(x)`: build an iterator over a sequence or dict (SPEC_FULL
/// supplement 1).
pub fn iter_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("iter", args, 1)?;
    use crate::types::iter::IterState;
    let state = match &args[0] {
        Value::Tuple(t) => IterState::over_list(t.iter().cloned().collect()),
        Value::List(l) => IterState::over_list(l.borrow().iter().cloned().collect()),
        Value::Dict(d) => {
            IterState::over_dict(d.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        }
        Value::Str(s) => IterState::over_list(s.as_str().chars().map(|c| Value::str(c.to_string())).collect()),
        other => {
            return Err(Error::type_err(format!(
                "object of type '{}' is not iterable",
                other.type_name()
            )))
        }
    };
    Ok(Value::Iter(Gc::new(std::cell::RefCell::new(state))))
}

/// `next(it)`: advance an iterator, raising `StopIter` when exhausted.
pub fn next_builtin(args: &[Value]) -> Result<Value, Error> {
    require_argc("next", args, 1)?;
    match &args[0] {
        Value::Iter(it) => it.borrow_mut().next(),
        other => Err(Error::type_err(format!(
            "object of type '{}' is not an iterator",
            other.type_name()
        ))),
    }
}

/// `exit(code)`: terminate the host process immediately (spec §6: "`exit(code)`
/// inside script terminates with that code"). There is no escaping this via
/// `try`/`catch` — matching a process `exit()` call in the source, not a
/// catchable error.
pub fn exit_builtin(args: &[Value]) -> Result<Value, Error> {
    let code = match args.first() {
        Some(Value::Int(i)) => i.to_i64().unwrap_or(0) as i32,
        Some(_) | None => 0,
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_of_builtins_is_stable_by_identity() {
        let a = type_of(&Value::int(1));
        let b = type_of(&Value::int(2));
        assert!(Gc::ptr_eq(&a, &b));
    }

    #[test]
    fn len_rejects_non_sized_types() {
        assert!(len(&[Value::int(1)]).is_err());
    }

    #[test]
    fn len_of_tuple() {
        let t = Value::Tuple(Gc::new(crate::types::tuple::KTuple::from_vec(vec![
            Value::int(1),
            Value::int(2),
        ])));
        assert_eq!(len(&[t]).unwrap(), Value::int(2));
    }
}
