//! End-to-end program scenarios and the VM-wide invariants a closed program
//! must hold (spec §8).

use ember_runtime::value::Value;
use ember_vm::{run, Config, Vm};

#[test]
fn arithmetic_and_precedence() {
    let result = run("<scenario-1>", "ret 1 + 2 * 3").unwrap();
    assert_eq!(result, Value::int(7));
}

#[test]
fn bigint_promotion() {
    let result = run("<scenario-2>", "ret 2 ** 100").unwrap();
    assert_eq!(result.str_of(), "1267650600228229401496703205376");
}

#[test]
fn control_flow_with_else() {
    let result = run(
        "<scenario-3>",
        "x = 5; if x > 0, ret \"pos\" else ret \"neg\"",
    )
    .unwrap();
    assert_eq!(result, Value::str("pos"));
}

#[test]
fn try_catch_with_target_leaves_error_stack_empty() {
    let code = ember_compiler::compile(
        "<scenario-4>",
        "try { ret 1 / 0 } catch e { ret \"caught\" }",
    )
    .unwrap();
    let mut vm = Vm::new(Config::default());
    let result = vm.run(code).unwrap();
    assert_eq!(result, Value::str("caught"));
    assert!(vm.error_stack.is_empty());
}

#[test]
fn dict_iteration_sums_values() {
    let result = run(
        "<scenario-5>",
        "d = {}; d[\"a\"] = 1; d[\"b\"] = 2; s = 0; for k, v in d { s = s + v }; ret s",
    )
    .unwrap();
    assert_eq!(result, Value::int(3));
}

#[test]
fn bound_method_on_user_type() {
    let result = run(
        "<scenario-6>",
        "type Pt { func init(self, x) { self.x = x } func get(self) { ret self.x } }; p = Pt(42); ret p.get()",
    )
    .unwrap();
    assert_eq!(result, Value::int(42));
}

#[test]
fn division_by_zero_is_uncaught_math_error() {
    let err = run("<e2e>", "ret 1 / 0").unwrap_err();
    assert_eq!(err.0.kind, ember_core::error::ErrorKind::MathError);
}

#[test]
fn addition_is_commutative_for_ints_and_floats() {
    let lhs = run("<commutative>", "ret 3 + 4").unwrap();
    let rhs = run("<commutative>", "ret 4 + 3").unwrap();
    assert_eq!(lhs, rhs);

    let lhs = run("<commutative>", "ret 1.5 + 2.25").unwrap();
    let rhs = run("<commutative>", "ret 2.25 + 1.5").unwrap();
    assert_eq!(lhs, rhs);
}

#[test]
fn recursive_function_calls_are_visible_via_globals() {
    let result = run(
        "<recursion>",
        "func fact(n) { if n < 2, ret 1 else ret n * fact(n - 1) }; ret fact(5)",
    )
    .unwrap();
    assert_eq!(result, Value::int(120));
}
