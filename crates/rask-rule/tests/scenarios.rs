// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end scenarios from spec.md §8, built on the `Rule` sugar rather
//! than raw `Session::create_task` (see `rask-session/tests/eval.rs` for the
//! primitive-level versions). Grounded on
//! `examples/original_source/tests/test_caf2.py`'s `test_fibonacci*`/
//! `test_calc` — same rules, same shapes, the recursive closures rewritten
//! as a `Rc<RefCell<Option<Rule>>>` tie-the-knot since Rust closures cannot
//! name themselves.

use rask_rule::Rule;
use rask_session::{AnyHandle, Arg, CompositeArg, RuleOutcome, Session};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn total_rule() -> Rule {
    Rule::new("scenarios::total", |args| {
        let xs = args[0].as_array().expect("total expects an array");
        let sum: i64 = xs.iter().map(|v| v.as_i64().expect("total expects integers")).sum();
        Ok(json!(sum).into())
    })
}

fn add_rule() -> Rule {
    let total = total_rule();
    Rule::new("scenarios::add", move |args| {
        let x = args[0].clone();
        let y = args[1].clone();
        Ok(RuleOutcome::Future(AnyHandle::from(total.call(vec![Arg::from(json!([x, y]))])?)))
    })
}

/// `fib(n) = n if n < 2 else total([fib(n-1), fib(n-2)])`.
fn fibonacci_by_total() -> Rule {
    let slot: Rc<RefCell<Option<Rule>>> = Rc::new(RefCell::new(None));
    let total = total_rule();
    let slot_for_body = slot.clone();
    let rule = Rule::new("scenarios::fib_total", move |args| {
        let n = args[0].as_i64().expect("fib expects an integer");
        if n < 2 {
            return Ok(json!(n).into());
        }
        let fib = slot_for_body.borrow().clone().expect("fib rule wired before first call");
        let a = fib.call(vec![Arg::from(n - 1)])?;
        let b = fib.call(vec![Arg::from(n - 2)])?;
        let composite = CompositeArg::List(vec![CompositeArg::from(a), CompositeArg::from(b)]);
        Ok(RuleOutcome::Future(AnyHandle::from(total.call(vec![Arg::from(composite)])?)))
    });
    *slot.borrow_mut() = Some(rule.clone());
    rule
}

/// `fib(n) = n if n < 2 else add(fib(n-1), fib(n-2))`.
fn fibonacci_by_add() -> Rule {
    let slot: Rc<RefCell<Option<Rule>>> = Rc::new(RefCell::new(None));
    let add = add_rule();
    let slot_for_body = slot.clone();
    let rule = Rule::new("scenarios::fib_add", move |args| {
        let n = args[0].as_i64().expect("fib expects an integer");
        if n < 2 {
            return Ok(json!(n).into());
        }
        let fib = slot_for_body.borrow().clone().expect("fib rule wired before first call");
        let a = fib.call(vec![Arg::from(n - 1)])?;
        let b = fib.call(vec![Arg::from(n - 2)])?;
        Ok(RuleOutcome::Future(AnyHandle::from(add.call(vec![Arg::from(a), Arg::from(b)])?)))
    });
    *slot.borrow_mut() = Some(rule.clone());
    rule
}

/// `fib(n) = [[n]] if n < 2 else [[add(fib(n-1)[0][0], fib(n-2)[0][0])]]`:
/// exercises `Indexor` composition inside a rule body.
fn fibonacci_by_indexor() -> Rule {
    let slot: Rc<RefCell<Option<Rule>>> = Rc::new(RefCell::new(None));
    let add = add_rule();
    let slot_for_body = slot.clone();
    let rule = Rule::new("scenarios::fib_indexor", move |args| {
        let n = args[0].as_i64().expect("fib expects an integer");
        if n < 2 {
            return Ok(json!([[n]]).into());
        }
        let fib = slot_for_body.borrow().clone().expect("fib rule wired before first call");
        let a = fib.call(vec![Arg::from(n - 1)])?;
        let b = fib.call(vec![Arg::from(n - 2)])?;

        let session = Session::active()?;
        let a0 = session.index_task(&a, "0");
        let a00 = session.index_indexor(&a0, "0");
        let b0 = session.index_task(&b, "0");
        let b00 = session.index_indexor(&b0, "0");

        let sum = add.call(vec![Arg::from(a00), Arg::from(b00)])?;
        let composite = CompositeArg::List(vec![CompositeArg::List(vec![CompositeArg::from(sum)])]);
        Ok(composite.into())
    });
    *slot.borrow_mut() = Some(rule.clone());
    rule
}

fn double_rule() -> Rule {
    Rule::new("scenarios::double", |args| {
        let i = args[0].as_i64().expect("double expects an integer");
        Ok(json!(i * 2).into())
    })
}

fn setup_rule(double: Rule) -> Rule {
    Rule::new("scenarios::setup", move |_args| {
        let mut pairs = Vec::new();
        for i in 0..5i64 {
            let future = double.call(vec![Arg::from(i)])?;
            pairs.push(CompositeArg::List(vec![CompositeArg::from(i), CompositeArg::from(future)]));
        }
        Ok(CompositeArg::List(pairs).into())
    })
}

fn analysis_rule() -> Rule {
    Rule::new("scenarios::analysis", |args| {
        let pairs = args[0].as_array().expect("analysis expects an array of pairs");
        let (i, _) = pairs
            .iter()
            .map(|pair| {
                let pair = pair.as_array().expect("each pair is a 2-element array");
                (pair[0].as_i64().unwrap(), pair[1].as_i64().unwrap())
            })
            .find(|(_, result)| *result == 6)
            .expect("some pair resolves to 6");
        Ok(json!(i).into())
    })
}

#[test]
fn pass_through() {
    let guard = Session::enter();
    assert_eq!(guard.session().eval(json!(10)).unwrap(), json!(10));
}

#[test]
fn fibonacci_via_total() {
    let guard = Session::enter();
    let session = guard.session();
    let fib = fibonacci_by_total();
    let root = fib.call(vec![Arg::from(10i64)]).unwrap();
    assert_eq!(session.eval(root).unwrap(), json!(55));
}

#[test]
fn fibonacci_via_pairwise_add() {
    let guard = Session::enter();
    let session = guard.session();
    let fib = fibonacci_by_add();
    let f5 = fib.call(vec![Arg::from(5i64)]).unwrap();
    let f10 = fib.call(vec![Arg::from(10i64)]).unwrap();
    let root = CompositeArg::List(vec![CompositeArg::from(f5), CompositeArg::from(f10)]);
    assert_eq!(session.eval(root).unwrap(), json!([5, 55]));
}

#[test]
fn fibonacci_via_indexor_composition() {
    let guard = Session::enter();
    let session = guard.session();
    let fib = fibonacci_by_indexor();
    let f10 = fib.call(vec![Arg::from(10i64)]).unwrap();
    let i0 = session.index_task(&f10, "0");
    let i00 = session.index_indexor(&i0, "0");
    assert_eq!(session.eval(i00).unwrap(), json!(55));
}

#[test]
fn two_phase_setup_then_analysis() {
    let guard = Session::enter();
    let session = guard.session();
    let setup = setup_rule(double_rule());
    let analysis = analysis_rule();

    let setup_task = setup.call(Vec::<Arg>::new()).unwrap();
    let root = analysis.call(vec![Arg::from(setup_task)]).unwrap();
    assert_eq!(session.eval(root).unwrap(), json!(3));
}

#[test]
fn composite_round_trip_through_a_rule() {
    let guard = Session::enter();
    let session = guard.session();
    let r = Rule::new("scenarios::identity_pair", |args| Ok(RuleOutcome::Value(args[0].clone())));

    let a = r.call(vec![Arg::from(1i64)]).unwrap();
    let b = r.call(vec![Arg::from(2i64)]).unwrap();
    let mut map = std::collections::BTreeMap::new();
    map.insert("x".to_string(), CompositeArg::from(a));
    map.insert("ys".to_string(), CompositeArg::List(vec![CompositeArg::from(b)]));

    let result = session.eval(CompositeArg::Map(map)).unwrap();
    assert_eq!(result, json!({"x": 1, "ys": [2]}));
}
