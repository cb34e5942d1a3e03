// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! End-to-end scenarios from spec.md §8, exercised against `Session`
//! directly (without the `rask-rule` sugar) to pin down the primitive
//! contract: `create_task`, `eval`, and the introspection surface.

use rask_errors::Error;
use rask_session::{Arg, CompositeArg, FutureState, RuleOutcome, Session};
use serde_json::json;
use std::collections::BTreeMap;
use std::rc::Rc;

fn constant(n: i64) -> rask_session::RuleFn {
    Rc::new(move |_args: &[serde_json::Value]| Ok(RuleOutcome::Value(json!(n))))
}

/// `with Session: eval(10) == 10`.
#[test]
fn pass_through_plain_value() {
    let guard = Session::enter();
    let session = guard.session();
    assert_eq!(session.eval(json!(10)).unwrap(), json!(10));
}

/// Encoding `{"x": C(1), "ys": [C(2)]}` and decoding it back (spec.md §8
/// "Composite round-trip"), realised here as two tasks embedded in a map.
#[test]
fn composite_round_trip_with_two_futures() {
    let guard = Session::enter();
    let session = guard.session();

    let c1 = session.create_task("const1", constant(1), vec![], None, None).unwrap();
    let c2 = session.create_task("const2", constant(2), vec![], None, None).unwrap();

    let mut map = BTreeMap::new();
    map.insert("x".to_string(), CompositeArg::from(c1));
    map.insert("ys".to_string(), CompositeArg::List(vec![CompositeArg::from(c2)]));
    let root = CompositeArg::Map(map);

    let result = session.eval(root).unwrap();
    assert_eq!(result, json!({"x": 1, "ys": [2]}));
}

/// Invariant 2: two calls to the same rule with arguments of equal hashid
/// return the identical task object within one session.
#[test]
fn create_task_deduplicates_by_hashid() {
    let guard = Session::enter();
    let session = guard.session();

    let t1 = session.create_task("double", constant(1), vec![Arg::from(json!(5))], None, None).unwrap();
    let t2 = session.create_task("double", constant(1), vec![Arg::from(json!(5))], None, None).unwrap();
    assert_eq!(t1.id(), t2.id());
    assert_eq!(t1.hashid(), t2.hashid());

    let t3 = session.create_task("double", constant(1), vec![Arg::from(json!(6))], None, None).unwrap();
    assert_ne!(t1.hashid(), t3.hashid());
}

/// Creating a task whose argument is a handle from a different session fails
/// with `ArgNotInSession` (spec.md §7).
#[test]
fn argument_from_foreign_session_is_rejected() {
    let foreign = {
        let guard = Session::enter();
        let session = guard.session();
        session.create_task("foreign", constant(1), vec![], None, None).unwrap()
    };

    let guard = Session::enter();
    let session = guard.session();
    let err = session.create_task("consumer", constant(1), vec![Arg::from(foreign)], None, None);
    assert!(matches!(err, Err(Error::ArgNotInSession(_))));
}

/// `Task.state`/`has_run`/`future_result` introspection (spec.md §6).
#[test]
fn task_introspection_through_its_lifecycle() {
    let guard = Session::enter();
    let session = guard.session();

    let t = session.create_task("id", constant(42), vec![], None, None).unwrap();
    assert_eq!(session.state(&t), FutureState::Ready);
    assert!(!session.has_run(&t));
    assert!(matches!(session.future_result(&t), Err(Error::TaskHasNotRun(_))));

    let result = session.eval(t.clone()).unwrap();
    assert_eq!(result, json!(42));
    assert_eq!(session.state(&t), FutureState::Done);
    assert!(session.has_run(&t));
    assert!(matches!(session.future_result(&t), Err(Error::TaskIsDone(_))));
}

/// `label` is carried for introspection only, never part of the hashid.
#[test]
fn label_is_cosmetic() {
    let guard = Session::enter();
    let session = guard.session();

    let t1 = session.create_task("labelled", constant(7), vec![], None, Some("demo".to_string())).unwrap();
    assert_eq!(session.label(&t1), Some("demo".to_string()));

    let t2 = session.create_task("labelled", constant(7), vec![], None, None).unwrap();
    assert_eq!(t1.hashid(), t2.hashid(), "label must not affect the hashid");
}

/// Indexor composition (spec.md §3): `task[0][0]` shares the same root task
/// as `task[0]`, just with an extended key path.
#[test]
fn indexor_composes_sharing_the_root_task() {
    let guard = Session::enter();
    let session = guard.session();

    let body: rask_session::RuleFn = Rc::new(|_args: &[serde_json::Value]| Ok(RuleOutcome::Value(json!([[42]]))));
    let t = session.create_task("nested", body, vec![], None, None).unwrap();
    let i0 = session.index_task(&t, "0");
    let i00 = session.index_indexor(&i0, "0");

    let result = session.eval(i00).unwrap();
    assert_eq!(result, json!(42));
}
