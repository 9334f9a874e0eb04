// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use strata_vm::{Agent, ExecutionError, Value};

#[test]
fn garbage_collection_keeps_rooted_closures_alive() {
    let mut agent = Agent::default();
    let closure = agent
        .run_script(
            "function make() { var v = 'kept'; return function () { return v; }; }
            make()",
        )
        .unwrap();
    agent.run_script("make(); make();").unwrap();

    let before = agent.heap.environments.len();
    agent.gc(std::slice::from_ref(&closure));
    assert!(agent.heap.environments.len() < before);

    assert_eq!(
        agent.call(&closure, Value::Undefined, &[]).unwrap(),
        Value::from_str("kept")
    );
}

#[test]
fn collected_functions_are_detected_as_stale() {
    let mut agent = Agent::default();
    let garbage = agent
        .run_script("function make() { return function () {}; } make()")
        .unwrap();
    agent.gc(&[]);
    assert!(matches!(
        agent.call(&garbage, Value::Undefined, &[]),
        Err(ExecutionError::StaleReference)
    ));
    // Globals are roots.
    let make = agent.global_value("make").unwrap();
    assert!(agent.call(&make, Value::Undefined, &[]).is_ok());
}

#[test]
fn disabled_gc_collects_nothing() {
    let mut agent = Agent::new(strata_vm::Options {
        disable_gc: true,
        ..Default::default()
    });
    agent
        .run_script("function make() { var v = 1; return function () { return v; }; } make(); make();")
        .unwrap();
    let before = agent.heap.environments.len();
    agent.gc(&[]);
    assert_eq!(agent.heap.environments.len(), before);
}
