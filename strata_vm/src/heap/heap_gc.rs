// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{EnvironmentIndex, FunctionIndex, Heap, ObjectIndex};
use crate::ecmascript::{
    execution::EnvironmentRecord,
    types::{FunctionHeapData, Value},
};

#[derive(Debug, Default)]
pub(crate) struct WorkQueues {
    pub environments: Vec<EnvironmentIndex>,
    pub functions: Vec<FunctionIndex>,
    pub objects: Vec<ObjectIndex>,
}

impl WorkQueues {
    pub fn push_value(&mut self, value: &Value) {
        match value {
            Value::Object(object) => self.objects.push(*object),
            Value::Function(function) => self.functions.push(*function),
            _ => {}
        }
    }

    fn is_empty(&self) -> bool {
        self.environments.is_empty() && self.functions.is_empty() && self.objects.is_empty()
    }
}

struct HeapBits {
    environments: Box<[bool]>,
    functions: Box<[bool]>,
    objects: Box<[bool]>,
}

impl HeapBits {
    fn new(heap: &Heap) -> Self {
        Self {
            environments: vec![false; heap.environments.slot_count()].into_boxed_slice(),
            functions: vec![false; heap.functions.slot_count()].into_boxed_slice(),
            objects: vec![false; heap.objects.slot_count()].into_boxed_slice(),
        }
    }
}

/// Returns true if the bit was newly set.
fn mark(bits: &mut [bool], index: usize) -> bool {
    !std::mem::replace(&mut bits[index], true)
}

/// Marks everything reachable from `queues` and frees the rest. Returns the
/// number of freed heap entries.
///
/// Environments are traced through their parent link and their stored
/// values, closures through their captured environment, and objects through
/// their properties and elements.
pub(crate) fn heap_gc(heap: &mut Heap, mut queues: WorkQueues) -> usize {
    let mut bits = HeapBits::new(heap);

    while !queues.is_empty() {
        while let Some(index) = queues.environments.pop() {
            let Some(record) = heap.environments.get(index) else {
                continue;
            };
            if !mark(&mut bits.environments, index.into_index()) {
                continue;
            }
            if let Some(outer_env) = record.outer_env() {
                queues.environments.push(outer_env);
            }
            match record {
                EnvironmentRecord::Materialized(record) => {
                    record.values().iter().for_each(|value| queues.push_value(value));
                }
                EnvironmentRecord::Property(record) => {
                    record.values().for_each(|value| queues.push_value(value));
                }
            }
        }
        while let Some(index) = queues.functions.pop() {
            let Some(data) = heap.functions.get(index) else {
                continue;
            };
            if !mark(&mut bits.functions, index.into_index()) {
                continue;
            }
            if let FunctionHeapData::ECMAScript { environment, .. } = data {
                queues.environments.push(*environment);
            }
        }
        while let Some(index) = queues.objects.pop() {
            let Some(data) = heap.objects.get(index) else {
                continue;
            };
            if !mark(&mut bits.objects, index.into_index()) {
                continue;
            }
            data.values().for_each(|value| queues.push_value(value));
        }
    }

    let freed_environments = heap.environments.sweep(&bits.environments);
    let freed_functions = heap.functions.sweep(&bits.functions);
    let freed_objects = heap.objects.sweep(&bits.objects);
    tracing::trace!(
        freed_environments,
        freed_functions,
        freed_objects,
        "heap swept"
    );
    freed_environments + freed_functions + freed_objects
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::{
        ecmascript::types::ObjectHeapData,
        engine::bytecode::{ExecutableContext, FunctionTemplate},
    };

    #[test]
    fn unreachable_environments_are_freed_and_their_handles_go_stale() {
        let mut heap = Heap::new();
        let global = heap.environments.new_runtime_global_environment();
        let names: Box<[Rc<str>]> = Box::new([Rc::from("x")]);
        let kept = heap.environments.reconstruct(Some(global), &names).unwrap();
        let dropped = heap.environments.reconstruct(Some(global), &names).unwrap();

        let mut roots = WorkQueues::default();
        roots.environments.push(kept);
        assert_eq!(heap_gc(&mut heap, roots), 1);

        assert!(heap.environments.get(kept).is_some());
        assert!(heap.environments.get(global).is_some());
        assert!(heap.environments.get(dropped).is_none());

        let reused = heap.environments.reconstruct(Some(global), &names).unwrap();
        assert_eq!(reused.into_index(), dropped.into_index());
        assert_ne!(reused, dropped);
        assert!(heap.environments.get(dropped).is_none());
    }

    #[test]
    fn closures_keep_their_environment_alive() {
        let mut heap = Heap::new();
        let global = heap.environments.new_runtime_global_environment();
        let names: Box<[Rc<str>]> = Box::new([Rc::from("captured")]);
        let env = heap.environments.reconstruct(Some(global), &names).unwrap();
        let object = heap.create_object(ObjectHeapData::arguments(&[]));
        heap.environments
            .get_mut(env)
            .unwrap()
            .write("captured", Value::Object(object))
            .unwrap();
        let template = Rc::new(FunctionTemplate {
            name: Rc::from("closure"),
            length: 0,
            strict: false,
            executable: Rc::new(ExecutableContext::new(false).finish()),
        });
        let closure = heap.create_function(FunctionHeapData::ECMAScript {
            template: template.clone(),
            environment: env,
        });
        let orphan = heap.create_function(FunctionHeapData::ECMAScript {
            template,
            environment: global,
        });

        let mut roots = WorkQueues::default();
        roots.push_value(&Value::Function(closure));
        assert_eq!(heap_gc(&mut heap, roots), 1);
        assert!(heap.functions.get(orphan).is_none());
        assert!(heap.environments.get(env).is_some());
        assert!(heap.environments.get(global).is_some());
        assert!(heap.objects.get(object).is_some());
    }
}
