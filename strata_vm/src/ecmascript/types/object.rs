// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use ahash::AHashMap;

use crate::ecmascript::{execution::ExceptionType, types::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Ordinary,
    /// Unmapped arguments object; arguments live in the elements.
    Arguments,
    Error(ExceptionType),
}

#[derive(Debug, Clone)]
pub struct ObjectHeapData {
    pub kind: ObjectKind,
    pub properties: AHashMap<Rc<str>, Value>,
    pub elements: Vec<Value>,
}

impl ObjectHeapData {
    pub fn arguments(arguments: &[Value]) -> Self {
        Self {
            kind: ObjectKind::Arguments,
            properties: AHashMap::default(),
            elements: arguments.to_vec(),
        }
    }

    pub fn error(kind: ExceptionType, message: &str) -> Self {
        let mut properties = AHashMap::default();
        properties.insert(Rc::from("name"), Value::String(Rc::from(kind.as_str())));
        properties.insert(Rc::from("message"), Value::String(Rc::from(message)));
        Self {
            kind: ObjectKind::Error(kind),
            properties,
            elements: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Value {
        if let Ok(index) = key.parse::<usize>() {
            if index.to_string() == key {
                if let Some(element) = self.elements.get(index) {
                    return element.clone();
                }
            }
        }
        if key == "length" && self.kind == ObjectKind::Arguments {
            return Value::from_f64(self.elements.len() as f64);
        }
        self.properties.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Value> {
        self.properties.values().chain(self.elements.iter())
    }
}
