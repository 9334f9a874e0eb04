// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::{
    ecmascript::builtins::Behaviour, engine::bytecode::FunctionTemplate, heap::EnvironmentIndex,
};

#[derive(Debug, Clone)]
pub enum FunctionHeapData {
    /// A closure: compiled code together with the environment that was
    /// current when the function was instantiated.
    ECMAScript {
        template: Rc<FunctionTemplate>,
        environment: EnvironmentIndex,
    },
    Builtin {
        name: Rc<str>,
        length: u32,
        behaviour: Behaviour,
    },
}

impl FunctionHeapData {
    pub fn name(&self) -> &str {
        match self {
            Self::ECMAScript { template, .. } => &template.name,
            Self::Builtin { name, .. } => name,
        }
    }

    pub fn length(&self) -> u32 {
        match self {
            Self::ECMAScript { template, .. } => template.length,
            Self::Builtin { length, .. } => *length,
        }
    }

    pub fn environment(&self) -> Option<EnvironmentIndex> {
        match self {
            Self::ECMAScript { environment, .. } => Some(*environment),
            Self::Builtin { .. } => None,
        }
    }
}
