// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scope resolution and environment code generation for a lexically scoped
//! ECMAScript subset, together with the stack machine that runs the emitted
//! bytecode.

pub mod ecmascript;
pub mod engine;
pub mod heap;

pub use ecmascript::execution::{Agent, ExecutionError, JsError, JsResult, Options, RunError};
pub use ecmascript::types::Value;
