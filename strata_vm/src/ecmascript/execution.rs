// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod agent;
pub mod environments;

pub use agent::{Agent, ExceptionType, ExecutionError, JsError, JsResult, Options, RunError};
pub use environments::{
    Binding, BindingLocation, BindingTable, EnvironmentError, EnvironmentIndex, EnvironmentKind,
    EnvironmentRecord, Environments, FunctionDeclarationIndex, MaterializedEnvironmentRecord,
    PropertyEnvironmentRecord, ScopeLink,
};
