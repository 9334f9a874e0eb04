// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod function;
mod object;
mod static_type;
mod value;

pub use function::FunctionHeapData;
pub use object::{ObjectHeapData, ObjectKind};
pub use static_type::StaticType;
pub use value::Value;
