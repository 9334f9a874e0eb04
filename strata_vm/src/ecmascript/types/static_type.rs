// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Statically known type of a value slot, as seen by the code generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticType {
    Boolean,
    Integer,
    Float,
    Null,
    Undefined,
    String,
    Object,
    Function,
    /// Any ECMAScript value.
    Value,
    Void,
    BigInt,
    Symbol,
}

impl StaticType {
    /// Reference types are represented by a heap pointer or a shared string,
    /// and accept the empty reference as a placeholder.
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::String | Self::Object | Self::Function | Self::Value)
    }
}
