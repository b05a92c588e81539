//! `ConstantValue`: tagged union of every compile-time-representable value
//! (§3 constant_value), grounded directly on the original source's
//! `ast::constant_value` (`bz::variant` over sint/uint/float32/float64/char/
//! string/bool/null/void/array/tuple/aggregate/function/type/enum).

use crate::types::decl::DeclId;
use crate::types::typespec::Typespec;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A function- or operator-overload set reference, qualified or not,
/// carried inside a constant value when an identifier resolves to a set of
/// candidates rather than a single declaration (§3: `unqualified_function_
/// set_id` / `qualified_function_set_id`).
#[derive(Clone, Debug)]
pub struct FunctionSetId {
    pub name: crate::symbol::Symbol,
    pub candidates: Rc<[DeclId]>,
    pub qualified: bool,
}

impl PartialEq for FunctionSetId {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.qualified == other.qualified && Rc::ptr_eq(&self.candidates, &other.candidates)
    }
}
impl Eq for FunctionSetId {}
impl Hash for FunctionSetId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.qualified.hash(state);
    }
}

/// A 32-bit float that supports structural equality and hashing, needed
/// because constant values must be hash-embeddable (§3) even though IEEE
/// floats don't have a total order. Bit-pattern equality is used, matching
/// how the folding engine treats floats as opaque payloads once produced.
#[derive(Clone, Copy, Debug)]
pub struct Float32(pub f32);
#[derive(Clone, Copy, Debug)]
pub struct Float64(pub f64);

impl PartialEq for Float32 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for Float32 {}
impl Hash for Float32 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}
impl PartialEq for Float64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for Float64 {}
impl Hash for Float64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Tagged union over every fold-able compile-time value (§3 constant_value).
/// `SintArray`/`UintArray`/`Float32Array`/`Float64Array` are flat
/// specializations of `Array` used when every element is the same built-in
/// numeric kind, for fast folding and compact representation (§4.C
/// "Array constructors").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Sint(i64),
    Uint(u64),
    Float32(Float32),
    Float64(Float64),
    Char(u32),
    String(Rc<str>),
    Bool(bool),
    Null,
    Void,
    Array(Rc<[ConstantValue]>),
    SintArray(Rc<[i64]>),
    UintArray(Rc<[u64]>),
    Float32Array(Rc<[Float32]>),
    Float64Array(Rc<[Float64]>),
    Tuple(Rc<[ConstantValue]>),
    Aggregate(Rc<[ConstantValue]>),
    Function(DeclId),
    UnqualifiedFunctionSetId(FunctionSetId),
    QualifiedFunctionSetId(FunctionSetId),
    Type(Box<Typespec>),
    Enum(DeclId, u64),
}

impl ConstantValue {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstantValue::Sint(_) => "sint",
            ConstantValue::Uint(_) => "uint",
            ConstantValue::Float32(_) => "f32",
            ConstantValue::Float64(_) => "f64",
            ConstantValue::Char(_) => "char",
            ConstantValue::String(_) => "string",
            ConstantValue::Bool(_) => "bool",
            ConstantValue::Null => "null",
            ConstantValue::Void => "void",
            ConstantValue::Array(_) => "array",
            ConstantValue::SintArray(_) => "sint_array",
            ConstantValue::UintArray(_) => "uint_array",
            ConstantValue::Float32Array(_) => "float32_array",
            ConstantValue::Float64Array(_) => "float64_array",
            ConstantValue::Tuple(_) => "tuple",
            ConstantValue::Aggregate(_) => "aggregate",
            ConstantValue::Function(_) => "function",
            ConstantValue::UnqualifiedFunctionSetId(_) => "unqualified_function_set_id",
            ConstantValue::QualifiedFunctionSetId(_) => "qualified_function_set_id",
            ConstantValue::Type(_) => "type",
            ConstantValue::Enum(..) => "enum",
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ConstantValue::Sint(_) | ConstantValue::Uint(_) | ConstantValue::Float32(_) | ConstantValue::Float64(_))
    }

    /// Renders the value the way a diagnostic or symbol-name encoding would
    /// (`get_value_string` in the original source).
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            ConstantValue::Sint(v) => v.to_string(),
            ConstantValue::Uint(v) => v.to_string(),
            ConstantValue::Float32(v) => v.0.to_string(),
            ConstantValue::Float64(v) => v.0.to_string(),
            ConstantValue::Char(c) => char::from_u32(*c).map_or_else(|| format!("\\u{{{c:x}}}"), |c| c.to_string()),
            ConstantValue::String(s) => format!("{s:?}"),
            ConstantValue::Bool(b) => b.to_string(),
            ConstantValue::Null => "null".to_owned(),
            ConstantValue::Void => "void".to_owned(),
            ConstantValue::Array(xs) | ConstantValue::Tuple(xs) | ConstantValue::Aggregate(xs) => {
                format!("[{}]", xs.iter().map(ConstantValue::display_string).collect::<Vec<_>>().join(", "))
            }
            ConstantValue::SintArray(xs) => format!("{xs:?}"),
            ConstantValue::UintArray(xs) => format!("{xs:?}"),
            ConstantValue::Float32Array(xs) => format!("{:?}", xs.iter().map(|f| f.0).collect::<Vec<_>>()),
            ConstantValue::Float64Array(xs) => format!("{:?}", xs.iter().map(|f| f.0).collect::<Vec<_>>()),
            ConstantValue::Function(id) => format!("<function {id:?}>"),
            ConstantValue::UnqualifiedFunctionSetId(s) | ConstantValue::QualifiedFunctionSetId(s) => {
                format!("<overload set {}>", s.name)
            }
            ConstantValue::Type(t) => format!("{t:?}"),
            ConstantValue::Enum(id, v) => format!("<enum {id:?}:{v}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        assert_eq!(ConstantValue::Sint(7), ConstantValue::Sint(7));
        assert_ne!(ConstantValue::Sint(7), ConstantValue::Uint(7));
    }

    #[test]
    fn float_equality_is_bitwise() {
        let nan_a = ConstantValue::Float64(Float64(f64::NAN));
        let nan_b = ConstantValue::Float64(Float64(f64::NAN));
        assert_eq!(nan_a, nan_b, "consts must compare structurally even for NaN");
    }

    #[test]
    fn array_vs_tuple_vs_aggregate_are_distinct_kinds() {
        let empty: Rc<[ConstantValue]> = Rc::from(vec![]);
        assert_ne!(
            ConstantValue::Array(empty.clone()).kind_name(),
            ConstantValue::Tuple(empty.clone()).kind_name()
        );
        assert_ne!(ConstantValue::Tuple(empty.clone()).kind_name(), ConstantValue::Aggregate(empty).kind_name());
    }
}
