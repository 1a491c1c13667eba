use std::fmt::{self, Display};
use std::sync::Arc;

use crate::abc::multiname::{Multiname, Namespace};
use crate::consts::*;
use crate::error::{Error, Result};

/// Type substituted for references to runtime-only names.
pub const OPAQUE_TYPE: &str = "Class";

/// Constant pool tables, each indexed from 1 with a sentinel at 0.
#[derive(Debug)]
pub struct ConstantPool {
    pub(crate) ints: Vec<i32>,
    pub(crate) uints: Vec<u32>,
    pub(crate) doubles: Vec<f64>,
    pub(crate) strings: Vec<Arc<str>>,
    pub(crate) namespaces: Vec<Namespace>,
    pub(crate) ns_sets: Vec<Arc<[Namespace]>>,
    pub(crate) names: Vec<Option<Multiname>>,
}

fn entry<'p, T>(table: &'p [T], index: u32, name: &'static str) -> Result<&'p T> {
    table
        .get(index as usize)
        .ok_or(Error::BadIndex { table: name, index })
}

impl ConstantPool {
    pub fn int(&self, index: u32) -> Result<i32> {
        entry(&self.ints, index, "int").copied()
    }

    pub fn uint(&self, index: u32) -> Result<u32> {
        entry(&self.uints, index, "uint").copied()
    }

    pub fn double(&self, index: u32) -> Result<f64> {
        entry(&self.doubles, index, "double").copied()
    }

    pub fn string(&self, index: u32) -> Result<&Arc<str>> {
        entry(&self.strings, index, "string")
    }

    pub fn namespace(&self, index: u32) -> Result<&Namespace> {
        entry(&self.namespaces, index, "namespace")
    }

    pub fn ns_set(&self, index: u32) -> Result<&Arc<[Namespace]>> {
        entry(&self.ns_sets, index, "namespace set")
    }

    /// `None` for runtime-qualified late names that carry nothing static.
    pub fn name(&self, index: u32) -> Result<Option<&Multiname>> {
        entry(&self.names, index, "multiname").map(Option::as_ref)
    }

    /// A name used in type position; runtime-only names become [`OPAQUE_TYPE`].
    pub fn type_name(&self, index: u32) -> Result<Multiname> {
        Ok(self
            .name(index)?
            .cloned()
            .unwrap_or_else(|| Multiname::bare(OPAQUE_TYPE)))
    }

    pub fn int_count(&self) -> usize {
        self.ints.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Resolves a `(kind, index)` value reference as used by defaults.
    ///
    /// Returns `None` when the kind selects no value table.
    pub fn constant(&self, kind: u8, index: u32) -> Result<Option<Const>> {
        let value = match kind {
            CONSTANT_UNDEFINED => Const::Undefined,
            CONSTANT_UTF8 => Const::String(Arc::clone(self.string(index)?)),
            CONSTANT_INT => Const::Int(self.int(index)?),
            CONSTANT_UINT => Const::UInt(self.uint(index)?),
            CONSTANT_DOUBLE => Const::Double(self.double(index)?),
            CONSTANT_FALSE => Const::False,
            CONSTANT_TRUE => Const::True,
            CONSTANT_NULL => Const::Null,
            CONSTANT_NAMESPACE
            | CONSTANT_PRIVATE_NS
            | CONSTANT_PACKAGE_NS
            | CONSTANT_PACKAGE_INTERNAL_NS
            | CONSTANT_PROTECTED_NS
            | CONSTANT_EXPLICIT_NS
            | CONSTANT_STATIC_PROTECTED_NS => Const::Namespace(self.namespace(index)?.clone()),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// A resolved literal: a slot initializer or a parameter default.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Undefined,
    Null,
    True,
    False,
    Int(i32),
    UInt(u32),
    Double(f64),
    String(Arc<str>),
    Namespace(Namespace),
}

impl Const {
    /// Default implied by a parameter's type when no value is given.
    pub(crate) fn implied_by(type_name: &Multiname) -> Self {
        match type_name.to_string().as_str() {
            "Number" | "decimal" => Const::Double(0.0),
            "String" => Const::String(Arc::from("")),
            _ => Const::Null,
        }
    }
}

impl Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Undefined => f.write_str("undefined"),
            Const::Null => f.write_str("null"),
            Const::True => f.write_str("true"),
            Const::False => f.write_str("false"),
            Const::Int(v) => write!(f, "{v}"),
            Const::UInt(v) => write!(f, "{v}"),
            Const::Double(v) if v.is_nan() => f.write_str("NaN"),
            Const::Double(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Const::Double(v) => write!(f, "{v}"),
            Const::String(s) => f.write_str(s),
            Const::Namespace(ns) => f.write_str(ns.name()),
        }
    }
}
