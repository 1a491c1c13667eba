use std::borrow::Cow;
use std::sync::Arc;

pub use constant_pool::*;
pub use multiname::*;
pub use traits::*;

use crate::error::Result;
use crate::processor::{self, Processor};

mod constant_pool;
mod multiname;
mod parser;
mod traits;

/// A decoded ABC module: constant pool, method table and the trait graph.
///
/// Containers live in one arena addressed by [`TraitsId`]. Instance sides
/// take the first `n` slots and their static sides the next `n`, in class
/// order; script and activation containers follow.
#[derive(Debug)]
pub struct Abc {
    pub(crate) magic: u32,
    pub(crate) size: usize,
    pub(crate) pool: ConstantPool,
    pub(crate) methods: Vec<MethodInfo>,
    pub(crate) metadata: Vec<Arc<Metadata>>,
    pub(crate) traits: Vec<Traits>,
    pub(crate) class_count: usize,
    pub(crate) scripts: Vec<TraitsId>,
}

impl Abc {
    /// Decodes one module, reporting statistics and errors to `processor`.
    pub fn parse(data: &[u8], processor: &mut dyn Processor) -> Result<Abc> {
        Self::decode(data, &mut *processor).inspect_err(|err| processor.has_error(&err.to_string()))
    }

    /// Like [`Abc::parse`] but leaves reporting a failure to the caller.
    pub(crate) fn decode(data: &[u8], processor: &mut dyn Processor) -> Result<Abc> {
        parser::parse_abc(data, processor)
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// Length of the encoded module in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pool(&self) -> &ConstantPool {
        &self.pool
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// # Panics
    ///
    /// If `id` was not handed out by this module.
    pub fn method(&self, id: MethodId) -> &MethodInfo {
        &self.methods[id.0]
    }

    pub fn metadata(&self) -> &[Arc<Metadata>] {
        &self.metadata
    }

    /// # Panics
    ///
    /// If `id` was not handed out by this module.
    pub fn traits(&self, id: TraitsId) -> &Traits {
        &self.traits[id.0]
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Instance side of the class at `index` in class order.
    pub fn instance(&self, index: usize) -> Option<TraitsId> {
        (index < self.class_count).then_some(TraitsId(index))
    }

    /// Static side of the class at `index` in class order.
    pub fn class(&self, index: usize) -> Option<TraitsId> {
        (index < self.class_count).then_some(TraitsId(self.class_count + index))
    }

    pub fn instances(&self) -> impl Iterator<Item = &Traits> {
        self.traits[..self.class_count].iter()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Traits> {
        self.traits[self.class_count..self.class_count * 2].iter()
    }

    pub fn script_ids(&self) -> &[TraitsId] {
        &self.scripts
    }

    pub fn scripts(&self) -> impl Iterator<Item = &Traits> {
        self.scripts.iter().map(|&id| self.traits(id))
    }

    pub fn anonymous_methods(&self) -> impl Iterator<Item = MethodId> {
        self.methods
            .iter()
            .enumerate()
            .filter(|(_, method)| method.anonymous)
            .map(|(index, _)| MethodId(index))
    }

    /// Source keyword or identifier for the namespace `member` is declared in.
    pub fn namespace_name<'m>(&self, member: &'m MemberInfo) -> Cow<'m, str> {
        if member.is_public() {
            return Cow::Borrowed("public");
        }
        match member.name.namespace() {
            Some(ns) if !ns.is_empty() => ns.identifier(),
            _ => Cow::Borrowed("public"),
        }
    }

    /// Display form of `name` as referenced from inside `context`.
    pub fn resolve_name(&self, name: &Multiname, context: TraitsId) -> String {
        name.display_in(self.traits(context).package())
    }

    /// Walks every script, then the anonymous functions, reporting to
    /// `processor`, and finishes with the opcode size table.
    pub fn dump(&self, processor: &mut dyn Processor) -> Result<()> {
        processor::walk(self, &mut *processor).inspect_err(|err| processor.has_error(&err.to_string()))
    }
}
