use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};
use std::sync::Arc;

use crate::abc::constant_pool::Const;
use crate::abc::multiname::{Multiname, Namespace};
use crate::consts::{ClassFlags, MethodFlags, TraitAttributes};

/// Handle of a [`Traits`] container inside its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraitsId(pub(crate) usize);

/// Index into the module's method signature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) usize);

impl TraitsId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl MethodId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraitKind {
    Slot,
    Method,
    Getter,
    Setter,
    Class,
    Function,
    Const,
}

impl TraitKind {
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => TraitKind::Slot,
            1 => TraitKind::Method,
            2 => TraitKind::Getter,
            3 => TraitKind::Setter,
            4 => TraitKind::Class,
            5 => TraitKind::Function,
            6 => TraitKind::Const,
            _ => return None,
        })
    }

    /// Declaration keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            TraitKind::Slot => "var",
            TraitKind::Method | TraitKind::Function => "function",
            TraitKind::Getter => "function get",
            TraitKind::Setter => "function set",
            TraitKind::Class => "class",
            TraitKind::Const => "const",
        }
    }
}

#[derive(Debug)]
pub struct Metadata {
    pub(crate) name: Arc<str>,
    pub(crate) entries: Vec<(Option<Arc<str>>, Arc<str>)>,
}

impl Metadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key/value pairs in declaration order; keyless values have no key.
    pub fn entries(&self) -> &[(Option<Arc<str>>, Arc<str>)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_ref())
    }
}

/// Data shared by every member kind.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub(crate) name: Multiname,
    pub(crate) kind: TraitKind,
    pub(crate) parent: TraitsId,
    pub(crate) metadata: Vec<Arc<Metadata>>,
    pub(crate) attributes: TraitAttributes,
}

impl MemberInfo {
    pub fn name(&self) -> &Multiname {
        &self.name
    }

    pub fn kind(&self) -> TraitKind {
        self.kind
    }

    pub fn parent(&self) -> TraitsId {
        self.parent
    }

    pub fn metadata(&self) -> &[Arc<Metadata>] {
        &self.metadata
    }

    pub fn is_final(&self) -> bool {
        self.attributes.contains(TraitAttributes::FINAL)
    }

    pub fn is_override(&self) -> bool {
        self.attributes.contains(TraitAttributes::OVERRIDE)
    }

    pub fn is_public(&self) -> bool {
        self.attributes.contains(TraitAttributes::PUBLIC)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    None,
    Const(Const),
    /// Static side of a nested class.
    Class(TraitsId),
}

/// Variable, constant or nested class.
#[derive(Debug, Clone)]
pub struct SlotMember {
    pub(crate) info: MemberInfo,
    pub(crate) slot_id: u32,
    pub(crate) type_name: Multiname,
    pub(crate) value: SlotValue,
}

impl SlotMember {
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn slot_id(&self) -> u32 {
        self.slot_id
    }

    pub fn type_name(&self) -> &Multiname {
        &self.type_name
    }

    pub fn value(&self) -> &SlotValue {
        &self.value
    }
}

/// Method, accessor, constructor or initializer.
#[derive(Debug, Clone)]
pub struct FunctionMember {
    pub(crate) info: MemberInfo,
    /// Absent for constructors and initializers.
    pub(crate) disp_id: Option<u32>,
    pub(crate) method: MethodId,
}

impl FunctionMember {
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn disp_id(&self) -> Option<u32> {
        self.disp_id
    }

    pub fn method(&self) -> MethodId {
        self.method
    }
}

#[derive(Debug, Clone)]
pub enum Member {
    Slot(SlotMember),
    Function(FunctionMember),
}

impl Member {
    pub fn info(&self) -> &MemberInfo {
        match self {
            Member::Slot(slot) => &slot.info,
            Member::Function(function) => &function.info,
        }
    }

    pub fn name(&self) -> &Multiname {
        &self.info().name
    }

    pub fn kind(&self) -> TraitKind {
        self.info().kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitsKind {
    Instance { static_side: TraitsId },
    Class { instance: TraitsId },
    Script,
    Activation { method: MethodId },
}

/// Members declared by one container, with the three lookup indices.
#[derive(Debug, Default)]
pub(crate) struct TraitTable {
    pub(crate) members: Vec<Member>,
    pub(crate) slots: BTreeMap<u32, usize>,
    pub(crate) dispatch: BTreeMap<u32, usize>,
    pub(crate) by_name: HashMap<String, usize>,
}

impl TraitTable {
    pub(crate) fn push(&mut self, member: Member) {
        let index = self.members.len();
        match &member {
            Member::Slot(slot) => {
                self.slots.insert(slot.slot_id, index);
            }
            Member::Function(function) => {
                if let Some(disp_id) = function.disp_id {
                    self.dispatch.insert(disp_id, index);
                }
            }
        }
        self.by_name.insert(member.name().to_string(), index);
        self.members.push(member);
    }
}

#[derive(Debug)]
pub struct Traits {
    pub(crate) name: Multiname,
    pub(crate) base: Option<Multiname>,
    pub(crate) flags: ClassFlags,
    pub(crate) protected_ns: Option<Namespace>,
    pub(crate) interfaces: Vec<Multiname>,
    pub(crate) init: Option<FunctionMember>,
    pub(crate) kind: TraitsKind,
    pub(crate) table: TraitTable,
}

impl Traits {
    pub fn name(&self) -> &Multiname {
        &self.name
    }

    pub fn base(&self) -> Option<&Multiname> {
        self.base.as_ref()
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    pub fn protected_ns(&self) -> Option<&Namespace> {
        self.protected_ns.as_ref()
    }

    pub fn interfaces(&self) -> &[Multiname] {
        &self.interfaces
    }

    /// Constructor, static initializer or script initializer.
    pub fn init(&self) -> Option<&FunctionMember> {
        self.init.as_ref()
    }

    pub fn kind(&self) -> TraitsKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    pub fn static_side(&self) -> Option<TraitsId> {
        match self.kind {
            TraitsKind::Instance { static_side } => Some(static_side),
            _ => None,
        }
    }

    pub fn instance(&self) -> Option<TraitsId> {
        match self.kind {
            TraitsKind::Class { instance } => Some(instance),
            _ => None,
        }
    }

    /// Package the container's own name lives in.
    pub fn package(&self) -> &str {
        self.name.namespace().map_or("", |ns| ns.name())
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[Member] {
        &self.table.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.table
            .by_name
            .get(name)
            .map(|&index| &self.table.members[index])
    }

    pub fn slot(&self, slot_id: u32) -> Option<&Member> {
        self.table
            .slots
            .get(&slot_id)
            .map(|&index| &self.table.members[index])
    }

    pub fn dispatch(&self, disp_id: u32) -> Option<&Member> {
        self.table
            .dispatch
            .get(&disp_id)
            .map(|&index| &self.table.members[index])
    }
}

#[derive(Debug)]
pub struct MethodBody {
    pub(crate) max_stack: u32,
    pub(crate) local_count: u32,
    pub(crate) max_scope: u32,
    pub(crate) code: Arc<[u8]>,
    pub(crate) activation: TraitsId,
}

impl MethodBody {
    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn local_count(&self) -> u32 {
        self.local_count
    }

    /// Scope depth used on top of the initial depth.
    pub fn max_scope(&self) -> u32 {
        self.max_scope
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn activation(&self) -> TraitsId {
        self.activation
    }
}

/// A method signature and, once bodies are parsed, its code.
#[derive(Debug)]
pub struct MethodInfo {
    pub(crate) param_types: Vec<Multiname>,
    pub(crate) param_names: Option<Vec<Arc<str>>>,
    // parallel to param_types
    pub(crate) optional_values: Vec<Option<Const>>,
    pub(crate) return_type: Multiname,
    pub(crate) debug_name: Arc<str>,
    pub(crate) flags: MethodFlags,
    pub(crate) body: Option<MethodBody>,
    pub(crate) anonymous: bool,
}

/// One declared parameter, as yielded by [`MethodInfo::parameters`].
#[derive(Debug, Clone, Copy)]
pub struct Parameter<'a> {
    pub index: usize,
    pub name: Option<&'a str>,
    pub type_name: &'a Multiname,
    pub default: Option<&'a Const>,
    pub rest: bool,
}

impl MethodInfo {
    pub fn param_types(&self) -> &[Multiname] {
        &self.param_types
    }

    pub fn param_names(&self) -> Option<&[Arc<str>]> {
        self.param_names.as_deref()
    }

    pub fn return_type(&self) -> &Multiname {
        &self.return_type
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    pub fn has_rest(&self) -> bool {
        self.flags.contains(MethodFlags::NEED_REST)
    }

    /// Not referenced by any trait or initializer; created by `newfunction`.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn parameters(&self) -> impl Iterator<Item = Parameter<'_>> {
        let last = self.param_types.len().checked_sub(1);
        self.param_types
            .iter()
            .enumerate()
            .map(move |(index, type_name)| Parameter {
                index,
                name: self
                    .param_names
                    .as_ref()
                    .and_then(|names| names.get(index))
                    .map(AsRef::as_ref),
                type_name,
                default: self.optional_values.get(index).and_then(Option::as_ref),
                rest: self.has_rest() && Some(index) == last,
            })
    }
}
