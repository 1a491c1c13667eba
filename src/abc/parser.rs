use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::abc::constant_pool::{Const, ConstantPool, OPAQUE_TYPE};
use crate::abc::multiname::{ANY_NAME, Multiname, Namespace, NamespaceKind, is_identifier};
use crate::abc::traits::*;
use crate::abc::Abc;
use crate::consts::*;
use crate::error::{Error, Result};
use crate::processor::Processor;
use crate::reader::ByteReader;

pub(super) fn parse_abc(data: &[u8], processor: &mut dyn Processor) -> Result<Abc> {
    let mut parser = AbcParser {
        reader: ByteReader::new(data),
        processor,
    };

    let magic = parser.reader.read_u32()?;
    parser.processor.dump_stat(&format!("magic {magic:x}"));
    if !ABC_VERSIONS.contains(&magic) {
        return Err(Error::NotAbc { magic });
    }

    let pool = parser.parse_constant_pool()?;
    let mut methods = parser.parse_method_infos(&pool)?;
    let metadata = parser.parse_metadata_infos(&pool)?;

    let mut module = ModuleBuilder {
        pool: &pool,
        methods: &mut methods,
        metadata: &metadata,
        traits: Vec::new(),
        class_count: 0,
    };
    parser.parse_instance_infos(&mut module)?;
    parser.parse_class_infos(&mut module)?;
    let scripts = parser.parse_script_infos(&mut module)?;
    parser.parse_method_bodies(&mut module)?;

    let ModuleBuilder {
        traits, class_count, ..
    } = module;
    mark_anonymous(&mut methods, &traits);

    Ok(Abc {
        magic,
        size: data.len(),
        pool,
        methods,
        metadata,
        traits,
        class_count,
        scripts,
    })
}

struct AbcParser<'a, 'p> {
    reader: ByteReader<'a>,
    processor: &'p mut dyn Processor,
}

/// Tables filled while the trait sections are read.
struct ModuleBuilder<'m> {
    pool: &'m ConstantPool,
    methods: &'m mut Vec<MethodInfo>,
    metadata: &'m [Arc<Metadata>],
    traits: Vec<Traits>,
    class_count: usize,
}

impl ModuleBuilder<'_> {
    fn method_id(&self, index: u32) -> Result<MethodId> {
        if (index as usize) < self.methods.len() {
            Ok(MethodId(index as usize))
        } else {
            Err(Error::BadIndex {
                table: "method",
                index,
            })
        }
    }

    fn next_id(&self) -> TraitsId {
        TraitsId(self.traits.len())
    }
}

struct PendingTypeName {
    index: usize,
    base: u32,
    args: Vec<u32>,
}

fn percent(part: usize, whole: usize) -> usize {
    if whole == 0 { 0 } else { 100 * part / whole }
}

impl AbcParser<'_, '_> {
    fn u30(&mut self) -> Result<u32> {
        self.reader.read_var_u32()
    }

    fn report(&mut self, label: &str, start: usize) {
        let size = self.reader.position() - start;
        let line = format!("{label}{size} {} %", percent(size, self.reader.len()));
        self.processor.dump_stat(&line);
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let start = self.reader.position();

        let n = self.u30()?;
        let mut ints = vec![0];
        for _ in 1..n {
            ints.push(self.reader.read_var_s32()?);
        }

        let n = self.u30()?;
        let mut uints = vec![0];
        for _ in 1..n {
            uints.push(self.u30()?);
        }

        let n = self.u30()?;
        let mut doubles = vec![0.0];
        for _ in 1..n {
            doubles.push(self.reader.read_double()?);
        }
        debug!(ints = ints.len(), uints = uints.len(), doubles = doubles.len(), "numbers");
        self.report("Cpool numbers size ", start);
        let start = self.reader.position();

        let n = self.u30()?;
        let mut strings: Vec<Arc<str>> = vec![Arc::from("")];
        for _ in 1..n {
            let length = self.u30()? as usize;
            strings.push(self.reader.read_utf8(length)?);
        }
        debug!(count = n, "strings");
        self.report(&format!("Cpool strings count {n} size "), start);
        let start = self.reader.position();

        let mut pool = ConstantPool {
            ints,
            uints,
            doubles,
            strings,
            namespaces: vec![Namespace::new(NamespaceKind::Any, "")],
            ns_sets: vec![Arc::from(Vec::<Namespace>::new())],
            names: Vec::new(),
        };

        let n = self.u30()?;
        for _ in 1..n {
            let offset = self.reader.position();
            let kind = self.reader.read_u8()?;
            let index = self.u30()?;
            let namespace = match kind {
                CONSTANT_PRIVATE_NS => Namespace::private(),
                CONSTANT_NAMESPACE => Namespace::new(NamespaceKind::Namespace, Arc::clone(pool.string(index)?)),
                CONSTANT_PACKAGE_NS => Namespace::new(NamespaceKind::Package, Arc::clone(pool.string(index)?)),
                CONSTANT_PACKAGE_INTERNAL_NS => {
                    Namespace::new(NamespaceKind::PackageInternal, Arc::clone(pool.string(index)?))
                }
                CONSTANT_PROTECTED_NS => Namespace::new(NamespaceKind::Protected, Arc::clone(pool.string(index)?)),
                CONSTANT_EXPLICIT_NS => Namespace::new(NamespaceKind::Explicit, Arc::clone(pool.string(index)?)),
                CONSTANT_STATIC_PROTECTED_NS => {
                    Namespace::new(NamespaceKind::StaticProtected, Arc::clone(pool.string(index)?))
                }
                _ => return Err(Error::InvalidNamespaceKind { kind, offset }),
            };
            pool.namespaces.push(namespace);
        }
        debug!(count = n, "namespaces");
        self.report(&format!("Cpool namespaces count {n} size "), start);
        let start = self.reader.position();

        let n = self.u30()?;
        for _ in 1..n {
            let count = self.u30()?;
            let mut set = Vec::new();
            for _ in 0..count {
                let index = self.u30()?;
                set.push(pool.namespace(index)?.clone());
            }
            pool.ns_sets.push(Arc::from(set));
        }
        debug!(count = n, "namespace sets");
        self.report(&format!("Cpool nssets count {n} size "), start);
        let start = self.reader.position();

        // from here on index 0 reads as the any name
        pool.strings[0] = Arc::from(ANY_NAME);
        let n = self.u30()?;
        pool.names.push(Some(Multiname::any()));
        let mut pending = Vec::new();
        for index in 1..n as usize {
            let name = self.parse_multiname(&pool, index, &mut pending)?;
            pool.names.push(name);
        }
        resolve_type_names(&mut pool.names, pending)?;
        debug!(count = n, "names");
        self.report(&format!("Cpool names count {n} size "), start);

        Ok(pool)
    }

    fn parse_multiname(
        &mut self,
        pool: &ConstantPool,
        index: usize,
        pending: &mut Vec<PendingTypeName>,
    ) -> Result<Option<Multiname>> {
        let offset = self.reader.position();
        let kind = self.reader.read_u8()?;
        let name = match kind {
            CONSTANT_QNAME | CONSTANT_QNAME_A => {
                let ns = self.u30()?;
                let namespace = if ns == 0 {
                    Namespace::new(NamespaceKind::Any, ANY_NAME)
                } else {
                    pool.namespace(ns)?.clone()
                };
                let name = self.u30()?;
                Multiname::new(vec![namespace], Some(Arc::clone(pool.string(name)?)))
            }
            CONSTANT_RTQNAME | CONSTANT_RTQNAME_A => {
                let name = self.u30()?;
                let namespace = Namespace::new(NamespaceKind::Namespace, Arc::clone(pool.string(name)?));
                Multiname::new(vec![namespace], None)
            }
            CONSTANT_RTQNAME_L | CONSTANT_RTQNAME_LA => return Ok(None),
            CONSTANT_NAME_L | CONSTANT_NAME_LA => Multiname::new(vec![Namespace::public()], None),
            CONSTANT_MULTINAME | CONSTANT_MULTINAME_A => {
                let name = self.u30()?;
                let name = Arc::clone(pool.string(name)?);
                let set = self.u30()?;
                Multiname::new(Arc::clone(pool.ns_set(set)?), Some(name))
            }
            CONSTANT_MULTINAME_L | CONSTANT_MULTINAME_LA => {
                let set = self.u30()?;
                Multiname::new(Arc::clone(pool.ns_set(set)?), None)
            }
            CONSTANT_TYPE_NAME => {
                let base = self.u30()?;
                let count = self.u30()?;
                let mut args = Vec::new();
                for _ in 0..count {
                    args.push(self.u30()?);
                }
                pending.push(PendingTypeName { index, base, args });
                return Ok(None);
            }
            _ => return Err(Error::InvalidMultinameKind { kind, offset }),
        };
        Ok(Some(name))
    }

    fn parse_method_infos(&mut self, pool: &ConstantPool) -> Result<Vec<MethodInfo>> {
        let start = self.reader.position();
        let count = self.u30()?;
        let mut methods = Vec::new();

        for i in 0..count as usize {
            let offset = self.reader.position();
            let param_count = self.u30()? as usize;
            // every parameter takes at least one byte
            if param_count > self.reader.remaining() {
                return Err(Error::UnexpectedEof {
                    offset,
                    need: param_count,
                });
            }
            let return_type = pool.type_name(self.u30()?)?;
            let mut param_types = Vec::with_capacity(param_count);
            for _ in 0..param_count {
                param_types.push(pool.type_name(self.u30()?)?);
            }
            let debug_name = Arc::clone(pool.string(self.u30()?)?);
            let flags = MethodFlags::from_bits_retain(self.reader.read_u8()?);

            let mut optional_values = vec![None; param_count];
            if flags.contains(MethodFlags::HAS_OPTIONAL) {
                let optional = self.u30()?;
                if optional as usize > param_count {
                    return Err(Error::InvalidOptionalCount {
                        method: i,
                        optional,
                        params: param_count,
                    });
                }
                for k in param_count - optional as usize..param_count {
                    let index = self.u30()?;
                    let kind = self.reader.read_u8()?;
                    optional_values[k] = if index == 0 {
                        // no value given, pick one by type
                        Some(Const::implied_by(&param_types[k]))
                    } else {
                        let value = pool.constant(kind, index)?;
                        if value.is_none() {
                            warn!(kind, method = i, "default value kind has no value table");
                            self.processor.has_error(&format!("ERROR kind={kind} method_id {i}"));
                        }
                        value
                    };
                }
            }

            let mut param_names = None;
            if flags.contains(MethodFlags::HAS_PARAM_NAMES) {
                let mut used = HashSet::new();
                let mut names = Vec::with_capacity(param_count);
                for k in 0..param_count {
                    let name = pool.string(self.u30()?)?;
                    if is_identifier(name) && used.insert(Arc::clone(name)) {
                        names.push(Arc::clone(name));
                    } else {
                        names.push(Arc::from(format!("_{k}")));
                    }
                }
                param_names = Some(names);
            }

            if flags.contains(MethodFlags::NEED_REST) {
                param_types.push(Multiname::bare("..."));
                optional_values.push(None);
                if let Some(names) = &mut param_names {
                    let rest = if names.iter().any(|name| &**name == "rest") {
                        "__rest"
                    } else {
                        "rest"
                    };
                    names.push(Arc::from(rest));
                }
            }

            methods.push(MethodInfo {
                param_types,
                param_names,
                optional_values,
                return_type,
                debug_name,
                flags,
                body: None,
                anonymous: false,
            });
        }

        debug!(count, "method infos");
        self.report(&format!("MethodInfo count {count} size "), start);
        Ok(methods)
    }

    fn parse_metadata_infos(&mut self, pool: &ConstantPool) -> Result<Vec<Arc<Metadata>>> {
        let count = self.u30()?;
        let mut metadata = Vec::new();
        for _ in 0..count {
            let name = Arc::clone(pool.string(self.u30()?)?);
            let value_count = self.u30()?;
            let mut keys = Vec::new();
            for _ in 0..value_count {
                let key = self.u30()?;
                keys.push(match key {
                    0 => None,
                    key => Some(Arc::clone(pool.string(key)?)),
                });
            }
            let mut entries = Vec::with_capacity(keys.len());
            for key in keys {
                entries.push((key, Arc::clone(pool.string(self.u30()?)?)));
            }
            metadata.push(Arc::new(Metadata { name, entries }));
        }
        debug!(count, "metadata");
        Ok(metadata)
    }

    fn parse_instance_infos(&mut self, module: &mut ModuleBuilder<'_>) -> Result<()> {
        let start = self.reader.position();
        let count = self.u30()? as usize;
        module.class_count = count;

        for i in 0..count {
            let id = module.next_id();
            let name = module.pool.type_name(self.u30()?)?;
            let base = match self.u30()? {
                0 => None,
                index => Some(module.pool.type_name(index)?),
            };
            let flags = ClassFlags::from_bits_retain(self.reader.read_u8()?);
            let protected_ns = if flags.contains(ClassFlags::PROTECTED_NS) {
                Some(module.pool.namespace(self.u30()?)?.clone())
            } else {
                None
            };
            let interface_count = self.u30()?;
            let mut interfaces = Vec::new();
            for _ in 0..interface_count {
                interfaces.push(module.pool.type_name(self.u30()?)?);
            }
            let method = module.method_id(self.u30()?)?;
            let init = initializer(name.clone(), id, method);
            let table = self.parse_traits(module, id)?;

            module.traits.push(Traits {
                name,
                base,
                flags,
                protected_ns,
                interfaces,
                init: Some(init),
                kind: TraitsKind::Instance {
                    static_side: TraitsId(count + i),
                },
                table,
            });
        }

        debug!(count, "instances");
        self.report("InstanceInfo size ", start);
        Ok(())
    }

    fn parse_class_infos(&mut self, module: &mut ModuleBuilder<'_>) -> Result<()> {
        let start = self.reader.position();

        for i in 0..module.class_count {
            let id = module.next_id();
            let instance = module.traits[i].name.clone();
            let method = module.method_id(self.u30()?)?;
            let init = initializer(Multiname::bare(format!("{instance}$cinit")), id, method);
            let table = self.parse_traits(module, id)?;

            module.traits.push(Traits {
                name: instance.with_suffix("$"),
                base: Some(Multiname::bare(OPAQUE_TYPE)),
                flags: ClassFlags::empty(),
                protected_ns: None,
                interfaces: Vec::new(),
                init: Some(init),
                kind: TraitsKind::Class {
                    instance: TraitsId(i),
                },
                table,
            });
        }

        debug!(count = module.class_count, "classes");
        self.report("ClassInfo size ", start);
        Ok(())
    }

    fn parse_script_infos(&mut self, module: &mut ModuleBuilder<'_>) -> Result<Vec<TraitsId>> {
        let start = self.reader.position();
        let count = self.u30()?;
        let mut scripts = Vec::new();

        for i in 0..count {
            let id = module.next_id();
            let name = format!("script{i}");
            let method = module.method_id(self.u30()?)?;
            let init = initializer(Multiname::bare(format!("{name}$init")), id, method);
            let table = self.parse_traits(module, id)?;

            module.traits.push(Traits {
                name: Multiname::bare(name),
                base: None,
                flags: ClassFlags::empty(),
                protected_ns: None,
                interfaces: Vec::new(),
                init: Some(init),
                kind: TraitsKind::Script,
                table,
            });
            scripts.push(id);
        }

        debug!(count, "scripts");
        self.report("ScriptInfo size ", start);
        Ok(scripts)
    }

    fn parse_method_bodies(&mut self, module: &mut ModuleBuilder<'_>) -> Result<()> {
        let start = self.reader.position();
        let count = self.u30()?;

        for _ in 0..count {
            let method = module.method_id(self.u30()?)?;
            let max_stack = self.u30()?;
            let local_count = self.u30()?;
            let init_scope = self.u30()?;
            let max_scope = self.u30()?.saturating_sub(init_scope);
            let code_length = self.u30()? as usize;
            let code = self.reader.read_bytes(code_length)?;

            // exception handlers are not modelled
            let exception_count = self.u30()?;
            for _ in 0..exception_count {
                for _ in 0..5 {
                    self.u30()?;
                }
            }

            let activation = module.next_id();
            let table = self.parse_traits(module, activation)?;
            let debug_name = Arc::clone(&module.methods[method.0].debug_name);
            module.traits.push(Traits {
                name: Multiname::bare(debug_name),
                base: None,
                flags: ClassFlags::empty(),
                protected_ns: None,
                interfaces: Vec::new(),
                init: None,
                kind: TraitsKind::Activation { method },
                table,
            });
            module.methods[method.0].body = Some(MethodBody {
                max_stack,
                local_count,
                max_scope,
                code,
                activation,
            });
        }

        debug!(count, "method bodies");
        self.report("MethodBodies size ", start);
        Ok(())
    }

    fn parse_traits(&mut self, module: &ModuleBuilder<'_>, parent: TraitsId) -> Result<TraitTable> {
        let count = self.u30()?;
        let mut table = TraitTable::default();

        for _ in 0..count {
            let name = module.pool.type_name(self.u30()?)?;
            let offset = self.reader.position();
            let tag = self.reader.read_u8()?;
            let kind = TraitKind::from_tag(tag & 0x0f).ok_or(Error::InvalidTraitKind {
                kind: tag & 0x0f,
                offset,
            })?;
            let mut info = MemberInfo {
                name,
                kind,
                parent,
                metadata: Vec::new(),
                attributes: TraitAttributes::from_bits_retain(tag >> 4),
            };

            let member = match kind {
                TraitKind::Slot | TraitKind::Const => {
                    let slot_id = self.u30()?;
                    let type_name = module.pool.type_name(self.u30()?)?;
                    let value = match self.u30()? {
                        0 => SlotValue::None,
                        index => {
                            let value_kind = self.reader.read_u8()?;
                            match module.pool.constant(value_kind, index)? {
                                Some(value) => SlotValue::Const(value),
                                None => {
                                    warn!(kind = value_kind, slot = slot_id, "slot value kind has no value table");
                                    self.processor.has_error(&format!("ERROR kind={value_kind} slot {slot_id}"));
                                    SlotValue::None
                                }
                            }
                        }
                    };
                    PendingMember::Slot {
                        slot_id,
                        type_name,
                        value,
                    }
                }
                TraitKind::Class => {
                    let slot_id = self.u30()?;
                    let index = self.u30()?;
                    if index as usize >= module.class_count {
                        return Err(Error::BadIndex {
                            table: "class",
                            index,
                        });
                    }
                    PendingMember::Slot {
                        slot_id,
                        type_name: Multiname::bare(OPAQUE_TYPE),
                        value: SlotValue::Class(TraitsId(module.class_count + index as usize)),
                    }
                }
                TraitKind::Method | TraitKind::Getter | TraitKind::Setter | TraitKind::Function => {
                    let disp_id = self.u30()?;
                    let method = module.method_id(self.u30()?)?;
                    PendingMember::Function { disp_id, method }
                }
            };

            if info.attributes.contains(TraitAttributes::METADATA) {
                let metadata_count = self.u30()?;
                for _ in 0..metadata_count {
                    let index = self.u30()?;
                    let entry = module.metadata.get(index as usize).ok_or(Error::BadIndex {
                        table: "metadata",
                        index,
                    })?;
                    info.metadata.push(Arc::clone(entry));
                }
            }

            table.push(match member {
                PendingMember::Slot {
                    slot_id,
                    type_name,
                    value,
                } => Member::Slot(SlotMember {
                    info,
                    slot_id,
                    type_name,
                    value,
                }),
                PendingMember::Function { disp_id, method } => Member::Function(FunctionMember {
                    info,
                    disp_id: Some(disp_id),
                    method,
                }),
            });
        }

        Ok(table)
    }
}

enum PendingMember {
    Slot {
        slot_id: u32,
        type_name: Multiname,
        value: SlotValue,
    },
    Function {
        disp_id: u32,
        method: MethodId,
    },
}

fn initializer(name: Multiname, parent: TraitsId, method: MethodId) -> FunctionMember {
    FunctionMember {
        info: MemberInfo {
            name,
            kind: TraitKind::Method,
            parent,
            metadata: Vec::new(),
            attributes: TraitAttributes::empty(),
        },
        disp_id: None,
        method,
    }
}

/// Resolves parameterized names until a pass makes no progress.
fn resolve_type_names(names: &mut [Option<Multiname>], mut pending: Vec<PendingTypeName>) -> Result<()> {
    while !pending.is_empty() {
        let mut unresolved = Vec::new();
        let before = pending.len();
        for entry in pending {
            match resolve_type_name(names, &entry)? {
                Some(name) => names[entry.index] = Some(name),
                None => unresolved.push(entry),
            }
        }
        if unresolved.len() == before {
            return Err(Error::UnresolvedTypeName {
                index: unresolved[0].index as u32,
            });
        }
        pending = unresolved;
    }
    Ok(())
}

fn resolve_type_name(names: &[Option<Multiname>], entry: &PendingTypeName) -> Result<Option<Multiname>> {
    let lookup = |index: u32| {
        names.get(index as usize).ok_or(Error::BadIndex {
            table: "multiname",
            index,
        })
    };

    let Some(base) = lookup(entry.base)? else {
        return Ok(None);
    };
    let mut text = base.to_string();
    if !entry.args.is_empty() {
        let mut args = Vec::with_capacity(entry.args.len());
        for &arg in &entry.args {
            let Some(arg) = lookup(arg)? else {
                return Ok(None);
            };
            args.push(arg.type_argument());
        }
        text = format!("{text}.<{}>", args.join(","));
    }

    Ok(Some(match text.split_once("::") {
        Some((ns, name)) => Multiname::qualified(Namespace::new(NamespaceKind::Package, ns), name),
        None => Multiname::qualified(Namespace::public(), text),
    }))
}

fn mark_anonymous(methods: &mut [MethodInfo], traits: &[Traits]) {
    let mut referenced = vec![false; methods.len()];
    for container in traits {
        let functions = container.init.iter().chain(container.table.members.iter().filter_map(|member| {
            match member {
                Member::Function(function) => Some(function),
                Member::Slot(_) => None,
            }
        }));
        for function in functions {
            referenced[function.method.0] = true;
        }
    }
    for (method, referenced) in methods.iter_mut().zip(referenced) {
        method.anonymous = !referenced;
    }
}
