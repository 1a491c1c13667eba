use std::borrow::Cow;

use crate::abc::{
    Abc, Const, FunctionMember, Member, MemberInfo, Metadata, MethodId, Multiname, Parameter,
    SlotMember, SlotValue, Traits, TraitsId,
};
use crate::bytecode::{DecoderState, Instruction, InstructionDecoder};
use crate::error::Result;

/// Where a type reference appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeContext {
    Base,
    Interface,
    Variable,
    Return,
    Parameter,
}

/// Rendering state handed to the member callbacks.
#[derive(Debug, Clone)]
pub struct Declaration<'a> {
    /// Nesting level, 0 for script members.
    pub depth: usize,
    /// Source identifier of the member's namespace.
    pub namespace: Cow<'a, str>,
    pub is_static: bool,
    /// Declared type, return type or base class, as the processor asked for it.
    pub type_text: Option<String>,
    /// Implemented interfaces of a class, in declaration order.
    pub interfaces: Vec<String>,
}

/// Receives every decoded unit of a module.
///
/// All methods have no-op defaults so a processor only implements what it
/// renders.
pub trait Processor {
    /// A free-text statistics line.
    fn dump_stat(&mut self, _stat: &str) {}

    /// A diagnostic; fatal errors are reported here before being returned.
    fn has_error(&mut self, _error: &str) {}

    fn begin_script_traits(&mut self, _abc: &Abc, _script: &Traits) {}

    /// Filter applied to every member, constructors and initializers included.
    fn should_emit(&mut self, _abc: &Abc, _member: &MemberInfo) -> bool {
        true
    }

    fn process_metadata(&mut self, _metadata: &Metadata) {}

    /// Instance side of a class; members follow, then [`Processor::end_class`].
    fn process_class(&mut self, _abc: &Abc, _class: &Traits, _decl: &Declaration<'_>) {}

    fn end_class(&mut self, _abc: &Abc, _class: &Traits) {}

    fn process_variable(&mut self, _abc: &Abc, _slot: &SlotMember, _decl: &Declaration<'_>) {}

    fn process_value(&mut self, _type_name: &Multiname, _value: &Const) {}

    /// Returns whether the function body should be disassembled.
    fn process_function(
        &mut self,
        _abc: &Abc,
        _function: &FunctionMember,
        _decl: &Declaration<'_>,
    ) -> bool {
        false
    }

    fn process_parameter(&mut self, _parameter: &Parameter<'_>, _type_text: &str, _owner: &Multiname) {}

    fn process_instruction(&mut self, _instruction: &Instruction) {}

    fn end_function(&mut self, _abc: &Abc, _function: &FunctionMember) {}

    /// Returns whether the function body should be disassembled.
    fn process_anonymous_function(&mut self, _abc: &Abc, _method: MethodId) -> bool {
        false
    }

    /// Asks whether `name` is wanted namespace-qualified.
    fn dump_type_reference(&mut self, _name: &Multiname, _context: TypeContext) -> bool {
        true
    }
}

/// Processor that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProcessor;

impl Processor for NullProcessor {}

pub(crate) fn walk(abc: &Abc, processor: &mut dyn Processor) -> Result<()> {
    let mut walker = Walker {
        abc,
        processor,
        state: DecoderState::default(),
    };

    for &script in abc.script_ids() {
        walker.processor.begin_script_traits(abc, abc.traits(script));
        walker.walk_traits(script, 0, false)?;
    }

    for method in abc.anonymous_methods() {
        if walker.processor.process_anonymous_function(abc, method) {
            walker.disassemble(method)?;
        }
    }

    for line in walker.state.report() {
        walker.processor.dump_stat(&line);
    }
    Ok(())
}

struct Walker<'a, 'p> {
    abc: &'a Abc,
    processor: &'p mut dyn Processor,
    state: DecoderState,
}

impl<'a> Walker<'a, '_> {
    fn type_text(&mut self, name: &Multiname, context: TypeContext, within: TraitsId) -> String {
        if self.processor.dump_type_reference(name, context) {
            self.abc.resolve_name(name, within)
        } else {
            name.name().to_string()
        }
    }

    fn declaration(&self, info: &'a MemberInfo, depth: usize, is_static: bool) -> Declaration<'a> {
        Declaration {
            depth,
            namespace: self.abc.namespace_name(info),
            is_static,
            type_text: None,
            interfaces: Vec::new(),
        }
    }

    fn walk_traits(&mut self, id: TraitsId, depth: usize, is_static: bool) -> Result<()> {
        let abc = self.abc;
        let traits = abc.traits(id);

        if let Some(init) = traits.init() {
            self.walk_function(init, depth, is_static)?;
        }

        for member in traits.members() {
            if !self.processor.should_emit(abc, member.info()) {
                continue;
            }
            for metadata in member.info().metadata() {
                self.processor.process_metadata(metadata);
            }
            match member {
                Member::Slot(slot) => match slot.value() {
                    SlotValue::Class(class) => self.walk_class(slot, *class, depth)?,
                    value => {
                        let mut decl = self.declaration(slot.info(), depth, is_static);
                        decl.type_text = Some(self.type_text(slot.type_name(), TypeContext::Variable, id));
                        self.processor.process_variable(abc, slot, &decl);
                        if let SlotValue::Const(value) = value {
                            self.processor.process_value(slot.type_name(), value);
                        }
                    }
                },
                Member::Function(function) => self.walk_function(function, depth, is_static)?,
            }
        }
        Ok(())
    }

    fn walk_class(&mut self, slot: &'a SlotMember, class: TraitsId, depth: usize) -> Result<()> {
        let abc = self.abc;
        let Some(instance) = abc.traits(class).instance() else {
            return Ok(());
        };
        let traits = abc.traits(instance);

        let mut decl = self.declaration(slot.info(), depth, false);
        decl.type_text = traits
            .base()
            .map(|base| self.type_text(base, TypeContext::Base, instance));
        decl.interfaces = traits
            .interfaces()
            .iter()
            .map(|interface| self.type_text(interface, TypeContext::Interface, instance))
            .collect();
        self.processor.process_class(abc, traits, &decl);

        self.walk_traits(instance, depth + 1, false)?;
        self.walk_traits(class, depth + 1, true)?;
        self.processor.end_class(abc, traits);
        Ok(())
    }

    fn walk_function(&mut self, function: &'a FunctionMember, depth: usize, is_static: bool) -> Result<()> {
        let abc = self.abc;
        let info = function.info();
        if function.disp_id().is_none() && !self.processor.should_emit(abc, info) {
            return Ok(());
        }
        let method = abc.method(function.method());
        let parent = info.parent();

        let mut decl = self.declaration(info, depth, is_static);
        decl.type_text = Some(self.type_text(method.return_type(), TypeContext::Return, parent));
        let wants_body = self.processor.process_function(abc, function, &decl);

        for parameter in method.parameters() {
            let type_text = self.type_text(parameter.type_name, TypeContext::Parameter, parent);
            self.processor.process_parameter(&parameter, &type_text, info.name());
        }

        if wants_body {
            self.disassemble(function.method())?;
        }
        self.processor.end_function(abc, function);
        Ok(())
    }

    fn disassemble(&mut self, method: MethodId) -> Result<()> {
        let abc = self.abc;
        let Some(body) = abc.method(method).body() else {
            return Ok(());
        };
        let mut decoder = InstructionDecoder::new(abc, body.code());
        while let Some(instruction) = decoder.next_instruction(&mut self.state)? {
            self.processor.process_instruction(&instruction);
        }
        Ok(())
    }
}
