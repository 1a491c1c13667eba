#![allow(dead_code)]

use std::io::Write;

use avm2::abc::{Abc, Const, FunctionMember, Metadata, MethodId, Multiname, Parameter, SlotMember, Traits};
use avm2::bytecode::Instruction;
use avm2::processor::{Declaration, Processor, TypeContext};
use flate2::{Compression, write::ZlibEncoder};

pub const VERSION: u32 = 46 << 16 | 16;

pub const KIND_QNAME: u8 = 0x07;
pub const KIND_PACKAGE_NS: u8 = 0x16;
pub const KIND_PRIVATE_NS: u8 = 0x05;
pub const KIND_TYPE_NAME: u8 = 0x1D;

pub fn u30(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let group = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(group);
            return;
        }
        out.push(group | 0x80);
    }
}

pub fn s24(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

fn section(out: &mut Vec<u8>, entries: &[Vec<u8>]) {
    u30(out, entries.len() as u32);
    for entry in entries {
        out.extend_from_slice(entry);
    }
}

// pools count their implicit entry 0
fn pool(out: &mut Vec<u8>, entries: &[Vec<u8>]) {
    u30(out, if entries.is_empty() { 0 } else { entries.len() as u32 + 1 });
    for entry in entries {
        out.extend_from_slice(entry);
    }
}

/// Encoded trait list.
pub fn traits(members: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    section(&mut out, members);
    out
}

pub fn slot_trait(name: u32, slot_id: u32, type_name: u32) -> Vec<u8> {
    let mut out = Vec::new();
    u30(&mut out, name);
    out.push(0x00);
    u30(&mut out, slot_id);
    u30(&mut out, type_name);
    u30(&mut out, 0);
    out
}

pub fn const_trait(name: u32, slot_id: u32, type_name: u32, value: u32, kind: u8) -> Vec<u8> {
    let mut out = Vec::new();
    u30(&mut out, name);
    out.push(0x06);
    u30(&mut out, slot_id);
    u30(&mut out, type_name);
    u30(&mut out, value);
    out.push(kind);
    out
}

pub fn method_trait(name: u32, disp_id: u32, method: u32) -> Vec<u8> {
    let mut out = Vec::new();
    u30(&mut out, name);
    out.push(0x01);
    u30(&mut out, disp_id);
    u30(&mut out, method);
    out
}

pub fn class_trait(name: u32, slot_id: u32, class: u32) -> Vec<u8> {
    let mut out = Vec::new();
    u30(&mut out, name);
    out.push(0x04);
    u30(&mut out, slot_id);
    u30(&mut out, class);
    out
}

/// Appends a metadata reference list and sets the metadata attribute bit.
pub fn with_metadata(mut member: Vec<u8>, name_len: usize, metadata: &[u32]) -> Vec<u8> {
    member[name_len] |= 0x40;
    let mut tail = Vec::new();
    u30(&mut tail, metadata.len() as u32);
    for &index in metadata {
        u30(&mut tail, index);
    }
    member.extend(tail);
    member
}

/// Instance fields up to the constructor index.
pub fn instance_header(name: u32, base: u32, flags: u8, protected_ns: Option<u32>, interfaces: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    u30(&mut out, name);
    u30(&mut out, base);
    out.push(flags);
    if let Some(ns) = protected_ns {
        u30(&mut out, ns);
    }
    u30(&mut out, interfaces.len() as u32);
    for &interface in interfaces {
        u30(&mut out, interface);
    }
    out
}

/// Assembles an ABC module section by section.
#[derive(Debug, Default)]
pub struct AbcBuilder {
    pub ints: Vec<i32>,
    pub uints: Vec<u32>,
    pub doubles: Vec<f64>,
    pub strings: Vec<String>,
    pub namespaces: Vec<(u8, u32)>,
    pub names: Vec<Vec<u8>>,
    pub methods: Vec<Vec<u8>>,
    pub metadata: Vec<Vec<u8>>,
    pub instances: Vec<Vec<u8>>,
    pub classes: Vec<Vec<u8>>,
    pub scripts: Vec<Vec<u8>>,
    pub bodies: Vec<Vec<u8>>,
}

impl AbcBuilder {
    pub fn int(&mut self, value: i32) -> u32 {
        self.ints.push(value);
        self.ints.len() as u32
    }

    pub fn uint(&mut self, value: u32) -> u32 {
        self.uints.push(value);
        self.uints.len() as u32
    }

    pub fn double(&mut self, value: f64) -> u32 {
        self.doubles.push(value);
        self.doubles.len() as u32
    }

    /// Index of `text`, interning it; the empty string is index 0.
    pub fn string(&mut self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        if let Some(index) = self.strings.iter().position(|s| s == text) {
            return index as u32 + 1;
        }
        self.strings.push(text.to_string());
        self.strings.len() as u32
    }

    pub fn namespace(&mut self, kind: u8, name: &str) -> u32 {
        let name = self.string(name);
        self.namespaces.push((kind, name));
        self.namespaces.len() as u32
    }

    pub fn package(&mut self, name: &str) -> u32 {
        self.namespace(KIND_PACKAGE_NS, name)
    }

    pub fn qname(&mut self, ns: u32, name: &str) -> u32 {
        let name = self.string(name);
        let mut out = vec![KIND_QNAME];
        u30(&mut out, ns);
        u30(&mut out, name);
        self.names.push(out);
        self.names.len() as u32
    }

    /// Reserves a name slot to be filled with [`AbcBuilder::set_type_name`].
    pub fn reserve_name(&mut self) -> u32 {
        self.names.push(Vec::new());
        self.names.len() as u32
    }

    pub fn set_type_name(&mut self, index: u32, base: u32, args: &[u32]) {
        let mut out = vec![KIND_TYPE_NAME];
        u30(&mut out, base);
        u30(&mut out, args.len() as u32);
        for &arg in args {
            u30(&mut out, arg);
        }
        self.names[index as usize - 1] = out;
    }

    pub fn type_name(&mut self, base: u32, args: &[u32]) -> u32 {
        let index = self.reserve_name();
        self.set_type_name(index, base, args);
        index
    }

    /// A signature with no flag sections.
    pub fn method(&mut self, name: &str, params: &[u32], return_type: u32) -> u32 {
        let name = self.string(name);
        self.method_with(name, params, return_type, 0, &[])
    }

    /// A signature whose flag byte is followed by `tail` verbatim.
    pub fn method_with(&mut self, name: u32, params: &[u32], return_type: u32, flags: u8, tail: &[u8]) -> u32 {
        let mut out = Vec::new();
        u30(&mut out, params.len() as u32);
        u30(&mut out, return_type);
        for &param in params {
            u30(&mut out, param);
        }
        u30(&mut out, name);
        out.push(flags);
        out.extend_from_slice(tail);
        self.methods.push(out);
        self.methods.len() as u32 - 1
    }

    pub fn metadata(&mut self, name: &str, entries: &[(Option<&str>, &str)]) -> u32 {
        let mut out = Vec::new();
        u30(&mut out, self.string(name));
        u30(&mut out, entries.len() as u32);
        for (key, _) in entries {
            let key = key.map_or(0, |key| self.string(key));
            u30(&mut out, key);
        }
        for (_, value) in entries {
            let value = self.string(value);
            u30(&mut out, value);
        }
        self.metadata.push(out);
        self.metadata.len() as u32 - 1
    }

    /// Instance and matching static side; returns the class index.
    pub fn class(&mut self, name: u32, base: u32, iinit: u32, instance_traits: &[Vec<u8>], cinit: u32, static_traits: &[Vec<u8>]) -> u32 {
        let header = instance_header(name, base, 0x01, None, &[]);
        self.class_from(header, iinit, instance_traits, cinit, static_traits)
    }

    /// Like [`AbcBuilder::class`] with a prebuilt [`instance_header`].
    pub fn class_from(&mut self, header: Vec<u8>, iinit: u32, instance_traits: &[Vec<u8>], cinit: u32, static_traits: &[Vec<u8>]) -> u32 {
        let mut out = header;
        u30(&mut out, iinit);
        out.extend(traits(instance_traits));
        self.instances.push(out);

        let mut out = Vec::new();
        u30(&mut out, cinit);
        out.extend(traits(static_traits));
        self.classes.push(out);
        self.classes.len() as u32 - 1
    }

    pub fn script(&mut self, init: u32, members: &[Vec<u8>]) {
        let mut out = Vec::new();
        u30(&mut out, init);
        out.extend(traits(members));
        self.scripts.push(out);
    }

    pub fn body(&mut self, method: u32, code: &[u8]) {
        let mut out = Vec::new();
        u30(&mut out, method);
        u30(&mut out, 2);
        u30(&mut out, 1);
        u30(&mut out, 0);
        u30(&mut out, 1);
        u30(&mut out, code.len() as u32);
        out.extend_from_slice(code);
        u30(&mut out, 0);
        u30(&mut out, 0);
        self.bodies.push(out);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = VERSION.to_le_bytes().to_vec();

        let ints: Vec<Vec<u8>> = self
            .ints
            .iter()
            .map(|&value| {
                let mut out = Vec::new();
                u30(&mut out, value as u32);
                out
            })
            .collect();
        pool(&mut out, &ints);
        let uints: Vec<Vec<u8>> = self
            .uints
            .iter()
            .map(|&value| {
                let mut out = Vec::new();
                u30(&mut out, value);
                out
            })
            .collect();
        pool(&mut out, &uints);
        let doubles: Vec<Vec<u8>> = self.doubles.iter().map(|value| value.to_le_bytes().to_vec()).collect();
        pool(&mut out, &doubles);

        let strings: Vec<Vec<u8>> = self
            .strings
            .iter()
            .map(|text| {
                let mut out = Vec::new();
                u30(&mut out, text.len() as u32);
                out.extend_from_slice(text.as_bytes());
                out
            })
            .collect();
        pool(&mut out, &strings);

        let namespaces: Vec<Vec<u8>> = self
            .namespaces
            .iter()
            .map(|&(kind, name)| {
                let mut out = vec![kind];
                u30(&mut out, name);
                out
            })
            .collect();
        pool(&mut out, &namespaces);
        pool(&mut out, &[]);
        pool(&mut out, &self.names);

        section(&mut out, &self.methods);
        section(&mut out, &self.metadata);
        section(&mut out, &self.instances);
        for class in &self.classes {
            out.extend_from_slice(class);
        }
        section(&mut out, &self.scripts);
        section(&mut out, &self.bodies);
        out
    }
}

/// The smallest valid module: one public class `Foo` with no members,
/// declared by one script.
pub fn foo_module() -> AbcBuilder {
    let mut abc = AbcBuilder::default();
    let public = abc.package("");
    let foo = abc.qname(public, "Foo");
    let init = abc.method("", &[], 0);
    let class = abc.class(foo, 0, init, &[], init, &[]);
    abc.script(init, &[class_trait(foo, 1, class)]);
    abc
}

fn tag(out: &mut Vec<u8>, code: u16, body: &[u8]) {
    if body.len() < 0x3f {
        out.extend_from_slice(&(code << 6 | body.len() as u16).to_le_bytes());
    } else {
        out.extend_from_slice(&(code << 6 | 0x3f).to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    }
    out.extend_from_slice(body);
}

pub fn do_abc_tag(flags: u32, name: &str, abc: &[u8]) -> (u16, Vec<u8>) {
    let mut body = flags.to_le_bytes().to_vec();
    body.extend_from_slice(name.as_bytes());
    body.push(0);
    body.extend_from_slice(abc);
    (82, body)
}

/// A movie holding `tags`, terminated by an end tag.
pub fn swf(compressed: bool, tags: &[(u16, Vec<u8>)]) -> Vec<u8> {
    // 550 x 400 pixels, 24 fps, one frame
    let mut body = vec![0x78, 0x00, 0x05, 0x5f, 0x00, 0x00, 0x0f, 0xa0, 0x00];
    body.extend_from_slice(&(24u16 << 8).to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes());
    for (code, content) in tags {
        tag(&mut body, *code, content);
    }
    tag(&mut body, 0, &[]);

    let mut out = if compressed { b"CWS".to_vec() } else { b"FWS".to_vec() };
    out.push(10);
    out.extend_from_slice(&(8 + body.len() as u32).to_le_bytes());
    if compressed {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body).unwrap();
        out.extend(encoder.finish().unwrap());
    } else {
        out.extend(body);
    }
    out
}

/// Callback events in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Stat(String),
    Error(String),
    Script(String),
    Metadata(String, Vec<(Option<String>, String)>),
    Class { name: String, base: Option<String>, interfaces: Vec<String>, depth: usize },
    EndClass(String),
    Variable { name: String, type_text: String, is_static: bool },
    Value(String),
    Function { name: String, namespace: String, is_static: bool, return_type: String },
    Parameter { name: Option<String>, type_text: String, default: Option<String>, rest: bool },
    Instruction(String, Option<String>),
    EndFunction(String),
    Anonymous(String),
}

#[derive(Debug, Default)]
pub struct RecordingProcessor {
    pub events: Vec<Event>,
    pub disassemble: bool,
    /// Answer every type reference with the bare name.
    pub bare_types: bool,
}

impl RecordingProcessor {
    pub fn disassembling() -> Self {
        Self {
            disassemble: true,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Stat(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Error(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Instruction text with its label, if any.
    pub fn instructions(&self) -> Vec<(String, Option<String>)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Instruction(text, label) => Some((text.clone(), label.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Processor for RecordingProcessor {
    fn dump_stat(&mut self, stat: &str) {
        self.events.push(Event::Stat(stat.to_string()));
    }

    fn has_error(&mut self, error: &str) {
        self.events.push(Event::Error(error.to_string()));
    }

    fn begin_script_traits(&mut self, _abc: &Abc, script: &Traits) {
        self.events.push(Event::Script(script.name().to_string()));
    }

    fn process_metadata(&mut self, metadata: &Metadata) {
        let entries = metadata
            .entries()
            .iter()
            .map(|(key, value)| (key.as_deref().map(str::to_string), value.to_string()))
            .collect();
        self.events.push(Event::Metadata(metadata.name().to_string(), entries));
    }

    fn process_class(&mut self, _abc: &Abc, class: &Traits, decl: &Declaration<'_>) {
        self.events.push(Event::Class {
            name: class.name().to_string(),
            base: decl.type_text.clone(),
            interfaces: decl.interfaces.clone(),
            depth: decl.depth,
        });
    }

    fn end_class(&mut self, _abc: &Abc, class: &Traits) {
        self.events.push(Event::EndClass(class.name().to_string()));
    }

    fn process_variable(&mut self, _abc: &Abc, slot: &SlotMember, decl: &Declaration<'_>) {
        self.events.push(Event::Variable {
            name: slot.info().name().name().to_string(),
            type_text: decl.type_text.clone().unwrap_or_default(),
            is_static: decl.is_static,
        });
    }

    fn process_value(&mut self, _type_name: &Multiname, value: &Const) {
        self.events.push(Event::Value(value.to_string()));
    }

    fn process_function(&mut self, _abc: &Abc, function: &FunctionMember, decl: &Declaration<'_>) -> bool {
        self.events.push(Event::Function {
            name: function.info().name().name().to_string(),
            namespace: decl.namespace.to_string(),
            is_static: decl.is_static,
            return_type: decl.type_text.clone().unwrap_or_default(),
        });
        self.disassemble
    }

    fn process_parameter(&mut self, parameter: &Parameter<'_>, type_text: &str, _owner: &Multiname) {
        self.events.push(Event::Parameter {
            name: parameter.name.map(str::to_string),
            type_text: type_text.to_string(),
            default: parameter.default.map(ToString::to_string),
            rest: parameter.rest,
        });
    }

    fn process_instruction(&mut self, instruction: &Instruction) {
        self.events.push(Event::Instruction(
            instruction.to_string(),
            instruction.label.map(|label| label.to_string()),
        ));
    }

    fn end_function(&mut self, _abc: &Abc, function: &FunctionMember) {
        self.events
            .push(Event::EndFunction(function.info().name().name().to_string()));
    }

    fn process_anonymous_function(&mut self, abc: &Abc, method: MethodId) -> bool {
        self.events
            .push(Event::Anonymous(abc.method(method).debug_name().to_string()));
        self.disassemble
    }

    fn dump_type_reference(&mut self, _name: &Multiname, _context: TypeContext) -> bool {
        !self.bare_types
    }
}
