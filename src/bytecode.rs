use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

pub use opcodes::*;

use crate::abc::{Abc, MethodId, Multiname, Namespace};
use crate::error::{Error, Result};
use crate::reader::ByteReader;

mod opcodes;

/// Synthesized jump target name, `L1`, `L2`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Offsets of one body mapped to labels in first-seen order.
#[derive(Debug, Default)]
pub struct LabelTable {
    labels: HashMap<i64, Label>,
}

impl LabelTable {
    pub fn get(&self, offset: i64) -> Option<Label> {
        self.labels.get(&offset).copied()
    }

    pub fn label_for(&mut self, offset: i64) -> Label {
        let next = Label(self.labels.len() as u32 + 1);
        *self.labels.entry(offset).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Bytes attributed to each opcode across every body of one dump.
#[derive(Debug, Clone)]
pub struct DecoderState {
    sizes: [usize; 256],
    total: usize,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            sizes: [0; 256],
            total: 0,
        }
    }
}

impl DecoderState {
    pub fn record(&mut self, opcode: u8, size: usize) {
        self.sizes[opcode as usize] += size;
        self.total += size;
    }

    pub fn size_of(&self, opcode: u8) -> usize {
        self.sizes[opcode as usize]
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Non-empty buckets, largest first; ties keep opcode order.
    pub fn by_size(&self) -> Vec<(u8, usize)> {
        let mut sizes: Vec<_> = (0..=u8::MAX)
            .map(|opcode| (opcode, self.sizes[opcode as usize]))
            .filter(|&(_, size)| size > 0)
            .collect();
        sizes.sort_by(|a, b| b.1.cmp(&a.1));
        sizes
    }

    /// The opcode size table: a header line, then one line per opcode with
    /// the mnemonic padded to the listing's column.
    pub fn report(&self) -> Vec<String> {
        let mut lines = vec![format!("OPCODE\tSIZE\t% OF {}", self.total)];
        for (opcode, size) in self.by_size() {
            lines.push(format!(
                "{:<14}\t{size}\t{}%",
                mnemonic(opcode),
                100 * size / self.total.max(1)
            ));
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Namespace(Namespace),
    String(Arc<str>),
    Int(i32),
    UInt(u32),
    Double(f64),
    /// `None` for names supplied entirely at runtime.
    Name(Option<Multiname>),
    NameArgs(Option<Multiname>, u32),
    Method(MethodId, Arc<str>),
    MethodArgs(MethodId, Arc<str>, u32),
    Class(Multiname),
    Uint(u32),
    Byte(i8),
    Short(i16),
    Branch(Label),
    Switch { default: Label, cases: Vec<Label> },
    Debug {
        kind: u8,
        name: Arc<str>,
        register: u8,
        extra: u32,
    },
    Pair(u32, u32),
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &Option<Multiname>) -> fmt::Result {
    match name {
        Some(name) => write!(f, "{name}"),
        None => f.write_str("[runtime]"),
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Namespace(ns) => write!(f, "{ns}"),
            Operand::String(s) => write!(f, "\"{s}\""),
            Operand::Int(v) => write!(f, "{v}\t// {v:#x}"),
            Operand::UInt(v) => write!(f, "{v}\t// {v:#x}"),
            Operand::Double(v) => write!(f, "{v}"),
            Operand::Name(name) => write_name(f, name),
            Operand::NameArgs(name, argc) => {
                write_name(f, name)?;
                write!(f, " ({argc})")
            }
            Operand::Method(id, name) => write!(f, "{name} {id}"),
            Operand::MethodArgs(id, name, argc) => write!(f, "{name} {id} ({argc})"),
            Operand::Class(name) => write!(f, "{name}"),
            Operand::Uint(v) => write!(f, "{v}"),
            Operand::Byte(v) => write!(f, "{v}"),
            Operand::Short(v) => write!(f, "{v}"),
            Operand::Branch(label) => write!(f, "{label}"),
            Operand::Switch { default, cases } => {
                write!(f, "default:{default} maxcase:{}", cases.len().saturating_sub(1))?;
                for case in cases {
                    write!(f, " {case}")?;
                }
                Ok(())
            }
            Operand::Debug {
                kind,
                name,
                register,
                extra,
            } => write!(f, "{kind} {name} {register} {extra}"),
            Operand::Pair(a, b) => write!(f, "{a} {b}"),
        }
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: u8,
    /// Present when the instruction starts at a jump target.
    pub label: Option<Label>,
    pub operand: Option<Operand>,
}

impl Instruction {
    pub fn mnemonic(&self) -> std::borrow::Cow<'static, str> {
        mnemonic(self.opcode)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{:<5} {:<14} {operand}", self.offset, self.mnemonic()),
            None => write!(f, "{:<5} {}", self.offset, self.mnemonic()),
        }
    }
}

/// Decodes one function body an instruction at a time.
pub struct InstructionDecoder<'a> {
    abc: &'a Abc,
    reader: ByteReader<'a>,
    labels: LabelTable,
}

impl<'a> InstructionDecoder<'a> {
    pub fn new(abc: &'a Abc, code: &'a [u8]) -> Self {
        Self {
            abc,
            reader: ByteReader::new(code),
            labels: LabelTable::default(),
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Decodes the next instruction, or `None` at the end of the body.
    pub fn next_instruction(&mut self, state: &mut DecoderState) -> Result<Option<Instruction>> {
        if self.reader.is_at_end() {
            return Ok(None);
        }
        let offset = self.reader.position();
        let opcode = self.reader.read_u8()?;
        let label = if opcode == OP_LABEL || self.labels.get(offset as i64).is_some() {
            Some(self.labels.label_for(offset as i64))
        } else {
            None
        };

        let operand = match opcode_info(opcode) {
            Some((_, form)) => self.operand(form, offset)?,
            None => None,
        };
        state.record(opcode, self.reader.position() - offset);

        Ok(Some(Instruction {
            offset,
            opcode,
            label,
            operand,
        }))
    }

    fn u30(&mut self) -> Result<u32> {
        self.reader.read_var_u32()
    }

    fn name(&mut self) -> Result<Option<Multiname>> {
        let index = self.u30()?;
        Ok(self.abc.pool().name(index)?.cloned())
    }

    fn method(&mut self) -> Result<(MethodId, Arc<str>)> {
        let index = self.u30()?;
        let id = MethodId(index as usize);
        let method = self.abc.methods().get(id.0).ok_or(Error::BadIndex {
            table: "method",
            index,
        })?;
        Ok((id, Arc::clone(&method.debug_name)))
    }

    fn branch(&mut self, base: i64, relative: i32) -> Label {
        self.labels.label_for(base + relative as i64)
    }

    fn operand(&mut self, form: OperandForm, offset: usize) -> Result<Option<Operand>> {
        let abc = self.abc;
        let pool = abc.pool();
        let operand = match form {
            OperandForm::None => return Ok(None),
            OperandForm::Namespace => Operand::Namespace(pool.namespace(self.u30()?)?.clone()),
            OperandForm::String => Operand::String(Arc::clone(pool.string(self.u30()?)?)),
            OperandForm::Int => Operand::Int(pool.int(self.u30()?)?),
            OperandForm::UInt => Operand::UInt(pool.uint(self.u30()?)?),
            OperandForm::Double => Operand::Double(pool.double(self.u30()?)?),
            OperandForm::Name => Operand::Name(self.name()?),
            OperandForm::NameArgs => {
                let name = self.name()?;
                Operand::NameArgs(name, self.u30()?)
            }
            OperandForm::Method => {
                let (id, name) = self.method()?;
                Operand::Method(id, name)
            }
            OperandForm::MethodArgs => {
                let (id, name) = self.method()?;
                Operand::MethodArgs(id, name, self.u30()?)
            }
            OperandForm::Class => {
                let index = self.u30()?;
                let id = abc.instance(index as usize).ok_or(Error::BadIndex {
                    table: "class",
                    index,
                })?;
                Operand::Class(abc.traits(id).name().clone())
            }
            OperandForm::Uint => Operand::Uint(self.u30()?),
            OperandForm::Byte => Operand::Byte(self.reader.read_s8()?),
            OperandForm::Short => Operand::Short(self.u30()? as i16),
            OperandForm::Branch => {
                let relative = self.reader.read_s24()?;
                let base = self.reader.position() as i64;
                Operand::Branch(self.branch(base, relative))
            }
            OperandForm::Switch => {
                let base = offset as i64;
                let default = self.reader.read_s24()?;
                let default = self.branch(base, default);
                let max_case = self.u30()?;
                let mut cases = Vec::new();
                for _ in 0..=max_case {
                    let relative = self.reader.read_s24()?;
                    cases.push(self.branch(base, relative));
                }
                Operand::Switch { default, cases }
            }
            OperandForm::Debug => {
                let kind = self.reader.read_u8()?;
                let name = Arc::clone(pool.string(self.u30()?)?);
                let register = self.reader.read_u8()?;
                let extra = self.u30()?;
                Operand::Debug {
                    kind,
                    name,
                    register,
                    extra,
                }
            }
            OperandForm::Pair => {
                let first = self.u30()?;
                Operand::Pair(first, self.u30()?)
            }
        };
        Ok(Some(operand))
    }
}

/// Decodes a whole body into instructions.
pub fn decode_body(abc: &Abc, code: &[u8], state: &mut DecoderState) -> Result<Vec<Instruction>> {
    let mut decoder = InstructionDecoder::new(abc, code);
    let mut instructions = Vec::new();
    while let Some(instruction) = decoder.next_instruction(state)? {
        instructions.push(instruction);
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table_first_seen_order() {
        let mut labels = LabelTable::default();
        assert_eq!(labels.label_for(40), Label(1));
        assert_eq!(labels.label_for(8), Label(2));
        assert_eq!(labels.label_for(40), Label(1));
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get(8).map(|l| l.to_string()), Some("L2".to_string()));
    }

    #[test]
    fn test_state_report_orders_by_size() {
        let mut state = DecoderState::default();
        state.record(OP_PUSHBYTE, 2);
        state.record(OP_PUSHBYTE, 2);
        state.record(OP_JUMP, 4);
        state.record(OP_RETURNVOID, 1);
        state.record(OP_NOP, 1);
        assert_eq!(state.total(), 10);
        assert_eq!(state.size_of(OP_PUSHBYTE), 4);
        assert_eq!(
            state.report(),
            vec![
                "OPCODE\tSIZE\t% OF 10".to_string(),
                "jump          \t4\t40%".to_string(),
                "pushbyte      \t4\t40%".to_string(),
                "nop           \t1\t10%".to_string(),
                "returnvoid    \t1\t10%".to_string(),
            ]
        );
    }

    #[test]
    fn test_operand_display() {
        assert_eq!(Operand::Int(-1).to_string(), "-1\t// 0xffffffff");
        assert_eq!(Operand::String(Arc::from("hi")).to_string(), "\"hi\"");
        assert_eq!(Operand::Name(None).to_string(), "[runtime]");
        assert_eq!(
            Operand::Switch {
                default: Label(1),
                cases: vec![Label(2), Label(3)],
            }
            .to_string(),
            "default:L1 maxcase:1 L2 L3"
        );
    }
}
