use std::env;
use std::fs;

use anyhow::{Context, Result, bail};
use avm2::abc::{Abc, Const, FunctionMember, Metadata, MethodId, Multiname, Parameter, SlotMember, Traits};
use avm2::bytecode::Instruction;
use avm2::processor::{Declaration, Processor};
use avm2::Swf;
use tracing_subscriber::EnvFilter;

/// Prints headers, values and disassembly as indented text.
#[derive(Default)]
struct TextRenderer {
    indent: usize,
}

impl TextRenderer {
    fn line(&self, text: &str) {
        println!("{:width$}{text}", "", width = self.indent * 2);
    }

    fn modifiers(decl: &Declaration<'_>) -> String {
        if decl.is_static {
            format!("{} static", decl.namespace)
        } else {
            decl.namespace.to_string()
        }
    }
}

impl Processor for TextRenderer {
    fn dump_stat(&mut self, stat: &str) {
        println!("// {stat}");
    }

    fn has_error(&mut self, error: &str) {
        println!("// ERROR {error}");
    }

    fn begin_script_traits(&mut self, _abc: &Abc, script: &Traits) {
        self.indent = 0;
        self.line(&format!("// {}", script.name()));
    }

    fn process_metadata(&mut self, metadata: &Metadata) {
        let entries: Vec<String> = metadata
            .entries()
            .iter()
            .map(|(key, value)| match key {
                Some(key) => format!("{key}=\"{value}\""),
                None => format!("\"{value}\""),
            })
            .collect();
        self.line(&format!("[{}({})]", metadata.name(), entries.join(", ")));
    }

    fn process_class(&mut self, _abc: &Abc, class: &Traits, decl: &Declaration<'_>) {
        self.indent = decl.depth;
        let keyword = if class.is_interface() { "interface" } else { "class" };
        let mut header = format!("{} {keyword} {}", Self::modifiers(decl), class.name().name());
        if let Some(base) = &decl.type_text {
            header.push_str(&format!(" extends {base}"));
        }
        if !decl.interfaces.is_empty() {
            header.push_str(&format!(" implements {}", decl.interfaces.join(", ")));
        }
        self.line(&header);
        self.line("{");
    }

    fn end_class(&mut self, _abc: &Abc, _class: &Traits) {
        self.line("}");
    }

    fn process_variable(&mut self, _abc: &Abc, slot: &SlotMember, decl: &Declaration<'_>) {
        self.indent = decl.depth;
        let type_text = decl.type_text.as_deref().unwrap_or("*");
        self.line(&format!(
            "{} {} {}:{type_text}",
            Self::modifiers(decl),
            slot.info().kind().keyword(),
            slot.info().name().name()
        ));
    }

    fn process_value(&mut self, _type_name: &Multiname, value: &Const) {
        self.line(&format!("  = {value}"));
    }

    fn process_function(&mut self, abc: &Abc, function: &FunctionMember, decl: &Declaration<'_>) -> bool {
        self.indent = decl.depth;
        let method = abc.method(function.method());
        let type_text = decl.type_text.as_deref().unwrap_or("*");
        self.line(&format!(
            "{} {} {}():{type_text}\t// {} {}",
            Self::modifiers(decl),
            function.info().kind().keyword(),
            function.info().name().name(),
            method.debug_name(),
            function.method()
        ));
        true
    }

    fn process_parameter(&mut self, parameter: &Parameter<'_>, type_text: &str, _owner: &Multiname) {
        let name = parameter
            .name
            .map(str::to_string)
            .unwrap_or_else(|| format!("arg{}", parameter.index));
        let mut text = if parameter.rest {
            format!("  ...{name}")
        } else {
            format!("  {name}:{type_text}")
        };
        if let Some(default) = parameter.default {
            text.push_str(&format!(" = {default}"));
        }
        self.line(&text);
    }

    fn process_instruction(&mut self, instruction: &Instruction) {
        if let Some(label) = instruction.label {
            self.line(&format!("{label}:"));
        }
        self.line(&format!("    {instruction}"));
    }

    fn end_function(&mut self, _abc: &Abc, _function: &FunctionMember) {
        self.line("");
    }

    fn process_anonymous_function(&mut self, abc: &Abc, method: MethodId) -> bool {
        self.indent = 0;
        self.line(&format!("function {}\t// {method}", abc.method(method).debug_name()));
        true
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(path) = env::args().nth(1) else {
        bail!("usage: abcdump <file.swf|file.abc>");
    };
    let data = fs::read(&path).with_context(|| format!("reading {path}"))?;

    let mut renderer = TextRenderer::default();
    if Swf::sniff(&data) {
        let swf = Swf::parse(&data, &mut renderer).with_context(|| format!("decoding {path}"))?;
        for tag in swf.abcs() {
            if let Some(name) = &tag.name {
                println!("// abc {name}");
            }
            tag.abc.dump(&mut renderer)?;
        }
    } else {
        let abc = Abc::parse(&data, &mut renderer).with_context(|| format!("decoding {path}"))?;
        abc.dump(&mut renderer)?;
    }
    Ok(())
}
