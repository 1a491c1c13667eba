//! Decoder and disassembler for ActionScript byte code, raw or inside SWF.

pub mod abc;
pub mod bytecode;
pub mod consts;
pub mod error;
pub mod processor;
pub mod reader;
pub mod swf;

pub use abc::Abc;
pub use error::{Error, Result};
pub use processor::{NullProcessor, Processor};
pub use swf::Swf;
