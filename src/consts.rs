// accepted abc version words, major << 16 | minor
pub const ABC_VERSIONS: [u32; 3] = [46 << 16 | 14, 46 << 16 | 15, 46 << 16 | 16];

pub const CONSTANT_UNDEFINED: u8 = 0x00;
pub const CONSTANT_UTF8: u8 = 0x01;
pub const CONSTANT_INT: u8 = 0x03;
pub const CONSTANT_UINT: u8 = 0x04;
pub const CONSTANT_PRIVATE_NS: u8 = 0x05;
pub const CONSTANT_DOUBLE: u8 = 0x06;
pub const CONSTANT_QNAME: u8 = 0x07;
pub const CONSTANT_NAMESPACE: u8 = 0x08;
pub const CONSTANT_MULTINAME: u8 = 0x09;
pub const CONSTANT_FALSE: u8 = 0x0A;
pub const CONSTANT_TRUE: u8 = 0x0B;
pub const CONSTANT_NULL: u8 = 0x0C;
pub const CONSTANT_QNAME_A: u8 = 0x0D;
pub const CONSTANT_MULTINAME_A: u8 = 0x0E;
pub const CONSTANT_RTQNAME: u8 = 0x0F;
pub const CONSTANT_RTQNAME_A: u8 = 0x10;
pub const CONSTANT_RTQNAME_L: u8 = 0x11;
pub const CONSTANT_RTQNAME_LA: u8 = 0x12;
pub const CONSTANT_NAME_L: u8 = 0x13;
pub const CONSTANT_NAME_LA: u8 = 0x14;
pub const CONSTANT_NAMESPACE_SET: u8 = 0x15;
pub const CONSTANT_PACKAGE_NS: u8 = 0x16;
pub const CONSTANT_PACKAGE_INTERNAL_NS: u8 = 0x17;
pub const CONSTANT_PROTECTED_NS: u8 = 0x18;
pub const CONSTANT_EXPLICIT_NS: u8 = 0x19;
pub const CONSTANT_STATIC_PROTECTED_NS: u8 = 0x1A;
pub const CONSTANT_MULTINAME_L: u8 = 0x1B;
pub const CONSTANT_MULTINAME_LA: u8 = 0x1C;
pub const CONSTANT_TYPE_NAME: u8 = 0x1D;

pub const TRAIT_SLOT: u8 = 0;
pub const TRAIT_METHOD: u8 = 1;
pub const TRAIT_GETTER: u8 = 2;
pub const TRAIT_SETTER: u8 = 3;
pub const TRAIT_CLASS: u8 = 4;
pub const TRAIT_FUNCTION: u8 = 5;
pub const TRAIT_CONST: u8 = 6;

pub const SWF_TAG_END: u16 = 0;
pub const SWF_TAG_DO_ABC_DEFINE: u16 = 72;
pub const SWF_TAG_DO_ABC: u16 = 82;

bitflags::bitflags! {
    /// High nibble of a trait tag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraitAttributes: u8 {
        const FINAL = 0x01;
        const OVERRIDE = 0x02;
        const METADATA = 0x04;
        const PUBLIC = 0x08;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        const NEED_ARGUMENTS = 0x01;
        const NEED_ACTIVATION = 0x02;
        const NEED_REST = 0x04;
        const HAS_OPTIONAL = 0x08;
        const IGNORE_REST = 0x10;
        const NATIVE = 0x20;
        const SET_DXNS = 0x40;
        const HAS_PARAM_NAMES = 0x80;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClassFlags: u8 {
        const SEALED = 0x01;
        const FINAL = 0x02;
        const INTERFACE = 0x04;
        const PROTECTED_NS = 0x08;
    }
}
