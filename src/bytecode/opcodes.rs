/// How the bytes following an opcode are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    None,
    Namespace,
    String,
    Int,
    UInt,
    Double,
    Name,
    NameArgs,
    Method,
    MethodArgs,
    Class,
    /// Plain u30 immediate: register, slot, argument count, line.
    Uint,
    Byte,
    Short,
    Branch,
    Switch,
    Debug,
    Pair,
}

macro_rules! opcodes {
    ($($code:literal $name:ident $form:ident;)*) => {
        paste::paste! {
            $(pub const [<OP_ $name:upper>]: u8 = $code;)*
        }

        /// Mnemonic and operand form of an assigned opcode.
        pub fn opcode_info(opcode: u8) -> Option<(&'static str, OperandForm)> {
            match opcode {
                $($code => Some((stringify!($name), OperandForm::$form)),)*
                _ => None,
            }
        }
    };
}

opcodes! {
    0x01 bkpt None;
    0x02 nop None;
    0x03 throw None;
    0x04 getsuper Name;
    0x05 setsuper Name;
    0x06 dxns String;
    0x07 dxnslate None;
    0x08 kill Uint;
    0x09 label None;
    0x0C ifnlt Branch;
    0x0D ifnle Branch;
    0x0E ifngt Branch;
    0x0F ifnge Branch;
    0x10 jump Branch;
    0x11 iftrue Branch;
    0x12 iffalse Branch;
    0x13 ifeq Branch;
    0x14 ifne Branch;
    0x15 iflt Branch;
    0x16 ifle Branch;
    0x17 ifgt Branch;
    0x18 ifge Branch;
    0x19 ifstricteq Branch;
    0x1A ifstrictne Branch;
    0x1B lookupswitch Switch;
    0x1C pushwith None;
    0x1D popscope None;
    0x1E nextname None;
    0x1F hasnext None;
    0x20 pushnull None;
    0x21 pushundefined None;
    0x22 pushconstant String;
    0x23 nextvalue None;
    0x24 pushbyte Byte;
    0x25 pushshort Short;
    0x26 pushtrue None;
    0x27 pushfalse None;
    0x28 pushnan None;
    0x29 pop None;
    0x2A dup None;
    0x2B swap None;
    0x2C pushstring String;
    0x2D pushint Int;
    0x2E pushuint UInt;
    0x2F pushdouble Double;
    0x30 pushscope None;
    0x31 pushnamespace Namespace;
    0x32 hasnext2 Pair;
    0x35 li8 None;
    0x36 li16 None;
    0x37 li32 None;
    0x38 lf32 None;
    0x39 lf64 None;
    0x3A si8 None;
    0x3B si16 None;
    0x3C si32 None;
    0x3D sf32 None;
    0x3E sf64 None;
    0x40 newfunction Method;
    0x41 call Uint;
    0x42 construct Uint;
    0x43 callmethod Pair;
    0x44 callstatic MethodArgs;
    0x45 callsuper NameArgs;
    0x46 callproperty NameArgs;
    0x47 returnvoid None;
    0x48 returnvalue None;
    0x49 constructsuper Uint;
    0x4A constructprop NameArgs;
    0x4B callsuperid None;
    0x4C callproplex NameArgs;
    0x4D callinterface NameArgs;
    0x4E callsupervoid NameArgs;
    0x4F callpropvoid NameArgs;
    0x50 sxi1 None;
    0x51 sxi8 None;
    0x52 sxi16 None;
    0x53 applytype Uint;
    0x55 newobject Uint;
    0x56 newarray Uint;
    0x57 newactivation None;
    0x58 newclass Class;
    0x59 getdescendants Name;
    0x5A newcatch Uint;
    0x5D findpropstrict Name;
    0x5E findproperty Name;
    0x5F finddef Name;
    0x60 getlex Name;
    0x61 setproperty Name;
    0x62 getlocal Uint;
    0x63 setlocal Uint;
    0x64 getglobalscope None;
    0x65 getscopeobject Uint;
    0x66 getproperty Name;
    0x67 getouterscope Uint;
    0x68 initproperty Name;
    0x6A deleteproperty Name;
    0x6C getslot Uint;
    0x6D setslot Uint;
    0x6E getglobalslot Uint;
    0x6F setglobalslot Uint;
    0x70 convert_s None;
    0x71 esc_xelem None;
    0x72 esc_xattr None;
    0x73 convert_i None;
    0x74 convert_u None;
    0x75 convert_d None;
    0x76 convert_b None;
    0x77 convert_o None;
    0x78 checkfilter None;
    0x80 coerce Name;
    0x81 coerce_b None;
    0x82 coerce_a None;
    0x83 coerce_i None;
    0x84 coerce_d None;
    0x85 coerce_s None;
    0x86 astype Name;
    0x87 astypelate None;
    0x88 coerce_u None;
    0x89 coerce_o None;
    0x90 negate None;
    0x91 increment None;
    0x92 inclocal Uint;
    0x93 decrement None;
    0x94 declocal Uint;
    0x95 typeof None;
    0x96 not None;
    0x97 bitnot None;
    0x9A concat None;
    0x9B add_d None;
    0xA0 add None;
    0xA1 subtract None;
    0xA2 multiply None;
    0xA3 divide None;
    0xA4 modulo None;
    0xA5 lshift None;
    0xA6 rshift None;
    0xA7 urshift None;
    0xA8 bitand None;
    0xA9 bitor None;
    0xAA bitxor None;
    0xAB equals None;
    0xAC strictequals None;
    0xAD lessthan None;
    0xAE lessequals None;
    0xAF greaterthan None;
    0xB0 greaterequals None;
    0xB1 instanceof None;
    0xB2 istype Name;
    0xB3 istypelate None;
    0xB4 in None;
    0xC0 increment_i None;
    0xC1 decrement_i None;
    0xC2 inclocal_i Uint;
    0xC3 declocal_i Uint;
    0xC4 negate_i None;
    0xC5 add_i None;
    0xC6 subtract_i None;
    0xC7 multiply_i None;
    0xD0 getlocal0 None;
    0xD1 getlocal1 None;
    0xD2 getlocal2 None;
    0xD3 getlocal3 None;
    0xD4 setlocal0 None;
    0xD5 setlocal1 None;
    0xD6 setlocal2 None;
    0xD7 setlocal3 None;
    0xEF debug Debug;
    0xF0 debugline Uint;
    0xF1 debugfile String;
    0xF2 bkptline Uint;
    0xF3 timestamp None;
    0xF5 verifypass None;
    0xF6 alloc None;
    0xF7 mark None;
    0xF8 wb None;
    0xF9 prologue None;
    0xFA sendenter None;
    0xFB doubletoatom None;
    0xFC sweep None;
    0xFD codegenop None;
    0xFE verifyop None;
    0xFF decode None;
}

/// Mnemonic of any opcode byte, with a placeholder for unassigned values.
pub fn mnemonic(opcode: u8) -> std::borrow::Cow<'static, str> {
    match opcode_info(opcode) {
        Some((name, _)) => std::borrow::Cow::Borrowed(name),
        None => std::borrow::Cow::Owned(format!("OP_0x{opcode:02X}")),
    }
}
