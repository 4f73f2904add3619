use crate::code_attribute::{Insn, LocalVariable, TryCatchBlock};

/// A method with its code in tree form.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodNode {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub desc: String,
    pub instructions: Vec<Insn>,
    pub max_stack: u16,
    pub max_locals: u16,
    pub local_variables: Vec<LocalVariable>,
    pub try_catch_blocks: Vec<TryCatchBlock>,
}

impl MethodNode {
    /// A method without code.
    pub fn new(access_flags: MethodAccessFlags, name: impl Into<String>, desc: impl Into<String>) -> Self {
        MethodNode {
            access_flags,
            name: name.into(),
            desc: desc.into(),
            instructions: Vec::new(),
            max_stack: 0,
            max_locals: 0,
            local_variables: Vec::new(),
            try_catch_blocks: Vec::new(),
        }
    }

    pub fn with_code(mut self, instructions: Vec<Insn>, max_stack: u16, max_locals: u16) -> Self {
        self.instructions = instructions;
        self.max_stack = max_stack;
        self.max_locals = max_locals;
        self
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Abstract and native methods carry no code to rewrite.
    pub fn has_code(&self) -> bool {
        !self
            .access_flags
            .intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct MethodAccessFlags(u16);

bitflags! {
    impl MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;       //	Declared public; may be accessed from outside its package.
        const PRIVATE = 0x0002;      //	Declared private; accessible only within the defining class.
        const PROTECTED = 0x0004;    //	Declared protected; may be accessed within subclasses.
        const STATIC = 0x0008;       //	Declared static.
        const FINAL = 0x0010;        //	Declared final; must not be overridden.
        const SYNCHRONIZED = 0x0020; //	Declared synchronized; invocation is wrapped by a monitor use.
        const BRIDGE = 0x0040;       //	A bridge method, generated by the compiler.
        const VARARGS = 0x0080;      //	Declared with variable number of arguments.
        const NATIVE = 0x0100;       //	Declared native; implemented in a language other than Java.
        const ABSTRACT = 0x0400;     //	Declared abstract; no implementation is provided.
        const STRICT = 0x0800;       //	Declared strictfp; floating-point mode is FP-strict.
        const SYNTHETIC = 0x1000;    //	Declared synthetic; not present in the source code.
    }
}
