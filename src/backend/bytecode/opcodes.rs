//! Bytecode opcodes for specialized functions
//!
//! Opcodes are grouped by category in contiguous ranges. Immediates follow
//! the opcode byte and are big-endian.
//!
//! Loops keep their iterators on a stack separate from the value stack, so
//! the value stack is empty between statements even inside a loop body.

use std::fmt;

/// Bytecode opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // === Stack Operations (0x00-0x0F) ===
    /// Discard top of stack
    Pop = 0x01,

    // === Value Creation (0x10-0x2F) ===
    /// Push the no-value sentinel
    PushNone = 0x10,
    /// Push small integer (-128 to 127), value is next byte
    PushIntSmall = 0x14,
    /// Push constant from pool, index is next 2 bytes
    PushConstant = 0x19,

    // === Variable Operations (0x30-0x3F) ===
    /// Load LOCAL slot of the current frame, index is next 2 bytes
    LoadLocal = 0x30,
    /// Store top of stack to a LOCAL slot, index is next 2 bytes
    StoreLocal = 0x31,
    /// Load GLOBAL slot of the executing Callable, index is next 2 bytes
    LoadGlobal = 0x38,
    /// Store top of stack to a GLOBAL slot, index is next 2 bytes
    StoreGlobal = 0x39,
    /// Look up a UNIVERSAL name, name pool index is next 2 bytes
    LoadUniversal = 0x3A,

    // === Control Flow (0x40-0x4F) ===
    /// Unconditional jump, signed 2-byte offset from the next instruction
    Jump = 0x40,
    /// Call callee below N positional arguments, N is next byte
    Call = 0x48,
    /// Return top of stack
    Return = 0x4F,

    // === Iteration (0x50-0x57) ===
    /// Pop a collection and push its iterator on the iterator stack
    GetIter = 0x50,
    /// Push next element of the top iterator, or pop the iterator and jump
    /// by the signed 2-byte offset when exhausted
    ForIter = 0x51,

    // === Functions (0x58-0x5F) ===
    /// Materialize a closure, function table index is next 2 bytes
    MakeFunction = 0x58,

    // === Arithmetic (0x60-0x6F) ===
    /// Pop b, pop a, push a + b
    Add = 0x60,
}

impl Opcode {
    /// Convert byte to opcode, returns None if invalid
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE.get(byte as usize).copied().flatten()
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of immediate bytes following this opcode
    #[inline]
    pub fn immediate_size(self) -> usize {
        match self {
            Self::Pop | Self::PushNone | Self::GetIter | Self::Add | Self::Return => 0,

            Self::PushIntSmall | Self::Call => 1,

            Self::PushConstant
            | Self::LoadLocal
            | Self::StoreLocal
            | Self::LoadGlobal
            | Self::StoreGlobal
            | Self::LoadUniversal
            | Self::MakeFunction
            | Self::Jump
            | Self::ForIter => 2,
        }
    }

    /// Encoded length including the opcode byte
    #[inline]
    pub fn size(self) -> usize {
        1 + self.immediate_size()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Pop => "pop",
            Self::PushNone => "push_none",
            Self::PushIntSmall => "push_int_small",
            Self::PushConstant => "push_constant",
            Self::LoadLocal => "load_local",
            Self::StoreLocal => "store_local",
            Self::LoadGlobal => "load_global",
            Self::StoreGlobal => "store_global",
            Self::LoadUniversal => "load_universal",
            Self::Jump => "jump",
            Self::Call => "call",
            Self::Return => "return",
            Self::GetIter => "get_iter",
            Self::ForIter => "for_iter",
            Self::MakeFunction => "make_function",
            Self::Add => "add",
        }
    }

    /// Carries a signed jump offset
    #[inline]
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jump | Self::ForIter)
    }

    /// Never falls through to the next instruction
    #[inline]
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Return | Self::Jump)
    }

    /// Value stack effect as (pops, pushes) for the fall-through path.
    /// `operand` is the decoded immediate; only `Call` depends on it.
    pub fn stack_effect(self, operand: usize) -> (usize, usize) {
        match self {
            Self::Pop | Self::StoreLocal | Self::StoreGlobal | Self::GetIter => (1, 0),
            Self::PushNone
            | Self::PushIntSmall
            | Self::PushConstant
            | Self::LoadLocal
            | Self::LoadGlobal
            | Self::LoadUniversal
            | Self::MakeFunction
            | Self::ForIter => (0, 1),
            Self::Jump => (0, 0),
            Self::Call => (operand + 1, 1),
            Self::Return => (1, 0),
            Self::Add => (2, 1),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Lookup table for byte -> Opcode conversion
static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];

    table[0x01] = Some(Opcode::Pop);

    table[0x10] = Some(Opcode::PushNone);
    table[0x14] = Some(Opcode::PushIntSmall);
    table[0x19] = Some(Opcode::PushConstant);

    table[0x30] = Some(Opcode::LoadLocal);
    table[0x31] = Some(Opcode::StoreLocal);
    table[0x38] = Some(Opcode::LoadGlobal);
    table[0x39] = Some(Opcode::StoreGlobal);
    table[0x3A] = Some(Opcode::LoadUniversal);

    table[0x40] = Some(Opcode::Jump);
    table[0x48] = Some(Opcode::Call);
    table[0x4F] = Some(Opcode::Return);

    table[0x50] = Some(Opcode::GetIter);
    table[0x51] = Some(Opcode::ForIter);

    table[0x58] = Some(Opcode::MakeFunction);

    table[0x60] = Some(Opcode::Add);

    table
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 16] = [
        Opcode::Pop,
        Opcode::PushNone,
        Opcode::PushIntSmall,
        Opcode::PushConstant,
        Opcode::LoadLocal,
        Opcode::StoreLocal,
        Opcode::LoadGlobal,
        Opcode::StoreGlobal,
        Opcode::LoadUniversal,
        Opcode::Jump,
        Opcode::Call,
        Opcode::Return,
        Opcode::GetIter,
        Opcode::ForIter,
        Opcode::MakeFunction,
        Opcode::Add,
    ];

    #[test]
    fn test_table_covers_every_opcode() {
        for op in ALL {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op), "{}", op);
        }
        let defined = (0..=255u8).filter_map(Opcode::from_byte).count();
        assert_eq!(defined, ALL.len());
    }

    #[test]
    fn test_invalid_opcode() {
        assert!(Opcode::from_byte(0x00).is_none());
        assert!(Opcode::from_byte(0xFF).is_none());
    }

    #[test]
    fn test_immediate_sizes() {
        assert_eq!(Opcode::Add.immediate_size(), 0);
        assert_eq!(Opcode::PushIntSmall.immediate_size(), 1);
        assert_eq!(Opcode::Call.size(), 2);
        assert_eq!(Opcode::ForIter.size(), 3);
    }

    #[test]
    fn test_categories() {
        assert!(Opcode::ForIter.is_jump());
        assert!(!Opcode::Call.is_jump());
        assert!(Opcode::Return.is_terminator());
        assert!(!Opcode::ForIter.is_terminator());
        assert_eq!(Opcode::Call.stack_effect(2), (3, 1));
    }

    #[test]
    fn test_mnemonic() {
        assert_eq!(Opcode::LoadUniversal.mnemonic(), "load_universal");
        assert_eq!(Opcode::PushIntSmall.to_string(), "push_int_small");
    }
}
