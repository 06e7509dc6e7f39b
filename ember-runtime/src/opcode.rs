//! The bytecode instruction set (spec §4.H "Per-node lowering", §4.I
//! "Instruction set"), shared between `ember-compiler`'s codegen and
//! `ember-vm`'s interpreter so the two can never disagree about encoding.
//!
//! Every opcode is one byte. Instructions that take an operand carry an
//! inline little-endian integer immediately after the opcode byte: a
//! constant-pool index, a signed relative jump offset, or an argument
//! count (spec §4.I "Instruction encoding").

/// How many operand bytes follow an opcode, and how to interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No inline operand.
    None,
    /// `u32` constant-pool index.
    ConstIdx,
    /// `i32` byte offset, relative to the instruction *after* this one.
    RelJump,
    /// `u32` absolute byte offset (handler landing pad).
    AbsJump,
    /// `u32` count (of stack items / arguments).
    Count,
}

macro_rules! opcodes {
    ($($name:ident = $val:expr => $operand:expr),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $val),+
        }

        impl Opcode {
            pub fn operand(self) -> Operand {
                match self {
                    $(Opcode::$name => $operand),+
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;
            fn try_from(byte: u8) -> Result<Self, u8> {
                match byte {
                    $($val => Ok(Opcode::$name),)+
                    other => Err(other),
                }
            }
        }
    };
}

opcodes! {
    NOOP = 0 => Operand::None,
    POPU = 1 => Operand::None,
    DUP = 2 => Operand::None,

    CONST = 3 => Operand::ConstIdx,
    CONST_TRUE = 4 => Operand::None,
    CONST_FALSE = 5 => Operand::None,
    CONST_NONE = 6 => Operand::None,

    LOAD = 7 => Operand::ConstIdx,
    LOAD_A = 8 => Operand::ConstIdx,
    STORE = 9 => Operand::ConstIdx,
    STORE_A = 10 => Operand::ConstIdx,

    GETITEM = 11 => Operand::Count,
    SETITEM = 12 => Operand::Count,
    CALL = 13 => Operand::Count,
    TUPLE = 14 => Operand::Count,
    LIST = 15 => Operand::Count,
    /// Pop `n` values as alternating key, value, ... pairs (n always even);
    /// build a dict, push it (supplemented: spec's own table has no dict
    /// literal, backing `{ k: v, ... }`, see `ember-compiler`'s `Expr::Dict`).
    DICT = 38 => Operand::Count,

    ADD = 16 => Operand::None,
    SUB = 17 => Operand::None,
    MUL = 18 => Operand::None,
    DIV = 19 => Operand::None,
    MOD = 20 => Operand::None,
    POW = 21 => Operand::None,
    LT = 22 => Operand::None,
    LE = 23 => Operand::None,
    GT = 24 => Operand::None,
    GE = 25 => Operand::None,
    EQ = 26 => Operand::None,
    NE = 27 => Operand::None,

    NEG = 28 => Operand::None,
    SQIG = 29 => Operand::None,

    JMP = 30 => Operand::RelJump,
    JMPT = 31 => Operand::RelJump,
    JMPF = 32 => Operand::RelJump,

    RET = 33 => Operand::None,
    RET_NONE = 34 => Operand::None,

    EXC_ADD = 35 => Operand::AbsJump,
    EXC_REM = 36 => Operand::None,

    /// Fused "call next() on TOS iterator, jump forward on StopIter"
    /// (SPEC_FULL supplement 4: backs the `for` statement without needing
    /// `try`/`catch`'s general machinery on every loop iteration).
    FOR_ITER = 37 => Operand::RelJump,
}

impl Opcode {
    /// Total instruction length in bytes, opcode byte included.
    pub fn encoded_len(self) -> usize {
        1 + match self.operand() {
            Operand::None => 0,
            Operand::ConstIdx | Operand::Count | Operand::AbsJump => 4,
            Operand::RelJump => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for op in [Opcode::NOOP, Opcode::CALL, Opcode::EXC_ADD, Opcode::FOR_ITER] {
            let byte = op as u8;
            assert_eq!(Opcode::try_from(byte), Ok(op));
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert!(Opcode::try_from(255).is_err());
    }
}
