//! Compiled unit representation
//!
//! A [`CompiledUnit`] is the lowering engine's output for one resolved
//! function: the bytecode plus the pools its immediates index into. It holds
//! no runtime state, so one unit is shared by every call of the function,
//! recursive and concurrent calls included.

use std::sync::Arc;

use super::opcodes::Opcode;
use crate::backend::error::{SpecializeError, SpecializeResult};
use crate::backend::models::Value;
use crate::backend::syntax::FunctionId;

/// A compiled function body
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// The bytecode instructions
    code: Vec<u8>,

    /// Literals boxed once at lowering time
    constants: Vec<Value>,

    /// UNIVERSAL names, looked up by `LoadUniversal`
    names: Vec<Arc<str>>,

    /// Nested definitions materialized by `MakeFunction`
    functions: Vec<FunctionId>,

    /// Identifier names per LOCAL slot, for error messages
    local_names: Vec<Option<Arc<str>>>,

    /// Identifier names per GLOBAL slot, for error messages
    global_names: Vec<Option<Arc<str>>>,

    /// Name of the source function
    name: Arc<str>,

    /// Identity of the source function
    function: FunctionId,

    /// Number of local slots the frame must provide
    local_count: u16,
}

/// Builder for constructing CompiledUnits
#[derive(Debug)]
pub struct UnitBuilder {
    code: Vec<u8>,
    constants: Vec<Value>,
    names: Vec<Arc<str>>,
    functions: Vec<FunctionId>,
    local_names: Vec<Option<Arc<str>>>,
    global_names: Vec<Option<Arc<str>>>,
    name: Arc<str>,
    function: FunctionId,
    local_count: u16,
}

impl CompiledUnit {
    pub fn builder(name: &str, function: FunctionId) -> UnitBuilder {
        UnitBuilder::new(name, function)
    }

    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    #[inline]
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    #[inline]
    pub fn read_opcode(&self, offset: usize) -> Option<Opcode> {
        self.code.get(offset).and_then(|&b| Opcode::from_byte(b))
    }

    /// Read a u16 from the bytecode (big-endian)
    #[inline]
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        if offset + 1 < self.code.len() {
            Some(u16::from_be_bytes([self.code[offset], self.code[offset + 1]]))
        } else {
            None
        }
    }

    #[inline]
    pub fn read_i16(&self, offset: usize) -> Option<i16> {
        self.read_u16(offset).map(|u| u as i16)
    }

    #[inline]
    pub fn read_i8(&self, offset: usize) -> Option<i8> {
        self.code.get(offset).map(|&b| b as i8)
    }

    #[inline]
    pub fn constant(&self, index: u16) -> Option<&Value> {
        self.constants.get(index as usize)
    }

    #[inline]
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    #[inline]
    pub fn universal_name(&self, index: u16) -> Option<&Arc<str>> {
        self.names.get(index as usize)
    }

    #[inline]
    pub fn universal_names(&self) -> &[Arc<str>] {
        &self.names
    }

    #[inline]
    pub fn function_id(&self, index: u16) -> Option<FunctionId> {
        self.functions.get(index as usize).copied()
    }

    #[inline]
    pub fn function_ids(&self) -> &[FunctionId] {
        &self.functions
    }

    /// Identifier name of a LOCAL slot
    pub fn local_name(&self, index: u16) -> &str {
        slot_name(&self.local_names, index)
    }

    /// Identifier name of a GLOBAL slot
    pub fn global_name(&self, index: u16) -> &str {
        slot_name(&self.global_names, index)
    }

    /// Name of the source function
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn function(&self) -> FunctionId {
        self.function
    }

    #[inline]
    pub fn local_count(&self) -> u16 {
        self.local_count
    }

    /// Disassemble the unit to a string
    pub fn disassemble(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("=== {} (#{}) ===\n", self.name, self.function));
        output.push_str(&format!(
            "locals: {}, constants: {}, names: {}, functions: {}\n",
            self.local_count,
            self.constants.len(),
            self.names.len(),
            self.functions.len()
        ));

        let mut offset = 0;
        while offset < self.code.len() {
            let (disasm, next_offset) = self.disassemble_instruction(offset);
            output.push_str(&format!("{:04x} {}\n", offset, disasm));
            offset = next_offset;
        }

        output
    }

    /// Disassemble a single instruction, returns (string, next_offset)
    pub fn disassemble_instruction(&self, offset: usize) -> (String, usize) {
        let Some(opcode) = self.read_opcode(offset) else {
            return (
                format!("??? (0x{:02x})", self.read_byte(offset).unwrap_or(0)),
                offset + 1,
            );
        };

        let operand_str = match opcode.immediate_size() {
            1 => {
                let byte = self.read_byte(offset + 1).unwrap_or(0);
                match opcode {
                    Opcode::PushIntSmall => format!(" {}", byte as i8),
                    _ => format!(" {}", byte),
                }
            }
            2 => {
                let value = self.read_u16(offset + 1).unwrap_or(0);
                match opcode {
                    Opcode::Jump | Opcode::ForIter => {
                        let target = offset as isize + 3 + (value as i16) as isize;
                        format!(" -> {:04x}", target)
                    }
                    Opcode::PushConstant => {
                        let const_str = self
                            .constant(value)
                            .map(Value::repr)
                            .unwrap_or_else(|| "???".to_string());
                        format!(" #{} ({})", value, const_str)
                    }
                    Opcode::LoadUniversal => {
                        let name = self.universal_name(value).map_or("???", |n| n.as_ref());
                        format!(" #{} ({})", value, name)
                    }
                    Opcode::LoadLocal | Opcode::StoreLocal => {
                        format!(" {} ({})", value, self.local_name(value))
                    }
                    Opcode::LoadGlobal | Opcode::StoreGlobal => {
                        format!(" {} ({})", value, self.global_name(value))
                    }
                    Opcode::MakeFunction => match self.function_id(value) {
                        Some(id) => format!(" #{} (fn #{})", value, id),
                        None => format!(" #{} (???)", value),
                    },
                    _ => format!(" {}", value),
                }
            }
            _ => String::new(),
        };

        (
            format!("{}{}", opcode.mnemonic(), operand_str),
            offset + opcode.size(),
        )
    }
}

fn slot_name(names: &[Option<Arc<str>>], index: u16) -> &str {
    names
        .get(index as usize)
        .and_then(|n| n.as_deref())
        .unwrap_or("?")
}

impl UnitBuilder {
    pub fn new(name: &str, function: FunctionId) -> Self {
        Self {
            code: Vec::with_capacity(64),
            constants: Vec::new(),
            names: Vec::new(),
            functions: Vec::new(),
            local_names: Vec::new(),
            global_names: Vec::new(),
            name: Arc::from(name),
            function,
            local_count: 0,
        }
    }

    pub fn set_local_count(&mut self, count: u16) {
        self.local_count = count;
    }

    #[inline]
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a single opcode
    pub fn emit(&mut self, opcode: Opcode) {
        self.code.push(opcode.to_byte());
    }

    /// Emit an opcode with a 1-byte operand
    pub fn emit_byte(&mut self, opcode: Opcode, operand: u8) {
        self.code.push(opcode.to_byte());
        self.code.push(operand);
    }

    /// Emit an opcode with a 2-byte operand (big-endian)
    pub fn emit_u16(&mut self, opcode: Opcode, operand: u16) {
        self.code.push(opcode.to_byte());
        self.code.extend_from_slice(&operand.to_be_bytes());
    }

    /// Emit raw bytes
    pub fn emit_raw(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Add a constant to the pool, returns its index
    pub fn add_constant(&mut self, value: Value) -> SpecializeResult<u16> {
        if let Some(i) = self.constants.iter().position(|existing| existing == &value) {
            return Ok(i as u16);
        }
        let index = pool_index(self.constants.len(), SpecializeError::TooManyConstants)?;
        self.constants.push(value);
        Ok(index)
    }

    /// Add a UNIVERSAL name to the name pool, returns its index
    pub fn add_name(&mut self, name: &Arc<str>) -> SpecializeResult<u16> {
        if let Some(i) = self.names.iter().position(|existing| existing == name) {
            return Ok(i as u16);
        }
        let index = pool_index(self.names.len(), SpecializeError::TooManyNames)?;
        self.names.push(Arc::clone(name));
        Ok(index)
    }

    /// Add a nested definition to the function pool, returns its index
    pub fn add_function(&mut self, id: FunctionId) -> SpecializeResult<u16> {
        if let Some(i) = self.functions.iter().position(|&existing| existing == id) {
            return Ok(i as u16);
        }
        let index = pool_index(self.functions.len(), SpecializeError::TooManyFunctions)?;
        self.functions.push(id);
        Ok(index)
    }

    /// Record the identifier name of a LOCAL slot
    pub fn name_local(&mut self, index: u16, name: &Arc<str>) {
        record_slot_name(&mut self.local_names, index, name);
    }

    /// Record the identifier name of a GLOBAL slot
    pub fn name_global(&mut self, index: u16, name: &Arc<str>) {
        record_slot_name(&mut self.global_names, index, name);
    }

    /// Create a forward jump, returns a label to patch later
    pub fn emit_jump(&mut self, opcode: Opcode) -> JumpLabel {
        debug_assert!(opcode.is_jump());
        let offset = self.code.len();
        self.code.push(opcode.to_byte());
        // Placeholder for jump offset
        self.code.extend_from_slice(&[0xFF, 0xFF]);
        JumpLabel { offset: offset + 1 }
    }

    /// Patch a jump label to jump to the current position
    pub fn patch_jump(&mut self, label: JumpLabel) -> SpecializeResult<()> {
        let target = self.code.len();
        let jump_from = label.offset + 2; // After the i16 operand
        let offset = jump_offset(target as isize - jump_from as isize)?;
        let bytes = offset.to_be_bytes();
        self.code[label.offset] = bytes[0];
        self.code[label.offset + 1] = bytes[1];
        Ok(())
    }

    /// Emit a backward jump to a known target
    pub fn emit_loop(&mut self, target: usize) -> SpecializeResult<()> {
        let offset = jump_offset(target as isize - (self.code.len() as isize + 3))?;
        self.code.push(Opcode::Jump.to_byte());
        self.code.extend_from_slice(&offset.to_be_bytes());
        Ok(())
    }

    pub fn build(self) -> CompiledUnit {
        CompiledUnit {
            code: self.code,
            constants: self.constants,
            names: self.names,
            functions: self.functions,
            local_names: self.local_names,
            global_names: self.global_names,
            name: self.name,
            function: self.function,
            local_count: self.local_count,
        }
    }
}

fn pool_index(len: usize, overflow: SpecializeError) -> SpecializeResult<u16> {
    u16::try_from(len).map_err(|_| overflow)
}

fn jump_offset(distance: isize) -> SpecializeResult<i16> {
    i16::try_from(distance).map_err(|_| SpecializeError::JumpTooFar)
}

fn record_slot_name(names: &mut Vec<Option<Arc<str>>>, index: u16, name: &Arc<str>) {
    let index = index as usize;
    if names.len() <= index {
        names.resize(index + 1, None);
    }
    if names[index].is_none() {
        names[index] = Some(Arc::clone(name));
    }
}

/// Label for a forward jump to be patched later
#[derive(Debug, Clone, Copy)]
pub struct JumpLabel {
    offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::syntax::ResolvedFunction;

    fn builder() -> UnitBuilder {
        CompiledUnit::builder("test", ResolvedFunction::builder("test").build().id())
    }

    #[test]
    fn test_emit_and_read() {
        let mut b = builder();
        b.emit_byte(Opcode::PushIntSmall, (-3i8) as u8);
        b.emit_u16(Opcode::LoadLocal, 0x0102);
        b.emit(Opcode::Return);
        let unit = b.build();

        assert_eq!(unit.len(), 6);
        assert_eq!(unit.read_opcode(0), Some(Opcode::PushIntSmall));
        assert_eq!(unit.read_i8(1), Some(-3));
        assert_eq!(unit.read_u16(3), Some(0x0102));
        assert_eq!(unit.read_opcode(5), Some(Opcode::Return));
        assert_eq!(unit.read_u16(5), None);
    }

    #[test]
    fn test_pools_deduplicate() {
        let mut b = builder();
        assert_eq!(b.add_constant(Value::Int(1000)), Ok(0));
        assert_eq!(b.add_constant(Value::string("x")), Ok(1));
        assert_eq!(b.add_constant(Value::Int(1000)), Ok(0));

        let len: Arc<str> = Arc::from("len");
        assert_eq!(b.add_name(&len), Ok(0));
        assert_eq!(b.add_name(&Arc::from("len")), Ok(0));

        let unit = b.build();
        assert_eq!(unit.constants().len(), 2);
        assert_eq!(unit.universal_names().len(), 1);
    }

    #[test]
    fn test_name_pool_overflow() {
        let mut b = builder();
        b.names = (0..=u16::MAX as usize).map(|i| Arc::from(format!("n{i}"))).collect();
        assert_eq!(b.add_name(&Arc::from("n7")), Ok(7));
        assert_eq!(b.add_name(&Arc::from("fresh")), Err(SpecializeError::TooManyNames));
        assert_eq!(b.add_constant(Value::Int(1000)), Ok(0));
    }

    #[test]
    fn test_jump_patching() {
        let mut b = builder();
        let start = b.current_offset();
        let exit = b.emit_jump(Opcode::ForIter);
        b.emit(Opcode::Pop);
        b.emit_loop(start).unwrap();
        b.patch_jump(exit).unwrap();
        b.emit(Opcode::PushNone);
        b.emit(Opcode::Return);
        let unit = b.build();

        // for_iter at 0 exits to 7, jump at 4 loops back to 0
        assert_eq!(unit.read_i16(1), Some(4));
        assert_eq!(unit.read_i16(5), Some(-7));
        let disasm = unit.disassemble();
        assert!(disasm.contains("0000 for_iter -> 0007"));
        assert!(disasm.contains("0004 jump -> 0000"));
    }

    #[test]
    fn test_slot_names() {
        let mut b = builder();
        b.name_local(2, &Arc::from("x"));
        b.name_global(0, &Arc::from("counter"));
        let unit = b.build();
        assert_eq!(unit.local_name(2), "x");
        assert_eq!(unit.local_name(0), "?");
        assert_eq!(unit.global_name(0), "counter");
    }
}
