//! Structural verification of compiled units
//!
//! Runs once per load, before a unit is exposed to any caller. Passing
//! verification guarantees the executor never hits an unknown opcode, a
//! truncated immediate, an out-of-range pool index, a jump into the middle
//! of an instruction, a stack underflow or the end of the code. Any failure
//! here is a lowering-engine defect.
//!
//! Stack depths are checked with a worklist dataflow pass: every instruction
//! is reached with one fixed (value depth, iterator depth) pair no matter
//! which path leads to it.

use std::collections::VecDeque;

use crate::backend::bytecode::chunk::CompiledUnit;
use crate::backend::bytecode::function_table::FunctionTable;
use crate::backend::bytecode::opcodes::Opcode;
use crate::backend::error::VerifyError;

/// Facts established by a successful verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifySummary {
    pub instructions: usize,
    /// Deepest value stack any path reaches
    pub max_stack: usize,
    /// Deepest loop nesting any path reaches
    pub max_loops: usize,
}

/// One decoded instruction
#[derive(Debug, Clone, Copy)]
struct Insn {
    offset: usize,
    op: Opcode,
    /// Decoded immediate, sign-extended for jumps and small ints
    operand: i32,
}

impl Insn {
    #[inline]
    fn next(&self) -> usize {
        self.offset + self.op.size()
    }

    #[inline]
    fn jump_target(&self) -> isize {
        self.next() as isize + self.operand as isize
    }
}

/// Stack depths on entry to an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Depth {
    values: usize,
    loops: usize,
}

/// Verify `unit`, loaded under `name`, against its function table
pub fn verify(name: &str, unit: &CompiledUnit, functions: &FunctionTable) -> Result<VerifySummary, VerifyError> {
    let fail = |offset: usize, message: String| VerifyError {
        unit: name.to_string(),
        offset,
        message,
    };

    if unit.is_empty() {
        return Err(fail(0, "empty unit".to_string()));
    }

    let insns = decode(unit).map_err(|(offset, message)| fail(offset, message))?;

    // index_at[offset] = instruction index when `offset` starts an instruction
    let mut index_at = vec![None; unit.len()];
    for (i, insn) in insns.iter().enumerate() {
        index_at[insn.offset] = Some(i);
    }

    for insn in &insns {
        check_operands(unit, functions, insn).map_err(|message| fail(insn.offset, message))?;
        if insn.op.is_jump() {
            let target = insn.jump_target();
            let lands = usize::try_from(target)
                .ok()
                .and_then(|t| index_at.get(t).copied().flatten());
            if lands.is_none() {
                return Err(fail(
                    insn.offset,
                    format!("{} target {} is not an instruction boundary", insn.op, target),
                ));
            }
        }
    }

    let summary = check_depths(&insns, &index_at).map_err(|(offset, message)| fail(offset, message))?;
    Ok(summary)
}

fn decode(unit: &CompiledUnit) -> Result<Vec<Insn>, (usize, String)> {
    let mut insns = Vec::new();
    let mut offset = 0;
    while offset < unit.len() {
        let byte = unit.read_byte(offset).unwrap_or(0);
        let op = Opcode::from_byte(byte).ok_or_else(|| (offset, format!("unknown opcode 0x{:02x}", byte)))?;
        if offset + op.size() > unit.len() {
            return Err((offset, format!("truncated immediate for {}", op)));
        }
        let operand = match op.immediate_size() {
            0 => 0,
            1 => match op {
                Opcode::PushIntSmall => unit.read_i8(offset + 1).unwrap_or(0) as i32,
                _ => unit.read_byte(offset + 1).unwrap_or(0) as i32,
            },
            _ if op.is_jump() => unit.read_i16(offset + 1).unwrap_or(0) as i32,
            _ => unit.read_u16(offset + 1).unwrap_or(0) as i32,
        };
        insns.push(Insn { offset, op, operand });
        offset += op.size();
    }
    Ok(insns)
}

fn check_operands(unit: &CompiledUnit, functions: &FunctionTable, insn: &Insn) -> Result<(), String> {
    let index = insn.operand as usize;
    let in_range = |len: usize, pool: &str| {
        if index < len {
            Ok(())
        } else {
            Err(format!("{} index {} out of range ({} {})", insn.op, index, len, pool))
        }
    };

    match insn.op {
        Opcode::PushConstant => in_range(unit.constants().len(), "constants"),
        Opcode::LoadUniversal => in_range(unit.universal_names().len(), "names"),
        Opcode::LoadLocal | Opcode::StoreLocal => in_range(unit.local_count() as usize, "locals"),
        Opcode::MakeFunction => {
            in_range(unit.function_ids().len(), "functions")?;
            let id = unit.function_ids()[index];
            if functions.contains(id) {
                Ok(())
            } else {
                Err(format!("function #{} missing from function table", id))
            }
        }
        _ => Ok(()),
    }
}

fn check_depths(insns: &[Insn], index_at: &[Option<usize>]) -> Result<VerifySummary, (usize, String)> {
    let mut entry: Vec<Option<Depth>> = vec![None; insns.len()];
    let mut worklist = VecDeque::new();
    let mut summary = VerifySummary {
        instructions: insns.len(),
        max_stack: 0,
        max_loops: 0,
    };

    entry[0] = Some(Depth { values: 0, loops: 0 });
    worklist.push_back(0usize);

    while let Some(i) = worklist.pop_front() {
        let insn = insns[i];
        let Some(depth) = entry[i] else { continue };

        let (pops, pushes) = insn.op.stack_effect(insn.operand as usize);
        if depth.values < pops {
            return Err((
                insn.offset,
                format!("{} needs {} value(s), stack holds {}", insn.op, pops, depth.values),
            ));
        }
        let mut after = Depth {
            values: depth.values - pops + pushes,
            loops: depth.loops,
        };
        match insn.op {
            Opcode::GetIter => after.loops += 1,
            Opcode::ForIter if depth.loops == 0 => {
                return Err((insn.offset, "for_iter without an active iterator".to_string()));
            }
            _ => {}
        }

        let mut successors: Vec<(usize, Depth)> = Vec::with_capacity(2);
        if !insn.op.is_terminator() {
            successors.push((insn.next(), after));
        }
        if insn.op.is_jump() {
            // An exhausted for_iter pops its iterator and pushes nothing
            let taken = match insn.op {
                Opcode::ForIter => Depth {
                    values: depth.values,
                    loops: depth.loops - 1,
                },
                _ => after,
            };
            successors.push((insn.jump_target() as usize, taken));
        }

        summary.max_stack = summary.max_stack.max(after.values);
        summary.max_loops = summary.max_loops.max(after.loops);

        for (offset, state) in successors {
            let Some(j) = index_at.get(offset).copied().flatten() else {
                return Err((insn.offset, "execution falls off the end of the unit".to_string()));
            };
            match entry[j] {
                None => {
                    entry[j] = Some(state);
                    worklist.push_back(j);
                }
                Some(existing) if existing != state => {
                    return Err((
                        insns[j].offset,
                        format!(
                            "inconsistent stack at join: {}/{} vs {}/{} (values/loops)",
                            existing.values, existing.loops, state.values, state.loops
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    Ok(summary)
}
