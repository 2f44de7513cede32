//! Second pass: resolve symbolic operands to numeric indices.
//!
//! Labels resolve within the function that references them, functions resolve
//! against the global function table.

use crate::instruction::Instruction;
use crate::operand::Operand;
use crate::symbols::SymbolTable;
use thiserror::Error;

/// Linker errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("can't find label: {0}")]
    UndefinedLabel(String),

    #[error("can't find func: {0}")]
    UndefinedFunction(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Resolve every label and function operand in program order.
///
/// Returns the number of resolved references. The first unresolved reference
/// aborts linking.
pub fn link(instructions: &mut [Instruction], symbols: &SymbolTable) -> Result<usize> {
    let mut resolved = 0;

    for (func_id, function) in symbols.functions().iter().enumerate() {
        for instruction in &mut instructions[function.start..function.end] {
            for operand in &mut instruction.operands {
                match operand {
                    Operand::Label(symbol) => {
                        let label = symbols
                            .find_label(func_id, &symbol.name)
                            .ok_or_else(|| LinkError::UndefinedLabel(symbol.name.clone()))?;
                        symbol.index = Some(label.index as u32);
                        resolved += 1;
                    }
                    Operand::Function(symbol) => {
                        let index = symbols
                            .find_function(&symbol.name)
                            .ok_or_else(|| LinkError::UndefinedFunction(symbol.name.clone()))?;
                        symbol.index = Some(index as u32);
                        resolved += 1;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(resolved)
}
