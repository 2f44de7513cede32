//! The program under construction and its pipeline state machine.
//!
//! ```text
//! Empty -> Parsing -> Parsed -> Linked -> Encoded
//!             \          \        \
//!              `----------`--------`--> Failed
//! ```
//!
//! `Failed` is terminal: a failed program is discarded, never repaired.

use crate::config::AssemblerConfig;
use crate::encoder;
use crate::image::Image;
use crate::instruction::{Instruction, Opcode};
use crate::linker;
use crate::operand::parse_name;
use crate::parser::{self, ParseError};
use crate::symbols::{BoundedVec, Function, Label, SymbolTable};
use crate::{AssemblerError, Result};

/// Pipeline stage of a [`Program`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Empty,
    Parsing,
    Parsed,
    Linked,
    Encoded,
    Failed,
}

/// A script program: instructions plus symbol tables
#[derive(Debug, Clone)]
pub struct Program {
    config: AssemblerConfig,
    instructions: BoundedVec<Instruction>,
    symbols: SymbolTable,
    /// Function currently open for instructions
    current_function: Option<usize>,
    /// 1-based line being analyzed
    line: usize,
    stage: Stage,
    error: Option<AssemblerError>,
}

impl Program {
    /// Create an empty program with the given limits
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            instructions: BoundedVec::new("instruction", config.max_instructions),
            symbols: SymbolTable::new(config.max_labels, config.max_functions),
            config,
            current_function: None,
            line: 0,
            stage: Stage::Empty,
            error: None,
        })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn instructions(&self) -> &[Instruction] {
        self.instructions.as_slice()
    }

    pub fn labels(&self) -> &[Label] {
        self.symbols.labels()
    }

    pub fn functions(&self) -> &[Function] {
        self.symbols.functions()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The error that failed this program, if any
    pub fn last_error(&self) -> Option<&AssemblerError> {
        self.error.as_ref()
    }

    /// Source line of the error that failed this program, for parse errors
    pub fn error_line(&self) -> Option<usize> {
        match self.error {
            Some(AssemblerError::Parse { line, .. }) => Some(line),
            _ => None,
        }
    }

    pub fn current_function(&self) -> Option<usize> {
        self.current_function
    }

    pub fn open_function_name(&self) -> Option<&str> {
        self.current_function
            .and_then(|index| self.functions().get(index))
            .map(|func| func.name.as_str())
    }

    /// Parse a raw script buffer. Only valid on an empty program.
    pub fn parse(&mut self, source: &[u8]) -> Result<()> {
        self.expect_stage(Stage::Empty, "parse")?;
        self.stage = Stage::Parsing;

        match parser::parse_source(self, source) {
            Ok(()) => {
                self.stage = Stage::Parsed;
                tracing::debug!(
                    instructions = self.instructions.len(),
                    labels = self.labels().len(),
                    functions = self.functions().len(),
                    "parsed script"
                );
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Resolve every label and function reference.
    pub fn link(&mut self) -> Result<()> {
        self.expect_stage(Stage::Parsed, "link")?;

        match linker::link(self.instructions.as_mut_slice(), &self.symbols) {
            Ok(resolved) => {
                self.stage = Stage::Linked;
                tracing::debug!(resolved, "linked script");
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Encode the linked program into a firmware image.
    pub fn encode(&mut self) -> Result<Image> {
        self.expect_stage(Stage::Linked, "encode")?;

        match encoder::encode(self.instructions()) {
            Ok(instructions) => {
                self.stage = Stage::Encoded;
                tracing::debug!(words = instructions.len() * 2, "encoded script");
                Ok(Image::new(instructions, self.functions()))
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn expect_stage(&mut self, expected: Stage, operation: &'static str) -> Result<()> {
        if self.stage == expected {
            return Ok(());
        }
        let err = AssemblerError::InvalidStage {
            operation,
            stage: self.stage,
        };
        Err(self.fail(err))
    }

    fn fail(&mut self, err: AssemblerError) -> AssemblerError {
        self.stage = Stage::Failed;
        self.error = Some(err.clone());
        err
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// Open a function starting at the current instruction count.
    pub(crate) fn open_function(&mut self, name: &str) -> std::result::Result<usize, ParseError> {
        if let Some(open) = self.open_function_name() {
            return Err(ParseError::NestedFunction {
                name: name.to_string(),
                open: open.to_string(),
            });
        }
        let name = parse_name(name, &self.config)?;

        let start = self.instructions.len();
        let index = self.symbols.add_function(Function {
            name: name.to_string(),
            start,
            end: start,
        })?;
        self.current_function = Some(index);
        Ok(index)
    }

    /// Close the open function at the current instruction count.
    pub(crate) fn close_function(&mut self) -> std::result::Result<usize, ParseError> {
        let index = self.current_function.ok_or(ParseError::NoOpenFunction)?;
        let end = self.instructions.len();
        if let Some(func) = self.symbols.function_mut(index) {
            func.end = end;
        }
        self.current_function = None;
        Ok(index)
    }

    /// Register a `name:` label at the current instruction index.
    pub(crate) fn add_label(&mut self, token: &str) -> std::result::Result<usize, ParseError> {
        let function = self
            .current_function
            .ok_or(ParseError::OutsideFunction("label"))?;

        let name = token
            .strip_suffix(':')
            .ok_or_else(|| ParseError::InvalidLabel(token.to_string()))?;
        let name = parse_name(name, &self.config)
            .map_err(|_| ParseError::InvalidLabel(token.to_string()))?;

        let index = self.symbols.add_label(Label {
            name: name.to_string(),
            index: self.instructions.len(),
            function,
        })?;
        Ok(index)
    }

    /// Append an already validated instruction to the open function.
    pub(crate) fn push_instruction(
        &mut self,
        opcode: Opcode,
        operands: Vec<crate::operand::Operand>,
    ) -> std::result::Result<usize, ParseError> {
        let function = self
            .current_function
            .ok_or(ParseError::OutsideFunction("instruction"))?;

        let index = self.instructions.try_push(Instruction {
            opcode,
            operands,
            function,
            line: self.line,
        })?;
        Ok(index)
    }
}
