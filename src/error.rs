//! Diagnostics shared by the tokenizer, the symbol table and the parser.
//!
//! Every failure is fatal: the first error unwinds to the driver, which
//! prints it as
//!
//! ```text
//! --- sample.mpl:12
//!  |- ERROR: x was not declared in this scope.
//! ```

use snafu::Snafu;

use crate::symbol::Type;

pub(crate) type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum CompileError {
    #[snafu(display("{message}"))]
    Lexical { line: usize, message: String },

    #[snafu(display("{message}"))]
    Syntax { line: usize, message: String },

    #[snafu(display("{source}"))]
    Semantic { line: usize, source: SemanticError },
}

impl CompileError {
    pub(crate) fn line(&self) -> usize {
        match self {
            CompileError::Lexical { line, .. }
            | CompileError::Syntax { line, .. }
            | CompileError::Semantic { line, .. } => *line,
        }
    }

    pub(crate) fn report(&self, file_name: &str) -> String {
        format!("--- {}:{}\n |- ERROR: {}", file_name, self.line(), self)
    }
}

/// Violations of the static rules of MPPL. The symbol table produces these
/// without knowing the current line; the parser attaches it.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum SemanticError {
    #[snafu(display("multiple definition of '{name}'."))]
    MultipleDefinition { name: String },

    #[snafu(display("{name} was not declared in this scope."))]
    Undeclared { name: String },

    #[snafu(display("procedure {name} is recursively called."))]
    RecursiveCall { name: String },

    #[snafu(display("the size of an array must satisfy 1 <= size, found {size}."))]
    ArraySize { size: u16 },

    #[snafu(display("array types cannot be used for formal parameters."))]
    ArrayParameter,

    #[snafu(display("'break' is written outside of a while statement."))]
    BreakOutsideLoop,

    #[snafu(display("{name} is not an array."))]
    NotAnArray { name: String },

    #[snafu(display("{name} is not a procedure."))]
    NotAProcedure { name: String },

    #[snafu(display("{name} is a procedure and cannot be used as a variable."))]
    NotAVariable { name: String },

    #[snafu(display("the array index must be an integer, found {found}."))]
    IndexType { found: Type },

    #[snafu(display("the operands of '{operator}' must be {expected}, found {found}."))]
    OperandType {
        operator: String,
        expected: Type,
        found: Type,
    },

    #[snafu(display("the types of the operands of '{operator}' do not match ({left} and {right})."))]
    OperandMismatch {
        operator: String,
        left: Type,
        right: Type,
    },

    #[snafu(display("cannot assign {value} to a variable of type {target}."))]
    AssignmentMismatch { target: Type, value: Type },

    #[snafu(display("the condition of {statement} must be boolean, found {found}."))]
    ConditionType { statement: &'static str, found: Type },

    #[snafu(display("a standard type is required here, found {found}."))]
    StandardTypeRequired { found: Type },

    #[snafu(display("the variable of {statement} must be integer or char, found {found}."))]
    ReadTarget { statement: &'static str, found: Type },

    #[snafu(display("procedure {name} takes {expected} argument(s), {found} given."))]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[snafu(display("argument {position} of {name} must be {expected}, found {found}."))]
    ArgumentType {
        name: String,
        position: usize,
        expected: Type,
        found: Type,
    },

    #[snafu(display("a character constant must have length 1, found length {length}."))]
    StringConstantLength { length: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let err = CompileError::Semantic {
            line: 7,
            source: SemanticError::Undeclared { name: "x".to_string() },
        };
        assert_eq!(
            err.report("sample.mpl"),
            "--- sample.mpl:7\n |- ERROR: x was not declared in this scope."
        );
    }

    #[test]
    fn test_line_of_every_kind() {
        let lexical = CompileError::Lexical { line: 1, message: String::new() };
        let syntax = CompileError::Syntax { line: 2, message: String::new() };
        let semantic = CompileError::Semantic {
            line: 3,
            source: SemanticError::BreakOutsideLoop,
        };
        assert_eq!(
            [lexical.line(), syntax.line(), semantic.line()],
            [1, 2, 3]
        );
    }
}
