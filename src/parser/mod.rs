use std::*;

use log::debug;
use snafu::ResultExt;

use crate::config::ReservedSymbolsTable;
use crate::error::{CompileError, CompileResult, SemanticError, SemanticSnafu, SyntaxSnafu};
use crate::machine_code_generator::{Label, MachineCodeGenerator};
use crate::symbol::{StandardType, Type};
use crate::tokenizer::Tokenizer;
use crate::tokenizer::token::*;
use analyzer::ScopeTable;
use pretty_printer::PrettyPrinter;

pub(crate) mod analyzer;
mod expression_parser;
mod pretty_printer;

/// Deepest nesting of statements and parenthesized expressions accepted.
const MAX_NESTING_DEPTH: usize = 100;

/// Per-compilation state shared by every production.
#[derive(Debug, Default)]
pub(crate) struct CompilerContext {
    pub(crate) scope: ScopeTable,
    pub(crate) gen: MachineCodeGenerator,
    pub(crate) pretty: PrettyPrinter,
    /// Exit labels of the enclosing `while` loops, innermost last.
    loop_exits: Vec<Label>,
}

#[derive(Debug)]
pub(crate) struct Compilation {
    pub(crate) code: Vec<String>,
    pub(crate) scope: ScopeTable,
    /// The program reformatted with one statement per line.
    pub(crate) listing: String,
}

/// One-pass compiler: checks each construct and emits its code as soon
/// as it is recognized. The first error ends the compilation.
pub(crate) struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    current: Token,
    ctx: CompilerContext,
    nesting: usize,
}

const LEFT_ROUND: WrappedToken =
    WrappedToken::Bracket(Bracket::new(LeftOrRight::Left, BracketType::Round));
const RIGHT_ROUND: WrappedToken =
    WrappedToken::Bracket(Bracket::new(LeftOrRight::Right, BracketType::Round));
const LEFT_SQUARE: WrappedToken =
    WrappedToken::Bracket(Bracket::new(LeftOrRight::Left, BracketType::Square));
const RIGHT_SQUARE: WrappedToken =
    WrappedToken::Bracket(Bracket::new(LeftOrRight::Right, BracketType::Square));

impl<'a> Parser<'a> {
    pub(crate) fn new(
        source_code: &'a str,
        reserved_symbols: &'a ReservedSymbolsTable,
    ) -> CompileResult<Self> {
        let mut tokenizer = Tokenizer::new(source_code, reserved_symbols);
        let current = tokenizer.next_token()?;
        Ok(Parser {
            tokenizer,
            current,
            ctx: CompilerContext::default(),
            nesting: 0,
        })
    }

    pub(crate) fn run(mut self) -> CompileResult<Compilation> {
        self.parse_program()?;
        let CompilerContext { scope, gen, pretty, .. } = self.ctx;
        Ok(Compilation {
            code: gen.finish(),
            scope,
            listing: pretty.finish(),
        })
    }

    fn line(&self) -> usize {
        self.current.line
    }

    fn advance(&mut self) -> CompileResult<Token> {
        self.ctx.pretty.token(&self.current.token);
        let next = self.tokenizer.next_token()?;
        Ok(mem::replace(&mut self.current, next))
    }

    fn check(&self, expected: &WrappedToken) -> bool {
        self.current.token == *expected
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current.token.is_keyword(keyword)
    }

    fn syntax_error<T>(&self, expected: &str) -> CompileResult<T> {
        SyntaxSnafu {
            line: self.line(),
            message: format!("{} is expected, found {}.", expected, self.current.token),
        }
        .fail()
    }

    /// Runs a production that may recurse into itself; more than
    /// `MAX_NESTING_DEPTH` open levels is a syntax error.
    fn nested<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        if self.nesting == MAX_NESTING_DEPTH {
            return SyntaxSnafu {
                line: self.line(),
                message: format!("constructs are nested more than {} deep.", MAX_NESTING_DEPTH),
            }
            .fail();
        }
        self.nesting += 1;
        let result = production(self);
        self.nesting -= 1;
        result
    }

    fn semantic_error<T>(&self, source: SemanticError) -> CompileResult<T> {
        Err(CompileError::Semantic { line: self.line(), source })
    }

    fn expect(&mut self, expected: WrappedToken) -> CompileResult<()> {
        if !self.check(&expected) {
            return self.syntax_error(&format!("'{}'", expected));
        }
        self.advance()?;
        Ok(())
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> CompileResult<()> {
        self.expect(WrappedToken::Keyword(keyword))
    }

    fn expect_name(&mut self) -> CompileResult<String> {
        match &self.current.token {
            WrappedToken::Name(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => self.syntax_error("a name"),
        }
    }

    fn expect_number(&mut self) -> CompileResult<u16> {
        match self.current.token {
            WrappedToken::Number(n) => {
                self.advance()?;
                Ok(n)
            }
            _ => self.syntax_error("a number"),
        }
    }

    fn parse_program(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Program)?;
        let name = self.expect_name()?;
        debug!("compiling program {}", name);
        let main_label = self.ctx.gen.start(&name);
        self.expect(WrappedToken::Semicolon)?;
        self.ctx.pretty.line_break();
        self.parse_block(main_label)?;
        self.expect(WrappedToken::Dot)
    }

    fn parse_block(&mut self, main_label: Label) -> CompileResult<()> {
        loop {
            match self.current.token {
                WrappedToken::Keyword(Keyword::Var) => self.parse_variable_declaration()?,
                WrappedToken::Keyword(Keyword::Procedure) => self.parse_procedure_declaration()?,
                _ => break,
            }
        }
        self.ctx.gen.place_label(main_label);
        self.parse_compound_statement()?;
        self.ctx.gen.ret();
        Ok(())
    }

    /// Registers a comma-separated list of names as pending.
    fn parse_names(&mut self, is_parameter: bool) -> CompileResult<()> {
        loop {
            let line = self.line();
            let name = self.expect_name()?;
            self.ctx
                .scope
                .declare_pending(&name, is_parameter, line)
                .context(SemanticSnafu { line })?;
            if !self.check(&WrappedToken::Comma) {
                return Ok(());
            }
            self.advance()?;
        }
    }

    /// Types the pending names and reserves their storage.
    fn complete_declaration(&mut self, ty: &Type) -> Vec<String> {
        let ids = self.ctx.scope.attach_type(ty);
        ids.into_iter()
            .map(|id| {
                let symbol = self.ctx.scope.symbol(id);
                self.ctx.gen.storage(symbol);
                symbol.storage_label()
            })
            .collect()
    }

    /// Declarations after the first are listed one level deeper, under it.
    fn parse_variable_declaration(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Var)?;
        self.ctx.pretty.indent();
        loop {
            self.parse_names(false)?;
            self.expect(WrappedToken::Colon)?;
            let ty = self.parse_type()?;
            self.complete_declaration(&ty);
            self.expect(WrappedToken::Semicolon)?;
            self.ctx.pretty.line_break();
            if !matches!(self.current.token, WrappedToken::Name(_)) {
                self.ctx.pretty.dedent();
                return Ok(());
            }
        }
    }

    pub(super) fn parse_standard_type(&mut self) -> CompileResult<StandardType> {
        let ty = match self.current.token {
            WrappedToken::Keyword(Keyword::Integer) => StandardType::Integer,
            WrappedToken::Keyword(Keyword::Char) => StandardType::Char,
            WrappedToken::Keyword(Keyword::Boolean) => StandardType::Boolean,
            _ => return self.syntax_error("a standard type"),
        };
        self.advance()?;
        Ok(ty)
    }

    fn parse_type(&mut self) -> CompileResult<Type> {
        if !self.check_keyword(Keyword::Array) {
            return Ok(Type::standard(self.parse_standard_type()?));
        }
        self.advance()?;
        self.expect(LEFT_SQUARE)?;
        let size = self.expect_number()?;
        if size < 1 {
            return self.semantic_error(SemanticError::ArraySize { size });
        }
        self.expect(RIGHT_SQUARE)?;
        self.expect_keyword(Keyword::Of)?;
        Ok(Type::array(self.parse_standard_type()?, size))
    }

    fn parse_procedure_declaration(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Procedure)?;
        let line = self.line();
        let name = self.expect_name()?;
        self.ctx
            .scope
            .declare_pending(&name, false, line)
            .context(SemanticSnafu { line })?;
        self.ctx.scope.attach_type(&Type::procedure());
        self.ctx.scope.enter_procedure(&name).context(SemanticSnafu { line })?;

        let parameter_slots = if self.check(&LEFT_ROUND) {
            self.parse_formal_parameters()?
        } else {
            vec![]
        };
        self.expect(WrappedToken::Semicolon)?;
        self.ctx.pretty.line_break();
        self.ctx.pretty.indent();
        if self.check_keyword(Keyword::Var) {
            self.parse_variable_declaration()?;
        }
        self.ctx.gen.procedure_entry(&name, &parameter_slots);
        self.parse_compound_statement()?;
        self.ctx.gen.ret();
        self.expect(WrappedToken::Semicolon)?;
        self.ctx.pretty.line_break();
        self.ctx.pretty.dedent();
        self.ctx.scope.leave_procedure();
        Ok(())
    }

    /// Returns the storage labels of the parameters in declaration order.
    fn parse_formal_parameters(&mut self) -> CompileResult<Vec<String>> {
        self.expect(LEFT_ROUND)?;
        let mut slots = vec![];
        loop {
            self.parse_names(true)?;
            self.expect(WrappedToken::Colon)?;
            let ty = self.parse_type()?;
            if ty.is_array() {
                return self.semantic_error(SemanticError::ArrayParameter);
            }
            slots.extend(self.complete_declaration(&ty));
            if !self.check(&WrappedToken::Semicolon) {
                break;
            }
            self.advance()?;
        }
        self.expect(RIGHT_ROUND)?;
        Ok(slots)
    }

    fn parse_compound_statement(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Begin)?;
        self.ctx.pretty.line_break();
        self.ctx.pretty.indent();
        self.parse_statement()?;
        while self.check(&WrappedToken::Semicolon) {
            self.advance()?;
            self.ctx.pretty.line_break();
            self.parse_statement()?;
        }
        self.ctx.pretty.line_break();
        self.ctx.pretty.dedent();
        self.expect_keyword(Keyword::End)
    }

    fn parse_statement(&mut self) -> CompileResult<()> {
        self.nested(Self::parse_statement_body)
    }

    fn parse_statement_body(&mut self) -> CompileResult<()> {
        use Keyword::*;

        match self.current.token {
            WrappedToken::Name(_) => self.parse_assignment(),
            WrappedToken::Keyword(If) => self.parse_condition(),
            WrappedToken::Keyword(While) => self.parse_iteration(),
            WrappedToken::Keyword(Break) => self.parse_break(),
            WrappedToken::Keyword(Call) => self.parse_call(),
            WrappedToken::Keyword(Return) => {
                self.advance()?;
                self.ctx.gen.ret();
                Ok(())
            }
            WrappedToken::Keyword(Read | Readln) => self.parse_input(),
            WrappedToken::Keyword(Write | Writeln) => self.parse_output(),
            WrappedToken::Keyword(Begin) => self.parse_compound_statement(),
            // empty statement
            _ => Ok(()),
        }
    }

    fn parse_assignment(&mut self) -> CompileResult<()> {
        let target = self.parse_variable()?;
        self.expect(WrappedToken::Operator(Operator::Assign))?;
        let value = self.parse_expression()?;
        let value = self.rvalue(value);
        if target.ty.as_standard().is_none() {
            return self.semantic_error(SemanticError::StandardTypeRequired { found: target.ty });
        }
        if target.ty != value {
            return self.semantic_error(SemanticError::AssignmentMismatch {
                target: target.ty,
                value,
            });
        }
        self.ctx.gen.assign();
        Ok(())
    }

    fn parse_boolean_condition(&mut self, statement: &'static str) -> CompileResult<()> {
        let condition = self.parse_expression()?;
        let ty = self.rvalue(condition);
        if ty != Type::Boolean {
            return self.semantic_error(SemanticError::ConditionType { statement, found: ty });
        }
        Ok(())
    }

    /// A statement listed on its own lines, one level deeper.
    fn parse_indented_statement(&mut self) -> CompileResult<()> {
        self.ctx.pretty.line_break();
        self.ctx.pretty.indent();
        self.parse_statement()?;
        self.ctx.pretty.dedent();
        Ok(())
    }

    fn parse_condition(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::If)?;
        self.parse_boolean_condition("if")?;
        let else_label = self.ctx.gen.new_label();
        self.ctx.gen.jump_if_false(else_label);
        self.expect_keyword(Keyword::Then)?;
        self.parse_indented_statement()?;
        let end_label = self.ctx.gen.new_label();
        if self.check_keyword(Keyword::Else) {
            self.ctx.gen.jump(end_label);
            self.ctx.gen.place_label(else_label);
            self.ctx.pretty.line_break();
            self.advance()?;
            // `else if` stays on one line and does not nest deeper
            if self.check_keyword(Keyword::If) {
                self.parse_statement()?;
            } else {
                self.parse_indented_statement()?;
            }
            self.ctx.gen.place_label(end_label);
        } else {
            self.ctx.gen.place_label(else_label);
        }
        Ok(())
    }

    fn parse_iteration(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::While)?;
        let top_label = self.ctx.gen.new_label();
        let bottom_label = self.ctx.gen.new_label();
        self.ctx.gen.place_label(top_label);
        self.parse_boolean_condition("while")?;
        self.ctx.gen.jump_if_false(bottom_label);
        self.expect_keyword(Keyword::Do)?;
        self.ctx.loop_exits.push(bottom_label);
        self.parse_indented_statement()?;
        self.ctx.loop_exits.pop();
        self.ctx.gen.jump(top_label);
        self.ctx.gen.place_label(bottom_label);
        Ok(())
    }

    fn parse_break(&mut self) -> CompileResult<()> {
        let exit = match self.ctx.loop_exits.last() {
            Some(label) => *label,
            None => return self.semantic_error(SemanticError::BreakOutsideLoop),
        };
        self.advance()?;
        self.ctx.gen.jump(exit);
        Ok(())
    }

    /// Arguments are passed by reference: a variable passes its own
    /// address, any other expression the address of a temporary copy.
    fn parse_call(&mut self) -> CompileResult<()> {
        self.expect_keyword(Keyword::Call)?;
        let line = self.line();
        let name = self.expect_name()?;
        let id = self.ctx.scope.resolve(&name, line).context(SemanticSnafu { line })?;
        let params = match &self.ctx.scope.symbol(id).ty {
            Some(Type::Procedure { params }) => params.clone(),
            _ => return self.semantic_error(SemanticError::NotAProcedure { name }),
        };

        let mut found = 0;
        if self.check(&LEFT_ROUND) {
            self.advance()?;
            loop {
                let argument = self.parse_expression()?;
                found += 1;
                match params.get(found - 1) {
                    Some(expected) if *expected != argument.ty => {
                        return self.semantic_error(SemanticError::ArgumentType {
                            name,
                            position: found,
                            expected: expected.clone(),
                            found: argument.ty,
                        });
                    }
                    Some(_) => (),
                    None => {
                        return self.semantic_error(SemanticError::ArgumentCount {
                            name,
                            expected: params.len(),
                            found,
                        });
                    }
                }
                match argument.variable {
                    Some(variable) => debug!(
                        "{} passed by reference to {}",
                        self.ctx.scope.symbol(variable).qualified_name(),
                        name
                    ),
                    None => self.ctx.gen.argument_temporary(),
                }
                if !self.check(&WrappedToken::Comma) {
                    break;
                }
                self.advance()?;
            }
            self.expect(RIGHT_ROUND)?;
        }
        if found != params.len() {
            return self.semantic_error(SemanticError::ArgumentCount {
                name,
                expected: params.len(),
                found,
            });
        }
        debug!(
            "call {} from {}",
            name,
            self.ctx.scope.current_procedure().unwrap_or("main block")
        );
        self.ctx.gen.call(&name);
        Ok(())
    }

    fn parse_input(&mut self) -> CompileResult<()> {
        let (statement, new_line) = match self.advance()?.token {
            WrappedToken::Keyword(Keyword::Readln) => ("readln", true),
            _ => ("read", false),
        };
        if self.check(&LEFT_ROUND) {
            self.advance()?;
            loop {
                let target = self.parse_variable()?;
                match target.ty.as_standard() {
                    Some(kind @ (StandardType::Integer | StandardType::Char)) => {
                        self.ctx.gen.read(kind)
                    }
                    _ => {
                        return self.semantic_error(SemanticError::ReadTarget {
                            statement,
                            found: target.ty,
                        })
                    }
                }
                if !self.check(&WrappedToken::Comma) {
                    break;
                }
                self.advance()?;
            }
            self.expect(RIGHT_ROUND)?;
        }
        if new_line {
            self.ctx.gen.read_line();
        }
        Ok(())
    }

    fn parse_output(&mut self) -> CompileResult<()> {
        let new_line = self.advance()?.token.is_keyword(Keyword::Writeln);
        if self.check(&LEFT_ROUND) {
            self.advance()?;
            loop {
                self.parse_output_format()?;
                if !self.check(&WrappedToken::Comma) {
                    break;
                }
                self.advance()?;
            }
            self.expect(RIGHT_ROUND)?;
        }
        if new_line {
            self.ctx.gen.write_line();
        }
        Ok(())
    }

    /// A string of one character is a char constant and may take a width.
    fn parse_output_format(&mut self) -> CompileResult<()> {
        if let WrappedToken::String(text) = &self.current.token {
            match text.len() {
                0 => return self.semantic_error(SemanticError::StringConstantLength { length: 0 }),
                1 => (),
                _ => {
                    let text = text.clone();
                    self.advance()?;
                    self.ctx.gen.write_string(&text);
                    return Ok(());
                }
            }
        }
        let value = self.parse_expression()?;
        let ty = self.rvalue(value);
        let kind = match ty.as_standard() {
            Some(kind) => kind,
            None => return self.semantic_error(SemanticError::StandardTypeRequired { found: ty }),
        };
        let width = if self.check(&WrappedToken::Colon) {
            self.advance()?;
            Some(self.expect_number()?)
        } else {
            None
        };
        self.ctx.gen.write_value(kind, width);
        Ok(())
    }
}
