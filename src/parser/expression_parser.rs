use snafu::ResultExt;

use crate::error::{CompileResult, SemanticError, SemanticSnafu};
use crate::machine_code_generator::ArithmeticOp;
use crate::parser::{Parser, LEFT_ROUND, LEFT_SQUARE, RIGHT_ROUND, RIGHT_SQUARE};
use crate::symbol::{SymbolId, Type};
use crate::tokenizer::token::*;

/// What an expression left on the stack.
///
/// A bare variable (one variable reference, possibly indexed, with nothing
/// applied to it) leaves its address; anything else leaves its value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Operand {
    pub(crate) ty: Type,
    pub(crate) is_bare_variable: bool,
    pub(crate) variable: Option<SymbolId>,
}

impl Operand {
    fn value(ty: Type) -> Self {
        Operand {
            ty,
            is_bare_variable: false,
            variable: None,
        }
    }
}

impl Parser<'_> {
    /// Makes sure the operand's value, not its address, is on the stack.
    pub(super) fn rvalue(&mut self, operand: Operand) -> Type {
        if operand.is_bare_variable {
            self.ctx.gen.load_rvalue();
        }
        operand.ty
    }

    fn check_operand(&self, operator: &str, expected: Type, found: Type) -> CompileResult<()> {
        if found != expected {
            return self.semantic_error(SemanticError::OperandType {
                operator: operator.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }

    pub(super) fn parse_expression(&mut self) -> CompileResult<Operand> {
        self.nested(Self::parse_relations)
    }

    fn parse_relations(&mut self) -> CompileResult<Operand> {
        let mut left = self.parse_simple_expression()?;
        while let WrappedToken::Operator(Operator::Relation(relation)) = self.current.token {
            let left_ty = self.rvalue(left);
            self.advance()?;
            let right = self.parse_simple_expression()?;
            let right_ty = self.rvalue(right);
            for ty in [&left_ty, &right_ty] {
                if ty.as_standard().is_none() {
                    return self.semantic_error(SemanticError::StandardTypeRequired {
                        found: ty.clone(),
                    });
                }
            }
            if left_ty != right_ty {
                return self.semantic_error(SemanticError::OperandMismatch {
                    operator: relation.to_string(),
                    left: left_ty,
                    right: right_ty,
                });
            }
            self.ctx.gen.relation(relation);
            left = Operand::value(Type::Boolean);
        }
        Ok(left)
    }

    fn parse_simple_expression(&mut self) -> CompileResult<Operand> {
        let sign = match self.current.token {
            WrappedToken::Operator(op @ (Operator::Plus | Operator::Minus)) => Some(op),
            _ => None,
        };
        if sign.is_some() {
            self.advance()?;
        }
        let mut left = self.parse_term()?;
        if let Some(sign) = sign {
            let ty = self.rvalue(left);
            self.check_operand(&sign.to_string(), Type::Integer, ty)?;
            if sign == Operator::Minus {
                self.ctx.gen.negate();
            }
            left = Operand::value(Type::Integer);
        }

        loop {
            let (op, operand_ty) = match self.current.token {
                WrappedToken::Operator(Operator::Plus) => (ArithmeticOp::Add, Type::Integer),
                WrappedToken::Operator(Operator::Minus) => (ArithmeticOp::Sub, Type::Integer),
                WrappedToken::Keyword(Keyword::Or) => (ArithmeticOp::Or, Type::Boolean),
                _ => return Ok(left),
            };
            left = self.parse_binary_operation(left, op, operand_ty, Self::parse_term)?;
        }
    }

    fn parse_term(&mut self) -> CompileResult<Operand> {
        let mut left = self.parse_factor()?;
        loop {
            let (op, operand_ty) = match self.current.token {
                WrappedToken::Operator(Operator::Asterisk) => (ArithmeticOp::Mul, Type::Integer),
                WrappedToken::Keyword(Keyword::Div) => (ArithmeticOp::Div, Type::Integer),
                WrappedToken::Keyword(Keyword::And) => (ArithmeticOp::And, Type::Boolean),
                _ => return Ok(left),
            };
            left = self.parse_binary_operation(left, op, operand_ty, Self::parse_factor)?;
        }
    }

    /// Both operands of `op` must have type `operand_ty`, which is also the
    /// type of the result.
    fn parse_binary_operation(
        &mut self,
        left: Operand,
        op: ArithmeticOp,
        operand_ty: Type,
        parse_right: fn(&mut Self) -> CompileResult<Operand>,
    ) -> CompileResult<Operand> {
        let operator = self.current.token.to_string();
        let left_ty = self.rvalue(left);
        self.check_operand(&operator, operand_ty.clone(), left_ty)?;
        self.advance()?;
        let right = parse_right(self)?;
        let right_ty = self.rvalue(right);
        self.check_operand(&operator, operand_ty.clone(), right_ty)?;
        self.ctx.gen.arithmetic(op);
        Ok(Operand::value(operand_ty))
    }

    fn parse_factor(&mut self) -> CompileResult<Operand> {
        match self.current.token.clone() {
            WrappedToken::Name(_) => self.parse_variable(),
            WrappedToken::Number(n) => {
                self.advance()?;
                self.ctx.gen.push_constant(n);
                Ok(Operand::value(Type::Integer))
            }
            WrappedToken::Keyword(keyword @ (Keyword::True | Keyword::False)) => {
                self.advance()?;
                self.ctx.gen.push_constant((keyword == Keyword::True) as u16);
                Ok(Operand::value(Type::Boolean))
            }
            WrappedToken::String(text) => {
                let c = match text.as_bytes() {
                    [c] => *c,
                    _ => {
                        return self.semantic_error(SemanticError::StringConstantLength {
                            length: text.len(),
                        })
                    }
                };
                self.advance()?;
                self.ctx.gen.push_constant(c as u16);
                Ok(Operand::value(Type::Char))
            }
            WrappedToken::Keyword(Keyword::Not) => {
                self.advance()?;
                let operand = self.nested(Self::parse_factor)?;
                let ty = self.rvalue(operand);
                self.check_operand("not", Type::Boolean, ty)?;
                self.ctx.gen.not();
                Ok(Operand::value(Type::Boolean))
            }
            WrappedToken::Keyword(Keyword::Integer | Keyword::Char | Keyword::Boolean) => {
                self.parse_cast()
            }
            token if token == LEFT_ROUND => {
                self.advance()?;
                let inner = self.parse_expression()?;
                let ty = self.rvalue(inner);
                self.expect(RIGHT_ROUND)?;
                Ok(Operand::value(ty))
            }
            _ => self.syntax_error("a factor"),
        }
    }

    /// `integer(e)`, `char(e)` or `boolean(e)` for any standard-typed `e`.
    fn parse_cast(&mut self) -> CompileResult<Operand> {
        let target = self.parse_standard_type()?;
        self.expect(LEFT_ROUND)?;
        let operand = self.parse_expression()?;
        let ty = self.rvalue(operand);
        let from = match ty.as_standard() {
            Some(from) => from,
            None => return self.semantic_error(SemanticError::StandardTypeRequired { found: ty }),
        };
        self.expect(RIGHT_ROUND)?;
        self.ctx.gen.cast(from, target);
        Ok(Operand::value(Type::standard(target)))
    }

    /// Pushes the address of a variable or of an array element.
    pub(super) fn parse_variable(&mut self) -> CompileResult<Operand> {
        let line = self.line();
        let name = self.expect_name()?;
        let id = self.ctx.scope.resolve(&name, line).context(SemanticSnafu { line })?;
        let symbol = self.ctx.scope.symbol(id).clone();
        let ty = match symbol.ty.clone() {
            Some(Type::Procedure { .. }) => {
                return self.semantic_error(SemanticError::NotAVariable { name })
            }
            Some(ty) => ty,
            None => return self.semantic_error(SemanticError::Undeclared { name }),
        };

        if !self.check(&LEFT_SQUARE) {
            self.ctx.gen.push_address(&symbol);
            return Ok(Operand {
                ty,
                is_bare_variable: true,
                variable: Some(id),
            });
        }
        let (element, size) = match ty {
            Type::Array { element, size } => (element, size),
            _ => return self.semantic_error(SemanticError::NotAnArray { name }),
        };
        self.advance()?;
        let index = self.parse_expression()?;
        let index_ty = self.rvalue(index);
        if index_ty != Type::Integer {
            return self.semantic_error(SemanticError::IndexType { found: index_ty });
        }
        self.expect(RIGHT_SQUARE)?;
        self.ctx.gen.push_element_address(&symbol, size);
        Ok(Operand {
            ty: Type::standard(element),
            is_bare_variable: true,
            variable: Some(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::get_reserved_symbols;
    use crate::error::CompileError;
    use crate::symbol::StandardType;

    use super::*;

    /// Compiles `expression` as the right-hand side of an assignment to a
    /// variable of type `target`, returning the lines of the statement.
    fn expression_code(declarations: &str, target: &str, expression: &str) -> Vec<String> {
        let source = format!(
            "program p; var {} t : {}; begin t := {} end.",
            declarations, target, expression
        );
        let reserved_symbols = get_reserved_symbols();
        let code = Parser::new(&source, &reserved_symbols).unwrap().run().unwrap().code;
        code.into_iter()
            .skip_while(|line| line != "L0001")
            .skip(3)
            .take_while(|line| line != "\tRET")
            .collect()
    }

    fn expression_error(declarations: &str, target: &str, expression: &str) -> CompileError {
        let source = format!(
            "program p; var {} t : {}; begin t := {} end.",
            declarations, target, expression
        );
        let reserved_symbols = get_reserved_symbols();
        match Parser::new(&source, &reserved_symbols).and_then(Parser::run) {
            Err(err) => err,
            Ok(_) => panic!("{} compiled", expression),
        }
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            expression_code("", "integer", "-5"),
            [
                "\tPUSH\t5",
                "\tPOP\tgr2",
                "\tLD\tgr1, gr0",
                "\tSUBA\tgr1, gr2",
                "\tJOV\tEOVF",
                "\tPUSH\t0, gr1",
                "\tPOP\tgr2",
                "\tPOP\tgr1",
                "\tST\tgr2, 0, gr1",
            ]
        );
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(expression_code("", "integer", &shallow)[0], "\tPUSH\t1");

        let deep = format!("{}1{}", "(".repeat(50000), ")".repeat(50000));
        assert!(matches!(
            expression_error("", "integer", &deep),
            CompileError::Syntax { line: 1, .. }
        ));
        let negations = format!("{}true", "not ".repeat(50000));
        assert!(matches!(
            expression_error("", "boolean", &negations),
            CompileError::Syntax { line: 1, .. }
        ));
    }

    #[test]
    fn test_sign_applies_to_the_first_term() {
        let code = expression_code("", "integer", "-2 * 3 + 1");
        let mula = code.iter().position(|l| l == "\tMULA\tgr1, gr2").unwrap();
        let suba = code.iter().position(|l| l == "\tSUBA\tgr1, gr2").unwrap();
        let adda = code.iter().position(|l| l == "\tADDA\tgr1, gr2").unwrap();
        assert!(mula < suba && suba < adda);
    }

    #[test]
    fn test_element_read() {
        let code = expression_code("a : array[4] of char;", "char", "a[2]");
        assert_eq!(
            code,
            [
                "\tPUSH\t2",
                "\tPOP\tgr2",
                "\tLAD\tgr1, 3",
                "\tCPL\tgr2, gr1",
                "\tJPL\tEROV",
                "\tLAD\tgr1, $a",
                "\tADDA\tgr1, gr2",
                "\tJOV\tEOVF",
                "\tPUSH\t0, gr1",
                "\tPOP\tgr1",
                "\tLD\tgr1, 0, gr1",
                "\tPUSH\t0, gr1",
                "\tPOP\tgr2",
                "\tPOP\tgr1",
                "\tST\tgr2, 0, gr1",
            ]
        );
    }

    #[test]
    fn test_constants() {
        let code = expression_code("", "boolean", "true and not false");
        assert_eq!(&code[..2], ["\tPUSH\t1", "\tPUSH\t0"]);
        assert!(code.contains(&"\tXOR\tgr1, ONE".to_string()));
        let code = expression_code("", "char", "'A'");
        assert_eq!(code[0], "\tPUSH\t65");
    }

    #[test]
    fn test_casts() {
        let code = expression_code("", "char", "char(66)");
        assert_eq!(&code[..3], ["\tPUSH\t66", "\tPOP\tgr1", "\tLAD\tgr2, 127"]);
        let code = expression_code("c : char;", "integer", "integer(c)");
        assert_eq!(code.len(), 2 + 3 + 3);
        let code = expression_code("", "boolean", "boolean(0)");
        assert!(code.contains(&"\tJZE\tL0002".to_string()));
        assert!(code.contains(&"L0002".to_string()));
    }

    #[test]
    fn test_parentheses_force_a_value() {
        let code = expression_code("x : integer;", "integer", "(x)");
        assert_eq!(code.iter().filter(|l| *l == "\tLD\tgr1, 0, gr1").count(), 1);
    }

    #[test]
    fn test_operand_errors() {
        let err = expression_error("", "boolean", "not 1");
        assert!(matches!(
            err,
            CompileError::Semantic { source: SemanticError::OperandType { .. }, .. }
        ));
        let err = expression_error("", "integer", "+true");
        assert!(matches!(
            err,
            CompileError::Semantic {
                source: SemanticError::OperandType { found: Type::Boolean, .. },
                ..
            }
        ));
        let err = expression_error("a : array[2] of integer;", "boolean", "a = a");
        assert!(matches!(
            err,
            CompileError::Semantic { source: SemanticError::StandardTypeRequired { .. }, .. }
        ));
        let err = expression_error("a : array[2] of integer;", "integer", "integer(a)");
        match err {
            CompileError::Semantic { source: SemanticError::StandardTypeRequired { found }, .. } => {
                assert_eq!(found, Type::array(StandardType::Integer, 2))
            }
            other => panic!("{:?}", other),
        }
        let err = expression_error("", "integer", "1 div");
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
