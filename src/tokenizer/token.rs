use std::*;
use fmt::{Display, Formatter};

/// Number of distinct token codes, `NAME` is 1 and `break` is the last one.
pub(crate) const NUMBER_OF_TOKEN_CODES: usize = 49;

/// Spelling of every token code, indexed by [`WrappedToken::code`].
pub(crate) const TOKEN_STRINGS: [&str; NUMBER_OF_TOKEN_CODES + 1] = [
    "", "NAME", "program", "var", "array", "of", "begin",
    "end", "if", "then", "else", "procedure", "return", "call",
    "while", "do", "not", "or", "div", "and", "char",
    "integer", "boolean", "readln", "writeln", "true", "false", "NUMBER",
    "STRING", "+", "-", "*", "=", "<>", "<",
    "<=", ">", ">=", "(", ")", "[", "]",
    ":=", ".", ",", ":", ";", "read", "write",
    "break",
];

/// Largest value an unsigned integer literal may have.
pub(crate) const MAX_NUMBER: u16 = 32767;

#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash)]
pub(crate) enum BracketType {
    Round,
    Square,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub(crate) enum LeftOrRight {
    Left,
    Right,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash)]
pub(crate) struct Bracket {
    pub(crate) left_or_right: LeftOrRight,
    pub(crate) bracket_type: BracketType,
}

impl Bracket {
    pub(crate) fn from_char(c: char) -> Option<Bracket> {
        use BracketType::*;
        use LeftOrRight::*;

        let (left_or_right, bracket_type) = match c {
            '(' => (Left, Round),
            ')' => (Right, Round),
            '[' => (Left, Square),
            ']' => (Right, Square),
            _ => return None,
        };
        Some(Bracket { left_or_right, bracket_type })
    }

    pub(crate) const fn new(left_or_right: LeftOrRight, bracket_type: BracketType) -> Self {
        Bracket { left_or_right, bracket_type }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub(crate) enum BinaryRelation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Display for BinaryRelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BinaryRelation::Eq => "=",
                BinaryRelation::Ne => "<>",
                BinaryRelation::Lt => "<",
                BinaryRelation::Le => "<=",
                BinaryRelation::Gt => ">",
                BinaryRelation::Ge => ">=",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum Operator {
    Plus,
    Minus,
    Asterisk,
    Relation(BinaryRelation),
    Assign,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Plus => write!(f, "+"),
            Operator::Minus => write!(f, "-"),
            Operator::Asterisk => write!(f, "*"),
            Operator::Relation(rel) => write!(f, "{}", rel),
            Operator::Assign => write!(f, ":="),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub(crate) enum Keyword {
    Program,
    Var,
    Array,
    Of,
    Begin,
    End,
    If,
    Then,
    Else,
    Procedure,
    Return,
    Call,
    While,
    Do,
    Not,
    Or,
    Div,
    And,
    Char,
    Integer,
    Boolean,
    Readln,
    Writeln,
    True,
    False,
    Read,
    Write,
    Break,
}

impl Keyword {
    fn code(&self) -> usize {
        use Keyword::*;
        match self {
            Program => 2,
            Var => 3,
            Array => 4,
            Of => 5,
            Begin => 6,
            End => 7,
            If => 8,
            Then => 9,
            Else => 10,
            Procedure => 11,
            Return => 12,
            Call => 13,
            While => 14,
            Do => 15,
            Not => 16,
            Or => 17,
            Div => 18,
            And => 19,
            Char => 20,
            Integer => 21,
            Boolean => 22,
            Readln => 23,
            Writeln => 24,
            True => 25,
            False => 26,
            Read => 47,
            Write => 48,
            Break => 49,
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", TOKEN_STRINGS[self.code()])
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum WrappedToken {
    Name(String),
    Keyword(Keyword),
    Number(u16),
    String(String),
    Operator(Operator),
    Bracket(Bracket),
    Dot,
    Comma,
    Colon,
    Semicolon,
    EndOfInput,
}

impl WrappedToken {
    /// Token code as numbered by the MPPL token table, `None` for end of input.
    pub(crate) fn code(&self) -> Option<usize> {
        use BracketType::*;
        use LeftOrRight::*;

        let code = match self {
            WrappedToken::Name(_) => 1,
            WrappedToken::Keyword(kw) => kw.code(),
            WrappedToken::Number(_) => 27,
            WrappedToken::String(_) => 28,
            WrappedToken::Operator(op) => match op {
                Operator::Plus => 29,
                Operator::Minus => 30,
                Operator::Asterisk => 31,
                Operator::Relation(rel) => match rel {
                    BinaryRelation::Eq => 32,
                    BinaryRelation::Ne => 33,
                    BinaryRelation::Lt => 34,
                    BinaryRelation::Le => 35,
                    BinaryRelation::Gt => 36,
                    BinaryRelation::Ge => 37,
                },
                Operator::Assign => 42,
            },
            WrappedToken::Bracket(br) => match (br.left_or_right, br.bracket_type) {
                (Left, Round) => 38,
                (Right, Round) => 39,
                (Left, Square) => 40,
                (Right, Square) => 41,
            },
            WrappedToken::Dot => 43,
            WrappedToken::Comma => 44,
            WrappedToken::Colon => 45,
            WrappedToken::Semicolon => 46,
            WrappedToken::EndOfInput => return None,
        };
        Some(code)
    }

    pub(crate) fn is_keyword(&self, keyword: Keyword) -> bool {
        *self == WrappedToken::Keyword(keyword)
    }
}

impl Display for WrappedToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WrappedToken::Name(name) => write!(f, "{}", name),
            WrappedToken::Number(n) => write!(f, "{}", n),
            WrappedToken::String(s) => write!(f, "'{}'", s),
            WrappedToken::EndOfInput => write!(f, "end of input"),
            t => write!(f, "{}", TOKEN_STRINGS[t.code().unwrap_or_default()]),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Token {
    pub(crate) token: WrappedToken,
    pub(crate) line: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (line {})", self.token, self.line)
    }
}
