//! Source listing rebuilt from the tokens the parser consumes.
//!
//! Spacing between two tokens is decided here; the parser only says where
//! lines break and when the indentation level changes.

use crate::tokenizer::token::*;

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub(crate) struct PrettyPrinter {
    text: String,
    indent_level: usize,
    previous: Option<WrappedToken>,
    /// The last token written was a unary sign.
    after_sign: bool,
}

fn is_left_bracket(token: &WrappedToken) -> bool {
    matches!(
        token,
        WrappedToken::Bracket(Bracket { left_or_right: LeftOrRight::Left, .. })
    )
}

/// Tokens written directly before their opening bracket: `a[i]`, `q(x)`,
/// `char(n)`, `write(c)`, `array[10]`.
fn takes_brackets(token: &WrappedToken) -> bool {
    use Keyword::*;

    matches!(
        token,
        WrappedToken::Name(_)
            | WrappedToken::Keyword(
                Array | Integer | Char | Boolean | Read | Readln | Write | Writeln
            )
    )
}

fn ends_operand(token: &WrappedToken) -> bool {
    matches!(
        token,
        WrappedToken::Name(_)
            | WrappedToken::Number(_)
            | WrappedToken::String(_)
            | WrappedToken::Keyword(Keyword::True | Keyword::False)
            | WrappedToken::Bracket(Bracket { left_or_right: LeftOrRight::Right, .. })
    )
}

fn spelling(token: &WrappedToken) -> String {
    match token {
        WrappedToken::String(text) => format!("'{}'", text.replace('\'', "''")),
        token => token.to_string(),
    }
}

impl PrettyPrinter {
    fn at_line_start(&self) -> bool {
        self.text.is_empty() || self.text.ends_with('\n')
    }

    fn needs_space(&self, token: &WrappedToken) -> bool {
        let previous = match &self.previous {
            Some(previous) => previous,
            None => return false,
        };
        if self.after_sign || is_left_bracket(previous) {
            return false;
        }
        match token {
            WrappedToken::Comma | WrappedToken::Semicolon | WrappedToken::Dot => false,
            WrappedToken::Bracket(Bracket { left_or_right: LeftOrRight::Right, .. }) => false,
            WrappedToken::Bracket(_) => !takes_brackets(previous),
            _ => true,
        }
    }

    pub(crate) fn token(&mut self, token: &WrappedToken) {
        if *token == WrappedToken::EndOfInput {
            return;
        }
        if self.at_line_start() {
            self.text.push_str(&INDENT.repeat(self.indent_level));
        } else if self.needs_space(token) {
            self.text.push(' ');
        }
        self.text.push_str(&spelling(token));

        let is_sign = matches!(token, WrappedToken::Operator(Operator::Plus | Operator::Minus));
        self.after_sign = is_sign && !self.previous.as_ref().map_or(false, ends_operand);
        self.previous = Some(token.clone());
    }

    /// Ends the current line. Does nothing on an empty line, so an empty
    /// statement before `end` leaves no blank line behind.
    pub(crate) fn line_break(&mut self) {
        if !self.at_line_start() {
            self.text.push('\n');
        }
    }

    pub(crate) fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub(crate) fn finish(mut self) -> String {
        self.line_break();
        self.text
    }
}
