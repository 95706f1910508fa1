use std::*;

use log::trace;

use crate::config::ReservedSymbolsTable;
use crate::error::{CompileResult, LexicalSnafu};
use token::*;

pub(crate) mod token;

/// Longest name or string literal the tokenizer accepts.
const MAX_STRING_LENGTH: usize = 1023;

/// On-demand tokenizer: the parser pulls one token at a time, so a lexical
/// error further down the file is only reported once parsing reaches it.
pub(crate) struct Tokenizer<'a> {
    source_code: &'a [u8],
    reserved_symbols: &'a ReservedSymbolsTable,
    i: usize,
    line_no: usize,
}

fn is_graphic(c: u8) -> bool {
    (0x20..=0x7e).contains(&c)
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(source_code: &'a str, reserved_symbols: &'a ReservedSymbolsTable) -> Self {
        Tokenizer {
            source_code: source_code.as_bytes(),
            reserved_symbols,
            i: 0,
            line_no: 1,
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.source_code.get(self.i + offset).copied()
    }

    fn error<T>(&self, message: String) -> CompileResult<T> {
        LexicalSnafu { line: self.line_no, message }.fail()
    }

    /// Consumes one line terminator; `\r\n` and `\n\r` count as a single one.
    fn skip_line_end(&mut self) {
        let curr = self.source_code[self.i];
        self.i += 1;
        match (curr, self.peek(0)) {
            (b'\r', Some(b'\n')) | (b'\n', Some(b'\r')) => self.i += 1,
            _ => (),
        }
        self.line_no += 1;
    }

    fn skip_comment(&mut self) -> CompileResult<()> {
        let opened_at = self.line_no;
        let closing: &[u8] = if self.peek(0) == Some(b'{') {
            self.i += 1;
            b"}"
        } else {
            self.i += 2;
            b"*/"
        };
        while self.i < self.source_code.len() {
            if self.source_code[self.i..].starts_with(closing) {
                self.i += closing.len();
                return Ok(());
            }
            match self.source_code[self.i] {
                b'\r' | b'\n' => self.skip_line_end(),
                _ => self.i += 1,
            }
        }
        self.error(format!(
            "comment opened in line {} is not closed before the end of file.",
            opened_at
        ))
    }

    fn read_name(&mut self) -> CompileResult<WrappedToken> {
        let start = self.i;
        while let Some(c) = self.peek(0) {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            self.i += 1;
        }
        let word = String::from_utf8_lossy(&self.source_code[start..self.i]).into_owned();
        if word.len() > MAX_STRING_LENGTH {
            return self.error(format!("name is longer than {} characters.", MAX_STRING_LENGTH));
        }
        Ok(match self.reserved_symbols.get(word.as_str()) {
            Some(keyword) => WrappedToken::Keyword(*keyword),
            None => WrappedToken::Name(word),
        })
    }

    fn read_number(&mut self) -> CompileResult<WrappedToken> {
        let start = self.i;
        let mut value: u32 = 0;
        while let Some(c) = self.peek(0) {
            if !c.is_ascii_digit() {
                break;
            }
            value = value.saturating_mul(10).saturating_add((c - b'0') as u32);
            self.i += 1;
        }
        if value > MAX_NUMBER as u32 {
            let digits = String::from_utf8_lossy(&self.source_code[start..self.i]).into_owned();
            return self.error(format!("number {} exceeds {}.", digits, MAX_NUMBER));
        }
        Ok(WrappedToken::Number(value as u16))
    }

    fn read_string(&mut self) -> CompileResult<WrappedToken> {
        let mut buffer = String::new();
        self.i += 1;
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some(b'\''), Some(b'\'')) => {
                    buffer.push('\'');
                    self.i += 2;
                }
                (Some(b'\''), _) => {
                    self.i += 1;
                    break;
                }
                (Some(c), _) if is_graphic(c) => {
                    buffer.push(c as char);
                    self.i += 1;
                }
                (Some(c), _) => {
                    return self.error(format!(
                        "string contains the non-graphic character 0x{:02x}.",
                        c
                    ));
                }
                (None, _) => {
                    return self.error("string is not closed before the end of file.".to_string());
                }
            }
        }
        if buffer.len() > MAX_STRING_LENGTH {
            return self.error(format!("string is longer than {} characters.", MAX_STRING_LENGTH));
        }
        Ok(WrappedToken::String(buffer))
    }

    fn read_symbol(&mut self) -> CompileResult<WrappedToken> {
        use BinaryRelation::*;

        let curr_char = self.source_code[self.i];
        let next_char = self.peek(1);
        let (token, len) = match (curr_char, next_char) {
            (b'+', _) => (WrappedToken::Operator(Operator::Plus), 1),
            (b'-', _) => (WrappedToken::Operator(Operator::Minus), 1),
            (b'*', _) => (WrappedToken::Operator(Operator::Asterisk), 1),
            (b'=', _) => (WrappedToken::Operator(Operator::Relation(Eq)), 1),
            (b'<', Some(b'>')) => (WrappedToken::Operator(Operator::Relation(Ne)), 2),
            (b'<', Some(b'=')) => (WrappedToken::Operator(Operator::Relation(Le)), 2),
            (b'<', _) => (WrappedToken::Operator(Operator::Relation(Lt)), 1),
            (b'>', Some(b'=')) => (WrappedToken::Operator(Operator::Relation(Ge)), 2),
            (b'>', _) => (WrappedToken::Operator(Operator::Relation(Gt)), 1),
            (b':', Some(b'=')) => (WrappedToken::Operator(Operator::Assign), 2),
            (b':', _) => (WrappedToken::Colon, 1),
            (b'.', _) => (WrappedToken::Dot, 1),
            (b',', _) => (WrappedToken::Comma, 1),
            (b';', _) => (WrappedToken::Semicolon, 1),
            (b'(' | b')' | b'[' | b']', _) => match Bracket::from_char(curr_char as char) {
                Some(br) => (WrappedToken::Bracket(br), 1),
                None => unreachable!(),
            },
            _ => {
                return self.error(format!(
                    "unknown character encountered: {}",
                    curr_char as char
                ))
            }
        };
        self.i += len;
        Ok(token)
    }

    /// Reads the next token. Once the source is exhausted every call
    /// returns [`WrappedToken::EndOfInput`].
    pub(crate) fn next_token(&mut self) -> CompileResult<Token> {
        let token = loop {
            let curr_char = match self.peek(0) {
                None => break WrappedToken::EndOfInput,
                Some(c) => c,
            };
            match curr_char {
                b'\r' | b'\n' => self.skip_line_end(),
                b' ' | b'\t' => self.i += 1,
                b'{' => self.skip_comment()?,
                b'/' if self.peek(1) == Some(b'*') => self.skip_comment()?,
                c if !is_graphic(c) => {
                    return self.error(format!("non-graphic character 0x{:02x} found.", c));
                }
                c if c.is_ascii_alphabetic() => break self.read_name()?,
                c if c.is_ascii_digit() => break self.read_number()?,
                b'\'' => break self.read_string()?,
                _ => break self.read_symbol()?,
            }
        };
        trace!("line {}: token {}", self.line_no, token);
        Ok(Token { token, line: self.line_no })
    }

    /// Tokenizes the whole source, end of input excluded.
    pub(crate) fn run(mut self) -> CompileResult<Vec<Token>> {
        let mut res = vec![];
        loop {
            let token = self.next_token()?;
            if token.token == WrappedToken::EndOfInput {
                return Ok(res);
            }
            res.push(token);
        }
    }
}

/// Occurrences of every token code, indexed like [`TOKEN_STRINGS`].
pub(crate) fn count_tokens(tokens: &[Token]) -> [usize; NUMBER_OF_TOKEN_CODES + 1] {
    let mut counts = [0; NUMBER_OF_TOKEN_CODES + 1];
    for code in tokens.iter().filter_map(|t| t.token.code()) {
        counts[code] += 1;
    }
    counts
}

/// Renders the token-count report, one line per token kind that occurs.
pub(crate) fn token_count_report(tokens: &[Token]) -> String {
    count_tokens(tokens)
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .map(|(code, n)| format!("{:<16}{}\n", format!("\"{}\"", TOKEN_STRINGS[code]), n))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::get_reserved_symbols;
    use crate::error::CompileError;

    use super::*;

    fn tokenizer_test(inp: &str, exp_out: Result<Vec<WrappedToken>, usize>) {
        let reserved_symbols = get_reserved_symbols();
        let res = Tokenizer::new(inp, &reserved_symbols).run();
        match (res, exp_out) {
            (Ok(tokens), Ok(expected)) => assert_eq!(
                tokens.into_iter().map(|t| t.token).collect::<Vec<_>>(),
                expected
            ),
            (Err(CompileError::Lexical { line, .. }), Err(expected_line)) => {
                assert_eq!(line, expected_line)
            }
            (res, exp_out) => panic!("expected {:?}, got {:?}", exp_out, res),
        }
    }

    #[test]
    fn test_keywords_and_names() {
        use Keyword::*;
        tokenizer_test(
            "program sample1a; var writeln2: integer;",
            Ok(vec![
                WrappedToken::Keyword(Program),
                WrappedToken::Name("sample1a".to_string()),
                WrappedToken::Semicolon,
                WrappedToken::Keyword(Var),
                WrappedToken::Name("writeln2".to_string()),
                WrappedToken::Colon,
                WrappedToken::Keyword(Integer),
                WrappedToken::Semicolon,
            ]),
        );
    }

    #[test]
    fn test_two_character_symbols() {
        use BinaryRelation::*;
        tokenizer_test(
            "a:=b<>c<=d>=e<f>g:h",
            Ok(vec![
                WrappedToken::Name("a".to_string()),
                WrappedToken::Operator(Operator::Assign),
                WrappedToken::Name("b".to_string()),
                WrappedToken::Operator(Operator::Relation(Ne)),
                WrappedToken::Name("c".to_string()),
                WrappedToken::Operator(Operator::Relation(Le)),
                WrappedToken::Name("d".to_string()),
                WrappedToken::Operator(Operator::Relation(Ge)),
                WrappedToken::Name("e".to_string()),
                WrappedToken::Operator(Operator::Relation(Lt)),
                WrappedToken::Name("f".to_string()),
                WrappedToken::Operator(Operator::Relation(Gt)),
                WrappedToken::Name("g".to_string()),
                WrappedToken::Colon,
                WrappedToken::Name("h".to_string()),
            ]),
        );
    }

    #[test]
    fn test_strings_with_escaped_quote() {
        tokenizer_test(
            "'It''s' 'a'",
            Ok(vec![
                WrappedToken::String("It's".to_string()),
                WrappedToken::String("a".to_string()),
            ]),
        );
    }

    #[test]
    fn test_comments_are_skipped_and_counted() {
        let reserved_symbols = get_reserved_symbols();
        let tokens = Tokenizer::new("{ one\ntwo }\n/* three\r\n*/ x", &reserved_symbols)
            .run()
            .unwrap();
        assert_eq!(tokens, vec![Token { token: WrappedToken::Name("x".to_string()), line: 4 }]);
    }

    #[test]
    fn test_line_ends() {
        let reserved_symbols = get_reserved_symbols();
        let tokens = Tokenizer::new("a\r\nb\n\rc\rd\ne", &reserved_symbols).run().unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.line).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_number_limit() {
        tokenizer_test("32767", Ok(vec![WrappedToken::Number(32767)]));
        tokenizer_test("\n32768", Err(2));
    }

    #[test]
    fn test_lexical_errors() {
        tokenizer_test("a ? b", Err(1));
        tokenizer_test("x\n'abc", Err(2));
        tokenizer_test("'ab\ncd'", Err(1));
        tokenizer_test("{ never closed\n", Err(2));
        tokenizer_test("/* never closed", Err(1));
        tokenizer_test("a / b", Err(1));
    }

    #[test]
    fn test_end_of_input_repeats() {
        let reserved_symbols = get_reserved_symbols();
        let mut tokenizer = Tokenizer::new("x", &reserved_symbols);
        assert_eq!(tokenizer.next_token().unwrap().token, WrappedToken::Name("x".to_string()));
        assert_eq!(tokenizer.next_token().unwrap().token, WrappedToken::EndOfInput);
        assert_eq!(tokenizer.next_token().unwrap().token, WrappedToken::EndOfInput);
    }

    #[test]
    fn test_token_count_report() {
        let reserved_symbols = get_reserved_symbols();
        let tokens = Tokenizer::new("program p; begin x := x + 1 end.", &reserved_symbols)
            .run()
            .unwrap();
        let counts = count_tokens(&tokens);
        assert_eq!(counts[1], 3);
        assert_eq!(counts[29], 1);
        assert_eq!(
            token_count_report(&tokens),
            "\"NAME\"          3\n\
             \"program\"       1\n\
             \"begin\"         1\n\
             \"end\"           1\n\
             \"NUMBER\"        1\n\
             \"+\"             1\n\
             \":=\"            1\n\
             \".\"             1\n\
             \";\"             1\n"
        );
    }
}
