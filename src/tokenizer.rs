use std::fmt::Display;

use crate::error::{ErrorKind, LanguageError};

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Brackets
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // Punctuation
    Comma,
    Dot,
    Colon,
    Ellipsis,
    FatArrow,

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    QuestionQuestion,

    // Compound assignment
    PlusEqual,
    MinusEqual,
    StarEqual,
    StarStarEqual,
    SlashEqual,
    PercentEqual,
    AndAndEqual,
    OrOrEqual,
    QuestionQuestionEqual,

    // Literals
    Identifier(String),
    String(String),
    Number(f64),

    // Keywords
    And,
    As,
    Const,
    Else,
    False,
    From,
    If,
    Import,
    Let,
    Null,
    Or,
    Return,
    True,
    Try,
    While,

    // Layout
    Newline,
    BlockStart,
    BlockEnd,
    Eof,
}

impl TokenKind {
    /// Whether a statement may end with this token, so a following newline is
    /// significant.
    fn ends_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Return
        )
    }

    /// Whether a line starting with this token can only be continuing the
    /// expression from the previous line.
    fn continues_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::Dot
                | TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::RightBrace
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::FatArrow
                | TokenKind::Plus
                | TokenKind::Star
                | TokenKind::StarStar
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Equal
                | TokenKind::EqualEqual
                | TokenKind::BangEqual
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::QuestionQuestion
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::StarStarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
                | TokenKind::AndAndEqual
                | TokenKind::OrOrEqual
                | TokenKind::QuestionQuestionEqual
                | TokenKind::And
                | TokenKind::Or
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Ellipsis => "...",
            TokenKind::FatArrow => "=>",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::QuestionQuestion => "??",
            TokenKind::PlusEqual => "+=",
            TokenKind::MinusEqual => "-=",
            TokenKind::StarEqual => "*=",
            TokenKind::StarStarEqual => "**=",
            TokenKind::SlashEqual => "/=",
            TokenKind::PercentEqual => "%=",
            TokenKind::AndAndEqual => "&&=",
            TokenKind::OrOrEqual => "||=",
            TokenKind::QuestionQuestionEqual => "??=",
            TokenKind::Identifier(name) => return write!(f, "{name}"),
            TokenKind::String(_) => "string",
            TokenKind::Number(n) => return write!(f, "{n}"),
            TokenKind::And => "and",
            TokenKind::As => "as",
            TokenKind::Const => "const",
            TokenKind::Else => "else",
            TokenKind::False => "false",
            TokenKind::From => "from",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::Let => "let",
            TokenKind::Null => "null",
            TokenKind::Or => "or",
            TokenKind::Return => "return",
            TokenKind::True => "true",
            TokenKind::Try => "try",
            TokenKind::While => "while",
            TokenKind::Newline => "newline",
            TokenKind::BlockStart => "block start",
            TokenKind::BlockEnd => "block end",
            TokenKind::Eof => "end of file",
        };
        write!(f, "{text}")
    }
}

/// Converts source text into tokens, resolving indentation into block tokens
/// and deciding which newlines separate statements.
///
/// Stops at the first error.
pub fn tokens(source: &str) -> Result<Vec<Token>, LanguageError> {
    Tokenizer::new(source).run()
}

const SPACES_PER_LEVEL: usize = 2;

struct Tokenizer<'a> {
    remaining: &'a str,
    line: usize,
    block_level: usize,
    bracket_depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            remaining: source,
            line: 1,
            block_level: 0,
            bracket_depth: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LanguageError> {
        self.line_start();

        loop {
            self.skip_whitespace_and_comments();

            if self.remaining.is_empty() {
                break;
            }

            if let Some(rest) = self.remaining.strip_prefix('\n') {
                self.remaining = rest;
                self.line += 1;
                self.line_start();
                continue;
            }

            let remaining = self.remaining;
            if remaining.starts_with(['"', '\'', '`']) {
                let (value, rest, newlines) = string(remaining)
                    .map_err(|kind| LanguageError::new(kind).with_line(self.line))?;
                let text = &remaining[..remaining.len() - rest.len()];
                self.push(TokenKind::String(value), text, self.line);
                self.line += newlines;
                self.remaining = rest;
                continue;
            }

            let Some((kind, rest)) = token(remaining) else {
                let c = remaining.chars().next().unwrap_or_default();
                return Err(
                    LanguageError::new(ErrorKind::UnexpectedCharacter(c)).with_line(self.line)
                );
            };

            match kind {
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    self.bracket_depth += 1
                }
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1)
                }
                _ => {}
            }

            let text = &remaining[..remaining.len() - rest.len()];
            self.push(kind, text, self.line);
            self.remaining = rest;
        }

        for _ in 0..self.block_level {
            self.push(TokenKind::BlockEnd, "", self.line);
        }
        self.push(TokenKind::Eof, "", self.line);

        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, text: &str, line: usize) {
        let text = if text.is_empty() {
            kind.to_string()
        } else {
            text.to_string()
        };
        self.tokens.push(Token { kind, line, text });
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let trimmed = self.remaining.trim_start_matches([' ', '\t', '\r']);
            let trimmed = if trimmed.starts_with("//") {
                trimmed.find('\n').map_or("", |end| &trimmed[end..])
            } else {
                trimmed
            };

            if trimmed.len() == self.remaining.len() {
                return;
            }
            self.remaining = trimmed;
        }
    }

    /// Called at the start of every physical line. Skips blank and comment-only
    /// lines, then either treats the next line as a continuation of the
    /// current expression or emits a separator and block tokens.
    fn line_start(&mut self) {
        if self.bracket_depth > 0 {
            return;
        }

        let indent = loop {
            let content = self.remaining.trim_start_matches([' ', '\t']);
            let indent: usize = self.remaining[..self.remaining.len() - content.len()]
                .chars()
                .map(|c| if c == '\t' { SPACES_PER_LEVEL } else { 1 })
                .sum();

            let blank = content.starts_with('\n')
                || content.starts_with("\r\n")
                || content.starts_with("//");
            if !blank {
                self.remaining = content;
                break indent;
            }

            match content.find('\n') {
                Some(end) => {
                    self.remaining = &content[end + 1..];
                    self.line += 1;
                }
                None => {
                    self.remaining = "";
                    return;
                }
            }
        };

        if self.remaining.is_empty() {
            return;
        }

        if token(self.remaining).is_some_and(|(kind, _)| kind.continues_expression()) {
            return;
        }

        let previous_ends_statement = self
            .tokens
            .last()
            .is_some_and(|token| token.kind.ends_statement());
        if previous_ends_statement {
            let line = self.tokens.last().map_or(self.line, |token| token.line);
            self.push(TokenKind::Newline, "", line);
        }

        let level = indent / SPACES_PER_LEVEL;
        while self.block_level < level {
            self.block_level += 1;
            self.push(TokenKind::BlockStart, "", self.line);
        }
        while self.block_level > level {
            self.block_level -= 1;
            self.push(TokenKind::BlockEnd, "", self.line);
        }
    }
}

/// Reads a single non-string token from the front of `source`, preferring the
/// longest match.
fn token(source: &str) -> Option<(TokenKind, &str)> {
    maximal(
        &[
            // brackets and punctuation
            left_paren,
            right_paren,
            left_bracket,
            right_bracket,
            left_brace,
            right_brace,
            comma,
            dot,
            colon,
            semicolon,
            ellipsis,
            fat_arrow,
            // operators
            plus,
            minus,
            star,
            star_star,
            slash,
            percent,
            bang,
            equal,
            equal_equal,
            bang_equal,
            less,
            less_equal,
            greater,
            greater_equal,
            and_and,
            or_or,
            question_question,
            plus_equal,
            minus_equal,
            star_equal,
            star_star_equal,
            slash_equal,
            percent_equal,
            and_and_equal,
            or_or_equal,
            question_question_equal,
            // keywords
            and,
            as_,
            const_,
            else_,
            false_,
            from,
            if_,
            import,
            let_,
            null,
            or,
            return_,
            true_,
            try_,
            while_,
            // literals
            identifier,
            number,
        ],
        source,
    )
}

fn maximal<'a, T: std::fmt::Debug>(
    parsers: &[fn(&str) -> Option<(T, &str)>],
    source: &'a str,
) -> Option<(T, &'a str)> {
    let mut min_left = source.len() + 1;
    let mut max_match = None;

    let matching_parsers = parsers.iter().filter_map(|parser| parser(source));
    for (m, rest) in matching_parsers {
        let left = rest.len();
        if left < min_left {
            min_left = left;
            max_match = Some((m, rest));
        }
    }

    max_match
}

macro_rules! match_literal {
    ($name:ident, $word:literal, $token:expr) => {
        fn $name(source: &str) -> Option<(TokenKind, &str)> {
            source
                .strip_prefix($word)
                .map(|rest| ($token, rest))
        }
    };
}

macro_rules! match_keyword {
    ($name:ident, $word:literal, $token:expr) => {
        fn $name(source: &str) -> Option<(TokenKind, &str)> {
            let rest = source.strip_prefix($word)?;
            if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
                None
            } else {
                Some(($token, rest))
            }
        }
    };
}

match_literal! { left_paren, "(", TokenKind::LeftParen }
match_literal! { right_paren, ")", TokenKind::RightParen }
match_literal! { left_bracket, "[", TokenKind::LeftBracket }
match_literal! { right_bracket, "]", TokenKind::RightBracket }
match_literal! { left_brace, "{", TokenKind::LeftBrace }
match_literal! { right_brace, "}", TokenKind::RightBrace }
match_literal! { comma, ",", TokenKind::Comma }
match_literal! { dot, ".", TokenKind::Dot }
match_literal! { colon, ":", TokenKind::Colon }
match_literal! { semicolon, ";", TokenKind::Newline }
match_literal! { ellipsis, "...", TokenKind::Ellipsis }
match_literal! { fat_arrow, "=>", TokenKind::FatArrow }
match_literal! { plus, "+", TokenKind::Plus }
match_literal! { minus, "-", TokenKind::Minus }
match_literal! { star, "*", TokenKind::Star }
match_literal! { star_star, "**", TokenKind::StarStar }
match_literal! { slash, "/", TokenKind::Slash }
match_literal! { percent, "%", TokenKind::Percent }
match_literal! { bang, "!", TokenKind::Bang }
match_literal! { equal, "=", TokenKind::Equal }
match_literal! { equal_equal, "==", TokenKind::EqualEqual }
match_literal! { bang_equal, "!=", TokenKind::BangEqual }
match_literal! { less, "<", TokenKind::Less }
match_literal! { less_equal, "<=", TokenKind::LessEqual }
match_literal! { greater, ">", TokenKind::Greater }
match_literal! { greater_equal, ">=", TokenKind::GreaterEqual }
match_literal! { and_and, "&&", TokenKind::AndAnd }
match_literal! { or_or, "||", TokenKind::OrOr }
match_literal! { question_question, "??", TokenKind::QuestionQuestion }
match_literal! { plus_equal, "+=", TokenKind::PlusEqual }
match_literal! { minus_equal, "-=", TokenKind::MinusEqual }
match_literal! { star_equal, "*=", TokenKind::StarEqual }
match_literal! { star_star_equal, "**=", TokenKind::StarStarEqual }
match_literal! { slash_equal, "/=", TokenKind::SlashEqual }
match_literal! { percent_equal, "%=", TokenKind::PercentEqual }
match_literal! { and_and_equal, "&&=", TokenKind::AndAndEqual }
match_literal! { or_or_equal, "||=", TokenKind::OrOrEqual }
match_literal! { question_question_equal, "??=", TokenKind::QuestionQuestionEqual }
match_keyword! { and, "and", TokenKind::And }
match_keyword! { as_, "as", TokenKind::As }
match_keyword! { const_, "const", TokenKind::Const }
match_keyword! { else_, "else", TokenKind::Else }
match_keyword! { false_, "false", TokenKind::False }
match_keyword! { from, "from", TokenKind::From }
match_keyword! { if_, "if", TokenKind::If }
match_keyword! { import, "import", TokenKind::Import }
match_keyword! { let_, "let", TokenKind::Let }
match_keyword! { null, "null", TokenKind::Null }
match_keyword! { or, "or", TokenKind::Or }
match_keyword! { return_, "return", TokenKind::Return }
match_keyword! { true_, "true", TokenKind::True }
match_keyword! { try_, "try", TokenKind::Try }
match_keyword! { while_, "while", TokenKind::While }

fn identifier(source: &str) -> Option<(TokenKind, &str)> {
    let mut chars = source.chars();

    let first = chars.next()?;
    if !first.is_ascii_alphabetic() && first != '_' && first != '$' {
        return None;
    }

    let len = first.len_utf8()
        + chars
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
            .map(char::len_utf8)
            .sum::<usize>();

    Some((
        TokenKind::Identifier(source[..len].to_string()),
        &source[len..],
    ))
}

/// Digits with `_` separators and at most one fractional part. A `.` only
/// belongs to the number when a digit follows it, so `1.2.3` is two numbers
/// and `1.toString` is a number then a dot.
fn number(source: &str) -> Option<(TokenKind, &str)> {
    let bytes = source.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut seen_dot = false;
    let mut len = match bytes.first()? {
        b'.' if digit_at(1) => {
            seen_dot = true;
            1
        }
        c if c.is_ascii_digit() => 1,
        _ => return None,
    };

    while let Some(&c) = bytes.get(len) {
        if c.is_ascii_digit() || c == b'_' {
            len += 1;
        } else if c == b'.' && !seen_dot && digit_at(len + 1) {
            seen_dot = true;
            len += 1;
        } else {
            break;
        }
    }

    let mut text: String = source[..len].chars().filter(|c| *c != '_').collect();
    if text.starts_with('.') {
        text.insert(0, '0');
    }

    Some((TokenKind::Number(text.parse().ok()?), &source[len..]))
}

/// Reads a string literal, returning its unescaped value, the remaining source
/// and the number of newlines it spanned. Only backtick strings may span lines.
fn string(source: &str) -> Result<(String, &str, usize), ErrorKind> {
    let mut chars = source.char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(ErrorKind::UnterminatedString);
    };

    let mut value = String::new();
    let mut newlines = 0;
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((value, &source[i + c.len_utf8()..], newlines)),
            '\n' if quote != '`' => return Err(ErrorKind::UnterminatedString),
            '\n' => {
                newlines += 1;
                value.push('\n');
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '0')) => value.push('\0'),
                Some((_, '\n')) => {
                    newlines += 1;
                    value.push('\n');
                }
                Some((_, escaped)) => value.push(escaped),
                None => return Err(ErrorKind::UnterminatedString),
            },
            c => value.push(c),
        }
    }

    Err(ErrorKind::UnterminatedString)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokens(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn identifier(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_string())
    }

    #[test]
    fn test_tokens() {
        let expected = vec![
            TokenKind::Let,
            identifier("x"),
            TokenKind::Equal,
            TokenKind::Number(1.0),
            TokenKind::Eof,
        ];
        assert_eq!(kinds("let x = 1"), expected);
    }

    #[test]
    fn test_tokens_with_comments() {
        let expected = vec![
            TokenKind::Let,
            identifier("x"),
            TokenKind::Equal,
            TokenKind::Number(1.0),
            TokenKind::Eof,
        ];
        assert_eq!(kinds("let x = 1 // comment"), expected);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("letter import_ orange"),
            vec![
                identifier("letter"),
                identifier("import_"),
                identifier("orange"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a **= b ?? c => ..."),
            vec![
                identifier("a"),
                TokenKind::StarStarEqual,
                identifier("b"),
                TokenKind::QuestionQuestion,
                identifier("c"),
                TokenKind::FatArrow,
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1_000 .5 2.25"),
            vec![
                TokenKind::Number(1000.0),
                TokenKind::Number(0.5),
                TokenKind::Number(2.25),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_second_dot_starts_new_token() {
        assert_eq!(
            kinds("1.2.3"),
            vec![
                TokenKind::Number(1.2),
                TokenKind::Number(0.3),
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("1.toString"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Dot,
                identifier("toString"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#"'a' "b\n" `c`"#),
            vec![
                TokenKind::String("a".to_string()),
                TokenKind::String("b\n".to_string()),
                TokenKind::String("c".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_backtick_strings_span_lines() {
        let tokens = tokens("`a\nb`\nc").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("a\nb".to_string()));
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].kind, identifier("c"));
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let error = tokens("let a = 1\nlet b = 'abc\n'").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnterminatedString);
        assert_eq!(error.line, 2);

        let error = tokens("`never closed").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnterminatedString);
    }

    #[test]
    fn test_unexpected_character() {
        let error = tokens("a\n\nb @ c").unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnexpectedCharacter('@'));
        assert_eq!(error.line, 3);
    }

    #[test]
    fn test_newline_separates_statements() {
        assert_eq!(
            kinds("a\nb"),
            vec![
                identifier("a"),
                TokenKind::Newline,
                identifier("b"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_semicolon_separates_statements() {
        assert_eq!(
            kinds("a; b"),
            vec![
                identifier("a"),
                TokenKind::Newline,
                identifier("b"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_newline_after_operator_is_ignored() {
        assert_eq!(
            kinds("a +\nb"),
            vec![
                identifier("a"),
                TokenKind::Plus,
                identifier("b"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_continuation_line_is_joined() {
        assert_eq!(
            kinds("list\n    .map(f)\n  .length"),
            vec![
                identifier("list"),
                TokenKind::Dot,
                identifier("map"),
                TokenKind::LeftParen,
                identifier("f"),
                TokenKind::RightParen,
                TokenKind::Dot,
                identifier("length"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_ignored() {
        assert_eq!(
            kinds("[\n  1,\n  2\n]"),
            vec![
                TokenKind::LeftBracket,
                TokenKind::Number(1.0),
                TokenKind::Comma,
                TokenKind::Number(2.0),
                TokenKind::RightBracket,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_indentation_blocks() {
        let source = "if (a)\n  b\n  c\nd";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::If,
                TokenKind::LeftParen,
                identifier("a"),
                TokenKind::RightParen,
                TokenKind::Newline,
                TokenKind::BlockStart,
                identifier("b"),
                TokenKind::Newline,
                identifier("c"),
                TokenKind::Newline,
                TokenKind::BlockEnd,
                identifier("d"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_blocks_closed_at_end_of_input() {
        let source = "a =>\n  b =>\n    c";
        assert_eq!(
            kinds(source),
            vec![
                identifier("a"),
                TokenKind::FatArrow,
                TokenKind::BlockStart,
                identifier("b"),
                TokenKind::FatArrow,
                TokenKind::BlockStart,
                identifier("c"),
                TokenKind::BlockEnd,
                TokenKind::BlockEnd,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_do_not_change_blocks() {
        let source = "a =>\n  b\n\n// note\n  c";
        assert_eq!(
            kinds(source),
            vec![
                identifier("a"),
                TokenKind::FatArrow,
                TokenKind::BlockStart,
                identifier("b"),
                TokenKind::Newline,
                identifier("c"),
                TokenKind::BlockEnd,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lines_are_tracked() {
        let tokens = tokens("a\n\n  // skipped\nb").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].text, "b");
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_tokenizing_is_deterministic() {
        let source = "let f = (a, ...b) =>\n  return a + b.length\nf(1, 2, 3)";
        assert_eq!(tokens(source).unwrap(), tokens(source).unwrap());
    }
}
