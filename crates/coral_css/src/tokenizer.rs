//! CSS tokenizer according to the [w3 specification](https://www.w3.org/TR/css-syntax-3/#tokenization),
//! extended with the lexical modes the rule parser switches between:
//! selector context lexes attribute matchers and column combinators,
//! value context lexes media-feature comparators.

use crate::errors::{ErrorChannel, ErrorCode};
use coral_shared::text_stream::Character::Ch;
use coral_shared::text_stream::{Character, Location, LocationHandler, Stream, TextStream};
use std::fmt;
use std::rc::Rc;

pub type Number = f32;

const CHAR_REPLACEMENT: char = '\u{FFFD}';
const CHAR_MAX_ALLOWED: char = '\u{10FFFF}';

/// Lexical mode of the tokenizer. The rule parser sets the mode before
/// requesting the next token; the tokenizer never reads ahead across a
/// mode boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerMode {
    /// The normal CSS syntax
    #[default]
    Data,
    /// Inside a selector: attribute matchers, `||`, combinator delims
    Selector,
    /// Inside a value: `<`, `>`, `<=`, `>=` comparators
    Value,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// An `@keyword` token. The value does not include the `@` marker.
    AtKeyword(String),
    Ident(String),
    Function(String),
    Url(String),
    BadUrl(String),
    Dimension {
        value: Number,
        unit: String,
    },
    Percentage(Number),
    Number(Number),
    /// A numeric token without decimal point or exponent
    Integer(i32),
    /// A string token. The value does not include the quotes.
    QuotedString(String),
    /// A `<bad-string-token>`; always indicates a parse error.
    BadString(String),
    Whitespace,
    Comment(String),
    /// A hash token with the type flag set to "unrestricted"
    Hash(String),
    /// A hash token that is a valid ID selector
    IdHash(String),
    Delim(char),
    LCurly,
    RCurly,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    // A `<!--` token
    Cdo,
    // A `-->` token
    Cdc,
    // Attribute matchers, only lexed in selector mode
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
    /// `^=`
    PrefixMatch,
    /// `$=`
    SuffixMatch,
    /// `*=`
    SubstringMatch,
    /// `!=`
    NotMatch,
    /// `||`
    Column,
    // Media feature comparators, only lexed in value mode
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Eof,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    /// Type of the token
    pub token_type: TokenType,
    /// Location where the token started in the stream
    pub location: Location,
}

impl Token {
    /// Returns a new token for the given type on the given location
    fn new(token_type: TokenType, location: Location) -> Token {
        Token { token_type, location }
    }

    fn new_delim(c: char, location: Location) -> Token {
        Token::new(TokenType::Delim(c), location)
    }

    fn new_id_hash(value: &str, location: Location) -> Token {
        Token::new(TokenType::IdHash(value.to_string()), location)
    }

    fn new_hash(value: &str, location: Location) -> Token {
        Token::new(TokenType::Hash(value.to_string()), location)
    }

    fn new_atkeyword(keyword: &str, location: Location) -> Token {
        Token::new(TokenType::AtKeyword(keyword.to_string()), location)
    }

    fn new_number(value: Number, location: Location) -> Token {
        Token::new(TokenType::Number(value), location)
    }

    fn new_integer(value: i32, location: Location) -> Token {
        Token::new(TokenType::Integer(value), location)
    }

    fn new_percentage(value: Number, location: Location) -> Token {
        Token::new(TokenType::Percentage(value), location)
    }

    fn new_dimension(value: Number, unit: &str, location: Location) -> Token {
        Token::new(
            TokenType::Dimension {
                value,
                unit: unit.to_string(),
            },
            location,
        )
    }

    fn new_ident(value: &str, location: Location) -> Token {
        Token::new(TokenType::Ident(value.to_string()), location)
    }

    fn new_function(value: &str, location: Location) -> Token {
        Token::new(TokenType::Function(value.to_string()), location)
    }

    fn new_quoted_string(value: &str, location: Location) -> Token {
        Token::new(TokenType::QuotedString(value.to_string()), location)
    }

    fn new_bad_string(value: &str, location: Location) -> Token {
        Token::new(TokenType::BadString(value.to_string()), location)
    }

    fn new_url(value: &str, location: Location) -> Token {
        Token::new(TokenType::Url(value.to_string()), location)
    }

    fn new_bad_url(value: &str, location: Location) -> Token {
        Token::new(TokenType::BadUrl(value.to_string()), location)
    }
}

impl Token {
    pub(crate) fn is_comma(&self) -> bool {
        matches!(self.token_type, TokenType::Comma)
    }

    pub(crate) fn is_ident(&self) -> bool {
        matches!(self.token_type, TokenType::Ident(_))
    }

    /// True for an ident token with the given case-insensitive value
    pub(crate) fn is_ident_ci(&self, ident: &str) -> bool {
        matches!(self.token_type, TokenType::Ident(ref s) if s.eq_ignore_ascii_case(ident))
    }

    pub(crate) fn is_comment(&self) -> bool {
        matches!(self.token_type, TokenType::Comment(_))
    }

    pub(crate) fn is_whitespace(&self) -> bool {
        matches!(self.token_type, TokenType::Whitespace)
    }

    pub(crate) fn is_colon(&self) -> bool {
        matches!(self.token_type, TokenType::Colon)
    }

    pub(crate) fn is_eof(&self) -> bool {
        matches!(self.token_type, TokenType::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self.token_type.clone() {
            TokenType::AtKeyword(val) => format!("@{val}"),
            TokenType::Url(val) | TokenType::BadUrl(val) => format!("url({val})"),
            TokenType::Hash(val) | TokenType::IdHash(val) => format!("#{val}"),
            TokenType::Comment(val)
            | TokenType::Ident(val)
            | TokenType::QuotedString(val)
            | TokenType::BadString(val) => val,
            TokenType::Function(val) => format!("{val}("),
            TokenType::Delim(val) => val.to_string(),
            TokenType::Number(val) => val.to_string(),
            TokenType::Integer(val) => val.to_string(),
            TokenType::Percentage(val) => format!("{val}%"),
            TokenType::Dimension { unit, value } => format!("{value}{unit}"),
            TokenType::Cdc => "-->".into(),
            TokenType::Cdo => "<!--".into(),
            TokenType::Colon => ":".into(),
            TokenType::Semicolon => ";".into(),
            TokenType::Comma => ",".into(),
            TokenType::LBracket => "[".into(),
            TokenType::RBracket => "]".into(),
            TokenType::LCurly => "{".into(),
            TokenType::RCurly => "}".into(),
            TokenType::LParen => "(".into(),
            TokenType::RParen => ")".into(),
            TokenType::Includes => "~=".into(),
            TokenType::DashMatch => "|=".into(),
            TokenType::PrefixMatch => "^=".into(),
            TokenType::SuffixMatch => "$=".into(),
            TokenType::SubstringMatch => "*=".into(),
            TokenType::NotMatch => "!=".into(),
            TokenType::Column => "||".into(),
            TokenType::GreaterThan => ">".into(),
            TokenType::GreaterThanEqual => ">=".into(),
            TokenType::LessThan => "<".into(),
            TokenType::LessThanEqual => "<=".into(),
            TokenType::Whitespace => " ".into(),
            TokenType::Eof => "eof".into(),
        };

        write!(f, "{string}")
    }
}

/// Mode-switching CSS tokenizer over a [`TextStream`]
pub struct Tokenizer<'stream> {
    stream: &'stream TextStream,
    /// Current lexical mode, set by the rule parser
    mode: TokenizerMode,
    /// Position of the NEXT token to consume within `tokens`
    position: usize,
    /// All tokens lexed so far; tokens beyond `position` are lookahead
    tokens: Vec<Token>,
    /// Tracks the stream location of the next byte to lex
    location: LocationHandler,
    /// Channel lexical errors are published on
    errors: Rc<ErrorChannel>,
}

impl<'stream> Tokenizer<'stream> {
    /// Creates a new tokenizer over the given stream that starts on the
    /// given location. This does not have to be 1/1, but can be any
    /// location.
    pub fn new(stream: &'stream TextStream, start: Location, errors: Rc<ErrorChannel>) -> Self {
        Self {
            stream,
            mode: TokenizerMode::Data,
            position: 0,
            tokens: Vec::new(),
            location: LocationHandler::new(start),
            errors,
        }
    }

    /// Returns the current location, taking the start location into account
    pub fn current_location(&self) -> Location {
        self.compose(self.location.cur_location)
    }

    fn compose(&self, loc: Location) -> Location {
        let start = self.location.start_location;
        Location::new(start.line + loc.line - 1, start.column + loc.column - 1, loc.offset)
    }

    fn decompose(&self, loc: Location) -> Location {
        let start = self.location.start_location;
        Location::new(loc.line + 1 - start.line, loc.column + 1 - start.column, loc.offset)
    }

    /// Returns true when every token, including Eof, has been consumed
    pub fn eof(&self) -> bool {
        self.stream.eof() && self.position >= self.tokens.len()
    }

    /// Sets the lexical mode for the NEXT token. Lookahead tokens that
    /// were lexed under the previous mode are dropped and the stream is
    /// rewound to their start, so no byte is ever delivered as a token
    /// lexed under a stale mode.
    pub fn set_mode(&mut self, mode: TokenizerMode) {
        if self.mode == mode {
            return;
        }

        self.mode = mode;
        self.flush_lookahead();
    }

    fn flush_lookahead(&mut self) {
        if self.position >= self.tokens.len() {
            return;
        }

        let loc = self.tokens[self.position].location;
        let decomposed = self.decompose(loc);

        self.stream.seek_bytes(loc.offset);
        self.location.set(decomposed);
        self.tokens.truncate(self.position);
    }

    /// Looks ahead at the next token with offset. So `lookahead(0)` is the
    /// token that will be returned by the next `consume()`.
    pub fn lookahead(&mut self, offset: usize) -> Token {
        while self.tokens.len() <= self.position + offset {
            let token = self.consume_token();
            self.tokens.push(token);
        }

        self.tokens[self.position + offset].clone()
    }

    /// Looks ahead at the next non-whitespace, non-comment token
    pub(crate) fn lookahead_sc(&mut self, offset: usize) -> Token {
        let mut i = offset;

        loop {
            let t = self.lookahead(i);
            match t.token_type {
                TokenType::Whitespace | TokenType::Comment(_) => {
                    i += 1;
                }
                _ => return t,
            }
        }
    }

    /// Consumes the next token and returns it
    pub fn consume(&mut self) -> Token {
        if self.tokens.len() == self.position {
            let token = self.consume_token();
            self.tokens.push(token);
        }

        let token = self.tokens[self.position].clone();
        self.position += 1;

        log::trace!("{:?}", token);

        token
    }

    /// Pushes the current position back so the next consume returns the
    /// same token again
    pub fn reconsume(&mut self) {
        if self.position > 0 {
            self.position -= 1;
        }
    }

    /// Byte offset of the next token to consume; used to capture raw
    /// source slices
    pub fn tell(&self) -> usize {
        if self.position < self.tokens.len() {
            return self.tokens[self.position].location.offset;
        }

        self.location.cur_location.offset
    }

    /// Returns the source text between the given byte offsets
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.stream.slice(start, end)
    }

    // ------------------------------------------------------------------
    // Resynchronization primitives. All of them start from the current
    // token and leave the tokenizer at a known recovery boundary.

    /// Consumes until the next balanced `}` (or a top-level `;`); the
    /// terminator is consumed as well.
    pub fn skip_unknown_rule(&mut self) {
        let mut depth = 0usize;

        loop {
            let t = self.consume();
            match t.token_type {
                TokenType::Eof => break,
                TokenType::LCurly | TokenType::LParen | TokenType::LBracket | TokenType::Function(_) => {
                    depth += 1;
                }
                TokenType::Semicolon if depth == 0 => break,
                TokenType::RCurly if depth <= 1 => break,
                TokenType::RCurly | TokenType::RParen | TokenType::RBracket => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }
    }

    /// Consumes until the next `;` outside any nesting, or Eof. The
    /// semicolon is consumed.
    pub fn jump_to_next_semicolon(&mut self) {
        let mut depth = 0usize;

        loop {
            let t = self.consume();
            match t.token_type {
                TokenType::Eof => break,
                TokenType::LCurly | TokenType::LParen | TokenType::LBracket | TokenType::Function(_) => {
                    depth += 1;
                }
                TokenType::Semicolon if depth == 0 => break,
                TokenType::RCurly | TokenType::RParen | TokenType::RBracket => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }
    }

    /// Consumes until `;` or `}` outside any nesting. The semicolon is
    /// consumed, a closing curly bracket is left as the next token.
    pub fn jump_to_end_of_declaration(&mut self) {
        let mut depth = 0usize;

        loop {
            let t = self.consume();
            match t.token_type {
                TokenType::Eof => break,
                TokenType::Semicolon if depth == 0 => break,
                TokenType::RCurly if depth == 0 => {
                    self.reconsume();
                    break;
                }
                TokenType::LCurly | TokenType::LParen | TokenType::LBracket | TokenType::Function(_) => {
                    depth += 1;
                }
                TokenType::RCurly | TokenType::RParen | TokenType::RBracket => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }
    }

    /// Consumes until the `)` matching the already-consumed `(`,
    /// accounting for nested groups. Strings and comments are single
    /// tokens at this level and need no special handling.
    pub fn jump_to_closed_arguments(&mut self) {
        let mut depth = 1usize;

        loop {
            let t = self.consume();
            match t.token_type {
                TokenType::Eof => break,
                TokenType::LCurly | TokenType::LParen | TokenType::LBracket | TokenType::Function(_) => {
                    depth += 1;
                }
                TokenType::RCurly | TokenType::RParen | TokenType::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------

    /// 4.3.1. [Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    fn consume_token(&mut self) -> Token {
        if self.look_ahead_slice(2) == "/*" {
            return self.consume_comment_token();
        }

        let current = self.current_char();
        let loc = self.current_location();

        match current {
            Character::StreamEnd | Character::StreamEmpty => Token::new(TokenType::Eof, loc),
            Ch(c) if c.is_whitespace() => {
                self.consume_whitespace();
                Token::new(TokenType::Whitespace, loc)
            }
            Ch('"' | '\'') => self.consume_string_token(),
            Ch(c @ '#') => {
                // consume '#'
                self.next_char();

                if self.is_ident_char(self.current_char().into()) || self.is_start_of_escape(0) {
                    return if self.is_next_3_points_starts_ident_seq(0) {
                        Token::new_id_hash(self.consume_ident().as_str(), loc)
                    } else {
                        Token::new_hash(self.consume_ident().as_str(), loc)
                    };
                }

                Token::new_delim(c, loc)
            }
            Ch(')') => {
                self.next_char();
                Token::new(TokenType::RParen, loc)
            }
            Ch('(') => {
                self.next_char();
                Token::new(TokenType::LParen, loc)
            }
            Ch('[') => {
                self.next_char();
                Token::new(TokenType::LBracket, loc)
            }
            Ch(']') => {
                self.next_char();
                Token::new(TokenType::RBracket, loc)
            }
            Ch('{') => {
                self.next_char();
                Token::new(TokenType::LCurly, loc)
            }
            Ch('}') => {
                self.next_char();
                Token::new(TokenType::RCurly, loc)
            }
            Ch(',') => {
                self.next_char();
                Token::new(TokenType::Comma, loc)
            }
            Ch(':') => {
                self.next_char();
                Token::new(TokenType::Colon, loc)
            }
            Ch(';') => {
                self.next_char();
                Token::new(TokenType::Semicolon, loc)
            }
            Ch(c @ ('~' | '^' | '$' | '!')) if self.mode == TokenizerMode::Selector => {
                self.next_char();
                if self.current_char() == Ch('=') {
                    self.next_char();
                    let token_type = match c {
                        '~' => TokenType::Includes,
                        '^' => TokenType::PrefixMatch,
                        '$' => TokenType::SuffixMatch,
                        _ => TokenType::NotMatch,
                    };
                    return Token::new(token_type, loc);
                }

                Token::new_delim(c, loc)
            }
            Ch('|') if self.mode == TokenizerMode::Selector => {
                self.next_char();
                match self.current_char() {
                    Ch('=') => {
                        self.next_char();
                        Token::new(TokenType::DashMatch, loc)
                    }
                    Ch('|') => {
                        self.next_char();
                        Token::new(TokenType::Column, loc)
                    }
                    _ => Token::new_delim('|', loc),
                }
            }
            Ch('*') if self.mode == TokenizerMode::Selector => {
                self.next_char();
                if self.current_char() == Ch('=') {
                    self.next_char();
                    return Token::new(TokenType::SubstringMatch, loc);
                }

                Token::new_delim('*', loc)
            }
            Ch('>') if self.mode == TokenizerMode::Value => {
                self.next_char();
                if self.current_char() == Ch('=') {
                    self.next_char();
                    return Token::new(TokenType::GreaterThanEqual, loc);
                }

                Token::new(TokenType::GreaterThan, loc)
            }
            Ch('<') if self.mode == TokenizerMode::Value => {
                self.next_char();
                if self.current_char() == Ch('=') {
                    self.next_char();
                    return Token::new(TokenType::LessThanEqual, loc);
                }

                Token::new(TokenType::LessThan, loc)
            }
            Ch(c @ '+') => {
                // In selector context a '+' is always the next-sibling combinator
                if self.mode != TokenizerMode::Selector && self.is_signed_decimal(0) {
                    return self.consume_numeric_token();
                }

                // consume '+'
                self.next_char();
                Token::new_delim(c, loc)
            }
            Ch('.') => {
                if matches!(self.stream.look_ahead(1), Ch(c) if c.is_numeric()) {
                    return self.consume_numeric_token();
                }

                // consume '.'
                self.next_char();
                Token::new_delim('.', loc)
            }
            Ch(c @ '-') => {
                if self.is_signed_decimal(0) {
                    return self.consume_numeric_token();
                }

                let cdc_token = "-->";
                if self.look_ahead_slice(cdc_token.len()) == cdc_token {
                    // consume '-->'
                    self.consume_chars(cdc_token.len());
                    return Token::new(TokenType::Cdc, loc);
                }

                if self.is_next_3_points_starts_ident_seq(0) {
                    return self.consume_ident_like_seq();
                }

                // consume '-'
                self.next_char();
                Token::new_delim(c, loc)
            }
            Ch(c @ '<') => {
                let cdo_token = "<!--";
                if self.look_ahead_slice(cdo_token.len()) == cdo_token {
                    // consume '<!--'
                    self.consume_chars(cdo_token.len());
                    return Token::new(TokenType::Cdo, loc);
                }

                // consume '<'
                self.next_char();
                Token::new_delim(c, loc)
            }
            Ch(c @ '@') => {
                // consume '@'
                self.next_char();

                if self.is_next_3_points_starts_ident_seq(0) {
                    return Token::new_atkeyword(self.consume_ident().as_str(), loc);
                }

                Token::new_delim(c, loc)
            }
            Ch(c @ '\\') => {
                if self.is_start_of_escape(0) {
                    return self.consume_ident_like_seq();
                }

                self.errors.report(ErrorCode::InvalidEscape, loc);

                // consume '\'
                self.next_char();
                Token::new_delim(c, loc)
            }
            Ch(c) if c.is_numeric() => self.consume_numeric_token(),
            Ch(c) if self.is_ident_start(c) => self.consume_ident_like_seq(),
            Ch(c) => {
                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
        }
    }

    /// 4.3.2. [Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    fn consume_comment_token(&mut self) -> Token {
        let loc = self.current_location();
        let mut comment = String::new();

        // consume '/*'
        self.consume_chars(2);

        while self.look_ahead_slice(2) != "*/" {
            if self.stream.eof() {
                self.errors.report(ErrorCode::UnterminatedComment, loc);
                return Token::new(TokenType::Comment(comment), loc);
            }

            comment.push(self.next_char().into());
        }

        // consume '*/'
        self.consume_chars(2);

        Token::new(TokenType::Comment(comment), loc)
    }

    /// 4.3.3. [Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    ///
    /// Returns an `Integer`, `Number`, `Percentage` or `Dimension` token.
    fn consume_numeric_token(&mut self) -> Token {
        let loc = self.current_location();

        let (raw, is_integer) = self.consume_number();
        let value: Number = raw.parse().unwrap_or(0.0);

        if self.is_next_3_points_starts_ident_seq(0) {
            let unit = self.consume_ident();

            return Token::new_dimension(value, unit.as_str(), loc);
        } else if self.current_char() == Ch('%') {
            // consume '%'
            self.next_char();
            return Token::new_percentage(value, loc);
        }

        if is_integer {
            if let Ok(int_value) = raw.parse::<i32>() {
                return Token::new_integer(int_value, loc);
            }
        }

        Token::new_number(value, loc)
    }

    /// 4.3.5. [Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    ///
    /// Returns either a `QuotedString` or a `BadString` token.
    fn consume_string_token(&mut self) -> Token {
        let loc = self.current_location();

        // consume string starting: (') or (") ...
        let ending = self.next_char();
        let mut value = String::new();

        loop {
            if self.stream.eof() {
                // parser error: unterminated, treat as closed at EOF
                self.errors.report(ErrorCode::UnterminatedString, loc);
                return Token::new_quoted_string(value.as_str(), loc);
            }

            if self.current_char() == ending {
                // consume string ending
                self.next_char();
                return Token::new_quoted_string(value.as_str(), loc);
            }

            // newline: parser error
            if self.current_char() == Ch('\n') {
                // note: don't consume '\n'
                self.errors.report(ErrorCode::UnterminatedString, loc);
                return Token::new_bad_string(value.as_str(), loc);
            }

            if self.current_char() == Ch('\\') && self.stream.look_ahead(1) == Ch('\n') {
                // escaped newline, consume both
                self.consume_chars(2);
                continue;
            }

            // a non-hex escape stands for the escaped character itself
            if self.current_char() == Ch('\\')
                && !matches!(self.stream.look_ahead(1), Ch(c) if c.is_ascii_hexdigit())
                && !matches!(self.stream.look_ahead(1), Character::StreamEnd)
            {
                // consume '\'
                self.next_char();

                // consume char next to `\`
                value.push(self.next_char().into());
                continue;
            }

            if self.is_start_of_escape(0) {
                value.push(self.consume_escaped_char());
                continue;
            }

            value.push(self.next_char().into());
        }
    }

    /// 4.3.12. [Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    ///
    /// Returns the raw spelling plus whether it stayed an integer (no
    /// decimal point, no exponent).
    fn consume_number(&mut self) -> (String, bool) {
        let mut value = String::new();
        let mut is_integer = true;

        if matches!(self.current_char(), Ch('+' | '-')) {
            value.push(self.next_char().into());
        }

        value.push_str(&self.consume_digits());

        if self.current_char() == Ch('.') && matches!(self.stream.look_ahead(1), Ch(c) if c.is_numeric()) {
            value.push_str(&self.consume_chars(2));
            value.push_str(&self.consume_digits());
            is_integer = false;
        }

        // U+0045 (E) / U+0065 (e) exponent part
        let c1 = self.stream.look_ahead(0);
        let c2 = self.stream.look_ahead(1);
        let c3 = self.stream.look_ahead(2);
        if (c1 == Ch('E') || c1 == Ch('e'))
            && (((c2 == Ch('-') || c2 == Ch('+')) && c3.is_numeric()) || c2.is_numeric())
        {
            value.push(self.next_char().into());
            value.push(self.next_char().into());
            value.push_str(&self.consume_digits());
            is_integer = false;
        }

        (value, is_integer)
    }

    /// 4.3.4. [Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    ///
    /// Returns an `Ident`, `Function`, `Url`, or `BadUrl` token.
    fn consume_ident_like_seq(&mut self) -> Token {
        let loc = self.current_location();

        let value = self.consume_ident();

        if value.eq_ignore_ascii_case("url") && self.current_char() == Ch('(') {
            // consume '('
            self.next_char();
            self.consume_whitespace();

            if self.is_any_of(&['"', '\'']) {
                return Token::new_function(value.as_str(), loc);
            }

            return self.consume_url(loc);
        } else if self.current_char() == Ch('(') {
            // consume '('
            self.next_char();
            return Token::new_function(value.as_str(), loc);
        }

        Token::new_ident(value.as_str(), loc)
    }

    /// 4.3.6. [Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-a-url-token)
    ///
    /// Returns either a `Url` or a `BadUrl` token
    fn consume_url(&mut self, loc: Location) -> Token {
        let mut url = String::new();

        self.consume_whitespace();

        loop {
            if self.current_char() == Ch(')') {
                // consume ')'
                self.next_char();
                break;
            }

            if self.stream.eof() {
                // parser error: unclosed url, treat as closed
                break;
            }

            if self.current_char().is_whitespace() {
                self.consume_whitespace();
                continue;
            }

            if self.is_any_of(&['"', '\'', '(']) || self.is_non_printable_char() {
                // parse error
                self.consume_remnants_of_bad_url();
                return Token::new_bad_url(url.as_str(), loc);
            }

            if self.is_start_of_escape(0) {
                url.push(self.consume_escaped_char());
                continue;
            }

            url.push(self.next_char().into());
        }

        Token::new_url(url.as_str(), loc)
    }

    /// 4.3.14. [Consume the remnants of a bad url](https://www.w3.org/TR/css-syntax-3/#consume-remnants-of-bad-url)
    ///
    /// Consumes enough of the input stream to reach a recovery point where
    /// normal tokenizing can resume.
    fn consume_remnants_of_bad_url(&mut self) {
        loop {
            // recovery point
            if self.current_char() == Ch(')') || self.stream.eof() {
                if self.current_char() == Ch(')') {
                    self.next_char();
                }
                break;
            }

            if self.is_start_of_escape(0) {
                self.consume_escaped_char();
                continue;
            }

            self.next_char();
        }
    }

    /// 4.3.7. [Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-an-escaped-code-point)
    fn consume_escaped_char(&mut self) -> char {
        let loc = self.current_location();

        // consume '\'
        self.next_char();

        // eof: parser error
        if self.stream.eof() {
            self.errors.report(ErrorCode::InvalidEscape, loc);
            return CHAR_REPLACEMENT;
        }

        let mut value = String::new();
        while matches!(self.current_char(), Ch(c) if c.is_ascii_hexdigit()) && value.len() <= 5 {
            value.push(self.next_char().into());
        }

        if self.current_char().is_whitespace() {
            self.next_char();
        }

        if value.is_empty() {
            self.errors.report(ErrorCode::InvalidEscape, loc);
            return CHAR_REPLACEMENT;
        }

        let as_u32 = u32::from_str_radix(&value, 16).unwrap_or(0);

        match char::from_u32(as_u32) {
            Some(char) if char != '\0' && char < CHAR_MAX_ALLOWED => char,
            _ => CHAR_REPLACEMENT,
        }
    }

    /// 4.3.11. [Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    ///
    /// Note: that algorithm does not do the verification that is necessary
    /// to ensure the returned code points would constitute an ident token.
    /// The caller ensures the stream starts with an ident sequence.
    fn consume_ident(&mut self) -> String {
        let mut value = String::new();

        loop {
            // a non-hex escape stands for the escaped character itself
            if self.current_char() == Ch('\\')
                && !matches!(self.stream.look_ahead(1), Ch(c) if c.is_ascii_hexdigit())
                && !matches!(self.stream.look_ahead(1), Character::StreamEnd)
            {
                // consume '\'
                self.next_char();

                // consume char next to `\`
                value.push(self.next_char().into());
                continue;
            }

            if self.is_start_of_escape(0) {
                value.push(self.consume_escaped_char());
                continue;
            }

            if !self.is_ident_char(self.current_char().into()) {
                break;
            }

            value.push(self.next_char().into());
        }

        value
    }

    fn consume_digits(&mut self) -> String {
        let mut value = String::new();

        while matches!(self.current_char(), Ch(c) if c.is_numeric()) {
            value.push(self.next_char().into());
        }

        value
    }

    fn consume_chars(&mut self, mut len: usize) -> String {
        let mut value = String::new();

        while len > 0 {
            value.push(self.next_char().into());
            len -= 1;
        }

        value
    }

    fn consume_whitespace(&mut self) {
        while self.current_char().is_whitespace() {
            self.next_char();
        }
    }

    /// [ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
    fn is_ident_start(&self, char: char) -> bool {
        char.is_alphabetic() || !char.is_ascii() || char == '_'
    }

    /// [ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
    fn is_ident_char(&self, char: char) -> bool {
        self.is_ident_start(char) || char.is_numeric() || char == '-'
    }

    /// [non-printable code point](https://www.w3.org/TR/css-syntax-3/#non-printable-code-point)
    fn is_non_printable_char(&self) -> bool {
        if let Ch(char) = self.current_char() {
            matches!(char, '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000E}'..='\u{001F}' | '\u{007F}')
        } else {
            false
        }
    }

    /// 4.3.8. [Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
    fn is_start_of_escape(&self, start: usize) -> bool {
        let current_char = self.stream.look_ahead(start);
        let next_char = self.stream.look_ahead(start + 1);

        current_char == Ch('\\') && next_char != Ch('\n')
    }

    /// 4.3.9. [Check if three code points would start an ident sequence](https://www.w3.org/TR/css-syntax-3/#check-if-three-code-points-would-start-an-ident-sequence)
    fn is_next_3_points_starts_ident_seq(&self, start: usize) -> bool {
        let first = self.stream.look_ahead(start);
        let second = self.stream.look_ahead(start + 1);

        if first == Ch('-') {
            return self.is_ident_start(second.into()) || second == Ch('-') || self.is_start_of_escape(start + 1);
        }

        if first == Ch('\\') {
            return self.is_start_of_escape(start);
        }

        self.is_ident_start(first.into())
    }

    fn is_signed_decimal(&self, start: usize) -> bool {
        let current = self.stream.look_ahead(start);
        let next = self.stream.look_ahead(start + 1);
        let last = self.stream.look_ahead(start + 2);

        // e.g. +1, -1, +.1, -0.01
        matches!(current, Ch('+' | '-')) && ((next == Ch('.') && last.is_numeric()) || next.is_numeric())
    }

    fn is_any_of(&self, chars: &[char]) -> bool {
        let current_char = self.current_char();
        for &char in chars {
            if current_char == Ch(char) {
                return true;
            }
        }

        false
    }

    fn current_char(&self) -> Character {
        self.stream.look_ahead(0)
    }

    fn next_char(&mut self) -> Character {
        if self.stream.eof() {
            return Character::StreamEnd;
        }

        let c = self.stream.read_and_next();
        self.location.inc(c);

        c
    }

    fn look_ahead_slice(&self, len: usize) -> String {
        let mut s = String::new();

        for i in 0..len {
            match self.stream.look_ahead(i) {
                Ch(c) => s.push(c),
                _ => break,
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_token_eq {
        ($t1:expr, $t2:expr) => {
            assert_eq!($t1.token_type, $t2)
        };
    }

    fn tokenizer_over<'a>(stream: &'a TextStream) -> Tokenizer<'a> {
        Tokenizer::new(stream, Location::default(), Rc::new(ErrorChannel::default()))
    }

    #[test]
    fn produce_valid_stream_of_css_tokens() {
        let stream = TextStream::from_str(
            "
        /* Navbar */
        #header .nav {
            font-size: 1.1rem;
        }

        content: \"me \\26  you\";

        background: url(https://coral.dev);
        ",
        );
        let mut tokenizer = tokenizer_over(&stream);

        let tokens = vec![
            TokenType::Whitespace,
            TokenType::Comment(" Navbar ".into()),
            TokenType::Whitespace,
            TokenType::IdHash("header".into()),
            TokenType::Whitespace,
            TokenType::Delim('.'),
            TokenType::Ident("nav".into()),
            TokenType::Whitespace,
            TokenType::LCurly,
            TokenType::Whitespace,
            TokenType::Ident("font-size".into()),
            TokenType::Colon,
            TokenType::Whitespace,
            TokenType::Dimension {
                value: 1.1,
                unit: "rem".into(),
            },
            TokenType::Semicolon,
            TokenType::Whitespace,
            TokenType::RCurly,
            TokenType::Whitespace,
            TokenType::Ident("content".into()),
            TokenType::Colon,
            TokenType::Whitespace,
            TokenType::QuotedString("me & you".into()),
            TokenType::Semicolon,
            TokenType::Whitespace,
            TokenType::Ident("background".into()),
            TokenType::Colon,
            TokenType::Whitespace,
            TokenType::Url("https://coral.dev".into()),
            TokenType::Semicolon,
            TokenType::Whitespace,
            TokenType::Eof,
        ];

        for token in tokens {
            assert_token_eq!(tokenizer.consume(), token);
        }
    }

    #[test]
    fn integers_and_numbers_are_distinct() {
        let stream = TextStream::from_str("42 4.2 1e1 50% 10px -7");
        let mut tokenizer = tokenizer_over(&stream);

        let tokens = vec![
            TokenType::Integer(42),
            TokenType::Whitespace,
            TokenType::Number(4.2),
            TokenType::Whitespace,
            TokenType::Number(10.0),
            TokenType::Whitespace,
            TokenType::Percentage(50.0),
            TokenType::Whitespace,
            TokenType::Dimension {
                value: 10.0,
                unit: "px".into(),
            },
            TokenType::Whitespace,
            TokenType::Integer(-7),
            TokenType::Eof,
        ];

        for token in tokens {
            assert_token_eq!(tokenizer.consume(), token);
        }
    }

    #[test]
    fn selector_mode_lexes_matchers() {
        let stream = TextStream::from_str("a[href^=\"x\"][lang|=en][rel~=next][data!=y] b || c");
        let mut tokenizer = tokenizer_over(&stream);
        tokenizer.set_mode(TokenizerMode::Selector);

        let tokens = vec![
            TokenType::Ident("a".into()),
            TokenType::LBracket,
            TokenType::Ident("href".into()),
            TokenType::PrefixMatch,
            TokenType::QuotedString("x".into()),
            TokenType::RBracket,
            TokenType::LBracket,
            TokenType::Ident("lang".into()),
            TokenType::DashMatch,
            TokenType::Ident("en".into()),
            TokenType::RBracket,
            TokenType::LBracket,
            TokenType::Ident("rel".into()),
            TokenType::Includes,
            TokenType::Ident("next".into()),
            TokenType::RBracket,
            TokenType::LBracket,
            TokenType::Ident("data".into()),
            TokenType::NotMatch,
            TokenType::Ident("y".into()),
            TokenType::RBracket,
            TokenType::Whitespace,
            TokenType::Ident("b".into()),
            TokenType::Whitespace,
            TokenType::Column,
            TokenType::Whitespace,
            TokenType::Ident("c".into()),
            TokenType::Eof,
        ];

        for token in tokens {
            assert_token_eq!(tokenizer.consume(), token);
        }
    }

    #[test]
    fn data_mode_does_not_lex_matchers() {
        let stream = TextStream::from_str("~=");
        let mut tokenizer = tokenizer_over(&stream);

        assert_token_eq!(tokenizer.consume(), TokenType::Delim('~'));
        assert_token_eq!(tokenizer.consume(), TokenType::Delim('='));
    }

    #[test]
    fn value_mode_lexes_comparators() {
        let stream = TextStream::from_str("< <= > >=");
        let mut tokenizer = tokenizer_over(&stream);
        tokenizer.set_mode(TokenizerMode::Value);

        let tokens = vec![
            TokenType::LessThan,
            TokenType::Whitespace,
            TokenType::LessThanEqual,
            TokenType::Whitespace,
            TokenType::GreaterThan,
            TokenType::Whitespace,
            TokenType::GreaterThanEqual,
            TokenType::Eof,
        ];

        for token in tokens {
            assert_token_eq!(tokenizer.consume(), token);
        }
    }

    #[test]
    fn mode_switch_relexes_lookahead() {
        let stream = TextStream::from_str("a ~= b");
        let mut tokenizer = tokenizer_over(&stream);

        // lex ahead in data mode: '~' and '=' are separate delims
        assert_token_eq!(tokenizer.lookahead(2), TokenType::Delim('~'));

        // after the switch the same bytes come back as one matcher token
        tokenizer.set_mode(TokenizerMode::Selector);
        assert_token_eq!(tokenizer.consume(), TokenType::Ident("a".into()));
        assert_token_eq!(tokenizer.consume(), TokenType::Whitespace);
        assert_token_eq!(tokenizer.consume(), TokenType::Includes);
    }

    #[test]
    fn skip_unknown_rule_stops_after_balanced_block() {
        let stream = TextStream::from_str("foo { bar { } } a");
        let mut tokenizer = tokenizer_over(&stream);

        tokenizer.skip_unknown_rule();

        assert_token_eq!(tokenizer.lookahead_sc(0), TokenType::Ident("a".into()));
    }

    #[test]
    fn skip_unknown_rule_stops_at_top_level_semicolon() {
        let stream = TextStream::from_str("foo (a;b) bar; a");
        let mut tokenizer = tokenizer_over(&stream);

        tokenizer.skip_unknown_rule();

        assert_token_eq!(tokenizer.lookahead_sc(0), TokenType::Ident("a".into()));
    }

    #[test]
    fn jump_to_end_of_declaration_leaves_closing_brace() {
        let stream = TextStream::from_str("red green }");
        let mut tokenizer = tokenizer_over(&stream);

        tokenizer.jump_to_end_of_declaration();

        assert_token_eq!(tokenizer.consume(), TokenType::RCurly);
    }

    #[test]
    fn jump_to_end_of_declaration_consumes_semicolon() {
        let stream = TextStream::from_str("rgb(1;2) ; next");
        let mut tokenizer = tokenizer_over(&stream);

        tokenizer.jump_to_end_of_declaration();

        assert_token_eq!(tokenizer.lookahead_sc(0), TokenType::Ident("next".into()));
    }

    #[test]
    fn jump_to_closed_arguments_accounts_for_nesting() {
        let stream = TextStream::from_str("a (b) [c] \"d)\" ) x");
        let mut tokenizer = tokenizer_over(&stream);

        tokenizer.jump_to_closed_arguments();

        assert_token_eq!(tokenizer.lookahead_sc(0), TokenType::Ident("x".into()));
    }

    #[test]
    fn parse_urls() {
        let urls = vec![
            ("url(https://coral.dev/)", TokenType::Url("https://coral.dev/".into())),
            ("url(  coral.dev   )", TokenType::Url("coral.dev".into())),
            ("url(coral\u{0000}dev)", TokenType::BadUrl("coral".into())),
            ("url(\"coral.dev\")", TokenType::Function("url".into())),
        ];

        for (raw, expected) in urls {
            let stream = TextStream::from_str(raw);
            let mut tokenizer = tokenizer_over(&stream);
            assert_token_eq!(tokenizer.consume(), expected);
        }
    }

    #[test]
    fn unterminated_string_reports_and_closes() {
        use crate::errors::{ErrorCode, ErrorListener};
        use std::cell::RefCell;

        #[derive(Default)]
        struct Collector {
            codes: RefCell<Vec<ErrorCode>>,
        }
        impl ErrorListener for Collector {
            fn on_error(&self, code: ErrorCode, _location: Location) {
                self.codes.borrow_mut().push(code);
            }
        }

        let collector = Rc::new(Collector::default());
        let channel = Rc::new(ErrorChannel::new(vec![collector.clone()]));

        let stream = TextStream::from_str("\"eof");
        let mut tokenizer = Tokenizer::new(&stream, Location::default(), channel);

        assert_token_eq!(tokenizer.consume(), TokenType::QuotedString("eof".into()));
        assert_eq!(collector.codes.borrow().as_slice(), &[ErrorCode::UnterminatedString]);
    }

    #[test]
    fn tokens_carry_their_start_location() {
        let stream = TextStream::from_str("a {\n  color: red;\n}");
        let mut tokenizer = tokenizer_over(&stream);

        let a = tokenizer.consume();
        assert_eq!(a.location, Location::new(1, 1, 0));

        // skip to 'color' on line 2
        loop {
            let t = tokenizer.consume();
            if t.is_ident() {
                assert_eq!(t.location.line, 2);
                assert_eq!(t.location.column, 3);
                break;
            }
        }
    }

    #[test]
    fn reruns_are_deterministic() {
        let input = "a[b=c] { d: url(e) 50% }";

        let collect = || {
            let stream = TextStream::from_str(input);
            let mut tokenizer = tokenizer_over(&stream);
            let mut tokens = Vec::new();
            loop {
                let t = tokenizer.consume();
                let eof = t.is_eof();
                tokens.push(t.token_type);
                if eof {
                    break;
                }
            }
            tokens
        };

        assert_eq!(collect(), collect());
    }
}
