//! Token-driven selector constructor.
//!
//! The rule parser hands every token between the rule start and the
//! opening curly bracket to this state machine, whitespace included
//! (whitespace encodes the descendant combinator). The constructor
//! never fails hard: syntax errors mark the selector invalid and the
//! machine keeps accepting tokens until the parser stops driving it.

use crate::stylesheet::{Combinator, CssSelector, CssSelectorPart, MatcherType};
use crate::tokenizer::{Token, TokenType};

#[derive(Debug)]
enum State {
    /// Between parts
    Start,
    /// Seen `:`
    AfterColon,
    /// Seen `::`
    AfterDoubleColon,
    /// Seen `.`
    AfterDot,
    /// Inside `[...]`
    InAttribute(AttrStage),
    /// Inside a functional pseudo `:name(...)`; tokens are replayed into
    /// a nested constructor until the matching close paren
    InFunction { name: String, depth: usize },
}

#[derive(Debug, PartialEq)]
enum AttrStage {
    ExpectName,
    HasName,
    ExpectValue,
    HasValue,
}

#[derive(Debug, Default)]
struct AttrData {
    name: String,
    matcher: MatcherType,
    value: String,
    flags: String,
}

/// Incremental builder for one (possibly comma-separated) selector
#[derive(Default)]
pub struct SelectorConstructor {
    parts: Vec<CssSelectorPart>,
    valid: bool,
    state: Option<State>,
    attr: AttrData,
    inner: Option<Box<SelectorConstructor>>,
    /// Combinator waiting for the next compound; descendant until an
    /// explicit combinator upgrades it
    pending: Option<Combinator>,
    /// Inside functional pseudo arguments the grammar is wider than a
    /// selector (an+b terms in `:nth-child(2n+1)`); such terms are kept
    /// textually instead of invalidating the selector
    in_arguments: bool,
}

impl SelectorConstructor {
    #[must_use]
    pub fn new() -> Self {
        let mut constructor = Self::default();
        constructor.reset();
        constructor
    }

    fn new_argument() -> Self {
        let mut constructor = Self::new();
        constructor.in_arguments = true;
        constructor
    }

    /// Starts a new selector
    pub fn reset(&mut self) {
        self.parts = Vec::new();
        self.valid = true;
        self.state = Some(State::Start);
        self.attr = AttrData::default();
        self.inner = None;
        self.pending = None;
    }

    /// True iff no syntactic error has been seen and the machine is not
    /// stuck in the middle of a construct
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
            && matches!(self.state, Some(State::Start))
            && !matches!(self.pending, Some(c) if c != Combinator::Descendant)
    }

    /// The selector built so far; None when nothing usable was collected
    #[must_use]
    pub fn result(&self) -> Option<CssSelector> {
        if self.parts.is_empty() {
            return None;
        }

        Some(CssSelector { parts: self.parts.clone() })
    }

    /// Advances the state machine with one token. Never panics.
    pub fn apply(&mut self, token: &Token) {
        log::trace!("selector constructor <- {:?}", token.token_type);

        let state = self.state.take().unwrap_or(State::Start);
        self.state = Some(match state {
            State::Start => self.apply_start(token),
            State::AfterColon => self.apply_after_colon(token),
            State::AfterDoubleColon => self.apply_after_double_colon(token),
            State::AfterDot => self.apply_after_dot(token),
            State::InAttribute(stage) => self.apply_in_attribute(stage, token),
            State::InFunction { name, depth } => self.apply_in_function(name, depth, token),
        });
    }

    fn apply_start(&mut self, token: &Token) -> State {
        match &token.token_type {
            TokenType::Whitespace | TokenType::Comment(_) => {
                if !self.parts.is_empty() && self.pending.is_none() && !self.last_is_separator() {
                    self.pending = Some(Combinator::Descendant);
                }
                State::Start
            }
            TokenType::Ident(value) => {
                self.push_part(CssSelectorPart::Type(value.clone()));
                State::Start
            }
            TokenType::Hash(value) | TokenType::IdHash(value) => {
                self.push_part(CssSelectorPart::Id(value.clone()));
                State::Start
            }
            TokenType::Delim('*') => {
                self.push_part(CssSelectorPart::Universal);
                State::Start
            }
            TokenType::Delim('.') => State::AfterDot,
            TokenType::Colon => State::AfterColon,
            TokenType::LBracket => {
                self.attr = AttrData::default();
                State::InAttribute(AttrStage::ExpectName)
            }
            TokenType::Delim('>') => self.combine(Combinator::Child),
            TokenType::Delim('+') => self.combine(Combinator::NextSibling),
            TokenType::Delim('~') => self.combine(Combinator::SubsequentSibling),
            TokenType::Column => self.combine(Combinator::Column),
            TokenType::Comma => {
                if self.parts.is_empty() || self.last_is_separator() {
                    self.valid = false;
                }
                self.pending = None;
                self.parts.push(CssSelectorPart::Comma);
                State::Start
            }
            TokenType::Eof => State::Start,
            _ => {
                if self.in_arguments {
                    self.push_part(CssSelectorPart::Type(token.to_string()));
                } else {
                    self.valid = false;
                }
                State::Start
            }
        }
    }

    fn apply_after_colon(&mut self, token: &Token) -> State {
        match &token.token_type {
            TokenType::Colon => State::AfterDoubleColon,
            TokenType::Ident(value) => {
                self.push_part(CssSelectorPart::PseudoClass(value.clone()));
                State::Start
            }
            TokenType::Function(name) => {
                self.inner = Some(Box::new(SelectorConstructor::new_argument()));
                State::InFunction { name: name.clone(), depth: 1 }
            }
            _ => {
                self.valid = false;
                State::Start
            }
        }
    }

    fn apply_after_double_colon(&mut self, token: &Token) -> State {
        match &token.token_type {
            TokenType::Ident(value) => {
                self.push_part(CssSelectorPart::PseudoElement(value.clone()));
                State::Start
            }
            _ => {
                self.valid = false;
                State::Start
            }
        }
    }

    fn apply_after_dot(&mut self, token: &Token) -> State {
        match &token.token_type {
            TokenType::Ident(value) => {
                self.push_part(CssSelectorPart::Class(value.clone()));
                State::Start
            }
            _ => {
                self.valid = false;
                State::Start
            }
        }
    }

    fn apply_in_attribute(&mut self, stage: AttrStage, token: &Token) -> State {
        if token.is_whitespace() || token.is_comment() {
            return State::InAttribute(stage);
        }

        match (stage, &token.token_type) {
            (AttrStage::ExpectName, TokenType::Ident(name)) => {
                self.attr.name = name.clone();
                State::InAttribute(AttrStage::HasName)
            }
            (AttrStage::HasName, TokenType::RBracket) => self.finish_attribute(),
            (AttrStage::HasName, matcher) => {
                let matcher = match matcher {
                    TokenType::Delim('=') => Some(MatcherType::Equals),
                    TokenType::Includes => Some(MatcherType::Includes),
                    TokenType::DashMatch => Some(MatcherType::DashMatch),
                    TokenType::PrefixMatch => Some(MatcherType::PrefixMatch),
                    TokenType::SuffixMatch => Some(MatcherType::SuffixMatch),
                    TokenType::SubstringMatch => Some(MatcherType::SubstringMatch),
                    TokenType::NotMatch => Some(MatcherType::NotMatch),
                    _ => None,
                };

                match matcher {
                    Some(matcher) => {
                        self.attr.matcher = matcher;
                        State::InAttribute(AttrStage::ExpectValue)
                    }
                    None => {
                        self.valid = false;
                        State::InAttribute(AttrStage::HasName)
                    }
                }
            }
            (AttrStage::ExpectValue, TokenType::Ident(value)) | (AttrStage::ExpectValue, TokenType::QuotedString(value)) => {
                self.attr.value = value.clone();
                State::InAttribute(AttrStage::HasValue)
            }
            (AttrStage::HasValue, TokenType::Ident(flags)) => {
                self.attr.flags = flags.clone();
                State::InAttribute(AttrStage::HasValue)
            }
            (AttrStage::HasValue, TokenType::RBracket) => self.finish_attribute(),
            (stage, _) => {
                self.valid = false;
                if matches!(token.token_type, TokenType::RBracket | TokenType::Eof) {
                    State::Start
                } else {
                    State::InAttribute(stage)
                }
            }
        }
    }

    fn apply_in_function(&mut self, name: String, mut depth: usize, token: &Token) -> State {
        match &token.token_type {
            TokenType::Function(_) | TokenType::LParen => depth += 1,
            TokenType::RParen => {
                depth -= 1;
                if depth == 0 {
                    let inner = self.inner.take();
                    let argument = inner.and_then(|i| i.result()).unwrap_or_default();
                    self.push_part(CssSelectorPart::PseudoFunction { name, argument });
                    return State::Start;
                }
            }
            TokenType::Eof => {
                self.valid = false;
                return State::Start;
            }
            _ => {}
        }

        if let Some(inner) = &mut self.inner {
            inner.apply(token);
        }

        State::InFunction { name, depth }
    }

    fn finish_attribute(&mut self) -> State {
        let attr = std::mem::take(&mut self.attr);
        self.push_part(CssSelectorPart::Attribute {
            name: attr.name,
            matcher: attr.matcher,
            value: attr.value,
            flags: attr.flags,
        });
        State::Start
    }

    /// Registers an explicit combinator; it replaces a pending descendant
    fn combine(&mut self, combinator: Combinator) -> State {
        if self.parts.is_empty() || self.last_is_separator() {
            self.valid = false;
        }
        if matches!(self.pending, Some(c) if c != Combinator::Descendant) {
            // two explicit combinators in a row
            self.valid = false;
        }

        self.pending = Some(combinator);
        State::Start
    }

    fn push_part(&mut self, part: CssSelectorPart) {
        if let Some(combinator) = self.pending.take() {
            if !self.parts.is_empty() && !self.last_is_separator() {
                self.parts.push(CssSelectorPart::Combinator(combinator));
            }
        }

        self.parts.push(part);
    }

    fn last_is_separator(&self) -> bool {
        matches!(
            self.parts.last(),
            Some(CssSelectorPart::Combinator(_)) | Some(CssSelectorPart::Comma)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorChannel;
    use crate::tokenizer::{Tokenizer, TokenizerMode};
    use coral_shared::text_stream::{Location, TextStream};
    use std::rc::Rc;

    fn build(input: &str) -> SelectorConstructor {
        let stream = TextStream::from_str(input);
        let mut tokenizer = Tokenizer::new(&stream, Location::default(), Rc::new(ErrorChannel::default()));
        tokenizer.set_mode(TokenizerMode::Selector);

        let mut constructor = SelectorConstructor::new();
        while !tokenizer.eof() {
            let t = tokenizer.consume();
            if t.is_eof() {
                break;
            }
            constructor.apply(&t);
        }

        constructor
    }

    macro_rules! assert_selector {
        ($input:expr, $expected:expr) => {
            let constructor = build($input);
            assert!(constructor.is_valid(), "selector {:?} should be valid", $input);
            assert_eq!(constructor.result().unwrap().to_string(), $expected);
        };
    }

    #[test]
    fn simple_selectors() {
        assert_selector!("a", "a");
        assert_selector!("*", "*");
        assert_selector!(".nav", ".nav");
        assert_selector!("#header", "#header");
        assert_selector!("a.nav#x", "a.nav#x");
    }

    #[test]
    fn whitespace_becomes_descendant_combinator() {
        assert_selector!("ul   li", "ul li");
        assert_selector!(" a ", "a");
    }

    #[test]
    fn explicit_combinators_swallow_surrounding_whitespace() {
        assert_selector!("a > b", "a > b");
        assert_selector!("a>b", "a > b");
        assert_selector!("a + b ~ c", "a + b ~ c");
        assert_selector!("a || b", "a || b");
    }

    #[test]
    fn attribute_selectors() {
        assert_selector!("[disabled]", "[disabled]");
        assert_selector!("a[href^=\"https\"]", "a[href^=\"https\"]");
        assert_selector!("[lang|=en]", "[lang|=\"en\"]");
        assert_selector!("[title~=\"x\" i]", "[title~=\"x\" i]");
        assert_selector!("[data!=y]", "[data!=\"y\"]");
    }

    #[test]
    fn pseudo_selectors() {
        assert_selector!("a:hover", "a:hover");
        assert_selector!("p::first-line", "p::first-line");
        assert_selector!(":not(.hidden)", ":not(.hidden)");
        assert_selector!(":is(a, b > c)", ":is(a, b > c)");
    }

    #[test]
    fn nth_arguments_are_kept_textually() {
        assert_selector!("li:nth-child(2n + 1)", "li:nth-child(2n + 1)");
        assert_selector!("li:nth-child(odd)", "li:nth-child(odd)");
    }

    #[test]
    fn selector_lists_keep_commas() {
        assert_selector!("a, b", "a, b");
    }

    #[test]
    fn nested_function_arguments_do_not_end_early() {
        assert_selector!(":not(:is(a, b))", ":not(:is(a, b))");
    }

    #[test]
    fn invalid_selectors_are_flagged_but_keep_their_parts() {
        let constructor = build("a > > b");
        assert!(!constructor.is_valid());
        assert!(constructor.result().is_some());

        let constructor = build("a[");
        assert!(!constructor.is_valid());

        let constructor = build("5%");
        assert!(!constructor.is_valid());
        assert!(constructor.result().is_none());
    }

    #[test]
    fn trailing_combinator_is_invalid() {
        let constructor = build("a >");
        assert!(!constructor.is_valid());
    }

    #[test]
    fn reset_clears_previous_state() {
        let mut constructor = build("a[");
        assert!(!constructor.is_valid());

        constructor.reset();
        assert!(constructor.is_valid());
        assert!(constructor.result().is_none());
    }
}
