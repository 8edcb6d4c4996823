//! The stylesheet object model produced by the parser.
//!
//! Rules own their nested rules downward; the upward links (rule →
//! parent rule, rule → stylesheet) are non-owning ids handed out by the
//! owning stylesheet when a rule is attached.

use itertools::Itertools;
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

/// Opaque handle to the DOM element that owns a stylesheet. The parser
/// never looks inside.
pub type OwnerNode = Rc<dyn Any>;

/// Non-owning identifier of a rule inside its stylesheet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

impl Display for RuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// Defines a complete stylesheet with all its rules and the source it
/// was read from
pub struct CssStylesheet {
    /// Top-level rules, in source order
    pub rules: Vec<CssRule>,
    /// Url or file path where the stylesheet was found
    pub source: Option<String>,
    /// DOM element owning this sheet, if any
    pub owner_node: Option<OwnerNode>,
    next_id: u32,
}

impl Debug for CssStylesheet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CssStylesheet")
            .field("rules", &self.rules)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for CssStylesheet {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl Default for CssStylesheet {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CssStylesheet {
    #[must_use]
    pub fn new(source: Option<String>) -> Self {
        Self {
            rules: Vec::new(),
            source,
            owner_node: None,
            next_id: 0,
        }
    }

    /// Hands out the id for the next rule to be attached
    pub fn allocate_id(&mut self) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Attaches a finished rule at the top level
    pub fn attach(&mut self, rule: CssRule) {
        self.rules.push(rule);
    }

    /// Finds a rule anywhere in the sheet by its id
    #[must_use]
    pub fn find_rule(&self, id: RuleId) -> Option<&CssRule> {
        fn walk(rules: &[CssRule], id: RuleId) -> Option<&CssRule> {
            for rule in rules {
                if rule.id == id {
                    return Some(rule);
                }
                if let Some(children) = rule.children() {
                    if let Some(found) = walk(children, id) {
                        return Some(found);
                    }
                }
            }
            None
        }

        walk(&self.rules, id)
    }

    /// Resolves the parent back-reference of the given rule
    #[must_use]
    pub fn parent_rule(&self, rule: &CssRule) -> Option<&CssRule> {
        rule.parent.and_then(|id| self.find_rule(id))
    }
}

impl Display for CssStylesheet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}

/// A single rule with its non-owning back-references
#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    /// Identity of this rule within its stylesheet
    pub id: RuleId,
    /// Rule containing this one; None for top-level rules
    pub parent: Option<RuleId>,
    pub kind: CssRuleKind,
}

impl CssRule {
    #[must_use]
    pub fn new(id: RuleId, kind: CssRuleKind) -> Self {
        Self { id, parent: None, kind }
    }

    /// Nested rules for grouping rules, None for leaf rules
    #[must_use]
    pub fn children(&self) -> Option<&[CssRule]> {
        match &self.kind {
            CssRuleKind::Media { children, .. }
            | CssRuleKind::Supports { children, .. }
            | CssRuleKind::Document { children, .. }
            | CssRuleKind::Keyframes { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Stamps this rule's id as the parent of all its direct children.
    /// Called once, when the rule's block closes.
    pub fn adopt_children(&mut self) {
        let id = self.id;
        if let Some(children) = self.children_mut() {
            for child in children {
                child.parent = Some(id);
            }
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<CssRule>> {
        match &mut self.kind {
            CssRuleKind::Media { children, .. }
            | CssRuleKind::Supports { children, .. }
            | CssRuleKind::Document { children, .. }
            | CssRuleKind::Keyframes { children, .. } => Some(children),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_style(&self) -> Option<&StyleRule> {
        match &self.kind {
            CssRuleKind::Style(rule) => Some(rule),
            _ => None,
        }
    }
}

/// The different kinds of rules a stylesheet can contain
#[derive(Debug, Clone, PartialEq)]
pub enum CssRuleKind {
    Style(StyleRule),
    Charset {
        encoding: String,
    },
    Import {
        href: String,
        media: Vec<CssMedium>,
    },
    Namespace {
        prefix: Option<String>,
        url: String,
    },
    Media {
        media: Vec<CssMedium>,
        children: Vec<CssRule>,
    },
    Supports {
        condition: Condition,
        children: Vec<CssRule>,
    },
    Document {
        functions: Vec<DocumentFunction>,
        children: Vec<CssRule>,
    },
    Page {
        selector: Option<CssSelector>,
        style: DeclarationBlock,
    },
    FontFace {
        style: DeclarationBlock,
    },
    Keyframes {
        name: String,
        children: Vec<CssRule>,
    },
    Keyframe {
        selector: KeyframeSelector,
        style: DeclarationBlock,
    },
    /// At-rule the parser does not know; the prelude is kept verbatim
    UnknownAt {
        name: String,
        prelude: String,
    },
}

fn fmt_children(f: &mut Formatter<'_>, children: &[CssRule]) -> std::fmt::Result {
    write!(f, "{{ ")?;
    for child in children {
        write!(f, "{child} ")?;
    }
    write!(f, "}}")
}

impl Display for CssRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            CssRuleKind::Style(rule) => write!(f, "{rule}"),
            CssRuleKind::Charset { encoding } => write!(f, "@charset \"{encoding}\";"),
            CssRuleKind::Import { href, media } => {
                write!(f, "@import url(\"{href}\")")?;
                if !media.is_empty() {
                    write!(f, " {}", media.iter().format(", "))?;
                }
                write!(f, ";")
            }
            CssRuleKind::Namespace { prefix, url } => {
                write!(f, "@namespace ")?;
                if let Some(prefix) = prefix {
                    write!(f, "{prefix} ")?;
                }
                write!(f, "url(\"{url}\");")
            }
            CssRuleKind::Media { media, children } => {
                write!(f, "@media {} ", media.iter().format(", "))?;
                fmt_children(f, children)
            }
            CssRuleKind::Supports { condition, children } => {
                write!(f, "@supports {condition} ")?;
                fmt_children(f, children)
            }
            CssRuleKind::Document { functions, children } => {
                write!(f, "@document {} ", functions.iter().format(", "))?;
                fmt_children(f, children)
            }
            CssRuleKind::Page { selector, style } => {
                write!(f, "@page ")?;
                if let Some(selector) = selector {
                    write!(f, "{selector} ")?;
                }
                write!(f, "{{ {style}}}")
            }
            CssRuleKind::FontFace { style } => write!(f, "@font-face {{ {style}}}"),
            CssRuleKind::Keyframes { name, children } => {
                write!(f, "@keyframes {name} ")?;
                fmt_children(f, children)
            }
            CssRuleKind::Keyframe { selector, style } => {
                write!(f, "{selector} {{ {style}}}")
            }
            CssRuleKind::UnknownAt { name, prelude } => {
                if prelude.is_empty() {
                    write!(f, "@{name};")
                } else {
                    write!(f, "@{name} {prelude};")
                }
            }
        }
    }
}

/// A style rule: selector plus declaration block
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector: CssSelector,
    pub style: DeclarationBlock,
}

impl Display for StyleRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {{ {}}}", self.selector, self.style)
    }
}

/// Ordered mapping from property name to property. Duplicates replace
/// earlier entries while keeping the position of the first appearance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclarationBlock {
    properties: Vec<CssProperty>,
}

impl DeclarationBlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the property, replacing an earlier one with the same name
    /// in place (last write wins, first position kept)
    pub fn set(&mut self, property: CssProperty) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CssProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CssProperty> {
        self.properties.iter()
    }
}

impl Display for DeclarationBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for property in &self.properties {
            write!(f, "{property}; ")?;
        }
        Ok(())
    }
}

/// A CSS declaration: property name, value and the !important flag
#[derive(Debug, Clone, PartialEq)]
pub struct CssProperty {
    pub name: String,
    pub value: CssValue,
    pub important: bool,
}

impl Display for CssProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.value)?;
        if self.important {
            write!(f, " !important")?;
        }
        Ok(())
    }
}

/// A selector as a flat sequence of parts; combinators and list commas
/// are parts of their own
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssSelector {
    pub parts: Vec<CssSelectorPart>,
}

impl Display for CssSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for part in &self.parts {
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssSelectorPart {
    Universal,
    Type(String),
    Class(String),
    Id(String),
    Attribute {
        name: String,
        matcher: MatcherType,
        value: String,
        flags: String,
    },
    PseudoClass(String),
    PseudoElement(String),
    PseudoFunction {
        name: String,
        argument: CssSelector,
    },
    Combinator(Combinator),
    Comma,
}

impl Display for CssSelectorPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CssSelectorPart::Universal => write!(f, "*"),
            CssSelectorPart::Type(value) => write!(f, "{value}"),
            CssSelectorPart::Class(value) => write!(f, ".{value}"),
            CssSelectorPart::Id(value) => write!(f, "#{value}"),
            CssSelectorPart::Attribute { name, matcher, value, flags } => {
                write!(f, "[{name}")?;
                if *matcher != MatcherType::None {
                    write!(f, "{matcher}\"{value}\"")?;
                }
                if !flags.is_empty() {
                    write!(f, " {flags}")?;
                }
                write!(f, "]")
            }
            CssSelectorPart::PseudoClass(value) => write!(f, ":{value}"),
            CssSelectorPart::PseudoElement(value) => write!(f, "::{value}"),
            CssSelectorPart::PseudoFunction { name, argument } => {
                write!(f, ":{name}({argument})")
            }
            CssSelectorPart::Combinator(combinator) => write!(f, "{combinator}"),
            CssSelectorPart::Comma => write!(f, ", "),
        }
    }
}

/// Combinator between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
    Column,
}

impl Display for Combinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Combinator::Descendant => write!(f, " "),
            Combinator::Child => write!(f, " > "),
            Combinator::NextSibling => write!(f, " + "),
            Combinator::SubsequentSibling => write!(f, " ~ "),
            Combinator::Column => write!(f, " || "),
        }
    }
}

/// Represents which type of matcher is used (in case of an attribute selector)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatcherType {
    /// No matcher, the attribute only has to exist
    #[default]
    None,
    Equals,
    Includes,
    DashMatch,
    PrefixMatch,
    SuffixMatch,
    SubstringMatch,
    NotMatch,
}

impl Display for MatcherType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MatcherType::None => write!(f, ""),
            MatcherType::Equals => write!(f, "="),
            MatcherType::Includes => write!(f, "~="),
            MatcherType::DashMatch => write!(f, "|="),
            MatcherType::PrefixMatch => write!(f, "^="),
            MatcherType::SuffixMatch => write!(f, "$="),
            MatcherType::SubstringMatch => write!(f, "*="),
            MatcherType::NotMatch => write!(f, "!="),
        }
    }
}

/// A parsed CSS value. Values the parser does not structure further are
/// preserved textually as `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    Ident(String),
    String(String),
    Integer(i32),
    Number(f32),
    Percentage(f32),
    Dimension { value: f32, unit: String },
    Hash(String),
    Url(String),
    Function { name: String, arguments: Vec<CssValue> },
    List(Vec<CssValue>),
    Raw(String),
}

/// Writes value items space separated, but keeps separator commas tight
/// to the preceding item ("a, b" rather than "a , b")
fn fmt_value_items(f: &mut Formatter<'_>, items: &[CssValue]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 && !matches!(item, CssValue::Raw(s) if s == ",") {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for CssValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CssValue::Ident(value) => write!(f, "{value}"),
            CssValue::String(value) => write!(f, "\"{value}\""),
            CssValue::Integer(value) => write!(f, "{value}"),
            CssValue::Number(value) => write!(f, "{value}"),
            CssValue::Percentage(value) => write!(f, "{value}%"),
            CssValue::Dimension { value, unit } => write!(f, "{value}{unit}"),
            CssValue::Hash(value) => write!(f, "#{value}"),
            CssValue::Url(url) => write!(f, "url(\"{url}\")"),
            CssValue::Function { name, arguments } => {
                write!(f, "{name}(")?;
                fmt_value_items(f, arguments)?;
                write!(f, ")")
            }
            CssValue::List(items) => fmt_value_items(f, items),
            CssValue::Raw(value) => write!(f, "{value}"),
        }
    }
}

/// Boolean expression of feature-support tests in @supports
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Declaration { property: String, value: CssValue },
    Group(Box<Condition>),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Declaration { property, value } => write!(f, "({property}: {value})"),
            Condition::Group(inner) => write!(f, "({inner})"),
            Condition::Not(inner) => write!(f, "not {inner}"),
            Condition::And(children) => write!(f, "{}", children.iter().format(" and ")),
            Condition::Or(children) => write!(f, "{}", children.iter().format(" or ")),
        }
    }
}

/// Ordered list of percentages (0..100) naming a keyframe; `from` and
/// `to` map to 0 and 100
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeSelector {
    pub stops: Vec<f32>,
}

impl Display for KeyframeSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, stop) in self.stops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{stop}%")?;
        }
        Ok(())
    }
}

/// A media-query atom: type plus constraints
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssMedium {
    /// Media type (screen, print, ...), if given
    pub media_type: Option<String>,
    /// Set by the `not` modifier
    pub inverse: bool,
    /// Set by the `only` modifier
    pub exclusive: bool,
    /// Parenthesized feature constraints, in source order
    pub constraints: Vec<MediaConstraint>,
}

impl CssMedium {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.media_type.is_none() && self.constraints.is_empty()
    }
}

/// A single `(feature)` or `(feature: value)` constraint
#[derive(Debug, Clone, PartialEq)]
pub struct MediaConstraint {
    pub feature: String,
    pub value: Option<CssValue>,
}

impl Display for MediaConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "({}: {})", self.feature, value),
            None => write!(f, "({})", self.feature),
        }
    }
}

impl Display for CssMedium {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut lead = false;

        if self.inverse {
            write!(f, "not")?;
            lead = true;
        } else if self.exclusive {
            write!(f, "only")?;
            lead = true;
        }

        if let Some(media_type) = &self.media_type {
            if lead {
                write!(f, " ")?;
            }
            write!(f, "{media_type}")?;
            lead = true;
        }

        for constraint in &self.constraints {
            if lead {
                write!(f, " and ")?;
            }
            write!(f, "{constraint}")?;
            lead = true;
        }

        Ok(())
    }
}

/// A `@document` matching function
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFunction {
    Url(String),
    UrlPrefix(String),
    Domain(String),
    Regexp(String),
}

impl Display for DocumentFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFunction::Url(url) => write!(f, "url(\"{url}\")"),
            DocumentFunction::UrlPrefix(prefix) => write!(f, "url-prefix(\"{prefix}\")"),
            DocumentFunction::Domain(domain) => write!(f, "domain(\"{domain}\")"),
            DocumentFunction::Regexp(pattern) => write!(f, "regexp(\"{pattern}\")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str, value: &str) -> CssProperty {
        CssProperty {
            name: name.to_string(),
            value: CssValue::Ident(value.to_string()),
            important: false,
        }
    }

    #[test]
    fn duplicate_properties_replace_in_place() {
        let mut block = DeclarationBlock::new();
        block.set(property("color", "red"));
        block.set(property("display", "block"));
        block.set(property("color", "blue"));

        assert_eq!(block.len(), 2);
        assert_eq!(block.get("color").unwrap().value, CssValue::Ident("blue".to_string()));

        // the replaced entry keeps its original position
        let names: Vec<_> = block.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["color", "display"]);
    }

    #[test]
    fn parent_links_resolve_through_the_sheet() {
        let mut sheet = CssStylesheet::new(None);

        let child_id = sheet.allocate_id();
        let child = CssRule::new(
            child_id,
            CssRuleKind::Style(StyleRule {
                selector: CssSelector { parts: vec![CssSelectorPart::Type("a".to_string())] },
                style: DeclarationBlock::new(),
            }),
        );

        let media_id = sheet.allocate_id();
        let mut media = CssRule::new(
            media_id,
            CssRuleKind::Media { media: Vec::new(), children: vec![child] },
        );
        media.adopt_children();
        sheet.attach(media);

        let child = sheet.find_rule(child_id).unwrap();
        assert_eq!(child.parent, Some(media_id));
        assert_eq!(sheet.parent_rule(child).unwrap().id, media_id);
    }

    #[test]
    fn display_produces_parsable_css() {
        let mut block = DeclarationBlock::new();
        block.set(CssProperty {
            name: "width".to_string(),
            value: CssValue::Dimension { value: 10.0, unit: "px".to_string() },
            important: true,
        });

        let rule = StyleRule {
            selector: CssSelector {
                parts: vec![
                    CssSelectorPart::Type("a".to_string()),
                    CssSelectorPart::Combinator(Combinator::Child),
                    CssSelectorPart::Class("nav".to_string()),
                ],
            },
            style: block,
        };

        assert_eq!(rule.to_string(), "a > .nav { width: 10px !important; }");
    }

    #[test]
    fn medium_displays_modifiers_and_constraints() {
        let medium = CssMedium {
            media_type: Some("screen".to_string()),
            inverse: true,
            exclusive: false,
            constraints: vec![MediaConstraint {
                feature: "min-width".to_string(),
                value: Some(CssValue::Dimension { value: 640.0, unit: "px".to_string() }),
            }],
        };

        assert_eq!(medium.to_string(), "not screen and (min-width: 640px)");
    }

    #[test]
    fn condition_display_nests() {
        let condition = Condition::Or(vec![
            Condition::Declaration {
                property: "display".to_string(),
                value: CssValue::Ident("grid".to_string()),
            },
            Condition::Not(Box::new(Condition::Group(Box::new(Condition::Declaration {
                property: "display".to_string(),
                value: CssValue::Ident("flex".to_string()),
            })))),
        ]);

        assert_eq!(condition.to_string(), "(display: grid) or not ((display: flex))");
    }
}
