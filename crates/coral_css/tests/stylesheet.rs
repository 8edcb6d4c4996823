//! End-to-end stylesheet parsing tests

use coral_css::errors::{ErrorCode, ErrorListener};
use coral_css::parser_config::ParserConfig;
use coral_css::properties::{PropertyFactory, PropertySlot};
use coral_css::stylesheet::{Condition, CssRuleKind, CssStylesheet, CssValue};
use coral_css::{parse_stylesheet, StylesheetParser};
use coral_shared::text_stream::Location;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct ErrorCollector {
    codes: RefCell<Vec<(ErrorCode, Location)>>,
}

impl ErrorCollector {
    fn codes(&self) -> Vec<ErrorCode> {
        self.codes.borrow().iter().map(|(code, _)| *code).collect()
    }
}

impl ErrorListener for ErrorCollector {
    fn on_error(&self, code: ErrorCode, location: Location) {
        self.codes.borrow_mut().push((code, location));
    }
}

fn parse_collecting(data: &str) -> (CssStylesheet, Rc<ErrorCollector>) {
    let collector = Rc::new(ErrorCollector::default());
    let config = ParserConfig {
        listeners: vec![collector.clone()],
        ..Default::default()
    };

    (parse_stylesheet(data, config), collector)
}

fn style_of(sheet: &CssStylesheet, index: usize) -> &coral_css::stylesheet::StyleRule {
    sheet.rules[index].as_style().expect("expected a style rule")
}

#[test]
fn single_style_rule() {
    let (sheet, collector) = parse_collecting("a { color: red }");

    assert_eq!(sheet.rules.len(), 1);
    let rule = style_of(&sheet, 0);
    assert_eq!(rule.selector.to_string(), "a");
    assert_eq!(rule.style.len(), 1);

    let property = rule.style.get("color").unwrap();
    assert_eq!(property.value, CssValue::Ident("red".to_string()));
    assert!(!property.important);

    assert!(collector.codes().is_empty());
}

#[test]
fn duplicate_declarations_are_last_write_wins() {
    let (sheet, _) = parse_collecting("a { color: red; color: blue; }");

    let rule = style_of(&sheet, 0);
    assert_eq!(rule.style.len(), 1);
    assert_eq!(rule.style.get("color").unwrap().value, CssValue::Ident("blue".to_string()));
}

#[test]
fn media_rule_with_constraint_and_nested_rule() {
    let (sheet, collector) = parse_collecting("@media (min-width: 640px) { a { color: red } }");

    assert_eq!(sheet.rules.len(), 1);
    let CssRuleKind::Media { ref media, ref children } = sheet.rules[0].kind else {
        panic!("expected a media rule");
    };

    assert_eq!(media.len(), 1);
    assert_eq!(media[0].constraints.len(), 1);
    assert_eq!(media[0].constraints[0].feature, "min-width");
    assert_eq!(
        media[0].constraints[0].value,
        Some(CssValue::Dimension { value: 640.0, unit: "px".to_string() })
    );

    assert_eq!(children.len(), 1);
    let child = children[0].as_style().unwrap();
    assert_eq!(child.selector.to_string(), "a");

    // parent back-reference resolves through the sheet
    assert_eq!(children[0].parent, Some(sheet.rules[0].id));
    assert_eq!(sheet.parent_rule(&children[0]).unwrap().id, sheet.rules[0].id);

    assert!(collector.codes().is_empty());
}

#[test]
fn supports_rule_with_or_condition_and_empty_body() {
    let (sheet, _) = parse_collecting("@supports (display: grid) or (display: flex) { }");

    let CssRuleKind::Supports { ref condition, ref children } = sheet.rules[0].kind else {
        panic!("expected a supports rule");
    };

    assert!(children.is_empty());

    let Condition::Or(ref tests) = condition else {
        panic!("expected an or-condition, got {condition:?}");
    };
    assert_eq!(
        tests[0],
        Condition::Declaration {
            property: "display".to_string(),
            value: CssValue::Ident("grid".to_string()),
        }
    );
    assert_eq!(
        tests[1],
        Condition::Declaration {
            property: "display".to_string(),
            value: CssValue::Ident("flex".to_string()),
        }
    );
}

#[test]
fn keyframes_rule_with_from_percentage_and_to() {
    let (sheet, _) =
        parse_collecting("@keyframes spin { from { opacity: 0 } 50% { opacity: 0.5 } to { opacity: 1 } }");

    let CssRuleKind::Keyframes { ref name, ref children } = sheet.rules[0].kind else {
        panic!("expected a keyframes rule");
    };

    assert_eq!(name, "spin");
    assert_eq!(children.len(), 3);

    let stops: Vec<Vec<f32>> = children
        .iter()
        .map(|child| match &child.kind {
            CssRuleKind::Keyframe { selector, .. } => selector.stops.clone(),
            _ => panic!("expected keyframe rules"),
        })
        .collect();
    assert_eq!(stops, vec![vec![0.0], vec![50.0], vec![100.0]]);
}

#[test]
fn missing_value_is_reported_and_later_declaration_survives() {
    let (sheet, collector) = parse_collecting("a { color: ; color: red }");

    let rule = style_of(&sheet, 0);
    assert_eq!(rule.style.len(), 1);
    assert_eq!(rule.style.get("color").unwrap().value, CssValue::Ident("red".to_string()));

    assert_eq!(collector.codes(), vec![ErrorCode::ValueMissing]);
}

#[test]
fn unknown_at_rule_is_reported_and_following_rule_recovers() {
    let (sheet, collector) = parse_collecting("@unknown foo { bar }\na { color: red }");

    assert_eq!(sheet.rules.len(), 2);
    let CssRuleKind::UnknownAt { ref name, ref prelude } = sheet.rules[0].kind else {
        panic!("expected an unknown at-rule");
    };
    assert_eq!(name, "unknown");
    assert_eq!(prelude, "foo");

    let rule = style_of(&sheet, 1);
    assert_eq!(rule.selector.to_string(), "a");

    assert_eq!(collector.codes(), vec![ErrorCode::UnknownAtRule]);
}

#[test]
fn rule_order_is_preserved() {
    let (sheet, _) = parse_collecting("b { } @media screen { } a { } @font-face { }");

    let kinds: Vec<&str> = sheet
        .rules
        .iter()
        .map(|rule| match rule.kind {
            CssRuleKind::Style(_) => "style",
            CssRuleKind::Media { .. } => "media",
            CssRuleKind::FontFace { .. } => "font-face",
            _ => "other",
        })
        .collect();

    assert_eq!(kinds, vec!["style", "media", "style", "font-face"]);
}

#[test]
fn charset_import_and_namespace_preludes() {
    let (sheet, _) = parse_collecting(
        "@charset \"utf-8\";\n@import url(\"base.css\") screen;\n@namespace svg url(\"http://www.w3.org/2000/svg\");",
    );

    assert_eq!(sheet.rules.len(), 3);
    assert!(matches!(sheet.rules[0].kind, CssRuleKind::Charset { ref encoding } if encoding == "utf-8"));

    let CssRuleKind::Import { ref href, ref media } = sheet.rules[1].kind else {
        panic!("expected an import rule");
    };
    assert_eq!(href, "base.css");
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].media_type.as_deref(), Some("screen"));

    let CssRuleKind::Namespace { ref prefix, ref url } = sheet.rules[2].kind else {
        panic!("expected a namespace rule");
    };
    assert_eq!(prefix.as_deref(), Some("svg"));
    assert_eq!(url, "http://www.w3.org/2000/svg");
}

#[test]
fn document_rule_collects_functions() {
    let (sheet, _) = parse_collecting("@-moz-document url-prefix(\"https://a.example/\"), domain(\"b.example\") { a { } }");

    let CssRuleKind::Document { ref functions, ref children } = sheet.rules[0].kind else {
        panic!("expected a document rule");
    };

    assert_eq!(functions.len(), 2);
    assert_eq!(children.len(), 1);
}

#[test]
fn vendor_prefixed_keyframes_dispatch_like_plain_keyframes() {
    let (sheet, _) = parse_collecting("@-webkit-keyframes spin { from { opacity: 0 } }");

    assert!(matches!(sheet.rules[0].kind, CssRuleKind::Keyframes { ref name, .. } if name == "spin"));
}

#[test]
fn page_rule_takes_an_optional_selector() {
    let (sheet, _) = parse_collecting("@page :first { margin: 0 } @page { margin: 0 }");

    let CssRuleKind::Page { ref selector, ref style } = sheet.rules[0].kind else {
        panic!("expected a page rule");
    };
    assert_eq!(selector.as_ref().unwrap().to_string(), ":first");
    assert_eq!(style.len(), 1);

    let CssRuleKind::Page { ref selector, .. } = sheet.rules[1].kind else {
        panic!("expected a page rule");
    };
    assert!(selector.is_none());
}

#[test]
fn top_level_block_is_reported_and_skipped() {
    let (sheet, collector) = parse_collecting("{ b { } } a { color: red }");

    assert_eq!(sheet.rules.len(), 1);
    assert_eq!(style_of(&sheet, 0).selector.to_string(), "a");
    assert_eq!(collector.codes(), vec![ErrorCode::InvalidBlockStart]);
}

#[test]
fn stray_literal_at_top_level_resyncs_to_next_rule() {
    let (sheet, collector) = parse_collecting("\"garbage\" a { } ; b { color: red }");

    // the literal eats up to the first balanced `}`; the stray `;` is
    // reported on its own and the next rule recovers
    assert_eq!(collector.codes()[0], ErrorCode::InvalidToken);
    let last = sheet.rules.last().expect("recovered rule");
    assert_eq!(last.as_style().unwrap().selector.to_string(), "b");
}

#[test]
fn missing_colon_drops_only_that_declaration() {
    let (sheet, collector) = parse_collecting("a { color red; margin: 0 }");

    let rule = style_of(&sheet, 0);
    assert_eq!(rule.style.len(), 1);
    assert!(rule.style.get("margin").is_some());
    assert_eq!(collector.codes(), vec![ErrorCode::ColonMissing]);
}

#[test]
fn malformed_declaration_does_not_consume_past_the_block() {
    let (sheet, collector) = parse_collecting("a { 5px; color: red } b { color: blue }");

    assert_eq!(sheet.rules.len(), 2);
    let rule = style_of(&sheet, 0);
    assert_eq!(rule.style.get("color").unwrap().value, CssValue::Ident("red".to_string()));
    assert!(collector.codes().contains(&ErrorCode::IdentExpected));
}

#[test]
fn missing_nested_block_does_not_eat_the_enclosing_brace() {
    // `a`'s selector reading stops at the media rule's own `}`; that
    // brace must close the media rule, not get swallowed as the start of
    // a bad style rule
    let (sheet, collector) = parse_collecting("@media (min-width: 1px) { a } b { color: green }");

    assert_eq!(sheet.rules.len(), 2);
    let CssRuleKind::Media { ref children, .. } = sheet.rules[0].kind else {
        panic!("expected a media rule");
    };
    assert!(children.is_empty());

    assert_eq!(style_of(&sheet, 1).selector.to_string(), "b");
    assert!(collector.codes().contains(&ErrorCode::InvalidToken));
}

#[test]
fn bodyless_nested_at_rule_does_not_eat_the_enclosing_brace() {
    let (sheet, collector) = parse_collecting("@media (min-width:1px){@font-face} b{color:green}");

    assert_eq!(sheet.rules.len(), 2);
    let CssRuleKind::Media { ref children, .. } = sheet.rules[0].kind else {
        panic!("expected a media rule");
    };
    assert!(children.is_empty());

    let rule = style_of(&sheet, 1);
    assert_eq!(rule.selector.to_string(), "b");
    assert_eq!(rule.style.get("color").unwrap().value, CssValue::Ident("green".to_string()));
    assert!(collector.codes().contains(&ErrorCode::InvalidToken));
}

#[test]
fn invalid_selector_rules_are_dropped_by_default() {
    let (sheet, collector) = parse_collecting("a > > b { color: red } c { color: blue }");

    assert_eq!(sheet.rules.len(), 1);
    assert_eq!(style_of(&sheet, 0).selector.to_string(), "c");
    assert!(collector.codes().contains(&ErrorCode::InvalidSelector));
}

#[test]
fn invalid_selector_rules_can_be_kept_via_config() {
    let collector = Rc::new(ErrorCollector::default());
    let config = ParserConfig {
        keep_invalid_selectors: true,
        listeners: vec![collector.clone()],
        ..Default::default()
    };

    let sheet = parse_stylesheet("a > > b { color: red }", config);

    assert_eq!(sheet.rules.len(), 1);
    assert!(collector.codes().contains(&ErrorCode::InvalidSelector));
}

#[test]
fn important_flag_is_stamped_on_the_property() {
    let (sheet, _) = parse_collecting("a { color: red !important }");

    let property = style_of(&sheet, 0).style.get("color").unwrap();
    assert!(property.important);
    assert_eq!(property.value, CssValue::Ident("red".to_string()));
}

#[derive(Debug)]
struct ColorOnlyFactory;

struct IdentSlot;

impl PropertySlot for IdentSlot {
    fn try_set_value(&mut self, value: &CssValue) -> bool {
        matches!(value, CssValue::Ident(_))
    }
}

impl PropertyFactory for ColorOnlyFactory {
    fn create(&self, name: &str) -> Option<Box<dyn PropertySlot>> {
        if name == "color" {
            Some(Box::new(IdentSlot))
        } else {
            None
        }
    }
}

#[test]
fn unknown_property_names_are_preserved_as_raw_text() {
    let collector = Rc::new(ErrorCollector::default());
    let config = ParserConfig {
        listeners: vec![collector.clone()],
        property_factory: Rc::new(ColorOnlyFactory),
        ..Default::default()
    };

    let sheet = parse_stylesheet("a { color: red; -x-custom: 1px solid }", config);

    let rule = style_of(&sheet, 0);
    assert_eq!(rule.style.len(), 2);
    assert_eq!(
        rule.style.get("-x-custom").unwrap().value,
        CssValue::Raw("1px solid".to_string())
    );
    assert_eq!(collector.codes(), vec![ErrorCode::UnknownDeclarationName]);
}

#[test]
fn rejected_values_drop_the_declaration() {
    let config = ParserConfig {
        property_factory: Rc::new(ColorOnlyFactory),
        ..Default::default()
    };

    let sheet = parse_stylesheet("a { color: 5px; color: red }", config);

    let rule = style_of(&sheet, 0);
    assert_eq!(rule.style.len(), 1);
    assert_eq!(rule.style.get("color").unwrap().value, CssValue::Ident("red".to_string()));
}

#[test]
fn parser_is_total_on_hostile_inputs() {
    let inputs = [
        "",
        "}",
        "{",
        ")){(",
        "a",
        "a {",
        "a { color: red",
        "a { color: url(",
        "@",
        "@media",
        "@media (",
        "@import",
        "@keyframes",
        "@supports ((((",
        "/* unterminated",
        "\"unterminated",
        "a[href",
        "a { b: c } } } ;;; @x ; {}{}{}",
        "\u{FFFD}\\",
        "@media a and (b:  { } x { y: z }",
    ];

    for input in inputs {
        let (sheet, _) = parse_collecting(input);
        // no panic and a usable (possibly empty) sheet
        let _ = sheet.to_string();
    }
}

#[test]
fn serialization_round_trips() {
    let source = "@charset \"utf-8\"; \
                  @import url(\"base.css\") screen; \
                  @media screen and (min-width: 640px) { a > .nav { width: 10px !important; } } \
                  @supports (display: grid) or (display: flex) { } \
                  @keyframes spin { 0% { opacity: 0; } 100% { opacity: 1; } } \
                  @font-face { font-family: \"Coral\"; } \
                  a[href^=\"https\"]:hover { color: #fff; }";

    let (first, collector) = parse_collecting(source);
    assert!(collector.codes().is_empty(), "unexpected errors: {:?}", collector.codes());

    let serialized = first.to_string();
    let (second, collector) = parse_collecting(&serialized);

    assert!(collector.codes().is_empty(), "round-trip errors in {serialized:?}: {:?}", collector.codes());
    assert_eq!(first, second, "serialized form {serialized:?} did not round-trip");
}

#[test]
#[ignore]
fn trace_a_larger_sheet() {
    simple_logger::SimpleLogger::new().init().unwrap();

    let source = "
    /* Navbar */
    #header .nav {
        font-size: 1.1rem;
    }

    @media screen and (max-width: 200px) {
        #header .nav { display: none }
    }

    @keyframes fade { from { opacity: 0 } to { opacity: 1 } }
    ";

    let (sheet, collector) = parse_collecting(source);
    println!("{sheet}");
    println!("{:?}", collector.codes());
}

#[test]
fn async_and_sync_parse_agree() {
    let source = "@media screen { a { color: red } } b { margin: 0 }";

    let sync_sheet = parse_stylesheet(source, ParserConfig::default());

    let parser = StylesheetParser::from_text(source, ParserConfig::default());
    let async_sheet = futures::executor::block_on(
        parser.parse_async(coral_shared::cancel::CancelToken::new()),
    )
    .unwrap();

    assert_eq!(*async_sheet, sync_sheet);
}
