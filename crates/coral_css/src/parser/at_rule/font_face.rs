use crate::stylesheet::{CssRule, CssRuleKind, CssStylesheet};
use crate::CssParser;

impl CssParser<'_> {
    /// `@font-face` has no prelude, only a declaration block
    pub(crate) fn parse_font_face_rule(&mut self, sheet: &mut CssStylesheet) -> Option<CssRule> {
        log::trace!("parse_font_face_rule");

        if !self.expect_block_open() {
            return None;
        }

        let style = self.parse_declaration_block();

        Some(CssRule::new(sheet.allocate_id(), CssRuleKind::FontFace { style }))
    }
}
