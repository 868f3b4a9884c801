//! Inline markup
//!
//! Statement text is matched against plain patterns, so inline Markdown is
//! reduced to the text a reader sees: emphasis, strong and strikethrough
//! delimiters are dropped, code spans keep their content verbatim, links and
//! images keep their label (or alt text), and backslash escapes yield the
//! escaped character. `[[Name]]` and `[[Name|label]]` wiki links are recorded
//! as references and read as their label.
//!
//! Delimiters that do not close on the same line stay literal text, and `_`
//! inside a word never starts emphasis, so `snake_case` and `2*3` survive.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum InlineLexeme {
    #[regex(r"\[\[[^\[\]]+\]\]")]
    WikiLink,

    #[regex(r"!\[[^\]]*\]\([^)]*\)")]
    Image,

    #[regex(r"\[[^\]]+\]\([^)]*\)")]
    Link,

    #[regex(r"<[A-Za-z][A-Za-z0-9+.-]*:[^<>\s]*>")]
    Autolink,

    #[regex(r"`[^`]+`")]
    Code,

    #[regex(r"\*\*[^*]+\*\*")]
    StrongStar,

    #[regex(r"__[^_]+__")]
    StrongUnderscore,

    #[regex(r"\*[^*\s]([^*]*[^*\s])?\*")]
    EmphasisStar,

    #[regex(r"_[^_\s]([^_]*[^_\s])?_")]
    EmphasisUnderscore,

    #[regex(r"~~[^~]+~~")]
    Strikethrough,

    #[regex(r"\\[!-/:-@\[-`{-~]")]
    Escape,

    #[regex(r"[^*_~`!\[\\<]+")]
    Text,
}

/// Plain text of a line plus the wiki links it references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineText {
    pub text: String,
    /// Link targets in source order, duplicates kept.
    pub links: Vec<String>,
}

/// Reduce inline markup to plain text, collecting wiki links.
pub fn strip_inline(raw: &str) -> InlineText {
    let mut inline = InlineText::default();
    strip_into(raw, &mut inline);
    inline.text = inline.text.trim().to_string();
    inline
}

fn strip_into(raw: &str, out: &mut InlineText) {
    let mut lexer = InlineLexeme::lexer(raw);

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        let lexeme = match result {
            Ok(lexeme) => lexeme,
            Err(()) => {
                out.text.push_str(slice);
                continue;
            }
        };

        match lexeme {
            InlineLexeme::Text => out.text.push_str(slice),
            InlineLexeme::Escape => out.text.push_str(&slice[1..]),
            InlineLexeme::Code => out.text.push_str(&slice[1..slice.len() - 1]),
            InlineLexeme::Autolink => out.text.push_str(&slice[1..slice.len() - 1]),
            InlineLexeme::WikiLink => {
                let inner = &slice[2..slice.len() - 2];
                let (target, label) = match inner.split_once('|') {
                    Some((target, label)) => (target.trim(), label.trim()),
                    None => (inner.trim(), inner.trim()),
                };
                out.links.push(target.to_string());
                out.text.push_str(label);
            }
            InlineLexeme::Image => {
                let close = slice.find("](").unwrap_or(slice.len());
                out.text.push_str(&slice[2..close]);
            }
            InlineLexeme::Link => {
                let close = slice.find("](").unwrap_or(slice.len());
                strip_into(&slice[1..close], out);
            }
            InlineLexeme::StrongStar | InlineLexeme::Strikethrough => {
                strip_into(&slice[2..slice.len() - 2], out);
            }
            InlineLexeme::EmphasisStar => strip_into(&slice[1..slice.len() - 1], out),
            InlineLexeme::StrongUnderscore | InlineLexeme::EmphasisUnderscore => {
                if intraword(raw, lexer.span()) {
                    out.text.push_str(slice);
                    continue;
                }
                let width = if lexeme == InlineLexeme::StrongUnderscore { 2 } else { 1 };
                strip_into(&slice[width..slice.len() - width], out);
            }
        }
    }
}

/// Whether a span is glued to a word on either side.
fn intraword(raw: &str, span: Range<usize>) -> bool {
    let before = raw[..span.start].chars().next_back();
    let after = raw[span.end..].chars().next();
    before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn text(raw: &str) -> String {
        strip_inline(raw).text
    }

    #[rstest(raw, expected,
        case("**Adds** 4 health to you", "Adds 4 health to you"),
        case("Heals `2`", "Heals 2"),
        case("Deals *10* damage", "Deals 10 damage"),
        case("Deals _10_ damage", "Deals 10 damage"),
        case("__Heals__ 2", "Heals 2"),
        case("Deals ~~8~~ 10 damage", "Deals 8 10 damage"),
        case("Summons a [wolf](creatures/wolf.md)", "Summons a wolf"),
        case("Summons a [**wolf**](x)", "Summons a wolf"),
        case("![potion icon](icon.png) Heals 2", "potion icon Heals 2"),
        case("See <https://example.com>", "See https://example.com"),
        case(r"Costs \*5\* gold", "Costs *5* gold")
    )]
    fn test_markup_is_stripped(raw: &str, expected: &str) {
        assert_eq!(text(raw), expected);
    }

    #[rstest(raw => [
        "Deals 2*3 damage",
        "uses snake_case_names",
        "a lone ` backtick",
        "[not a link]",
        "wow!",
        "a < b",
    ])]
    fn test_unpaired_delimiters_stay_literal(raw: &str) {
        assert_eq!(text(raw), raw);
    }

    #[test]
    fn test_wiki_links_are_recorded() {
        let inline = strip_inline("Summons [[Wolf]] near [[Den|the den]]");
        assert_eq!(inline.text, "Summons Wolf near the den");
        assert_eq!(inline.links, vec!["Wolf", "Den"]);
    }

    #[test]
    fn test_links_inside_emphasis_are_recorded() {
        let inline = strip_inline("**Summons [[Wolf]]**");
        assert_eq!(inline.text, "Summons Wolf");
        assert_eq!(inline.links, vec!["Wolf"]);
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let inline = strip_inline("Adds 4 health to you");
        assert_eq!(inline.text, "Adds 4 health to you");
        assert!(inline.links.is_empty());
    }
}
