//! Value Parser
//!
//! The value parser walks the token stream by recursive descent and builds
//! the value tree. It handles:
//! - Scalars: null, booleans, integers in four notations, floats, strings
//! - Flow collections: `[...]` sequences and `{...}` mappings
//! - Block collections: `-` sequences, `key:` and `? key` mappings
//! - Block scalars: `|` literal and `>` folded text
//! - Anchors and aliases
//!
//! Each function takes the context by value and returns the context after
//! the consumed tokens together with the parsed value.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::context::ParseContext;
use crate::error::{ParseError, Result};
use crate::escape::{fold_block, fold_flow, unescape_double, unescape_single, unwrap_quoted};
use crate::lexer::TokenKind;
use crate::value::{Mapping, Value};

/// A parsed value and the context after it.
pub type Parsed<'t> = Result<(ParseContext<'t>, Value)>;

/// Parse one value at the current position, skipping leading spaces.
///
/// Fails with [`ParseError::TooDeep`] instead of recursing without bound.
pub fn parse_value(ctx: ParseContext<'_>) -> Parsed<'_> {
    let (ctx, value) = parse_node(ctx.descend()?)?;
    Ok((ctx.ascend(), value))
}

fn parse_node(ctx: ParseContext<'_>) -> Parsed<'_> {
    let ctx = ctx.skip_space();
    let kind = ctx.peek_kind();
    match kind {
        TokenKind::Null => Ok((ctx.advance(), Value::Null)),
        TokenKind::True => Ok((ctx.advance(), Value::Bool(true))),
        TokenKind::False => Ok((ctx.advance(), Value::Bool(false))),
        TokenKind::Int | TokenKind::IntOctal | TokenKind::IntHex | TokenKind::IntSexagesimal => {
            parse_int(ctx)
        }
        TokenKind::Double => match ctx.peek_text().parse::<f64>() {
            Ok(n) => Ok((ctx.advance(), Value::Double(n))),
            Err(_) => Err(ParseError::UnexpectedToken(kind, ctx.near())),
        },
        TokenKind::PosInfinity => Ok((ctx.advance(), Value::Double(f64::INFINITY))),
        TokenKind::NegInfinity => Ok((ctx.advance(), Value::Double(f64::NEG_INFINITY))),
        TokenKind::NaN => Ok((ctx.advance(), Value::Double(f64::NAN))),
        TokenKind::Dash => parse_block_seq(ctx),
        TokenKind::OpenBracket => parse_flow_seq(ctx),
        TokenKind::OpenBrace => parse_flow_map(ctx),
        TokenKind::QuestionMark => parse_block_map(ctx),
        TokenKind::PlainString | TokenKind::DoubleQuoted | TokenKind::SingleQuoted => {
            parse_block_map_or_string(ctx)
        }
        TokenKind::LiteralBlock => {
            let text = ctx.peek_text().to_string();
            Ok((ctx.advance(), Value::String(text)))
        }
        TokenKind::FoldedBlock => {
            let text = fold_block(ctx.peek_text());
            Ok((ctx.advance(), Value::String(text)))
        }
        TokenKind::Indent => {
            let (ctx, value) = parse_value(ctx.advance())?;
            let ctx = ctx.skip_space().expect(TokenKind::Dedent, "dedent")?;
            Ok((ctx, value))
        }
        TokenKind::Anchor => {
            let name = &ctx.peek_text()[1..];
            let (ctx, value) = parse_value(ctx.advance())?;
            Ok((ctx.with_anchor(name, value.clone()), value))
        }
        TokenKind::Alias => {
            let name = &ctx.peek_text()[1..];
            let Some(value) = ctx.anchor(name).cloned() else {
                return Err(ParseError::UnknownAlias(name.to_string(), ctx.near()));
            };
            let (nodes, depth) = measure(&value);
            let ctx = ctx.expand_alias(name, nodes, depth)?;
            Ok((ctx.advance(), value))
        }
        TokenKind::End | TokenKind::Dedent => Ok((ctx, Value::Null)),
        _ => Err(ParseError::UnexpectedToken(kind, ctx.near())),
    }
}

/// Node count and nesting depth of a value, without recursion.
fn measure(value: &Value) -> (usize, usize) {
    let mut nodes = 0;
    let mut deepest = 0;
    let mut pending = vec![(value, 1)];
    while let Some((value, depth)) = pending.pop() {
        nodes += 1;
        deepest = deepest.max(depth);
        match value {
            Value::Sequence(seq) => pending.extend(seq.iter().map(|v| (v, depth + 1))),
            Value::Mapping(map) => {
                for (k, v) in map.iter() {
                    pending.push((k, depth + 1));
                    pending.push((v, depth + 1));
                }
            }
            _ => {}
        }
    }
    (nodes, deepest)
}

// ============================================================================
// Scalars
// ============================================================================

fn split_sign(text: &str) -> (bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

/// Integer value of a decimal, `0o` octal, `0x` hex or sexagesimal literal.
/// Returns `None` when the value does not fit in 64 bits.
fn int_value(kind: TokenKind, text: &str) -> Option<i64> {
    let (negative, digits) = split_sign(text);
    let magnitude = match kind {
        TokenKind::IntSexagesimal => {
            let mut n = BigInt::from(0u32);
            for group in digits.split(':') {
                n = n * 60u32 + group.parse::<u32>().ok()?;
            }
            n
        }
        TokenKind::IntOctal => {
            BigInt::parse_bytes(digits.strip_prefix("0o").unwrap_or(digits).as_bytes(), 8)?
        }
        TokenKind::IntHex => {
            BigInt::parse_bytes(digits.strip_prefix("0x").unwrap_or(digits).as_bytes(), 16)?
        }
        _ => BigInt::parse_bytes(digits.as_bytes(), 10)?,
    };
    let n = if negative { -magnitude } else { magnitude };
    n.to_i64()
}

fn parse_int(ctx: ParseContext<'_>) -> Parsed<'_> {
    let text = ctx.peek_text();
    match int_value(ctx.peek_kind(), text) {
        Some(n) => Ok((ctx.advance(), Value::Int(n))),
        None => Err(ParseError::NumericOverflow(text.to_string(), ctx.near())),
    }
}

/// Parse a plain or quoted string token.
pub fn parse_string(ctx: ParseContext<'_>) -> Parsed<'_> {
    let text = ctx.peek_text();
    let value = match ctx.peek_kind() {
        TokenKind::PlainString => fold_flow(text.trim_matches([' ', '\t', '\n'])),
        TokenKind::DoubleQuoted => unescape_double(&fold_flow(unwrap_quoted(text))),
        TokenKind::SingleQuoted => unescape_single(&fold_flow(unwrap_quoted(text))),
        _ => return Err(ParseError::Expected("string", ctx.near())),
    };
    Ok((ctx.advance(), Value::String(value)))
}

/// A single-line string directly followed by a colon starts a block
/// mapping; anything else is a string scalar.
fn parse_block_map_or_string(ctx: ParseContext<'_>) -> Parsed<'_> {
    if ctx.next_kind() == TokenKind::Colon && !ctx.peek_text().contains('\n') {
        parse_block_map(ctx)
    } else {
        parse_string(ctx)
    }
}

// ============================================================================
// Collections
// ============================================================================

fn duplicate_key(ctx: &ParseContext<'_>, key: &Value) -> ParseError {
    ParseError::DuplicateKey(key.to_string(), ctx.near())
}

fn parse_flow_seq(ctx: ParseContext<'_>) -> Parsed<'_> {
    let mut ctx = ctx.expect(TokenKind::OpenBracket, "[")?;
    let mut seq = Vec::new();
    loop {
        ctx = ctx.skip_space();
        if !seq.is_empty() && ctx.peek_kind() != TokenKind::CloseBracket {
            ctx = ctx.expect(TokenKind::Comma, "comma")?.skip_space();
        }
        if ctx.peek_kind() == TokenKind::CloseBracket {
            return Ok((ctx.advance(), Value::Sequence(seq)));
        }
        let (next, value) = parse_value(ctx)?;
        seq.push(value);
        ctx = next;
    }
}

fn parse_flow_map(ctx: ParseContext<'_>) -> Parsed<'_> {
    let mut ctx = ctx.expect(TokenKind::OpenBrace, "{")?;
    let mut map = Mapping::new();
    loop {
        ctx = ctx.skip_space();
        if !map.is_empty() && ctx.peek_kind() != TokenKind::CloseBrace {
            ctx = ctx.expect(TokenKind::Comma, "comma")?.skip_space();
        }
        if ctx.peek_kind() == TokenKind::CloseBrace {
            return Ok((ctx.advance(), Value::Mapping(map)));
        }
        let (at_key, key) = parse_string(ctx)?;
        let next = at_key
            .clone()
            .skip_space()
            .expect(TokenKind::Colon, "colon")?
            .skip_space();
        let (next, value) = match next.peek_kind() {
            TokenKind::Comma | TokenKind::CloseBrace => (next, Value::Null),
            _ => parse_value(next)?,
        };
        map.try_insert(key, value)
            .map_err(|(key, _)| duplicate_key(&at_key, &key))?;
        ctx = next;
    }
}

fn parse_block_seq(mut ctx: ParseContext<'_>) -> Parsed<'_> {
    let mut seq = Vec::new();
    while ctx.peek_kind() == TokenKind::Dash {
        let next = ctx
            .advance()
            .expect(TokenKind::Indent, "indent after dash")?;
        let (next, value) = parse_value(next)?;
        ctx = next
            .skip_space()
            .expect(TokenKind::Dedent, "dedent after dash indent")?
            .skip_space();
        seq.push(value);
    }
    Ok((ctx, Value::Sequence(seq)))
}

/// Block mapping with `? key` entries, implicit `key:` entries, or both.
fn parse_block_map(mut ctx: ParseContext<'_>) -> Parsed<'_> {
    let mut map = Mapping::new();
    loop {
        let kind = ctx.peek_kind();
        let (at_key, key) = if kind == TokenKind::QuestionMark {
            parse_value(ctx.clone().advance())?
        } else if kind.is_string() {
            parse_string(ctx.clone())?
        } else {
            break;
        };
        let next = at_key.clone().skip_space();
        let (next, value) = if kind == TokenKind::QuestionMark
            && next.peek_kind() != TokenKind::Colon
        {
            (next, Value::Null)
        } else {
            parse_value(next.expect(TokenKind::Colon, "colon")?)?
        };
        map.try_insert(key, value)
            .map_err(|(key, _)| duplicate_key(&at_key, &key))?;
        ctx = next.skip_space();
    }
    Ok((ctx, Value::Mapping(map)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(text: &str) -> Value {
        let tokens = tokenize(text).unwrap();
        let (_, value) = parse_value(ParseContext::new(&tokens)).unwrap();
        value
    }

    fn parse_err(text: &str) -> ParseError {
        let tokens = tokenize(text).unwrap();
        parse_value(ParseContext::new(&tokens)).unwrap_err()
    }

    fn seq(values: Vec<Value>) -> Value {
        Value::Sequence(values)
    }

    #[test]
    fn test_int_value() {
        assert_eq!(int_value(TokenKind::Int, "-42"), Some(-42));
        assert_eq!(int_value(TokenKind::Int, "+7"), Some(7));
        assert_eq!(int_value(TokenKind::IntHex, "0x1F"), Some(31));
        assert_eq!(int_value(TokenKind::IntOctal, "0o17"), Some(15));
        assert_eq!(int_value(TokenKind::IntSexagesimal, "02:30"), Some(150));
        assert_eq!(int_value(TokenKind::IntSexagesimal, "-01:00:00"), Some(-3600));
        assert_eq!(
            int_value(TokenKind::Int, "-9223372036854775808"),
            Some(i64::MIN)
        );
        assert_eq!(int_value(TokenKind::Int, "9223372036854775808"), None);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse("0x1F"), Value::Int(31));
        assert_eq!(parse("1.5e2"), Value::Double(150.0));
        assert_eq!(parse("-.inf"), Value::Double(f64::NEG_INFINITY));
        assert!(parse(".nan").as_f64().unwrap().is_nan());
        assert_eq!(parse("~"), Value::Null);
        assert_eq!(parse("FALSE"), Value::Bool(false));
        assert_eq!(parse(""), Value::Null);
    }

    #[test]
    fn test_overflow() {
        let err = parse_err("99999999999999999999");
        assert_eq!(
            err.to_string(),
            "integer out of range 99999999999999999999, near \"99999999999999999999\""
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("hello world"), Value::from("hello world"));
        assert_eq!(parse("\"tab\\there\""), Value::from("tab\there"));
        assert_eq!(parse("'it''s'"), Value::from("it's"));
        assert_eq!(parse("folded\n  lines\n"), Value::from("folded lines"));
    }

    #[test]
    fn test_flow_sequence() {
        assert_eq!(
            parse("[1, 2, 3]"),
            seq(vec![1.into(), 2.into(), 3.into()])
        );
        assert_eq!(parse("[ ]"), seq(vec![]));
        assert_eq!(parse("[a, [b],]"), seq(vec!["a".into(), seq(vec!["b".into()])]));
    }

    #[test]
    fn test_flow_sequence_missing_comma() {
        let err = parse_err(r#"["a" "b"]"#);
        assert_eq!(err.to_string(), r#"expected comma, near "\"b\"]""#);
    }

    #[test]
    fn test_flow_mapping() {
        let value = parse("{a: 1, \"b c\": [x], d: }");
        assert_eq!(value["a"], Value::Int(1));
        assert_eq!(value["b c"][0], Value::from("x"));
        assert!(value["d"].is_null());
        assert_eq!(value.len(), 3);
    }

    #[test]
    fn test_flow_mapping_duplicate_key() {
        let err = parse_err("{a: 1, a: 2}");
        assert_eq!(err.to_string(), "duplicate key \"a\", near \": 2}\"");
    }

    #[test]
    fn test_block_sequence() {
        assert_eq!(
            parse("- 1\n- 2\n- 3\n"),
            seq(vec![1.into(), 2.into(), 3.into()])
        );
        assert_eq!(
            parse("- - a\n  - b\n- c\n"),
            seq(vec![seq(vec!["a".into(), "b".into()]), "c".into()])
        );
    }

    #[test]
    fn test_block_mapping() {
        let value = parse("a: 1\nb:\n  c: true\n  d:\n  - x\n  - y\ne:\n");
        assert_eq!(value["a"], Value::Int(1));
        assert_eq!(value["b"]["c"], Value::Bool(true));
        assert_eq!(value["b"]["d"][1], Value::from("y"));
        assert!(value["e"].is_null());
    }

    #[test]
    fn test_explicit_keys() {
        let value = parse("? [a, b]\n: pair\n? lone\n");
        let key = seq(vec!["a".into(), "b".into()]);
        assert_eq!(value[&key], Value::from("pair"));
        assert!(value.as_mapping().unwrap().contains_key(&"lone".into()));
        assert!(value["lone"].is_null());
    }

    #[test]
    fn test_block_duplicate_key() {
        let err = parse_err("a: 1\na: 2\n");
        assert!(matches!(err, ParseError::DuplicateKey(..)));
        assert_eq!(err.to_string(), "duplicate key \"a\", near \": 2\\n\"");
    }

    #[test]
    fn test_block_scalars() {
        assert_eq!(parse("a: |-\n  line1\n  line2\n\n")["a"], Value::from("line1\nline2"));
        assert_eq!(
            parse("a: |+\n  line1\n  line2\n\n")["a"],
            Value::from("line1\nline2\n\n")
        );
        assert_eq!(
            parse("a: >\n  one\n  two\n\n  three\n")["a"],
            Value::from("one two\nthree\n")
        );
    }

    #[test]
    fn test_anchor_alias() {
        assert_eq!(parse("- &x 1\n- *x\n"), seq(vec![1.into(), 1.into()]));
        let value = parse("base: &b {k: v}\ncopy: *b\n");
        assert_eq!(value["copy"]["k"], Value::from("v"));
    }

    #[test]
    fn test_unknown_alias() {
        let err = parse_err("*missing");
        assert_eq!(err.to_string(), "unknown alias missing, near \"*missing\"");
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse_err("]");
        assert_eq!(err.to_string(), "unexpected close-bracket, near \"]\"");
    }

    #[test]
    fn test_deep_nesting_fails() {
        let err = parse_err(&"[".repeat(100_000));
        assert!(matches!(err, ParseError::TooDeep(_)));
        let text = "[".repeat(50_000) + &"]".repeat(50_000);
        assert!(matches!(parse_err(&text), ParseError::TooDeep(_)));
        let err = parse_err(&"- ".repeat(1_000));
        assert!(matches!(err, ParseError::TooDeep(_)));
    }

    #[test]
    fn test_nesting_within_limit() {
        let value = parse(&format!("{}1{}", "[".repeat(100), "]".repeat(100)));
        let mut inner = &value;
        for _ in 0..100 {
            inner = &inner[0];
        }
        assert_eq!(*inner, Value::Int(1));
    }

    #[test]
    fn test_alias_expansion_limit() {
        let mut text = String::from("a0: &a0 [x, x, x, x, x, x, x, x, x, x]\n");
        for n in 1..7 {
            let refs = vec![format!("*a{}", n - 1); 10].join(", ");
            text.push_str(&format!("a{n}: &a{n} [{refs}]\n"));
        }
        let err = parse_err(&text);
        assert!(matches!(err, ParseError::AliasExpansion(..)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Structural);
    }

    #[test]
    fn test_alias_cannot_nest_past_limit() {
        let nested = |inner: &str| format!("{}{}{}", "[".repeat(100), inner, "]".repeat(100));
        let text = format!("a: &a {}\nb: {}\n", nested("x"), nested("*a"));
        assert!(matches!(parse_err(&text), ParseError::TooDeep(_)));
    }

    #[test]
    fn test_large_mapping() {
        let text: String = (0..5_000).map(|i| format!("key{i}: {i}\n")).collect();
        let value = parse(&text);
        assert_eq!(value.len(), 5_000);
        assert_eq!(value["key4999"], Value::Int(4999));
        let err = parse_err(&format!("{text}key0: again\n"));
        assert_eq!(err.to_string(), "duplicate key \"key0\", near \": again\\n\"");
    }

    #[test]
    fn test_mapping_in_flow_sequence() {
        let value = parse("[a: 1, b]");
        assert_eq!(value[0]["a"], Value::Int(1));
        assert_eq!(value[1], Value::from("b"));
    }
}
