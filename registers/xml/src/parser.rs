// Licensed under the Apache-2.0 license.

//! winnow grammar for the subset of XML found in device descriptions.

use anyhow::anyhow;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, cut_err, delimited, preceded, repeat};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_until, take_while};

use crate::element::Element;

/// Parses a complete document and returns its root element.
pub fn parse(text: &str) -> anyhow::Result<Element> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    document.parse(text).map_err(|e| {
        let (line, column) = line_column(text, e.offset());
        anyhow!("syntax error at {line}:{column}: {}", e.inner())
    })
}

fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map_or(0, |l| l.chars().count())
        + 1;
    (line, column)
}

fn document(input: &mut &str) -> ModalResult<Element> {
    let () = repeat(0.., alt((misc, doctype, multispace1.void()))).parse_next(input)?;
    let root = element
        .context(StrContext::Expected(StrContextValue::Description(
            "root element",
        )))
        .parse_next(input)?;
    let () = repeat(0.., alt((misc, multispace1.void()))).parse_next(input)?;
    Ok(root)
}

fn misc(input: &mut &str) -> ModalResult<()> {
    alt((comment, processing_instruction)).parse_next(input)
}

fn comment(input: &mut &str) -> ModalResult<()> {
    ("<!--", cut_err((take_until(0.., "-->"), "-->")))
        .void()
        .context(StrContext::Label("comment"))
        .parse_next(input)
}

fn processing_instruction(input: &mut &str) -> ModalResult<()> {
    ("<?", cut_err((take_until(0.., "?>"), "?>")))
        .void()
        .context(StrContext::Label("processing instruction"))
        .parse_next(input)
}

fn doctype(input: &mut &str) -> ModalResult<()> {
    ("<!DOCTYPE", cut_err((take_until(0.., '>'), '>')))
        .void()
        .parse_next(input)
}

fn cdata(input: &mut &str) -> ModalResult<()> {
    ("<![CDATA[", cut_err((take_until(0.., "]]>"), "]]>")))
        .void()
        .context(StrContext::Label("CDATA section"))
        .parse_next(input)
}

fn name(input: &mut &str) -> ModalResult<String> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_' || c == ':'),
        take_while(0.., |c: char| {
            c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
        }),
    )
        .take()
        .map(str::to_string)
        .parse_next(input)
}

fn attribute(input: &mut &str) -> ModalResult<(String, String)> {
    let key = name.parse_next(input)?;
    (multispace0, '=', multispace0).parse_next(input)?;
    let raw = alt((
        delimited('"', take_until(0.., '"'), '"'),
        delimited('\'', take_until(0.., '\''), '\''),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "quoted attribute value",
    )))
    .parse_next(input)?;
    Ok((key, decode_entities(raw)))
}

fn element(input: &mut &str) -> ModalResult<Element> {
    let tag = preceded('<', name).parse_next(input)?;
    let attributes: Vec<(String, String)> =
        repeat(0.., preceded(multispace1, attribute)).parse_next(input)?;
    multispace0.parse_next(input)?;
    let self_closing = cut_err(alt(("/>".value(true), '>'.value(false))))
        .context(StrContext::Expected(StrContextValue::Description(
            "`>` or `/>`",
        )))
        .parse_next(input)?;

    let mut elem = Element {
        tag,
        attributes,
        children: Vec::new(),
    };
    if self_closing {
        return Ok(elem);
    }

    let nodes: Vec<Option<Element>> = repeat(0.., content).parse_next(input)?;
    elem.children = nodes.into_iter().flatten().collect();

    cut_err(("</", literal(elem.tag.as_str()), multispace0, '>'))
        .context(StrContext::Expected(StrContextValue::Description(
            "matching end tag",
        )))
        .parse_next(input)?;
    Ok(elem)
}

/// One item between a start and end tag. Only child elements are kept.
fn content(input: &mut &str) -> ModalResult<Option<Element>> {
    alt((
        misc.value(None),
        cdata.value(None),
        element.map(Some),
        take_while(1.., |c: char| c != '<').value(None),
    ))
    .parse_next(input)
}

/// Replaces predefined entities and character references. Unknown entities
/// are kept verbatim.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
