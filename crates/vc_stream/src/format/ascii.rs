//! Brace-delimited text format.
//!
//! Each field sits on its own line as `Name value`. Values that span
//! several lines open a brace block on the field's line, which is what lets
//! a reader skip fields it has no declaration for without knowing their kind.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write as _};
use core::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::warn;
use vc_wrap::{PropertyKind, Value, gl};

use super::{FieldHeader, FieldSink, FieldSource, ObjectToken, mismatch};
use crate::error::{Location, StreamError};
use crate::header::{ASCII_MAGIC, ContentKind, Header, check_format_major};

const INDENT: &str = "  ";

// -----------------------------------------------------------------------------
// AsciiSink

#[derive(Debug)]
pub struct AsciiSink {
    out: String,
    depth: usize,
    line_start: bool,
}

impl Default for AsciiSink {
    fn default() -> Self {
        Self {
            out: String::new(),
            depth: 0,
            line_start: true,
        }
    }
}

impl AsciiSink {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if self.line_start {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.line_start = false;
        }
        // Formatting into a `String` cannot fail.
        let _ = self.out.write_fmt(args);
    }

    fn end_line(&mut self) {
        self.out.push('\n');
        self.line_start = true;
    }

    fn scalar_text(kind: &PropertyKind, value: &Value, out: &mut String) -> Result<(), StreamError> {
        use PropertyKind as K;

        let _ = match (kind, value) {
            (K::Bool, Value::Bool(v)) => out.write_str(if *v { "TRUE" } else { "FALSE" }),
            (K::Int, Value::Int(v)) => write!(out, "{v}"),
            (K::Enum(table), Value::Int(v)) => match table.name_of(*v) {
                Some(name) => out.write_str(name),
                None => write!(out, "{v}"),
            },
            (K::UInt, Value::UInt(v)) => write!(out, "{v}"),
            (K::GlEnum, Value::UInt(v)) => match gl::name_of(*v) {
                Some(name) => out.write_str(name),
                None => write!(out, "{v:#x}"),
            },
            (K::HexInt, Value::UInt(v)) => write!(out, "{v:#x}"),
            (K::Float, Value::Float(v)) => write!(out, "{v}"),
            (K::Double, Value::Double(v)) => write!(out, "{v}"),
            (K::String, Value::String(v)) => {
                write_quoted(out, v);
                Ok(())
            }
            (K::Vec2f, Value::Vec2f(v)) => write_numbers(out, v),
            (K::Vec3f, Value::Vec3f(v)) => write_numbers(out, v),
            (K::Vec4f, Value::Vec4f(v)) => write_numbers(out, v),
            (K::Vec2d, Value::Vec2d(v)) => write_numbers(out, v),
            (K::Vec3d, Value::Vec3d(v)) => write_numbers(out, v),
            (K::Vec4d | K::Quat, Value::Vec4d(v)) => write_numbers(out, v),
            (K::Matrix, Value::Matrix(v)) => {
                out.push_str("{ ");
                let _ = write_numbers(out, v);
                out.write_str(" }")
            }
            (K::Blob, Value::Blob(v)) if v.is_empty() => out.write_str("0 { }"),
            (K::Blob, Value::Blob(v)) => write!(out, "{} {{ {} }}", v.len(), BASE64.encode(v)),
            _ => return Err(mismatch(kind, value)),
        };
        Ok(())
    }
}

fn write_numbers<T: fmt::Display>(out: &mut String, values: &[T]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write!(out, "{value}")?;
    }
    Ok(())
}

fn write_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl FieldSink for AsciiSink {
    fn write_header(&mut self, header: &Header) {
        self.emit(format_args!("{ASCII_MAGIC} {}", header.content));
        self.end_line();
        self.emit(format_args!("#Format {}", header.format_major));
        self.end_line();
        self.emit(format_args!("#Version {}", header.version));
        self.end_line();
        if !header.generator.is_empty() {
            self.emit(format_args!("#Generator {}", header.generator));
            self.end_line();
        }
        for (name, version) in &header.custom_domains {
            self.emit(format_args!("#CustomDomain {name} {version}"));
            self.end_line();
        }
    }

    fn write_null(&mut self) {
        self.emit(format_args!("NULL"));
        self.end_line();
    }

    fn write_reference(&mut self, id: u32, type_name: &str, class_version: u32) {
        self.emit(format_args!("{type_name} {class_version} {{ UniqueID {id} }}"));
        self.end_line();
    }

    fn begin_definition(&mut self, id: u32, type_name: &str, class_version: u32) {
        self.emit(format_args!("{type_name} {class_version} {{"));
        self.end_line();
        self.depth += 1;
        self.emit(format_args!("UniqueID {id}"));
        self.end_line();
    }

    fn end_definition(&mut self) {
        self.depth -= 1;
        self.emit(format_args!("}}"));
        self.end_line();
    }

    fn begin_field(&mut self, name: &str, _kind: &PropertyKind) {
        self.emit(format_args!("{name} "));
    }

    fn write_scalar(&mut self, kind: &PropertyKind, value: &Value) -> Result<(), StreamError> {
        let mut text = String::new();
        Self::scalar_text(kind, value, &mut text)?;
        self.emit(format_args!("{text}"));
        self.end_line();
        Ok(())
    }

    fn begin_list(&mut self, _element: &PropertyKind, len: usize) {
        self.emit(format_args!("{len} {{"));
        self.end_line();
        self.depth += 1;
    }

    fn end_list(&mut self) {
        self.depth -= 1;
        self.emit(format_args!("}}"));
        self.end_line();
    }

    #[inline]
    fn into_bytes(self) -> Vec<u8> {
        self.out.into_bytes()
    }
}

// -----------------------------------------------------------------------------
// Tokens

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Quoted(String),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    tok: Tok,
    line: usize,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(word) => f.write_str(word),
            Self::Quoted(text) => write!(f, "{text:?}"),
            Self::Open => f.write_str("{"),
            Self::Close => f.write_str("}"),
        }
    }
}

/// Splits `lines` into tokens, numbering lines from `first_line`.
fn tokenize<'a>(lines: impl Iterator<Item = &'a str>, first_line: usize) -> Result<Vec<Token>, StreamError> {
    let mut tokens = Vec::new();
    for (offset, text) in lines.enumerate() {
        let line = first_line + offset;
        let mut chars = text.char_indices().peekable();
        while let Some(&(start, c)) = chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    chars.next();
                }
                '{' | '}' => {
                    chars.next();
                    let tok = if c == '{' { Tok::Open } else { Tok::Close };
                    tokens.push(Token { tok, line });
                }
                '"' => {
                    chars.next();
                    let mut quoted = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '"')) => break,
                            Some((_, '\\')) => match chars.next() {
                                Some((_, '\\')) => quoted.push('\\'),
                                Some((_, '"')) => quoted.push('"'),
                                Some((_, 'n')) => quoted.push('\n'),
                                Some((_, 'r')) => quoted.push('\r'),
                                Some((_, 't')) => quoted.push('\t'),
                                Some((_, other)) => {
                                    return Err(StreamError::parse(
                                        Location::Line(line),
                                        alloc::format!("unknown escape `\\{other}`"),
                                    ));
                                }
                                None => {
                                    return Err(StreamError::parse(Location::Line(line), "unterminated string"));
                                }
                            },
                            Some((_, c)) => quoted.push(c),
                            None => {
                                return Err(StreamError::parse(Location::Line(line), "unterminated string"));
                            }
                        }
                    }
                    tokens.push(Token {
                        tok: Tok::Quoted(quoted),
                        line,
                    });
                }
                _ => {
                    let mut end = text.len();
                    while let Some(&(i, c)) = chars.peek() {
                        if c.is_whitespace() || matches!(c, '{' | '}' | '"') {
                            end = i;
                            break;
                        }
                        chars.next();
                    }
                    tokens.push(Token {
                        tok: Tok::Word(String::from(&text[start..end])),
                        line,
                    });
                }
            }
        }
    }
    Ok(tokens)
}

fn parse_u32(word: &str) -> Option<u32> {
    match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => word.parse().ok(),
    }
}

// -----------------------------------------------------------------------------
// AsciiSource

/// Byte order mark some editors put in front of utf-8 text.
const BOM: char = '\u{feff}';

#[derive(Debug)]
pub struct AsciiSource<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    field_line: usize,
}

impl<'a> AsciiSource<'a> {
    #[inline]
    pub fn new(text: &'a str) -> Self {
        Self {
            text: text.strip_prefix(BOM).unwrap_or(text),
            tokens: Vec::new(),
            pos: 0,
            field_line: 0,
        }
    }

    /// Returns `true` if `text` starts like an ascii stream.
    #[inline]
    pub fn detect(text: &str) -> bool {
        text.trim_start_matches(BOM).trim_start().starts_with(ASCII_MAGIC)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    #[inline]
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, StreamError> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(StreamError::parse(
                Location::Line(self.last_line()),
                "unexpected end of input",
            )),
        }
    }

    fn expect(&mut self, expected: Tok) -> Result<(), StreamError> {
        let token = self.next()?;
        if token.tok != expected {
            return Err(StreamError::parse(
                Location::Line(token.line),
                alloc::format!("expected `{expected}`, found `{}`", token.tok),
            ));
        }
        Ok(())
    }

    /// Next token as a structural number, a bad one is a parse error.
    fn structural<T: FromStr>(&mut self, what: &str) -> Result<T, StreamError> {
        let token = self.next()?;
        let parsed = match &token.tok {
            Tok::Word(word) => word.parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            StreamError::parse(
                Location::Line(token.line),
                alloc::format!("expected {what}, found `{}`", token.tok),
            )
        })
    }

    /// Next token as the word of a value, a bad one is a field error.
    fn value_word(&mut self, what: &dyn fmt::Display) -> Result<(String, usize), StreamError> {
        let token = self.next()?;
        match token.tok {
            Tok::Word(word) => Ok((word, token.line)),
            other => Err(StreamError::malformed(alloc::format!(
                "line {}: expected {what}, found `{other}`",
                token.line
            ))),
        }
    }

    fn value<T: FromStr>(&mut self, kind: &PropertyKind) -> Result<T, StreamError> {
        let (word, line) = self.value_word(kind)?;
        word.parse()
            .map_err(|_| invalid_value(line, &word, kind))
    }

    fn values<T: FromStr + Copy + Default, const N: usize>(
        &mut self,
        kind: &PropertyKind,
    ) -> Result<[T; N], StreamError> {
        let mut out = [T::default(); N];
        for slot in &mut out {
            *slot = self.value(kind)?;
        }
        Ok(out)
    }

    fn value_brace(&mut self, expected: Tok, kind: &PropertyKind) -> Result<(), StreamError> {
        let token = self.next()?;
        if token.tok != expected {
            return Err(StreamError::malformed(alloc::format!(
                "line {}: expected `{expected}` in {kind}, found `{}`",
                token.line, token.tok
            )));
        }
        Ok(())
    }

    fn read_blob(&mut self, kind: &PropertyKind) -> Result<Vec<u8>, StreamError> {
        let len: usize = self.value(kind)?;
        self.value_brace(Tok::Open, kind)?;
        if matches!(self.peek(), Some(Token { tok: Tok::Close, .. })) {
            self.pos += 1;
            return match len {
                0 => Ok(Vec::new()),
                _ => Err(StreamError::malformed(alloc::format!("blob of {len} bytes has no data"))),
            };
        }
        let (encoded, line) = self.value_word(kind)?;
        self.value_brace(Tok::Close, kind)?;
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|err| StreamError::malformed(alloc::format!("line {line}: invalid base64 data: {err}")))?;
        if bytes.len() != len {
            return Err(StreamError::malformed(alloc::format!(
                "line {line}: blob declares {len} bytes but holds {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    fn parse_header(&mut self) -> Result<Header, StreamError> {
        let mut lines = self.text.lines().enumerate().map(|(i, text)| (i + 1, text.trim()));

        let (first_line, magic) = lines
            .by_ref()
            .find(|(_, text)| !text.is_empty())
            .ok_or_else(|| StreamError::parse(Location::Line(1), "empty input"))?;
        let content = match magic.strip_prefix(ASCII_MAGIC) {
            Some(rest) => rest
                .trim()
                .parse::<ContentKind>()
                .map_err(|err| StreamError::parse(Location::Line(first_line), alloc::format!("{err}")))?,
            None => return Err(StreamError::parse(Location::Line(first_line), "not an ascii archive")),
        };

        let mut format_major = None;
        let mut version = None;
        let mut custom_domains = BTreeMap::new();
        let mut generator = String::new();
        let mut body_line = first_line + 1;

        for (line, text) in lines {
            if text.is_empty() {
                body_line = line + 1;
                continue;
            }
            let Some(directive) = text.strip_prefix('#') else {
                break;
            };
            body_line = line + 1;

            let (key, rest) = directive.split_once(char::is_whitespace).unwrap_or((directive, ""));
            let rest = rest.trim();
            let bad = || StreamError::parse(Location::Line(line), alloc::format!("invalid `#{key}` line"));
            match key {
                "Format" => {
                    let found = rest.parse().map_err(|_| bad())?;
                    check_format_major(found)?;
                    format_major = Some(found);
                }
                "Version" => version = Some(rest.parse().map_err(|_| bad())?),
                "Generator" => generator = String::from(rest),
                "CustomDomain" => {
                    let (name, domain_version) = rest.split_once(char::is_whitespace).ok_or_else(bad)?;
                    let domain_version = domain_version.trim().parse().map_err(|_| bad())?;
                    custom_domains.insert(String::from(name), domain_version);
                }
                _ => warn!("ignoring unknown header line `#{key}` at line {line}"),
            }
        }

        let format_major = format_major
            .ok_or_else(|| StreamError::parse(Location::Line(first_line), "missing `#Format` line"))?;
        let version = version
            .ok_or_else(|| StreamError::parse(Location::Line(first_line), "missing `#Version` line"))?;

        self.tokens = tokenize(self.text.lines().skip(body_line - 1), body_line)?;
        self.pos = 0;

        Ok(Header {
            format_major,
            content,
            version,
            custom_domains,
            generator,
        })
    }
}

fn invalid_value(line: usize, word: &str, kind: &PropertyKind) -> StreamError {
    StreamError::malformed(alloc::format!("line {line}: `{word}` is not a valid {kind} value"))
}

impl FieldSource for AsciiSource<'_> {
    fn read_header(&mut self) -> Result<Header, StreamError> {
        self.parse_header()
    }

    fn read_object_token(&mut self, is_known: &dyn Fn(u32) -> bool) -> Result<ObjectToken, StreamError> {
        let token = self.next()?;
        let type_name = match token.tok {
            Tok::Word(word) if word == "NULL" => return Ok(ObjectToken::Null),
            Tok::Word(word) => word,
            other => {
                return Err(StreamError::parse(
                    Location::Line(token.line),
                    alloc::format!("expected an object, found `{other}`"),
                ));
            }
        };
        let class_version = self.structural("a class version")?;
        self.expect(Tok::Open)?;
        let open_line = self.tokens[self.pos - 1].line;
        self.expect(Tok::Word(String::from("UniqueID")))?;
        let id_line = self.tokens[self.pos - 1].line;
        let id = self.structural("an object id")?;

        // A back-reference is written on a single line, a definition puts
        // its id on the line after the brace.
        if is_known(id) || id_line == open_line {
            self.expect(Tok::Close)?;
            return Ok(ObjectToken::Reference { id });
        }
        Ok(ObjectToken::Definition {
            id,
            type_name,
            class_version,
        })
    }

    fn next_field(&mut self) -> Result<Option<FieldHeader>, StreamError> {
        let token = self.next()?;
        match token.tok {
            Tok::Close => Ok(None),
            Tok::Word(name) => {
                self.field_line = token.line;
                Ok(Some(FieldHeader { name, kind: None }))
            }
            other => Err(StreamError::parse(
                Location::Line(token.line),
                alloc::format!("expected a field name, found `{other}`"),
            )),
        }
    }

    fn peek_definition(&self) -> Option<String> {
        let ahead = self.tokens.get(self.pos..self.pos + 4)?;
        match ahead {
            [
                Token { tok: Tok::Word(type_name), .. },
                Token { tok: Tok::Word(version), .. },
                Token { tok: Tok::Open, line: open_line },
                Token { tok: Tok::Word(unique_id), line: id_line },
            ] if type_name != "NULL"
                && version.parse::<u32>().is_ok()
                && unique_id == "UniqueID"
                && id_line != open_line =>
            {
                Some(type_name.clone())
            }
            _ => None,
        }
    }

    /// Consumes the rest of the field's line and any block it opens.
    fn skip_field(&mut self) -> Result<(), StreamError> {
        let line = self.field_line;
        let mut depth = 0_usize;
        while let Some(token) = self.peek() {
            if depth == 0 && token.line != line {
                return Ok(());
            }
            match token.tok {
                Tok::Open => depth += 1,
                Tok::Close if depth == 0 => return Ok(()),
                Tok::Close => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        match depth {
            0 => Ok(()),
            _ => Err(StreamError::parse(
                Location::Line(self.last_line()),
                "unterminated block in skipped field",
            )),
        }
    }

    fn read_scalar(&mut self, kind: &PropertyKind) -> Result<Value, StreamError> {
        use PropertyKind as K;

        Ok(match kind {
            K::Bool => {
                let (word, line) = self.value_word(kind)?;
                match word.as_str() {
                    "TRUE" | "true" => Value::Bool(true),
                    "FALSE" | "false" => Value::Bool(false),
                    _ => return Err(invalid_value(line, &word, kind)),
                }
            }
            K::Int => Value::Int(self.value(kind)?),
            K::UInt => Value::UInt(self.value(kind)?),
            K::Enum(table) => {
                let (word, line) = self.value_word(kind)?;
                match word.parse().ok().or_else(|| table.value_of(&word)) {
                    Some(value) => Value::Int(value),
                    None => return Err(invalid_value(line, &word, kind)),
                }
            }
            K::GlEnum => {
                let (word, line) = self.value_word(kind)?;
                match parse_u32(&word).or_else(|| gl::value_of(&word)) {
                    Some(value) => Value::UInt(value),
                    None => return Err(invalid_value(line, &word, kind)),
                }
            }
            K::HexInt => {
                let (word, line) = self.value_word(kind)?;
                Value::UInt(parse_u32(&word).ok_or_else(|| invalid_value(line, &word, kind))?)
            }
            K::Float => Value::Float(self.value(kind)?),
            K::Double => Value::Double(self.value(kind)?),
            K::String => {
                let token = self.next()?;
                match token.tok {
                    Tok::Quoted(text) => Value::String(text),
                    other => {
                        return Err(StreamError::malformed(alloc::format!(
                            "line {}: expected a quoted string, found `{other}`",
                            token.line
                        )));
                    }
                }
            }
            K::Vec2f => Value::Vec2f(self.values(kind)?),
            K::Vec3f => Value::Vec3f(self.values(kind)?),
            K::Vec4f => Value::Vec4f(self.values(kind)?),
            K::Vec2d => Value::Vec2d(self.values(kind)?),
            K::Vec3d => Value::Vec3d(self.values(kind)?),
            K::Vec4d | K::Quat => Value::Vec4d(self.values(kind)?),
            K::Matrix => {
                self.value_brace(Tok::Open, kind)?;
                let matrix = self.values(kind)?;
                self.value_brace(Tok::Close, kind)?;
                Value::Matrix(matrix)
            }
            K::Blob => Value::Blob(self.read_blob(kind)?),
            K::Object | K::List(_) => {
                return Err(StreamError::malformed(alloc::format!("{kind} is not a scalar kind")));
            }
        })
    }

    fn begin_list(&mut self) -> Result<usize, StreamError> {
        let len = self.structural("a list length")?;
        self.expect(Tok::Open)?;
        Ok(len)
    }

    fn end_list(&mut self) -> Result<(), StreamError> {
        self.expect(Tok::Close)
    }

    fn location(&self) -> Location {
        Location::Line(self.peek().map_or_else(|| self.last_line(), |t| t.line))
    }
}
