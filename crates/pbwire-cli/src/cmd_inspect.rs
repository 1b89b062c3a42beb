/// Implementation of `pbwire inspect`.
///
/// Walks every field of a payload and prints the resulting tree. A
/// length-delimited payload that itself parses cleanly as a sequence of
/// fields is shown as a nested message; otherwise it is shown as text if
/// it is valid UTF-8, or as hex.
///
/// # Output format
///
/// ```text
/// 1: varint 150
/// 2: string "testing" (7 bytes)
/// 3: message (7 bytes) {
///   1: varint 1
///   2: fixed32 0x00000007
/// }
/// 4: bytes ff00ff (3 bytes)
/// ```
use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result};
use pbwire_codec::{WireType, make_tag, tag_field_number, tag_wire_type};
use pbwire_decoder::{ByteSource, DecodeError, Decoder, DecoderConfig};
use serde::Serialize;

use crate::InspectArgs;
use crate::input::{DecoderTask, with_decoder};

/// Payloads longer than this are cut short in text and hex previews.
const PREVIEW_LEN: usize = 32;

#[derive(Debug, Serialize)]
pub struct Field {
    pub number: u32,
    #[serde(flatten)]
    pub value: FieldValue,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    Varint { value: u64 },
    Fixed32 { value: u32 },
    Fixed64 { value: u64 },
    String { len: usize, value: String },
    Bytes { len: usize, hex: String },
    Message { len: usize, fields: Vec<Field> },
    Group { fields: Vec<Field> },
}

/// Run the `pbwire inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not well-formed.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes = fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let walk = Walk {
        max_depth: args.max_depth,
        hex: args.hex,
        config: args.decoder.config(),
    };
    let fields = with_decoder(&bytes, &args.decoder, walk)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else {
        print!("{}", render_text(&fields));
    }
    Ok(())
}

struct Walk {
    max_depth: u32,
    hex: bool,
    config: DecoderConfig,
}

impl DecoderTask for Walk {
    type Output = Vec<Field>;

    fn run<'a, S: ByteSource<'a>>(self, mut decoder: Decoder<'a, S>) -> Result<Vec<Field>, DecodeError> {
        let fields = self.read_fields(&mut decoder, 0)?;
        if decoder.last_tag() != 0 {
            // Stopped on an end-group tag that no group opened.
            return Err(DecodeError::InvalidEndTag {
                expected: 0,
                found: decoder.last_tag(),
            });
        }
        Ok(fields)
    }
}

impl Walk {
    /// Read fields until the end of input or an end-group tag.
    fn read_fields<'a, S: ByteSource<'a>>(
        &self,
        decoder: &mut Decoder<'a, S>,
        depth: u32,
    ) -> Result<Vec<Field>, DecodeError> {
        let mut fields = Vec::new();
        loop {
            let tag = decoder.read_tag()?;
            if tag == 0 {
                return Ok(fields);
            }
            let number = tag_field_number(tag);
            let value = match tag_wire_type(tag)? {
                WireType::Varint => FieldValue::Varint {
                    value: decoder.read_raw_varint64()?,
                },
                WireType::Fixed64 => FieldValue::Fixed64 {
                    value: decoder.read_raw_little_endian64()?,
                },
                WireType::Fixed32 => FieldValue::Fixed32 {
                    value: decoder.read_raw_little_endian32()?,
                },
                WireType::LengthDelimited => {
                    let payload = decoder.read_bytes()?;
                    self.classify(&payload, depth)
                }
                WireType::StartGroup => {
                    decoder.enter_recursion()?;
                    let fields = self.read_fields(decoder, depth + 1)?;
                    decoder.exit_recursion();
                    decoder.check_last_tag_was(make_tag(number, WireType::EndGroup))?;
                    FieldValue::Group { fields }
                }
                WireType::EndGroup => return Ok(fields),
            };
            fields.push(Field { number, value });
        }
    }

    /// Decide how to show a length-delimited payload.
    fn classify(&self, payload: &[u8], depth: u32) -> FieldValue {
        let len = payload.len();
        if depth < self.max_depth
            && !payload.is_empty()
            && let Some(fields) = self.try_nested(payload, depth + 1)
        {
            return FieldValue::Message { len, fields };
        }
        if !self.hex
            && let Ok(text) = std::str::from_utf8(payload)
        {
            return FieldValue::String {
                len,
                value: text.to_owned(),
            };
        }
        FieldValue::Bytes {
            len,
            hex: hex::encode(payload),
        }
    }

    /// Parse `payload` as a message on its own decoder. Anything that does
    /// not consume the payload exactly is not treated as a message.
    fn try_nested(&self, payload: &[u8], depth: u32) -> Option<Vec<Field>> {
        let mut nested = Decoder::from_slice(payload).with_config(self.config);
        let fields = self.read_fields(&mut nested, depth).ok()?;
        if nested.last_tag() != 0 || fields.is_empty() {
            return None;
        }
        Some(fields)
    }
}

/// Render a field tree as indented text.
pub fn render_text(fields: &[Field]) -> String {
    let mut out = String::new();
    render_into(&mut out, fields, 0);
    out
}

fn render_into(out: &mut String, fields: &[Field], indent: usize) {
    let pad = "  ".repeat(indent);
    for field in fields {
        let number = field.number;
        let _ = match &field.value {
            FieldValue::Varint { value } => writeln!(out, "{pad}{number}: varint {value}"),
            FieldValue::Fixed32 { value } => writeln!(out, "{pad}{number}: fixed32 {value:#010x}"),
            FieldValue::Fixed64 { value } => writeln!(out, "{pad}{number}: fixed64 {value:#018x}"),
            FieldValue::String { len, value } => {
                let preview: String = value.chars().take(PREVIEW_LEN).collect();
                let ellipsis = if value.chars().count() > PREVIEW_LEN { "…" } else { "" };
                writeln!(out, "{pad}{number}: string {preview:?}{ellipsis} ({len} bytes)")
            }
            FieldValue::Bytes { len, hex } => {
                let shown = hex.get(..PREVIEW_LEN * 2).unwrap_or(hex);
                let ellipsis = if hex.len() > PREVIEW_LEN * 2 { "…" } else { "" };
                writeln!(out, "{pad}{number}: bytes {shown}{ellipsis} ({len} bytes)")
            }
            FieldValue::Message { len, fields } => {
                let _ = writeln!(out, "{pad}{number}: message ({len} bytes) {{");
                render_into(out, fields, indent + 1);
                writeln!(out, "{pad}}}")
            }
            FieldValue::Group { fields } => {
                let _ = writeln!(out, "{pad}{number}: group {{");
                render_into(out, fields, indent + 1);
                writeln!(out, "{pad}}}")
            }
        };
    }
}
