//! Rendering and parsing of single fields.
//!
//! Both directions are pure functions of a [`Field`] and a record buffer.
//! Arrays are rendered as their elements joined by [`ARRAY_DELIMITER`] and
//! parsed from the same form.
//!
//! Strings keep their whitespace. Bytes that are not UTF-8 render as `\xHH`
//! and a backslash renders as `\\`; parsing reverses both escapes.

use super::{ElementType, Error, Field, IntWidth, Result};

/// Separates array elements in text form.
pub const ARRAY_DELIMITER: char = ',';

fn slice<'a>(field: &Field, buffer: &'a [u8]) -> Result<&'a [u8]> {
    let end = field.end().unwrap_or(usize::MAX);
    if end > buffer.len() {
        return Err(Error::OutOfRange {
            field: field.name(),
            end,
            len: buffer.len(),
        });
    }
    Ok(&buffer[field.offset()..end])
}

fn check_supported(field: &Field) -> Result<()> {
    let element_type = field.element_type();
    if element_type.defect().is_some() || (element_type.is_string() && field.is_array()) {
        return Err(Error::UnsupportedType {
            field: field.name(),
        });
    }
    Ok(())
}

fn read_unsigned(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

fn read_signed(bytes: &[u8]) -> i64 {
    let shift = 64 - 8 * bytes.len() as u32;
    ((read_unsigned(bytes) << shift) as i64) >> shift
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(bytes);
    array
}

fn render_element(element_type: ElementType, bytes: &[u8]) -> String {
    if let Some((signed, _)) = element_type.integer() {
        return match signed {
            true => read_signed(bytes).to_string(),
            false => read_unsigned(bytes).to_string(),
        };
    }
    match element_type {
        ElementType::F32 => f32::from_le_bytes(le_array(bytes)).to_string(),
        ElementType::F64 => f64::from_le_bytes(le_array(bytes)).to_string(),
        ElementType::Enum(def) => {
            let value = read_unsigned(bytes);
            def.name_of(value)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string())
        }
        ElementType::Bitfield(width) => {
            format!("0x{:0digits$X}", read_unsigned(bytes), digits = 2 * width.size())
        }
        ElementType::String(_) => {
            let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            escape(&bytes[..len])
        }
        _ => unreachable!("integers are handled above"),
    }
}

fn escape(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c == '\\' {
                text.push_str("\\\\");
            } else {
                text.push(c);
            }
        }
        for byte in chunk.invalid() {
            text.push_str(&format!("\\x{:02X}", byte));
        }
    }
    text
}

/// Renders a field of `buffer` as text.
pub fn render(field: &Field, buffer: &[u8]) -> Result<String> {
    check_supported(field)?;
    let bytes = slice(field, buffer)?;
    let element_type = field.element_type();
    let rendered = bytes
        .chunks_exact(element_type.size())
        .map(|chunk| render_element(element_type, chunk))
        .collect::<Vec<_>>();
    Ok(rendered.join(ARRAY_DELIMITER.to_string().as_str()))
}

/// Reads a scalar numeric field as `f64`.
///
/// Returns `None` for strings, arrays and fields outside the buffer.
pub fn number(field: &Field, buffer: &[u8]) -> Option<f64> {
    if field.is_array() {
        return None;
    }
    let bytes = slice(field, buffer).ok()?;
    let element_type = field.element_type();
    match element_type {
        ElementType::F32 => Some(f32::from_le_bytes(le_array(bytes)).into()),
        ElementType::F64 => Some(f64::from_le_bytes(le_array(bytes))),
        ElementType::String(_) => None,
        _ => match element_type.integer() {
            Some((true, _)) => Some(read_signed(bytes) as f64),
            _ => Some(read_unsigned(bytes) as f64),
        },
    }
}

struct Parser<'a> {
    field: &'a Field,
    text: &'a str,
}

impl Parser<'_> {
    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedValue {
            field: self.field.name(),
            value: self.text.to_string(),
            reason: reason.into(),
        }
    }

    fn integer(&self, item: &str, signed: bool, width: IntWidth, out: &mut Vec<u8>) -> Result<()> {
        let bits = width.bits();
        let raw = if signed {
            let value = item
                .parse::<i64>()
                .map_err(|_| self.malformed(format!("not an i{} numeral", bits)))?;
            let half = 1i128 << (bits - 1);
            if i128::from(value) < -half || i128::from(value) >= half {
                return Err(self.malformed(format!("out of range for i{}", bits)));
            }
            value as u64
        } else {
            let value = item
                .parse::<u64>()
                .map_err(|_| self.malformed(format!("not a u{} numeral", bits)))?;
            self.fits(value, width)?
        };
        out.extend_from_slice(&raw.to_le_bytes()[..width.size()]);
        Ok(())
    }

    fn fits(&self, value: u64, width: IntWidth) -> Result<u64> {
        if value > width.max_value() {
            return Err(self.malformed(format!("out of range for {} bits", width.bits())));
        }
        Ok(value)
    }

    fn float<T>(&self, item: &str) -> Result<T>
    where
        T: std::str::FromStr + Into<f64> + Copy,
    {
        let value = item
            .parse::<T>()
            .map_err(|_| self.malformed("not a floating point numeral"))?;
        let unsigned = item.trim_start_matches(['+', '-']).to_ascii_lowercase();
        let literal = unsigned == "inf" || unsigned == "infinity";
        let wide: f64 = value.into();
        if wide.is_infinite() && !literal {
            return Err(self.malformed("out of range"));
        }
        Ok(value)
    }

    fn unescape(&self, item: &str) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(item.len());
        let mut rest = item;
        while let Some(at) = rest.find('\\') {
            bytes.extend_from_slice(rest[..at].as_bytes());
            let escaped = &rest[at + 1..];
            if let Some(after) = escaped.strip_prefix('\\') {
                bytes.push(b'\\');
                rest = after;
                continue;
            }
            let hex = escaped
                .strip_prefix('x')
                .and_then(|hex| hex.get(..2))
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| self.malformed("expected `\\\\` or `\\xHH` after a backslash"))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| self.malformed("not a hexadecimal escape"))?;
            bytes.push(byte);
            rest = &escaped[3..];
        }
        bytes.extend_from_slice(rest.as_bytes());
        Ok(bytes)
    }

    fn element(&self, item: &str, out: &mut Vec<u8>) -> Result<()> {
        let element_type = self.field.element_type();
        if let Some((signed, width)) = element_type.integer() {
            return self.integer(item, signed, width, out);
        }
        match element_type {
            ElementType::F32 => out.extend_from_slice(&self.float::<f32>(item)?.to_le_bytes()),
            ElementType::F64 => out.extend_from_slice(&self.float::<f64>(item)?.to_le_bytes()),
            ElementType::Enum(def) => {
                let value = match def.value_of(item) {
                    Some(value) => value,
                    None => {
                        let value = item.parse::<u64>().map_err(|_| {
                            self.malformed(format!("not a variant of {}", def.name))
                        })?;
                        self.fits(value, def.width)?
                    }
                };
                out.extend_from_slice(&value.to_le_bytes()[..def.width.size()]);
            }
            ElementType::Bitfield(width) => {
                let value = match item.strip_prefix("0x").or_else(|| item.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => item.parse::<u64>(),
                }
                .map_err(|_| self.malformed("not a hexadecimal or decimal numeral"))?;
                let value = self.fits(value, width)?;
                out.extend_from_slice(&value.to_le_bytes()[..width.size()]);
            }
            ElementType::String(width) => {
                let bytes = self.unescape(item)?;
                if bytes.len() > width {
                    return Err(Error::ValueTooLong {
                        field: self.field.name(),
                        len: bytes.len(),
                        max: width,
                    });
                }
                if bytes.contains(&0) {
                    return Err(self.malformed("contains a NUL byte"));
                }
                out.extend_from_slice(&bytes);
                out.resize(out.len() + width - bytes.len(), 0);
            }
            _ => unreachable!("integers are handled above"),
        }
        Ok(())
    }
}

/// Parses `text` into the field's bytes of `buffer`.
///
/// The field is written as a whole or not at all: on error `buffer` is left
/// untouched. Bytes outside the field are never touched.
pub fn parse(field: &Field, text: &str, buffer: &mut [u8]) -> Result<()> {
    check_supported(field)?;
    slice(field, buffer)?;

    let parser = Parser { field, text };
    let mut encoded = Vec::with_capacity(field.size());
    let element_type = field.element_type();
    if element_type.is_string() {
        // Strings are never split on the array delimiter nor trimmed.
        parser.element(text, &mut encoded)?;
    } else {
        let items = text.split(ARRAY_DELIMITER).map(str::trim).collect::<Vec<_>>();
        if items.len() != field.count() {
            return Err(parser.malformed(format!(
                "expected {} element(s), found {}",
                field.count(),
                items.len()
            )));
        }
        for item in items {
            parser.element(item, &mut encoded)?;
        }
    }

    buffer[field.range()].copy_from_slice(&encoded);
    Ok(())
}
