//! Byte-level encoding and decoding of binary elements.
//!
//! Every element is a single-byte tagged union, optionally OR-ed with flag
//! bits for a reference id and a (short or fully qualified) type name that
//! trail the payload. Simple values are stored in the smallest tag that
//! round-trips exactly; strings spelling a canonical date-time or boolean
//! are stored in those representations.

use classify_core::{Error, Result, Scalar, exact};
use rust_decimal::Decimal;

use crate::element::{BinElement, BinKey, BinKind};

pub(crate) const END: u8 = 0x00;
pub(crate) const BYTE: u8 = 0x01;
pub(crate) const SBYTE: u8 = 0x02;
pub(crate) const SHORT: u8 = 0x03;
pub(crate) const USHORT: u8 = 0x04;
pub(crate) const INT: u8 = 0x05;
pub(crate) const UINT: u8 = 0x06;
pub(crate) const LONG: u8 = 0x07;
pub(crate) const ULONG: u8 = 0x08;
pub(crate) const FLOAT: u8 = 0x09;
pub(crate) const DOUBLE: u8 = 0x0a;
pub(crate) const DATETIME: u8 = 0x0c;
pub(crate) const DECIMAL: u8 = 0x0d;
pub(crate) const STRING_UTF8: u8 = 0x0e;
pub(crate) const STRING_UTF16: u8 = 0x0f;
pub(crate) const DICT_INT: u8 = 0x10;
pub(crate) const DICT_LONG: u8 = 0x11;
pub(crate) const DICT_ULONG: u8 = 0x12;
pub(crate) const DICT_DOUBLE: u8 = 0x13;
pub(crate) const DICT_DATETIME: u8 = 0x14;
pub(crate) const DICT_STRING: u8 = 0x15;
pub(crate) const DICT_TWO_STRINGS: u8 = 0x16;
pub(crate) const NULL: u8 = 0x19;
pub(crate) const FALSE: u8 = 0x1a;
pub(crate) const TRUE: u8 = 0x1b;
pub(crate) const FOLLOW_ID: u8 = 0x1c;
pub(crate) const LIST: u8 = 0x1d;
pub(crate) const KVP: u8 = 0x1e;
pub(crate) const REF: u8 = 0x1f;

pub(crate) const TAG_MASK: u8 = 0x1f;
pub(crate) const FLAG_REFID: u8 = 0x20;
pub(crate) const FLAG_TYPE: u8 = 0x40;
pub(crate) const FLAG_FULLTYPE: u8 = 0x80;

/// Kind bits of the 8-byte date-time representation (UTC).
const DATETIME_KIND_UTC: i64 = 0x4000_0000_0000_0000;
const DATETIME_TICK_MASK: i64 = 0x3fff_ffff_ffff_ffff;

const MAX_DEPTH: usize = 128;

/// Encode one element tree.
pub fn encode(element: &BinElement) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_element(&mut out, element)?;
    Ok(out)
}

/// Decode one element tree; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<BinElement> {
    let mut reader = Reader { buf: bytes, pos: 0 };
    let element = decode_element(&mut reader, 0)?;
    if reader.pos != bytes.len() {
        return Err(Error::format("trailing bytes after element"));
    }
    Ok(element)
}

fn encode_element(out: &mut Vec<u8>, element: &BinElement) -> Result<()> {
    let mut flags = 0u8;
    if element.refid.is_some() {
        flags |= FLAG_REFID;
    }
    match &element.type_tag {
        Some((_, false)) => flags |= FLAG_TYPE,
        Some((_, true)) => flags |= FLAG_FULLTYPE,
        None => {}
    }

    let (tag, payload) = encode_payload(&element.kind)?;
    out.push(tag | flags);
    out.extend_from_slice(&payload);

    if let Some((name, _)) = &element.type_tag {
        write_utf8_escaped(out, name);
    }
    if let Some(id) = element.refid {
        write_varint(out, id);
    }
    Ok(())
}

fn encode_payload(kind: &BinKind) -> Result<(u8, Vec<u8>)> {
    let mut payload = Vec::new();
    let tag = match kind {
        BinKind::Null => NULL,
        BinKind::Simple(scalar) => scalar_payload(scalar, &mut payload)?,
        BinKind::List(children) => {
            for child in children {
                encode_element(&mut payload, child)?;
            }
            payload.push(END);
            LIST
        }
        BinKind::Pair(key, value) => {
            encode_element(&mut payload, key)?;
            encode_element(&mut payload, value)?;
            KVP
        }
        BinKind::Dict(entries) => {
            let tag = dict_variant(entries)?;
            for (key, value) in entries {
                encode_element(&mut payload, value)?;
                encode_dict_key(&mut payload, tag, key)?;
            }
            payload.push(END);
            tag
        }
        BinKind::Ref(id) => {
            write_varint(&mut payload, *id);
            REF
        }
        BinKind::FollowId(id) => {
            write_utf8_escaped(&mut payload, id);
            FOLLOW_ID
        }
    };
    Ok((tag, payload))
}

fn scalar_payload(scalar: &Scalar, payload: &mut Vec<u8>) -> Result<u8> {
    Ok(match scalar {
        Scalar::Bool(false) => FALSE,
        Scalar::Bool(true) => TRUE,
        Scalar::Char(c) => {
            // Chars ride the 16-bit unsigned form; there is no wider tag a
            // decoder would turn back into a char.
            let code = u16::try_from(*c as u32).map_err(|_| {
                Error::conversion(format!("char {c:?} is outside the 16-bit range"))
            })?;
            payload.extend_from_slice(&code.to_le_bytes());
            USHORT
        }
        Scalar::I64(v) => int_payload(*v, payload),
        Scalar::U64(v) => {
            if let Ok(small) = i64::try_from(*v) {
                int_payload(small, payload)
            } else {
                payload.extend_from_slice(&v.to_le_bytes());
                ULONG
            }
        }
        Scalar::F64(v) => {
            let narrowed = *v as f32;
            if f64::from(narrowed) == *v {
                payload.extend_from_slice(&narrowed.to_le_bytes());
                FLOAT
            } else {
                payload.extend_from_slice(&v.to_le_bytes());
                DOUBLE
            }
        }
        Scalar::Decimal(d) => {
            write_decimal(payload, d);
            DECIMAL
        }
        Scalar::DateTime(dt) => {
            write_datetime(payload, dt)?;
            DATETIME
        }
        Scalar::Str(s) => string_payload(s, payload)?,
    })
}

fn int_payload(v: i64, payload: &mut Vec<u8>) -> u8 {
    if let Ok(b) = u8::try_from(v) {
        payload.push(b);
        BYTE
    } else if let Ok(b) = i8::try_from(v) {
        payload.push(b as u8);
        SBYTE
    } else if let Ok(s) = i16::try_from(v) {
        payload.extend_from_slice(&s.to_le_bytes());
        SHORT
    } else if let Ok(s) = u16::try_from(v) {
        payload.extend_from_slice(&s.to_le_bytes());
        USHORT
    } else if let Ok(i) = i32::try_from(v) {
        payload.extend_from_slice(&i.to_le_bytes());
        INT
    } else if let Ok(i) = u32::try_from(v) {
        payload.extend_from_slice(&i.to_le_bytes());
        UINT
    } else {
        payload.extend_from_slice(&v.to_le_bytes());
        LONG
    }
}

fn string_payload(s: &str, payload: &mut Vec<u8>) -> Result<u8> {
    if s == "True" {
        return Ok(TRUE);
    }
    if s == "False" {
        return Ok(FALSE);
    }
    if let Ok(dt) = exact::parse_datetime(s)
        && exact::datetime_to_string(&dt) == s
    {
        write_datetime(payload, &dt)?;
        return Ok(DATETIME);
    }
    let utf16_len = s.encode_utf16().count() * 2;
    if utf16_len < s.len() {
        write_utf16_escaped(payload, s);
        Ok(STRING_UTF16)
    } else {
        write_utf8_escaped(payload, s);
        Ok(STRING_UTF8)
    }
}

fn write_datetime(payload: &mut Vec<u8>, dt: &chrono::DateTime<chrono::Utc>) -> Result<()> {
    let ticks = exact::datetime_to_ticks(dt)?;
    payload.extend_from_slice(&(ticks | DATETIME_KIND_UTC).to_le_bytes());
    Ok(())
}

fn write_decimal(payload: &mut Vec<u8>, d: &Decimal) {
    let mut header = d.scale() as u8;
    if d.is_sign_negative() {
        header |= 0x80;
    }
    payload.push(header);
    write_varint_u128(payload, d.mantissa().unsigned_abs());
}

fn dict_variant(entries: &[(BinKey, BinElement)]) -> Result<u8> {
    let mut keys = entries.iter().map(|(k, _)| k);
    let Some(first) = keys.next() else {
        return Ok(DICT_STRING);
    };
    match first {
        BinKey::Field(..) => {
            // Object field maps: the two-string variant is only needed when
            // member names collide across declaring types.
            let mut names: Vec<&str> = entries
                .iter()
                .filter_map(|(k, _)| match k {
                    BinKey::Field(name, _) => Some(name.as_str()),
                    BinKey::Scalar(_) => None,
                })
                .collect();
            names.sort_unstable();
            let collides = names.windows(2).any(|w| w[0] == w[1]);
            Ok(if collides { DICT_TWO_STRINGS } else { DICT_STRING })
        }
        BinKey::Scalar(Scalar::Str(_)) => Ok(DICT_STRING),
        BinKey::Scalar(Scalar::DateTime(_)) => Ok(DICT_DATETIME),
        BinKey::Scalar(Scalar::F64(_)) => Ok(DICT_DOUBLE),
        BinKey::Scalar(Scalar::I64(_) | Scalar::U64(_)) => {
            let mut fits_i32 = true;
            let mut fits_i64 = true;
            for (key, _) in entries {
                match key {
                    BinKey::Scalar(Scalar::I64(v)) => {
                        fits_i32 &= i32::try_from(*v).is_ok();
                    }
                    BinKey::Scalar(Scalar::U64(v)) => {
                        fits_i32 &= i32::try_from(*v).is_ok();
                        fits_i64 &= i64::try_from(*v).is_ok();
                    }
                    _ => return Err(Error::format("mixed dictionary key kinds")),
                }
            }
            Ok(if fits_i32 {
                DICT_INT
            } else if fits_i64 {
                DICT_LONG
            } else {
                DICT_ULONG
            })
        }
        BinKey::Scalar(other) => Err(Error::format(format!(
            "unsupported dictionary key scalar `{}`",
            other.kind_name()
        ))),
    }
}

fn encode_dict_key(payload: &mut Vec<u8>, variant: u8, key: &BinKey) -> Result<()> {
    let scalar_int = |key: &BinKey| -> Result<i64> {
        match key {
            BinKey::Scalar(Scalar::I64(v)) => Ok(*v),
            BinKey::Scalar(Scalar::U64(v)) => {
                i64::try_from(*v).map_err(|_| Error::format("dictionary key out of range"))
            }
            _ => Err(Error::format("mixed dictionary key kinds")),
        }
    };
    match variant {
        DICT_INT => {
            let v = i32::try_from(scalar_int(key)?)
                .map_err(|_| Error::format("dictionary key out of range"))?;
            payload.extend_from_slice(&v.to_le_bytes());
        }
        DICT_LONG => payload.extend_from_slice(&scalar_int(key)?.to_le_bytes()),
        DICT_ULONG => match key {
            BinKey::Scalar(Scalar::U64(v)) => payload.extend_from_slice(&v.to_le_bytes()),
            BinKey::Scalar(Scalar::I64(v)) => {
                let v = u64::try_from(*v)
                    .map_err(|_| Error::format("dictionary key out of range"))?;
                payload.extend_from_slice(&v.to_le_bytes());
            }
            _ => return Err(Error::format("mixed dictionary key kinds")),
        },
        DICT_DOUBLE => match key {
            BinKey::Scalar(Scalar::F64(v)) => payload.extend_from_slice(&v.to_le_bytes()),
            _ => return Err(Error::format("mixed dictionary key kinds")),
        },
        DICT_DATETIME => match key {
            BinKey::Scalar(Scalar::DateTime(dt)) => write_datetime(payload, dt)?,
            _ => return Err(Error::format("mixed dictionary key kinds")),
        },
        DICT_STRING => match key {
            BinKey::Scalar(Scalar::Str(s)) => write_utf8_escaped(payload, s),
            BinKey::Field(name, _) => write_utf8_escaped(payload, name),
            _ => return Err(Error::format("mixed dictionary key kinds")),
        },
        DICT_TWO_STRINGS => match key {
            BinKey::Field(name, declaring) => {
                write_utf8_escaped(payload, name);
                write_utf8_escaped(payload, declaring);
            }
            BinKey::Scalar(Scalar::Str(s)) => {
                write_utf8_escaped(payload, s);
                write_utf8_escaped(payload, "");
            }
            _ => return Err(Error::format("mixed dictionary key kinds")),
        },
        _ => return Err(Error::format("unknown dictionary variant")),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// primitives

pub(crate) fn write_varint(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn write_varint_u128(out: &mut Vec<u8>, mut v: u128) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Escaped, terminated byte string: any literal `0xFF` becomes `0xFF 0x01`;
/// the terminator is `0xFF 0x00`.
pub(crate) fn write_utf8_escaped(out: &mut Vec<u8>, s: &str) {
    for b in s.bytes() {
        if b == 0xff {
            out.extend_from_slice(&[0xff, 0x01]);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(&[0xff, 0x00]);
}

fn write_utf16_escaped(out: &mut Vec<u8>, s: &str) {
    for unit in s.encode_utf16() {
        for b in unit.to_le_bytes() {
            if b == 0xff {
                out.extend_from_slice(&[0xff, 0x01]);
            } else {
                out.push(b);
            }
        }
    }
    out.extend_from_slice(&[0xff, 0x00]);
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn truncated() -> Error {
        Error::format("truncated binary stream")
    }

    fn u8(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or_else(Self::truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or_else(Self::truncated)?;
        self.pos += N;
        Ok(slice.try_into().expect("slice length checked"))
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            if shift >= 64 {
                return Err(Error::format("varint overflow"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn varint_u128(&mut self) -> Result<u128> {
        let mut value = 0u128;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            if shift >= 128 {
                return Err(Error::format("varint overflow"));
            }
            value |= u128::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn escaped_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.u8()? {
                0xff => match self.u8()? {
                    0x00 => return Ok(out),
                    0x01 => out.push(0xff),
                    _ => return Err(Error::format("invalid string escape")),
                },
                b => out.push(b),
            }
        }
    }

    fn utf8_string(&mut self) -> Result<String> {
        String::from_utf8(self.escaped_bytes()?)
            .map_err(|_| Error::format("invalid utf-8 string payload"))
    }

    fn utf16_string(&mut self) -> Result<String> {
        let bytes = self.escaped_bytes()?;
        if bytes.len() % 2 != 0 {
            return Err(Error::format("odd utf-16 payload length"));
        }
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).map_err(|_| Error::format("invalid utf-16 string payload"))
    }

    fn datetime(&mut self) -> Result<chrono::DateTime<chrono::Utc>> {
        let raw = i64::from_le_bytes(self.bytes::<8>()?);
        exact::ticks_to_datetime(raw & DATETIME_TICK_MASK)
    }

    fn decimal(&mut self) -> Result<Decimal> {
        let header = self.u8()?;
        let scale = u32::from(header & 0x7f);
        if scale > 28 {
            return Err(Error::format("decimal scale out of range"));
        }
        let magnitude = self.varint_u128()?;
        let mantissa = i128::try_from(magnitude)
            .map_err(|_| Error::format("decimal mantissa out of range"))?;
        let mantissa = if header & 0x80 != 0 { -mantissa } else { mantissa };
        Decimal::try_from_i128_with_scale(mantissa, scale)
            .map_err(|_| Error::format("decimal mantissa out of range"))
    }
}

fn decode_element(reader: &mut Reader<'_>, depth: usize) -> Result<BinElement> {
    let byte = reader.u8()?;
    decode_element_with(reader, byte, depth)
}

fn decode_element_with(reader: &mut Reader<'_>, byte: u8, depth: usize) -> Result<BinElement> {
    if depth > MAX_DEPTH {
        return Err(Error::format("maximum nesting depth exceeded"));
    }
    let tag = byte & TAG_MASK;
    let flags = byte & !TAG_MASK;
    if flags & FLAG_TYPE != 0 && flags & FLAG_FULLTYPE != 0 {
        return Err(Error::format("invalid flag combination"));
    }

    let kind = match tag {
        NULL => BinKind::Null,
        FALSE => BinKind::Simple(Scalar::Bool(false)),
        TRUE => BinKind::Simple(Scalar::Bool(true)),
        BYTE => BinKind::Simple(Scalar::I64(i64::from(reader.u8()?))),
        SBYTE => BinKind::Simple(Scalar::I64(i64::from(reader.u8()? as i8))),
        SHORT => BinKind::Simple(Scalar::I64(i64::from(i16::from_le_bytes(
            reader.bytes::<2>()?,
        )))),
        USHORT => BinKind::Simple(Scalar::I64(i64::from(u16::from_le_bytes(
            reader.bytes::<2>()?,
        )))),
        INT => BinKind::Simple(Scalar::I64(i64::from(i32::from_le_bytes(
            reader.bytes::<4>()?,
        )))),
        UINT => BinKind::Simple(Scalar::I64(i64::from(u32::from_le_bytes(
            reader.bytes::<4>()?,
        )))),
        LONG => BinKind::Simple(Scalar::I64(i64::from_le_bytes(reader.bytes::<8>()?))),
        ULONG => BinKind::Simple(Scalar::from_u64(u64::from_le_bytes(reader.bytes::<8>()?))),
        FLOAT => BinKind::Simple(Scalar::F64(f64::from(f32::from_le_bytes(
            reader.bytes::<4>()?,
        )))),
        DOUBLE => BinKind::Simple(Scalar::F64(f64::from_le_bytes(reader.bytes::<8>()?))),
        DATETIME => BinKind::Simple(Scalar::DateTime(reader.datetime()?)),
        DECIMAL => BinKind::Simple(Scalar::Decimal(reader.decimal()?)),
        STRING_UTF8 => BinKind::Simple(Scalar::Str(reader.utf8_string()?)),
        STRING_UTF16 => BinKind::Simple(Scalar::Str(reader.utf16_string()?)),
        FOLLOW_ID => BinKind::FollowId(reader.utf8_string()?),
        REF => BinKind::Ref(reader.varint()?),
        LIST => {
            let mut children = Vec::new();
            loop {
                let first = reader.u8()?;
                if first == END {
                    break;
                }
                children.push(decode_element_with(reader, first, depth + 1)?);
            }
            BinKind::List(children)
        }
        KVP => {
            let key = decode_element(reader, depth + 1)?;
            let value = decode_element(reader, depth + 1)?;
            BinKind::Pair(Box::new(key), Box::new(value))
        }
        DICT_INT | DICT_LONG | DICT_ULONG | DICT_DOUBLE | DICT_DATETIME | DICT_STRING
        | DICT_TWO_STRINGS => {
            let mut entries = Vec::new();
            loop {
                let first = reader.u8()?;
                if first == END {
                    break;
                }
                let value = decode_element_with(reader, first, depth + 1)?;
                let key = match tag {
                    DICT_INT => BinKey::Scalar(Scalar::I64(i64::from(i32::from_le_bytes(
                        reader.bytes::<4>()?,
                    )))),
                    DICT_LONG => {
                        BinKey::Scalar(Scalar::I64(i64::from_le_bytes(reader.bytes::<8>()?)))
                    }
                    DICT_ULONG => BinKey::Scalar(Scalar::from_u64(u64::from_le_bytes(
                        reader.bytes::<8>()?,
                    ))),
                    DICT_DOUBLE => {
                        BinKey::Scalar(Scalar::F64(f64::from_le_bytes(reader.bytes::<8>()?)))
                    }
                    DICT_DATETIME => BinKey::Scalar(Scalar::DateTime(reader.datetime()?)),
                    DICT_STRING => BinKey::Scalar(Scalar::Str(reader.utf8_string()?)),
                    _ => {
                        let name = reader.utf8_string()?;
                        let declaring = reader.utf8_string()?;
                        BinKey::Field(name, declaring)
                    }
                };
                entries.push((key, value));
            }
            BinKind::Dict(entries)
        }
        _ => return Err(Error::format(format!("unknown element tag {tag:#04x}"))),
    };

    let type_tag = if flags & FLAG_TYPE != 0 {
        Some((reader.utf8_string()?, false))
    } else if flags & FLAG_FULLTYPE != 0 {
        Some((reader.utf8_string()?, true))
    } else {
        None
    };
    let refid = if flags & FLAG_REFID != 0 {
        Some(reader.varint()?)
    } else {
        None
    };

    Ok(BinElement {
        kind,
        refid,
        type_tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(element: &BinElement) -> BinElement {
        decode(&encode(element).unwrap()).unwrap()
    }

    #[test]
    fn integers_use_the_smallest_tag() {
        let bytes = encode(&BinElement::plain(BinKind::Simple(Scalar::I64(200)))).unwrap();
        assert_eq!(bytes, vec![BYTE, 200]);
        let bytes = encode(&BinElement::plain(BinKind::Simple(Scalar::I64(-5)))).unwrap();
        assert_eq!(bytes, vec![SBYTE, 0xfb]);
        let bytes = encode(&BinElement::plain(BinKind::Simple(Scalar::I64(40000)))).unwrap();
        assert_eq!(bytes[0], USHORT);
        let bytes =
            encode(&BinElement::plain(BinKind::Simple(Scalar::U64(1 << 63)))).unwrap();
        assert_eq!(bytes[0], ULONG);
    }

    #[test]
    fn utf16_strings_escape_ff_bytes() {
        // U+4EFF encodes to the UTF-16 unit 0x4EFF, whose low byte is the
        // 0xFF escape byte; it is also shorter in UTF-16 than UTF-8.
        let s = "\u{4eff}\u{4eff}";
        let element = BinElement::plain(BinKind::Simple(Scalar::Str(s.into())));
        let bytes = encode(&element).unwrap();
        assert_eq!(bytes[0], STRING_UTF16);
        assert_eq!(roundtrip(&element), element);
    }

    #[test]
    fn ascii_strings_use_utf8() {
        let element = BinElement::plain(BinKind::Simple(Scalar::Str("hello".into())));
        let bytes = encode(&element).unwrap();
        assert_eq!(bytes[0], STRING_UTF8);
        assert_eq!(roundtrip(&element), element);
    }

    #[test]
    fn date_like_strings_are_stored_as_datetime() {
        let element = BinElement::plain(BinKind::Simple(Scalar::Str("2020-01-02".into())));
        let bytes = encode(&element).unwrap();
        assert_eq!(bytes[0], DATETIME);
        // The declared type decides the reading; the scalar comes back as a
        // date-time and converts to the original string exactly.
        let back = decode(&bytes).unwrap();
        match back.kind {
            BinKind::Simple(Scalar::DateTime(dt)) => {
                assert_eq!(exact::datetime_to_string(&dt), "2020-01-02");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn boolean_like_strings_use_the_bool_tags() {
        let element = BinElement::plain(BinKind::Simple(Scalar::Str("True".into())));
        assert_eq!(encode(&element).unwrap(), vec![TRUE]);
    }

    #[test]
    fn chars_ride_the_sixteen_bit_form() {
        let element = BinElement::plain(BinKind::Simple(Scalar::Char('\u{4e2d}')));
        let bytes = encode(&element).unwrap();
        assert_eq!(bytes, vec![USHORT, 0x2d, 0x4e]);
        match decode(&bytes).unwrap().kind {
            BinKind::Simple(Scalar::I64(code)) => assert_eq!(code, 0x4e2d),
            other => panic!("unexpected payload {other:?}"),
        }

        let astral = BinElement::plain(BinKind::Simple(Scalar::Char('\u{1f600}')));
        let err = encode(&astral).unwrap_err();
        assert!(err.to_string().contains("16-bit"));
    }

    #[test]
    fn both_type_flags_set_is_rejected() {
        let err = decode(&[NULL | FLAG_TYPE | FLAG_FULLTYPE]).unwrap_err();
        assert!(err.to_string().contains("invalid flag combination"));
    }

    #[test]
    fn truncated_streams_are_rejected() {
        assert!(decode(&[LIST]).is_err());
        assert!(decode(&[INT, 1, 2]).is_err());
    }

    #[test]
    fn decimals_round_trip() {
        let d: Decimal = "-123.4500".parse().unwrap();
        let element = BinElement::plain(BinKind::Simple(Scalar::Decimal(d)));
        assert_eq!(roundtrip(&element), element);
    }

    #[test]
    fn refid_and_type_trailers_follow_the_payload() {
        let element = BinElement {
            kind: BinKind::List(vec![BinElement::plain(BinKind::Simple(Scalar::I64(1)))]),
            refid: Some(7),
            type_tag: Some(("Dog".into(), false)),
        };
        assert_eq!(roundtrip(&element), element);
    }
}
