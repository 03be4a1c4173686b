//! Compact and pretty JSON writing.

use crate::value::{JsonValue, Number};

pub(crate) struct WriteOptions {
    pub pretty: bool,
    pub indent: &'static str,
}

pub(crate) fn write_value(out: &mut Vec<u8>, value: &JsonValue, opts: &WriteOptions, depth: usize) {
    match value {
        JsonValue::Null => out.extend_from_slice(b"null"),
        JsonValue::Bool(true) => out.extend_from_slice(b"true"),
        JsonValue::Bool(false) => out.extend_from_slice(b"false"),
        JsonValue::Number(n) => write_number(out, n),
        JsonValue::String(s) => write_string(out, s),
        JsonValue::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                newline(out, opts, depth + 1);
                write_value(out, item, opts, depth + 1);
            }
            if !items.is_empty() {
                newline(out, opts, depth);
            }
            out.push(b']');
        }
        JsonValue::Object(fields) => {
            out.push(b'{');
            for (i, (key, val)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                newline(out, opts, depth + 1);
                write_string(out, key);
                out.push(b':');
                if opts.pretty {
                    out.push(b' ');
                }
                write_value(out, val, opts, depth + 1);
            }
            if !fields.is_empty() {
                newline(out, opts, depth);
            }
            out.push(b'}');
        }
    }
}

fn newline(out: &mut Vec<u8>, opts: &WriteOptions, depth: usize) {
    if opts.pretty {
        out.push(b'\n');
        for _ in 0..depth {
            out.extend_from_slice(opts.indent.as_bytes());
        }
    }
}

fn write_number(out: &mut Vec<u8>, number: &Number) {
    match number {
        Number::I64(v) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(*v).as_bytes());
        }
        Number::U64(v) => {
            let mut buf = itoa::Buffer::new();
            out.extend_from_slice(buf.format(*v).as_bytes());
        }
        Number::F64(v) => {
            if v.is_finite() {
                let mut buf = ryu::Buffer::new();
                out.extend_from_slice(buf.format(*v).as_bytes());
            } else {
                // Non-finite floats never reach the writer through the
                // driver; raw trees degrade to null.
                out.extend_from_slice(b"null");
            }
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\u{8}' => out.extend_from_slice(b"\\b"),
            '\u{c}' => out.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}
