//! Exact conversions between simple values.
//!
//! The conversion contract consumed by the simple shape: a conversion
//! succeeds only if it round-trips exactly, except when the destination is
//! fractional, where the nearest representable value is used. Fractional to
//! integer is never allowed; integer/bool conversions admit only 0 and 1;
//! integer/char is binary-identical to the 16-bit unsigned conversion; and
//! integer/date-time uses the 100-nanosecond tick count since year one, UTC.
//!
//! String parsing is culture-invariant with the hard-coded tokens `True`,
//! `False`, `Inf`, `-Inf` and `NaN` (case-insensitive on input). Floats
//! format with their shortest round-trip representation; date-times format
//! as ISO-8601 with trailing zero components omitted.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::error::{Error, Result};
use crate::scalar::{Scalar, SimpleKind};

/// Ticks per second of the monotonic date-time tick count.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// The tick count of the maximum representable date,
/// 9999-12-31T23:59:59.9999999.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

/// A type convertible to and from [`Scalar`] under the exact-conversion
/// rules. Implemented for the standard integer widths, `bool`, `char`,
/// date-time, the three fractional widths and `String`.
pub trait Exact: Sized + 'static {
    /// The simple kind this type classifies as.
    const KIND: SimpleKind;

    /// Convert a value into its scalar carrier. Always succeeds.
    fn to_scalar(&self) -> Scalar;

    /// Convert a scalar into this type, failing unless the conversion is
    /// exact (or nearest-representable for fractional targets).
    fn from_scalar(scalar: &Scalar) -> Result<Self>;
}

fn bad(scalar: &Scalar, target: &str) -> Error {
    Error::conversion(format!("cannot convert {} to {target}", scalar.kind_name()))
}

// ---------------------------------------------------------------------------
// date-time ticks and strings

fn tick_epoch() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Convert a tick count in `[0, MAX_TICKS]` to a UTC date-time.
pub fn ticks_to_datetime(ticks: i64) -> Result<DateTime<Utc>> {
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(Error::conversion(format!("tick count {ticks} out of range")));
    }
    let delta = TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * 100);
    let naive = tick_epoch() + delta;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Convert a UTC date-time to its tick count. Fails on sub-tick precision
/// or dates outside the representable range.
pub fn datetime_to_ticks(value: &DateTime<Utc>) -> Result<i64> {
    let delta = value.naive_utc().signed_duration_since(tick_epoch());
    let secs = delta.num_seconds();
    let nanos = (delta - TimeDelta::seconds(secs))
        .num_nanoseconds()
        .unwrap_or(0);
    if nanos % 100 != 0 {
        return Err(Error::conversion(
            "date-time has sub-tick precision".to_owned(),
        ));
    }
    let ticks = secs
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(nanos / 100))
        .ok_or_else(|| Error::conversion("date-time out of tick range".to_owned()))?;
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(Error::conversion("date-time out of tick range".to_owned()));
    }
    Ok(ticks)
}

/// Format a date-time as ISO-8601, omitting trailing components that are
/// zero: midnight renders as a bare date, whole seconds render without a
/// fraction, and the fraction is trimmed of trailing zeros.
pub fn datetime_to_string(value: &DateTime<Utc>) -> String {
    let naive = value.naive_utc();
    let mut out = format!(
        "{:04}-{:02}-{:02}",
        naive.year(),
        naive.month(),
        naive.day()
    );
    let (h, m, s, ns) = (
        naive.hour(),
        naive.minute(),
        naive.second(),
        naive.nanosecond(),
    );
    if h == 0 && m == 0 && s == 0 && ns == 0 {
        return out;
    }
    out.push_str(&format!("T{h:02}:{m:02}"));
    if s != 0 || ns != 0 {
        out.push_str(&format!(":{s:02}"));
    }
    if ns != 0 {
        let mut frac = format!("{:07}", ns / 100);
        while frac.ends_with('0') {
            frac.pop();
        }
        out.push('.');
        out.push_str(&frac);
    }
    out
}

/// Parse a date-time from the ISO-8601 forms produced by
/// [`datetime_to_string`], plus an optional trailing `Z` or `±hh:mm`
/// offset. Unspecified kind is treated as UTC; an explicit offset is
/// converted to UTC.
pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>> {
    let t = text.trim();
    let err = || Error::conversion(format!("`{t}` is not a valid date-time"));

    let (date_part, time_part) = match t.find(['T', ' ']) {
        Some(i) => (&t[..i], Some(&t[i + 1..])),
        None => (t, None),
    };

    let mut date_it = date_part.split('-');
    let year: i32 = date_it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let month: u32 = date_it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let day: u32 = date_it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    if date_it.next().is_some() {
        return Err(err());
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)?;

    let (mut hour, mut minute, mut second, mut nanos) = (0u32, 0u32, 0u32, 0u32);
    let mut offset_minutes = 0i64;
    if let Some(mut time) = time_part {
        if let Some(stripped) = time.strip_suffix(['Z', 'z']) {
            time = stripped;
        } else if let Some(i) = time.rfind(['+', '-']) {
            // An offset sign can only follow the minutes or seconds digits.
            if i >= 4 {
                let (clock, off) = (&time[..i], &time[i..]);
                let sign = if off.starts_with('-') { -1 } else { 1 };
                let body = &off[1..];
                let (oh, om) = match body.find(':') {
                    Some(j) => (&body[..j], &body[j + 1..]),
                    None => return Err(err()),
                };
                let oh: i64 = oh.parse().map_err(|_| err())?;
                let om: i64 = om.parse().map_err(|_| err())?;
                offset_minutes = sign * (oh * 60 + om);
                time = clock;
            }
        }
        let mut clock_it = time.split(':');
        hour = clock_it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        minute = clock_it.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        if let Some(sec) = clock_it.next() {
            let (whole, frac) = match sec.find('.') {
                Some(i) => (&sec[..i], &sec[i + 1..]),
                None => (sec, ""),
            };
            second = whole.parse().map_err(|_| err())?;
            if !frac.is_empty() {
                if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                let scale = 10u32.pow(9 - frac.len() as u32);
                nanos = frac.parse::<u32>().map_err(|_| err())? * scale;
            }
        }
        if clock_it.next().is_some() {
            return Err(err());
        }
    }

    let naive = date
        .and_hms_nano_opt(hour, minute, second, nanos)
        .ok_or_else(err)?;
    let utc = naive - TimeDelta::minutes(offset_minutes);
    Ok(DateTime::from_naive_utc_and_offset(utc, Utc))
}

// ---------------------------------------------------------------------------
// string forms

fn f64_to_string(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v == f64::INFINITY {
        "Inf".to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        ryu::Buffer::new().format(v).to_owned()
    }
}

fn parse_f64(text: &str) -> Result<f64> {
    let t = text.trim();
    if t.eq_ignore_ascii_case("inf") {
        Ok(f64::INFINITY)
    } else if t.eq_ignore_ascii_case("-inf") {
        Ok(f64::NEG_INFINITY)
    } else if t.eq_ignore_ascii_case("nan") {
        Ok(f64::NAN)
    } else {
        t.parse::<f64>()
            .map_err(|_| Error::conversion(format!("`{t}` is not a valid float")))
    }
}

/// The canonical string form of any scalar. Never fails.
pub fn scalar_to_string(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Bool(true) => "True".to_owned(),
        Scalar::Bool(false) => "False".to_owned(),
        Scalar::Char(c) => c.to_string(),
        Scalar::I64(v) => v.to_string(),
        Scalar::U64(v) => v.to_string(),
        Scalar::F64(v) => f64_to_string(*v),
        Scalar::Decimal(v) => v.to_string(),
        Scalar::DateTime(v) => datetime_to_string(v),
        Scalar::Str(s) => s.clone(),
    }
}

// ---------------------------------------------------------------------------
// integer targets

fn scalar_int(scalar: &Scalar, target: &str) -> Result<Scalar> {
    match scalar {
        Scalar::I64(_) | Scalar::U64(_) => Ok(scalar.clone()),
        Scalar::Bool(b) => Ok(Scalar::I64(i64::from(*b))),
        // Binary-identical to the 16-bit unsigned conversion, whatever the
        // target width.
        Scalar::Char(c) => match u16::try_from(*c as u32) {
            Ok(code) => Ok(Scalar::I64(i64::from(code))),
            Err(_) => Err(bad(scalar, target)),
        },
        Scalar::DateTime(dt) => Ok(Scalar::I64(datetime_to_ticks(dt)?)),
        Scalar::Str(s) => {
            let t = s.trim();
            if let Ok(v) = t.parse::<i64>() {
                Ok(Scalar::I64(v))
            } else if let Ok(v) = t.parse::<u64>() {
                Ok(Scalar::U64(v))
            } else {
                Err(Error::conversion(format!("`{t}` is not a valid {target}")))
            }
        }
        Scalar::F64(_) | Scalar::Decimal(_) => Err(bad(scalar, target)),
    }
}

macro_rules! impl_exact_int {
    ($($t:ty => $kind:expr, $to:expr;)+) => {$(
        impl Exact for $t {
            const KIND: SimpleKind = $kind;

            fn to_scalar(&self) -> Scalar {
                #[allow(clippy::redundant_closure_call)]
                ($to)(*self)
            }

            fn from_scalar(scalar: &Scalar) -> Result<Self> {
                match scalar_int(scalar, stringify!($t))? {
                    Scalar::I64(v) => <$t>::try_from(v).map_err(|_| bad(scalar, stringify!($t))),
                    Scalar::U64(v) => <$t>::try_from(v).map_err(|_| bad(scalar, stringify!($t))),
                    _ => unreachable!(),
                }
            }
        }
    )+};
}

impl_exact_int! {
    i8 => SimpleKind::SignedInt, |v| Scalar::I64(i64::from(v));
    i16 => SimpleKind::SignedInt, |v| Scalar::I64(i64::from(v));
    i32 => SimpleKind::SignedInt, |v| Scalar::I64(i64::from(v));
    i64 => SimpleKind::SignedInt, Scalar::I64;
    u8 => SimpleKind::UnsignedInt, |v| Scalar::I64(i64::from(v));
    u16 => SimpleKind::UnsignedInt, |v| Scalar::I64(i64::from(v));
    u32 => SimpleKind::UnsignedInt, |v| Scalar::I64(i64::from(v));
    u64 => SimpleKind::UnsignedInt, Scalar::from_u64;
}

// ---------------------------------------------------------------------------
// the remaining kinds

impl Exact for bool {
    const KIND: SimpleKind = SimpleKind::Bool;

    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        match scalar {
            Scalar::Bool(b) => Ok(*b),
            Scalar::I64(0) | Scalar::U64(0) => Ok(false),
            Scalar::I64(1) | Scalar::U64(1) => Ok(true),
            Scalar::Str(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Scalar::Str(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(bad(scalar, "bool")),
        }
    }
}

impl Exact for char {
    const KIND: SimpleKind = SimpleKind::Char;

    fn to_scalar(&self) -> Scalar {
        Scalar::Char(*self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        let from_code = |code: u32| {
            char::from_u32(code).ok_or_else(|| {
                Error::conversion(format!("code point {code} is not a valid char"))
            })
        };
        match scalar {
            Scalar::Char(c) => Ok(*c),
            // Binary-identical to the 16-bit unsigned conversion: integers
            // beyond the u16 range never become chars.
            Scalar::I64(v) => {
                let code = u16::try_from(*v).map_err(|_| bad(scalar, "char"))?;
                from_code(u32::from(code))
            }
            Scalar::U64(v) => {
                let code = u16::try_from(*v).map_err(|_| bad(scalar, "char"))?;
                from_code(u32::from(code))
            }
            Scalar::Str(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(bad(scalar, "char")),
                }
            }
            _ => Err(bad(scalar, "char")),
        }
    }
}

impl Exact for DateTime<Utc> {
    const KIND: SimpleKind = SimpleKind::DateTime;

    fn to_scalar(&self) -> Scalar {
        Scalar::DateTime(*self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        match scalar {
            Scalar::DateTime(dt) => Ok(*dt),
            Scalar::I64(v) => ticks_to_datetime(*v),
            Scalar::U64(v) => {
                let ticks = i64::try_from(*v).map_err(|_| bad(scalar, "date-time"))?;
                ticks_to_datetime(ticks)
            }
            Scalar::Str(s) => parse_datetime(s),
            _ => Err(bad(scalar, "date-time")),
        }
    }
}

impl Exact for f64 {
    const KIND: SimpleKind = SimpleKind::Float;

    fn to_scalar(&self) -> Scalar {
        Scalar::F64(*self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        match scalar {
            Scalar::F64(v) => Ok(*v),
            Scalar::I64(v) => Ok(*v as f64),
            Scalar::U64(v) => Ok(*v as f64),
            Scalar::Decimal(v) => v.to_f64().ok_or_else(|| bad(scalar, "f64")),
            Scalar::Str(s) => parse_f64(s),
            _ => Err(bad(scalar, "f64")),
        }
    }
}

impl Exact for f32 {
    const KIND: SimpleKind = SimpleKind::Float;

    fn to_scalar(&self) -> Scalar {
        Scalar::F64(f64::from(*self))
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        Ok(f64::from_scalar(scalar)? as f32)
    }
}

impl Exact for Decimal {
    const KIND: SimpleKind = SimpleKind::Decimal;

    fn to_scalar(&self) -> Scalar {
        Scalar::Decimal(*self)
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        match scalar {
            Scalar::Decimal(v) => Ok(*v),
            Scalar::I64(v) => Ok(Decimal::from(*v)),
            Scalar::U64(v) => Ok(Decimal::from(*v)),
            Scalar::F64(v) => Decimal::from_f64(*v).ok_or_else(|| bad(scalar, "decimal")),
            Scalar::Str(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| Error::conversion(format!("`{s}` is not a valid decimal"))),
            _ => Err(bad(scalar, "decimal")),
        }
    }
}

impl Exact for String {
    const KIND: SimpleKind = SimpleKind::String;

    fn to_scalar(&self) -> Scalar {
        Scalar::Str(self.clone())
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        Ok(scalar_to_string(scalar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_round_trip_exactly() {
        assert_eq!(u8::from_scalar(&Scalar::I64(200)).unwrap(), 200);
        assert!(u8::from_scalar(&Scalar::I64(300)).is_err());
        assert!(i8::from_scalar(&Scalar::I64(-200)).is_err());
        assert_eq!(u64::from_scalar(&Scalar::U64(1 << 63)).unwrap(), 1 << 63);
        assert!(i64::from_scalar(&Scalar::U64(1 << 63)).is_err());
    }

    #[test]
    fn fractional_to_integer_is_never_allowed() {
        assert!(i64::from_scalar(&Scalar::F64(1.0)).is_err());
        assert!(u32::from_scalar(&Scalar::Decimal(Decimal::from(2))).is_err());
    }

    #[test]
    fn bool_int_conversions_accept_only_zero_and_one() {
        assert!(bool::from_scalar(&Scalar::I64(1)).unwrap());
        assert!(!bool::from_scalar(&Scalar::I64(0)).unwrap());
        assert!(bool::from_scalar(&Scalar::I64(2)).is_err());
        assert_eq!(i32::from_scalar(&Scalar::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn char_is_the_sixteen_bit_conversion() {
        assert_eq!(char::from_scalar(&Scalar::I64(65)).unwrap(), 'A');
        assert_eq!(u16::from_scalar(&Scalar::Char('A')).unwrap(), 65);
        assert!(char::from_scalar(&Scalar::I64(0xD800)).is_err());
        // The first codepoint past the BMP is a valid char but not a valid
        // 16-bit value.
        assert!(char::from_scalar(&Scalar::I64(0x10000)).is_err());
        assert!(char::from_scalar(&Scalar::U64(0x10000)).is_err());
        assert!(i32::from_scalar(&Scalar::Char('\u{1f600}')).is_err());
        assert!(u64::from_scalar(&Scalar::Char('\u{1f600}')).is_err());
        assert_eq!(i64::from_scalar(&Scalar::Char('\u{ffff}')).unwrap(), 0xffff);
    }

    #[test]
    fn datetime_ticks_round_trip() {
        let dt = parse_datetime("2020-06-01T12:30:45.5").unwrap();
        let ticks = datetime_to_ticks(&dt).unwrap();
        assert_eq!(ticks_to_datetime(ticks).unwrap(), dt);
        assert_eq!(ticks_to_datetime(0).unwrap(), parse_datetime("0001-01-01").unwrap());
        assert!(ticks_to_datetime(-1).is_err());
        assert!(ticks_to_datetime(MAX_TICKS + 1).is_err());
    }

    #[test]
    fn datetime_strings_omit_trailing_zero_components() {
        let midnight = parse_datetime("2020-01-02").unwrap();
        assert_eq!(datetime_to_string(&midnight), "2020-01-02");
        let whole = parse_datetime("2020-01-02T03:04:05").unwrap();
        assert_eq!(datetime_to_string(&whole), "2020-01-02T03:04:05");
        let frac = parse_datetime("2020-01-02T03:04:05.25").unwrap();
        assert_eq!(datetime_to_string(&frac), "2020-01-02T03:04:05.25");
    }

    #[test]
    fn datetime_offsets_convert_to_utc() {
        let east = parse_datetime("2020-01-02T03:00:00+02:00").unwrap();
        assert_eq!(datetime_to_string(&east), "2020-01-02T01:00");
        let zulu = parse_datetime("2020-01-02T01:00:00Z").unwrap();
        assert_eq!(east, zulu);
    }

    #[test]
    fn float_tokens_are_case_insensitive() {
        assert_eq!(f64::from_scalar(&Scalar::Str("inf".into())).unwrap(), f64::INFINITY);
        assert_eq!(f64::from_scalar(&Scalar::Str("-INF".into())).unwrap(), f64::NEG_INFINITY);
        assert!(f64::from_scalar(&Scalar::Str("nan".into())).unwrap().is_nan());
        assert_eq!(scalar_to_string(&Scalar::F64(f64::INFINITY)), "Inf");
        assert_eq!(scalar_to_string(&Scalar::Bool(true)), "True");
    }

    #[test]
    fn float_strings_round_trip() {
        for v in [0.1f64, 1.0 / 3.0, f64::MIN_POSITIVE, 1e300] {
            let s = scalar_to_string(&Scalar::F64(v));
            assert_eq!(f64::from_scalar(&Scalar::Str(s)).unwrap(), v);
        }
    }
}
