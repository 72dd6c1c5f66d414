//! LOC record payload (RFC 1876)
//!
//! The payload is kept in its wire integers; parsing and rendering go through
//! the RFC 1876 presentation format.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Equator / prime meridian reference value for latitude and longitude
const LOC_EQUATOR: u64 = 1 << 31;

/// Altitude reference: 100 000 m below the WGS 84 spheroid, in centimetres
const LOC_ALTITUDE_BASE: i64 = 10_000_000;

/// Default size: 1 m
const DEFAULT_SIZE: u8 = 0x12;

/// Default horizontal precision: 10 000 m
const DEFAULT_HORIZ_PRE: u8 = 0x16;

/// Default vertical precision: 10 m
const DEFAULT_VERT_PRE: u8 = 0x13;

/// A parsed LOC payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Loc {
    /// Always 0
    pub version: u8,
    /// Diameter of the enclosing sphere, mantissa/exponent encoded
    pub size: u8,
    /// Horizontal precision, mantissa/exponent encoded
    pub horiz_pre: u8,
    /// Vertical precision, mantissa/exponent encoded
    pub vert_pre: u8,
    /// Thousandths of an arc second, offset by 2^31
    pub latitude: u32,
    /// Thousandths of an arc second, offset by 2^31
    pub longitude: u32,
    /// Centimetres above the base altitude
    pub altitude: u32,
}

impl Loc {
    /// Parse the presentation format:
    ///
    /// `d1 [m1 [s1]] N|S d2 [m2 [s2]] E|W alt[m] [siz[m] [hp[m] [vp[m]]]]`
    pub fn parse(raw: &str) -> Result<Self> {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let mut pos = 0;

        let latitude = parse_coordinate(raw, &tokens, &mut pos, ('N', 'S'), 90)?;
        let longitude = parse_coordinate(raw, &tokens, &mut pos, ('E', 'W'), 180)?;

        let alt_token = tokens
            .get(pos)
            .ok_or_else(|| Error::parse(raw, "LOC is missing altitude"))?;
        pos += 1;
        let alt_cm = parse_metres(raw, alt_token)?;
        let altitude = alt_cm + LOC_ALTITUDE_BASE;
        if !(0..=i64::from(u32::MAX)).contains(&altitude) {
            return Err(Error::parse(raw, "LOC altitude out of range"));
        }

        let mut precision = [DEFAULT_SIZE, DEFAULT_HORIZ_PRE, DEFAULT_VERT_PRE];
        for slot in precision.iter_mut() {
            let Some(token) = tokens.get(pos) else { break };
            pos += 1;
            let cm = parse_metres(raw, token)?;
            if cm < 0 {
                return Err(Error::parse(raw, "LOC precision must not be negative"));
            }
            *slot = encode_precision(cm as u64)
                .ok_or_else(|| Error::parse(raw, "LOC precision out of range"))?;
        }
        if pos != tokens.len() {
            return Err(Error::parse(raw, "LOC has trailing fields"));
        }

        Ok(Self {
            version: 0,
            size: precision[0],
            horiz_pre: precision[1],
            vert_pre: precision[2],
            latitude: latitude as u32,
            longitude: longitude as u32,
            altitude: altitude as u32,
        })
    }
}

fn parse_coordinate(
    raw: &str,
    tokens: &[&str],
    pos: &mut usize,
    hemispheres: (char, char),
    max_degrees: u64,
) -> Result<u64> {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    let hemisphere = loop {
        let token = tokens
            .get(*pos)
            .ok_or_else(|| Error::parse(raw, "LOC coordinate is incomplete"))?;
        *pos += 1;
        let upper = token.to_ascii_uppercase();
        if upper == hemispheres.0.to_string() || upper == hemispheres.1.to_string() {
            break upper.chars().next().unwrap_or(hemispheres.0);
        }
        if parts.len() == 3 {
            return Err(Error::parse(
                raw,
                format!("expected {} or {}", hemispheres.0, hemispheres.1),
            ));
        }
        parts.push(token);
    };
    if parts.is_empty() {
        return Err(Error::parse(raw, "LOC coordinate has no degrees"));
    }

    let degrees: u64 = parts[0]
        .parse()
        .map_err(|_| Error::parse(raw, format!("bad LOC degrees {:?}", parts[0])))?;
    let minutes: u64 = match parts.get(1) {
        Some(m) => m
            .parse()
            .map_err(|_| Error::parse(raw, format!("bad LOC minutes {m:?}")))?,
        None => 0,
    };
    let millis = match parts.get(2) {
        Some(s) => parse_seconds(raw, s)?,
        None => 0,
    };
    if degrees > max_degrees || minutes >= 60 || millis >= 60_000 {
        return Err(Error::parse(raw, "LOC coordinate out of range"));
    }

    let offset = degrees * 3_600_000 + minutes * 60_000 + millis;
    if offset > max_degrees * 3_600_000 {
        return Err(Error::parse(raw, "LOC coordinate out of range"));
    }
    Ok(if hemisphere == hemispheres.0 {
        LOC_EQUATOR + offset
    } else {
        LOC_EQUATOR - offset
    })
}

/// Seconds with up to three decimals, as thousandths
fn parse_seconds(raw: &str, token: &str) -> Result<u64> {
    let (whole, frac) = token.split_once('.').unwrap_or((token, ""));
    if whole.is_empty() || frac.len() > 3 {
        return Err(Error::parse(raw, format!("bad LOC seconds {token:?}")));
    }
    let whole: u64 = whole
        .parse()
        .map_err(|_| Error::parse(raw, format!("bad LOC seconds {token:?}")))?;
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<3}")
            .parse()
            .map_err(|_| Error::parse(raw, format!("bad LOC seconds {token:?}")))?
    };
    Ok(whole * 1000 + frac)
}

/// A distance in metres (optional `m` suffix, up to two decimals) as centimetres
fn parse_metres(raw: &str, token: &str) -> Result<i64> {
    let value = token.strip_suffix(['m', 'M']).unwrap_or(token);
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
    let bad = || Error::parse(raw, format!("bad LOC distance {token:?}"));
    if whole.is_empty() || frac.len() > 2 {
        return Err(bad());
    }
    let whole: i64 = whole.parse().map_err(|_| bad())?;
    let frac: i64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<2}").parse().map_err(|_| bad())?
    };
    let cm = whole * 100 + frac;
    Ok(if negative { -cm } else { cm })
}

/// Encode centimetres as RFC 1876 mantissa/exponent, rounding down
fn encode_precision(mut cm: u64) -> Option<u8> {
    let mut exponent = 0u8;
    while cm >= 10 {
        cm /= 10;
        exponent += 1;
    }
    if exponent > 9 {
        return None;
    }
    Some(((cm as u8) << 4) | exponent)
}

fn decode_precision(value: u8) -> u64 {
    let mantissa = u64::from(value >> 4);
    let exponent = u32::from(value & 0x0f);
    mantissa * 10u64.pow(exponent)
}

fn write_metres(f: &mut fmt::Formatter<'_>, cm: i64) -> fmt::Result {
    let sign = if cm < 0 { "-" } else { "" };
    let cm = cm.abs();
    if cm % 100 == 0 {
        write!(f, "{sign}{}m", cm / 100)
    } else {
        write!(f, "{sign}{}.{:02}m", cm / 100, cm % 100)
    }
}

fn write_coordinate(
    f: &mut fmt::Formatter<'_>,
    value: u32,
    hemispheres: (char, char),
) -> fmt::Result {
    let value = u64::from(value);
    let (offset, hemisphere) = if value >= LOC_EQUATOR {
        (value - LOC_EQUATOR, hemispheres.0)
    } else {
        (LOC_EQUATOR - value, hemispheres.1)
    };
    let degrees = offset / 3_600_000;
    let minutes = (offset % 3_600_000) / 60_000;
    let millis = offset % 60_000;
    write!(
        f,
        "{degrees} {minutes} {}.{:03} {hemisphere}",
        millis / 1000,
        millis % 1000
    )
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(f, self.latitude, ('N', 'S'))?;
        f.write_str(" ")?;
        write_coordinate(f, self.longitude, ('E', 'W'))?;
        f.write_str(" ")?;
        write_metres(f, i64::from(self.altitude) - LOC_ALTITUDE_BASE)?;
        for value in [self.size, self.horiz_pre, self.vert_pre] {
            f.write_str(" ")?;
            write_metres(f, decode_precision(value) as i64)?;
        }
        Ok(())
    }
}
