use std::fmt;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};

use crate::checksum::{add_checksum, xor_checksum};
use crate::device::{ConfigError, DeviceConfiguration, OutletMode, OverloadProtection};

pub const PACKET_LEN: usize = 40;
pub const STX: u8 = 0xDA;
pub const ETX: u8 = 0x25;
/// Bytes 5..=36 of the configuration packet.
pub const PAYLOAD_LEN: u8 = 32;
pub const VERSION: [u8; 2] = [0x03, 0x13];

const SUM_RANGE: std::ops::Range<usize> = 6..37;
const XOR_AT: usize = 37;
const ADD_AT: usize = 38;
const STAMP_AT: usize = 29;
const YEAR_BASE: i32 = 2020;

/// A built configuration packet. Immutable once encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_LEN]);

impl Packet {
    /// Encode `cfg` stamped with the current local time.
    pub fn encode(cfg: &DeviceConfiguration) -> Result<Self, ConfigError> {
        Self::encode_at(cfg, Local::now().naive_local())
    }

    pub fn encode_at(cfg: &DeviceConfiguration, now: NaiveDateTime) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let mut p = [0u8; PACKET_LEN];
        p[0] = STX;
        p[1] = cfg.product_type.code();
        p[2..4].copy_from_slice(&cfg.mac_low.0);
        p[4] = PAYLOAD_LEN;
        p[5] = (cfg.light_circuits & 0x0F)
            | ((cfg.outlet_circuits & 0x03) << 4)
            | ((cfg.dimming_type.code() & 0x03) << 6);
        p[6] = cfg.delay_time;
        p[7] = cfg.sub_id;
        p[8] = cfg.ir_present as u8;
        p[9] = cfg.scenario & 0x07;
        p[10] = cfg.comm_company & 0x07;
        p[11] = cfg.three_way as u8;
        let overload = match cfg.overload_protection {
            OverloadProtection::Sum => 0,
            OverloadProtection::Individual => 1,
        };
        p[12] = overload | ((cfg.emergency_call as u8) << 4);
        p[13..15].copy_from_slice(&cfg.outlet1_learn_value.to_le_bytes());
        p[15..17].copy_from_slice(&cfg.outlet1_current_value.to_le_bytes());
        p[17..19].copy_from_slice(&cfg.outlet2_learn_value.to_le_bytes());
        p[19..21].copy_from_slice(&cfg.outlet2_current_value.to_le_bytes());
        p[21] = cfg.relay_status;
        p[22] = mode_bit(cfg.outlet1_mode);
        p[23] = mode_bit(cfg.outlet2_mode);
        // 24 reserved
        p[25] = cfg.sleep_mode as u8;
        p[26] = cfg.delay_mode as u8;
        p[27] = cfg.dimming_value;
        p[28] = cfg.color_temp_value;
        p[STAMP_AT..STAMP_AT + 4].copy_from_slice(&stamp_bytes(now));
        // 33..=34 reserved
        p[35..37].copy_from_slice(&VERSION);
        p[XOR_AT] = xor_checksum(&p[SUM_RANGE]);
        p[ADD_AT] = add_checksum(&p[SUM_RANGE]);
        p[PACKET_LEN - 1] = ETX;
        Ok(Packet(p))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode time recovered from bytes 29..=32. `None` if the bytes do not form a date.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        timestamp_of(&self.0)
    }
}

impl TryFrom<&[u8]> for Packet {
    type Error = anyhow::Error;
    fn try_from(bytes: &[u8]) -> Result<Self> {
        if !validate(bytes) {
            bail!("not a valid {}-byte configuration packet", PACKET_LEN);
        }
        let mut p = [0u8; PACKET_LEN];
        p.copy_from_slice(bytes);
        Ok(Packet(p))
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_dump(&self.0))
    }
}

/// Structural and checksum check of a received packet. Never errors.
pub fn validate(bytes: &[u8]) -> bool {
    if bytes.len() != PACKET_LEN {
        return false;
    }
    let framed = bytes[0] == STX && bytes[PACKET_LEN - 1] == ETX;
    let xor_ok = xor_checksum(&bytes[SUM_RANGE]) == bytes[XOR_AT];
    let add_ok = add_checksum(&bytes[SUM_RANGE]) == bytes[ADD_AT];
    framed && xor_ok && add_ok
}

fn mode_bit(m: OutletMode) -> u8 {
    match m {
        OutletMode::Manual => 0,
        OutletMode::Auto => 1,
    }
}

fn stamp_bytes(now: NaiveDateTime) -> [u8; 4] {
    let year_offset = ((now.year() - YEAR_BASE) as u8) & 0x0F;
    [
        (year_offset << 4) | (now.month() as u8 & 0x0F),
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
    ]
}

fn timestamp_of(p: &[u8]) -> Option<NaiveDateTime> {
    let ym = *p.get(STAMP_AT)?;
    let year = YEAR_BASE + (ym >> 4) as i32;
    let month = (ym & 0x0F) as u32;
    let day = *p.get(STAMP_AT + 1)? as u32;
    let hour = *p.get(STAMP_AT + 2)? as u32;
    let minute = *p.get(STAMP_AT + 3)? as u32;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Upper-case, space-separated hex, e.g. `DA 5B 0A`.
pub fn hex_dump(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{:02X}", b);
    }
    s
}

/// Parse hex text; whitespace, `:` and `-` separators are ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    if digits.len() % 2 != 0 {
        bail!("odd hex length");
    }
    if !digits.is_ascii() {
        bail!("non-ascii characters in hex input");
    }
    let mut out = Vec::with_capacity(digits.len() / 2);
    for i in (0..digits.len()).step_by(2) {
        let b = u8::from_str_radix(&digits[i..i + 2], 16)
            .with_context(|| format!("bad hex byte {:?}", &digits[i..i + 2]))?;
        out.push(b);
    }
    Ok(out)
}
