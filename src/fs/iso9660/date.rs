//! Timestamp decoding for the three on-disc date encodings.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

fn assemble(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    centiseconds: u32,
    gmt_offset: i8,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_milli_opt(
        hour,
        minute,
        second,
        centiseconds.min(99) * 10,
    )?;
    // Offsets are in 15-minute intervals east of GMT.
    Some(Utc.from_utc_datetime(&naive) - Duration::minutes(i64::from(gmt_offset) * 15))
}

/// 7-byte directory record date: years since 1900, month, day, hour,
/// minute, second, GMT offset.
pub fn decode_record_date(data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() < 7 || data[1] == 0 {
        return None;
    }
    assemble(
        1900 + i32::from(data[0]),
        u32::from(data[1]),
        u32::from(data[2]),
        u32::from(data[3]),
        u32::from(data[4]),
        u32::from(data[5]),
        0,
        data[6] as i8,
    )
}

/// 6-byte High Sierra and CD-i directory record date (no GMT offset).
pub fn decode_short_record_date(data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() < 6 || data[1] == 0 {
        return None;
    }
    assemble(
        1900 + i32::from(data[0]),
        u32::from(data[1]),
        u32::from(data[2]),
        u32::from(data[3]),
        u32::from(data[4]),
        u32::from(data[5]),
        0,
        0,
    )
}

fn digits(data: &[u8]) -> Option<u32> {
    data.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit()
            .then(|| acc * 10 + u32::from(b - b'0'))
    })
}

/// Volume descriptor date: 16 ASCII digits (`YYYYMMDDHHMMSScc`), followed by a
/// GMT offset byte when 17 bytes are given. All-zero dates mean "not specified".
pub fn decode_descriptor_date(data: &[u8]) -> Option<DateTime<Utc>> {
    if data.len() < 16 {
        return None;
    }
    let year = digits(&data[0..4])?;
    if year == 0 {
        return None;
    }
    let offset = if data.len() >= 17 { data[16] as i8 } else { 0 };
    assemble(
        year as i32,
        digits(&data[4..6])?,
        digits(&data[6..8])?,
        digits(&data[8..10])?,
        digits(&data[10..12])?,
        digits(&data[12..14])?,
        digits(&data[14..16])?,
        offset,
    )
}
