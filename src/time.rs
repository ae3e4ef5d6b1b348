/// Conversions from format-native epochs to canonical timestamps
///
/// Legacy formats count time from their own reference dates and use zero as
/// "date not set". Every conversion here returns `None` for the sentinel
/// rather than mapping it to the epoch itself.
use chrono::{DateTime, NaiveDate, Utc};

/// Unix timestamp of 1904-01-01T00:00:00Z, the classic Mac OS epoch
const MAC_EPOCH_OFFSET: i64 = -2_082_844_800;

/// Unix timestamp of 1978-01-01T00:00:00Z, the AmigaOS epoch
const AMIGA_EPOCH_OFFSET: i64 = 252_460_800;

/// Amiga datestamps count ticks of 1/50th of a second
const TICKS_PER_SECOND: u32 = 50;

/// Convert seconds since 1904-01-01 (HFS, HFS+)
pub fn mac_epoch(secs: u32) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(secs as i64 + MAC_EPOCH_OFFSET, 0)
}

/// Convert an Amiga datestamp (days/minutes/ticks since 1978-01-01)
pub fn amiga_epoch(days: u32, mins: u32, ticks: u32) -> Option<DateTime<Utc>> {
    if days == 0 && mins == 0 && ticks == 0 {
        return None;
    }
    let secs = AMIGA_EPOCH_OFFSET
        + days as i64 * 86_400
        + mins as i64 * 60
        + (ticks / TICKS_PER_SECOND) as i64;
    let nanos = (ticks % TICKS_PER_SECOND) * 20_000_000;
    DateTime::from_timestamp(secs, nanos)
}

/// Convert seconds since 1978-01-01 (SFS)
pub fn amiga_seconds(secs: u32) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(secs as i64 + AMIGA_EPOCH_OFFSET, 0)
}

/// Convert a LIF BCD date field (yy mm dd hh mm ss)
///
/// Years below 70 belong to 2000-2069, the rest to 1900-1999. Invalid BCD
/// digits or impossible calendar values decode as "not set".
pub fn lif_bcd(raw: &[u8; 6]) -> Option<DateTime<Utc>> {
    if raw.iter().all(|&b| b == 0) {
        return None;
    }

    let year = bcd(raw[0])? as i32;
    let month = bcd(raw[1])? as u32;
    let day = bcd(raw[2])? as u32;
    let hour = bcd(raw[3])? as u32;
    let minute = bcd(raw[4])? as u32;
    let second = bcd(raw[5])? as u32;

    let year = if year < 70 { 2000 + year } else { 1900 + year };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|dt| dt.and_utc())
}

fn bcd(b: u8) -> Option<u8> {
    let high = b >> 4;
    let low = b & 0x0F;
    if high > 9 || low > 9 {
        return None;
    }
    Some(high * 10 + low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mac_epoch_sentinel() {
        assert_eq!(mac_epoch(0), None);
    }

    #[test]
    fn test_mac_epoch_known_date() {
        // 100 years (25 leap days) after 1904-01-01
        let secs = 36_525u32 * 86_400;
        assert_eq!(
            mac_epoch(secs),
            Some(Utc.with_ymd_and_hms(2004, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_mac_epoch_start() {
        assert_eq!(
            mac_epoch(1),
            Some(Utc.with_ymd_and_hms(1904, 1, 1, 0, 0, 1).unwrap())
        );
    }

    #[test]
    fn test_amiga_epoch_sentinel() {
        assert_eq!(amiga_epoch(0, 0, 0), None);
    }

    #[test]
    fn test_amiga_epoch_datestamp() {
        assert_eq!(
            amiga_epoch(1, 61, 100),
            Some(Utc.with_ymd_and_hms(1978, 1, 2, 1, 1, 2).unwrap())
        );
    }

    #[test]
    fn test_amiga_seconds() {
        assert_eq!(amiga_seconds(0), None);
        assert_eq!(
            amiga_seconds(86_400),
            Some(Utc.with_ymd_and_hms(1978, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_lif_bcd_sentinel() {
        assert_eq!(lif_bcd(&[0; 6]), None);
    }

    #[test]
    fn test_lif_bcd_date() {
        let raw = [0x98, 0x11, 0x05, 0x14, 0x30, 0x00];
        assert_eq!(
            lif_bcd(&raw),
            Some(Utc.with_ymd_and_hms(1998, 11, 5, 14, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_lif_bcd_century_window() {
        let raw = [0x25, 0x01, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(
            lif_bcd(&raw),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_lif_bcd_invalid_digit() {
        assert_eq!(lif_bcd(&[0x9A, 0x01, 0x01, 0, 0, 0]), None);
    }

    #[test]
    fn test_lif_bcd_invalid_month() {
        assert_eq!(lif_bcd(&[0x98, 0x13, 0x01, 0, 0, 0]), None);
    }
}
