use anyhow::{bail, Result};

/// Decode a binary-protocol MySQL `TIME` payload into a signed span.
///
/// Layout: length byte (0, 8 or 12), sign, days (u32 LE), hour, minute,
/// second, then microseconds (u32 LE) when the length is 12.
pub(crate) fn mysql_time_bin_to_duration(buf: &[u8]) -> Result<chrono::Duration> {
    if buf.is_empty() {
        bail!("empty TIME payload");
    }
    let len = buf[0] as usize;
    if len == 0 {
        return Ok(chrono::Duration::zero());
    }
    if buf.len() != 1 + len || !(len == 8 || len == 12) {
        bail!("unexpected TIME payload length: {}", buf.len());
    }

    let is_neg = buf[1] != 0;
    let days = i64::from(u32::from_le_bytes([buf[2], buf[3], buf[4], buf[5]]));
    let hour = i64::from(buf[6]);
    let minute = i64::from(buf[7]);
    let second = i64::from(buf[8]);
    let micros = if len == 12 {
        i64::from(u32::from_le_bytes([buf[9], buf[10], buf[11], buf[12]]))
    } else {
        0
    };

    let span = chrono::Duration::seconds(((days * 24 + hour) * 60 + minute) * 60 + second)
        + chrono::Duration::microseconds(micros);
    Ok(if is_neg { -span } else { span })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_is_zero() {
        assert_eq!(mysql_time_bin_to_duration(&[0]).unwrap(), chrono::Duration::zero());
    }

    #[test]
    fn test_days_and_fraction() {
        // -1 day 02:03:04.000500
        let buf = [12, 1, 1, 0, 0, 0, 2, 3, 4, 0xf4, 0x01, 0, 0];
        let expected = chrono::Duration::seconds(26 * 3600 + 3 * 60 + 4) + chrono::Duration::microseconds(500);
        assert_eq!(mysql_time_bin_to_duration(&buf).unwrap(), -expected);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(mysql_time_bin_to_duration(&[]).is_err());
        assert!(mysql_time_bin_to_duration(&[8, 0, 0]).is_err());
        assert!(mysql_time_bin_to_duration(&[5, 0, 0, 0, 0, 0]).is_err());
    }
}
