use super::{IovDataError, IovTimeStamp, MAX_SUBSTAMP_LENGTH};

/// Digits in a raw detector timestamp (ns since epoch)
pub const RAW_TIMESTAMP_DIGITS: usize = 19;
/// Digits of whole seconds in a raw detector timestamp
pub const SECONDS_DIGITS: usize = 10;

/// Converts a raw detector clock value to database precision.
/// Extra sub-second digits are dropped, never rounded.
pub fn decode_timestamp(raw: u64) -> Result<IovTimeStamp, IovDataError> {
    let digits = raw.to_string();
    if digits.len() != RAW_TIMESTAMP_DIGITS {
        return Err(IovDataError::InvalidTimestampFormat(raw));
    }

    let (secs, frac) = digits[..SECONDS_DIGITS + MAX_SUBSTAMP_LENGTH].split_at(SECONDS_DIGITS);
    format!("{secs}.{frac}").parse()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_truncates() {
        let ts = decode_timestamp(1620000000123456789).unwrap();
        assert_eq!(ts.stamp(), 1620000000);
        assert_eq!(ts.substamp(), 123456);

        // .9999999 would round up, must not
        let ts = decode_timestamp(1620000000999999999).unwrap();
        assert_eq!(ts.stamp(), 1620000000);
        assert_eq!(ts.substamp(), 999999);
    }

    #[test]
    fn test_decode_bad_width() {
        for raw in [0, 1620000000, 162000000012345678, 12345678901234567890, u64::MAX] {
            assert_eq!(
                decode_timestamp(raw),
                Err(IovDataError::InvalidTimestampFormat(raw))
            );
        }
    }

    #[test]
    fn test_max_beats_decoded() {
        for raw in [1000000000000000000, 1620000000123456789, 9999999999999999999] {
            assert!(IovTimeStamp::MAX > decode_timestamp(raw).unwrap());
        }
    }
}
