//! Human-readable byte sizes for user-facing messages.

/// Formats a byte count with binary units and one decimal place.
///
/// Values below 1024 are printed as plain bytes (`"500 B"`); larger values
/// use the largest unit that keeps the mantissa at or above one
/// (`"56.0 KB"`, `"1.5 MB"`).
///
/// # Examples
///
/// ```
/// use sluice_core::units::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(56 * 1024), "56.0 KB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [char; 7] = [' ', 'K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let exponent = (63 - bytes.leading_zeros()) / 10;
    let divisor = 1_u64 << (exponent * 10);
    let unit = UNITS[exponent as usize];
    format!("{:.1} {unit}B", bytes as f64 / divisor as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(50), "50 B");
        assert_eq!(format_size(462), "462 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(56 * 1024), "56.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_size(1024_u64.pow(4)), "1.0 TB");
    }

    #[test]
    fn test_format_size_max() {
        assert_eq!(format_size(u64::MAX), "16.0 EB");
    }
}
