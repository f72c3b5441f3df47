use crate::error::BoxerError;

const MIB: u64 = 1024 * 1024;

/// Parse a human-readable size string into bytes.
///
/// Accepts formats like `"4G"`, `"512M"`, `"100K"`, `"1073741824"`.
/// Uses binary units (1G = 1024³ bytes).
pub fn parse_size(s: &str) -> Result<u64, BoxerError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(BoxerError::Validation {
            message: "size cannot be empty".into(),
        });
    }

    let (num_str, suffix) = match s.find(|c: char| c.is_ascii_alphabetic()) {
        Some(i) => (s[..i].trim(), s[i..].to_ascii_uppercase()),
        None => (s, String::new()),
    };

    let num: u64 = num_str.parse().map_err(|_| BoxerError::Validation {
        message: format!("invalid size number: '{num_str}'"),
    })?;

    let multiplier: u64 = match suffix.as_str() {
        "" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => MIB,
        "G" | "GB" => 1024 * MIB,
        "T" | "TB" => 1024 * 1024 * MIB,
        _ => {
            return Err(BoxerError::Validation {
                message: format!("unknown size suffix: '{suffix}' (use G, M, K, or T)"),
            });
        }
    };

    num.checked_mul(multiplier).ok_or_else(|| BoxerError::Validation {
        message: format!("size overflows: '{s}'"),
    })
}

/// Memory size in MB. A bare number is already MB (`4096`); a suffix is
/// converted (`4G` → 4096).
pub fn parse_memory_mb(s: &str) -> Result<u32, BoxerError> {
    let s = s.trim();
    let mb = if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() {
        s.parse::<u64>().map_err(|_| BoxerError::Validation {
            message: format!("invalid memory size: '{s}'"),
        })?
    } else {
        let bytes = parse_size(s)?;
        if bytes % MIB != 0 {
            return Err(BoxerError::Validation {
                message: format!("memory must be a whole number of MB (got '{s}')"),
            });
        }
        bytes / MIB
    };

    match u32::try_from(mb) {
        Ok(0) => Err(BoxerError::Validation {
            message: "memory must be greater than zero".into(),
        }),
        Ok(mb) => Ok(mb),
        Err(_) => Err(BoxerError::Validation {
            message: format!("memory size too large: '{s}'"),
        }),
    }
}

/// A strictly positive count such as the number of CPUs.
pub fn parse_count(s: &str) -> Result<u32, BoxerError> {
    match s.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(BoxerError::Validation {
            message: format!("expected a positive whole number (got '{}')", s.trim()),
        }),
        Ok(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_gibibytes() {
        assert_eq!(parse_size("20G").unwrap(), 20 * 1024 * MIB);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * MIB);
    }

    #[test]
    fn parse_size_rejects_bad_suffix() {
        assert!(parse_size("10X").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn memory_bare_number_is_mb() {
        assert_eq!(parse_memory_mb("4096").unwrap(), 4096);
        assert_eq!(parse_memory_mb(" 512 ").unwrap(), 512);
    }

    #[test]
    fn memory_with_suffix() {
        assert_eq!(parse_memory_mb("4G").unwrap(), 4096);
        assert_eq!(parse_memory_mb("2048M").unwrap(), 2048);
        assert_eq!(parse_memory_mb("1 GB").unwrap(), 1024);
    }

    #[test]
    fn memory_rejects_zero_fractions_and_garbage() {
        assert!(parse_memory_mb("0").is_err());
        assert!(parse_memory_mb("512K").is_err());
        assert!(parse_memory_mb("lots").is_err());
        assert!(parse_memory_mb("").is_err());
        assert!(parse_memory_mb("-1").is_err());
    }

    #[test]
    fn counts_must_be_positive() {
        assert_eq!(parse_count("2").unwrap(), 2);
        assert!(parse_count("0").is_err());
        assert!(parse_count("-3").is_err());
        assert!(parse_count("two").is_err());
    }
}
