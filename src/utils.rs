use regex::Regex;
use std::sync::OnceLock;

/// Divides and rounds half away from zero.
/// Returns `None` when the denominator is zero; saturates at the `i64` bounds.
pub fn div_round_half_away(numerator: i128, denominator: i128) -> Option<i64> {
    if denominator == 0 {
        return None;
    }

    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    let rounded = if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    };

    Some(saturate_i64(rounded))
}

/// `value * numerator / denominator`, rounded once at the end.
pub fn prorate(value: i64, numerator: i64, denominator: i64) -> Option<i64> {
    div_round_half_away(value as i128 * numerator as i128, denominator as i128)
}

pub fn saturate_i64(value: i128) -> i64 {
    if value > i64::MAX as i128 {
        i64::MAX
    } else if value < i64::MIN as i128 {
        i64::MIN
    } else {
        value as i64
    }
}

/// Rounds a canonical float to an integer amount (half away from zero).
pub fn round_f64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded > i64::MAX as f64 || rounded < i64::MIN as f64 {
        return None;
    }
    Some(rounded as i64)
}

/// Reads the number of units in one package from a product description,
/// e.g. "CC80 600CCX6." -> 6, "FN 500X12" -> 12.
pub fn package_size_from_description(description: &str) -> Option<u32> {
    static PACKAGE_SIZE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = PACKAGE_SIZE_RE
        .get_or_init(|| Regex::new(r"(?i)X(\d+)").ok())
        .as_ref()?;
    let caps = re.captures(description)?;
    let size: u32 = caps.get(1)?.as_str().parse().ok()?;
    if size == 0 {
        return None;
    }
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_round_half_away_positive() {
        assert_eq!(div_round_half_away(7, 2), Some(4));
        assert_eq!(div_round_half_away(5, 2), Some(3));
        assert_eq!(div_round_half_away(9, 4), Some(2));
        assert_eq!(div_round_half_away(10, 4), Some(3));
        assert_eq!(div_round_half_away(6, 3), Some(2));
    }

    #[test]
    fn test_div_round_half_away_negative() {
        assert_eq!(div_round_half_away(-5, 2), Some(-3));
        assert_eq!(div_round_half_away(5, -2), Some(-3));
        assert_eq!(div_round_half_away(-5, -2), Some(3));
        assert_eq!(div_round_half_away(-9, 4), Some(-2));
    }

    #[test]
    fn test_div_by_zero_is_none() {
        assert_eq!(div_round_half_away(10, 0), None);
        assert_eq!(prorate(100, 5, 0), None);
    }

    #[test]
    fn test_prorate_large_values_do_not_overflow() {
        // 9e15 * 9e15 overflows i64 but not i128
        let v = 9_000_000_000_000_000;
        assert_eq!(prorate(v, v, v), Some(v));
    }

    #[test]
    fn test_landed_unit_cost_rounding() {
        assert_eq!(div_round_half_away(7_380_199, 2016), Some(3661));
    }

    #[test]
    fn test_round_f64() {
        assert_eq!(round_f64(2.5), Some(3));
        assert_eq!(round_f64(-2.5), Some(-3));
        assert_eq!(round_f64(7_092_636.97), Some(7_092_637));
        assert_eq!(round_f64(f64::NAN), None);
        assert_eq!(round_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_package_size_from_description() {
        assert_eq!(package_size_from_description("CC80 600CCX6."), Some(6));
        assert_eq!(package_size_from_description("FN 500x12"), Some(12));
        assert_eq!(package_size_from_description("Servicios Administrativos"), None);
        assert_eq!(package_size_from_description("PROMO X0"), None);
    }

    #[test]
    fn test_package_size_shared_across_threads() {
        let sizes: Vec<Option<u32>> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["CC80 600CCX6.", "FN 500X12", "SERVICIOS", "AGUA 2LX8"]
                .into_iter()
                .map(|d| scope.spawn(move || package_size_from_description(d)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(sizes, vec![Some(6), Some(12), None, Some(8)]);
    }
}
