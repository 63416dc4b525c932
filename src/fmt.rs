/// Insert thousands separators into the integer part of an already-formatted number.
fn group_thousands(formatted: &str) -> String {
    let (int_part, rest) = match formatted.find('.') {
        Some(i) => formatted.split_at(i),
        None => (formatted, ""),
    };
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    format!("{with_commas}{rest}")
}

/// Format with `decimals` places and thousands separators. Non-finite values
/// print as `NaN` / `inf` / `-inf`.
pub fn grouped(val: f64, decimals: usize) -> String {
    if !val.is_finite() {
        return format!("{val}");
    }
    let body = group_thousands(&format!("{:.*}", decimals, val.abs()));
    if val < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{body}")
    } else {
        body
    }
}

/// Dollar amount with cents: $1,234.56
pub fn money(val: f64) -> String {
    currency(val, 2)
}

/// Dollar amount rounded to whole dollars: $1,235
pub fn money_whole(val: f64) -> String {
    currency(val, 0)
}

fn currency(val: f64, decimals: usize) -> String {
    if !val.is_finite() {
        return format!("${val}");
    }
    let body = grouped(val.abs(), decimals);
    if val < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

/// Whole count with thousands separators: 1,234,567
pub fn number(val: f64) -> String {
    grouped(val, 0)
}

/// Ratio with a fixed number of places, no grouping.
pub fn ratio(val: f64, decimals: usize) -> String {
    if !val.is_finite() {
        return format!("{val}");
    }
    format!("{:.*}", decimals, val)
}

/// Compact axis label: 950, 1.2k, 3M.
pub fn compact(val: f64) -> String {
    if !val.is_finite() {
        return format!("{val}");
    }
    let abs = val.abs();
    let sign = if val < 0.0 { "-" } else { "" };
    let (scaled, suffix) = if abs >= 1_000_000.0 {
        (abs / 1_000_000.0, "M")
    } else if abs >= 1000.0 {
        (abs / 1000.0, "k")
    } else {
        return ratio(val, if abs >= 10.0 || abs == abs.floor() { 0 } else { 2 });
    };
    if scaled == scaled.floor() {
        format!("{sign}{}{suffix}", scaled as u64)
    } else {
        format!("{sign}{scaled:.1}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(42.10), "$42.10");
    }

    #[test]
    fn test_money_whole_rounds() {
        assert_eq!(money_whole(16174.4), "$16,174");
        assert_eq!(money_whole(999.6), "$1,000");
    }

    #[test]
    fn test_non_finite_values_print_as_is() {
        assert_eq!(money(f64::INFINITY), "$inf");
        assert_eq!(money(f64::NAN), "$NaN");
        assert_eq!(number(f64::NAN), "NaN");
        assert_eq!(ratio(f64::NEG_INFINITY, 2), "-inf");
    }

    #[test]
    fn test_number_and_compact() {
        assert_eq!(number(1234567.0), "1,234,567");
        assert_eq!(number(12.0), "12");
        assert_eq!(compact(1500.0), "1.5k");
        assert_eq!(compact(2_000_000.0), "2M");
        assert_eq!(compact(0.25), "0.25");
        assert_eq!(compact(42.0), "42");
    }
}
