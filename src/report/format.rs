/// Formats `value` as dollars with thousands separators and two decimals, e.g. `-$1,234.50`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let negative = value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9'));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${grouped}.{cents}", if negative { "-" } else { "" })
}

pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{value:.2}");
    if fixed.starts_with('-') && !fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        return format!("{}%", &fixed[1..]);
    }
    format!("{fixed}%")
}

/// `YES(x3)` style label for a DRIP eligibility flag and its share multiple.
pub fn drip_label(eligible: bool, multiple: i64) -> String {
    let mut label = if eligible { "YES" } else { "NO" }.to_string();
    if multiple > 0 {
        label.push_str(&format!("(x{multiple})"));
    }
    label
}
