//! Salary string rendering shared by the source adapters.

/// Render just the amount part of a salary range.
///
/// Both bounds present yields "from - to", a single bound yields
/// "from N" / "up to N", neither yields "not specified".
pub fn format_salary_amount(from: u64, to: u64) -> String {
    match (from, to) {
        (0, 0) => "not specified".to_string(),
        (f, 0) => format!("from {}", group_thousands(f)),
        (0, t) => format!("up to {}", group_thousands(t)),
        (f, t) => format!("{} - {}", group_thousands(f), group_thousands(t)),
    }
}

/// Amount plus the currency code, for display contexts that carry no
/// separate currency field.
pub fn format_salary(from: u64, to: u64, currency: &str) -> String {
    let amount = format_salary_amount(from, to);
    if currency.is_empty() || (from == 0 && to == 0) {
        amount
    } else {
        format!("{amount} {currency}")
    }
}

// Separates thousands with spaces: 150000 -> "150 000".
fn group_thousands(num: u64) -> String {
    if num >= 1000 {
        format!("{} {:03}", group_thousands(num / 1000), num % 1000)
    } else {
        num.to_string()
    }
}
