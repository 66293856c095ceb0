//! Presentation formatting (Brazilian locale). Values are stored unrounded;
//! rounding happens only here.

use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto",
    "setembro", "outubro", "novembro", "dezembro",
];

/// Group the integer part with `.` and use `,` for decimals: `1.234,56`.
pub fn decimal(value: f64, places: usize) -> String {
    let formatted = format!("{:.*}", places, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped},{f}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn number(value: f64) -> String {
    decimal(value, 0)
}

pub fn money(value: f64) -> String {
    format!("R$ {}", decimal(value, 2))
}

pub fn percent(value: f64) -> String {
    format!("{}%", decimal(value, 2))
}

/// `dd/mm/yyyy`
pub fn date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `2025-03` → `março de 2025`; anything unparseable is returned unchanged.
pub fn month(label: &str) -> String {
    NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d")
        .map(|d| format!("{} de {}", MONTHS[d.month0() as usize], d.year()))
        .unwrap_or_else(|_| label.to_owned())
}
