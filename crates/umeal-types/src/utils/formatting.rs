//! String formatting utilities for display and logs.

use rust_decimal::{Decimal, RoundingStrategy};

/// Truncates a long identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Formats an order identifier as a short customer-facing number.
///
/// Non-digit characters are dropped, the remaining digits are left-padded to
/// four places and prefixed with `#` and the upper-cased prefix, so
/// `("17", "or")` becomes `#OR0017`.
pub fn format_order_number(order_id: &str, prefix: &str) -> String {
	format!("#{}{:0>4}", prefix.to_uppercase(), digits_only(order_id))
}

/// Keeps only the ASCII digits of `input`, as used for CEP and CNPJ values.
pub fn digits_only(input: &str) -> String {
	input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Formats an amount as Brazilian reais, e.g. `R$ 1.234,50`.
pub fn format_price(amount: Decimal) -> String {
	let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
	let negative = rounded.is_sign_negative() && !rounded.is_zero();
	let text = format!("{:.2}", rounded.abs());
	let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

	let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
	for (i, c) in int_part.chars().enumerate() {
		if i > 0 && (int_part.len() - i) % 3 == 0 {
			grouped.push('.');
		}
		grouped.push(c);
	}

	format!(
		"{}R$ {},{}",
		if negative { "-" } else { "" },
		grouped,
		frac_part
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("abc"), "abc");
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("123456789"), "12345678..");
	}

	#[test]
	fn test_format_order_number() {
		assert_eq!(format_order_number("17", "OR"), "#OR0017");
		assert_eq!(format_order_number("ord-123456", "or"), "#OR123456");
		assert_eq!(format_order_number("", "OR"), "#OR0000");
	}

	#[test]
	fn test_format_price() {
		assert_eq!(format_price(Decimal::new(2000, 2)), "R$ 20,00");
		assert_eq!(format_price(Decimal::new(123450, 2)), "R$ 1.234,50");
		assert_eq!(format_price(Decimal::new(5, 1)), "R$ 0,50");
		assert_eq!(format_price(Decimal::new(100000000, 0)), "R$ 100.000.000,00");
		assert_eq!(format_price(Decimal::new(-150, 2)), "-R$ 1,50");
	}
}
