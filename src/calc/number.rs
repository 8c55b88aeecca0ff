use lazy_static::lazy_static;
use regex::Regex;

use super::EvalError;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"[0-9]+(\.[0-9]+)?").expect("number pattern is valid");
}

/// Pulls every unsigned integer or decimal out of `text`, left to right.
/// Only ASCII digits count.
pub fn extract_numbers(text: &str) -> Result<Vec<f64>, EvalError> {
    NUMBER.find_iter(text)
        .map(|m| {
            m.as_str()
                .parse::<f64>()
                .map_err(|_| EvalError::InvalidNumber(m.as_str().to_string()))
        })
        .collect()
}

/// Renders a number the way a browser prints one: `6` not `6.0`,
/// `Infinity` not `inf`, exponent form outside `[1e-6, 1e21)`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{:e}", value);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
            _ => exp,
        };
    }

    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_integers_and_decimals_in_order() {
        let numbers = extract_numbers("add 12, 3.5 and 07").unwrap();
        assert_eq!(numbers, vec![12.0, 3.5, 7.0]);
    }

    #[test]
    fn minus_sign_is_not_part_of_a_number() {
        assert_eq!(extract_numbers("-4 - 2").unwrap(), vec![4.0, 2.0]);
    }

    #[test]
    fn trailing_dot_is_ignored() {
        assert_eq!(extract_numbers("5. add 1.").unwrap(), vec![5.0, 1.0]);
    }

    #[test]
    fn non_ascii_digits_are_not_numbers() {
        assert_eq!(extract_numbers("٣ add ٤").unwrap(), Vec::<f64>::new());
        assert_eq!(extract_numbers("５ add ３").unwrap(), Vec::<f64>::new());
        assert_eq!(extract_numbers("5 add ٣").unwrap(), vec![5.0]);
    }

    #[test]
    fn no_digits_means_no_numbers() {
        assert!(extract_numbers("what is love").unwrap().is_empty());
    }

    #[test]
    fn formats_like_a_browser() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e22), "1.5e+22");
        assert_eq!(format_number(1e-7), "1e-7");
    }
}
