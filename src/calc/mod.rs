//! Phrase classifier: turns an utterance into an arithmetic answer and a
//! short derivation trace.
//!
//! Matching is plain substring dispatch over the lowercased text, first
//! match wins. The numbers are always the unsigned numerals found in the
//! text, reduced with an explicit fold. Nothing here ever evaluates the
//! input as code.

pub mod number;

use log::{ debug, warn };
use thiserror::Error;

use number::{ extract_numbers, format_number };

pub const INVALID_PROBLEM: &str = "Please enter a valid math problem.";
pub const UNKNOWN_MATH: &str = "I understood the text, but not the math type yet.";
pub const REPHRASE_HINT: &str = "Try rephrasing the question.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong.";

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("'{0}' needs at least {1} number(s)")]
    MissingOperand(&'static str, usize),
    #[error("could not read number '{0}'")]
    InvalidNumber(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Percentage,
    Square,
    SquareRoot,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Keyword dispatch in priority order.
    pub fn detect(text: &str) -> Option<Self> {
        if text.contains("percent") {
            Some(Operation::Percentage)
        } else if text.contains("square of") {
            Some(Operation::Square)
        } else if text.contains("square root") {
            Some(Operation::SquareRoot)
        } else if text.contains("add") || text.contains('+') {
            Some(Operation::Add)
        } else if text.contains("subtract") || text.contains('-') {
            Some(Operation::Subtract)
        } else if text.contains("multiply") || text.contains('*') {
            Some(Operation::Multiply)
        } else if text.contains("divide") || text.contains('/') {
            Some(Operation::Divide)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operation::Percentage => "percent",
            Operation::Square => "square",
            Operation::SquareRoot => "square root",
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    fn join_symbol(self) -> Option<&'static str> {
        match self {
            Operation::Add => Some(" + "),
            Operation::Subtract => Some(" - "),
            Operation::Multiply => Some(" × "),
            Operation::Divide => Some(" ÷ "),
            _ => None,
        }
    }

    fn apply(self, acc: f64, next: f64) -> f64 {
        match self {
            Operation::Subtract => acc - next,
            Operation::Multiply => acc * next,
            Operation::Divide => acc / next,
            _ => acc + next,
        }
    }

    /// Computes the result and its step trace over already extracted numbers.
    pub fn evaluate(self, numbers: &[f64]) -> Result<(f64, String), EvalError> {
        let (&first, rest) = numbers
            .split_first()
            .ok_or(EvalError::MissingOperand(self.name(), 1))?;

        match self {
            Operation::Percentage => {
                // a missing second operand yields NaN rather than an error
                let b = rest.first().copied();
                let a = format_number(first);
                let steps = format!(
                    "Step 1: {a}% = {a}/100\nStep 2: ({a}/100) × {}",
                    b.map(format_number).unwrap_or_else(|| "undefined".to_string())
                );
                Ok(((first / 100.0) * b.unwrap_or(f64::NAN), steps))
            }
            Operation::Square => {
                let n = format_number(first);
                Ok((first * first, format!("{} × {}", n, n)))
            }
            Operation::SquareRoot => {
                Ok((first.sqrt(), format!("Square root of {}", format_number(first))))
            }
            _ => {
                let result = rest.iter().fold(first, |acc, &n| self.apply(acc, n));
                let steps = numbers
                    .iter()
                    .map(|&n| format_number(n))
                    .collect::<Vec<_>>()
                    .join(self.join_symbol().unwrap_or(" "));
                Ok((result, steps))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub answer: String,
    pub steps: Option<String>,
}

impl Classification {
    fn new(answer: impl Into<String>, steps: Option<String>) -> Self {
        Self { answer: answer.into(), steps }
    }
}

/// Classifies an utterance. Never fails: every outcome is a chat reply.
pub fn classify(input: &str) -> Classification {
    match try_classify(input) {
        Ok(result) => result,
        Err(e) => {
            warn!("Classifier failed on input of {} chars: {}", input.chars().count(), e);
            Classification::new(SOMETHING_WENT_WRONG, None)
        }
    }
}

fn try_classify(input: &str) -> Result<Classification, EvalError> {
    let text = input.trim().to_lowercase();
    let numbers = extract_numbers(&text)?;

    if numbers.is_empty() {
        return Ok(Classification::new(INVALID_PROBLEM, None));
    }

    let Some(operation) = Operation::detect(&text) else {
        debug!("No operation keyword in '{}'", text);
        return Ok(Classification::new(UNKNOWN_MATH, Some(REPHRASE_HINT.to_string())));
    };

    let (result, steps) = operation.evaluate(&numbers)?;
    debug!("Classified as {:?} over {:?} -> {}", operation, numbers, result);
    Ok(Classification::new(format!("Answer: {}", format_number(result)), Some(steps)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(input: &str) -> String {
        classify(input).answer
    }

    #[test]
    fn input_without_digits_asks_for_a_problem() {
        for input in ["", "   ", "hello there", "add these please", "square root of nine"] {
            let result = classify(input);
            assert_eq!(result.answer, INVALID_PROBLEM, "input: {input:?}");
            assert_eq!(result.steps, None);
        }
    }

    #[test]
    fn percentage() {
        let result = classify("12 percent of 50");
        assert_eq!(result.answer, "Answer: 6");
        assert_eq!(
            result.steps.as_deref(),
            Some("Step 1: 12% = 12/100\nStep 2: (12/100) × 50")
        );
    }

    #[test]
    fn percentage_with_one_number_is_not_a_number() {
        let result = classify("50 percent");
        assert_eq!(result.answer, "Answer: NaN");
        assert_eq!(
            result.steps.as_deref(),
            Some("Step 1: 50% = 50/100\nStep 2: (50/100) × undefined")
        );
    }

    #[test]
    fn non_ascii_digits_are_ignored() {
        assert_eq!(classify("٣ add ٤").answer, INVALID_PROBLEM);
        assert_eq!(classify("５ add ３").answer, INVALID_PROBLEM);
        let mixed = classify("5 add ٣");
        assert_eq!(mixed.answer, "Answer: 5");
        assert_eq!(mixed.steps.as_deref(), Some("5"));
    }

    #[test]
    fn square_and_square_root() {
        assert_eq!(answer("square of 9"), "Answer: 81");
        assert_eq!(classify("Square of 9").steps.as_deref(), Some("9 × 9"));
        assert_eq!(answer("square root of 16"), "Answer: 4");
        assert_eq!(classify("square root of 16").steps.as_deref(), Some("Square root of 16"));
    }

    #[test]
    fn square_root_of_negative_text_uses_magnitude() {
        // the minus sign is never captured, so this is sqrt(9)
        assert_eq!(answer("square root of -9"), "Answer: 3");
    }

    #[test]
    fn addition_reduces_left_to_right() {
        let result = classify("5 add 3 add 2");
        assert_eq!(result.answer, "Answer: 10");
        assert_eq!(result.steps.as_deref(), Some("5 + 3 + 2"));
        assert_eq!(answer("1.5 + 2.25"), "Answer: 3.75");
    }

    #[test]
    fn subtraction_multiplication_division() {
        assert_eq!(answer("subtract 3 from 10"), "Answer: -7");
        assert_eq!(classify("10 - 3 - 2").steps.as_deref(), Some("10 - 3 - 2"));
        assert_eq!(answer("10 - 3 - 2"), "Answer: 5");
        assert_eq!(answer("multiply 4 by 2.5"), "Answer: 10");
        assert_eq!(classify("2 * 3 * 4").steps.as_deref(), Some("2 × 3 × 4"));
        assert_eq!(answer("100 / 8"), "Answer: 12.5");
        assert_eq!(classify("100 / 8").steps.as_deref(), Some("100 ÷ 8"));
    }

    #[test]
    fn divide_by_zero_is_non_finite_not_an_error() {
        let result = classify("10 divide 0");
        assert_eq!(result.answer, "Answer: Infinity");
        assert_eq!(result.steps.as_deref(), Some("10 ÷ 0"));
        assert_eq!(answer("0 divide 0"), "Answer: NaN");
    }

    #[test]
    fn dispatch_order_prefers_earlier_rules() {
        // "percent" beats "+"
        assert_eq!(answer("10 percent + 200"), "Answer: 20");
        // "add" beats "-"
        assert_eq!(answer("add 5 - 3"), "Answer: 8");
    }

    #[test]
    fn numbers_without_operation_fall_back() {
        let result = classify("what about 42");
        assert_eq!(result.answer, UNKNOWN_MATH);
        assert_eq!(result.steps.as_deref(), Some(REPHRASE_HINT));
    }

    #[test]
    fn single_number_reduces_to_itself() {
        assert_eq!(answer("add 7"), "Answer: 7");
        assert_eq!(classify("add 7").steps.as_deref(), Some("7"));
    }

    #[test]
    fn evaluate_without_numbers_reports_missing_operand() {
        assert_eq!(
            Operation::Add.evaluate(&[]),
            Err(EvalError::MissingOperand("add", 1))
        );
    }
}
