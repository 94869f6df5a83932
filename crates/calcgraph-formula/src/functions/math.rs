//! Math functions: SUM, MAX, MIN, ABS, ROUND

use crate::error::{FormulaError, FormulaResult};
use calcgraph_core::CellValue;

/// SUM function
pub fn fn_sum(args: &[CellValue]) -> FormulaResult<CellValue> {
    let sum: f64 = args.iter().map(CellValue::to_number).sum();
    Ok(CellValue::Number(sum))
}

/// MIN function
pub fn fn_min(args: &[CellValue]) -> FormulaResult<CellValue> {
    reduce(args, f64::min)
}

/// MAX function
pub fn fn_max(args: &[CellValue]) -> FormulaResult<CellValue> {
    reduce(args, f64::max)
}

fn reduce(args: &[CellValue], op: fn(f64, f64) -> f64) -> FormulaResult<CellValue> {
    args.iter()
        .map(CellValue::to_number)
        .reduce(op)
        .map(CellValue::Number)
        .ok_or_else(|| FormulaError::Evaluation("Reduction over an empty argument list".into()))
}

/// ABS function
pub fn fn_abs(args: &[CellValue]) -> FormulaResult<CellValue> {
    let number = args.first().map_or(0.0, CellValue::to_number);
    Ok(CellValue::Number(number.abs()))
}

/// ROUND(number, [num_digits]) - Rounds a number to a specified number of digits
/// Uses "round half away from zero" mode (standard spreadsheet rounding)
pub fn fn_round(args: &[CellValue]) -> FormulaResult<CellValue> {
    let number = args.first().map_or(0.0, CellValue::to_number);
    let num_digits = args.get(1).map_or(0, |v| v.to_number() as i32);

    // For negative digits, we round to the left of the decimal point
    let multiplier = 10_f64.powi(num_digits);
    if !multiplier.is_finite() || multiplier == 0.0 {
        return Err(FormulaError::Evaluation(format!(
            "ROUND digits out of range: {}",
            num_digits
        )));
    }

    let result = if number >= 0.0 {
        (number * multiplier + 0.5).floor() / multiplier
    } else {
        (number * multiplier - 0.5).ceil() / multiplier
    };

    Ok(CellValue::Number(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<CellValue> {
        values.iter().copied().map(CellValue::Number).collect()
    }

    #[test]
    fn test_sum_coerces_booleans_and_empty() {
        let args = vec![
            CellValue::Number(2.0),
            CellValue::Boolean(true),
            CellValue::Empty,
        ];
        assert_eq!(fn_sum(&args).unwrap(), CellValue::Number(3.0));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(fn_max(&nums(&[3.0, -1.0, 7.5])).unwrap(), CellValue::Number(7.5));
        assert_eq!(fn_min(&nums(&[3.0, -1.0, 7.5])).unwrap(), CellValue::Number(-1.0));
        assert!(fn_max(&[]).is_err());
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(fn_round(&nums(&[2.5])).unwrap(), CellValue::Number(3.0));
        assert_eq!(fn_round(&nums(&[-2.5])).unwrap(), CellValue::Number(-3.0));
        assert_eq!(fn_round(&nums(&[3.14159, 2.0])).unwrap(), CellValue::Number(3.14));
        assert_eq!(fn_round(&nums(&[1234.0, -2.0])).unwrap(), CellValue::Number(1200.0));
    }

    #[test]
    fn test_abs() {
        assert_eq!(fn_abs(&nums(&[-4.25])).unwrap(), CellValue::Number(4.25));
        assert_eq!(fn_abs(&[CellValue::Empty]).unwrap(), CellValue::Number(0.0));
    }
}
