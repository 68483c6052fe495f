use super::state::{AttemptMetric, Operation};

/// Parses learner input. Anything that is not a plain (optionally signed) decimal
/// integer is rejected, so it never reaches `evaluate`.
pub fn parse_answer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

pub fn evaluate(operation: Operation, answer: i64, elapsed_ms: u64) -> AttemptMetric {
    AttemptMetric {
        row: operation.row,
        col: operation.col,
        is_correct: answer == operation.answer(),
        response_time_ms: elapsed_ms,
        is_timeout: false,
    }
}

/// Forced-wrong outcome for an operation whose countdown ran out.
pub fn timed_out(operation: Operation, limit_ms: u64) -> AttemptMetric {
    AttemptMetric {
        row: operation.row,
        col: operation.col,
        is_correct: false,
        response_time_ms: limit_ms,
        is_timeout: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers_only() {
        assert_eq!(parse_answer(" 42 "), Some(42));
        assert_eq!(parse_answer("-3"), Some(-3));
        assert_eq!(parse_answer("+7"), Some(7));
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("   "), None);
        assert_eq!(parse_answer("12abc"), None);
        assert_eq!(parse_answer("4.5"), None);
        assert_eq!(parse_answer("-"), None);
        assert_eq!(parse_answer("99999999999999999999999"), None);
    }

    #[test]
    fn correctness_is_exact_product() {
        let op = Operation::new(7, 8);
        assert!(evaluate(op, 56, 900).is_correct);
        assert!(!evaluate(op, 54, 900).is_correct);
        assert_eq!(evaluate(op, 56, 900).response_time_ms, 900);
    }

    #[test]
    fn timeout_metric_shape() {
        let metric = timed_out(Operation::new(3, 9), 30_000);
        assert!(!metric.is_correct);
        assert!(metric.is_timeout);
        assert_eq!(metric.response_time_ms, 30_000);
    }
}
