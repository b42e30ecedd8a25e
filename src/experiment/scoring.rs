//! Recall scoring.

use serde::Serialize;

/// Placeholder for a position that produced no digit.
pub const MISSING: char = '?';

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialScore {
    /// Positionwise matches / list length.
    pub ordered_rate: f64,
    /// List digits that appear anywhere in the response / list length.
    pub digit_rate: f64,
    /// The response is a prefix of the list.
    pub exact_prefix: bool,
}

pub fn score(stimulus: &str, response: &str) -> TrialScore {
    let n = stimulus.chars().count();
    if n == 0 {
        return TrialScore {
            ordered_rate: 0.0,
            digit_rate: 0.0,
            exact_prefix: response.is_empty(),
        };
    }
    let ordered = stimulus
        .chars()
        .zip(response.chars())
        .filter(|(a, b)| a == b)
        .count();
    let digits = stimulus.chars().filter(|c| response.contains(*c)).count();
    TrialScore {
        ordered_rate: ordered as f64 / n as f64,
        digit_rate: digits as f64 / n as f64,
        exact_prefix: stimulus.starts_with(response),
    }
}

/// Mean rates over a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub trials: usize,
    pub mean_ordered_rate: f64,
    pub mean_digit_rate: f64,
    pub exact_prefix_rate: f64,
}

impl Summary {
    pub fn from_scores<'a, I>(scores: I) -> Self
    where
        I: IntoIterator<Item = &'a TrialScore>,
    {
        let mut s = Summary::default();
        for score in scores {
            s.trials += 1;
            s.mean_ordered_rate += score.ordered_rate;
            s.mean_digit_rate += score.digit_rate;
            if score.exact_prefix {
                s.exact_prefix_rate += 1.0;
            }
        }
        if s.trials > 0 {
            let n = s.trials as f64;
            s.mean_ordered_rate /= n;
            s.mean_digit_rate /= n;
            s.exact_prefix_rate /= n;
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_recall() {
        let s = score("123456", "123456");
        assert_eq!(s.ordered_rate, 1.0);
        assert_eq!(s.digit_rate, 1.0);
        assert!(s.exact_prefix);
    }

    #[test]
    fn test_partial_recall() {
        let s = score("1234", "12");
        assert_eq!(s.ordered_rate, 0.5);
        assert_eq!(s.digit_rate, 0.5);
        assert!(s.exact_prefix);
    }

    #[test]
    fn test_transposition() {
        let s = score("1234", "2134");
        assert_eq!(s.ordered_rate, 0.5);
        assert_eq!(s.digit_rate, 1.0);
        assert!(!s.exact_prefix);
    }

    #[test]
    fn test_missing_positions() {
        let s = score("2223", "22?3");
        assert_eq!(s.ordered_rate, 0.75);
        assert_eq!(s.digit_rate, 1.0);
        assert!(!s.exact_prefix);
    }

    #[test]
    fn test_summary_means() {
        let scores = [score("12", "12"), score("12", "")];
        let summary = Summary::from_scores(&scores);
        assert_eq!(summary.trials, 2);
        assert_eq!(summary.mean_ordered_rate, 0.5);
        assert_eq!(summary.exact_prefix_rate, 1.0);
        assert_eq!(Summary::from_scores(&Vec::<TrialScore>::new()), Summary::default());
    }
}
