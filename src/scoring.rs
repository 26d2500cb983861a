use chrono::DateTime;
use chrono_tz::Tz;

use crate::config::ScoringPolicy;
use crate::models::{AssessmentKind, DerivedScore, Instant, NormalizedAssessmentRecord};

pub const RAW_SCORE_METRIC: &str = "Zybooks Points Grade";
pub const LATE_PENALTY_METRIC: &str = "Late Penalty Points Grade";
pub const ON_TIME_CREDIT_METRIC: &str = "On-Time Credit Grade";
pub const LAB_ON_TIME_POINTS_METRIC: &str = "On-Time Points Grade";
pub const LAB_ON_TIME_FRACTION_METRIC: &str = "On-Time Grade";

/// Homework submitted more than this many days late earns nothing.
const HOMEWORK_GRACE_DAYS: i64 = 3;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days between submission and due date, rounded toward negative
/// infinity, or `Absent` when nothing was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lateness {
    Absent,
    Days(i64),
}

pub fn days_late(submission: &Instant, due: &DateTime<Tz>) -> Lateness {
    match submission {
        Instant::At(submitted) => {
            let elapsed = (*submitted - *due).num_seconds();
            Lateness::Days(elapsed.div_euclid(SECONDS_PER_DAY))
        }
        Instant::Absent => Lateness::Absent,
    }
}

pub fn homework_late_penalty(lateness: Lateness) -> f64 {
    match lateness {
        Lateness::Days(days) if days <= HOMEWORK_GRACE_DAYS => (days * 10).clamp(0, 30) as f64,
        _ => 100.0,
    }
}

pub fn homework_on_time_credit(lateness: Lateness) -> f64 {
    match lateness {
        Lateness::Days(days) if days <= HOMEWORK_GRACE_DAYS => {
            // Tenths as integers so 2 days late is exactly 0.8.
            (10 - days.clamp(0, 3)) as f64 / 10.0
        }
        _ => 0.0,
    }
}

pub fn lab_on_time_score(lateness: Lateness, policy: ScoringPolicy) -> f64 {
    let full = match policy {
        ScoringPolicy::Points => 100.0,
        ScoringPolicy::Fraction => 1.0,
    };
    match lateness {
        Lateness::Days(days) if days <= 0 => full,
        _ => 0.0,
    }
}

/// The columns one record contributes for its assessment, in column order.
pub fn derive_scores(
    record: &NormalizedAssessmentRecord,
    kind: AssessmentKind,
    policy: ScoringPolicy,
) -> Vec<DerivedScore> {
    let lateness = days_late(&record.submission, &record.due);
    let [raw_metric, derived_metric] = metrics_for(kind, policy);

    let value = match (kind, policy) {
        (AssessmentKind::Homework, ScoringPolicy::Points) => homework_late_penalty(lateness),
        (AssessmentKind::Homework, ScoringPolicy::Fraction) => homework_on_time_credit(lateness),
        (AssessmentKind::Lab, _) => lab_on_time_score(lateness, policy),
    };

    vec![
        DerivedScore {
            metric: raw_metric,
            value: record.score,
        },
        DerivedScore {
            metric: derived_metric,
            value,
        },
    ]
}

/// Column metrics produced for a kind under a policy.
pub fn metrics_for(kind: AssessmentKind, policy: ScoringPolicy) -> [&'static str; 2] {
    let derived = match (kind, policy) {
        (AssessmentKind::Homework, ScoringPolicy::Points) => LATE_PENALTY_METRIC,
        (AssessmentKind::Homework, ScoringPolicy::Fraction) => ON_TIME_CREDIT_METRIC,
        (AssessmentKind::Lab, ScoringPolicy::Points) => LAB_ON_TIME_POINTS_METRIC,
        (AssessmentKind::Lab, ScoringPolicy::Fraction) => LAB_ON_TIME_FRACTION_METRIC,
    };
    [RAW_SCORE_METRIC, derived]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::America::Los_Angeles;

    fn due() -> DateTime<Tz> {
        Los_Angeles.with_ymd_and_hms(2024, 1, 11, 0, 59, 0).unwrap()
    }

    fn record(submission: Instant, score: f64) -> NormalizedAssessmentRecord {
        NormalizedAssessmentRecord {
            student_id: 42,
            score,
            submission,
            due: due(),
        }
    }

    #[test]
    fn lateness_is_absent_only_without_submission() {
        assert_eq!(days_late(&Instant::Absent, &due()), Lateness::Absent);
        assert_eq!(days_late(&Instant::At(due()), &due()), Lateness::Days(0));
    }

    #[test]
    fn lateness_rounds_down() {
        let early = Instant::At(due() - Duration::hours(1));
        assert_eq!(days_late(&early, &due()), Lateness::Days(-1));

        let late = Instant::At(due() + Duration::hours(47));
        assert_eq!(days_late(&late, &due()), Lateness::Days(1));

        let later = Instant::At(due() + Duration::hours(48));
        assert_eq!(days_late(&later, &due()), Lateness::Days(2));
    }

    #[test]
    fn homework_penalty_tiers() {
        assert_eq!(homework_late_penalty(Lateness::Absent), 100.0);
        assert_eq!(homework_late_penalty(Lateness::Days(-1)), 0.0);
        assert_eq!(homework_late_penalty(Lateness::Days(0)), 0.0);
        assert_eq!(homework_late_penalty(Lateness::Days(2)), 20.0);
        assert_eq!(homework_late_penalty(Lateness::Days(3)), 30.0);
        assert_eq!(homework_late_penalty(Lateness::Days(4)), 100.0);
        assert_eq!(homework_late_penalty(Lateness::Days(5)), 100.0);
        assert_eq!(homework_late_penalty(Lateness::Days(10)), 100.0);
    }

    #[test]
    fn homework_credit_tiers() {
        assert_eq!(homework_on_time_credit(Lateness::Absent), 0.0);
        assert_eq!(homework_on_time_credit(Lateness::Days(-3)), 1.0);
        assert_eq!(homework_on_time_credit(Lateness::Days(2)), 0.8);
        assert_eq!(homework_on_time_credit(Lateness::Days(3)), 0.7);
        assert_eq!(homework_on_time_credit(Lateness::Days(4)), 0.0);
    }

    #[test]
    fn lab_on_time_tiers() {
        let points = ScoringPolicy::Points;
        assert_eq!(lab_on_time_score(Lateness::Absent, points), 0.0);
        assert_eq!(lab_on_time_score(Lateness::Days(0), points), 100.0);
        assert_eq!(lab_on_time_score(Lateness::Days(1), points), 0.0);
        assert_eq!(lab_on_time_score(Lateness::Days(-2), points), 100.0);

        let fraction = ScoringPolicy::Fraction;
        assert_eq!(lab_on_time_score(Lateness::Absent, fraction), 0.0);
        assert_eq!(lab_on_time_score(Lateness::Days(0), fraction), 1.0);
        assert_eq!(lab_on_time_score(Lateness::Days(1), fraction), 0.0);
    }

    #[test]
    fn homework_points_columns() {
        let submitted = Instant::At(due() + Duration::hours(50));
        let scores = derive_scores(&record(submitted, 95.0), AssessmentKind::Homework, ScoringPolicy::Points);

        assert_eq!(
            scores,
            vec![
                DerivedScore { metric: RAW_SCORE_METRIC, value: 95.0 },
                DerivedScore { metric: LATE_PENALTY_METRIC, value: 20.0 },
            ]
        );
    }

    #[test]
    fn lab_fraction_columns_for_missing_submission() {
        let scores = derive_scores(&record(Instant::Absent, 0.0), AssessmentKind::Lab, ScoringPolicy::Fraction);
        assert_eq!(scores[1], DerivedScore { metric: LAB_ON_TIME_FRACTION_METRIC, value: 0.0 });
    }

    #[test]
    fn metric_names_match_derived_scores() {
        for kind in [AssessmentKind::Homework, AssessmentKind::Lab] {
            for policy in [ScoringPolicy::Points, ScoringPolicy::Fraction] {
                let metrics: Vec<&str> = derive_scores(&record(Instant::Absent, 10.0), kind, policy)
                    .iter()
                    .map(|score| score.metric)
                    .collect();
                assert_eq!(metrics, metrics_for(kind, policy).to_vec());
            }
        }
    }
}
