//! Dashboard and progress statistics over a user's workout history.
//!
//! All dates are UTC calendar dates.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use crate::types::{WorkoutPlan, WorkoutSession};

pub const RECENT_WINDOW_DAYS: i64 = 30;
pub const RECENT_SESSIONS_LIMIT: usize = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_plans: usize,
    pub total_workouts: usize,
    pub this_month: usize,
    pub streak: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VolumePoint {
    pub date: String,
    pub volume: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Progress {
    pub monthly: BTreeMap<String, u32>,
    pub exercises: BTreeMap<String, Vec<VolumePoint>>,
}

/// Counts the current workout streak.
///
/// Completed sessions are walked newest first. Each one must end no more than
/// one day before the previous one (the first is compared against `today`);
/// the first gap ends the streak. Several sessions on the same day each count.
pub fn calculate_streak(sessions: &[WorkoutSession], today: NaiveDate) -> u32 {
    let mut ends: Vec<DateTime<Utc>> = sessions.iter().filter_map(|s| s.end_time).collect();
    ends.sort_unstable_by(|a, b| b.cmp(a));

    let mut streak = 0;
    let mut cursor = today;
    for end in ends {
        let day = end.date_naive();
        if (cursor - day).num_days() > 1 {
            break;
        }
        streak += 1;
        cursor = day;
    }
    streak
}

fn is_recent(session: &WorkoutSession, now: DateTime<Utc>) -> bool {
    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    session.end_time.is_some_and(|end| end > cutoff)
}

/// Completed sessions that ended within the recent window, in input order.
pub fn recent_sessions(
    sessions: &[WorkoutSession],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<&WorkoutSession> {
    sessions
        .iter()
        .filter(|s| is_recent(s, now))
        .take(limit)
        .collect()
}

pub fn dashboard_stats(
    plans: &[WorkoutPlan],
    sessions: &[WorkoutSession],
    now: DateTime<Utc>,
) -> DashboardStats {
    DashboardStats {
        total_plans: plans.len(),
        total_workouts: sessions.iter().filter(|s| s.is_completed()).count(),
        this_month: sessions.iter().filter(|s| is_recent(s, now)).count(),
        streak: calculate_streak(sessions, now.date_naive()),
    }
}

/// Buckets completed sessions by month and collects per-exercise volume.
pub fn progress(sessions: &[WorkoutSession]) -> Progress {
    let mut out = Progress::default();
    for session in sessions {
        let Some(end) = session.end_time else {
            continue;
        };
        *out.monthly
            .entry(end.format("%Y-%m").to_string())
            .or_insert(0) += 1;

        let date = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        for exercise in &session.exercises_completed {
            out.exercises
                .entry(exercise.exercise_key.clone())
                .or_default()
                .push(VolumePoint {
                    date: date.clone(),
                    volume: exercise.volume(),
                });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletedExercise, FitnessLevel, SetRecord};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn finished(end: DateTime<Utc>) -> WorkoutSession {
        let mut s = WorkoutSession::start("p1", "u1", end - Duration::hours(1));
        s.complete("", end);
        s
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn streak_is_zero_without_completed_sessions() {
        let open = WorkoutSession::start("p1", "u1", at(2024, 3, 10, 9));
        assert_eq!(calculate_streak(&[], day(2024, 3, 10)), 0);
        assert_eq!(calculate_streak(&[open], day(2024, 3, 10)), 0);
    }

    #[test]
    fn streak_counts_consecutive_days_from_today() {
        let sessions = vec![
            finished(at(2024, 3, 8, 18)),
            finished(at(2024, 3, 10, 7)),
            finished(at(2024, 3, 9, 7)),
        ];
        assert_eq!(calculate_streak(&sessions, day(2024, 3, 10)), 3);
    }

    #[test]
    fn streak_may_start_yesterday() {
        let sessions = vec![finished(at(2024, 3, 9, 7)), finished(at(2024, 3, 8, 7))];
        assert_eq!(calculate_streak(&sessions, day(2024, 3, 10)), 2);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let sessions = vec![
            finished(at(2024, 3, 10, 7)),
            finished(at(2024, 3, 9, 7)),
            finished(at(2024, 3, 6, 7)),
            finished(at(2024, 3, 5, 7)),
        ];
        assert_eq!(calculate_streak(&sessions, day(2024, 3, 10)), 2);
        assert_eq!(calculate_streak(&sessions, day(2024, 3, 12)), 0);
    }

    #[test]
    fn streak_counts_each_session_on_the_same_day() {
        let sessions = vec![finished(at(2024, 3, 10, 7)), finished(at(2024, 3, 10, 19))];
        assert_eq!(calculate_streak(&sessions, day(2024, 3, 10)), 2);
    }

    #[test]
    fn dashboard_counts_recent_and_total() {
        let now = at(2024, 3, 31, 12);
        let plan = WorkoutPlan::new("Full body", "u1", vec![], FitnessLevel::Beginner).unwrap();
        let sessions = vec![
            WorkoutSession::start("p1", "u1", at(2024, 3, 31, 11)),
            finished(at(2024, 3, 31, 10)),
            finished(at(2024, 3, 20, 10)),
            finished(at(2024, 1, 5, 10)),
        ];
        let stats = dashboard_stats(&[plan], &sessions, now);
        assert_eq!(
            stats,
            DashboardStats {
                total_plans: 1,
                total_workouts: 3,
                this_month: 2,
                streak: 1,
            }
        );
    }

    #[test]
    fn recent_sessions_respects_limit_and_order() {
        let now = at(2024, 3, 31, 12);
        let sessions: Vec<_> = (0..7)
            .map(|i| finished(at(2024, 3, 30 - i, 10)))
            .collect();
        let recent = recent_sessions(&sessions, now, RECENT_SESSIONS_LIMIT);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].end_time, Some(at(2024, 3, 30, 10)));
        assert_eq!(recent[4].end_time, Some(at(2024, 3, 26, 10)));
    }

    #[test]
    fn progress_buckets_by_month_and_sums_volume() {
        let mut a = finished(at(2024, 2, 28, 10));
        a.record_exercise(CompletedExercise {
            exercise_key: "squats".into(),
            sets: vec![
                SetRecord {
                    reps: 10,
                    weight: 50.0,
                },
                SetRecord {
                    reps: 8,
                    weight: 60.0,
                },
            ],
        });
        let mut b = finished(at(2024, 3, 2, 10));
        b.record_exercise(CompletedExercise {
            exercise_key: "squats".into(),
            sets: vec![SetRecord {
                reps: 5,
                weight: 80.0,
            }],
        });
        let c = finished(at(2024, 3, 4, 10));
        let open = WorkoutSession::start("p1", "u1", at(2024, 3, 5, 10));

        let p = progress(&[b, a, c, open]);
        assert_eq!(p.monthly.get("2024-02"), Some(&1));
        assert_eq!(p.monthly.get("2024-03"), Some(&2));
        assert_eq!(p.monthly.len(), 2);

        let squats = &p.exercises["squats"];
        assert_eq!(squats.len(), 2);
        assert_eq!(squats[0].date, "2024-03-02T10:00:00Z");
        assert_eq!(squats[0].volume, 400.0);
        assert_eq!(squats[1].volume, 980.0);
    }
}
