// src/handlers/report.rs
//
// Aggregate views over completed attempts: per-exam analytics for faculty
// and progress statistics for students.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::PASS_MARK_PERCENTAGE,
    error::AppError,
    models::attempt::{ExamAnalytics, QuestionStat, StudentProgress},
    utils::jwt::{Claims, ROLE_STUDENT},
};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Upper median of an already-sorted score list.
fn median(sorted_scores: &[i64]) -> Option<i64> {
    if sorted_scores.is_empty() {
        return None;
    }
    Some(sorted_scores[sorted_scores.len() / 2])
}

/// Share of scores at or above `PASS_MARK_PERCENTAGE` of the total marks.
fn pass_percentage(scores: &[i64], total_marks: i64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let pass_mark = total_marks as f64 * PASS_MARK_PERCENTAGE / 100.0;
    let passed = scores.iter().filter(|&&s| s as f64 >= pass_mark).count();
    Some(round2(passed as f64 / scores.len() as f64 * 100.0))
}

/// 1-based rank of `student_id` among `(student_id, obtained, possible)`
/// rows, ordered by obtained/possible percentage descending. None when the
/// student has no row.
fn rank_of(rows: &[(i64, i64, i64)], student_id: i64) -> Option<i64> {
    let mut ranked: Vec<(i64, f64)> = rows
        .iter()
        .map(|&(id, obtained, possible)| {
            let pct = if possible > 0 {
                obtained as f64 / possible as f64 * 100.0
            } else {
                0.0
            };
            (id, pct)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .iter()
        .position(|&(id, _)| id == student_id)
        .map(|pos| pos as i64 + 1)
}

#[derive(sqlx::FromRow)]
struct QuestionStatRow {
    id: i64,
    text: String,
    correct_answers: i64,
}

/// Detailed statistics for one of the caller's exams. Faculty only.
pub async fn exam_analytics(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = sqlx::query_as::<_, (String, i64)>(
        "SELECT name, paper_id FROM exams WHERE id = ?1 AND faculty_id = ?2",
    )
    .bind(exam_id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Exam not found or access denied".to_string(),
    ))?;
    let (exam_name, paper_id) = exam;

    let total_marks: i64 =
        sqlx::query_scalar("SELECT total_marks FROM question_papers WHERE id = ?1")
            .bind(paper_id)
            .fetch_one(&pool)
            .await?;

    let scores: Vec<i64> = sqlx::query_scalar(
        "SELECT score FROM attempts WHERE exam_id = ?1 AND completed = 1 ORDER BY score",
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    let total_students: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?1")
            .bind(ROLE_STUDENT)
            .fetch_one(&pool)
            .await?;

    let attempted = scores.len() as i64;
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(round2(scores.iter().sum::<i64>() as f64 / attempted as f64))
    };

    let stat_rows = sqlx::query_as::<_, QuestionStatRow>(
        r#"
        SELECT q.id, q.text,
               COALESCE(SUM(CASE WHEN aa.correct THEN 1 ELSE 0 END), 0) AS correct_answers
        FROM questions q
        JOIN paper_questions pq ON pq.question_id = q.id
        LEFT JOIN attempt_answers aa ON aa.question_id = q.id
            AND aa.attempt_id IN (SELECT id FROM attempts WHERE exam_id = ?1 AND completed = 1)
        WHERE pq.paper_id = ?2
        GROUP BY q.id
        ORDER BY q.id
        "#,
    )
    .bind(exam_id)
    .bind(paper_id)
    .fetch_all(&pool)
    .await?;

    let question_statistics: Vec<QuestionStat> = stat_rows
        .into_iter()
        .map(|row| QuestionStat {
            question_id: row.id,
            text: row.text.chars().take(50).collect(),
            correct_answers: row.correct_answers,
            accuracy_percentage: if attempted > 0 {
                round2(row.correct_answers as f64 / attempted as f64 * 100.0)
            } else {
                0.0
            },
        })
        .collect();

    Ok(Json(ExamAnalytics {
        exam_name,
        total_students,
        attempted_students: attempted,
        average_score,
        median_score: median(&scores),
        highest_score: scores.last().copied(),
        lowest_score: scores.first().copied(),
        pass_percentage: pass_percentage(&scores, total_marks),
        question_statistics,
    }))
}

/// Progress statistics for the current student, including their rank among
/// all students by average percentage.
pub async fn student_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();

    let total_exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams")
        .fetch_one(&pool)
        .await?;

    let standings = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT a.student_id,
               COALESCE(SUM(a.score), 0) AS obtained,
               COALESCE(SUM(pm.marks), 0) AS possible
        FROM attempts a
        LEFT JOIN (
            SELECT pq.paper_id AS paper_id, SUM(q.max_marks) AS marks
            FROM paper_questions pq
            JOIN questions q ON q.id = pq.question_id
            GROUP BY pq.paper_id
        ) pm ON pm.paper_id = a.paper_id
        WHERE a.completed = 1
        GROUP BY a.student_id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let completed_exams: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attempts WHERE student_id = ?1 AND completed = 1",
    )
    .bind(student_id)
    .fetch_one(&pool)
    .await?;

    let (total_score, possible_marks) = standings
        .iter()
        .find(|&&(id, _, _)| id == student_id)
        .map(|&(_, obtained, possible)| (obtained, possible))
        .unwrap_or((0, 0));

    let average_score = if completed_exams > 0 {
        round2(total_score as f64 / completed_exams as f64)
    } else {
        0.0
    };
    let completion_percentage = if total_exams > 0 {
        round2(completed_exams as f64 / total_exams as f64 * 100.0)
    } else {
        0.0
    };
    let average_percentage = if possible_marks > 0 {
        round2(total_score as f64 / possible_marks as f64 * 100.0)
    } else {
        0.0
    };

    Ok(Json(StudentProgress {
        total_exams,
        completed_exams,
        total_score,
        average_score,
        completion_percentage,
        average_percentage,
        rank: rank_of(&standings, student_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_empty_is_none() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_takes_upper_middle() {
        assert_eq!(median(&[1, 2, 3]), Some(2));
        assert_eq!(median(&[1, 2, 3, 4]), Some(3));
        assert_eq!(median(&[7]), Some(7));
    }

    #[test]
    fn pass_percentage_uses_half_of_total_marks() {
        // Threshold is 5 out of 10.
        assert_eq!(pass_percentage(&[4, 5, 10], 10), Some(66.67));
        assert_eq!(pass_percentage(&[0, 1], 10), Some(0.0));
        assert_eq!(pass_percentage(&[], 10), None);
    }

    #[test]
    fn rank_orders_by_percentage_descending() {
        // Student 1: 50%, student 2: 80%, student 3: 80% (tie, stable).
        let rows = vec![(1, 5, 10), (2, 8, 10), (3, 16, 20)];
        assert_eq!(rank_of(&rows, 2), Some(1));
        assert_eq!(rank_of(&rows, 3), Some(2));
        assert_eq!(rank_of(&rows, 1), Some(3));
    }

    #[test]
    fn rank_is_none_for_students_without_attempts() {
        let rows = vec![(1, 5, 10)];
        assert_eq!(rank_of(&rows, 99), None);
    }

    #[test]
    fn rank_handles_empty_papers() {
        let rows = vec![(1, 0, 0), (2, 1, 10)];
        assert_eq!(rank_of(&rows, 2), Some(1));
        assert_eq!(rank_of(&rows, 1), Some(2));
    }
}
