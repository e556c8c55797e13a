//! Quiz sessions, their questions and submitted answers

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::{Deserialize, Serialize};

use super::{new_id, now_timestamp, string_list_column, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct QuizSession {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub topic: String,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub score: Option<f64>,
    pub completed_at: DateTime<Utc>,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub quiz_session_id: String,
    pub question: String,
    pub correct_answer: String,
    pub options: Vec<String>,
    pub question_order: i64,
}

/// Question as generated or submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Result of submitting an answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    QuestionNotFound,
    NotOwner,
    Recorded { is_correct: bool, correct_answer: String },
}

const SELECT_QUIZ: &str = r#"
    SELECT id, user_id, study_session_id, topic, total_questions, correct_answers, score, completed_at
    FROM quiz_sessions
"#;

fn row_to_quiz(row: &rusqlite::Row) -> Result<QuizSession> {
    Ok(QuizSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        topic: row.get(3)?,
        total_questions: row.get(4)?,
        correct_answers: row.get(5)?,
        score: row.get(6)?,
        completed_at: timestamp_column(row, 7)?,
        questions: Vec::new(),
    })
}

fn row_to_question(row: &rusqlite::Row) -> Result<QuizQuestion> {
    Ok(QuizQuestion {
        id: row.get(0)?,
        quiz_session_id: row.get(1)?,
        question: row.get(2)?,
        correct_answer: row.get(3)?,
        options: string_list_column(row, 4)?,
        question_order: row.get(5)?,
    })
}

fn load_questions(conn: &Connection, quiz_id: &str) -> Result<Vec<QuizQuestion>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, quiz_session_id, question, correct_answer, options, question_order
        FROM quiz_questions
        WHERE quiz_session_id = ?1
        ORDER BY question_order
        "#,
    )?;
    let questions = stmt
        .query_map(params![quiz_id], row_to_question)?
        .collect::<Result<Vec<_>>>()?;
    Ok(questions)
}

/// Create a quiz with its questions (numbered from 1) in one transaction
pub fn create_quiz_session(
    conn: &Connection,
    user_id: &str,
    topic: &str,
    study_session_id: Option<&str>,
    questions: &[NewQuizQuestion],
) -> Result<QuizSession> {
    let tx = conn.unchecked_transaction()?;

    let quiz_id = new_id();
    tx.execute(
        r#"
        INSERT INTO quiz_sessions (id, user_id, study_session_id, topic, total_questions, correct_answers, score, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6)
        "#,
        params![quiz_id, user_id, study_session_id, topic, questions.len() as i64, now_timestamp()],
    )?;

    for (idx, q) in questions.iter().enumerate() {
        let options = serde_json::to_string(&q.options)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        tx.execute(
            r#"
            INSERT INTO quiz_questions (id, quiz_session_id, question, correct_answer, options, question_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![new_id(), quiz_id, q.question, q.correct_answer, options, idx as i64 + 1],
        )?;
    }

    let quiz = get_quiz_session(&tx, user_id, &quiz_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    tx.commit()?;
    Ok(quiz)
}

pub fn get_quiz_session(conn: &Connection, user_id: &str, quiz_id: &str) -> Result<Option<QuizSession>> {
    let quiz = conn
        .query_row(
            &format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_QUIZ),
            params![quiz_id, user_id],
            row_to_quiz,
        )
        .optional()?;
    match quiz {
        Some(mut quiz) => {
            quiz.questions = load_questions(conn, &quiz.id)?;
            Ok(Some(quiz))
        }
        None => Ok(None),
    }
}

/// List a user's quizzes, newest first
pub fn list_quiz_sessions(conn: &Connection, user_id: &str, skip: i64, limit: i64) -> Result<Vec<QuizSession>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 ORDER BY completed_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        SELECT_QUIZ
    ))?;
    let mut quizzes = stmt
        .query_map(params![user_id, limit, skip], row_to_quiz)?
        .collect::<Result<Vec<_>>>()?;
    for quiz in &mut quizzes {
        quiz.questions = load_questions(conn, &quiz.id)?;
    }
    Ok(quizzes)
}

/// Whether a submitted answer matches the expected one (trimmed, case-insensitive)
pub fn answer_matches(user_answer: &str, correct_answer: &str) -> bool {
    user_answer.trim().to_lowercase() == correct_answer.trim().to_lowercase()
}

/// Grade and store an answer. A question counts toward `correct_answers`
/// at most once per quiz.
pub fn submit_answer(
    conn: &Connection,
    user_id: &str,
    question_id: &str,
    user_answer: Option<&str>,
) -> Result<AnswerOutcome> {
    let tx = conn.unchecked_transaction()?;

    let question = tx
        .query_row(
            r#"
            SELECT q.quiz_session_id, q.correct_answer, s.user_id
            FROM quiz_questions q
            JOIN quiz_sessions s ON s.id = q.quiz_session_id
            WHERE q.id = ?1
            "#,
            params![question_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )
        .optional()?;

    let Some((quiz_id, correct_answer, owner)) = question else {
        return Ok(AnswerOutcome::QuestionNotFound);
    };
    if owner != user_id {
        return Ok(AnswerOutcome::NotOwner);
    }

    let is_correct = user_answer.is_some_and(|a| answer_matches(a, &correct_answer));
    let already_correct: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM quiz_answers WHERE quiz_question_id = ?1 AND user_id = ?2 AND is_correct = 1)",
        params![question_id, user_id],
        |row| row.get(0),
    )?;

    tx.execute(
        r#"
        INSERT INTO quiz_answers (id, quiz_question_id, user_id, user_answer, is_correct, answered_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![new_id(), question_id, user_id, user_answer, is_correct, now_timestamp()],
    )?;

    if is_correct && !already_correct {
        tx.execute(
            "UPDATE quiz_sessions SET correct_answers = correct_answers + 1 WHERE id = ?1",
            params![quiz_id],
        )?;
    }

    tx.commit()?;
    Ok(AnswerOutcome::Recorded { is_correct, correct_answer })
}

/// Percentage of correct answers rounded to two decimals; None for an empty quiz
pub fn quiz_score(correct_answers: i64, total_questions: i64) -> Option<f64> {
    if total_questions <= 0 {
        return None;
    }
    let pct = correct_answers as f64 / total_questions as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

/// Compute and store the final score
pub fn complete_quiz(conn: &Connection, user_id: &str, quiz_id: &str) -> Result<Option<QuizSession>> {
    let Some(quiz) = get_quiz_session(conn, user_id, quiz_id)? else {
        return Ok(None);
    };
    if let Some(score) = quiz_score(quiz.correct_answers, quiz.total_questions) {
        conn.execute(
            "UPDATE quiz_sessions SET score = ?1 WHERE id = ?2",
            params![score, quiz_id],
        )?;
    }
    get_quiz_session(conn, user_id, quiz_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    fn question(q: &str, answer: &str) -> NewQuizQuestion {
        NewQuizQuestion {
            question: q.to_string(),
            options: vec![answer.to_string(), "B".into(), "C".into(), "D".into()],
            correct_answer: answer.to_string(),
        }
    }

    fn three_questions() -> Vec<NewQuizQuestion> {
        vec![question("¿1+1?", "2"), question("¿2+2?", "4"), question("¿3+3?", "6")]
    }

    #[test]
    fn test_create_numbers_questions() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("quiz.maker@gmail.com").unwrap();

        let quiz = create_quiz_session(&env.conn, &user, "Aritmética", None, &three_questions()).unwrap();
        assert_eq!(quiz.total_questions, 3);
        assert_eq!(quiz.correct_answers, 0);
        assert!(quiz.score.is_none());
        let orders: Vec<_> = quiz.questions.iter().map(|q| q.question_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(quiz.questions[0].options.len(), 4);
    }

    #[test]
    fn test_answers_and_score() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("quiz.taker@gmail.com").unwrap();
        let quiz = create_quiz_session(&env.conn, &user, "Aritmética", None, &three_questions()).unwrap();

        let outcome = submit_answer(&env.conn, &user, &quiz.questions[0].id, Some(" 2 ")).unwrap();
        assert_eq!(outcome, AnswerOutcome::Recorded { is_correct: true, correct_answer: "2".into() });
        // Answering the same question correctly again does not double count
        submit_answer(&env.conn, &user, &quiz.questions[0].id, Some("2")).unwrap();
        submit_answer(&env.conn, &user, &quiz.questions[1].id, Some("5")).unwrap();
        submit_answer(&env.conn, &user, &quiz.questions[2].id, None).unwrap();

        let done = complete_quiz(&env.conn, &user, &quiz.id).unwrap().unwrap();
        assert_eq!(done.correct_answers, 1);
        assert_eq!(done.score, Some(33.33));
    }

    #[test]
    fn test_answer_ownership() {
        let env = TestEnv::new().unwrap();
        let owner = env.create_user("quiz.owner@gmail.com").unwrap();
        let other = env.create_user("quiz.other@gmail.com").unwrap();
        let quiz = create_quiz_session(&env.conn, &owner, "Aritmética", None, &three_questions()).unwrap();

        assert_eq!(
            submit_answer(&env.conn, &other, &quiz.questions[0].id, Some("2")).unwrap(),
            AnswerOutcome::NotOwner
        );
        assert_eq!(
            submit_answer(&env.conn, &owner, "no-such-question", Some("2")).unwrap(),
            AnswerOutcome::QuestionNotFound
        );
        assert!(complete_quiz(&env.conn, &other, &quiz.id).unwrap().is_none());
    }

    #[test]
    fn test_quiz_score_rounding() {
        assert_eq!(quiz_score(2, 3), Some(66.67));
        assert_eq!(quiz_score(5, 5), Some(100.0));
        assert_eq!(quiz_score(0, 4), Some(0.0));
        assert_eq!(quiz_score(0, 0), None);
    }

    #[test]
    fn test_list_newest_first() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("quiz.lister@gmail.com").unwrap();
        let first = create_quiz_session(&env.conn, &user, "Uno", None, &three_questions()).unwrap();
        let second = create_quiz_session(&env.conn, &user, "Dos", None, &[]).unwrap();

        let quizzes = list_quiz_sessions(&env.conn, &user, 0, 100).unwrap();
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[0].id, second.id);
        assert_eq!(quizzes[1].id, first.id);
        assert_eq!(quizzes[1].questions.len(), 3);
    }
}
