//! Durable storage for languages, chapters, exercises and test cases.
//!
//! Exercise create/update replaces the whole test-case list inside one
//! transaction; an exercise is never observable with a partially replaced
//! case list.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::{
    Chapter, Exercise, ExerciseData, ExerciseWithTests, Language, TestCase, TestCaseData,
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReorderEntry {
    pub id: String,
    pub chapter_id: String,
}

#[derive(sqlx::FromRow)]
struct TestCaseRow {
    id: i64,
    exercise_id: String,
    order_index: i64,
    args: String,
    stdin_lines: String,
    expected_stdout: String,
    expected_stderr: Option<String>,
    expected_exit_code: i64,
    fixtures: String,
    output_files: String,
}

impl TestCaseRow {
    fn into_test_case(self) -> TestCase {
        TestCase {
            id: self.id,
            exercise_id: self.exercise_id,
            order_index: self.order_index,
            args: serde_json::from_str(&self.args).unwrap_or_default(),
            stdin_lines: serde_json::from_str(&self.stdin_lines).unwrap_or_default(),
            expected_stdout: self.expected_stdout,
            expected_stderr: self.expected_stderr,
            expected_exit_code: self.expected_exit_code,
            fixtures: serde_json::from_str(&self.fixtures).unwrap_or_default(),
            output_files: serde_json::from_str(&self.output_files).unwrap_or_default(),
        }
    }
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ----- languages -----

    pub async fn list_languages(&self) -> Result<Vec<Language>> {
        let languages = sqlx::query_as::<_, Language>(
            "SELECT * FROM languages ORDER BY order_index, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(languages)
    }

    pub async fn get_language(&self, id: &str) -> Result<Option<Language>> {
        let language = sqlx::query_as::<_, Language>("SELECT * FROM languages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(language)
    }

    pub async fn create_language(&self, language: &Language) -> Result<()> {
        sqlx::query(
            "INSERT INTO languages (id, name, extension, interpreter, image, order_index, enabled) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&language.id)
        .bind(&language.name)
        .bind(&language.extension)
        .bind(&language.interpreter)
        .bind(&language.image)
        .bind(language.order_index)
        .bind(language.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_language(&self, language: &Language) -> Result<()> {
        let result = sqlx::query(
            "UPDATE languages SET name = ?, extension = ?, interpreter = ?, image = ?, \
             order_index = ?, enabled = ? WHERE id = ?",
        )
        .bind(&language.name)
        .bind(&language.extension)
        .bind(&language.interpreter)
        .bind(&language.image)
        .bind(language.order_index)
        .bind(language.enabled)
        .bind(&language.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("language {}", language.id)));
        }
        Ok(())
    }

    pub async fn delete_language(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM languages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("language {id}")));
        }
        Ok(())
    }

    // ----- chapters -----

    pub async fn list_chapters(&self, language_id: &str) -> Result<Vec<Chapter>> {
        let chapters = sqlx::query_as::<_, Chapter>(
            "SELECT * FROM chapters WHERE language_id = ? ORDER BY order_index, id",
        )
        .bind(language_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chapters)
    }

    pub async fn get_chapter(&self, id: &str) -> Result<Option<Chapter>> {
        let chapter = sqlx::query_as::<_, Chapter>("SELECT * FROM chapters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chapter)
    }

    pub async fn create_chapter(&self, chapter: &Chapter) -> Result<()> {
        sqlx::query(
            "INSERT INTO chapters (id, language_id, name, order_index) VALUES (?, ?, ?, ?)",
        )
        .bind(&chapter.id)
        .bind(&chapter.language_id)
        .bind(&chapter.name)
        .bind(chapter.order_index)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_chapter(&self, chapter: &Chapter) -> Result<()> {
        let result = sqlx::query(
            "UPDATE chapters SET language_id = ?, name = ?, order_index = ? WHERE id = ?",
        )
        .bind(&chapter.language_id)
        .bind(&chapter.name)
        .bind(chapter.order_index)
        .bind(&chapter.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("chapter {}", chapter.id)));
        }
        Ok(())
    }

    /// Cascades to owned exercises and their test cases.
    pub async fn delete_chapter(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("chapter {id}")));
        }
        Ok(())
    }

    // ----- exercises -----

    /// Exercises of one language, ordered by (chapter order, exercise order).
    pub async fn list_exercises(&self, language_id: &str) -> Result<Vec<Exercise>> {
        let exercises = sqlx::query_as::<_, Exercise>(
            "SELECT e.* FROM exercises e \
             JOIN chapters c ON c.id = e.chapter_id \
             WHERE c.language_id = ? \
             ORDER BY c.order_index, e.order_index, e.id",
        )
        .bind(language_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exercises)
    }

    pub async fn list_all_exercises(&self) -> Result<Vec<Exercise>> {
        let exercises = sqlx::query_as::<_, Exercise>(
            "SELECT e.* FROM exercises e \
             JOIN chapters c ON c.id = e.chapter_id \
             ORDER BY c.language_id, c.order_index, e.order_index, e.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(exercises)
    }

    pub async fn get_exercise(&self, id: &str) -> Result<Option<Exercise>> {
        let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exercise)
    }

    pub async fn get_exercise_with_tests(&self, id: &str) -> Result<Option<ExerciseWithTests>> {
        let Some(exercise) = self.get_exercise(id).await? else {
            return Ok(None);
        };
        let test_cases = self.list_test_cases(id).await?;
        Ok(Some(ExerciseWithTests {
            exercise,
            test_cases,
        }))
    }

    pub async fn list_test_cases(&self, exercise_id: &str) -> Result<Vec<TestCase>> {
        let rows = sqlx::query_as::<_, TestCaseRow>(
            "SELECT * FROM test_cases WHERE exercise_id = ? ORDER BY order_index",
        )
        .bind(exercise_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TestCaseRow::into_test_case).collect())
    }

    pub async fn create_exercise(&self, data: &ExerciseData) -> Result<Exercise> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let next_index: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(order_index) + 1, 0) FROM exercises WHERE chapter_id = ?",
        )
        .bind(&data.chapter_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO exercises \
             (id, chapter_id, title, description, solution, order_index, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.id)
        .bind(&data.chapter_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.solution)
        .bind(next_index)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_test_cases(&mut tx, &data.id, &data.test_cases).await?;
        tx.commit().await?;

        self.get_exercise(&data.id)
            .await?
            .ok_or_else(|| Error::Internal("exercise vanished after insert".into()))
    }

    /// Updates exercise attributes and replaces its test cases atomically.
    pub async fn update_exercise(&self, id: &str, data: &ExerciseData) -> Result<Exercise> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE exercises SET chapter_id = ?, title = ?, description = ?, solution = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&data.chapter_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.solution)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("exercise {id}")));
        }

        sqlx::query("DELETE FROM test_cases WHERE exercise_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_test_cases(&mut tx, id, &data.test_cases).await?;
        tx.commit().await?;

        self.get_exercise(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("exercise {id}")))
    }

    pub async fn delete_exercise(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM exercises WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("exercise {id}")));
        }
        Ok(())
    }

    /// Rewrite `(chapter_id, order_index)` to match the input sequence.
    /// Indices are reassigned densely per chapter, so the operation is
    /// idempotent and cross-chapter moves keep indices unique.
    pub async fn reorder_exercises(&self, entries: &[ReorderEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let mut per_chapter: std::collections::HashMap<&str, i64> =
            std::collections::HashMap::new();

        for entry in entries {
            let index = per_chapter.entry(entry.chapter_id.as_str()).or_insert(0);
            sqlx::query(
                "UPDATE exercises SET chapter_id = ?, order_index = ?, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(&entry.chapter_id)
            .bind(*index)
            .bind(Utc::now())
            .bind(&entry.id)
            .execute(&mut *tx)
            .await?;
            *index += 1;
        }

        tx.commit().await?;
        Ok(())
    }

    // ----- structure lookups used by the achievement engine -----

    pub async fn exercise_ids_in_chapter(&self, chapter_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM exercises WHERE chapter_id = ? ORDER BY order_index",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn chapter_ids_in_language(&self, language_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM chapters WHERE language_id = ? ORDER BY order_index",
        )
        .bind(language_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

async fn insert_test_cases(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    exercise_id: &str,
    cases: &[TestCaseData],
) -> Result<()> {
    for (index, case) in cases.iter().enumerate() {
        sqlx::query(
            "INSERT INTO test_cases \
             (exercise_id, order_index, args, stdin_lines, expected_stdout, expected_stderr, \
              expected_exit_code, fixtures, output_files) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(exercise_id)
        .bind(index as i64)
        .bind(serde_json::to_string(&case.args).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&case.stdin_lines).unwrap_or_else(|_| "[]".into()))
        .bind(&case.expected_stdout)
        .bind(&case.expected_stderr)
        .bind(case.expected_exit_code)
        .bind(serde_json::to_string(&case.fixtures).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&case.output_files).unwrap_or_else(|_| "{}".into()))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
