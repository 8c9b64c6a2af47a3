use crate::models::{
    AcademicLevel, AttemptCbt, AttemptCourse, AttemptDetail, Cbt, CbtAttempt, Course,
    CourseInput, Department, DepartmentInput, Faculty, LibraryStats, NewQuestion,
    NewResource, OptionPayload, PendingResource, Question, QuestionOption, QuestionPayload,
    QuestionWithOptions, Resource, User, next_order_index,
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// Every persistence operation the handlers need. Handlers only see
/// `Arc<dyn Repository>`, so tests swap in in-memory implementations.
///
/// Absence is expressed with `Option`/`bool`; `Err` always means the database call failed.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: User) -> RepoResult<User>;

    // --- Catalog ---
    async fn list_faculties(&self) -> RepoResult<Vec<Faculty>>;
    async fn get_faculty(&self, id: i64) -> RepoResult<Option<Faculty>>;
    async fn list_departments(&self, faculty_id: i64) -> RepoResult<Vec<Department>>;
    async fn get_department(&self, id: i64) -> RepoResult<Option<Department>>;
    // Scoped lookup: only matches if the department belongs to the faculty.
    async fn get_faculty_department(
        &self,
        faculty_id: i64,
        department_id: i64,
    ) -> RepoResult<Option<Department>>;
    async fn create_department(
        &self,
        faculty_id: i64,
        input: &DepartmentInput,
    ) -> RepoResult<Department>;
    async fn update_department(
        &self,
        id: i64,
        input: &DepartmentInput,
    ) -> RepoResult<Option<Department>>;
    async fn delete_department(&self, id: i64) -> RepoResult<bool>;
    async fn list_levels(&self, department_id: i64) -> RepoResult<Vec<AcademicLevel>>;
    async fn get_department_level(
        &self,
        department_id: i64,
        level_id: i64,
    ) -> RepoResult<Option<AcademicLevel>>;
    async fn count_level_courses(&self, level_id: i64) -> RepoResult<i64>;
    async fn list_courses(&self, level_id: i64) -> RepoResult<Vec<Course>>;
    async fn get_course(&self, id: i64) -> RepoResult<Option<Course>>;
    async fn create_course(&self, level_id: i64, input: &CourseInput) -> RepoResult<Course>;
    async fn update_course(&self, id: i64, input: &CourseInput) -> RepoResult<Option<Course>>;
    async fn delete_course(&self, id: i64) -> RepoResult<bool>;

    // --- Resources ---
    // Approved resources only.
    async fn list_course_resources(&self, course_id: i64) -> RepoResult<Vec<Resource>>;
    async fn get_approved_resource(&self, id: Uuid) -> RepoResult<Option<Resource>>;
    // New resources always start unapproved.
    async fn create_resource(
        &self,
        user_id: Uuid,
        req: &NewResource,
    ) -> RepoResult<Resource>;
    async fn record_view(&self, resource_id: Uuid, user_id: Option<Uuid>) -> RepoResult<()>;
    async fn record_download(&self, resource_id: Uuid, user_id: Uuid) -> RepoResult<()>;
    // Returns the new state: true if the resource is now bookmarked.
    async fn toggle_bookmark(&self, user_id: Uuid, resource_id: Uuid) -> RepoResult<bool>;
    async fn list_bookmarks(&self, user_id: Uuid) -> RepoResult<Vec<Resource>>;
    async fn list_pending_resources(&self) -> RepoResult<Vec<PendingResource>>;
    async fn approve_resource(&self, id: Uuid) -> RepoResult<Option<Resource>>;
    async fn reject_resource(&self, id: Uuid, reason: &str) -> RepoResult<Option<Resource>>;

    // --- Search & Stats ---
    async fn record_search(&self, user_id: Uuid, query: &str) -> RepoResult<()>;
    async fn get_stats(&self) -> RepoResult<LibraryStats>;

    // --- CBT attempts ---
    async fn list_course_cbts(&self, course_id: i64) -> RepoResult<Vec<Cbt>>;
    async fn get_published_cbt(&self, id: Uuid) -> RepoResult<Option<Cbt>>;
    async fn start_attempt(&self, cbt_id: Uuid, user_id: Uuid) -> RepoResult<CbtAttempt>;
    // Ownership check: only matches attempts of `user_id`.
    async fn get_user_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> RepoResult<Option<CbtAttempt>>;
    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        selected_option_id: Uuid,
    ) -> RepoResult<()>;
    // Delegates to the `calculate_attempt_score` procedure.
    async fn calculate_attempt_score(&self, attempt_id: Uuid) -> RepoResult<()>;
    async fn get_attempt_detail(&self, attempt_id: Uuid) -> RepoResult<Option<AttemptDetail>>;
    // Delegates to the `get_attempt_review` procedure; rows come back as a JSON array.
    async fn get_attempt_review(&self, attempt_id: Uuid) -> RepoResult<serde_json::Value>;

    // --- CBT questions ---
    async fn list_questions(&self, cbt_id: Uuid) -> RepoResult<Vec<QuestionWithOptions>>;
    async fn get_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
    ) -> RepoResult<Option<QuestionWithOptions>>;
    async fn create_question(
        &self,
        cbt_id: Uuid,
        question: &NewQuestion,
    ) -> RepoResult<QuestionWithOptions>;
    async fn update_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
        changes: &QuestionPayload,
    ) -> RepoResult<Option<QuestionWithOptions>>;
    async fn delete_question(&self, cbt_id: Uuid, question_id: Uuid) -> RepoResult<bool>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// Nests each question's options under it, preserving the order of both inputs.
pub fn attach_options(
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<QuestionWithOptions> {
    let mut by_question: HashMap<Uuid, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }
    questions
        .into_iter()
        .map(|question| QuestionWithOptions {
            question_options: by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect()
}

const USER_COLUMNS: &str = "id, email, username, role";
const DEPARTMENT_COLUMNS: &str = "id, faculty_id, full_name, short_name, description";
const COURSE_COLUMNS: &str = "id, level_id, course_code, course_title, description";
const RESOURCE_COLUMNS: &str = "id, course_id, uploaded_by, title, description, file_type, \
     storage_key, is_approved, rejection_reason, downloads, upload_date";
const CBT_COLUMNS: &str =
    "id, course_id, title, description, duration_minutes, passing_score, is_published";
const QUESTION_COLUMNS: &str = "id, cbt_id, question_text, question_type, points, explanation, \
     shuffle_options, order_index, created_at, updated_at";
const OPTION_COLUMNS: &str = "id, question_id, option_text, is_correct, order_index";
const ATTEMPT_COLUMNS: &str =
    "id, cbt_id, user_id, started_at, completed_at, score, total_points, percentage, passed";

/// Flat row of the attempt/CBT/course join, reshaped into `AttemptDetail`.
#[derive(FromRow)]
struct AttemptDetailRow {
    #[sqlx(flatten)]
    attempt: CbtAttempt,
    cbt_title: String,
    passing_score: i32,
    course_id: i64,
    course_code: String,
    course_title: String,
}

impl From<AttemptDetailRow> for AttemptDetail {
    fn from(row: AttemptDetailRow) -> Self {
        AttemptDetail {
            cbt: AttemptCbt {
                id: row.attempt.cbt_id,
                title: row.cbt_title,
                passing_score: row.passing_score,
                course: AttemptCourse {
                    id: row.course_id,
                    course_code: row.course_code,
                    course_title: row.course_title,
                },
            },
            attempt: row.attempt,
        }
    }
}

/// PostgresRepository
///
/// `Repository` backed by the hosted Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
    ) -> RepoResult<Option<QuestionWithOptions>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND cbt_id = $2"
        ))
        .bind(question_id)
        .bind(cbt_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(question) = question else {
            return Ok(None);
        };

        let options = sqlx::query_as::<_, QuestionOption>(&format!(
            "SELECT {OPTION_COLUMNS} FROM question_options WHERE question_id = $1 ORDER BY order_index ASC"
        ))
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_options(vec![question], options).pop())
    }
}

/// Inserts `options` for a question, numbering them by array position.
async fn insert_options(
    tx: &mut Transaction<'_, Postgres>,
    question_id: Uuid,
    options: &[OptionPayload],
) -> RepoResult<()> {
    for (index, option) in options.iter().enumerate() {
        sqlx::query(
            "INSERT INTO question_options (id, question_id, option_text, is_correct, order_index) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(question_id)
        .bind(&option.option_text)
        .bind(option.is_correct)
        .bind(index as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, username, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.email)
        .bind(user.username)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
    }

    // --- CATALOG ---

    async fn list_faculties(&self) -> RepoResult<Vec<Faculty>> {
        sqlx::query_as::<_, Faculty>(
            "SELECT id, full_name, short_name, description FROM faculties ORDER BY full_name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_faculty(&self, id: i64) -> RepoResult<Option<Faculty>> {
        sqlx::query_as::<_, Faculty>(
            "SELECT id, full_name, short_name, description FROM faculties WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_departments(&self, faculty_id: i64) -> RepoResult<Vec<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE faculty_id = $1 ORDER BY full_name ASC"
        ))
        .bind(faculty_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_department(&self, id: i64) -> RepoResult<Option<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_faculty_department(
        &self,
        faculty_id: i64,
        department_id: i64,
    ) -> RepoResult<Option<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1 AND faculty_id = $2"
        ))
        .bind(department_id)
        .bind(faculty_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_department(
        &self,
        faculty_id: i64,
        input: &DepartmentInput,
    ) -> RepoResult<Department> {
        sqlx::query_as::<_, Department>(&format!(
            "INSERT INTO departments (faculty_id, full_name, short_name, description) \
             VALUES ($1, $2, $3, $4) RETURNING {DEPARTMENT_COLUMNS}"
        ))
        .bind(faculty_id)
        .bind(&input.full_name)
        .bind(&input.short_name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_department(
        &self,
        id: i64,
        input: &DepartmentInput,
    ) -> RepoResult<Option<Department>> {
        sqlx::query_as::<_, Department>(&format!(
            "UPDATE departments SET full_name = $2, short_name = $3, description = $4 \
             WHERE id = $1 RETURNING {DEPARTMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.full_name)
        .bind(&input.short_name)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_department(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_levels(&self, department_id: i64) -> RepoResult<Vec<AcademicLevel>> {
        sqlx::query_as::<_, AcademicLevel>(
            "SELECT id, department_id, level_number FROM academic_levels \
             WHERE department_id = $1 ORDER BY level_number ASC",
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_department_level(
        &self,
        department_id: i64,
        level_id: i64,
    ) -> RepoResult<Option<AcademicLevel>> {
        sqlx::query_as::<_, AcademicLevel>(
            "SELECT id, department_id, level_number FROM academic_levels \
             WHERE id = $1 AND department_id = $2",
        )
        .bind(level_id)
        .bind(department_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_level_courses(&self, level_id: i64) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE level_id = $1")
            .bind(level_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_courses(&self, level_id: i64) -> RepoResult<Vec<Course>> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE level_id = $1 ORDER BY course_code ASC"
        ))
        .bind(level_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_course(&self, id: i64) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_course(&self, level_id: i64, input: &CourseInput) -> RepoResult<Course> {
        sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses (level_id, course_code, course_title, description) \
             VALUES ($1, $2, $3, $4) RETURNING {COURSE_COLUMNS}"
        ))
        .bind(level_id)
        .bind(&input.course_code)
        .bind(&input.course_title)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_course(&self, id: i64, input: &CourseInput) -> RepoResult<Option<Course>> {
        sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET course_code = $2, course_title = $3, description = $4 \
             WHERE id = $1 RETURNING {COURSE_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.course_code)
        .bind(&input.course_title)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_course(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- RESOURCES ---

    async fn list_course_resources(&self, course_id: i64) -> RepoResult<Vec<Resource>> {
        sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources \
             WHERE course_id = $1 AND is_approved = true ORDER BY upload_date DESC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_approved_resource(&self, id: Uuid) -> RepoResult<Option<Resource>> {
        sqlx::query_as::<_, Resource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1 AND is_approved = true"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_resource(
        &self,
        user_id: Uuid,
        req: &NewResource,
    ) -> RepoResult<Resource> {
        sqlx::query_as::<_, Resource>(&format!(
            "INSERT INTO resources (id, course_id, uploaded_by, title, description, file_type, storage_key, is_approved, downloads, upload_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, false, 0, NOW()) RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.course_id)
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.file_type)
        .bind(&req.storage_key)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_view(&self, resource_id: Uuid, user_id: Option<Uuid>) -> RepoResult<()> {
        sqlx::query("INSERT INTO view_history (resource_id, user_id) VALUES ($1, $2)")
            .bind(resource_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_download(&self, resource_id: Uuid, user_id: Uuid) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE resources SET downloads = downloads + 1 WHERE id = $1")
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO download_history (resource_id, user_id) VALUES ($1, $2)")
            .bind(resource_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Delete-first toggle: if a bookmark row was removed the resource is now
    /// unbookmarked, otherwise one is inserted (idempotent under the unique pair).
    async fn toggle_bookmark(&self, user_id: Uuid, resource_id: Uuid) -> RepoResult<bool> {
        let removed =
            sqlx::query("DELETE FROM user_bookmarks WHERE user_id = $1 AND resource_id = $2")
                .bind(user_id)
                .bind(resource_id)
                .execute(&self.pool)
                .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO user_bookmarks (user_id, resource_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(resource_id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn list_bookmarks(&self, user_id: Uuid) -> RepoResult<Vec<Resource>> {
        sqlx::query_as::<_, Resource>(
            r#"
            SELECT r.id, r.course_id, r.uploaded_by, r.title, r.description, r.file_type,
                   r.storage_key, r.is_approved, r.rejection_reason, r.downloads, r.upload_date
            FROM user_bookmarks b
            JOIN resources r ON r.id = b.resource_id
            WHERE b.user_id = $1 AND r.is_approved = true
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Unapproved resources that have not been rejected, oldest first.
    async fn list_pending_resources(&self) -> RepoResult<Vec<PendingResource>> {
        sqlx::query_as::<_, PendingResource>(
            r#"
            SELECT r.id, r.course_id, r.uploaded_by, r.title, r.description, r.file_type,
                   r.storage_key, r.is_approved, r.rejection_reason, r.downloads, r.upload_date,
                   l.level_number, u.email AS uploader_email, u.username AS uploader_username
            FROM resources r
            LEFT JOIN courses c ON c.id = r.course_id
            LEFT JOIN academic_levels l ON l.id = c.level_id
            LEFT JOIN users u ON u.id = r.uploaded_by
            WHERE r.is_approved = false
              AND (r.rejection_reason IS NULL OR r.rejection_reason = '')
            ORDER BY r.upload_date ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn approve_resource(&self, id: Uuid) -> RepoResult<Option<Resource>> {
        sqlx::query_as::<_, Resource>(&format!(
            "UPDATE resources SET is_approved = true, rejection_reason = NULL \
             WHERE id = $1 RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reject_resource(&self, id: Uuid, reason: &str) -> RepoResult<Option<Resource>> {
        sqlx::query_as::<_, Resource>(&format!(
            "UPDATE resources SET is_approved = false, rejection_reason = $2 \
             WHERE id = $1 RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    // --- SEARCH & STATS ---

    async fn record_search(&self, user_id: Uuid, query: &str) -> RepoResult<()> {
        sqlx::query("INSERT INTO search_history (user_id, query) VALUES ($1, $2)")
            .bind(user_id)
            .bind(query)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_stats(&self) -> RepoResult<LibraryStats> {
        let (resource_count, user_count, download_count, view_count, pending_count) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM resources),
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM download_history),
                    (SELECT COUNT(*) FROM view_history),
                    (SELECT COUNT(*) FROM resources WHERE is_approved = false)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(LibraryStats {
            resource_count,
            user_count,
            download_count,
            view_count,
            pending_count,
        })
    }

    // --- CBT ATTEMPTS ---

    async fn list_course_cbts(&self, course_id: i64) -> RepoResult<Vec<Cbt>> {
        sqlx::query_as::<_, Cbt>(&format!(
            "SELECT {CBT_COLUMNS} FROM cbts WHERE course_id = $1 AND is_published = true ORDER BY title ASC"
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_published_cbt(&self, id: Uuid) -> RepoResult<Option<Cbt>> {
        sqlx::query_as::<_, Cbt>(&format!(
            "SELECT {CBT_COLUMNS} FROM cbts WHERE id = $1 AND is_published = true"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn start_attempt(&self, cbt_id: Uuid, user_id: Uuid) -> RepoResult<CbtAttempt> {
        sqlx::query_as::<_, CbtAttempt>(&format!(
            "INSERT INTO cbt_attempts (id, cbt_id, user_id, started_at) VALUES ($1, $2, $3, NOW()) \
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(cbt_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> RepoResult<Option<CbtAttempt>> {
        sqlx::query_as::<_, CbtAttempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM cbt_attempts WHERE id = $1 AND user_id = $2"
        ))
        .bind(attempt_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Single-statement upsert on the `(attempt_id, question_id)` unique pair.
    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        selected_option_id: Uuid,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_answers (id, attempt_id, question_id, selected_option_id, answered_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (attempt_id, question_id)
            DO UPDATE SET selected_option_id = EXCLUDED.selected_option_id, answered_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(attempt_id)
        .bind(question_id)
        .bind(selected_option_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn calculate_attempt_score(&self, attempt_id: Uuid) -> RepoResult<()> {
        sqlx::query("SELECT calculate_attempt_score($1)")
            .bind(attempt_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_attempt_detail(&self, attempt_id: Uuid) -> RepoResult<Option<AttemptDetail>> {
        let row = sqlx::query_as::<_, AttemptDetailRow>(
            r#"
            SELECT a.id, a.cbt_id, a.user_id, a.started_at, a.completed_at, a.score,
                   a.total_points, a.percentage, a.passed,
                   c.title AS cbt_title, c.passing_score,
                   co.id AS course_id, co.course_code, co.course_title
            FROM cbt_attempts a
            JOIN cbts c ON c.id = a.cbt_id
            JOIN courses co ON co.id = c.course_id
            WHERE a.id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AttemptDetail::from))
    }

    async fn get_attempt_review(&self, attempt_id: Uuid) -> RepoResult<serde_json::Value> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT COALESCE(jsonb_agg(to_jsonb(r) ORDER BY r.order_index), '[]'::jsonb) FROM get_attempt_review($1) AS r",
        )
        .bind(attempt_id)
        .fetch_one(&self.pool)
        .await
    }

    // --- CBT QUESTIONS ---

    async fn list_questions(&self, cbt_id: Uuid) -> RepoResult<Vec<QuestionWithOptions>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE cbt_id = $1 ORDER BY order_index ASC"
        ))
        .bind(cbt_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let options = sqlx::query_as::<_, QuestionOption>(&format!(
            "SELECT {OPTION_COLUMNS} FROM question_options WHERE question_id = ANY($1) \
             ORDER BY order_index ASC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_options(questions, options))
    }

    async fn get_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
    ) -> RepoResult<Option<QuestionWithOptions>> {
        self.fetch_question(cbt_id, question_id).await
    }

    /// Appends the question after the CBT's current last one and inserts its
    /// options in the same transaction.
    async fn create_question(
        &self,
        cbt_id: Uuid,
        question: &NewQuestion,
    ) -> RepoResult<QuestionWithOptions> {
        let mut tx = self.pool.begin().await?;

        let last_index = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(order_index) FROM questions WHERE cbt_id = $1",
        )
        .bind(cbt_id)
        .fetch_one(&mut *tx)
        .await?;

        let question_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO questions
                (id, cbt_id, question_text, question_type, points, explanation,
                 shuffle_options, order_index, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            "#,
        )
        .bind(question_id)
        .bind(cbt_id)
        .bind(&question.question_text)
        .bind(&question.question_type)
        .bind(question.points)
        .bind(&question.explanation)
        .bind(question.shuffle_options)
        .bind(next_order_index(last_index))
        .execute(&mut *tx)
        .await?;

        insert_options(&mut tx, question_id, &question.options).await?;
        tx.commit().await?;

        self.fetch_question(cbt_id, question_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Updates only the supplied fields. A non-empty option list replaces every
    /// existing option of the question.
    async fn update_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
        changes: &QuestionPayload,
    ) -> RepoResult<Option<QuestionWithOptions>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE questions
            SET question_text = COALESCE($3, question_text),
                question_type = COALESCE($4, question_type),
                points = COALESCE($5, points),
                explanation = CASE WHEN $8 THEN $6 ELSE explanation END,
                shuffle_options = COALESCE($7, shuffle_options),
                updated_at = NOW()
            WHERE id = $1 AND cbt_id = $2
            "#,
        )
        .bind(question_id)
        .bind(cbt_id)
        .bind(&changes.question_text)
        .bind(&changes.question_type)
        .bind(changes.points)
        .bind(changes.explanation.clone().flatten())
        .bind(changes.shuffle_options)
        .bind(changes.explanation.is_some())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(options) = changes.replacement_options() {
            sqlx::query("DELETE FROM question_options WHERE question_id = $1")
                .bind(question_id)
                .execute(&mut *tx)
                .await?;
            insert_options(&mut tx, question_id, options).await?;
        }

        tx.commit().await?;
        self.fetch_question(cbt_id, question_id).await
    }

    async fn delete_question(&self, cbt_id: Uuid, question_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM questions WHERE id = $1 AND cbt_id = $2")
            .bind(question_id)
            .bind(cbt_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
