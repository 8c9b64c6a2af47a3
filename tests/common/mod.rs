//! Shared fixtures for the integration tests: an in-memory `Repository`, a seeded
//! catalog and helpers for building `AppState` and reading response bodies.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use campus_library::{
    AppState, PreviewAssets,
    auth::{ADMIN_ROLE, AuthUser, STUDENT_ROLE},
    config::AppConfig,
    models::{
        AcademicLevel, AttemptCbt, AttemptCourse, AttemptDetail, Cbt, CbtAttempt, Course,
        CourseInput, Department, DepartmentInput, Faculty, LibraryStats, NewQuestion,
        NewResource, PendingResource, Question, QuestionOption, QuestionPayload,
        QuestionWithOptions, Resource, User, next_order_index,
    },
    repository::{RepoResult, Repository, attach_options},
    storage::MockStorageService,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const STUDENT_ID: Uuid = Uuid::from_u128(0x1001);
pub const OTHER_STUDENT_ID: Uuid = Uuid::from_u128(0x1002);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0x2001);

pub const FACULTY_ID: i64 = 1;
pub const DEPARTMENT_ID: i64 = 10;
pub const LEVEL_ID: i64 = 100;
pub const COURSE_ID: i64 = 1000;

pub const CBT_ID: Uuid = Uuid::from_u128(0x3001);
pub const DRAFT_CBT_ID: Uuid = Uuid::from_u128(0x3002);
pub const Q1_ID: Uuid = Uuid::from_u128(0x4001);
pub const Q2_ID: Uuid = Uuid::from_u128(0x4002);
pub const Q1_RIGHT: Uuid = Uuid::from_u128(0x5001);
pub const Q1_WRONG: Uuid = Uuid::from_u128(0x5002);
pub const Q2_RIGHT: Uuid = Uuid::from_u128(0x5003);
pub const Q2_WRONG: Uuid = Uuid::from_u128(0x5004);

pub const PDF_ID: Uuid = Uuid::from_u128(0x6001);
pub const VIDEO_ID: Uuid = Uuid::from_u128(0x6002);
pub const PENDING_ID: Uuid = Uuid::from_u128(0x6003);

#[derive(Default)]
pub struct Store {
    pub users: Vec<User>,
    pub faculties: Vec<Faculty>,
    pub departments: Vec<Department>,
    pub levels: Vec<AcademicLevel>,
    pub courses: Vec<Course>,
    pub resources: Vec<Resource>,
    // (user_id, resource_id) in insertion order.
    pub bookmarks: Vec<(Uuid, Uuid)>,
    pub views: Vec<(Uuid, Option<Uuid>)>,
    pub downloads: Vec<(Uuid, Uuid)>,
    pub searches: Vec<(Uuid, String)>,
    pub cbts: Vec<Cbt>,
    pub questions: Vec<Question>,
    pub options: Vec<QuestionOption>,
    pub attempts: Vec<CbtAttempt>,
    // (attempt_id, question_id, selected_option_id)
    pub answers: Vec<(Uuid, Uuid, Uuid)>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        5000 + self.next_id
    }
}

/// In-memory `Repository`. With `fail` set, every call returns a database error.
#[derive(Default)]
pub struct InMemoryRepo {
    pub store: Mutex<Store>,
    pub fail: bool,
}

impl InMemoryRepo {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// One faculty/department/level/course chain, two students and an admin, two
    /// approved resources and one pending, and a published CBT with two questions.
    pub fn seeded() -> Self {
        let mut store = Store::default();

        store.users = vec![
            user(STUDENT_ID, "ada@campus.edu", STUDENT_ROLE),
            user(OTHER_STUDENT_ID, "alan@campus.edu", STUDENT_ROLE),
            user(ADMIN_ID, "grace@campus.edu", ADMIN_ROLE),
        ];
        store.faculties = vec![Faculty {
            id: FACULTY_ID,
            full_name: "Faculty of Engineering".into(),
            short_name: "FENG".into(),
            description: Some("Where things get built".into()),
        }];
        store.departments = vec![Department {
            id: DEPARTMENT_ID,
            faculty_id: FACULTY_ID,
            full_name: "Computer Engineering".into(),
            short_name: "CPE".into(),
            description: Some("Hardware meets software".into()),
        }];
        store.levels = vec![AcademicLevel {
            id: LEVEL_ID,
            department_id: DEPARTMENT_ID,
            level_number: 300,
        }];
        store.courses = vec![Course {
            id: COURSE_ID,
            level_id: LEVEL_ID,
            course_code: "CPE 301".into(),
            course_title: "Digital Systems".into(),
            description: None,
        }];
        store.resources = vec![
            resource(PDF_ID, "pdf", true),
            resource(VIDEO_ID, "video", true),
            resource(PENDING_ID, "pdf", false),
        ];
        store.cbts = vec![
            Cbt {
                id: CBT_ID,
                course_id: COURSE_ID,
                title: "Logic Gates Quiz".into(),
                description: None,
                duration_minutes: 20,
                passing_score: 50,
                is_published: true,
            },
            Cbt {
                id: DRAFT_CBT_ID,
                course_id: COURSE_ID,
                title: "Draft Quiz".into(),
                description: None,
                duration_minutes: 20,
                passing_score: 50,
                is_published: false,
            },
        ];
        store.questions = vec![question(Q1_ID, 0), question(Q2_ID, 1)];
        store.options = vec![
            option(Q1_RIGHT, Q1_ID, true, 0),
            option(Q1_WRONG, Q1_ID, false, 1),
            option(Q2_RIGHT, Q2_ID, true, 0),
            option(Q2_WRONG, Q2_ID, false, 1),
        ];

        Self {
            store: Mutex::new(store),
            fail: false,
        }
    }

    fn guard(&self) -> RepoResult<std::sync::MutexGuard<'_, Store>> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.store.lock().unwrap())
    }

    /// Adds an open attempt owned by `user_id` and returns its id.
    pub fn open_attempt(&self, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().attempts.push(CbtAttempt {
            id,
            cbt_id: CBT_ID,
            user_id,
            started_at: Utc::now(),
            ..CbtAttempt::default()
        });
        id
    }

    /// Adds an attempt that has already been submitted.
    pub fn completed_attempt(&self, user_id: Uuid) -> Uuid {
        let id = self.open_attempt(user_id);
        let mut store = self.store.lock().unwrap();
        if let Some(attempt) = store.attempts.iter_mut().find(|a| a.id == id) {
            attempt.completed_at = Some(Utc::now());
            attempt.score = Some(0);
            attempt.total_points = Some(2);
            attempt.percentage = Some(0.0);
            attempt.passed = Some(false);
        }
        id
    }
}

pub fn user(id: Uuid, email: &str, role: &str) -> User {
    User {
        id,
        email: email.to_string(),
        username: None,
        role: role.to_string(),
    }
}

pub fn resource(id: Uuid, file_type: &str, is_approved: bool) -> Resource {
    Resource {
        id,
        course_id: COURSE_ID,
        uploaded_by: Some(STUDENT_ID),
        title: format!("{} notes", file_type),
        description: None,
        file_type: file_type.to_string(),
        storage_key: format!("resources/{}.{}", id, file_type),
        is_approved,
        rejection_reason: None,
        downloads: 0,
        upload_date: Utc::now(),
    }
}

fn question(id: Uuid, order_index: i32) -> Question {
    Question {
        id,
        cbt_id: CBT_ID,
        question_text: format!("Question {}", order_index + 1),
        question_type: "multiple_choice".into(),
        points: 1,
        order_index,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..Question::default()
    }
}

fn option(id: Uuid, question_id: Uuid, is_correct: bool, order_index: i32) -> QuestionOption {
    QuestionOption {
        id,
        question_id,
        option_text: if is_correct { "right" } else { "wrong" }.into(),
        is_correct,
        order_index,
    }
}

fn with_options(store: &Store, question: &Question) -> QuestionWithOptions {
    let mut options: Vec<QuestionOption> = store
        .options
        .iter()
        .filter(|o| o.question_id == question.id)
        .cloned()
        .collect();
    options.sort_by_key(|o| o.order_index);
    attach_options(vec![question.clone()], options)
        .pop()
        .unwrap()
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.guard()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        self.guard()?.users.push(user.clone());
        Ok(user)
    }

    async fn list_faculties(&self) -> RepoResult<Vec<Faculty>> {
        let mut faculties = self.guard()?.faculties.clone();
        faculties.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(faculties)
    }

    async fn get_faculty(&self, id: i64) -> RepoResult<Option<Faculty>> {
        Ok(self.guard()?.faculties.iter().find(|f| f.id == id).cloned())
    }

    async fn list_departments(&self, faculty_id: i64) -> RepoResult<Vec<Department>> {
        Ok(self
            .guard()?
            .departments
            .iter()
            .filter(|d| d.faculty_id == faculty_id)
            .cloned()
            .collect())
    }

    async fn get_department(&self, id: i64) -> RepoResult<Option<Department>> {
        Ok(self.guard()?.departments.iter().find(|d| d.id == id).cloned())
    }

    async fn get_faculty_department(
        &self,
        faculty_id: i64,
        department_id: i64,
    ) -> RepoResult<Option<Department>> {
        Ok(self
            .guard()?
            .departments
            .iter()
            .find(|d| d.id == department_id && d.faculty_id == faculty_id)
            .cloned())
    }

    async fn create_department(
        &self,
        faculty_id: i64,
        input: &DepartmentInput,
    ) -> RepoResult<Department> {
        let mut store = self.guard()?;
        let department = Department {
            id: store.next_id(),
            faculty_id,
            full_name: input.full_name.clone(),
            short_name: input.short_name.clone(),
            description: Some(input.description.clone()),
        };
        store.departments.push(department.clone());
        Ok(department)
    }

    async fn update_department(
        &self,
        id: i64,
        input: &DepartmentInput,
    ) -> RepoResult<Option<Department>> {
        let mut store = self.guard()?;
        Ok(store.departments.iter_mut().find(|d| d.id == id).map(|d| {
            d.full_name = input.full_name.clone();
            d.short_name = input.short_name.clone();
            d.description = Some(input.description.clone());
            d.clone()
        }))
    }

    async fn delete_department(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.guard()?;
        let before = store.departments.len();
        store.departments.retain(|d| d.id != id);
        Ok(store.departments.len() < before)
    }

    async fn list_levels(&self, department_id: i64) -> RepoResult<Vec<AcademicLevel>> {
        let mut levels: Vec<AcademicLevel> = self
            .guard()?
            .levels
            .iter()
            .filter(|l| l.department_id == department_id)
            .cloned()
            .collect();
        levels.sort_by_key(|l| l.level_number);
        Ok(levels)
    }

    async fn get_department_level(
        &self,
        department_id: i64,
        level_id: i64,
    ) -> RepoResult<Option<AcademicLevel>> {
        Ok(self
            .guard()?
            .levels
            .iter()
            .find(|l| l.id == level_id && l.department_id == department_id)
            .cloned())
    }

    async fn count_level_courses(&self, level_id: i64) -> RepoResult<i64> {
        Ok(self
            .guard()?
            .courses
            .iter()
            .filter(|c| c.level_id == level_id)
            .count() as i64)
    }

    async fn list_courses(&self, level_id: i64) -> RepoResult<Vec<Course>> {
        let mut courses: Vec<Course> = self
            .guard()?
            .courses
            .iter()
            .filter(|c| c.level_id == level_id)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.course_code.cmp(&b.course_code));
        Ok(courses)
    }

    async fn get_course(&self, id: i64) -> RepoResult<Option<Course>> {
        Ok(self.guard()?.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn create_course(&self, level_id: i64, input: &CourseInput) -> RepoResult<Course> {
        let mut store = self.guard()?;
        let course = Course {
            id: store.next_id(),
            level_id,
            course_code: input.course_code.clone(),
            course_title: input.course_title.clone(),
            description: input.description.clone(),
        };
        store.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(&self, id: i64, input: &CourseInput) -> RepoResult<Option<Course>> {
        let mut store = self.guard()?;
        Ok(store.courses.iter_mut().find(|c| c.id == id).map(|c| {
            c.course_code = input.course_code.clone();
            c.course_title = input.course_title.clone();
            c.description = input.description.clone();
            c.clone()
        }))
    }

    async fn delete_course(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.guard()?;
        let before = store.courses.len();
        store.courses.retain(|c| c.id != id);
        Ok(store.courses.len() < before)
    }

    async fn list_course_resources(&self, course_id: i64) -> RepoResult<Vec<Resource>> {
        Ok(self
            .guard()?
            .resources
            .iter()
            .filter(|r| r.course_id == course_id && r.is_approved)
            .cloned()
            .collect())
    }

    async fn get_approved_resource(&self, id: Uuid) -> RepoResult<Option<Resource>> {
        Ok(self
            .guard()?
            .resources
            .iter()
            .find(|r| r.id == id && r.is_approved)
            .cloned())
    }

    async fn create_resource(
        &self,
        user_id: Uuid,
        req: &NewResource,
    ) -> RepoResult<Resource> {
        let created = Resource {
            id: Uuid::new_v4(),
            course_id: req.course_id,
            uploaded_by: Some(user_id),
            title: req.title.clone(),
            description: req.description.clone(),
            file_type: req.file_type.clone(),
            storage_key: req.storage_key.clone(),
            is_approved: false,
            rejection_reason: None,
            downloads: 0,
            upload_date: Utc::now(),
        };
        self.guard()?.resources.push(created.clone());
        Ok(created)
    }

    async fn record_view(&self, resource_id: Uuid, user_id: Option<Uuid>) -> RepoResult<()> {
        self.guard()?.views.push((resource_id, user_id));
        Ok(())
    }

    async fn record_download(&self, resource_id: Uuid, user_id: Uuid) -> RepoResult<()> {
        let mut store = self.guard()?;
        if let Some(r) = store.resources.iter_mut().find(|r| r.id == resource_id) {
            r.downloads += 1;
        }
        store.downloads.push((resource_id, user_id));
        Ok(())
    }

    async fn toggle_bookmark(&self, user_id: Uuid, resource_id: Uuid) -> RepoResult<bool> {
        let mut store = self.guard()?;
        let before = store.bookmarks.len();
        store
            .bookmarks
            .retain(|pair| *pair != (user_id, resource_id));
        if store.bookmarks.len() < before {
            return Ok(false);
        }
        store.bookmarks.push((user_id, resource_id));
        Ok(true)
    }

    async fn list_bookmarks(&self, user_id: Uuid) -> RepoResult<Vec<Resource>> {
        let store = self.guard()?;
        Ok(store
            .bookmarks
            .iter()
            .rev()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| {
                store
                    .resources
                    .iter()
                    .find(|r| r.id == *rid && r.is_approved)
                    .cloned()
            })
            .collect())
    }

    async fn list_pending_resources(&self) -> RepoResult<Vec<PendingResource>> {
        let store = self.guard()?;
        Ok(store
            .resources
            .iter()
            .filter(|r| {
                !r.is_approved && r.rejection_reason.as_deref().is_none_or(str::is_empty)
            })
            .map(|r| {
                let uploader = store.users.iter().find(|u| Some(u.id) == r.uploaded_by);
                PendingResource {
                    resource: r.clone(),
                    level_number: Some(300),
                    uploader_email: uploader.map(|u| u.email.clone()),
                    uploader_username: uploader.and_then(|u| u.username.clone()),
                }
            })
            .collect())
    }

    async fn approve_resource(&self, id: Uuid) -> RepoResult<Option<Resource>> {
        let mut store = self.guard()?;
        Ok(store.resources.iter_mut().find(|r| r.id == id).map(|r| {
            r.is_approved = true;
            r.rejection_reason = None;
            r.clone()
        }))
    }

    async fn reject_resource(&self, id: Uuid, reason: &str) -> RepoResult<Option<Resource>> {
        let mut store = self.guard()?;
        Ok(store.resources.iter_mut().find(|r| r.id == id).map(|r| {
            r.is_approved = false;
            r.rejection_reason = Some(reason.to_string());
            r.clone()
        }))
    }

    async fn record_search(&self, user_id: Uuid, query: &str) -> RepoResult<()> {
        self.guard()?.searches.push((user_id, query.to_string()));
        Ok(())
    }

    async fn get_stats(&self) -> RepoResult<LibraryStats> {
        let store = self.guard()?;
        Ok(LibraryStats {
            resource_count: store.resources.len() as i64,
            user_count: store.users.len() as i64,
            download_count: store.downloads.len() as i64,
            view_count: store.views.len() as i64,
            pending_count: store.resources.iter().filter(|r| !r.is_approved).count() as i64,
        })
    }

    async fn list_course_cbts(&self, course_id: i64) -> RepoResult<Vec<Cbt>> {
        Ok(self
            .guard()?
            .cbts
            .iter()
            .filter(|c| c.course_id == course_id && c.is_published)
            .cloned()
            .collect())
    }

    async fn get_published_cbt(&self, id: Uuid) -> RepoResult<Option<Cbt>> {
        Ok(self
            .guard()?
            .cbts
            .iter()
            .find(|c| c.id == id && c.is_published)
            .cloned())
    }

    async fn start_attempt(&self, cbt_id: Uuid, user_id: Uuid) -> RepoResult<CbtAttempt> {
        let attempt = CbtAttempt {
            id: Uuid::new_v4(),
            cbt_id,
            user_id,
            started_at: Utc::now(),
            ..CbtAttempt::default()
        };
        self.guard()?.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn get_user_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> RepoResult<Option<CbtAttempt>> {
        Ok(self
            .guard()?
            .attempts
            .iter()
            .find(|a| a.id == attempt_id && a.user_id == user_id)
            .cloned())
    }

    async fn upsert_answer(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        selected_option_id: Uuid,
    ) -> RepoResult<()> {
        let mut store = self.guard()?;
        store
            .answers
            .retain(|(a, q, _)| !(*a == attempt_id && *q == question_id));
        store
            .answers
            .push((attempt_id, question_id, selected_option_id));
        Ok(())
    }

    async fn calculate_attempt_score(&self, attempt_id: Uuid) -> RepoResult<()> {
        let mut store = self.guard()?;
        let Some(attempt) = store.attempts.iter().find(|a| a.id == attempt_id).cloned() else {
            return Ok(());
        };
        let passing = store
            .cbts
            .iter()
            .find(|c| c.id == attempt.cbt_id)
            .map_or(0, |c| c.passing_score);
        let questions: Vec<&Question> = store
            .questions
            .iter()
            .filter(|q| q.cbt_id == attempt.cbt_id)
            .collect();
        let total: i32 = questions.iter().map(|q| q.points).sum();
        let score: i32 = questions
            .iter()
            .filter(|q| {
                store.answers.iter().any(|(a, qid, oid)| {
                    *a == attempt_id
                        && *qid == q.id
                        && store.options.iter().any(|o| o.id == *oid && o.is_correct)
                })
            })
            .map(|q| q.points)
            .sum();
        let percentage = if total > 0 {
            score as f64 * 100.0 / total as f64
        } else {
            0.0
        };

        if let Some(a) = store.attempts.iter_mut().find(|a| a.id == attempt_id) {
            a.score = Some(score);
            a.total_points = Some(total);
            a.percentage = Some(percentage);
            a.passed = Some(percentage >= passing as f64);
            a.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_attempt_detail(&self, attempt_id: Uuid) -> RepoResult<Option<AttemptDetail>> {
        let store = self.guard()?;
        let Some(attempt) = store.attempts.iter().find(|a| a.id == attempt_id).cloned() else {
            return Ok(None);
        };
        let Some(cbt) = store.cbts.iter().find(|c| c.id == attempt.cbt_id) else {
            return Ok(None);
        };
        let Some(course) = store.courses.iter().find(|c| c.id == cbt.course_id) else {
            return Ok(None);
        };
        Ok(Some(AttemptDetail {
            cbt: AttemptCbt {
                id: cbt.id,
                title: cbt.title.clone(),
                passing_score: cbt.passing_score,
                course: AttemptCourse {
                    id: course.id,
                    course_code: course.course_code.clone(),
                    course_title: course.course_title.clone(),
                },
            },
            attempt,
        }))
    }

    async fn get_attempt_review(&self, attempt_id: Uuid) -> RepoResult<serde_json::Value> {
        let store = self.guard()?;
        let rows: Vec<serde_json::Value> = store
            .answers
            .iter()
            .filter(|(a, _, _)| *a == attempt_id)
            .map(|(_, q, o)| serde_json::json!({ "question_id": q, "selected_option_id": o }))
            .collect();
        Ok(serde_json::Value::Array(rows))
    }

    async fn list_questions(&self, cbt_id: Uuid) -> RepoResult<Vec<QuestionWithOptions>> {
        let store = self.guard()?;
        let mut questions: Vec<&Question> =
            store.questions.iter().filter(|q| q.cbt_id == cbt_id).collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions
            .into_iter()
            .map(|q| with_options(&store, q))
            .collect())
    }

    async fn get_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
    ) -> RepoResult<Option<QuestionWithOptions>> {
        let store = self.guard()?;
        Ok(store
            .questions
            .iter()
            .find(|q| q.id == question_id && q.cbt_id == cbt_id)
            .map(|q| with_options(&store, q)))
    }

    async fn create_question(
        &self,
        cbt_id: Uuid,
        question: &NewQuestion,
    ) -> RepoResult<QuestionWithOptions> {
        let mut store = self.guard()?;
        let last = store
            .questions
            .iter()
            .filter(|q| q.cbt_id == cbt_id)
            .map(|q| q.order_index)
            .max();
        let created = Question {
            id: Uuid::new_v4(),
            cbt_id,
            question_text: question.question_text.clone(),
            question_type: question.question_type.clone(),
            points: question.points,
            explanation: question.explanation.clone(),
            shuffle_options: question.shuffle_options,
            order_index: next_order_index(last),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        for (index, opt) in question.options.iter().enumerate() {
            store.options.push(QuestionOption {
                id: Uuid::new_v4(),
                question_id: created.id,
                option_text: opt.option_text.clone(),
                is_correct: opt.is_correct,
                order_index: index as i32,
            });
        }
        store.questions.push(created.clone());
        Ok(with_options(&store, &created))
    }

    async fn update_question(
        &self,
        cbt_id: Uuid,
        question_id: Uuid,
        changes: &QuestionPayload,
    ) -> RepoResult<Option<QuestionWithOptions>> {
        let mut store = self.guard()?;
        let Some(q) = store
            .questions
            .iter_mut()
            .find(|q| q.id == question_id && q.cbt_id == cbt_id)
        else {
            return Ok(None);
        };
        if let Some(text) = &changes.question_text {
            q.question_text = text.clone();
        }
        if let Some(kind) = &changes.question_type {
            q.question_type = kind.clone();
        }
        if let Some(points) = changes.points {
            q.points = points;
        }
        if let Some(explanation) = &changes.explanation {
            q.explanation = explanation.clone();
        }
        if let Some(shuffle) = changes.shuffle_options {
            q.shuffle_options = shuffle;
        }
        q.updated_at = Utc::now();
        let updated = q.clone();

        if let Some(options) = changes.replacement_options() {
            store.options.retain(|o| o.question_id != question_id);
            for (index, opt) in options.iter().enumerate() {
                store.options.push(QuestionOption {
                    id: Uuid::new_v4(),
                    question_id,
                    option_text: opt.option_text.clone(),
                    is_correct: opt.is_correct,
                    order_index: index as i32,
                });
            }
        }
        Ok(Some(with_options(&store, &updated)))
    }

    async fn delete_question(&self, cbt_id: Uuid, question_id: Uuid) -> RepoResult<bool> {
        let mut store = self.guard()?;
        let before = store.questions.len();
        store
            .questions
            .retain(|q| !(q.id == question_id && q.cbt_id == cbt_id));
        let deleted = store.questions.len() < before;
        if deleted {
            store.options.retain(|o| o.question_id != question_id);
        }
        Ok(deleted)
    }
}

// --- State and identity helpers ---

pub fn test_state(repo: Arc<InMemoryRepo>) -> AppState {
    test_state_with_storage(repo, MockStorageService::new())
}

pub fn test_state_with_storage(repo: Arc<InMemoryRepo>, storage: MockStorageService) -> AppState {
    AppState {
        repo,
        storage: Arc::new(storage),
        config: AppConfig::default(),
        preview: Arc::new(PreviewAssets::default()),
    }
}

pub fn student() -> AuthUser {
    AuthUser {
        id: STUDENT_ID,
        role: STUDENT_ROLE.to_string(),
    }
}

pub fn other_student() -> AuthUser {
    AuthUser {
        id: OTHER_STUDENT_ID,
        role: STUDENT_ROLE.to_string(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        role: ADMIN_ROLE.to_string(),
    }
}

/// Converts any handler output into its status and decoded JSON body.
pub async fn read_json<T: DeserializeOwned>(response: impl IntoResponse) -> (axum::http::StatusCode, T) {
    let response: Response = response.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Status and `error` message of a failed handler call.
pub async fn read_error(err: campus_library::AppError) -> (axum::http::StatusCode, String) {
    let (status, body): (_, campus_library::error::ErrorBody) = read_json(err).await;
    (status, body.error)
}
