use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

// --- Identity ---

/// User
///
/// A row of `public.users`. The `id` mirrors the Supabase `auth.users` id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    // RBAC field: 'student' or 'admin'.
    pub role: String,
}

/// RegisterUserRequest
///
/// Input payload for `POST /register`. The password is forwarded to Supabase Auth
/// and never stored or logged here. New accounts always receive the 'student' role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

// --- Academic Catalog ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Faculty {
    pub id: i64,
    pub full_name: String,
    pub short_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Department {
    pub id: i64,
    pub faculty_id: i64,
    pub full_name: String,
    pub short_name: String,
    pub description: Option<String>,
}

/// AcademicLevel
///
/// A year of study inside a department, e.g. `level_number = 300`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AcademicLevel {
    pub id: i64,
    pub department_id: i64,
    pub level_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: i64,
    pub level_id: i64,
    pub course_code: String,
    pub course_title: String,
    pub description: Option<String>,
}

/// DepartmentForm
///
/// Body of the admin department create/update endpoints. Every field is required;
/// they are optional here so a missing field is reported as a 400 rather than a
/// deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DepartmentForm {
    pub full_name: Option<String>,
    pub short_name: Option<String>,
    pub description: Option<String>,
}

/// Validated department fields, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentInput {
    pub full_name: String,
    pub short_name: String,
    pub description: String,
}

impl DepartmentForm {
    pub fn validate(self) -> Result<DepartmentInput, AppError> {
        match (
            non_blank(self.full_name),
            non_blank(self.short_name),
            non_blank(self.description),
        ) {
            (Some(full_name), Some(short_name), Some(description)) => Ok(DepartmentInput {
                full_name,
                short_name,
                description,
            }),
            _ => Err(AppError::bad_request("Please fill in all required fields")),
        }
    }
}

/// CourseForm
///
/// Body of the admin course create/update endpoints. Code and title are required.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CourseForm {
    pub course_code: Option<String>,
    pub course_title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseInput {
    pub course_code: String,
    pub course_title: String,
    pub description: Option<String>,
}

impl CourseForm {
    pub fn validate(self) -> Result<CourseInput, AppError> {
        match (non_blank(self.course_code), non_blank(self.course_title)) {
            (Some(course_code), Some(course_title)) => Ok(CourseInput {
                course_code,
                course_title,
                description: non_blank(self.description),
            }),
            _ => Err(AppError::bad_request(
                "Course code and title are required",
            )),
        }
    }
}

// --- Resources ---

/// Resource
///
/// An uploaded file attached to a course. Only visible to the public once
/// `is_approved` is set by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Resource {
    pub id: Uuid,
    pub course_id: i64,
    pub uploaded_by: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    // 'pdf' | 'document' | 'presentation' | 'video' | ...
    pub file_type: String,
    // Object key in the resource bucket.
    pub storage_key: String,
    pub is_approved: bool,
    pub rejection_reason: Option<String>,
    pub downloads: i32,
    #[ts(type = "string")]
    pub upload_date: DateTime<Utc>,
}

/// PendingResource
///
/// A resource awaiting moderation, joined with its course level and uploader.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PendingResource {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub resource: Resource,
    pub level_number: Option<i32>,
    pub uploader_email: Option<String>,
    pub uploader_username: Option<String>,
}

/// ResourceShelf
///
/// The resources of one file type within a course, as displayed in a single row
/// of the course page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResourceShelf {
    pub file_type: String,
    pub title: String,
    // "1 file" / "N files"; always agrees with `resources.len()`.
    pub count_label: String,
    pub resources: Vec<Resource>,
}

const SHELF_ORDER: [(&str, &str); 4] = [
    ("pdf", "PDF Files"),
    ("document", "Documents"),
    ("presentation", "Presentations"),
    ("video", "Videos"),
];

impl ResourceShelf {
    /// Groups resources into one shelf per file type. Known types come first in a
    /// fixed order, the rest follow alphabetically. Empty input yields no shelves.
    pub fn group(resources: Vec<Resource>) -> Vec<ResourceShelf> {
        let mut buckets: std::collections::BTreeMap<String, Vec<Resource>> =
            std::collections::BTreeMap::new();
        for resource in resources {
            buckets
                .entry(resource.file_type.clone())
                .or_default()
                .push(resource);
        }

        let mut shelves: Vec<ResourceShelf> = buckets
            .into_iter()
            .map(|(file_type, resources)| ResourceShelf {
                title: shelf_title(&file_type),
                count_label: count_label(resources.len()),
                file_type,
                resources,
            })
            .collect();

        shelves.sort_by_key(|shelf| {
            SHELF_ORDER
                .iter()
                .position(|(kind, _)| *kind == shelf.file_type)
                .unwrap_or(SHELF_ORDER.len())
        });
        shelves
    }
}

fn shelf_title(file_type: &str) -> String {
    SHELF_ORDER
        .iter()
        .find(|(kind, _)| *kind == file_type)
        .map(|(_, title)| title.to_string())
        .unwrap_or_else(|| format!("{} Files", capitalize(file_type)))
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", count)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// CreateResourceRequest
///
/// Registers a file already uploaded through the presigned URL flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateResourceRequest {
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    // Key returned by POST /api/resources/upload-url.
    #[serde(default)]
    pub storage_key: Option<String>,
}

/// A resource registration that passed validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewResource {
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_type: String,
    pub storage_key: String,
}

impl CreateResourceRequest {
    pub fn validate(self) -> Result<NewResource, AppError> {
        let Some(course_id) = self.course_id else {
            return Err(AppError::bad_request("Course is required"));
        };
        let title = non_blank(self.title);
        let file_type = non_blank(self.file_type).map(|t| t.to_lowercase());
        let (Some(title), Some(file_type)) = (title, file_type) else {
            return Err(AppError::bad_request("Title and file type are required"));
        };
        let storage_key = self.storage_key.unwrap_or_default();
        if !storage_key.starts_with(crate::storage::RESOURCE_PREFIX) {
            return Err(AppError::bad_request("Invalid storage key"));
        }
        Ok(NewResource {
            course_id,
            title,
            description: non_blank(self.description),
            file_type,
            storage_key,
        })
    }
}

/// UploadUrlRequest
///
/// Input for a short-lived upload URL (POST /api/resources/upload-url).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct UploadUrlRequest {
    /// Original filename, used to derive the object extension.
    #[schema(example = "lecture_notes.pdf")]
    pub filename: String,
    /// MIME type the upload is constrained to.
    #[schema(example = "application/pdf")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct DownloadResponse {
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct RejectResourceRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default, PartialEq)]
#[ts(export)]
pub struct BookmarkResponse {
    pub bookmarked: bool,
}

// --- Search ---

/// SearchRecordRequest
///
/// `query` is kept loose so a non-string value is reported as "Invalid query".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct SearchRecordRequest {
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub query: Option<serde_json::Value>,
}

impl SearchRecordRequest {
    /// The trimmed query, or None when it is missing, not a string, or blank.
    pub fn trimmed_query(&self) -> Option<String> {
        match &self.query {
            Some(serde_json::Value::String(q)) if !q.trim().is_empty() => {
                Some(q.trim().to_string())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default, PartialEq)]
#[ts(export)]
pub struct SearchRecordResponse {
    pub success: bool,
    pub recorded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default, PartialEq)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
}

// --- Dashboard ---

/// LibraryStats
///
/// Row counts for the admin dashboard (GET /api/stats/dbmcl).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LibraryStats {
    pub resource_count: i64,
    pub user_count: i64,
    pub download_count: i64,
    pub view_count: i64,
    // Resources with `is_approved = false`.
    pub pending_count: i64,
}

// --- Computer-Based Tests ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Cbt {
    pub id: Uuid,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub passing_score: i32,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Question {
    pub id: Uuid,
    pub cbt_id: Uuid,
    pub question_text: String,
    pub question_type: String,
    pub points: i32,
    pub explanation: Option<String>,
    pub shuffle_options: bool,
    pub order_index: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct QuestionOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

/// QuestionWithOptions
///
/// A question row with its options nested under `question_options`, both ordered
/// by `order_index`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub question_options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OptionPayload {
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// QuestionPayload
///
/// Body of the admin question create (POST) and partial update (PATCH) endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuestionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    /// Absent leaves the explanation alone; an explicit `null` clears it.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub explanation: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionPayload>>,
}

/// Reads a present field as `Some`, so `null` becomes `Some(None)`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A question that passed creation checks, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: String,
    pub points: i32,
    pub explanation: Option<String>,
    pub shuffle_options: bool,
    pub options: Vec<OptionPayload>,
}

impl QuestionPayload {
    /// Checks a creation payload: text and type present, at least two options,
    /// at least one of them correct. Points default to 1.
    pub fn into_new_question(self) -> Result<NewQuestion, AppError> {
        let (question_text, question_type) =
            match (non_blank(self.question_text), non_blank(self.question_type)) {
                (Some(text), Some(kind)) => (text, kind),
                _ => {
                    return Err(AppError::bad_request(
                        "Question text and type are required",
                    ));
                }
            };

        let options = self.options.unwrap_or_default();
        if options.len() < 2 {
            return Err(AppError::bad_request("At least 2 options are required"));
        }
        if !options.iter().any(|opt| opt.is_correct) {
            return Err(AppError::bad_request(
                "At least one option must be marked as correct",
            ));
        }

        Ok(NewQuestion {
            question_text,
            question_type,
            points: self.points.filter(|p| *p > 0).unwrap_or(1),
            explanation: non_blank(self.explanation.flatten()),
            shuffle_options: self.shuffle_options.unwrap_or(false),
            options,
        })
    }

    /// The replacement option set for a PATCH, if one was supplied.
    pub fn replacement_options(&self) -> Option<&[OptionPayload]> {
        self.options.as_deref().filter(|opts| !opts.is_empty())
    }
}

/// The order index given to a question appended after `last`.
pub fn next_order_index(last: Option<i32>) -> i32 {
    last.map_or(0, |idx| idx + 1)
}

/// CbtAttempt
///
/// A user's run through a CBT. Score columns are filled by the
/// `calculate_attempt_score` procedure on submission.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CbtAttempt {
    pub id: Uuid,
    pub cbt_id: Uuid,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub started_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub total_points: Option<i32>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
}

impl CbtAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AttemptCourse {
    pub id: i64,
    pub course_code: String,
    pub course_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AttemptCbt {
    pub id: Uuid,
    pub title: String,
    pub passing_score: i32,
    #[serde(rename = "courses")]
    pub course: AttemptCourse,
}

/// AttemptDetail
///
/// An attempt with its CBT and course summary nested under `cbts.courses`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: CbtAttempt,
    #[serde(rename = "cbts")]
    pub cbt: AttemptCbt,
}

/// AttemptReview
///
/// Response of the review endpoint. `review` is produced by the
/// `get_attempt_review` procedure and passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AttemptReview {
    pub attempt: AttemptDetail,
    #[schema(value_type = Object)]
    pub review: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnswerRequest {
    pub question_id: Option<Uuid>,
    pub selected_option_id: Option<Uuid>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
