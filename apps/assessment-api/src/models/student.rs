use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::students;

/// A student profile, one per NPM.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i32,
    pub npm: String,
    pub name: String,
    pub email: Option<String>,
    pub gender: String,
    pub degree: String,
    pub enrollment_year: String,
    pub major_id: i32,
    pub department_id: i32,
    pub faculty_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student fields decided by provisioning, before the owning user exists.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentDraft {
    pub npm: String,
    pub name: String,
    pub email: Option<String>,
    pub gender: String,
    pub degree: String,
    pub enrollment_year: String,
    pub major_id: i32,
    pub department_id: i32,
    pub faculty_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = students)]
pub struct NewStudent<'a> {
    pub npm: &'a str,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub gender: &'a str,
    pub degree: &'a str,
    pub enrollment_year: &'a str,
    pub major_id: i32,
    pub department_id: i32,
    pub faculty_id: i32,
    pub user_id: i32,
}

impl<'a> NewStudent<'a> {
    pub fn from_draft(draft: &'a StudentDraft, user_id: i32) -> Self {
        Self {
            npm: &draft.npm,
            name: &draft.name,
            email: draft.email.as_deref(),
            gender: &draft.gender,
            degree: &draft.degree,
            enrollment_year: &draft.enrollment_year,
            major_id: draft.major_id,
            department_id: draft.department_id,
            faculty_id: draft.faculty_id,
            user_id,
        }
    }
}
