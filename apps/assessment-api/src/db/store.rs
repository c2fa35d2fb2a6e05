use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::error::ApiError;
use crate::models::catalog::{CatalogKind, RegistryInstitution, DEFAULT_CATALOG_ID};
use crate::models::student::{Student, StudentDraft};
use crate::models::user::{Role, User};

/// Everything needed to create a user and its student profile in one go.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    /// Argon2 PHC string; only used when the user does not exist yet.
    pub password_hash: String,
    pub role: Role,
    pub student: StudentDraft,
}

/// Persistence used by authentication and provisioning.
///
/// Backed by Postgres in production and an in-memory map in tests.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_student_by_npm(&self, npm: &str) -> Result<Option<Student>, ApiError>;
    async fn find_student_by_user(&self, user_id: i32) -> Result<Option<Student>, ApiError>;
    async fn find_user(&self, user_id: i32) -> Result<Option<User>, ApiError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;

    async fn find_institution(&self, id_sms: &str)
        -> Result<Option<RegistryInstitution>, ApiError>;
    async fn find_institutions(&self, ids: &[String])
        -> Result<Vec<RegistryInstitution>, ApiError>;

    /// Exact-name lookup in the faculty, department or major catalog.
    async fn catalog_id(&self, kind: CatalogKind, name: &str) -> Result<Option<i32>, ApiError>;

    /// Find-or-create the user, then insert the student, atomically.
    ///
    /// A student that already exists for the NPM is a `409` conflict.
    async fn create_student_account(&self, account: NewAccount)
        -> Result<(User, Student), ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (for tests / running without Postgres)
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryData {
    users: Vec<User>,
    students: Vec<Student>,
    institutions: HashMap<String, RegistryInstitution>,
    catalog: HashMap<CatalogKind, Vec<(i32, String)>>,
}

pub struct MemoryAccountStore {
    data: Mutex<MemoryData>,
}

impl MemoryAccountStore {
    /// An empty store seeded with the `unknown` catalog rows (id 1).
    pub fn new() -> Self {
        let mut data = MemoryData::default();
        for kind in [CatalogKind::Faculty, CatalogKind::Department, CatalogKind::Major] {
            data.catalog
                .insert(kind, vec![(DEFAULT_CATALOG_ID, "unknown".to_string())]);
        }
        Self {
            data: Mutex::new(data),
        }
    }

    /// Add a catalog row and return its id.
    pub fn insert_catalog(&self, kind: CatalogKind, name: &str) -> i32 {
        let mut data = self.data.lock();
        let rows = data.catalog.entry(kind).or_default();
        let id = rows.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        rows.push((id, name.to_string()));
        id
    }

    pub fn insert_institution(&self, institution: RegistryInstitution) {
        self.data
            .lock()
            .institutions
            .insert(institution.id_sms.clone(), institution);
    }

    pub fn students(&self) -> Vec<Student> {
        self.data.lock().students.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.data.lock().users.clone()
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_student_by_npm(&self, npm: &str) -> Result<Option<Student>, ApiError> {
        Ok(self
            .data
            .lock()
            .students
            .iter()
            .find(|s| s.npm == npm)
            .cloned())
    }

    async fn find_student_by_user(&self, user_id: i32) -> Result<Option<Student>, ApiError> {
        Ok(self
            .data
            .lock()
            .students
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<User>, ApiError> {
        Ok(self
            .data
            .lock()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .data
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_institution(
        &self,
        id_sms: &str,
    ) -> Result<Option<RegistryInstitution>, ApiError> {
        Ok(self.data.lock().institutions.get(id_sms).cloned())
    }

    async fn find_institutions(
        &self,
        ids: &[String],
    ) -> Result<Vec<RegistryInstitution>, ApiError> {
        let data = self.data.lock();
        Ok(ids
            .iter()
            .filter_map(|id| data.institutions.get(id).cloned())
            .collect())
    }

    async fn catalog_id(&self, kind: CatalogKind, name: &str) -> Result<Option<i32>, ApiError> {
        Ok(self.data.lock().catalog.get(&kind).and_then(|rows| {
            rows.iter()
                .find(|(_, row_name)| row_name == name)
                .map(|(id, _)| *id)
        }))
    }

    async fn create_student_account(
        &self,
        account: NewAccount,
    ) -> Result<(User, Student), ApiError> {
        let mut data = self.data.lock();
        let now = Utc::now();

        if data.students.iter().any(|s| s.npm == account.student.npm) {
            return Err(ApiError::conflict("npm", "Student already exists"));
        }

        let user = match data.users.iter().find(|u| u.username == account.username) {
            Some(existing) => existing.clone(),
            None => {
                let user = User {
                    id: data.users.len() as i32 + 1,
                    username: account.username.clone(),
                    password: account.password_hash.clone(),
                    role: account.role.as_str().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                data.users.push(user.clone());
                user
            }
        };

        if data.students.iter().any(|s| s.user_id == user.id) {
            return Err(ApiError::conflict(
                "user_id",
                "User already has a student profile",
            ));
        }

        let draft = account.student;
        let student = Student {
            id: data.students.len() as i32 + 1,
            npm: draft.npm,
            name: draft.name,
            email: draft.email,
            gender: draft.gender,
            degree: draft.degree,
            enrollment_year: draft.enrollment_year,
            major_id: draft.major_id,
            department_id: draft.department_id,
            faculty_id: draft.faculty_id,
            user_id: user.id,
            created_at: now,
            updated_at: now,
        };
        data.students.push(student.clone());

        Ok((user, student))
    }
}
