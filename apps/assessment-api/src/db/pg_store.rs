use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;

use crate::db::pool::DbPool;
use crate::db::schema::{departments, faculties, majors, registry_institutions, students, users};
use crate::db::store::{AccountStore, NewAccount};
use crate::error::ApiError;
use crate::models::catalog::{CatalogKind, RegistryInstitution};
use crate::models::student::{NewStudent, Student};
use crate::models::user::{NewUser, User};

/// Postgres-backed [`AccountStore`].
#[derive(Clone)]
pub struct PgAccountStore {
    pool: DbPool,
}

impl PgAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_student_by_npm(&self, npm: &str) -> Result<Option<Student>, ApiError> {
        let mut conn = self.pool.get().await?;
        let student = students::table
            .filter(students::npm.eq(npm))
            .select(Student::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(student)
    }

    async fn find_student_by_user(&self, user_id: i32) -> Result<Option<Student>, ApiError> {
        let mut conn = self.pool.get().await?;
        let student = students::table
            .filter(students::user_id.eq(user_id))
            .select(Student::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(student)
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<User>, ApiError> {
        let mut conn = self.pool.get().await?;
        let user = users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let mut conn = self.pool.get().await?;
        let user = users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_institution(
        &self,
        id_sms: &str,
    ) -> Result<Option<RegistryInstitution>, ApiError> {
        let mut conn = self.pool.get().await?;
        let institution = registry_institutions::table
            .find(id_sms)
            .select(RegistryInstitution::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(institution)
    }

    async fn find_institutions(
        &self,
        ids: &[String],
    ) -> Result<Vec<RegistryInstitution>, ApiError> {
        let mut conn = self.pool.get().await?;
        let rows = registry_institutions::table
            .filter(registry_institutions::id_sms.eq_any(ids))
            .select(RegistryInstitution::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows)
    }

    async fn catalog_id(&self, kind: CatalogKind, name: &str) -> Result<Option<i32>, ApiError> {
        let mut conn = self.pool.get().await?;
        let id = match kind {
            CatalogKind::Faculty => {
                faculties::table
                    .filter(faculties::name.eq(name))
                    .select(faculties::id)
                    .first::<i32>(&mut conn)
                    .await
            }
            CatalogKind::Department => {
                departments::table
                    .filter(departments::name.eq(name))
                    .select(departments::id)
                    .first::<i32>(&mut conn)
                    .await
            }
            CatalogKind::Major => {
                majors::table
                    .filter(majors::name.eq(name))
                    .select(majors::id)
                    .first::<i32>(&mut conn)
                    .await
            }
        }
        .optional()?;
        Ok(id)
    }

    async fn create_student_account(
        &self,
        account: NewAccount,
    ) -> Result<(User, Student), ApiError> {
        let mut conn = self.pool.get().await?;

        let (user, student) = conn
            .transaction::<_, ApiError, _>(|conn| {
                async move {
                    // 1. Find or create the user.
                    let existing: Option<User> = users::table
                        .filter(users::username.eq(&account.username))
                        .select(User::as_select())
                        .first(conn)
                        .await
                        .optional()?;

                    let user = match existing {
                        Some(user) => user,
                        None => {
                            diesel::insert_into(users::table)
                                .values(NewUser {
                                    username: &account.username,
                                    password: &account.password_hash,
                                    role: account.role.as_str(),
                                })
                                .returning(User::as_returning())
                                .get_result(conn)
                                .await?
                        }
                    };

                    // 2. Insert the student linked to it.
                    let student: Student = diesel::insert_into(students::table)
                        .values(NewStudent::from_draft(&account.student, user.id))
                        .returning(Student::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok((user, student))
                }
                .scope_boxed()
            })
            .await?;

        Ok((user, student))
    }
}
