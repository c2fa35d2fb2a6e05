//! Find-or-create the local student behind an SSO claim.
//!
//! An existing student is returned as is. Otherwise the student is built from
//! registry data when the registry answers and the institution hierarchy
//! resolves; any gap along the way falls back to default provisioning.

pub mod institutions;
pub mod names;

use futures_util::future::try_join3;

use crate::auth::password::hash_password;
use crate::auth::sso::SsoClaim;
use crate::db::store::{AccountStore, NewAccount};
use crate::error::ApiError;
use crate::models::catalog::{CatalogKind, DEFAULT_CATALOG_ID};
use crate::models::student::{Student, StudentDraft};
use crate::models::user::Role;
use crate::registry::RegistryGateway;

use institutions::{resolve_placement, Placement};
use names::{enrollment_year, gender_from_code, proper_case};

const UNKNOWN: &str = "unknown";

/// Return the student for the claim's NPM, creating user and student if needed.
pub async fn provision_student(
    store: &dyn AccountStore,
    registry: &RegistryGateway,
    claim: &SsoClaim,
) -> Result<Student, ApiError> {
    let npm = claim.username.as_str();
    if let Some(existing) = store.find_student_by_npm(npm).await? {
        return Ok(existing);
    }

    let year = enrollment_year(npm)?;
    let draft = match registry_draft(store, registry, claim, &year).await? {
        Some(draft) => draft,
        None => default_draft(claim, year),
    };

    let account = NewAccount {
        username: npm.to_string(),
        password_hash: hash_password(npm)?,
        role: Role::Student,
        student: draft,
    };

    match store.create_student_account(account).await {
        Ok((user, student)) => {
            tracing::info!(%npm, user_id = user.id, student_id = student.id, "student provisioned");
            Ok(student)
        }
        Err(err) if err.is_conflict() => {
            tracing::info!(%npm, "student created concurrently, re-reading");
            store.find_student_by_npm(npm).await?.ok_or(err)
        }
        Err(err) => Err(err),
    }
}

/// Build the student from registry data. `Ok(None)` selects default provisioning.
async fn registry_draft(
    store: &dyn AccountStore,
    registry: &RegistryGateway,
    claim: &SsoClaim,
    year: &str,
) -> Result<Option<StudentDraft>, ApiError> {
    let npm = claim.username.as_str();

    let token = match registry.service_token().await {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(%err, %npm, "registry unavailable, using default provisioning");
            return Ok(None);
        }
    };

    let Some(external_id) = claim.student_id.as_deref() else {
        tracing::warn!(%npm, "claim has no external student id, using default provisioning");
        return Ok(None);
    };

    let detail = match registry.fetch_student_detail(&token, external_id).await {
        Ok(detail) => detail,
        Err(err) => {
            tracing::warn!(%err, %npm, "student detail unavailable, using default provisioning");
            return Ok(None);
        }
    };

    let Some(id_sms) = detail.id_sms.as_deref() else {
        tracing::warn!(%npm, "student detail has no institution, using default provisioning");
        return Ok(None);
    };
    let Some(placement) = resolve_placement(store, id_sms).await? else {
        return Ok(None);
    };

    let (major_id, department_id, faculty_id) = local_ids(store, &placement).await?;

    Ok(Some(StudentDraft {
        npm: npm.to_string(),
        name: claim
            .display_name
            .as_deref()
            .map(proper_case)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        email: claim.email.clone(),
        gender: gender_from_code(detail.jk.as_deref()).to_string(),
        degree: detail
            .nm_jenj_didik
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        enrollment_year: year.to_string(),
        major_id,
        department_id,
        faculty_id,
    }))
}

/// Map placement names onto local catalog ids, defaulting each miss to id 1.
async fn local_ids(
    store: &dyn AccountStore,
    placement: &Placement,
) -> Result<(i32, i32, i32), ApiError> {
    let (major, department, faculty) = try_join3(
        store.catalog_id(CatalogKind::Major, &placement.major),
        store.catalog_id(CatalogKind::Department, &placement.department),
        store.catalog_id(CatalogKind::Faculty, &placement.faculty),
    )
    .await?;

    Ok((
        major.unwrap_or(DEFAULT_CATALOG_ID),
        department.unwrap_or(DEFAULT_CATALOG_ID),
        faculty.unwrap_or(DEFAULT_CATALOG_ID),
    ))
}

fn default_draft(claim: &SsoClaim, year: String) -> StudentDraft {
    StudentDraft {
        npm: claim.username.clone(),
        name: claim
            .display_name
            .as_deref()
            .map(proper_case)
            .unwrap_or_default(),
        email: claim.email.clone(),
        gender: UNKNOWN.to_string(),
        degree: UNKNOWN.to_string(),
        enrollment_year: year,
        major_id: DEFAULT_CATALOG_ID,
        department_id: DEFAULT_CATALOG_ID,
        faculty_id: DEFAULT_CATALOG_ID,
    }
}
