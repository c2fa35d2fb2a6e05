use diesel::prelude::*;

use crate::db::schema::registry_institutions;

/// Local catalog row id used when a name cannot be resolved.
pub const DEFAULT_CATALOG_ID: i32 = 1;

/// Which local catalog table a name lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Faculty,
    Department,
    Major,
}

/// Mirror row of an OneData institution (SMS) record.
///
/// `type_code` orders the hierarchy: faculty < department < major.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = registry_institutions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RegistryInstitution {
    pub id_sms: String,
    pub name: String,
    pub type_code: i16,
    pub faculty_sms: Option<String>,
    pub department_sms: Option<String>,
}
