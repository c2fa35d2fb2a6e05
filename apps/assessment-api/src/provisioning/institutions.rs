//! Resolve a student's faculty, department and major from the institution mirror.

use crate::db::store::AccountStore;
use crate::error::ApiError;
use crate::models::catalog::RegistryInstitution;

/// Institution names for the three levels a student belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub faculty: String,
    pub department: String,
    pub major: String,
}

/// Look up the study program and its parents.
///
/// `Ok(None)` means the hierarchy could not be resolved and the caller should
/// provision with defaults.
pub async fn resolve_placement(
    store: &dyn AccountStore,
    id_sms: &str,
) -> Result<Option<Placement>, ApiError> {
    let Some(main) = store.find_institution(id_sms).await? else {
        tracing::warn!(%id_sms, "institution not found in registry mirror");
        return Ok(None);
    };

    let mut ids = vec![main.id_sms.clone()];
    for id in [main.faculty_sms, main.department_sms].into_iter().flatten() {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let rows = store.find_institutions(&ids).await?;
    let placement = assign_positions(rows);
    if placement.is_none() {
        tracing::warn!(%id_sms, "institution hierarchy is incomplete");
    }
    Ok(placement)
}

/// Order rows by type code and read them as faculty, department, major.
///
/// Requires exactly three rows with strictly ascending type codes.
pub fn assign_positions(mut rows: Vec<RegistryInstitution>) -> Option<Placement> {
    rows.sort_by_key(|row| row.type_code);
    if rows.len() != 3 || rows.windows(2).any(|w| w[0].type_code >= w[1].type_code) {
        return None;
    }

    let mut names = rows.into_iter().map(|row| row.name);
    Some(Placement {
        faculty: names.next()?,
        department: names.next()?,
        major: names.next()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryAccountStore;

    fn row(id: &str, name: &str, type_code: i16) -> RegistryInstitution {
        RegistryInstitution {
            id_sms: id.to_string(),
            name: name.to_string(),
            type_code,
            faculty_sms: None,
            department_sms: None,
        }
    }

    #[test]
    fn rows_are_assigned_by_type_order() {
        let placement = assign_positions(vec![
            row("m", "Teknik Informatika", 3),
            row("f", "FT", 1),
            row("d", "Teknik Elektro", 2),
        ])
        .unwrap();
        assert_eq!(placement.faculty, "FT");
        assert_eq!(placement.department, "Teknik Elektro");
        assert_eq!(placement.major, "Teknik Informatika");
    }

    #[test]
    fn wrong_count_or_duplicate_type_is_rejected() {
        assert_eq!(assign_positions(vec![row("f", "FT", 1), row("m", "TI", 3)]), None);
        assert_eq!(
            assign_positions(vec![row("f", "FT", 1), row("d", "TE", 3), row("m", "TI", 3)]),
            None
        );
    }

    #[tokio::test]
    async fn resolves_through_parent_links() {
        let store = MemoryAccountStore::new();
        store.insert_institution(RegistryInstitution {
            faculty_sms: Some("f".to_string()),
            department_sms: Some("d".to_string()),
            ..row("m", "Teknik Informatika", 3)
        });
        store.insert_institution(row("f", "FT", 1));
        store.insert_institution(row("d", "Teknik Elektro", 2));

        let placement = resolve_placement(&store, "m").await.unwrap().unwrap();
        assert_eq!(placement.major, "Teknik Informatika");
        assert_eq!(placement.faculty, "FT");
    }

    #[tokio::test]
    async fn missing_main_or_parent_yields_none() {
        let store = MemoryAccountStore::new();
        assert_eq!(resolve_placement(&store, "m").await.unwrap(), None);

        store.insert_institution(RegistryInstitution {
            faculty_sms: Some("f".to_string()),
            department_sms: None,
            ..row("m", "Teknik Informatika", 3)
        });
        store.insert_institution(row("f", "FT", 1));
        assert_eq!(resolve_placement(&store, "m").await.unwrap(), None);
    }
}
