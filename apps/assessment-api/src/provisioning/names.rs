use crate::error::{ApiError, FieldError};

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word starts at the beginning of the string or after any character that
/// is not alphanumeric, so `"o'neil-budi"` becomes `"O'Neil-Budi"`.
pub fn proper_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_boundary = true;
    for c in name.chars() {
        if at_boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_boundary = !c.is_alphanumeric();
    }
    out
}

/// `"20"` followed by the first two characters of the NPM.
pub fn enrollment_year(npm: &str) -> Result<String, ApiError> {
    let prefix: String = npm.chars().take(2).collect();
    if prefix.chars().count() < 2 {
        return Err(ApiError::validation(vec![FieldError {
            field: "username".to_string(),
            message: "NPM harus terdiri dari minimal dua karakter".to_string(),
        }]));
    }
    Ok(format!("20{prefix}"))
}

/// Registry sex code to stored gender: `L` is male, anything else female.
pub fn gender_from_code(code: Option<&str>) -> &'static str {
    match code {
        Some("L") => "male",
        _ => "female",
    }
}
