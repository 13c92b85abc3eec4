//! Request-shape validation.
//!
//! Rules run after authentication and before any handler logic. Every failing
//! field is reported at once as a 400 with `{"errors": [{field, message}]}`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use url::Url;
use crate::error::{AppError, FieldError};

const MAX_LIST_ITEMS: usize = 20;

/// Collects field errors across several checks.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn non_empty_string(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = lookup(doc, path)
            .and_then(Value::as_str)
            .map_or(false, |s| !s.trim().is_empty());
        self.check(ok, path, "must be a non-empty string")
    }

    pub fn email(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = lookup(doc, path).and_then(Value::as_str).map_or(false, is_email);
        self.check(ok, path, "must be a valid email address")
    }

    pub fn integer(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = match lookup(doc, path) {
            Some(Value::Number(n)) => n.is_i64() || n.is_u64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        };
        self.check(ok, path, "must be an integer")
    }

    pub fn iso8601(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = lookup(doc, path).and_then(Value::as_str).map_or(false, is_iso8601);
        self.check(ok, path, "must be an ISO 8601 date")
    }

    pub fn boolean(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = match lookup(doc, path) {
            Some(Value::Bool(_)) => true,
            Some(Value::String(s)) => matches!(s.as_str(), "true" | "false" | "0" | "1"),
            _ => false,
        };
        self.check(ok, path, "must be a boolean")
    }

    pub fn string_array(&mut self, doc: &Value, path: &str, min: usize, max: usize) -> &mut Self {
        match lookup(doc, path).and_then(Value::as_array) {
            Some(items) => {
                self.check(
                    (min..=max).contains(&items.len()),
                    path,
                    &format!("must contain between {} and {} items", min, max),
                );
                for (i, item) in items.iter().enumerate() {
                    self.check(item.is_string(), &format!("{}[{}]", path, i), "must be a string");
                }
            }
            None => {
                self.check(false, path, "must be an array");
            }
        }
        self
    }

    pub fn optional_string(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = match lookup(doc, path) {
            None | Some(Value::Null) => true,
            Some(v) => v.is_string(),
        };
        self.check(ok, path, "must be a string")
    }

    pub fn optional_url(&mut self, doc: &Value, path: &str) -> &mut Self {
        let ok = match lookup(doc, path) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => is_url(s),
            Some(_) => false,
        };
        self.check(ok, path, "must be a valid URL")
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(std::mem::take(&mut self.errors)))
        }
    }
}

/// Resolves a dotted path such as `personal.fullName`.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, key| node.get(key))
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), AppError> {
    let username_len = username.chars().count();
    Validator::new()
        .check(
            !username.is_empty() && username.chars().all(|c| c.is_ascii_alphanumeric()),
            "username",
            "Username must be alphanumeric",
        )
        .check(
            (3..=30).contains(&username_len),
            "username",
            "Username must be between 3 and 30 characters",
        )
        .check(is_email(email), "email", "must be a valid email address")
        .check(
            is_strong_password(password),
            "password",
            "Password must be at least 8 characters and include upper and lower case letters, a number and a symbol",
        )
        .finish()
}

pub fn validate_login(identifier: &str, password: &str) -> Result<(), AppError> {
    Validator::new()
        .check(!identifier.trim().is_empty(), "emailOrUsername", "must not be empty")
        .check(!password.is_empty(), "password", "must not be empty")
        .finish()
}

/// Field schema for a stored resume document. Unknown fields are allowed and
/// kept verbatim.
pub fn validate_resume(doc: &Value) -> Result<(), AppError> {
    if !doc.is_object() {
        return Err(AppError::invalid("body", "Resume must be a JSON object"));
    }

    let mut v = Validator::new();
    for field in ["fullName", "profession", "address", "city", "state"] {
        v.non_empty_string(doc, &format!("personal.{}", field));
    }
    v.email(doc, "personal.email");

    for field in ["schoolName", "schoolLocation", "degree", "fieldOfStudy", "gradMonth"] {
        v.non_empty_string(doc, &format!("education.{}", field));
    }
    v.integer(doc, "education.gradYear");

    for field in ["company", "employer", "role", "address"] {
        v.non_empty_string(doc, &format!("experience.{}", field));
    }
    v.iso8601(doc, "experience.startDate")
        .iso8601(doc, "experience.finishDate")
        .boolean(doc, "experience.currentlyHere");

    v.string_array(doc, "skills", 1, MAX_LIST_ITEMS)
        .string_array(doc, "certifications", 0, MAX_LIST_ITEMS);

    v.optional_string(doc, "contact.phone")
        .optional_url(doc, "contact.linkedin")
        .optional_string(doc, "contact.twitter")
        .optional_url(doc, "contact.github")
        .optional_url(doc, "contact.portfolio");

    v.finish()
}

/// Generation bodies only need to carry something.
pub fn require_non_empty_object(doc: &Value, message: &str) -> Result<(), AppError> {
    match doc.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(AppError::invalid("body", message)),
    }
}

pub fn validate_cover_request(doc: &Value) -> Result<(), AppError> {
    require_non_empty_object(doc, "Missing cover letter JSON in request body")?;
    Validator::new()
        .non_empty_string(doc, "job_title")
        .non_empty_string(doc, "job_description")
        .finish()
}

pub fn is_email(value: &str) -> bool {
    if value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let (local, domain) = match value.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .map_or(false, |tld| tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic));

    labels_ok && tld_ok
}

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// Accepts absolute http(s) URLs, and bare hosts like `github.com/alice`.
pub fn is_url(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    let parsed = if value.contains("://") {
        Url::parse(value)
    } else {
        Url::parse(&format!("http://{}", value))
    };
    match parsed {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().map_or(false, |host| host.contains('.'))
        }
        Err(_) => false,
    }
}

pub fn is_iso8601(value: &str) -> bool {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || (value.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok())
        || (value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()))
}
