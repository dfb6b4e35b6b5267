//! Input validation
//!
//! Pure functions over fully built records. Each returns every problem it
//! finds as a [`FieldError`] list; an empty list means the record is valid.
//! Persistence-dependent checks (MDA existence, uniqueness) live elsewhere.

use validator::{ValidateEmail, ValidateUrl};

use crate::auth::role::Role;
use crate::error::{ApiError, FieldError};
use crate::model::{Activity, Admin, Mda, User};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
/// bcrypt ignores everything past 72 bytes
pub const PASSWORD_MAX_LEN: usize = 72;

/// Turn a non-empty error list into [`ApiError::Validation`]
pub fn ensure(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn check_name(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.push(FieldError::new(field, format!("{} is required", field)));
    } else if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        errors.push(FieldError::new(
            field,
            format!(
                "{} must be between {} and {} characters",
                field, NAME_MIN_LEN, NAME_MAX_LEN
            ),
        ));
    }
}

fn check_email(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if !is_valid_email(value) {
        errors.push(FieldError::new(field, "A valid email address is required"));
    }
}

/// RFC 5322 address with a dotted domain
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    value.validate_email()
        && value
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}

/// Absolute `http(s)` URL with a host
pub fn is_valid_url(value: &str) -> bool {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !value.chars().any(char::is_whitespace)
        && value.validate_url()
}

pub fn validate_mda(mda: &Mda) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check_name(&mut errors, "name", &mda.name);

    if mda.reports.is_empty() {
        errors.push(FieldError::new("reports", "At least one report is required"));
    }
    for (i, report) in mda.reports.iter().enumerate() {
        if report.title.trim().is_empty() {
            errors.push(FieldError::new(
                format!("reports[{}].title", i),
                "Report title is required",
            ));
        }
        if !is_valid_url(&report.url) {
            errors.push(FieldError::new(
                format!("reports[{}].url", i),
                "Report URL must be a valid http(s) URL",
            ));
        }
    }
    errors
}

pub fn validate_user(user: &User) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let username = user.username.trim();
    let len = username.chars().count();
    if len == 0 {
        errors.push(FieldError::new("username", "username is required"));
    } else if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        errors.push(FieldError::new(
            "username",
            format!(
                "username must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            ),
        ));
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        errors.push(FieldError::new(
            "username",
            "username may only contain letters, digits, '.', '_' and '-'",
        ));
    }

    check_name(&mut errors, "name", &user.name);
    check_email(&mut errors, "contactEmail", &user.contact_email);

    if user.mda_id.trim().is_empty() {
        errors.push(FieldError::new("mdaId", "mdaId is required"));
    }
    if user.role != Role::User {
        errors.push(FieldError::new("role", "role must be user"));
    }
    errors
}

pub fn validate_admin(admin: &Admin) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check_name(&mut errors, "name", &admin.name);
    check_email(&mut errors, "email", &admin.email);

    match admin.role {
        Role::User => errors.push(FieldError::new("role", "role must be admin or superadmin")),
        Role::SuperAdmin => {
            if admin.can_be_deleted {
                errors.push(FieldError::new(
                    "canBeDeleted",
                    "A superadmin cannot be deletable",
                ));
            }
        }
        Role::Admin => {
            if admin.created_by.as_deref().is_none_or(|s| s.trim().is_empty()) {
                errors.push(FieldError::new("createdBy", "createdBy is required"));
            }
        }
    }
    errors
}

pub fn validate_password(field: &str, password: &str) -> Vec<FieldError> {
    let len = password.len();
    if len < PASSWORD_MIN_LEN {
        vec![FieldError::new(
            field,
            format!("Password must be at least {} characters", PASSWORD_MIN_LEN),
        )]
    } else if len > PASSWORD_MAX_LEN {
        vec![FieldError::new(
            field,
            format!("Password must be at most {} bytes", PASSWORD_MAX_LEN),
        )]
    } else {
        Vec::new()
    }
}

/// CRUD entries must name their target; session entries need not
pub fn validate_activity(activity: &Activity) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if activity.admin_id.trim().is_empty() {
        errors.push(FieldError::new("adminId", "adminId is required"));
    }
    if !activity.action.is_session() {
        if activity.resource_id.as_deref().is_none_or(str::is_empty) {
            errors.push(FieldError::new(
                "resourceId",
                "resourceId is required for this action",
            ));
        }
        if activity.resource_name.as_deref().is_none_or(str::is_empty) {
            errors.push(FieldError::new(
                "resourceName",
                "resourceName is required for this action",
            ));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityAction, Report, ResourceType};

    fn report(title: &str, url: &str) -> Report {
        Report {
            title: title.to_string(),
            url: url.to_string(),
            is_active: true,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_mda_requires_reports() {
        let mda = Mda::new("Ministry of Finance", vec![]);
        assert_eq!(fields(&validate_mda(&mda)), vec!["reports"]);
        assert!(ensure(validate_mda(&mda)).is_err());
    }

    #[test]
    fn test_mda_report_fields() {
        let mda = Mda::new(
            "Ministry of Finance",
            vec![
                report("Budget", "https://finance.gov/budget"),
                report("  ", "ftp://finance.gov/x"),
            ],
        );
        assert_eq!(
            fields(&validate_mda(&mda)),
            vec!["reports[1].title", "reports[1].url"]
        );
    }

    #[test]
    fn test_mda_name_length() {
        let mda = Mda::new("M", vec![report("Budget", "http://a.gov")]);
        assert_eq!(fields(&validate_mda(&mda)), vec!["name"]);
        let mda = Mda::new("Audit Office", vec![report("Budget", "http://a.gov")]);
        assert!(validate_mda(&mda).is_empty());
    }

    #[test]
    fn test_url_rules() {
        assert!(is_valid_url("https://reports.gov/q1?x=1"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://a.gov/has space"));
        assert!(!is_valid_url("reports.gov"));
        assert!(!is_valid_url("ftp://reports.gov/q1"));
        assert!(is_valid_url("HTTPS://Reports.gov/Q1"));
    }

    #[test]
    fn test_user_fields() {
        let user = User::new("j doe", "J", "not-an-email", "hash", "");
        assert_eq!(
            fields(&validate_user(&user)),
            vec!["username", "name", "contactEmail", "mdaId"]
        );

        let user = User::new("j.doe-1", "John Doe", "john@mda.gov", "hash", "m-1");
        assert!(validate_user(&user).is_empty());
    }

    #[test]
    fn test_admin_invariants() {
        let mut root = Admin::new_super_admin("Root", "root@mda.gov", "hash");
        assert!(validate_admin(&root).is_empty());
        root.can_be_deleted = true;
        assert_eq!(fields(&validate_admin(&root)), vec!["canBeDeleted"]);

        let mut admin = Admin::new_admin("Ops", "ops@mda.gov", "hash", "root-id");
        assert!(validate_admin(&admin).is_empty());
        admin.created_by = None;
        assert_eq!(fields(&validate_admin(&admin)), vec!["createdBy"]);
        admin.role = Role::User;
        assert_eq!(fields(&validate_admin(&admin)), vec!["role"]);
    }

    #[test]
    fn test_password_bounds() {
        assert_eq!(validate_password("newPassword", "12345").len(), 1);
        assert!(validate_password("newPassword", "123456").is_empty());
        assert_eq!(validate_password("password", &"x".repeat(73)).len(), 1);
    }

    #[test]
    fn test_activity_resource_rule() {
        let mut activity = Activity {
            id: "1".into(),
            admin_id: "a-1".into(),
            admin_name: "Ops".into(),
            action: ActivityAction::Login,
            resource_type: ResourceType::Admin,
            resource_id: None,
            resource_name: None,
            details: None,
            ip_address: None,
            user_agent: None,
            timestamp: chrono::Utc::now(),
        };
        assert!(validate_activity(&activity).is_empty());

        activity.action = ActivityAction::Delete;
        assert_eq!(
            fields(&validate_activity(&activity)),
            vec!["resourceId", "resourceName"]
        );
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a.b@mda.gov.ng"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@mda.gov"));
        assert!(!is_valid_email("a@@mda.gov"));
        assert!(!is_valid_email("a@.mda.gov"));
        assert!(!is_valid_email("a@mda.gov."));
        assert!(!is_valid_email("a b@mda.gov"));
    }
}
