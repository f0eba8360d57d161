//! Pure validation chain. Each function inspects raw input, records every
//! violated rule in a [`FieldErrors`] accumulator, and returns the parsed
//! value; callers decide what an accumulated error set means.

use chrono::NaiveDate;

use crate::{
    error::FieldErrors,
    models::{ContactChanges, ContactDraft, NewContact},
};

pub const FIRST_NAME_REQUIRED: &str = "First name is required.";
pub const FIRST_NAME_TOO_LONG: &str = "First name cannot exceed 255 characters.";
pub const LAST_NAME_REQUIRED: &str = "Last name is required.";
pub const LAST_NAME_TOO_LONG: &str = "Last name cannot exceed 255 characters.";
pub const EMAIL_REQUIRED: &str = "Email is required.";
pub const EMAIL_INVALID: &str = "Please enter a valid email address.";
pub const EMAIL_TOO_LONG: &str = "Email cannot exceed 255 characters.";
pub const EMAIL_TAKEN: &str = "This email address is already in use.";
pub const PHONE_TOO_LONG: &str = "Phone number cannot exceed 20 characters.";
pub const COMPANY_TOO_LONG: &str = "Company name cannot exceed 255 characters.";
pub const ADDRESS_TOO_LONG: &str = "Address cannot exceed 500 characters.";
pub const BIRTH_DATE_INVALID: &str = "Please enter a valid date.";
pub const NOTES_TOO_LONG: &str = "Notes cannot exceed 1000 characters.";
pub const PASSWORD_REQUIRED: &str = "Password is required.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters.";

/// Pragmatic syntax check: one `@`, non-empty local part, dotted domain
/// with a plausible TLD, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// Validates login input. All violations are reported together.
pub fn validate_login(
    email: Option<&str>,
    password: Option<&str>,
) -> Result<(String, String), FieldErrors> {
    let mut errors = FieldErrors::default();

    let email = match email.filter(|v| !v.is_empty()) {
        Some(value) => {
            if !is_valid_email(value) {
                errors.add("email", EMAIL_INVALID);
            }
            value.to_string()
        }
        None => {
            errors.add("email", EMAIL_REQUIRED);
            String::new()
        }
    };

    let password = match password.filter(|v| !v.is_empty()) {
        Some(value) => {
            if value.chars().count() < 6 {
                errors.add("password", PASSWORD_TOO_SHORT);
            }
            value.to_string()
        }
        None => {
            errors.add("password", PASSWORD_REQUIRED);
            String::new()
        }
    };

    if errors.is_empty() {
        Ok((email, password))
    } else {
        Err(errors)
    }
}

/// Full create-payload validation, uniqueness excluded (that needs the
/// store and is layered on by the service). Returns `Some` whenever the
/// required fields are present so the caller can still combine the result
/// with the accumulated errors.
pub fn validate_new_contact(draft: &ContactDraft, errors: &mut FieldErrors) -> Option<NewContact> {
    let first_name = required_text(
        draft.first_name.as_deref(),
        "first_name",
        FIRST_NAME_REQUIRED,
        FIRST_NAME_TOO_LONG,
        255,
        errors,
    );
    let last_name = required_text(
        draft.last_name.as_deref(),
        "last_name",
        LAST_NAME_REQUIRED,
        LAST_NAME_TOO_LONG,
        255,
        errors,
    );
    let email = required_email(draft.email.as_deref(), errors);

    let phone = optional_text(&draft.phone, "phone", PHONE_TOO_LONG, 20, errors);
    let company = optional_text(&draft.company, "company", COMPANY_TOO_LONG, 255, errors);
    let address = optional_text(&draft.address, "address", ADDRESS_TOO_LONG, 500, errors);
    let notes = optional_text(&draft.notes, "notes", NOTES_TOO_LONG, 1000, errors);
    let birth_date = optional_date(&draft.birth_date, errors);

    Some(NewContact {
        first_name: first_name?,
        last_name: last_name?,
        email: email?,
        phone,
        company,
        address,
        birth_date,
        notes,
    })
}

/// Update validation: only supplied fields are checked, with the same
/// rules as creation. Fields absent from the draft stay `None` and keep
/// their stored values; nullable fields supplied as `null` or an empty
/// string become explicit clears.
pub fn validate_contact_changes(draft: &ContactDraft, errors: &mut FieldErrors) -> ContactChanges {
    let mut changes = ContactChanges::default();

    if draft.first_name.is_some() {
        changes.first_name = required_text(
            draft.first_name.as_deref(),
            "first_name",
            FIRST_NAME_REQUIRED,
            FIRST_NAME_TOO_LONG,
            255,
            errors,
        );
    }
    if draft.last_name.is_some() {
        changes.last_name = required_text(
            draft.last_name.as_deref(),
            "last_name",
            LAST_NAME_REQUIRED,
            LAST_NAME_TOO_LONG,
            255,
            errors,
        );
    }
    if draft.email.is_some() {
        changes.email = required_email(draft.email.as_deref(), errors);
    }

    changes.phone = clearable_text(&draft.phone, "phone", PHONE_TOO_LONG, 20, errors);
    changes.company = clearable_text(&draft.company, "company", COMPANY_TOO_LONG, 255, errors);
    changes.address = clearable_text(&draft.address, "address", ADDRESS_TOO_LONG, 500, errors);
    changes.notes = clearable_text(&draft.notes, "notes", NOTES_TOO_LONG, 1000, errors);
    changes.birth_date = clearable_date(&draft.birth_date, errors);

    changes
}

fn required_text(
    value: Option<&str>,
    field: &str,
    required_message: &str,
    too_long_message: &str,
    max_chars: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => {
            if value.chars().count() > max_chars {
                errors.add(field, too_long_message);
            }
            Some(value.to_string())
        }
        None => {
            errors.add(field, required_message);
            None
        }
    }
}

fn required_email(value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => {
            if !is_valid_email(value) {
                errors.add("email", EMAIL_INVALID);
            }
            if value.chars().count() > 255 {
                errors.add("email", EMAIL_TOO_LONG);
            }
            Some(value.to_string())
        }
        None => {
            errors.add("email", EMAIL_REQUIRED);
            None
        }
    }
}

/// Create path: absent, `null` and empty strings all mean "no value".
fn optional_text(
    value: &Option<Option<String>>,
    field: &str,
    too_long_message: &str,
    max_chars: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = value.as_ref()?.as_deref().filter(|v| !v.is_empty())?;
    if value.chars().count() > max_chars {
        errors.add(field, too_long_message);
    }
    Some(value.to_string())
}

fn optional_date(value: &Option<Option<String>>, errors: &mut FieldErrors) -> Option<NaiveDate> {
    let value = value.as_ref()?.as_deref().filter(|v| !v.is_empty())?;
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("birth_date", BIRTH_DATE_INVALID);
            None
        }
    }
}

/// Update path: an absent field keeps the stored value, while a supplied
/// `null` or empty string clears it.
fn clearable_text(
    value: &Option<Option<String>>,
    field: &str,
    too_long_message: &str,
    max_chars: usize,
    errors: &mut FieldErrors,
) -> Option<Option<String>> {
    let supplied = value.as_ref()?;
    match supplied.as_deref().filter(|v| !v.is_empty()) {
        Some(text) => {
            if text.chars().count() > max_chars {
                errors.add(field, too_long_message);
            }
            Some(Some(text.to_string()))
        }
        None => Some(None),
    }
}

fn clearable_date(
    value: &Option<Option<String>>,
    errors: &mut FieldErrors,
) -> Option<Option<NaiveDate>> {
    let supplied = value.as_ref()?;
    match supplied.as_deref().filter(|v| !v.is_empty()) {
        Some(text) => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => Some(Some(date)),
            Err(_) => {
                errors.add("birth_date", BIRTH_DATE_INVALID);
                None
            }
        },
        None => Some(None),
    }
}
