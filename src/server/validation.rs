use crate::server::response::ApiError;

const MAX_USERNAME_LEN: usize = 64;
const MAX_SUBJECT_CODE_LEN: usize = 50;
const MAX_SUBJECT_NAME_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(ApiError::bad_request(
            "Username can only contain alphanumeric characters, hyphens, underscores, and periods",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_subject_code(code: &str) -> Result<(), ApiError> {
    if code.is_empty() {
        return Err(ApiError::bad_request("Subject code cannot be empty"));
    }
    if code.len() > MAX_SUBJECT_CODE_LEN {
        return Err(ApiError::bad_request(format!(
            "Subject code cannot exceed {MAX_SUBJECT_CODE_LEN} characters"
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiError::bad_request(
            "Subject code can only contain alphanumeric characters and hyphens",
        ));
    }
    Ok(())
}

pub fn validate_subject_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Subject name cannot be empty"));
    }
    if name.len() > MAX_SUBJECT_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Subject name cannot exceed {MAX_SUBJECT_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_credits(credits: u32) -> Result<(), ApiError> {
    if credits == 0 {
        return Err(ApiError::bad_request("Credits must be a positive integer"));
    }
    Ok(())
}
