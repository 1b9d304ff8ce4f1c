use crate::error::ProfileError;

pub fn exit_code_for_error(err: &ProfileError) -> i32 {
    match err {
        ProfileError::InvalidInput(_) | ProfileError::Config(_) => 2,
        ProfileError::InvalidUrl(_) => 3,
        ProfileError::NotFound(_) => 4,
        ProfileError::MalformedImport(_) | ProfileError::Json(_) => 5,
        ProfileError::QuotaExceeded { .. } => 6,
        ProfileError::DomainRejected(_) | ProfileError::CookieRejected(_) => 7,
        ProfileError::Storage(_) | ProfileError::Database(_) => 10,
        ProfileError::Io(_) => 23,
        ProfileError::PermissionDenied(_) | ProfileError::FileNotFound(_) => 37,
    }
}
