// Exit codes for the dontpad CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/validation error
//   10 = server not reachable
//   11 = PIN or access error
//   12 = not found
//   13 = collab server unavailable

use crate::client::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    ServerDown = 10,
    Auth = 11,
    NotFound = 12,
    CollabDown = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an error to an exit code by looking for a `ClientError` in its chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.chain().find_map(|cause| cause.downcast_ref::<ClientError>()) {
            Some(ClientError::Unreachable { .. }) => Self::ServerDown,
            Some(ClientError::InvalidUrl(_)) => Self::Usage,
            Some(ClientError::Api { code, .. }) => Self::from_api_code(code),
            Some(ClientError::Http(_)) | None => Self::Error,
        }
    }

    pub fn from_api_code(code: &str) -> Self {
        match code {
            "VALIDATION_FAILED" | "UPLOAD_REJECTED" | "PAYLOAD_TOO_LARGE" => Self::Usage,
            "PIN_INCORRECT" | "DOCUMENT_NOT_PROTECTED" => Self::Auth,
            "NOT_FOUND" => Self::NotFound,
            "COLLAB_UNAVAILABLE" => Self::CollabDown,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}
