// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the ASE ADBC driver.
//!
//! Driver internals report an [`Error`], which keeps enough structure for
//! callers to react to it (the failing native call and its return code, or
//! every violated configuration field). At the ADBC boundary it is converted
//! through the driverbase error framework so messages carry the driver name
//! prefix and map onto ADBC status codes.

use crate::config::ValidationErrors;
use crate::native::{NativeCall, RetCode};
use driverbase::error::ErrorHelper;

/// Error helper for ASE driver errors.
///
/// This type implements the driverbase `ErrorHelper` trait to provide
/// consistent error formatting with the driver name prefix.
#[derive(Clone)]
pub struct AseErrorHelper;

impl ErrorHelper for AseErrorHelper {
    const NAME: &'static str = "ASE";
}

/// The error type for ASE driver operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The DSN could not be tokenized or is not a valid URI.
    #[error("malformed DSN: {0}")]
    MalformedDsn(String),

    /// One or more configuration fields violate their rules.
    #[error("invalid connection configuration: {0}")]
    ValidationFailed(ValidationErrors),

    /// A native library call did not return `CS_SUCCEED`.
    #[error("{call} failed with {code}: {message}")]
    NativeCallFailed {
        call: NativeCall,
        code: RetCode,
        message: String,
    },

    /// `ct_close` refused to close because results are still pending.
    #[error("ct_close failed with {code}, connection has results pending: {message}")]
    SessionBusy { code: RetCode, message: String },

    /// The driver context could not be allocated or initialized.
    #[error("failed to initialize driver context: {call} failed with {code}: {message}")]
    ContextInitFailed {
        call: NativeCall,
        code: RetCode,
        message: String,
    },

    #[error("invalid driver state: {0}")]
    InvalidState(String),

    /// The connection was closed and can no longer be used.
    #[error("connection is closed")]
    ConnectionClosed,
}

impl Error {
    /// The native return code carried by the error, if any.
    pub fn native_code(&self) -> Option<RetCode> {
        match self {
            Error::NativeCallFailed { code, .. }
            | Error::SessionBusy { code, .. }
            | Error::ContextInitFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Every violated field, for [`Error::ValidationFailed`].
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }

    /// Converts the error into an ADBC error.
    ///
    /// The native return code, if there is one, becomes the vendor code.
    pub fn to_adbc(&self) -> adbc_core::error::Error {
        let message = self.to_string();
        let mut error = match self {
            Error::MalformedDsn(_) | Error::ValidationFailed(_) => {
                AseErrorHelper::invalid_argument()
                    .message(message.as_str())
                    .to_adbc()
            }
            Error::NativeCallFailed { .. } | Error::ContextInitFailed { .. } => {
                AseErrorHelper::io().message(message.as_str()).to_adbc()
            }
            Error::SessionBusy { .. } | Error::InvalidState(_) | Error::ConnectionClosed => {
                AseErrorHelper::invalid_state()
                    .message(message.as_str())
                    .to_adbc()
            }
        };
        if let Some(code) = self.native_code() {
            error.vendor_code = code.0;
        }
        error
    }
}

impl From<Error> for adbc_core::error::Error {
    fn from(error: Error) -> Self {
        error.to_adbc()
    }
}

/// A convenient alias for Results with ASE driver errors.
pub type Result<T> = std::result::Result<T, Error>;
