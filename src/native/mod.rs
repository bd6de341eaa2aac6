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

//! Boundary to the native ASE client library (CT-Lib).
//!
//! The driver never talks to the wire itself. Every resource it manages is
//! created and destroyed through a [`ClientLibrary`], which mirrors the small
//! subset of CT-Lib the connection lifecycle needs: context allocation and
//! initialization, connection allocation, property setting, connect, close
//! and deallocation.
//!
//! Each call reports a CT-Lib return code. Anything other than `CS_SUCCEED`
//! is returned as the `Err` side of a [`NativeResult`], and the caller asks
//! the library for a [`diagnostic`](ClientLibrary::diagnostic) describing it.

#[cfg(feature = "ctlib")]
pub mod ctlib;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::fmt::{self, Debug, Display};

/// Result of a native call; the error side is the non-success return code.
pub type NativeResult<T> = std::result::Result<T, RetCode>;

/// A CT-Lib return code (`CS_RETCODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetCode(pub i32);

impl RetCode {
    /// `CS_SUCCEED`: the call completed.
    pub const SUCCEED: RetCode = RetCode(1);
    /// `CS_FAIL`: the call failed; diagnostics describe why.
    pub const FAIL: RetCode = RetCode(0);
    /// `CS_MEM_ERROR`: out of memory.
    pub const MEM_ERROR: RetCode = RetCode(-1);
    /// `CS_PENDING`: an asynchronous operation is in progress.
    pub const PENDING: RetCode = RetCode(-2);
    /// `CS_QUIET`: an asynchronous call completed without notification.
    pub const QUIET: RetCode = RetCode(-3);
    /// `CS_BUSY`: another operation is pending on the connection.
    pub const BUSY: RetCode = RetCode(-4);
    /// `CS_INTERRUPT`: the call was interrupted.
    pub const INTERRUPT: RetCode = RetCode(-5);
    /// `CS_FATAL`: the connection is unusable.
    pub const FATAL: RetCode = RetCode(-8);
    /// `CS_UNSUPPORTED`: the operation is not supported.
    pub const UNSUPPORTED: RetCode = RetCode(-10);
    /// `CS_CANCELED`: the operation was canceled.
    pub const CANCELED: RetCode = RetCode(-202);

    /// Returns whether this is `CS_SUCCEED`.
    pub fn is_success(self) -> bool {
        self == Self::SUCCEED
    }

    /// Returns the symbolic CT-Lib name of the code, if it is a known one.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::SUCCEED => Some("CS_SUCCEED"),
            Self::FAIL => Some("CS_FAIL"),
            Self::MEM_ERROR => Some("CS_MEM_ERROR"),
            Self::PENDING => Some("CS_PENDING"),
            Self::QUIET => Some("CS_QUIET"),
            Self::BUSY => Some("CS_BUSY"),
            Self::INTERRUPT => Some("CS_INTERRUPT"),
            Self::FATAL => Some("CS_FATAL"),
            Self::UNSUPPORTED => Some("CS_UNSUPPORTED"),
            Self::CANCELED => Some("CS_CANCELED"),
            _ => None,
        }
    }
}

impl Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "return code {}", self.0),
        }
    }
}

/// Opaque handle to a native context (`CS_CONTEXT *`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(usize);

impl ContextHandle {
    /// Wraps a raw handle value as returned by the library.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Opaque handle to a native connection (`CS_CONNECTION *`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(usize);

impl ConnectionHandle {
    /// Wraps a raw handle value as returned by the library.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Connection properties the driver sets through `ct_con_props`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionProperty {
    /// `CS_USERNAME`, the login name.
    Username,
    /// `CS_PASSWORD`, the login password.
    Password,
    /// `CS_SEC_USERSTOREKEY`, a key into the local user store.
    UserStoreKey,
    /// `CS_SERVERADDR`, `"host port"` of the server.
    ServerAddr,
    /// `CS_SEC_EXTENDED_ENCRYPTION`, encrypt the password on login.
    ExtendedEncryption,
    /// `CS_SEC_NON_ENCRYPTION_RETRY`, retry login unencrypted if refused.
    NonEncryptionRetry,
}

impl ConnectionProperty {
    /// The CT-Lib symbolic identifier of the property.
    pub fn name(self) -> &'static str {
        match self {
            Self::Username => "CS_USERNAME",
            Self::Password => "CS_PASSWORD",
            Self::UserStoreKey => "CS_SEC_USERSTOREKEY",
            Self::ServerAddr => "CS_SERVERADDR",
            Self::ExtendedEncryption => "CS_SEC_EXTENDED_ENCRYPTION",
            Self::NonEncryptionRetry => "CS_SEC_NON_ENCRYPTION_RETRY",
        }
    }
}

/// Value passed along with a [`ConnectionProperty`].
///
/// Strings carry their own length, so no `CS_NULLTERM` marker is needed on
/// this side of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValue<'a> {
    /// A character property.
    String(&'a str),
    /// A `CS_BOOL` property.
    Bool(bool),
}

/// How `ct_close` should treat a connection with pending results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseOption {
    /// Fail with results pending (`CS_UNUSED`).
    Default,
    /// Close regardless of pending results (`CS_FORCE_CLOSE`).
    Force,
}

/// Names a native call, used to label errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeCall {
    /// `cs_ctx_alloc`
    ContextAlloc,
    /// `ct_init`
    ContextInit,
    /// `ct_exit`
    ContextExit,
    /// `cs_ctx_drop`
    ContextDrop,
    /// `ct_con_alloc`
    ConnectionAlloc,
    /// `ct_con_props` for one property.
    SetProperty(ConnectionProperty),
    /// `ct_connect`
    Connect,
    /// `ct_close`
    Close,
    /// `ct_close` with `CS_FORCE_CLOSE`
    ForceClose,
    /// `ct_con_drop`
    ConnectionDrop,
}

impl Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextAlloc => f.write_str("cs_ctx_alloc"),
            Self::ContextInit => f.write_str("ct_init"),
            Self::ContextExit => f.write_str("ct_exit"),
            Self::ContextDrop => f.write_str("cs_ctx_drop"),
            Self::ConnectionAlloc => f.write_str("ct_con_alloc"),
            Self::SetProperty(property) => write!(f, "ct_con_props({})", property.name()),
            Self::Connect => f.write_str("ct_connect"),
            Self::Close => f.write_str("ct_close"),
            Self::ForceClose => f.write_str("ct_close(CS_FORCE_CLOSE)"),
            Self::ConnectionDrop => f.write_str("ct_con_drop"),
        }
    }
}

/// The native client library.
///
/// Implementations wrap the vendor library (or a stand-in for tests). All
/// calls are blocking. Implementations must be safe to call from several
/// threads at once for distinct connection handles; the driver serializes
/// every call that touches the context handle itself.
pub trait ClientLibrary: Send + Sync + Debug {
    /// Allocates a new context (`cs_ctx_alloc`).
    fn ctx_alloc(&self) -> NativeResult<ContextHandle>;

    /// Initializes the client library for the context (`ct_init`).
    fn ctx_init(&self, ctx: ContextHandle) -> NativeResult<()>;

    /// Shuts the client library down for the context (`ct_exit`).
    fn ctx_exit(&self, ctx: ContextHandle) -> NativeResult<()>;

    /// Deallocates the context (`cs_ctx_drop`).
    fn ctx_drop(&self, ctx: ContextHandle) -> NativeResult<()>;

    /// Allocates a connection within the context (`ct_con_alloc`).
    fn con_alloc(&self, ctx: ContextHandle) -> NativeResult<ConnectionHandle>;

    /// Sets a connection property (`ct_con_props` with `CS_SET`).
    fn con_props(
        &self,
        conn: ConnectionHandle,
        property: ConnectionProperty,
        value: PropertyValue<'_>,
    ) -> NativeResult<()>;

    /// Opens the network session (`ct_connect`).
    fn connect(&self, conn: ConnectionHandle) -> NativeResult<()>;

    /// Closes the network session (`ct_close`).
    fn close(&self, conn: ConnectionHandle, option: CloseOption) -> NativeResult<()>;

    /// Deallocates the connection (`ct_con_drop`).
    fn con_drop(&self, conn: ConnectionHandle) -> NativeResult<()>;

    /// Returns the library's message for the most recent failure with `code`.
    fn diagnostic(&self, code: RetCode) -> Option<String>;
}

/// Formats the message for a failed native call.
pub(crate) fn describe_failure(library: &dyn ClientLibrary, call: NativeCall, code: RetCode) -> String {
    match library.diagnostic(code) {
        Some(message) => message,
        None => format!("{call} returned {code}"),
    }
}
