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

//! [`ClientLibrary`] over the SAP Open Client CT-Lib.
//!
//! Links against the reentrant 64-bit libraries (`sybct_r64`, `sybcs_r64`).
//! The build script takes the numeric constants from the installed headers,
//! so `SYBASE` (and `SYBASE_OCS` if it is not `OCS-16_0`) must be set when
//! building with the `ctlib` feature.
//!
//! Diagnostics are collected inline: `cs_diag`/`ct_diag` are initialized on
//! every context and connection, and after a failed call the queued client
//! and server messages are drained into the message returned by
//! [`ClientLibrary::diagnostic`].

use super::{
    ClientLibrary, CloseOption, ConnectionHandle, ConnectionProperty, ContextHandle,
    NativeResult, PropertyValue, RetCode,
};
use parking_lot::Mutex;
use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

#[allow(non_camel_case_types, dead_code)]
mod sys {
    use std::os::raw::{c_char, c_int, c_void};

    pub type CS_INT = c_int;
    pub type CS_RETCODE = c_int;
    pub type CS_BOOL = c_int;
    pub type CS_MSGNUM = c_int;
    pub type CS_CHAR = c_char;

    include!(concat!(env!("OUT_DIR"), "/ctlib_consts.rs"));

    const MAX_MSG: usize = CS_MAX_MSG as usize;
    const MAX_CHAR: usize = CS_MAX_CHAR as usize;
    const SQLSTATE_SIZE: usize = CS_SQLSTATE_SIZE as usize;

    #[repr(C)]
    pub struct CS_CONTEXT {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct CS_CONNECTION {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct CS_CLIENTMSG {
        pub severity: CS_INT,
        pub msgnumber: CS_MSGNUM,
        pub msgstring: [CS_CHAR; MAX_MSG],
        pub msgstringlen: CS_INT,
        pub osnumber: CS_INT,
        pub osstring: [CS_CHAR; MAX_MSG],
        pub osstringlen: CS_INT,
        pub status: CS_INT,
        pub sqlstate: [u8; SQLSTATE_SIZE],
        pub sqlstatelen: CS_INT,
    }

    #[repr(C)]
    pub struct CS_SERVERMSG {
        pub msgnumber: CS_MSGNUM,
        pub state: CS_INT,
        pub severity: CS_INT,
        pub text: [CS_CHAR; MAX_MSG],
        pub textlen: CS_INT,
        pub svrname: [CS_CHAR; MAX_CHAR],
        pub svrnlen: CS_INT,
        pub proc_: [CS_CHAR; MAX_CHAR],
        pub proclen: CS_INT,
        pub line: CS_INT,
        pub status: CS_INT,
        pub sqlstate: [u8; SQLSTATE_SIZE],
        pub sqlstatelen: CS_INT,
    }

    pub type DiagFn<H> =
        unsafe extern "C" fn(*mut H, CS_INT, CS_INT, CS_INT, *mut c_void) -> CS_RETCODE;

    #[link(name = "sybcs_r64")]
    extern "C" {
        pub fn cs_ctx_alloc(version: CS_INT, context: *mut *mut CS_CONTEXT) -> CS_RETCODE;
        pub fn cs_ctx_drop(context: *mut CS_CONTEXT) -> CS_RETCODE;
        pub fn cs_diag(
            context: *mut CS_CONTEXT,
            operation: CS_INT,
            kind: CS_INT,
            index: CS_INT,
            buffer: *mut c_void,
        ) -> CS_RETCODE;
    }

    #[link(name = "sybct_r64")]
    extern "C" {
        pub fn ct_init(context: *mut CS_CONTEXT, version: CS_INT) -> CS_RETCODE;
        pub fn ct_exit(context: *mut CS_CONTEXT, option: CS_INT) -> CS_RETCODE;
        pub fn ct_con_alloc(
            context: *mut CS_CONTEXT,
            connection: *mut *mut CS_CONNECTION,
        ) -> CS_RETCODE;
        pub fn ct_con_props(
            connection: *mut CS_CONNECTION,
            action: CS_INT,
            property: CS_INT,
            buffer: *mut c_void,
            buflen: CS_INT,
            outlen: *mut CS_INT,
        ) -> CS_RETCODE;
        pub fn ct_connect(
            connection: *mut CS_CONNECTION,
            server_name: *mut CS_CHAR,
            snamelen: CS_INT,
        ) -> CS_RETCODE;
        pub fn ct_close(connection: *mut CS_CONNECTION, option: CS_INT) -> CS_RETCODE;
        pub fn ct_con_drop(connection: *mut CS_CONNECTION) -> CS_RETCODE;
        pub fn ct_diag(
            connection: *mut CS_CONNECTION,
            operation: CS_INT,
            kind: CS_INT,
            index: CS_INT,
            buffer: *mut c_void,
        ) -> CS_RETCODE;
    }
}

use sys::{CS_CONNECTION, CS_CONTEXT, CS_INT, CS_RETCODE};

fn context_ptr(ctx: ContextHandle) -> *mut CS_CONTEXT {
    ctx.as_raw() as *mut CS_CONTEXT
}

fn connection_ptr(conn: ConnectionHandle) -> *mut CS_CONNECTION {
    conn.as_raw() as *mut CS_CONNECTION
}

fn property_id(property: ConnectionProperty) -> CS_INT {
    match property {
        ConnectionProperty::Username => sys::CS_USERNAME,
        ConnectionProperty::Password => sys::CS_PASSWORD,
        ConnectionProperty::UserStoreKey => sys::CS_SEC_USERSTOREKEY,
        ConnectionProperty::ServerAddr => sys::CS_SERVERADDR,
        ConnectionProperty::ExtendedEncryption => sys::CS_SEC_EXTENDED_ENCRYPTION,
        ConnectionProperty::NonEncryptionRetry => sys::CS_SEC_NON_ENCRYPTION_RETRY,
    }
}

/// Text of a fixed-size message buffer, bounded by its reported length.
fn text(buffer: &[std::os::raw::c_char], len: CS_INT) -> String {
    let len = usize::try_from(len).unwrap_or(0).min(buffer.len());
    let bytes: Vec<u8> = buffer[..len]
        .iter()
        .map(|&c| c as u8)
        .take_while(|&b| b != 0)
        .collect();
    String::from_utf8_lossy(&bytes).trim_end().to_string()
}

fn client_message(msg: &sys::CS_CLIENTMSG) -> String {
    let mut message = format!(
        "Msg {}, Severity {}: {}",
        msg.msgnumber,
        msg.severity,
        text(&msg.msgstring, msg.msgstringlen)
    );
    let os = text(&msg.osstring, msg.osstringlen);
    if !os.is_empty() {
        message.push_str(&format!(" (OS error {}: {os})", msg.osnumber));
    }
    message
}

fn server_message(msg: &sys::CS_SERVERMSG) -> String {
    format!(
        "Msg {}, Level {}, State {}: {}",
        msg.msgnumber,
        msg.severity,
        msg.state,
        text(&msg.text, msg.textlen)
    )
}

/// Drains queued messages of one type through `diag`.
///
/// # Safety
///
/// `handle` must be a live handle of the kind `diag` expects, with inline
/// message handling initialized, and `T` must be the struct for `kind`.
unsafe fn drain<H, T>(
    diag: sys::DiagFn<H>,
    handle: *mut H,
    kind: CS_INT,
    format: fn(&T) -> String,
    out: &mut Vec<String>,
) {
    let mut count: CS_INT = 0;
    let status = diag(
        handle,
        sys::CS_STATUS,
        kind,
        sys::CS_UNUSED,
        (&mut count as *mut CS_INT).cast::<c_void>(),
    );
    if status != sys::CS_SUCCEED {
        return;
    }
    for index in 1..=count {
        let mut msg = std::mem::MaybeUninit::<T>::zeroed();
        if diag(handle, sys::CS_GET, kind, index, msg.as_mut_ptr().cast::<c_void>())
            == sys::CS_SUCCEED
        {
            out.push(format(msg.assume_init_ref()));
        }
    }
}

/// The reentrant CT-Lib.
///
/// Holds no state besides the last failure message; every handle is owned by
/// the caller.
#[derive(Debug, Default)]
pub struct CtLib {
    last_message: Mutex<Option<(RetCode, String)>>,
}

impl CtLib {
    /// Creates the binding. No native call is made until a context is
    /// allocated.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, code: RetCode, messages: Vec<String>) -> RetCode {
        *self.last_message.lock() =
            (!messages.is_empty()).then(|| (code, messages.join("; ")));
        code
    }

    fn check_context(&self, ctx: *mut CS_CONTEXT, retcode: CS_RETCODE) -> NativeResult<()> {
        if retcode == sys::CS_SUCCEED {
            return Ok(());
        }
        let mut messages = Vec::new();
        if !ctx.is_null() {
            unsafe {
                drain(sys::cs_diag, ctx, sys::CS_CLIENTMSG_TYPE, client_message, &mut messages);
                let kind = sys::CS_CLIENTMSG_TYPE;
                sys::cs_diag(ctx, sys::CS_CLEAR, kind, sys::CS_UNUSED, ptr::null_mut());
            }
        }
        Err(self.record(RetCode(retcode), messages))
    }

    fn check_connection(
        &self,
        conn: *mut CS_CONNECTION,
        retcode: CS_RETCODE,
    ) -> NativeResult<()> {
        if retcode == sys::CS_SUCCEED {
            return Ok(());
        }
        let mut messages = Vec::new();
        unsafe {
            drain(sys::ct_diag, conn, sys::CS_CLIENTMSG_TYPE, client_message, &mut messages);
            drain(sys::ct_diag, conn, sys::CS_SERVERMSG_TYPE, server_message, &mut messages);
            let kind = sys::CS_ALLMSG_TYPE;
            sys::ct_diag(conn, sys::CS_CLEAR, kind, sys::CS_UNUSED, ptr::null_mut());
        }
        Err(self.record(RetCode(retcode), messages))
    }
}

impl ClientLibrary for CtLib {
    fn ctx_alloc(&self) -> NativeResult<ContextHandle> {
        let mut ctx: *mut CS_CONTEXT = ptr::null_mut();
        let retcode = unsafe { sys::cs_ctx_alloc(sys::CS_VERSION, &mut ctx) };
        self.check_context(ptr::null_mut(), retcode)?;

        let unused = sys::CS_UNUSED;
        let retcode = unsafe { sys::cs_diag(ctx, sys::CS_INIT, unused, unused, ptr::null_mut()) };
        if retcode != sys::CS_SUCCEED {
            tracing::warn!(code = %RetCode(retcode), "cs_diag(CS_INIT) failed");
        }
        Ok(ContextHandle::from_raw(ctx as usize))
    }

    fn ctx_init(&self, ctx: ContextHandle) -> NativeResult<()> {
        let ctx = context_ptr(ctx);
        let retcode = unsafe { sys::ct_init(ctx, sys::CS_VERSION) };
        self.check_context(ctx, retcode)
    }

    fn ctx_exit(&self, ctx: ContextHandle) -> NativeResult<()> {
        let ctx = context_ptr(ctx);
        let retcode = unsafe { sys::ct_exit(ctx, sys::CS_UNUSED) };
        self.check_context(ctx, retcode)
    }

    fn ctx_drop(&self, ctx: ContextHandle) -> NativeResult<()> {
        let retcode = unsafe { sys::cs_ctx_drop(context_ptr(ctx)) };
        // The context is gone whatever the outcome, so its queue is too.
        self.check_context(ptr::null_mut(), retcode)
    }

    fn con_alloc(&self, ctx: ContextHandle) -> NativeResult<ConnectionHandle> {
        let ctx = context_ptr(ctx);
        let mut conn: *mut CS_CONNECTION = ptr::null_mut();
        let retcode = unsafe { sys::ct_con_alloc(ctx, &mut conn) };
        self.check_context(ctx, retcode)?;

        let unused = sys::CS_UNUSED;
        let retcode = unsafe { sys::ct_diag(conn, sys::CS_INIT, unused, unused, ptr::null_mut()) };
        if retcode != sys::CS_SUCCEED {
            tracing::warn!(code = %RetCode(retcode), "ct_diag(CS_INIT) failed");
        }
        Ok(ConnectionHandle::from_raw(conn as usize))
    }

    fn con_props(
        &self,
        conn: ConnectionHandle,
        property: ConnectionProperty,
        value: PropertyValue<'_>,
    ) -> NativeResult<()> {
        let conn = connection_ptr(conn);
        let id = property_id(property);

        let retcode = match value {
            PropertyValue::String(s) => {
                let Ok(value) = CString::new(s) else {
                    let message = format!("{} contains a NUL byte", property.name());
                    return Err(self.record(RetCode::FAIL, vec![message]));
                };
                // CT-Lib copies the buffer before returning.
                unsafe {
                    sys::ct_con_props(
                        conn,
                        sys::CS_SET,
                        id,
                        value.as_ptr().cast_mut().cast::<c_void>(),
                        sys::CS_NULLTERM,
                        ptr::null_mut(),
                    )
                }
            }
            PropertyValue::Bool(b) => {
                let mut flag: sys::CS_BOOL = if b { sys::CS_TRUE } else { sys::CS_FALSE };
                unsafe {
                    sys::ct_con_props(
                        conn,
                        sys::CS_SET,
                        id,
                        (&mut flag as *mut sys::CS_BOOL).cast::<c_void>(),
                        sys::CS_UNUSED,
                        ptr::null_mut(),
                    )
                }
            }
        };
        self.check_connection(conn, retcode)
    }

    fn connect(&self, conn: ConnectionHandle) -> NativeResult<()> {
        let conn = connection_ptr(conn);
        // The server is named by CS_SERVERADDR.
        let retcode = unsafe { sys::ct_connect(conn, ptr::null_mut(), 0) };
        self.check_connection(conn, retcode)
    }

    fn close(&self, conn: ConnectionHandle, option: CloseOption) -> NativeResult<()> {
        let conn = connection_ptr(conn);
        let option = match option {
            CloseOption::Default => sys::CS_UNUSED,
            CloseOption::Force => sys::CS_FORCE_CLOSE,
        };
        let retcode = unsafe { sys::ct_close(conn, option) };
        self.check_connection(conn, retcode)
    }

    fn con_drop(&self, conn: ConnectionHandle) -> NativeResult<()> {
        let conn = connection_ptr(conn);
        let retcode = unsafe { sys::ct_con_drop(conn) };
        if retcode == sys::CS_SUCCEED {
            return Ok(());
        }
        // A failed drop leaves the handle alive, so its queue can be read.
        self.check_connection(conn, retcode)
    }

    fn diagnostic(&self, code: RetCode) -> Option<String> {
        match &*self.last_message.lock() {
            Some((last, message)) if *last == code => Some(message.clone()),
            _ => None,
        }
    }
}
