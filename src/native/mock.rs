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

//! Scripted in-memory client library.
//!
//! `MockLibrary` tracks every handle it hands out, so tests can assert that
//! the driver frees exactly what it allocated. Freeing an unknown handle or
//! allocating a connection on a dead context is recorded as a violation
//! instead of crashing, which lets concurrent tests check for double frees
//! after the fact.

use super::{
    ClientLibrary, CloseOption, ConnectionHandle, ConnectionProperty, ContextHandle, NativeCall,
    NativeResult, PropertyValue, RetCode,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct MockConnection {
    context: usize,
    properties: Vec<(ConnectionProperty, String)>,
    connected: bool,
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: usize,
    contexts: HashSet<usize>,
    initialized: HashSet<usize>,
    connections: HashMap<usize, MockConnection>,
    contexts_allocated: usize,
    failures: HashMap<NativeCall, RetCode>,
    results_pending: bool,
    calls: Vec<NativeCall>,
    violations: Vec<String>,
    last_message: Option<(RetCode, String)>,
}

impl MockState {
    fn next_handle(&mut self) -> usize {
        self.next_handle += 1;
        self.next_handle
    }

    /// Records the call and returns the injected failure for it, if any.
    fn enter(&mut self, call: NativeCall) -> NativeResult<()> {
        self.calls.push(call);
        match self.failures.get(&call).copied() {
            Some(code) => Err(self.failed(code, format!("{call}: simulated failure"))),
            None => Ok(()),
        }
    }

    fn failed(&mut self, code: RetCode, message: String) -> RetCode {
        self.last_message = Some((code, message));
        code
    }
}

/// An in-memory [`ClientLibrary`] with fault injection.
#[derive(Debug, Default)]
pub struct MockLibrary {
    state: Mutex<MockState>,
}

impl MockLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `call` fail with `code` until cleared.
    pub fn fail(&self, call: NativeCall, code: RetCode) {
        self.state.lock().failures.insert(call, code);
    }

    /// Removes an injected failure.
    pub fn clear_failure(&self, call: NativeCall) {
        self.state.lock().failures.remove(&call);
    }

    /// When set, a plain `ct_close` fails as if results were still pending.
    pub fn set_results_pending(&self, pending: bool) {
        self.state.lock().results_pending = pending;
    }

    /// Number of contexts currently allocated.
    pub fn live_contexts(&self) -> usize {
        self.state.lock().contexts.len()
    }

    /// Number of connections currently allocated.
    pub fn live_connections(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Number of contexts allocated over the lifetime of the library.
    pub fn contexts_allocated(&self) -> usize {
        self.state.lock().contexts_allocated
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.lock().calls.clone()
    }

    /// Misuse detected so far: double frees and use of freed handles.
    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    /// Properties set on a live connection, in the order they were set.
    pub fn properties(&self, conn: ConnectionHandle) -> Vec<(ConnectionProperty, String)> {
        self.state
            .lock()
            .connections
            .get(&conn.as_raw())
            .map(|c| c.properties.clone())
            .unwrap_or_default()
    }

    /// Handles of all live connections.
    pub fn connection_handles(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<_> = self
            .state
            .lock()
            .connections
            .keys()
            .copied()
            .map(ConnectionHandle::from_raw)
            .collect();
        handles.sort_by_key(|h| h.as_raw());
        handles
    }
}

impl ClientLibrary for MockLibrary {
    fn ctx_alloc(&self) -> NativeResult<ContextHandle> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::ContextAlloc)?;
        let handle = state.next_handle();
        state.contexts.insert(handle);
        state.contexts_allocated += 1;
        Ok(ContextHandle::from_raw(handle))
    }

    fn ctx_init(&self, ctx: ContextHandle) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::ContextInit)?;
        if !state.contexts.contains(&ctx.as_raw()) {
            state.violations.push(format!("ct_init on freed context {}", ctx.as_raw()));
            return Err(state.failed(RetCode::FAIL, "ct_init: invalid context".into()));
        }
        state.initialized.insert(ctx.as_raw());
        Ok(())
    }

    fn ctx_exit(&self, ctx: ContextHandle) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::ContextExit)?;
        if !state.initialized.remove(&ctx.as_raw()) {
            state.violations.push(format!("ct_exit on uninitialized context {}", ctx.as_raw()));
            return Err(state.failed(RetCode::FAIL, "ct_exit: context not initialized".into()));
        }
        Ok(())
    }

    fn ctx_drop(&self, ctx: ContextHandle) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::ContextDrop)?;
        if !state.contexts.remove(&ctx.as_raw()) {
            state.violations.push(format!("double free of context {}", ctx.as_raw()));
            return Err(state.failed(RetCode::FAIL, "cs_ctx_drop: invalid context".into()));
        }
        state.initialized.remove(&ctx.as_raw());
        let orphans = state
            .connections
            .values()
            .filter(|c| c.context == ctx.as_raw())
            .count();
        if orphans > 0 {
            state.violations.push(format!(
                "context {} dropped with {orphans} live connections",
                ctx.as_raw()
            ));
        }
        Ok(())
    }

    fn con_alloc(&self, ctx: ContextHandle) -> NativeResult<ConnectionHandle> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::ConnectionAlloc)?;
        if !state.initialized.contains(&ctx.as_raw()) {
            state.violations.push(format!("ct_con_alloc on freed context {}", ctx.as_raw()));
            return Err(state.failed(RetCode::FAIL, "ct_con_alloc: invalid context".into()));
        }
        let handle = state.next_handle();
        state.connections.insert(
            handle,
            MockConnection {
                context: ctx.as_raw(),
                ..Default::default()
            },
        );
        Ok(ConnectionHandle::from_raw(handle))
    }

    fn con_props(
        &self,
        conn: ConnectionHandle,
        property: ConnectionProperty,
        value: PropertyValue<'_>,
    ) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::SetProperty(property))?;
        let value = match value {
            PropertyValue::String(s) => s.to_string(),
            PropertyValue::Bool(b) => if b { "CS_TRUE" } else { "CS_FALSE" }.to_string(),
        };
        match state.connections.get_mut(&conn.as_raw()) {
            Some(connection) => {
                connection.properties.push((property, value));
                Ok(())
            }
            None => {
                state.violations.push(format!("ct_con_props on freed connection {}", conn.as_raw()));
                Err(state.failed(RetCode::FAIL, "ct_con_props: invalid connection".into()))
            }
        }
    }

    fn connect(&self, conn: ConnectionHandle) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::Connect)?;
        match state.connections.get_mut(&conn.as_raw()) {
            Some(connection) => {
                connection.connected = true;
                Ok(())
            }
            None => {
                state.violations.push(format!("ct_connect on freed connection {}", conn.as_raw()));
                Err(state.failed(RetCode::FAIL, "ct_connect: invalid connection".into()))
            }
        }
    }

    fn close(&self, conn: ConnectionHandle, option: CloseOption) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match option {
            CloseOption::Default => state.enter(NativeCall::Close)?,
            CloseOption::Force => state.enter(NativeCall::ForceClose)?,
        }
        if option == CloseOption::Default && state.results_pending {
            return Err(state.failed(RetCode::FAIL, "ct_close: results pending".into()));
        }
        match state.connections.get_mut(&conn.as_raw()) {
            Some(connection) => {
                connection.connected = false;
                Ok(())
            }
            None => {
                state.violations.push(format!("ct_close on freed connection {}", conn.as_raw()));
                Err(state.failed(RetCode::FAIL, "ct_close: invalid connection".into()))
            }
        }
    }

    fn con_drop(&self, conn: ConnectionHandle) -> NativeResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.enter(NativeCall::ConnectionDrop)?;
        match state.connections.get(&conn.as_raw()).map(|c| c.connected) {
            Some(true) => Err(state.failed(
                RetCode::FAIL,
                "ct_con_drop: connection is still open".into(),
            )),
            Some(false) => {
                state.connections.remove(&conn.as_raw());
                Ok(())
            }
            None => {
                state.violations.push(format!("double free of connection {}", conn.as_raw()));
                Err(state.failed(RetCode::FAIL, "ct_con_drop: invalid connection".into()))
            }
        }
    }

    fn diagnostic(&self, code: RetCode) -> Option<String> {
        match &self.state.lock().last_message {
            Some((last, message)) if *last == code => Some(message.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_tracks_handles() {
        let lib = MockLibrary::new();
        let ctx = lib.ctx_alloc().unwrap();
        lib.ctx_init(ctx).unwrap();
        let conn = lib.con_alloc(ctx).unwrap();
        assert_eq!(lib.live_connections(), 1);

        lib.con_drop(conn).unwrap();
        lib.ctx_exit(ctx).unwrap();
        lib.ctx_drop(ctx).unwrap();
        assert_eq!(lib.live_contexts(), 0);
        assert!(lib.violations().is_empty());
    }

    #[test]
    fn test_mock_detects_double_free() {
        let lib = MockLibrary::new();
        let ctx = lib.ctx_alloc().unwrap();
        lib.ctx_drop(ctx).unwrap();
        assert_eq!(lib.ctx_drop(ctx), Err(RetCode::FAIL));
        assert_eq!(lib.violations().len(), 1);
    }

    #[test]
    fn test_mock_force_close_ignores_pending_results() {
        let lib = MockLibrary::new();
        let ctx = lib.ctx_alloc().unwrap();
        lib.ctx_init(ctx).unwrap();
        let conn = lib.con_alloc(ctx).unwrap();
        lib.connect(conn).unwrap();
        lib.set_results_pending(true);

        assert_eq!(lib.close(conn, CloseOption::Default), Err(RetCode::FAIL));
        lib.fail(NativeCall::ForceClose, RetCode::FATAL);
        assert_eq!(lib.close(conn, CloseOption::Force), Err(RetCode::FATAL));
        lib.clear_failure(NativeCall::ForceClose);
        assert_eq!(lib.close(conn, CloseOption::Force), Ok(()));
        assert_eq!(lib.con_drop(conn), Ok(()));
    }

    #[test]
    fn test_mock_injected_failure_has_diagnostic() {
        let lib = MockLibrary::new();
        lib.fail(NativeCall::ContextAlloc, RetCode::MEM_ERROR);
        assert_eq!(lib.ctx_alloc(), Err(RetCode::MEM_ERROR));
        assert_eq!(
            lib.diagnostic(RetCode::MEM_ERROR).as_deref(),
            Some("cs_ctx_alloc: simulated failure")
        );
        assert_eq!(lib.diagnostic(RetCode::FAIL), None);
    }
}
