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

//! Reference-counted native context shared by all connections of a driver.
//!
//! CT-Lib needs one initialized context before any connection can be
//! allocated. The context is created when the first connection acquires it
//! and torn down when the last one releases it. A single lock guards the
//! handle and the count, so concurrent opens and closes can neither
//! initialize the context twice nor free it while another thread is using it.

use crate::error::{Error, Result};
use crate::native::{describe_failure, ClientLibrary, ContextHandle, NativeCall};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ContextState {
    // Present iff `connections > 0`.
    handle: Option<ContextHandle>,
    connections: usize,
}

/// The driver-wide native context.
#[derive(Debug)]
pub struct DriverContext {
    library: Arc<dyn ClientLibrary>,
    state: Mutex<ContextState>,
}

impl DriverContext {
    pub fn new(library: Arc<dyn ClientLibrary>) -> Self {
        Self {
            library,
            state: Mutex::new(ContextState::default()),
        }
    }

    /// The client library this context allocates from.
    pub fn library(&self) -> &Arc<dyn ClientLibrary> {
        &self.library
    }

    /// Number of live connections holding the context.
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections
    }

    /// Whether the native context currently exists.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    /// Registers a connection, creating the native context if needed.
    ///
    /// The returned lease releases the registration when dropped.
    pub fn acquire(self: &Arc<Self>) -> Result<ContextLease> {
        let mut state = self.state.lock();

        let handle = match state.handle {
            Some(handle) => handle,
            None => {
                let handle = self.initialize()?;
                state.handle = Some(handle);
                handle
            }
        };
        state.connections += 1;
        tracing::debug!(connections = state.connections, "acquired driver context");

        Ok(ContextLease {
            context: Some(Arc::clone(self)),
            handle,
        })
    }

    /// Unregisters a connection, tearing the native context down with the
    /// last one.
    ///
    /// Teardown failures are returned, but the context is forgotten either
    /// way so the next [`acquire`](Self::acquire) starts from scratch.
    pub fn release(&self) -> Result<()> {
        let mut state = self.state.lock();

        if state.connections == 0 {
            return Err(Error::InvalidState(
                "driver context released more often than acquired".into(),
            ));
        }
        state.connections -= 1;
        tracing::debug!(connections = state.connections, "released driver context");

        if state.connections > 0 {
            return Ok(());
        }
        match state.handle.take() {
            Some(handle) => self.teardown(handle),
            None => Ok(()),
        }
    }

    fn initialize(&self) -> Result<ContextHandle> {
        let lib: &dyn ClientLibrary = self.library.as_ref();
        let init_failed = |call, code| Error::ContextInitFailed {
            call,
            code,
            message: describe_failure(lib, call, code),
        };

        let handle = lib
            .ctx_alloc()
            .map_err(|code| init_failed(NativeCall::ContextAlloc, code))?;

        if let Err(code) = lib.ctx_init(handle) {
            let error = init_failed(NativeCall::ContextInit, code);
            if let Err(code) = lib.ctx_drop(handle) {
                tracing::warn!(%code, "cs_ctx_drop failed after ct_init failure");
            }
            return Err(error);
        }

        tracing::debug!(handle = handle.as_raw(), "initialized driver context");
        Ok(handle)
    }

    fn teardown(&self, handle: ContextHandle) -> Result<()> {
        let lib: &dyn ClientLibrary = self.library.as_ref();
        let failed = |call, code| Error::NativeCallFailed {
            call,
            code,
            message: describe_failure(lib, call, code),
        };

        let exited = lib
            .ctx_exit(handle)
            .map_err(|code| failed(NativeCall::ContextExit, code));
        let dropped = lib
            .ctx_drop(handle)
            .map_err(|code| failed(NativeCall::ContextDrop, code));

        tracing::debug!(handle = handle.as_raw(), "tore down driver context");
        exited.and(dropped)
    }
}

/// A connection's registration with the [`DriverContext`].
///
/// Releasing happens exactly once: explicitly through
/// [`release`](Self::release), or on drop.
#[derive(Debug)]
pub struct ContextLease {
    context: Option<Arc<DriverContext>>,
    handle: ContextHandle,
}

impl ContextLease {
    /// The native context handle, valid for the lifetime of the lease.
    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Releases the registration and reports teardown errors.
    pub fn release(mut self) -> Result<()> {
        match self.context.take() {
            Some(context) => context.release(),
            None => Ok(()),
        }
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            if let Err(error) = context.release() {
                tracing::warn!(%error, "failed to release driver context");
            }
        }
    }
}
