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

//! Concurrent open/close against a shared driver context.

use ase_adbc::native::mock::MockLibrary;
use ase_adbc::native::{NativeCall, RetCode};
use ase_adbc::{Connection, ConnectionConfig, DriverContext};
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

fn config() -> ConnectionConfig {
    ConnectionConfig::from_dsn("ase://user:pw@dbhost:4901").unwrap()
}

/// Runs `threads` workers that each open and close `rounds` connections.
///
/// `pattern` decides per round whether a worker yields between open and
/// close, which shuffles the interleaving of acquires and releases.
fn run(context: &Arc<DriverContext>, threads: usize, rounds: usize, pattern: &[bool]) {
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            let context = Arc::clone(context);
            let barrier = Arc::clone(&barrier);
            let pattern = pattern.to_vec();
            thread::spawn(move || {
                let config = config();
                barrier.wait();
                for round in 0..rounds {
                    let Ok(mut connection) = Connection::open(&context, &config) else {
                        continue;
                    };
                    if pattern[(worker + round) % pattern.len()] {
                        thread::yield_now();
                    }
                    let _ = connection.close();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_open_close_balances_context(
        threads in 1usize..12,
        rounds in 1usize..8,
        pattern in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let lib = Arc::new(MockLibrary::new());
        let context = Arc::new(DriverContext::new(lib.clone()));

        run(&context, threads, rounds, &pattern);

        prop_assert_eq!(context.connection_count(), 0);
        prop_assert!(!context.is_initialized());
        prop_assert_eq!(lib.live_contexts(), 0);
        prop_assert_eq!(lib.live_connections(), 0);
        prop_assert!(lib.violations().is_empty(), "{:?}", lib.violations());
    }

    #[test]
    fn concurrent_failures_balance_context(
        threads in 2usize..10,
        rounds in 1usize..6,
        pattern in prop::collection::vec(any::<bool>(), 1..8),
        failing in prop::sample::select(vec![
            NativeCall::ConnectionAlloc,
            NativeCall::Connect,
            NativeCall::ConnectionDrop,
        ]),
    ) {
        let lib = Arc::new(MockLibrary::new());
        let context = Arc::new(DriverContext::new(lib.clone()));
        lib.fail(failing, RetCode::FAIL);

        run(&context, threads, rounds, &pattern);

        prop_assert_eq!(context.connection_count(), 0);
        prop_assert!(!context.is_initialized());
    }
}

#[test]
fn connections_held_across_threads_share_one_context() {
    let lib = Arc::new(MockLibrary::new());
    let context = Arc::new(DriverContext::new(lib.clone()));
    let config = config();

    let connections: Vec<_> = (0..8)
        .map(|_| Connection::open(&context, &config).unwrap())
        .collect();
    assert_eq!(context.connection_count(), 8);
    assert_eq!(lib.contexts_allocated(), 1);

    let handles: Vec<_> = connections
        .into_iter()
        .map(|mut connection| thread::spawn(move || connection.close()))
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(context.connection_count(), 0);
    assert_eq!(lib.live_contexts(), 0);
    assert!(lib.violations().is_empty());
}
