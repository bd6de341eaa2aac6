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

//! ADBC Driver implementation for ASE.

use crate::context::DriverContext;
use crate::database::Database;
use crate::native::ClientLibrary;
use adbc_core::error::Result;
use adbc_core::options::{OptionDatabase, OptionValue};
use adbc_core::Optionable;
use std::sync::Arc;

/// The main entry point for the ASE ADBC driver.
///
/// The Driver owns the native context shared by every Database and
/// Connection created from it. The context is initialized lazily by the
/// first connection and torn down when the last one closes.
#[derive(Debug)]
pub struct Driver {
    context: Arc<DriverContext>,
}

impl Driver {
    /// Creates a new Driver backed by the given client library.
    pub fn new(library: Arc<dyn ClientLibrary>) -> Self {
        Self {
            context: Arc::new(DriverContext::new(library)),
        }
    }

    /// Creates a new Driver backed by the system CT-Lib.
    #[cfg(feature = "ctlib")]
    pub fn ctlib() -> Self {
        Self::new(Arc::new(crate::native::ctlib::CtLib::new()))
    }

    /// Returns the context shared by this driver's connections.
    pub fn context(&self) -> &Arc<DriverContext> {
        &self.context
    }
}

#[cfg(feature = "ctlib")]
impl Default for Driver {
    fn default() -> Self {
        Self::ctlib()
    }
}

impl adbc_core::Driver for Driver {
    type DatabaseType = Database;

    fn new_database(&mut self) -> Result<Self::DatabaseType> {
        Ok(Database::new(Arc::clone(&self.context)))
    }

    fn new_database_with_opts(
        &mut self,
        opts: impl IntoIterator<Item = (OptionDatabase, OptionValue)>,
    ) -> Result<Self::DatabaseType> {
        let mut database = self.new_database()?;
        for (key, value) in opts {
            database.set_option(key, value)?;
        }
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::mock::MockLibrary;
    use adbc_core::Database as _;
    use adbc_core::Driver as _;

    #[test]
    fn test_driver_new_database() {
        let mut driver = Driver::new(Arc::new(MockLibrary::new()));
        assert!(driver.new_database().is_ok());
        assert!(!driver.context().is_initialized());
    }

    #[test]
    fn test_databases_share_context() {
        let mut driver = Driver::new(Arc::new(MockLibrary::new()));
        let opts = || {
            [(
                OptionDatabase::Uri,
                OptionValue::String("ase://user:pw@dbhost:4901".into()),
            )]
        };
        let first = driver.new_database_with_opts(opts()).unwrap();
        let second = driver.new_database_with_opts(opts()).unwrap();

        let a = first.new_connection().unwrap();
        let b = second.new_connection().unwrap();
        assert_eq!(driver.context().connection_count(), 2);

        drop(a);
        drop(b);
        assert_eq!(driver.context().connection_count(), 0);
        assert!(!driver.context().is_initialized());
    }
}
