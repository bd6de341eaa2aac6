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

//! Statement implementation for the ASE ADBC driver.
//!
//! Command submission and result iteration are handled by the native client
//! library and are not driven from this crate, so a statement records its SQL
//! text and rejects every execution entry point.

use crate::error::AseErrorHelper;
use adbc_core::error::{Error, Result};
use adbc_core::options::{OptionStatement, OptionValue};
use adbc_core::Optionable;
use arrow_array::{RecordBatch, RecordBatchIterator, RecordBatchReader};
use arrow_schema::{ArrowError, Schema};
use driverbase::error::ErrorHelper;

type EmptyReader =
    RecordBatchIterator<std::vec::IntoIter<std::result::Result<RecordBatch, ArrowError>>>;

fn unsupported(operation: &str) -> Error {
    AseErrorHelper::not_implemented()
        .message(operation)
        .to_adbc()
}

/// A SQL statement created from an open [`Connection`](crate::Connection).
#[derive(Debug, Default)]
pub struct Statement {
    query: Option<String>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current SQL query.
    pub fn sql_query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn require_query(&self) -> Result<&str> {
        self.sql_query().ok_or_else(|| {
            AseErrorHelper::invalid_state()
                .message("no SQL query has been set")
                .to_adbc()
        })
    }
}

impl Optionable for Statement {
    type Option = OptionStatement;

    fn set_option(&mut self, key: Self::Option, _value: OptionValue) -> Result<()> {
        Err(AseErrorHelper::set_unknown_option(&key).to_adbc())
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        Err(AseErrorHelper::get_unknown_option(&key).to_adbc())
    }
}

impl adbc_core::Statement for Statement {
    fn set_sql_query(&mut self, query: impl AsRef<str>) -> Result<()> {
        let query = query.as_ref().trim();
        if query.is_empty() {
            return Err(AseErrorHelper::invalid_argument()
                .message("SQL query is empty")
                .to_adbc());
        }
        self.query = Some(query.to_string());
        Ok(())
    }

    fn set_substrait_plan(&mut self, _plan: impl AsRef<[u8]>) -> Result<()> {
        Err(unsupported("Substrait plans"))
    }

    fn prepare(&mut self) -> Result<()> {
        self.require_query()?;
        Err(unsupported("prepare"))
    }

    fn get_parameter_schema(&self) -> Result<Schema> {
        Err(unsupported("get_parameter_schema"))
    }

    fn bind(&mut self, _batch: RecordBatch) -> Result<()> {
        Err(unsupported("bind parameters"))
    }

    fn bind_stream(&mut self, _stream: Box<dyn RecordBatchReader + Send>) -> Result<()> {
        Err(unsupported("bind_stream"))
    }

    fn execute(&mut self) -> Result<impl RecordBatchReader + Send> {
        self.require_query()?;
        Err::<EmptyReader, _>(unsupported("execute"))
    }

    fn execute_update(&mut self) -> Result<Option<i64>> {
        self.require_query()?;
        Err(unsupported("execute_update"))
    }

    fn execute_schema(&mut self) -> Result<Schema> {
        self.require_query()?;
        Err(unsupported("execute_schema"))
    }

    fn execute_partitions(&mut self) -> Result<adbc_core::PartitionedResult> {
        Err(unsupported("execute_partitions"))
    }

    fn cancel(&mut self) -> Result<()> {
        Err(unsupported("cancel"))
    }
}
