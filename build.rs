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

//! Build script for the `ctlib` feature.
//!
//! Reads the CT-Lib constants the binding needs from the installed Open
//! Client headers (`$SYBASE/$SYBASE_OCS/include`) and points the linker at
//! the matching `lib` directory. Without the feature this does nothing.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Constants the binding uses, by header name.
const CONSTANTS: &[&str] = &[
    "CS_SUCCEED",
    "CS_UNUSED",
    "CS_NULLTERM",
    "CS_TRUE",
    "CS_FALSE",
    "CS_SET",
    "CS_GET",
    "CS_CLEAR",
    "CS_INIT",
    "CS_STATUS",
    "CS_FORCE_CLOSE",
    "CS_CLIENTMSG_TYPE",
    "CS_SERVERMSG_TYPE",
    "CS_ALLMSG_TYPE",
    "CS_MAX_MSG",
    "CS_MAX_CHAR",
    "CS_SQLSTATE_SIZE",
    "CS_USERNAME",
    "CS_PASSWORD",
    "CS_SERVERADDR",
    "CS_SEC_EXTENDED_ENCRYPTION",
    "CS_SEC_NON_ENCRYPTION_RETRY",
    "CS_SEC_USERSTOREKEY",
];

/// Library versions to request, newest first.
const VERSIONS: &[&str] = &[
    "CS_CURRENT_VERSION",
    "CS_VERSION_160",
    "CS_VERSION_157",
    "CS_VERSION_155",
    "CS_VERSION_150",
];

fn main() {
    println!("cargo:rerun-if-env-changed=SYBASE");
    println!("cargo:rerun-if-env-changed=SYBASE_OCS");

    if env::var_os("CARGO_FEATURE_CTLIB").is_none() {
        return;
    }

    let ocs = ocs_dir();
    let include = ocs.join("include");
    println!("cargo:rustc-link-search=native={}", ocs.join("lib").display());

    let mut defines = HashMap::new();
    for header in ["cstypes.h", "cspublic.h", "ctpublic.h"] {
        let path = include.join(header);
        println!("cargo:rerun-if-changed={}", path.display());
        read_defines(&path, &mut defines);
    }

    let mut out = String::from("// Generated from the Open Client headers.\n");
    for name in CONSTANTS {
        let value = resolve(&defines, name, 0)
            .unwrap_or_else(|| panic!("{name} not found in {}", include.display()));
        out.push_str(&format!("pub const {name}: CS_INT = {value};\n"));
    }
    let version = VERSIONS
        .iter()
        .find_map(|name| resolve(&defines, name, 0))
        .unwrap_or_else(|| panic!("no CS_VERSION_* constant in {}", include.display()));
    out.push_str(&format!("pub const CS_VERSION: CS_INT = {version};\n"));

    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(dest.join("ctlib_consts.rs"), out).expect("failed to write ctlib_consts.rs");
}

fn ocs_dir() -> PathBuf {
    let sybase = env::var("SYBASE")
        .expect("the ctlib feature needs SYBASE pointing at the Open Client installation");
    let ocs = env::var("SYBASE_OCS").unwrap_or_else(|_| "OCS-16_0".to_string());
    Path::new(&sybase).join(ocs)
}

/// Collects `#define NAME VALUE` lines, keeping the raw value text.
fn read_defines(path: &Path, defines: &mut HashMap<String, String>) {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix("#define") else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        defines.insert(name.to_string(), strip_cast(value).to_string());
    }
}

/// `(CS_INT)9100` and `((CS_INT)-9)` become `9100` and `-9`.
fn strip_cast(value: &str) -> &str {
    let value = value.trim_matches(|c| c == '(' || c == ')');
    match value.rsplit_once(')') {
        Some((_, rest)) => rest.trim_matches(|c| c == '(' || c == ')'),
        None => value,
    }
}

/// Evaluates a define that is a number or an alias of another define.
fn resolve(defines: &HashMap<String, String>, name: &str, depth: usize) -> Option<i64> {
    if depth > 8 {
        return None;
    }
    let value = defines.get(name)?;
    value
        .parse()
        .ok()
        .or_else(|| resolve(defines, value, depth + 1))
}
