// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./echo.toml` > `~/.config/echo/echo.toml` > `/etc/echo/echo.toml`
//! with environment variable overrides via `ECHO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::EchoConfig;

/// Top-level sections that environment variables may address.
const SECTIONS: &[&str] = &[
    "storage",
    "import",
    "embedding",
    "index",
    "agent",
    "extraction",
    "timeline",
    "logging",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/echo/echo.toml` (system-wide)
/// 3. `~/.config/echo/echo.toml` (user XDG config)
/// 4. `./echo.toml` (local directory)
/// 5. `ECHO_*` environment variables
pub fn load_config() -> Result<EchoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<EchoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EchoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EchoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EchoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EchoConfig::default()))
        .merge(Toml::file("/etc/echo/echo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("echo/echo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("echo.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `ECHO_<SECTION>_<KEY>` to `section.key`.
///
/// Only the leading section name is split off, so keys containing
/// underscores stay intact: `ECHO_EXTRACTION_MAX_CONCURRENT` maps to
/// `extraction.max_concurrent`.
fn env_provider() -> Env {
    Env::prefixed("ECHO_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(
            map_env_key("extraction_max_concurrent"),
            "extraction.max_concurrent"
        );
        assert_eq!(map_env_key("index_api_key"), "index.api_key");
        assert_eq!(
            map_env_key("embedding_sparse_batch_size"),
            "embedding.sparse_batch_size"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "echo.toml",
                r#"
[extraction]
max_concurrent = 3
"#,
            )?;
            jail.set_env("ECHO_EXTRACTION_MAX_CONCURRENT", "7");
            jail.set_env("ECHO_INDEX_COLLECTION", "from_env");

            let config = load_config_from_path(Path::new("echo.toml"))?;
            assert_eq!(config.extraction.max_concurrent, 7);
            assert_eq!(config.index.collection, "from_env");
            Ok(())
        });
    }

    #[test]
    fn string_source_uses_defaults_for_missing_sections() {
        let config = load_config_from_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.storage.database_path, "echo_messages.db");
    }
}
