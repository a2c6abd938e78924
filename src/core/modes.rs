//! Mode tokens and mode → model resolution
//!
//! Callers pick a quality/cost tier per request. `pro` and `light` map to
//! model identifiers on the shared chat-completion endpoint; `basic`
//! targets the separately configured fallback endpoint. Resolution never
//! fails: unknown tokens behave as `pro`, with a marker so the default is
//! visible to logs and tests.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Pro,
    Light,
    Basic,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Pro => "pro",
            Mode::Light => "light",
            Mode::Basic => "basic",
        }
    }
}

/// Outcome of resolving a caller-supplied mode token.
///
/// `defaulted` is true when the token was unrecognized and the resolver
/// silently fell back to `pro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMode {
    pub mode: Mode,
    pub defaulted: bool,
}

pub fn resolve_mode(token: &str) -> ResolvedMode {
    match token {
        "pro" => ResolvedMode {
            mode: Mode::Pro,
            defaulted: false,
        },
        "light" => ResolvedMode {
            mode: Mode::Light,
            defaulted: false,
        },
        "basic" => ResolvedMode {
            mode: Mode::Basic,
            defaulted: false,
        },
        _ => ResolvedMode {
            mode: Mode::Pro,
            defaulted: true,
        },
    }
}

#[derive(Debug, Deserialize)]
struct BuiltinModelsFile {
    models: BuiltinModels,
}

#[derive(Debug, Deserialize)]
struct BuiltinModels {
    pro: String,
    light: String,
}

/// The mode → model mapping used for the chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct ModelTable {
    pro: String,
    light: String,
}

impl ModelTable {
    /// Load the built-in table from the embedded configuration.
    pub fn builtin() -> Self {
        const TABLE_CONTENT: &str = include_str!("../builtin_models.toml");

        let file: BuiltinModelsFile =
            toml::from_str(TABLE_CONTENT).expect("Failed to parse builtin_models.toml");

        ModelTable {
            pro: file.models.pro,
            light: file.models.light,
        }
    }

    /// Built-in table with per-mode overrides from the config file applied.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::builtin();
        if let Some(model) = overrides.get("pro") {
            table.pro = model.clone();
        }
        if let Some(model) = overrides.get("light") {
            table.light = model.clone();
        }
        table
    }

    /// Model identifier for a mode, or `None` for `basic` (which has no
    /// model on the shared endpoint).
    pub fn model_for(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Pro => Some(&self.pro),
            Mode::Light => Some(&self.light),
            Mode::Basic => None,
        }
    }
}
