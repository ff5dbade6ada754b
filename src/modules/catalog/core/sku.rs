use serde::{Deserialize, Serialize};

const GENERATED_SKU_LEN: usize = 7;

/// A variation's SKU together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", content = "code", rename_all = "snake_case")]
pub enum Sku {
    /// Entered by a merchant.
    Assigned(String),
    /// Filled in by the POS when the merchant left the field blank.
    Generated(String),
    Missing,
}

impl Sku {
    /// Classifies a raw SKU as reported upstream.
    ///
    /// A code is POS-generated only when it is exactly seven uppercase ASCII
    /// alphanumerics mixing letters and digits. Blank codes are `Missing`.
    pub fn classify(raw: Option<&str>) -> Sku {
        let Some(code) = raw.map(str::trim).filter(|c| !c.is_empty()) else {
            return Sku::Missing;
        };
        if looks_generated(code) {
            Sku::Generated(code.to_string())
        } else {
            Sku::Assigned(code.to_string())
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Sku::Assigned(code) | Sku::Generated(code) => Some(code),
            Sku::Missing => None,
        }
    }

    pub fn origin(&self) -> &'static str {
        match self {
            Sku::Assigned(_) => "assigned",
            Sku::Generated(_) => "generated",
            Sku::Missing => "missing",
        }
    }

    /// Rebuilds a SKU from its stored columns.
    pub fn from_parts(code: Option<String>, origin: &str) -> Sku {
        match (code, origin) {
            (Some(code), "generated") => Sku::Generated(code),
            (Some(code), _) => Sku::Assigned(code),
            (None, _) => Sku::Missing,
        }
    }
}

fn looks_generated(code: &str) -> bool {
    code.len() == GENERATED_SKU_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && code.chars().any(|c| c.is_ascii_digit())
        && code.chars().any(|c| c.is_ascii_uppercase())
}
