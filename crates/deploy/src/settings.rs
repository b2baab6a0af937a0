//! Merging of caller-supplied overrides with module defaults.
//!
//! Every resolver describes its configuration as a struct of optional fields.
//! The defaults for a resolver are an instance of that same struct, built by the
//! resolver itself (there is no ambient, global default state). Merging is done
//! field by field through the [`Merge`] trait, and each field falls into one of
//! three documented categories:
//!
//! - *override wins / default fallback*: an `Option<T>` leaf. `Some` in the
//!   override replaces the default, `None` falls back to it.
//! - *whole-object replacement*: an `Option<T>` where `T` is a complete value
//!   (for example a pre-built dependency deployment). Same rule as a leaf: the
//!   override is never combined with the default's inner fields.
//! - *deep-merge one level*: an `Option<T>` where `T: Merge` is itself a partial
//!   struct. Supplying a partial nested struct keeps the sibling default fields.
//!
//! A field that is still `None` after merging has no default. Resolvers turn
//! that into a configuration error with [`required`].

use alloy_core::primitives::Address;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Field-by-field merge of an override layer onto a defaults layer.
pub trait Merge: Sized {
    /// Merge `self` (the overrides) onto `defaults`.
    fn merge(self, defaults: Self) -> Self;
}

impl<T> Merge for Option<T> {
    fn merge(self, defaults: Self) -> Self {
        self.or(defaults)
    }
}

/// Merge optional overrides onto a set of defaults.
///
/// Absent overrides yield the defaults unchanged.
pub fn merge<T: Merge>(overrides: Option<T>, defaults: T) -> T {
    match overrides {
        Some(overrides) => overrides.merge(defaults),
        None => defaults,
    }
}

/// Deep-merge one level: both sides are partial structs, merged field by field.
pub fn merge_nested<T: Merge>(overrides: Option<T>, defaults: Option<T>) -> Option<T> {
    match (overrides, defaults) {
        (Some(overrides), Some(defaults)) => Some(overrides.merge(defaults)),
        (overrides, defaults) => overrides.or(defaults),
    }
}

/// Extract a merged field that must be present.
///
/// Returns a configuration error naming the missing field otherwise.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    match value {
        Some(value) => Ok(value),
        None => anyhow::bail!(
            "Missing required setting `{}`: no override was supplied and it has no default",
            field
        ),
    }
}

/// Per-step deployment options shared by every resolver.
///
/// Resolvers build their defaults with [`StepOptions::named`] and deep-merge the
/// caller's options on top of them, so overriding only `from` keeps the default
/// step id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOptions {
    /// Step id within the current context. Override wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Account that sends the deployment transaction. Override wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

impl StepOptions {
    /// Default options for a step with the given id.
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            from: None,
        }
    }
}

impl Merge for StepOptions {
    fn merge(self, defaults: Self) -> Self {
        Self {
            id: self.id.merge(defaults.id),
            from: self.from.merge(defaults.from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_and_default_fallback() {
        assert_eq!(Some(1).merge(Some(2)), Some(1));
        assert_eq!(None.merge(Some(2)), Some(2));
        assert_eq!(None::<u32>.merge(None), None);
    }

    #[test]
    fn test_absent_overrides_yield_defaults() {
        let defaults = StepOptions::named("OpenToken");
        assert_eq!(merge(None, defaults.clone()), defaults);
    }

    #[test]
    fn test_partial_nested_keeps_sibling_defaults() {
        let sender = Address::repeat_byte(0x11);
        let overrides = StepOptions {
            id: None,
            from: Some(sender),
        };

        let merged = merge_nested(Some(overrides), Some(StepOptions::named("OpenToken")))
            .expect("both sides present");

        assert_eq!(merged.id.as_deref(), Some("OpenToken"));
        assert_eq!(merged.from, Some(sender));
    }

    #[test]
    fn test_required_reports_field_name() {
        let err = required::<u32>(None, "whitelistRoot").unwrap_err();
        assert!(err.to_string().contains("whitelistRoot"));
        assert_eq!(required(Some(7), "publicMintTime").unwrap(), 7);
    }
}
