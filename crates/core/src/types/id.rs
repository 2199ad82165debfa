//! Newtype IDs for type-safe entity references.
//!
//! Marketplace and tenant identifiers are opaque strings (document ids,
//! marketplace order numbers), so the wrappers are string-backed.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use fluxori_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(ListingId);
///
/// let warehouse = WarehouseId::new("wh-1");
/// let listing = ListingId::new("wh-1");
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = listing;
/// assert_eq!(warehouse.as_str(), listing.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert into the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Tenant owning a set of connectors.
define_id!(OrganizationId);
// Marketplace-assigned order identifier.
define_id!(OrderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let org = OrganizationId::new("org-42");
        assert_eq!(org.to_string(), "org-42");
        assert_eq!(org.as_str(), "org-42");

        let raw: String = org.clone().into();
        assert_eq!(raw, "org-42");
        assert_eq!(OrganizationId::from(raw), org);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let order = OrderId::new("100234");
        let json = serde_json::to_string(&order).expect("serialize");
        assert_eq!(json, "\"100234\"");

        let parsed: OrderId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, order);
    }
}
