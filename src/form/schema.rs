//! Static per-entity form schemas

use crate::error::{Error, Result};
use crate::media::ReduceOptions;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Entity types with image-bearing forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Storefront landing page
    Landing,
    /// Product category
    Category,
    /// Catalog product
    Product,
}

/// Extra check applied to a scalar value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    /// `#RGB` or `#RRGGBB`
    HexColour,
    /// Non-negative decimal number
    Amount,
    /// Non-negative whole number
    Count,
}

/// One scalar form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSpec {
    /// Multipart field name
    pub name: &'static str,
    /// Must be non-empty to submit
    pub required: bool,
    /// Value sent when left empty
    pub default: Option<&'static str>,
    /// Format check, if any
    pub check: Option<FieldCheck>,
}

/// Single-image field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    /// Multipart field name
    pub field: &'static str,
    /// Key holding the current image URL in the server's entity
    pub source_key: &'static str,
    /// Must hold an image when creating the entity
    pub required_on_create: bool,
}

/// Multi-image field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Multipart field name
    pub field: &'static str,
    /// Key holding the current image URLs in the server's entity
    pub source_key: &'static str,
    /// Field carrying the deletion manifest
    pub deletion_field: &'static str,
    /// Maximum number of active images
    pub cap: Option<usize>,
}

/// Everything the pipeline needs to know about one entity form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// API resource path segment
    pub resource: &'static str,
    /// Scalar fields in wire order
    pub scalars: &'static [ScalarSpec],
    /// Single-image field, if any
    pub slot: Option<SlotSpec>,
    /// Multi-image field, if any
    pub collection: Option<CollectionSpec>,
    /// Reduction budget for this form's images
    pub reduce: ReduceOptions,
}

impl EntitySchema {
    /// Scalar spec by name
    pub fn scalar(&self, name: &str) -> Option<&ScalarSpec> {
        self.scalars.iter().find(|s| s.name == name)
    }

    /// Whether `field` names this form's slot or collection
    pub fn has_image_field(&self, field: &str) -> bool {
        self.slot.is_some_and(|s| s.field == field)
            || self.collection.is_some_and(|c| c.field == field)
    }
}

const fn required(name: &'static str, check: Option<FieldCheck>) -> ScalarSpec {
    ScalarSpec {
        name,
        required: true,
        default: None,
        check,
    }
}

const fn optional(
    name: &'static str,
    default: Option<&'static str>,
    check: Option<FieldCheck>,
) -> ScalarSpec {
    ScalarSpec {
        name,
        required: false,
        default,
        check,
    }
}

const LANDING: EntitySchema = EntitySchema {
    resource: "landing",
    scalars: &[
        required("storeName", None),
        required("colourCode", Some(FieldCheck::HexColour)),
        optional("currency", None, None),
    ],
    slot: Some(SlotSpec {
        field: "image",
        source_key: "image",
        required_on_create: true,
    }),
    collection: Some(CollectionSpec {
        field: "heroImage",
        source_key: "heroImage",
        deletion_field: "deletedHeroImages",
        cap: None,
    }),
    reduce: ReduceOptions::standard(),
};

const CATEGORY: EntitySchema = EntitySchema {
    resource: "cate",
    scalars: &[required("name", None), required("description", None)],
    slot: Some(SlotSpec {
        field: "categoryImage",
        source_key: "image",
        required_on_create: false,
    }),
    collection: None,
    reduce: ReduceOptions::catalog(),
};

const PRODUCT: EntitySchema = EntitySchema {
    resource: "product",
    scalars: &[
        required("name", None),
        required("description", None),
        required("category", None),
        required("price", Some(FieldCheck::Amount)),
        optional("discountPrice", Some("0"), Some(FieldCheck::Amount)),
        required("stockCount", Some(FieldCheck::Count)),
    ],
    slot: None,
    collection: Some(CollectionSpec {
        field: "productImage",
        source_key: "images",
        deletion_field: "deletedImages",
        cap: Some(5),
    }),
    reduce: ReduceOptions::catalog(),
};

impl EntityKind {
    /// All kinds, for help text and iteration
    pub const ALL: [Self; 3] = [Self::Landing, Self::Category, Self::Product];

    /// Static schema for this kind
    pub const fn schema(self) -> &'static EntitySchema {
        match self {
            Self::Landing => &LANDING,
            Self::Category => &CATEGORY,
            Self::Product => &PRODUCT,
        }
    }

    /// Lowercase name used on the command line
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Category => "category",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landing" => Ok(Self::Landing),
            "category" | "cate" => Ok(Self::Category),
            "product" => Ok(Self::Product),
            other => Err(Error::Validation(format!(
                "unknown entity kind {other:?} (expected landing, category or product)"
            ))),
        }
    }
}

fn hex_colour() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([0-9A-Fa-f]{3}){1,2}$").expect("hardcoded colour pattern is valid"))
}

impl FieldCheck {
    /// Problem with `value`, if any
    pub fn problem(self, field: &str, value: &str) -> Option<String> {
        let ok = match self {
            Self::HexColour => hex_colour().is_match(value),
            Self::Amount => value
                .parse::<f64>()
                .is_ok_and(|n| n.is_finite() && n >= 0.0),
            Self::Count => value.parse::<u64>().is_ok(),
        };
        if ok {
            return None;
        }
        let expected = match self {
            Self::HexColour => "a hex colour like #1A2B3C",
            Self::Amount => "a non-negative number",
            Self::Count => "a whole number",
        };
        Some(format!("{field} must be {expected}, got {value:?}"))
    }
}
