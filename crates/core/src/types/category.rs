//! Fixed sweet categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for a category outside the fixed set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} is not a valid category")]
pub struct CategoryError(pub String);

/// Catalog category.
///
/// Serialized in lower case; `HardCandy` is `"hard candy"` with a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "storefront.sweet_category"))]
pub enum Category {
    #[serde(rename = "chocolate")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "chocolate"))]
    Chocolate,
    #[serde(rename = "candy")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "candy"))]
    Candy,
    #[serde(rename = "gummy")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "gummy"))]
    Gummy,
    #[serde(rename = "hard candy")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "hard candy"))]
    HardCandy,
    #[serde(rename = "lollipop")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "lollipop"))]
    Lollipop,
    #[serde(rename = "other")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "other"))]
    Other,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Chocolate,
        Self::Candy,
        Self::Gummy,
        Self::HardCandy,
        Self::Lollipop,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chocolate => "chocolate",
            Self::Candy => "candy",
            Self::Gummy => "gummy",
            Self::HardCandy => "hard candy",
            Self::Lollipop => "lollipop",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}
