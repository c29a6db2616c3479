use crate::validation::{validate_link, validate_not_blank, validate_price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// A tag or ingredient referenced by name inside a recipe payload.
/// Resolved against the caller's existing records, created when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AttributeRef {
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
}

/// Tag or ingredient projection: `{id, name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeView {
    pub id: i64,
    pub name: String,
}

/// POST /tags, POST /ingredients
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttributeRequest {
    #[serde(default)]
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
}

/// PATCH /tags/{id}, PATCH /ingredients/{id}
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AttributePatch {
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,
}

/// Full recipe payload, used by POST and PUT.
///
/// `tags`/`ingredients` left out of a PUT keep the existing links; an empty
/// list clears them.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecipeRequest {
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_not_blank")
    )]
    pub title: String,
    pub time_minutes: i32,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_link"))]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(nested)]
    pub tags: Option<Vec<AttributeRef>>,
    #[serde(default)]
    #[validate(nested)]
    pub ingredients: Option<Vec<AttributeRef>>,
}

/// Partial recipe payload, used by PATCH. Unknown keys such as `user` are
/// dropped by serde, so ownership cannot be reassigned.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecipePatch {
    #[validate(
        length(max = 255, message = "Ensure this field has no more than 255 characters."),
        custom(function = "validate_not_blank")
    )]
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,
    #[validate(custom(function = "validate_link"))]
    pub link: Option<String>,
    pub description: Option<String>,
    #[validate(nested)]
    pub tags: Option<Vec<AttributeRef>>,
    #[validate(nested)]
    pub ingredients: Option<Vec<AttributeRef>>,
}

impl From<RecipeRequest> for RecipePatch {
    fn from(req: RecipeRequest) -> Self {
        Self {
            title: Some(req.title),
            time_minutes: Some(req.time_minutes),
            price: Some(req.price),
            link: Some(req.link),
            description: Some(req.description),
            tags: req.tags,
            ingredients: req.ingredients,
        }
    }
}

/// List projection of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeView {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<AttributeView>,
    pub ingredients: Vec<AttributeView>,
}

/// Detail projection: the list fields plus description and image URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetailView {
    #[serde(flatten)]
    pub recipe: RecipeView,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeImageView {
    pub id: i64,
    pub image: Option<String>,
}

/// Trimmed names, sorted and without duplicates. Upserting in this order
/// makes concurrent transactions lock existing rows in the same sequence.
pub fn unique_names(refs: &[AttributeRef]) -> Vec<String> {
    refs.iter()
        .map(|r| r.name.trim().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
