use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Tag {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub name: String,
}

/// Scalar columns of a recipe row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
}

/// Validated input for a recipe insert. Id lists are de-duplicated.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}

/// Recipe with the ids of its associations, as listed.
#[derive(Debug, Clone)]
pub struct RecipeListing {
    pub recipe: Recipe,
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}

/// Recipe with its associations resolved to full rows.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl From<RecipeDetails> for RecipeListing {
    fn from(d: RecipeDetails) -> Self {
        Self {
            tag_ids: d.tags.iter().map(|t| t.id).collect(),
            ingredient_ids: d.ingredients.iter().map(|i| i.id).collect(),
            recipe: d.recipe,
        }
    }
}
