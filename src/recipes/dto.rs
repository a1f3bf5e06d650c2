use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::recipes::repo_types::{Ingredient, RecipeDetails, RecipeListing, Tag};

/// Body for tag and ingredient creation.
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub assigned_only: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<Decimal>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// List representation: associations as ids.
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// Detail representation: associations expanded to `{id, name}` objects.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl From<RecipeListing> for RecipeSummary {
    fn from(l: RecipeListing) -> Self {
        Self {
            id: l.recipe.id,
            title: l.recipe.title,
            time_minutes: l.recipe.time_minutes,
            price: l.recipe.price,
            tags: l.tag_ids,
            ingredients: l.ingredient_ids,
        }
    }
}

impl From<RecipeDetails> for RecipeDetail {
    fn from(d: RecipeDetails) -> Self {
        Self {
            id: d.recipe.id,
            title: d.recipe.title,
            time_minutes: d.recipe.time_minutes,
            price: d.recipe.price,
            tags: d.tags,
            ingredients: d.ingredients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::repo_types::Recipe;
    use uuid::Uuid;

    fn details() -> RecipeDetails {
        let owner = Uuid::new_v4();
        RecipeDetails {
            recipe: Recipe {
                id: 7,
                user_id: owner,
                title: "Sample Title".into(),
                time_minutes: 10,
                price: Decimal::new(500, 2),
            },
            tags: vec![
                Tag { id: 1, user_id: owner, name: "Vegan".into() },
                Tag { id: 2, user_id: owner, name: "Dessert".into() },
            ],
            ingredients: vec![Ingredient { id: 3, user_id: owner, name: "Kale".into() }],
        }
    }

    #[test]
    fn detail_expands_and_summary_does_not() {
        let detail = serde_json::to_value(RecipeDetail::from(details())).unwrap();
        assert_eq!(detail["tags"][0]["name"], "Vegan");
        assert_eq!(detail["tags"][1]["id"], 2);
        assert_eq!(detail["ingredients"][0]["name"], "Kale");
        assert_eq!(detail["price"], "5.00");

        let summary = serde_json::to_value(RecipeSummary::from(RecipeListing::from(details()))).unwrap();
        assert_eq!(summary["tags"], serde_json::json!([1, 2]));
        assert_eq!(summary["ingredients"], serde_json::json!([3]));
    }

    #[test]
    fn owner_is_never_serialized() {
        let json = serde_json::to_value(RecipeDetail::from(details())).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json["tags"][0].get("user_id").is_none());
    }
}
