use std::collections::HashMap;

use async_trait::async_trait;

use crate::db::{PgStore, StoreError};
use crate::recipes::ownership::{ensure_resolved, Owner, ID_DESC, NAME_DESC};
use crate::recipes::repo_types::{
    Ingredient, NewRecipe, Recipe, RecipeDetails, RecipeListing, Tag,
};

/// Catalog accessors. Every method is scoped to the given [`Owner`].
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn create_tag(&self, owner: Owner, name: &str) -> Result<Tag, StoreError>;
    /// Owner's tags, name descending.
    async fn list_tags(&self, owner: Owner) -> Result<Vec<Tag>, StoreError>;

    async fn create_ingredient(&self, owner: Owner, name: &str) -> Result<Ingredient, StoreError>;
    /// Owner's ingredients, name descending. With `assigned_only`, just those
    /// attached to at least one of the owner's recipes, each listed once.
    async fn list_ingredients(
        &self,
        owner: Owner,
        assigned_only: bool,
    ) -> Result<Vec<Ingredient>, StoreError>;

    /// Insert the recipe and its association rows atomically. Referenced ids
    /// must resolve to the owner's own tags/ingredients.
    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> Result<RecipeDetails, StoreError>;
    /// Owner's recipes, id descending.
    async fn list_recipes(&self, owner: Owner) -> Result<Vec<RecipeListing>, StoreError>;
    async fn get_recipe(&self, owner: Owner, id: i64) -> Result<Option<RecipeDetails>, StoreError>;
}

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price";

fn group_links(links: Vec<(i64, i64)>) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (recipe_id, other_id) in links {
        grouped.entry(recipe_id).or_default().push(other_id);
    }
    grouped
}

// Exercised against a real database by the `#[ignore]`d tests below; run them
// with `TEST_DATABASE_URL` set and `--ignored`.
#[async_trait]
impl CatalogRepo for PgStore {
    async fn create_tag(&self, owner: Owner, name: &str) -> Result<Tag, StoreError> {
        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        )
        .bind(owner.id())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn list_tags(&self, owner: Owner) -> Result<Vec<Tag>, StoreError> {
        let sql = format!("SELECT id, user_id, name FROM tags WHERE user_id = $1 {NAME_DESC}");
        let tags = sqlx::query_as::<_, Tag>(&sql)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    async fn create_ingredient(&self, owner: Owner, name: &str) -> Result<Ingredient, StoreError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "INSERT INTO ingredients (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        )
        .bind(owner.id())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(ingredient)
    }

    async fn list_ingredients(
        &self,
        owner: Owner,
        assigned_only: bool,
    ) -> Result<Vec<Ingredient>, StoreError> {
        // EXISTS keeps each ingredient to a single row however many recipes use it.
        let assigned = if assigned_only {
            "AND EXISTS (
                SELECT 1
                  FROM recipe_ingredients ri
                  JOIN recipes r ON r.id = ri.recipe_id
                 WHERE ri.ingredient_id = ingredients.id
                   AND r.user_id = $1
            )"
        } else {
            ""
        };
        let sql = format!(
            "SELECT id, user_id, name FROM ingredients WHERE user_id = $1 {assigned} {NAME_DESC}"
        );
        let ingredients = sqlx::query_as::<_, Ingredient>(&sql)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(ingredients)
    }

    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> Result<RecipeDetails, StoreError> {
        let mut tx = self.pool.begin().await?;

        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, user_id, name FROM tags WHERE user_id = $1 AND id = ANY($2) ORDER BY id",
        )
        .bind(owner.id())
        .bind(recipe.tag_ids.clone())
        .fetch_all(&mut *tx)
        .await?;
        ensure_resolved("tags", &recipe.tag_ids, tags.iter().map(|t| t.id))?;

        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT id, user_id, name FROM ingredients WHERE user_id = $1 AND id = ANY($2) ORDER BY id",
        )
        .bind(owner.id())
        .bind(recipe.ingredient_ids.clone())
        .fetch_all(&mut *tx)
        .await?;
        ensure_resolved(
            "ingredients",
            &recipe.ingredient_ids,
            ingredients.iter().map(|i| i.id),
        )?;

        let sql = format!(
            "INSERT INTO recipes (user_id, title, time_minutes, price) \
             VALUES ($1, $2, $3, $4) RETURNING {RECIPE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner.id())
            .bind(&recipe.title)
            .bind(recipe.time_minutes)
            .bind(recipe.price)
            .fetch_one(&mut *tx)
            .await?;

        for tag in &tags {
            sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await?;
        }
        for ingredient in &ingredients {
            sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(ingredient.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(RecipeDetails {
            recipe: row,
            tags,
            ingredients,
        })
    }

    async fn list_recipes(&self, owner: Owner) -> Result<Vec<RecipeListing>, StoreError> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 {ID_DESC}");
        let recipes = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

        let tag_links = sqlx::query_as::<_, (i64, i64)>(
            "SELECT recipe_id, tag_id FROM recipe_tags WHERE recipe_id = ANY($1) ORDER BY tag_id",
        )
        .bind(ids.clone())
        .fetch_all(&self.pool)
        .await?;
        let ingredient_links = sqlx::query_as::<_, (i64, i64)>(
            "SELECT recipe_id, ingredient_id FROM recipe_ingredients \
             WHERE recipe_id = ANY($1) ORDER BY ingredient_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags = group_links(tag_links);
        let mut ingredients = group_links(ingredient_links);
        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeListing {
                tag_ids: tags.remove(&recipe.id).unwrap_or_default(),
                ingredient_ids: ingredients.remove(&recipe.id).unwrap_or_default(),
                recipe,
            })
            .collect())
    }

    async fn get_recipe(&self, owner: Owner, id: i64) -> Result<Option<RecipeDetails>, StoreError> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");
        let Some(recipe) = sqlx::query_as::<_, Recipe>(&sql)
            .bind(id)
            .bind(owner.id())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.user_id, t.name
              FROM tags t
              JOIN recipe_tags rt ON rt.tag_id = t.id
             WHERE rt.recipe_id = $1
             ORDER BY t.id
            "#,
        )
        .bind(recipe.id)
        .fetch_all(&self.pool)
        .await?;

        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT i.id, i.user_id, i.name
              FROM ingredients i
              JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
             WHERE ri.recipe_id = $1
             ORDER BY i.id
            "#,
        )
        .bind(recipe.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(RecipeDetails {
            recipe,
            tags,
            ingredients,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_links_keeps_link_order_per_recipe() {
        let grouped = group_links(vec![(1, 10), (2, 20), (1, 11)]);
        assert_eq!(grouped[&1], vec![10, 11]);
        assert_eq!(grouped[&2], vec![20]);
        assert!(!grouped.contains_key(&3));
    }

    mod postgres {
        use rust_decimal::Decimal;

        use super::super::*;
        use crate::users::{repo::UserRepo, repo_types::NewUser};

        async fn store() -> PgStore {
            let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL");
            PgStore::connect(&url).await.expect("connect")
        }

        async fn owner(store: &PgStore) -> Owner {
            let user = store
                .insert_user(NewUser {
                    email: format!("{}@example.com", uuid::Uuid::new_v4()),
                    password_hash: "x".into(),
                    first_name: String::new(),
                    last_name: String::new(),
                })
                .await
                .unwrap();
            Owner::new(user.id)
        }

        fn recipe(tag_ids: Vec<i64>, ingredient_ids: Vec<i64>) -> NewRecipe {
            NewRecipe {
                title: "Omelette".into(),
                time_minutes: 10,
                price: Decimal::new(99_999_999_99, 2),
                tag_ids,
                ingredient_ids,
            }
        }

        #[tokio::test]
        #[ignore = "needs TEST_DATABASE_URL"]
        async fn create_recipe_links_only_owned_rows() {
            let store = store().await;
            let me = owner(&store).await;
            let other = owner(&store).await;
            let vegan = store.create_tag(me, "Vegan").await.unwrap();
            let theirs = store.create_tag(other, "Private").await.unwrap();
            let eggs = store.create_ingredient(me, "Eggs").await.unwrap();

            let err = store
                .create_recipe(me, recipe(vec![vegan.id, theirs.id], vec![eggs.id]))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                StoreError::MissingReference { field: "tags", ref ids } if *ids == vec![theirs.id]
            ));
            assert!(store.list_recipes(me).await.unwrap().is_empty());

            let created = store
                .create_recipe(me, recipe(vec![vegan.id], vec![eggs.id]))
                .await
                .unwrap();
            assert_eq!(created.recipe.price.to_string(), "99999999.99");

            let listed = store.list_recipes(me).await.unwrap();
            assert_eq!(listed[0].tag_ids, vec![vegan.id]);
            assert_eq!(listed[0].ingredient_ids, vec![eggs.id]);

            let details = store.get_recipe(me, created.recipe.id).await.unwrap().unwrap();
            assert_eq!(details.tags, vec![vegan]);
            assert!(store.get_recipe(other, created.recipe.id).await.unwrap().is_none());
        }

        #[tokio::test]
        #[ignore = "needs TEST_DATABASE_URL"]
        async fn assigned_ingredients_are_distinct_and_scoped() {
            let store = store().await;
            let me = owner(&store).await;
            let eggs = store.create_ingredient(me, "Eggs").await.unwrap();
            let cheese = store.create_ingredient(me, "Cheese").await.unwrap();
            store.create_ingredient(me, "Turkey").await.unwrap();

            store.create_recipe(me, recipe(vec![], vec![eggs.id])).await.unwrap();
            store
                .create_recipe(me, recipe(vec![], vec![eggs.id, cheese.id]))
                .await
                .unwrap();

            let assigned = store.list_ingredients(me, true).await.unwrap();
            assert_eq!(assigned, vec![eggs, cheese]);
            assert_eq!(store.list_ingredients(me, false).await.unwrap().len(), 3);
        }
    }
}
