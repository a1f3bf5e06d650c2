use std::collections::BTreeSet;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::StoreError;
use crate::recipes::{
    ownership::{ensure_resolved, sort_id_desc, sort_name_desc, visible, Owner},
    repo::CatalogRepo,
    repo_types::{Ingredient, NewRecipe, Recipe, RecipeDetails, RecipeListing, Tag},
};
use crate::users::{
    repo::UserRepo,
    repo_types::{NewUser, User, UserChanges},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    recipe_tags: BTreeSet<(i64, i64)>,
    recipe_ingredients: BTreeSet<(i64, i64)>,
    next_tag: i64,
    next_ingredient: i64,
    next_recipe: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn details(&self, recipe: &Recipe) -> RecipeDetails {
        let tags = self
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe.id)
            .filter_map(|(_, t)| self.tags.iter().find(|tag| tag.id == *t))
            .cloned()
            .collect();
        let ingredients = self
            .recipe_ingredients
            .iter()
            .filter(|(r, _)| *r == recipe.id)
            .filter_map(|(_, i)| self.ingredients.iter().find(|ing| ing.id == *i))
            .cloned()
            .collect();
        RecipeDetails {
            recipe: recipe.clone(),
            tags,
            ingredients,
        }
    }
}

/// In-process store with the same contract as the Postgres one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate {
                entity: "user",
                field: "email",
            });
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: OffsetDateTime::now_utc(),
            last_login: None,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut t = self.tables.write().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        changes.apply(user);
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        // Insertion order is join order.
        Ok(self.tables.read().await.users.clone())
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn create_tag(&self, owner: Owner, name: &str) -> Result<Tag, StoreError> {
        let mut t = self.tables.write().await;
        let tag = Tag {
            id: next_id(&mut t.next_tag),
            user_id: owner.id(),
            name: name.to_string(),
        };
        t.tags.push(tag.clone());
        Ok(tag)
    }

    async fn list_tags(&self, owner: Owner) -> Result<Vec<Tag>, StoreError> {
        let t = self.tables.read().await;
        let mut tags = visible(owner, &t.tags);
        sort_name_desc(&mut tags);
        Ok(tags)
    }

    async fn create_ingredient(&self, owner: Owner, name: &str) -> Result<Ingredient, StoreError> {
        let mut t = self.tables.write().await;
        let ingredient = Ingredient {
            id: next_id(&mut t.next_ingredient),
            user_id: owner.id(),
            name: name.to_string(),
        };
        t.ingredients.push(ingredient.clone());
        Ok(ingredient)
    }

    async fn list_ingredients(
        &self,
        owner: Owner,
        assigned_only: bool,
    ) -> Result<Vec<Ingredient>, StoreError> {
        let t = self.tables.read().await;
        let mut ingredients = visible(owner, &t.ingredients);
        if assigned_only {
            let owned_recipes: BTreeSet<i64> = visible(owner, &t.recipes)
                .into_iter()
                .map(|r: Recipe| r.id)
                .collect();
            let assigned: BTreeSet<i64> = t
                .recipe_ingredients
                .iter()
                .filter(|(r, _)| owned_recipes.contains(r))
                .map(|(_, i)| *i)
                .collect();
            ingredients.retain(|i| assigned.contains(&i.id));
        }
        sort_name_desc(&mut ingredients);
        Ok(ingredients)
    }

    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> Result<RecipeDetails, StoreError> {
        let mut t = self.tables.write().await;

        let tag_ids: Vec<i64> = visible(owner, &t.tags).into_iter().map(|tag: Tag| tag.id).collect();
        let tag_ids: Vec<i64> = recipe
            .tag_ids
            .iter()
            .copied()
            .filter(|id| tag_ids.contains(id))
            .collect();
        ensure_resolved("tags", &recipe.tag_ids, tag_ids.iter().copied())?;

        let ingredient_ids: Vec<i64> = visible(owner, &t.ingredients)
            .into_iter()
            .map(|i: Ingredient| i.id)
            .collect();
        let ingredient_ids: Vec<i64> = recipe
            .ingredient_ids
            .iter()
            .copied()
            .filter(|id| ingredient_ids.contains(id))
            .collect();
        ensure_resolved(
            "ingredients",
            &recipe.ingredient_ids,
            ingredient_ids.iter().copied(),
        )?;

        let row = Recipe {
            id: next_id(&mut t.next_recipe),
            user_id: owner.id(),
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
        };
        t.recipes.push(row.clone());
        for tag_id in tag_ids {
            t.recipe_tags.insert((row.id, tag_id));
        }
        for ingredient_id in ingredient_ids {
            t.recipe_ingredients.insert((row.id, ingredient_id));
        }
        Ok(t.details(&row))
    }

    async fn list_recipes(&self, owner: Owner) -> Result<Vec<RecipeListing>, StoreError> {
        let t = self.tables.read().await;
        let mut recipes = visible(owner, &t.recipes);
        sort_id_desc(&mut recipes);
        Ok(recipes
            .iter()
            .map(|r| RecipeListing::from(t.details(r)))
            .collect())
    }

    async fn get_recipe(&self, owner: Owner, id: i64) -> Result<Option<RecipeDetails>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.recipes
            .iter()
            .find(|r| r.id == id && owner.owns(*r))
            .map(|r| t.details(r)))
    }
}
