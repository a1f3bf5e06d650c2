use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::AuthUser,
    error::{ApiError, JsonBody},
    recipes::{
        dto::{CreateRecipeRequest, IngredientQuery, NameRequest, RecipeDetail, RecipeSummary},
        ownership::Owner,
        repo_types::{Ingredient, RecipeListing, Tag},
        services::{clean_name, parse_assigned_only, validate_recipe},
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/tags", get(list_tags).post(create_tag))
        .route(
            "/recipe/ingredients",
            get(list_ingredients).post(create_ingredient),
        )
        .route("/recipe/recipes", get(list_recipes).post(create_recipe))
        .route("/recipe/recipes/:id", get(get_recipe))
}

#[instrument(skip(state, auth))]
pub async fn list_tags(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.catalog.list_tags(Owner::from(auth)).await?;
    Ok(Json(tags))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<NameRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let name = clean_name(payload.name)?;
    let tag = state.catalog.create_tag(Owner::from(auth), &name).await?;
    info!(tag_id = tag.id, user_id = %tag.user_id, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

#[instrument(skip(state, auth))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let assigned_only = parse_assigned_only(q.assigned_only.as_deref())?;
    let ingredients = state
        .catalog
        .list_ingredients(Owner::from(auth), assigned_only)
        .await?;
    Ok(Json(ingredients))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<NameRequest>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let name = clean_name(payload.name)?;
    let ingredient = state
        .catalog
        .create_ingredient(Owner::from(auth), &name)
        .await?;
    info!(ingredient_id = ingredient.id, user_id = %ingredient.user_id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[instrument(skip(state, auth))]
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RecipeSummary>>, ApiError> {
    let recipes = state.catalog.list_recipes(Owner::from(auth)).await?;
    Ok(Json(recipes.into_iter().map(RecipeSummary::from).collect()))
}

#[instrument(skip(state, auth, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = Owner::from(auth);
    let recipe = validate_recipe(payload)?;
    let created = state.catalog.create_recipe(owner, recipe).await.map_err(|e| {
        warn!(error = %e, user_id = %owner.id(), "create recipe rejected");
        ApiError::from(e)
    })?;

    let location = format!("/recipe/recipes/{}", created.recipe.id);
    info!(recipe_id = created.recipe.id, user_id = %owner.id(), "recipe created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(RecipeSummary::from(RecipeListing::from(created))),
    ))
}

#[instrument(skip(state, auth))]
pub async fn get_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let owner = Owner::from(auth);
    // A malformed id cannot name a recipe, so it is simply not found.
    let not_found = || ApiError::NotFound("Recipe not found".into());
    let id: i64 = id.parse().map_err(|_| not_found())?;

    match state.catalog.get_recipe(owner, id).await? {
        Some(details) => Ok(Json(RecipeDetail::from(details))),
        None => {
            warn!(user_id = %owner.id(), recipe_id = id, "recipe not found for caller");
            Err(not_found())
        }
    }
}
