use rust_decimal::Decimal;

use crate::error::{ApiError, FieldErrors};
use crate::recipes::{dto::CreateRecipeRequest, repo_types::NewRecipe};

pub const MAX_NAME_LEN: usize = 255;

/// Fractional digits of the `NUMERIC(10, 2)` price column.
const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound of the `NUMERIC(10, 2)` price column.
fn max_price() -> Decimal {
    Decimal::new(100_000_000, 0)
}

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Trimmed, non-blank, length-bounded text field. Problems are collected into `errors`.
fn clean_text(field: &str, value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > MAX_NAME_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        );
        return None;
    }
    Some(value)
}

/// Tag/ingredient name.
pub fn clean_name(name: Option<String>) -> Result<String, ApiError> {
    let mut errors = FieldErrors::new();
    let name = clean_text("name", name, &mut errors);
    match name {
        Some(name) => Ok(name),
        None => Err(ApiError::Validation(errors)),
    }
}

fn dedup(ids: Option<Vec<i64>>) -> Vec<i64> {
    let mut seen = Vec::new();
    for id in ids.unwrap_or_default() {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Check every scalar field and report all problems at once.
pub fn validate_recipe(req: CreateRecipeRequest) -> Result<NewRecipe, ApiError> {
    let mut errors = FieldErrors::new();

    let title = clean_text("title", req.title, &mut errors);

    let time_minutes = match req.time_minutes {
        None => {
            errors.add("time_minutes", REQUIRED);
            None
        }
        Some(v) => match i32::try_from(v) {
            Ok(v) if v >= 0 => Some(v),
            Ok(_) => {
                errors.add("time_minutes", "Ensure this value is greater than or equal to 0.");
                None
            }
            Err(_) => {
                errors.add("time_minutes", "A valid integer is required.");
                None
            }
        },
    };

    let price = match req.price.map(|p| p.normalize()) {
        None => {
            errors.add("price", REQUIRED);
            None
        }
        Some(p) if p.is_sign_negative() && !p.is_zero() => {
            errors.add("price", "Ensure this value is greater than or equal to 0.");
            None
        }
        Some(p) if p.scale() > PRICE_SCALE => {
            errors.add("price", "Ensure that there are no more than 2 decimal places.");
            None
        }
        Some(p) if p >= max_price() => {
            errors.add("price", "Ensure that there are no more than 10 digits in total.");
            None
        }
        Some(mut p) => {
            if p.is_zero() {
                p = Decimal::ZERO;
            }
            p.rescale(PRICE_SCALE);
            Some(p)
        }
    };

    match (title, time_minutes, price) {
        (Some(title), Some(time_minutes), Some(price)) if errors.is_empty() => Ok(NewRecipe {
            title,
            time_minutes,
            price,
            tag_ids: dedup(req.tags),
            ingredient_ids: dedup(req.ingredients),
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// `assigned_only` query flag: absent or `0` is off, any other integer is on.
pub fn parse_assigned_only(raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) => v
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| ApiError::field("assigned_only", "A valid integer is required.")),
    }
}
