//! Ownership scoping for catalog rows.
//!
//! Every catalog accessor takes an [`Owner`]. Reads only ever see rows whose
//! `user_id` equals the owner, creates always stamp the owner's id, and the
//! listing orders below are shared by every store backend.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::StoreError;
use crate::recipes::repo_types::{Ingredient, Recipe, Tag};

/// `ORDER BY` clause for tag and ingredient listings.
pub const NAME_DESC: &str = "ORDER BY name DESC, id DESC";
/// `ORDER BY` clause for recipe listings.
pub const ID_DESC: &str = "ORDER BY id DESC";

/// The authenticated caller a catalog operation is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner(Uuid);

impl Owner {
    #[cfg(test)]
    pub(crate) fn new(user_id: Uuid) -> Self {
        Self(user_id)
    }

    pub fn id(self) -> Uuid {
        self.0
    }

    pub fn owns<T: Owned>(self, row: &T) -> bool {
        row.owner_id() == self.0
    }
}

impl From<AuthUser> for Owner {
    fn from(AuthUser(user_id): AuthUser) -> Self {
        Self(user_id)
    }
}

pub trait Owned {
    fn owner_id(&self) -> Uuid;
    fn row_id(&self) -> i64;
}

pub trait Named: Owned {
    fn name(&self) -> &str;
}

macro_rules! owned_row {
    ($ty:ty) => {
        impl Owned for $ty {
            fn owner_id(&self) -> Uuid {
                self.user_id
            }
            fn row_id(&self) -> i64 {
                self.id
            }
        }
    };
}

owned_row!(Tag);
owned_row!(Ingredient);
owned_row!(Recipe);

impl Named for Tag {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Ingredient {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Rows visible to `owner`, cloned out of a shared collection.
pub fn visible<'a, T, I>(owner: Owner, rows: I) -> Vec<T>
where
    T: Owned + Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    rows.into_iter().filter(|r| owner.owns(*r)).cloned().collect()
}

pub fn sort_name_desc<T: Named>(rows: &mut [T]) {
    rows.sort_by(|a, b| {
        b.name()
            .cmp(a.name())
            .then_with(|| b.row_id().cmp(&a.row_id()))
    });
}

pub fn sort_id_desc<T: Owned>(rows: &mut [T]) {
    rows.sort_by(|a, b| b.row_id().cmp(&a.row_id()));
}

/// Fails with the requested ids that did not come back from an owner-scoped lookup.
pub fn ensure_resolved(
    field: &'static str,
    requested: &[i64],
    found: impl IntoIterator<Item = i64>,
) -> Result<(), StoreError> {
    let found: BTreeSet<i64> = found.into_iter().collect();
    let missing: Vec<i64> = requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::MissingReference { field, ids: missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64, owner: Owner, name: &str) -> Tag {
        Tag {
            id,
            user_id: owner.id(),
            name: name.into(),
        }
    }

    #[test]
    fn visible_keeps_only_owned_rows() {
        let a = Owner::new(Uuid::new_v4());
        let b = Owner::new(Uuid::new_v4());
        let rows = vec![tag(1, a, "Vegan"), tag(2, b, "Dessert"), tag(3, a, "Main")];

        let seen = visible(a, &rows);
        assert_eq!(seen.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(visible(b, &rows).iter().all(|t| b.owns(t)));
    }

    #[test]
    fn name_desc_breaks_ties_by_newest() {
        let a = Owner::new(Uuid::new_v4());
        let mut rows = vec![
            tag(1, a, "Cucumber"),
            tag(2, a, "Yogurt"),
            tag(3, a, "Cucumber"),
        ];
        sort_name_desc(&mut rows);
        assert_eq!(rows.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn id_desc_puts_newest_first() {
        let a = Owner::new(Uuid::new_v4());
        let mut rows = vec![tag(1, a, "x"), tag(5, a, "y"), tag(3, a, "z")];
        sort_id_desc(&mut rows);
        assert_eq!(rows.iter().map(|t| t.id).collect::<Vec<_>>(), vec![5, 3, 1]);
    }

    #[test]
    fn ensure_resolved_reports_missing_ids() {
        assert!(ensure_resolved("tags", &[1, 2], [2, 1]).is_ok());
        assert!(ensure_resolved("tags", &[], []).is_ok());

        match ensure_resolved("ingredients", &[1, 7, 9], [1]) {
            Err(StoreError::MissingReference { field, ids }) => {
                assert_eq!(field, "ingredients");
                assert_eq!(ids, vec![7, 9]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
