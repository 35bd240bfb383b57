use chrono::{Datelike, NaiveDate};
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;

use crate::entity::{ingredient, recipe_ingredient, shopping_cart};

/// One aggregated line: an ingredient with its amount summed across the cart.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sum ingredient amounts over every recipe in the user's cart.
///
/// Lines are unique per `(name, measurement_unit)` and ordered by name.
pub async fn aggregate<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<ShoppingListLine>, DbErr> {
    recipe_ingredient::Entity::find()
        .select_only()
        .column(ingredient::Column::Name)
        .column(ingredient::Column::MeasurementUnit)
        .column_as(recipe_ingredient::Column::Amount.sum(), "amount")
        .inner_join(ingredient::Entity)
        .filter(
            recipe_ingredient::Column::RecipeId.in_subquery(
                SeaQuery::select()
                    .column(shopping_cart::Column::RecipeId)
                    .from(shopping_cart::Entity)
                    .and_where(shopping_cart::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        )
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .into_model::<ShoppingListLine>()
        .all(db)
        .await
}

/// Render the plain-text export.
pub fn render(owner: &str, lines: &[ShoppingListLine], today: NaiveDate) -> String {
    let mut out = format!(
        "Shopping list for: {owner}\nDate: {}\nIngredients:\n",
        today.format("%d-%m-%Y")
    );
    for line in lines {
        out.push_str(&format!(
            "- {} ({}) - {}\n",
            line.name, line.measurement_unit, line.amount
        ));
    }
    out.push_str(&format!("Foodgram ({})\n", today.year()));
    out
}

pub fn attachment_filename(username: &str) -> String {
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect();
    format!("{safe}_shopping_list.txt")
}
