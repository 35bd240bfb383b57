use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::entity::ingredient;

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct IngredientResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "salt")]
    pub name: String,
    #[schema(example = "g")]
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            measurement_unit: model.measurement_unit,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IngredientSearchQuery {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}
