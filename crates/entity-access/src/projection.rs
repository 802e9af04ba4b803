//! Projection of models into string-keyed maps for the API boundary.

use sea_orm::{EntityTrait, IdenStatic, Iterable};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use common::{AppError, AppResult};

use crate::entity_name;

/// Every mapped column of `model`, keyed by column name.
///
/// Fields the model serializes that are not columns are left out; a column
/// the model does not serialize is an error.
pub fn to_dict<E>(model: &E::Model) -> AppResult<Map<String, JsonValue>>
where
    E: EntityTrait,
    E::Model: Serialize,
{
    let mut document = match serde_json::to_value(model)? {
        JsonValue::Object(document) => document,
        _ => {
            return Err(AppError::internal(format!(
                "{} does not serialize to an object",
                entity_name::<E>()
            )))
        }
    };

    let mut dict = Map::new();
    for column in E::Column::iter() {
        let name = column.as_str();
        let value = document.remove(name).ok_or_else(|| {
            AppError::internal(format!(
                "{} does not serialize column '{}'",
                entity_name::<E>(),
                name
            ))
        })?;
        dict.insert(name.to_string(), value);
    }
    Ok(dict)
}

/// Debug rendering in the form `users(id=1, email=ann@example.com)`.
pub fn describe<E>(model: &E::Model) -> String
where
    E: EntityTrait,
    E::Model: Serialize,
{
    match to_dict::<E>(model) {
        Ok(dict) => {
            let attributes = dict
                .iter()
                .map(|(name, value)| match value {
                    JsonValue::String(text) => format!("{}={}", name, text),
                    other => format!("{}={}", name, other),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", entity_name::<E>(), attributes)
        }
        Err(_) => format!("{}({:?})", entity_name::<E>(), model),
    }
}
