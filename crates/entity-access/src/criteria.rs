//! Equality criteria over named entity attributes.
//!
//! Attribute names are plain strings and are only resolved against an
//! entity's columns when a query is built, so the same `Criteria` value can
//! be handed to any store. An unknown attribute is a validation error.

use std::fmt::Display;
use std::str::FromStr;

use sea_orm::{ColumnTrait, Condition, EntityTrait, Value};

use common::{AppError, AppResult};

use crate::entity_name;

/// A single attribute test.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `attribute = value`
    Eq { value: Value, shown: String },
    /// `attribute IS NULL`
    IsNull,
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    attribute: String,
    label: Option<String>,
    filter: Filter,
}

/// Ordered set of attribute filters, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    terms: Vec<Term>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `attribute` to equal `value`.
    pub fn eq<V>(mut self, attribute: impl Into<String>, value: V) -> Self
    where
        V: Into<Value> + Display,
    {
        let shown = value.to_string();
        self.push(
            attribute.into(),
            Filter::Eq {
                value: value.into(),
                shown,
            },
        )
    }

    /// Require `attribute` to equal an already converted store value.
    pub fn eq_value(mut self, attribute: impl Into<String>, value: Value) -> Self {
        let shown = format!("{:?}", value);
        self.push(attribute.into(), Filter::Eq { value, shown })
    }

    /// Require `attribute` to be NULL.
    pub fn is_null(self, attribute: impl Into<String>) -> Self {
        self.push(attribute.into(), Filter::IsNull)
    }

    /// Name the most recently added attribute differently in messages,
    /// e.g. `criteria! { email => e }.labeled("email address")`.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        if let Some(term) = self.terms.last_mut() {
            term.label = Some(label.into());
        }
        self
    }

    fn push(mut self, attribute: String, filter: Filter) -> Self {
        self.terms.push(Term {
            attribute,
            label: None,
            filter,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.terms
            .iter()
            .map(|term| (term.attribute.as_str(), &term.filter))
    }

    /// Human-readable form for messages, e.g. `email a@b.c and first name Ann`.
    pub fn describe(&self) -> String {
        self.terms
            .iter()
            .map(|term| {
                let label = match &term.label {
                    Some(label) => label.clone(),
                    None => term.attribute.replace('_', " "),
                };
                match &term.filter {
                    Filter::Eq { shown, .. } => format!("{} {}", label, shown),
                    Filter::IsNull => format!("{} unset", label),
                }
            })
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// Resolve the filters against `E`'s columns.
    pub fn condition<E>(&self) -> AppResult<Condition>
    where
        E: EntityTrait,
        E::Column: FromStr,
    {
        let mut condition = Condition::all();
        for term in &self.terms {
            let column = E::Column::from_str(&term.attribute).map_err(|_| {
                AppError::validation(format!(
                    "{} does not have field '{}'",
                    entity_name::<E>(),
                    term.attribute
                ))
            })?;

            condition = match &term.filter {
                Filter::Eq { value, .. } => condition.add(column.eq(value.clone())),
                Filter::IsNull => condition.add(column.is_null()),
            };
        }
        Ok(condition)
    }
}

/// Build `Criteria` with keyword-style syntax.
///
/// ```
/// use entity_access::criteria;
///
/// let by_email = criteria! { email => "ann@example.com" };
/// assert_eq!(by_email.len(), 1);
/// ```
#[macro_export]
macro_rules! criteria {
    () => {
        $crate::Criteria::new()
    };
    ($($attribute:ident => $value:expr),+ $(,)?) => {
        $crate::Criteria::new()$(.eq(stringify!($attribute), $value))+
    };
}
