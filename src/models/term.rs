use std::cmp::Ordering;
use std::fmt;

use async_graphql::{ComplexObject, Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::DbConn;
use crate::error::{AxoError, AxoResult};

pub type TermId = i64;

/// Spring sorts before Fall within a year.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    sqlx::Type,
    Serialize,
    Deserialize,
)]
#[sqlx(type_name = "season", rename_all = "snake_case")]
pub enum Season {
    Spring,
    Fall,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Spring => write!(f, "Spring"),
            Season::Fall => write!(f, "Fall"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject, sqlx::FromRow, Serialize, Deserialize)]
#[graphql(complex)]
pub struct Term {
    /// The ID of the term
    pub id: TermId,
    /// Which half of the year the term falls in
    pub season: Season,
    /// The calendar year of the term
    pub year: i32,
}

#[ComplexObject]
impl Term {
    /// The display name of the term, e.g. "Fall 2017"
    pub async fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.year)
    }
}

impl Term {
    /// Most recent first: year descending, and Fall ahead of Spring in the same year.
    pub fn recency_order(a: &Self, b: &Self) -> Ordering {
        b.year
            .cmp(&a.year)
            .then_with(|| b.season.cmp(&a.season))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub async fn with_id(id: TermId, conn: &DbConn) -> AxoResult<Self> {
        Self::with_id_opt(id, conn)
            .await?
            .ok_or_else(|| AxoError::not_found("term", id))
    }

    pub async fn with_id_opt(id: TermId, conn: &DbConn) -> AxoResult<Option<Self>> {
        conn.term(id).await
    }

    pub async fn all(conn: &DbConn) -> AxoResult<Vec<Self>> {
        let mut terms = conn.terms().await?;
        terms.sort_by(Self::recency_order);

        Ok(terms)
    }

    pub async fn most_recent(conn: &DbConn) -> AxoResult<Option<Self>> {
        Ok(Self::all(conn).await?.into_iter().next())
    }

    pub async fn create(new_term: NewTerm, conn: &DbConn) -> AxoResult<Self> {
        if Self::all(conn)
            .await?
            .iter()
            .any(|term| term.season == new_term.season && term.year == new_term.year)
        {
            return Err(AxoError::invalid(format!(
                "A term already exists for {} {}",
                new_term.season, new_term.year
            )));
        }

        let term = conn.create_term(new_term).await?;
        info!(term = term.id, "created term {}", term);

        Ok(term)
    }
}

#[derive(Clone, Debug, InputObject, Serialize, Deserialize)]
pub struct NewTerm {
    pub season: Season,
    pub year: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: TermId, season: Season, year: i32) -> Term {
        Term { id, season, year }
    }

    #[test]
    fn terms_sort_most_recent_first() {
        let mut terms = vec![
            term(1, Season::Spring, 2016),
            term(2, Season::Fall, 2016),
            term(3, Season::Spring, 2017),
            term(4, Season::Fall, 2017),
        ];
        terms.sort_by(Term::recency_order);

        let names: Vec<String> = terms.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["Fall 2017", "Spring 2017", "Fall 2016", "Spring 2016"]
        );
    }
}
