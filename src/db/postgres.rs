use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;

use crate::db::Store;
use crate::error::{AxoError, AxoResult};
use crate::models::event::excuse::{
    Excuse, ExcuseFilter, ExcuseId, ExcuseStatus, NewExcuse, Resolution,
};
use crate::models::event::{Event, EventAttendance, EventFilter, EventId, MemberSet, NewEvent};
use crate::models::member::{Member, MemberId, NewMember};
use crate::models::term::{NewTerm, Term, TermId};

const MEMBER_FIELDS: &str = "id, first_name, last_name, email, status, class_year";
const EVENT_FIELDS: &str = r#"id, name, term, mandatory, activated, points, "date""#;
const EXCUSE_FIELDS: &str = "id, reason, freebie, status, member, event, submitted_at";

/// A Postgres-backed store. Each member set mutation runs in one
/// transaction that first locks the event's row.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> AxoResult<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> AxoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;

        Ok(())
    }

    async fn lock_event(tx: &mut Transaction<'_, Postgres>, event: EventId) -> AxoResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event)
            .fetch_optional(&mut *tx)
            .await?
            .map(|_| ())
            .ok_or_else(|| AxoError::not_found("event", event))
    }

    /// Fails if the member sits in the freebied set of another event in the
    /// excused event's term. Locks the member row so approvals for one member
    /// run one at a time.
    async fn ensure_freebie_unused(
        tx: &mut Transaction<'_, Postgres>,
        excuse: &Excuse,
    ) -> AxoResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(excuse.member)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AxoError::not_found("member", excuse.member))?;

        let used = sqlx::query_scalar::<_, String>(
            "SELECT e.name FROM event_members m
             JOIN events e ON e.id = m.event
             WHERE m.member = $1
               AND m.kind = 'freebied'::member_set
               AND e.id <> $2
               AND e.term = (SELECT term FROM events WHERE id = $2)
             LIMIT 1",
        )
        .bind(excuse.member)
        .bind(excuse.event)
        .fetch_optional(&mut *tx)
        .await?;

        match used {
            Some(name) => Err(AxoError::invalid(format!(
                "Member {} already used a freebie on {}",
                excuse.member, name
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn member(&self, id: MemberId) -> AxoResult<Option<Member>> {
        sqlx::query_as::<_, Member>(&format!("SELECT {MEMBER_FIELDS} FROM members WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn members(&self) -> AxoResult<Vec<Member>> {
        sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_FIELDS} FROM members ORDER BY first_name, last_name, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn create_member(&self, new_member: NewMember) -> AxoResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO members (first_name, last_name, email, status, class_year)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MEMBER_FIELDS}"
        ))
        .bind(new_member.first_name)
        .bind(new_member.last_name)
        .bind(new_member.email)
        .bind(new_member.status)
        .bind(new_member.class_year)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn term(&self, id: TermId) -> AxoResult<Option<Term>> {
        sqlx::query_as::<_, Term>("SELECT id, season, year FROM terms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn terms(&self) -> AxoResult<Vec<Term>> {
        sqlx::query_as::<_, Term>("SELECT id, season, year FROM terms")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn create_term(&self, new_term: NewTerm) -> AxoResult<Term> {
        sqlx::query_as::<_, Term>(
            "INSERT INTO terms (season, year) VALUES ($1, $2) RETURNING id, season, year",
        )
        .bind(new_term.season)
        .bind(new_term.year)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn event(&self, id: EventId) -> AxoResult<Option<Event>> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_FIELDS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn events(&self, filter: &EventFilter) -> AxoResult<Vec<Event>> {
        sqlx::query_as::<_, Event>(&format!(
            r#"SELECT {EVENT_FIELDS} FROM events
             WHERE ($1::bigint IS NULL OR term = $1)
               AND ($2::timestamptz IS NULL OR "date" >= $2)
               AND ($3::timestamptz IS NULL OR "date" <= $3)
               AND ($4::boolean IS NULL OR activated = $4)
               AND ($5::boolean IS NULL OR mandatory = $5)
             ORDER BY "date", id"#
        ))
        .bind(filter.term)
        .bind(filter.from.map(OffsetDateTime::from))
        .bind(filter.to.map(OffsetDateTime::from))
        .bind(filter.activated)
        .bind(filter.mandatory)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn create_event(&self, new_event: NewEvent) -> AxoResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            r#"INSERT INTO events (name, term, mandatory, points, "date")
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {EVENT_FIELDS}"#
        ))
        .bind(new_event.name)
        .bind(new_event.term)
        .bind(new_event.mandatory)
        .bind(new_event.points)
        .bind(OffsetDateTime::from(new_event.date))
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn attendance(&self, event: EventId) -> AxoResult<EventAttendance> {
        let rows = sqlx::query_as::<_, (MemberId, MemberSet)>(
            "SELECT member, kind FROM event_members WHERE event = $1",
        )
        .bind(event)
        .fetch_all(&self.pool)
        .await?;

        let mut attendance = EventAttendance::default();
        for (member, set) in rows {
            attendance.set_mut(set).insert(member);
        }

        Ok(attendance)
    }

    async fn activate(&self, event: EventId, required: &[MemberId]) -> AxoResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut tx, event).await?;

        sqlx::query("UPDATE events SET activated = true WHERE id = $1")
            .bind(event)
            .execute(&mut tx)
            .await?;
        sqlx::query("DELETE FROM event_members WHERE event = $1 AND kind = 'required'::member_set")
            .bind(event)
            .execute(&mut tx)
            .await?;
        sqlx::query(
            "INSERT INTO event_members (event, member, kind)
             SELECT $1, UNNEST($2::bigint[]), 'required'::member_set
             ON CONFLICT DO NOTHING",
        )
        .bind(event)
        .bind(required)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn check_in(&self, event: EventId, member: MemberId) -> AxoResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut tx, event).await?;

        sqlx::query(
            "DELETE FROM event_members
             WHERE event = $1 AND member = $2
               AND kind IN ('excused'::member_set, 'freebied'::member_set)",
        )
        .bind(event)
        .bind(member)
        .execute(&mut tx)
        .await?;
        sqlx::query(
            "INSERT INTO event_members (event, member, kind)
             VALUES ($1, $2, 'attended'::member_set)
             ON CONFLICT DO NOTHING",
        )
        .bind(event)
        .bind(member)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn excuse(&self, id: ExcuseId) -> AxoResult<Option<Excuse>> {
        sqlx::query_as::<_, Excuse>(&format!("SELECT {EXCUSE_FIELDS} FROM excuses WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn excuses(&self, filter: &ExcuseFilter) -> AxoResult<Vec<Excuse>> {
        sqlx::query_as::<_, Excuse>(&format!(
            "SELECT {EXCUSE_FIELDS} FROM excuses
             WHERE ($1::bigint IS NULL OR member = $1)
               AND ($2::bigint IS NULL OR event = $2)
               AND ($3::bigint IS NULL OR event IN (SELECT id FROM events WHERE term = $3))
               AND ($4::excuse_status IS NULL OR status = $4)
             ORDER BY submitted_at, id"
        ))
        .bind(filter.member)
        .bind(filter.event)
        .bind(filter.term)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn create_excuse(
        &self,
        new_excuse: NewExcuse,
        submitted_at: OffsetDateTime,
    ) -> AxoResult<Excuse> {
        sqlx::query_as::<_, Excuse>(&format!(
            "INSERT INTO excuses (member, event, reason, freebie, submitted_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {EXCUSE_FIELDS}"
        ))
        .bind(new_excuse.member)
        .bind(new_excuse.event)
        .bind(new_excuse.reason)
        .bind(new_excuse.freebie)
        .bind(submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn resolve_excuse(&self, id: ExcuseId, resolution: Resolution) -> AxoResult<Excuse> {
        let mut tx = self.pool.begin().await?;
        let excuse = sqlx::query_as::<_, Excuse>(&format!(
            "SELECT {EXCUSE_FIELDS} FROM excuses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| AxoError::not_found("excuse", id))?;
        Self::lock_event(&mut tx, excuse.event).await?;

        let resolved = sqlx::query_as::<_, Excuse>(&format!(
            "UPDATE excuses SET status = $2
             WHERE id = $1 AND status = 'pending'::excuse_status
             RETURNING {EXCUSE_FIELDS}"
        ))
        .bind(id)
        .bind(ExcuseStatus::from(resolution))
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| {
            AxoError::invalid(format!(
                "Excuse {} has already been {:?}",
                id, excuse.status
            ))
        })?;

        if resolution == Resolution::Approved && resolved.freebie {
            Self::ensure_freebie_unused(&mut tx, &resolved).await?;
        }
        if resolution == Resolution::Approved {
            let set = if resolved.freebie {
                MemberSet::Freebied
            } else {
                MemberSet::Excused
            };
            sqlx::query(
                "INSERT INTO event_members (event, member, kind)
                 SELECT $1, $2, $3
                 WHERE NOT EXISTS (
                     SELECT 1 FROM event_members
                     WHERE event = $1 AND member = $2 AND kind = 'attended'::member_set
                 )
                 ON CONFLICT DO NOTHING",
            )
            .bind(resolved.event)
            .bind(resolved.member)
            .bind(set)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;

        Ok(resolved)
    }
}
