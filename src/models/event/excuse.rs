use async_graphql::{ComplexObject, Context, Enum, InputObject, Result, SimpleObject};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::db::DbConn;
use crate::error::{AxoError, AxoResult};
use crate::models::event::{Event, EventFilter, EventId};
use crate::models::member::{Member, MemberId};
use crate::models::term::TermId;
use crate::models::DateTime;
use crate::notify::{self, ExcuseNotice, Notifier};

pub type ExcuseId = i64;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, sqlx::Type, Serialize, Deserialize,
)]
#[sqlx(type_name = "excuse_status", rename_all = "snake_case")]
pub enum ExcuseStatus {
    Pending,
    Approved,
    Denied,
}

/// The two ways an administrator can close out a pending excuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Approved,
    Denied,
}

impl From<Resolution> for ExcuseStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Approved => ExcuseStatus::Approved,
            Resolution::Denied => ExcuseStatus::Denied,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject, sqlx::FromRow, Serialize, Deserialize)]
#[graphql(complex)]
pub struct Excuse {
    /// The ID of the excuse
    pub id: ExcuseId,
    /// Why the member can't make it
    pub reason: String,
    /// Whether the member is spending their freebie for the term on this event
    pub freebie: bool,
    /// The current state of the excuse
    pub status: ExcuseStatus,

    #[graphql(skip)]
    pub member: MemberId,
    #[graphql(skip)]
    pub event: EventId,
    #[graphql(skip)]
    pub submitted_at: OffsetDateTime,
}

#[ComplexObject]
impl Excuse {
    /// When the excuse was submitted
    pub async fn submitted_at(&self) -> DateTime {
        DateTime::from(self.submitted_at)
    }

    /// The member asking to be excused
    pub async fn member(&self, ctx: &Context<'_>) -> Result<Member> {
        let conn = DbConn::from_ctx(ctx);
        Member::with_id(self.member, conn).await.map_err(Into::into)
    }

    /// The event the member will miss
    pub async fn event(&self, ctx: &Context<'_>) -> Result<Event> {
        let conn = DbConn::from_ctx(ctx);
        Event::with_id(self.event, conn).await.map_err(Into::into)
    }
}

/// Criteria for listing excuses. Unset fields don't filter.
#[derive(Clone, Debug, Default)]
pub struct ExcuseFilter {
    pub member: Option<MemberId>,
    pub event: Option<EventId>,
    pub term: Option<TermId>,
    pub status: Option<ExcuseStatus>,
}

impl Excuse {
    pub async fn with_id(id: ExcuseId, conn: &DbConn) -> AxoResult<Self> {
        Self::with_id_opt(id, conn)
            .await?
            .ok_or_else(|| AxoError::not_found("excuse", id))
    }

    pub async fn with_id_opt(id: ExcuseId, conn: &DbConn) -> AxoResult<Option<Self>> {
        conn.excuse(id).await
    }

    /// Excuses matching the filter, in the order they were submitted.
    pub async fn filtered(filter: &ExcuseFilter, conn: &DbConn) -> AxoResult<Vec<Self>> {
        let mut excuses = conn.excuses(filter).await?;
        excuses.sort_by_key(|excuse| (excuse.submitted_at, excuse.id));

        Ok(excuses)
    }

    /// The effective excuse a member filed for an event, if any.
    ///
    /// Nothing stops a member from filing twice, so the latest submission
    /// wins, with the higher ID breaking ties.
    pub async fn find(
        member: MemberId,
        event: EventId,
        conn: &DbConn,
    ) -> AxoResult<Option<Self>> {
        let filter = ExcuseFilter {
            member: Some(member),
            event: Some(event),
            ..Default::default()
        };

        Ok(Self::most_recent(conn.excuses(&filter).await?))
    }

    pub fn most_recent(excuses: impl IntoIterator<Item = Self>) -> Option<Self> {
        excuses
            .into_iter()
            .max_by_key(|excuse| (excuse.submitted_at, excuse.id))
    }

    pub async fn submit(
        new_excuse: NewExcuse,
        conn: &DbConn,
        now: OffsetDateTime,
    ) -> AxoResult<Self> {
        let member = Member::with_id(new_excuse.member, conn).await?;
        let event = Event::with_id(new_excuse.event, conn).await?;

        if new_excuse.reason.trim().is_empty() {
            return Err(AxoError::invalid("Excuses must give a reason"));
        }
        if event.has_happened(now) {
            return Err(AxoError::invalid(format!(
                "{} has already happened and can no longer be excused",
                event.name
            )));
        }
        if new_excuse.freebie && Self::freebie_claimed(&member, &event, conn).await? {
            return Err(AxoError::invalid(format!(
                "{} has already claimed a freebie this term",
                member.name()
            )));
        }

        let excuse = conn.create_excuse(new_excuse, now).await?;
        info!(
            excuse = excuse.id,
            member = excuse.member,
            event = excuse.event,
            freebie = excuse.freebie,
            "submitted excuse"
        );

        Ok(excuse)
    }

    pub async fn approve(id: ExcuseId, conn: &DbConn, notifier: &dyn Notifier) -> AxoResult<Self> {
        Self::resolve(id, Resolution::Approved, conn, notifier).await
    }

    pub async fn deny(id: ExcuseId, conn: &DbConn, notifier: &dyn Notifier) -> AxoResult<Self> {
        Self::resolve(id, Resolution::Denied, conn, notifier).await
    }

    async fn resolve(
        id: ExcuseId,
        resolution: Resolution,
        conn: &DbConn,
        notifier: &dyn Notifier,
    ) -> AxoResult<Self> {
        let excuse = Self::with_id(id, conn).await?;
        let member = Member::with_id(excuse.member, conn).await?;
        let event = Event::with_id(excuse.event, conn).await?;

        if excuse.status != ExcuseStatus::Pending {
            return Err(AxoError::invalid(format!(
                "Excuse {} has already been {:?}",
                id, excuse.status
            )));
        }

        let resolved = conn.resolve_excuse(id, resolution).await?;
        info!(excuse = id, ?resolution, "resolved excuse for {}", member.name());

        let notice = ExcuseNotice {
            recipient: member,
            event: event.to_string(),
            resolution,
            reason: resolved.reason.clone(),
        };
        if let Err(error) = notify::send(notifier, &notice).await {
            warn!(excuse = id, "Failed to send excuse notification: {:#}", error);
        }

        Ok(resolved)
    }

    /// A member's freebie for a term is taken while a freebie excuse is
    /// pending, or once they sit in the freebied set of one of its events.
    /// A freebie approved after the member checked in never lands in that
    /// set, so it doesn't count.
    async fn freebie_claimed(member: &Member, event: &Event, conn: &DbConn) -> AxoResult<bool> {
        let pending = conn
            .excuses(&ExcuseFilter {
                member: Some(member.id),
                term: Some(event.term),
                status: Some(ExcuseStatus::Pending),
                ..Default::default()
            })
            .await?
            .iter()
            .any(|excuse| excuse.freebie);
        if pending {
            return Ok(true);
        }

        for other in conn.events(&EventFilter::for_term(event.term)).await? {
            if conn.attendance(other.id).await?.used_freebie(member.id) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[derive(Clone, Debug, InputObject, Serialize, Deserialize)]
pub struct NewExcuse {
    pub member: MemberId,
    pub event: EventId,
    pub reason: String,
    #[graphql(default = false)]
    pub freebie: bool,
}
