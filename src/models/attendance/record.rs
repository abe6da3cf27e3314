use async_graphql::{SimpleObject, Union};
use time::OffsetDateTime;

use crate::db::DbConn;
use crate::error::AxoResult;
use crate::models::attendance::context::AttendanceContext;
use crate::models::attendance::Points;
use crate::models::event::excuse::{Excuse, ExcuseFilter};
use crate::models::event::Event;
use crate::models::member::{Member, MemberId};
use crate::models::term::{Term, TermId};

/// A past event and what the member got out of it.
#[derive(Clone, Debug, SimpleObject)]
pub struct EventPoints {
    pub event: Event,
    /// Points earned, or null if the member was never required and didn't show
    pub earned: Option<f64>,
}

/// A future event, or the excuse already filed against it.
#[derive(Clone, Debug, Union)]
pub enum UpcomingEvent {
    Event(Event),
    Excuse(Excuse),
}

/// Everything a member needs to see about their term.
#[derive(Clone, Debug, SimpleObject)]
pub struct MemberRecord {
    pub member: Member,
    pub term: Term,
    pub points: Points,
    /// Past events, earliest first
    pub past: Vec<EventPoints>,
    /// Future events, earliest first
    pub upcoming: Vec<UpcomingEvent>,
}

impl MemberRecord {
    pub async fn for_member(
        member: MemberId,
        term: TermId,
        conn: &DbConn,
        now: OffsetDateTime,
    ) -> AxoResult<Self> {
        let member = Member::with_id(member, conn).await?;
        let context = AttendanceContext::for_term(term, conn).await?;
        let excuses = Excuse::filtered(
            &ExcuseFilter {
                member: Some(member.id),
                term: Some(term),
                ..Default::default()
            },
            conn,
        )
        .await?;

        Ok(Self::from_context(member, &context, excuses, now))
    }

    pub fn from_context(
        member: Member,
        context: &AttendanceContext,
        excuses: Vec<Excuse>,
        now: OffsetDateTime,
    ) -> Self {
        let past = context
            .past_events(now)
            .map(|event| EventPoints {
                event: event.event.clone(),
                earned: event.points_earned(member.id),
            })
            .collect();
        let upcoming = context
            .upcoming_events(now)
            .map(|event| {
                let filed = excuses
                    .iter()
                    .filter(|excuse| excuse.event == event.id)
                    .cloned();
                match Excuse::most_recent(filed) {
                    Some(excuse) => UpcomingEvent::Excuse(excuse),
                    None => UpcomingEvent::Event(event.clone()),
                }
            })
            .collect();

        Self {
            points: context.points_for(member.id, now),
            term: context.term.clone(),
            member,
            past,
            upcoming,
        }
    }
}
