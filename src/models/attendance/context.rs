use time::OffsetDateTime;

use crate::db::DbConn;
use crate::error::AxoResult;
use crate::models::attendance::{EventWithAttendance, Points};
use crate::models::event::Event;
use crate::models::member::{Member, MemberId};
use crate::models::term::{Term, TermId};

/// A term's events and their member sets, loaded once and shared by every
/// member whose points are computed from them.
pub struct AttendanceContext {
    pub term: Term,
    pub events: Vec<EventWithAttendance>,
}

impl AttendanceContext {
    pub async fn for_term(term: TermId, conn: &DbConn) -> AxoResult<Self> {
        let term = Term::with_id(term, conn).await?;
        let mut events = vec![];
        for event in Event::for_term(term.id, conn).await? {
            let attendance = conn.attendance(event.id).await?;
            events.push(EventWithAttendance { event, attendance });
        }

        Ok(Self { term, events })
    }

    pub fn points_for(&self, member: MemberId, now: OffsetDateTime) -> Points {
        Points::tally(member, &self.events, now)
    }

    pub fn past_events(&self, now: OffsetDateTime) -> impl Iterator<Item = &EventWithAttendance> {
        self.events
            .iter()
            .filter(move |event| event.event.has_happened(now))
    }

    pub fn upcoming_events(&self, now: OffsetDateTime) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |event| !event.event.has_happened(now))
            .map(|event| &event.event)
    }
}

impl Points {
    /// A member's points for a term, recomputed from the current member sets.
    pub async fn for_member(
        member: MemberId,
        term: TermId,
        conn: &DbConn,
        now: OffsetDateTime,
    ) -> AxoResult<Self> {
        Member::with_id(member, conn).await?;
        let context = AttendanceContext::for_term(term, conn).await?;

        Ok(context.points_for(member, now))
    }
}
