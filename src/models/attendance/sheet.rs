use async_graphql::{Enum, SimpleObject};
use time::OffsetDateTime;

use crate::db::DbConn;
use crate::error::AxoResult;
use crate::models::attendance::EventWithAttendance;
use crate::models::event::{Event, EventId};
use crate::models::member::Member;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
pub enum AttendanceState {
    Attended,
    Freebied,
    Excused,
    /// Required, didn't come, and wasn't excused
    Absent,
    /// Required, but the event hasn't started yet
    Upcoming,
    /// Came without being required
    WalkIn,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct SheetRow {
    pub member: Member,
    pub state: AttendanceState,
    /// Points earned so far, null until the event starts
    pub earned: Option<f64>,
}

/// Who was expected at an event and how each of them is accounted for.
#[derive(Clone, Debug, SimpleObject)]
pub struct EventSheet {
    pub event: Event,
    /// False until the event is activated
    pub open: bool,
    pub rows: Vec<SheetRow>,
}

impl EventSheet {
    pub async fn for_event(id: EventId, conn: &DbConn, now: OffsetDateTime) -> AxoResult<Self> {
        let event = Event::with_id(id, conn).await?;
        let attendance = conn.attendance(id).await?;
        let members = Member::all(conn).await?;

        Ok(Self::build(
            EventWithAttendance { event, attendance },
            members,
            now,
        ))
    }

    pub fn build(event: EventWithAttendance, members: Vec<Member>, now: OffsetDateTime) -> Self {
        if !event.event.activated {
            return Self {
                event: event.event,
                open: false,
                rows: vec![],
            };
        }

        let happened = event.event.has_happened(now);
        let rows = members
            .into_iter()
            .filter_map(|member| {
                let state = Self::state_of(&event, &member, happened)?;
                let earned = if happened {
                    event.points_earned(member.id)
                } else {
                    None
                };

                Some(SheetRow {
                    member,
                    state,
                    earned,
                })
            })
            .collect();

        Self {
            event: event.event,
            open: true,
            rows,
        }
    }

    fn state_of(
        event: &EventWithAttendance,
        member: &Member,
        happened: bool,
    ) -> Option<AttendanceState> {
        let attendance = &event.attendance;

        if !attendance.is_required(member.id) {
            attendance
                .did_attend(member.id)
                .then_some(AttendanceState::WalkIn)
        } else if attendance.did_attend(member.id) {
            Some(AttendanceState::Attended)
        } else if attendance.used_freebie(member.id) {
            Some(AttendanceState::Freebied)
        } else if attendance.is_excused(member.id) {
            Some(AttendanceState::Excused)
        } else if happened {
            Some(AttendanceState::Absent)
        } else {
            Some(AttendanceState::Upcoming)
        }
    }
}
