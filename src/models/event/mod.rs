use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use async_graphql::{ComplexObject, Context, InputObject, Result, SimpleObject};
use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::info;

use crate::db::DbConn;
use crate::error::{AxoError, AxoResult};
use crate::models::member::{Member, MemberId, MemberStatus};
use crate::models::term::{Term, TermId};
use crate::models::DateTime;

pub mod excuse;

pub type EventId = i64;

pub const EVENT_DATE_FORMAT: &[FormatItem] = format_description!(
    "[weekday], [month repr:long] [day] [year] at [hour repr:12]:[minute][period]"
);

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject, sqlx::FromRow, Serialize, Deserialize)]
#[graphql(complex)]
pub struct Event {
    /// The ID of the event
    pub id: EventId,
    /// The name of the event
    pub name: String,
    /// The ID of the term this event belongs to
    pub term: TermId,
    /// Whether missing this event counts against a member
    pub mandatory: bool,
    /// Whether the required members have been chosen and check-in is open
    pub activated: bool,
    /// How many points attendance of this event is worth
    pub points: i64,

    /// When the event starts
    #[graphql(skip)]
    pub date: OffsetDateTime,
}

#[ComplexObject]
impl Event {
    /// When the event starts
    pub async fn date(&self) -> DateTime {
        DateTime::from(self.date)
    }

    /// The event's name and date together
    pub async fn description(&self) -> String {
        self.to_string()
    }

    /// Members expected to attend, as of the last activation
    pub async fn required(&self, ctx: &Context<'_>) -> Result<Vec<MemberId>> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Event::attendance(self.id, conn)
            .await?
            .required
            .into_iter()
            .collect())
    }

    /// Members that checked in
    pub async fn attended(&self, ctx: &Context<'_>) -> Result<Vec<MemberId>> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Event::attendance(self.id, conn)
            .await?
            .attended
            .into_iter()
            .collect())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .date
            .format(EVENT_DATE_FORMAT)
            .map_err(|_| fmt::Error)?;
        write!(f, "{} | {}", self.name, date)
    }
}

/// Which of an event's member sets a member belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "member_set", rename_all = "snake_case")]
pub enum MemberSet {
    Required,
    Attended,
    Excused,
    Freebied,
}

/// The member sets hanging off of a single event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttendance {
    pub required: BTreeSet<MemberId>,
    pub attended: BTreeSet<MemberId>,
    pub excused: BTreeSet<MemberId>,
    pub freebied: BTreeSet<MemberId>,
}

impl EventAttendance {
    pub fn set_mut(&mut self, set: MemberSet) -> &mut BTreeSet<MemberId> {
        match set {
            MemberSet::Required => &mut self.required,
            MemberSet::Attended => &mut self.attended,
            MemberSet::Excused => &mut self.excused,
            MemberSet::Freebied => &mut self.freebied,
        }
    }

    pub fn is_required(&self, member: MemberId) -> bool {
        self.required.contains(&member)
    }

    pub fn did_attend(&self, member: MemberId) -> bool {
        self.attended.contains(&member)
    }

    pub fn is_excused(&self, member: MemberId) -> bool {
        self.excused.contains(&member)
    }

    pub fn used_freebie(&self, member: MemberId) -> bool {
        self.freebied.contains(&member)
    }
}

/// Who an event is activated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Every member that isn't an alum, abroad, or deaffiliated
    All,
    /// Only new members, whatever their class year
    NewMembers,
    /// One class year, minus alums, abroad, and deaffiliated members
    ClassYear(i32),
}

impl Selection {
    pub fn includes(&self, member: &Member) -> bool {
        match self {
            Selection::All => !member.status.is_inactive(),
            Selection::NewMembers => member.status == MemberStatus::NewMember,
            Selection::ClassYear(year) => {
                member.class_year == *year && !member.status.is_inactive()
            }
        }
    }
}

impl FromStr for Selection {
    type Err = AxoError;

    fn from_str(s: &str) -> AxoResult<Self> {
        match s.trim() {
            "all" => Ok(Selection::All),
            "new_members" => Ok(Selection::NewMembers),
            other => other.parse().map(Selection::ClassYear).map_err(|_| {
                AxoError::invalid(format!(
                    "`{other}` is not a valid selection, use `all`, `new_members`, or a class year"
                ))
            }),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "all"),
            Selection::NewMembers => write!(f, "new_members"),
            Selection::ClassYear(year) => write!(f, "{year}"),
        }
    }
}

/// Criteria for listing events. Unset fields don't filter.
#[derive(Clone, Debug, Default, InputObject)]
pub struct EventFilter {
    pub term: Option<TermId>,
    pub from: Option<DateTime>,
    pub to: Option<DateTime>,
    pub activated: Option<bool>,
    pub mandatory: Option<bool>,
}

impl EventFilter {
    pub fn for_term(term: TermId) -> Self {
        Self {
            term: Some(term),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.term.map(|term| event.term == term).unwrap_or(true)
            && self.from.map(|from| event.date >= from.0).unwrap_or(true)
            && self.to.map(|to| event.date <= to.0).unwrap_or(true)
            && self
                .activated
                .map(|activated| event.activated == activated)
                .unwrap_or(true)
            && self
                .mandatory
                .map(|mandatory| event.mandatory == mandatory)
                .unwrap_or(true)
    }
}

impl Event {
    pub fn has_happened(&self, now: OffsetDateTime) -> bool {
        self.date <= now
    }

    pub async fn with_id(id: EventId, conn: &DbConn) -> AxoResult<Self> {
        Self::with_id_opt(id, conn)
            .await?
            .ok_or_else(|| AxoError::not_found("event", id))
    }

    pub async fn with_id_opt(id: EventId, conn: &DbConn) -> AxoResult<Option<Self>> {
        conn.event(id).await
    }

    /// All events matching the filter, earliest first.
    pub async fn filtered(filter: &EventFilter, conn: &DbConn) -> AxoResult<Vec<Self>> {
        let mut events = conn.events(filter).await?;
        events.sort_by_key(|event| (event.date, event.id));

        Ok(events)
    }

    pub async fn for_term(term: TermId, conn: &DbConn) -> AxoResult<Vec<Self>> {
        // verify exists
        Term::with_id(term, conn).await?;

        Self::filtered(&EventFilter::for_term(term), conn).await
    }

    pub async fn attendance(id: EventId, conn: &DbConn) -> AxoResult<EventAttendance> {
        Self::with_id(id, conn).await?;
        conn.attendance(id).await
    }

    pub async fn create(new_event: NewEvent, conn: &DbConn) -> AxoResult<Self> {
        if new_event.points <= 0 {
            return Err(AxoError::invalid(format!(
                "Events must be worth a positive number of points, not {}",
                new_event.points
            )));
        }
        Term::with_id(new_event.term, conn).await?;

        let event = conn.create_event(new_event).await?;
        info!(event = event.id, term = event.term, "created event {}", event);

        Ok(event)
    }

    /// Choose the members required at this event and open it for check-in.
    ///
    /// The required set is replaced outright, so re-activating with a
    /// narrower selection drops anyone who no longer matches.
    pub async fn activate(id: EventId, selection: Selection, conn: &DbConn) -> AxoResult<()> {
        let event = Self::with_id(id, conn).await?;
        let required: Vec<MemberId> = Member::all(conn)
            .await?
            .into_iter()
            .filter(|member| selection.includes(member))
            .map(|member| member.id)
            .collect();

        conn.activate(id, &required).await?;
        info!(
            event = id,
            %selection,
            required = required.len(),
            "activated event {}",
            event
        );

        Ok(())
    }

    /// Record that a member showed up, clearing any excuse or freebie.
    pub async fn check_in(id: EventId, member: MemberId, conn: &DbConn) -> AxoResult<()> {
        let event = Self::with_id(id, conn).await?;
        Member::with_id(member, conn).await?;
        if !event.activated {
            return Err(AxoError::invalid(format!(
                "{} is not open for check-in yet",
                event.name
            )));
        }

        conn.check_in(id, member).await?;
        info!(event = id, member, "checked in to {}", event.name);

        Ok(())
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewEvent {
    pub name: String,
    pub term: TermId,
    pub date: DateTime,
    pub mandatory: bool,
    pub points: i64,
}
