use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::db::Store;
use crate::error::{AxoError, AxoResult};
use crate::models::event::excuse::{
    Excuse, ExcuseFilter, ExcuseId, ExcuseStatus, NewExcuse, Resolution,
};
use crate::models::event::{Event, EventAttendance, EventFilter, EventId, MemberSet, NewEvent};
use crate::models::member::{Member, MemberId, NewMember};
use crate::models::term::{NewTerm, Term, TermId};

#[derive(Default)]
struct Tables {
    last_id: i64,
    members: BTreeMap<MemberId, Member>,
    terms: BTreeMap<TermId, Term>,
    events: BTreeMap<EventId, Event>,
    attendance: HashMap<EventId, EventAttendance>,
    excuses: BTreeMap<ExcuseId, Excuse>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Fails if the member sits in the freebied set of another event in the
    /// excused event's term.
    fn ensure_freebie_unused(&self, excuse: &Excuse) -> AxoResult<()> {
        let term = self
            .events
            .get(&excuse.event)
            .map(|event| event.term)
            .ok_or_else(|| AxoError::not_found("event", excuse.event))?;
        let used = self.events.values().find(|event| {
            event.term == term
                && event.id != excuse.event
                && self
                    .attendance
                    .get(&event.id)
                    .map(|attendance| attendance.used_freebie(excuse.member))
                    .unwrap_or(false)
        });

        match used {
            Some(event) => Err(AxoError::invalid(format!(
                "Member {} already used a freebie on {}",
                excuse.member, event.name
            ))),
            None => Ok(()),
        }
    }

    fn ensure_event(&self, id: EventId) -> AxoResult<()> {
        if self.events.contains_key(&id) {
            Ok(())
        } else {
            Err(AxoError::not_found("event", id))
        }
    }
}

/// A store that lives in process memory, for tests and demos.
///
/// All tables sit behind one lock, and every mutation holds the write
/// lock from start to finish.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn member(&self, id: MemberId) -> AxoResult<Option<Member>> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn members(&self) -> AxoResult<Vec<Member>> {
        Ok(self.tables.read().await.members.values().cloned().collect())
    }

    async fn create_member(&self, new_member: NewMember) -> AxoResult<Member> {
        let mut tables = self.tables.write().await;
        let member = Member {
            id: tables.next_id(),
            first_name: new_member.first_name,
            last_name: new_member.last_name,
            email: new_member.email,
            status: new_member.status,
            class_year: new_member.class_year,
        };
        tables.members.insert(member.id, member.clone());

        Ok(member)
    }

    async fn term(&self, id: TermId) -> AxoResult<Option<Term>> {
        Ok(self.tables.read().await.terms.get(&id).cloned())
    }

    async fn terms(&self) -> AxoResult<Vec<Term>> {
        Ok(self.tables.read().await.terms.values().cloned().collect())
    }

    async fn create_term(&self, new_term: NewTerm) -> AxoResult<Term> {
        let mut tables = self.tables.write().await;
        let term = Term {
            id: tables.next_id(),
            season: new_term.season,
            year: new_term.year,
        };
        tables.terms.insert(term.id, term.clone());

        Ok(term)
    }

    async fn event(&self, id: EventId) -> AxoResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn events(&self, filter: &EventFilter) -> AxoResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.date, event.id));

        Ok(events)
    }

    async fn create_event(&self, new_event: NewEvent) -> AxoResult<Event> {
        let mut tables = self.tables.write().await;
        if !tables.terms.contains_key(&new_event.term) {
            return Err(AxoError::not_found("term", new_event.term));
        }

        let event = Event {
            id: tables.next_id(),
            name: new_event.name,
            term: new_event.term,
            mandatory: new_event.mandatory,
            activated: false,
            points: new_event.points,
            date: new_event.date.0,
        };
        tables.events.insert(event.id, event.clone());
        tables.attendance.insert(event.id, EventAttendance::default());

        Ok(event)
    }

    async fn attendance(&self, event: EventId) -> AxoResult<EventAttendance> {
        let tables = self.tables.read().await;
        tables.ensure_event(event)?;

        Ok(tables.attendance.get(&event).cloned().unwrap_or_default())
    }

    async fn activate(&self, event: EventId, required: &[MemberId]) -> AxoResult<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_event(event)?;

        let attendance = tables.attendance.entry(event).or_default();
        attendance.required = required.iter().copied().collect();
        if let Some(event) = tables.events.get_mut(&event) {
            event.activated = true;
        }

        Ok(())
    }

    async fn check_in(&self, event: EventId, member: MemberId) -> AxoResult<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_event(event)?;

        let attendance = tables.attendance.entry(event).or_default();
        attendance.attended.insert(member);
        attendance.excused.remove(&member);
        attendance.freebied.remove(&member);

        Ok(())
    }

    async fn excuse(&self, id: ExcuseId) -> AxoResult<Option<Excuse>> {
        Ok(self.tables.read().await.excuses.get(&id).cloned())
    }

    async fn excuses(&self, filter: &ExcuseFilter) -> AxoResult<Vec<Excuse>> {
        let tables = self.tables.read().await;
        let in_term = |excuse: &Excuse| match filter.term {
            Some(term) => tables
                .events
                .get(&excuse.event)
                .map(|event| event.term == term)
                .unwrap_or(false),
            None => true,
        };

        Ok(tables
            .excuses
            .values()
            .filter(|excuse| filter.member.map(|m| excuse.member == m).unwrap_or(true))
            .filter(|excuse| filter.event.map(|e| excuse.event == e).unwrap_or(true))
            .filter(|excuse| filter.status.map(|s| excuse.status == s).unwrap_or(true))
            .filter(|excuse| in_term(excuse))
            .cloned()
            .collect())
    }

    async fn create_excuse(
        &self,
        new_excuse: NewExcuse,
        submitted_at: OffsetDateTime,
    ) -> AxoResult<Excuse> {
        let mut tables = self.tables.write().await;
        tables.ensure_event(new_excuse.event)?;

        let excuse = Excuse {
            id: tables.next_id(),
            reason: new_excuse.reason,
            freebie: new_excuse.freebie,
            status: ExcuseStatus::Pending,
            member: new_excuse.member,
            event: new_excuse.event,
            submitted_at,
        };
        tables.excuses.insert(excuse.id, excuse.clone());

        Ok(excuse)
    }

    async fn resolve_excuse(&self, id: ExcuseId, resolution: Resolution) -> AxoResult<Excuse> {
        let mut tables = self.tables.write().await;
        let excuse = tables
            .excuses
            .get(&id)
            .cloned()
            .ok_or_else(|| AxoError::not_found("excuse", id))?;
        if excuse.status != ExcuseStatus::Pending {
            return Err(AxoError::invalid(format!(
                "Excuse {} has already been {:?}",
                id, excuse.status
            )));
        }
        if resolution == Resolution::Approved && excuse.freebie {
            tables.ensure_freebie_unused(&excuse)?;
        }

        let excuse = Excuse {
            status: resolution.into(),
            ..excuse
        };
        tables.excuses.insert(id, excuse.clone());

        if resolution == Resolution::Approved {
            let attendance = tables.attendance.entry(excuse.event).or_default();
            if !attendance.did_attend(excuse.member) {
                let set = if excuse.freebie {
                    MemberSet::Freebied
                } else {
                    MemberSet::Excused
                };
                attendance.set_mut(set).insert(excuse.member);
            }
        }

        Ok(excuse)
    }
}
