use std::ops::Deref;
use std::sync::Arc;

use async_graphql::Context;
use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::AxoResult;
use crate::models::event::excuse::{Excuse, ExcuseFilter, ExcuseId, NewExcuse, Resolution};
use crate::models::event::{Event, EventAttendance, EventFilter, EventId, NewEvent};
use crate::models::member::{Member, MemberId, NewMember};
use crate::models::term::{NewTerm, Term, TermId};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence for members, terms, events, and excuses.
///
/// Every mutation of an event's member sets is a single call here, so no
/// caller ever reads a set, edits it, and writes it back.
#[async_trait]
pub trait Store: Send + Sync {
    async fn member(&self, id: MemberId) -> AxoResult<Option<Member>>;
    async fn members(&self) -> AxoResult<Vec<Member>>;
    async fn create_member(&self, new_member: NewMember) -> AxoResult<Member>;

    async fn term(&self, id: TermId) -> AxoResult<Option<Term>>;
    async fn terms(&self) -> AxoResult<Vec<Term>>;
    async fn create_term(&self, new_term: NewTerm) -> AxoResult<Term>;

    async fn event(&self, id: EventId) -> AxoResult<Option<Event>>;
    async fn events(&self, filter: &EventFilter) -> AxoResult<Vec<Event>>;
    async fn create_event(&self, new_event: NewEvent) -> AxoResult<Event>;
    async fn attendance(&self, event: EventId) -> AxoResult<EventAttendance>;
    /// Replace the required set and mark the event activated.
    async fn activate(&self, event: EventId, required: &[MemberId]) -> AxoResult<()>;
    /// Add the member to attended and drop them from excused and freebied.
    async fn check_in(&self, event: EventId, member: MemberId) -> AxoResult<()>;

    async fn excuse(&self, id: ExcuseId) -> AxoResult<Option<Excuse>>;
    async fn excuses(&self, filter: &ExcuseFilter) -> AxoResult<Vec<Excuse>>;
    async fn create_excuse(
        &self,
        new_excuse: NewExcuse,
        submitted_at: OffsetDateTime,
    ) -> AxoResult<Excuse>;
    /// Close out a pending excuse. Approval also puts the member in the
    /// excused (or freebied) set, unless they already checked in. Approving a
    /// freebie fails if the member is freebied at another event that term.
    async fn resolve_excuse(&self, id: ExcuseId, resolution: Resolution) -> AxoResult<Excuse>;
}

/// A shared handle to whichever store the process was started with.
#[derive(Clone)]
pub struct DbConn(Arc<dyn Store>);

impl DbConn {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }

    pub fn from_ctx<'c>(ctx: &Context<'c>) -> &'c Self {
        ctx.data_unchecked::<DbConn>()
    }
}

impl Deref for DbConn {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
