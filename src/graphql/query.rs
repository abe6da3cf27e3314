use async_graphql::{Context, Object, Result};

use crate::config::{settings, ElectionSettings};
use crate::db::DbConn;
use crate::models::attendance::record::MemberRecord;
use crate::models::attendance::report::{ReportOrder, RosterEntry};
use crate::models::attendance::sheet::EventSheet;
use crate::models::attendance::Points;
use crate::models::event::excuse::{Excuse, ExcuseFilter, ExcuseStatus};
use crate::models::event::{Event, EventFilter};
use crate::models::member::Member;
use crate::models::term::Term;
use crate::util::current_time;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    pub async fn member(&self, ctx: &Context<'_>, id: i64) -> Result<Member> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Member::with_id(id, conn).await?)
    }

    /// All members in roster order
    pub async fn members(&self, ctx: &Context<'_>) -> Result<Vec<Member>> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Member::all(conn).await?)
    }

    pub async fn term(&self, ctx: &Context<'_>, id: i64) -> Result<Term> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Term::with_id(id, conn).await?)
    }

    /// All terms, most recent first
    pub async fn terms(&self, ctx: &Context<'_>) -> Result<Vec<Term>> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Term::all(conn).await?)
    }

    pub async fn most_recent_term(&self, ctx: &Context<'_>) -> Result<Option<Term>> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Term::most_recent(conn).await?)
    }

    pub async fn event(&self, ctx: &Context<'_>, id: i64) -> Result<Event> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Event::with_id(id, conn).await?)
    }

    /// Events matching the filter, newest first
    pub async fn events(
        &self,
        ctx: &Context<'_>,
        filter: Option<EventFilter>,
    ) -> Result<Vec<Event>> {
        let conn = DbConn::from_ctx(ctx);
        let mut events = Event::filtered(&filter.unwrap_or_default(), conn).await?;
        events.reverse();

        Ok(events)
    }

    pub async fn excuse(&self, ctx: &Context<'_>, id: i64) -> Result<Excuse> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Excuse::with_id(id, conn).await?)
    }

    /// Excuses in the order they were submitted
    pub async fn excuses(
        &self,
        ctx: &Context<'_>,
        member: Option<i64>,
        event: Option<i64>,
        term: Option<i64>,
        status: Option<ExcuseStatus>,
    ) -> Result<Vec<Excuse>> {
        let conn = DbConn::from_ctx(ctx);
        let filter = ExcuseFilter {
            member,
            event,
            term,
            status,
        };

        Ok(Excuse::filtered(&filter, conn).await?)
    }

    /// The excuse that counts for a member at an event, if they filed any
    pub async fn effective_excuse(
        &self,
        ctx: &Context<'_>,
        member: i64,
        event: i64,
    ) -> Result<Option<Excuse>> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Excuse::find(member, event, conn).await?)
    }

    /// A member's points for a term
    pub async fn attendance(&self, ctx: &Context<'_>, member: i64, term: i64) -> Result<Points> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Points::for_member(member, term, conn, current_time()).await?)
    }

    /// Every member on the roster with their points for a term
    pub async fn report(
        &self,
        ctx: &Context<'_>,
        term: i64,
        order: Option<ReportOrder>,
    ) -> Result<Vec<RosterEntry>> {
        let conn = DbConn::from_ctx(ctx);
        let order = order.unwrap_or(ReportOrder::Name);

        Ok(RosterEntry::for_term(term, order, conn, current_time()).await?)
    }

    pub async fn member_record(
        &self,
        ctx: &Context<'_>,
        member: i64,
        term: i64,
    ) -> Result<MemberRecord> {
        let conn = DbConn::from_ctx(ctx);
        Ok(MemberRecord::for_member(member, term, conn, current_time()).await?)
    }

    pub async fn event_sheet(&self, ctx: &Context<'_>, event: i64) -> Result<EventSheet> {
        let conn = DbConn::from_ctx(ctx);
        Ok(EventSheet::for_event(event, conn, current_time()).await?)
    }

    pub async fn election_settings(&self) -> ElectionSettings {
        settings().election.clone()
    }
}
