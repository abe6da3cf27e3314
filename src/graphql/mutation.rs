use async_graphql::{Context, Object, Result};

use crate::db::DbConn;
use crate::graphql::notifier_from_ctx;
use crate::models::event::excuse::{Excuse, NewExcuse};
use crate::models::event::{Event, NewEvent, Selection};
use crate::models::member::{Member, NewMember};
use crate::models::term::{NewTerm, Term};
use crate::util::current_time;

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    pub async fn create_member(&self, ctx: &Context<'_>, new_member: NewMember) -> Result<Member> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Member::create(new_member, conn).await?)
    }

    pub async fn create_term(&self, ctx: &Context<'_>, new_term: NewTerm) -> Result<Term> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Term::create(new_term, conn).await?)
    }

    pub async fn create_event(&self, ctx: &Context<'_>, new_event: NewEvent) -> Result<Event> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Event::create(new_event, conn).await?)
    }

    /// Choose who is required at an event: `all`, `new_members`, or a class year
    pub async fn activate_event(
        &self,
        ctx: &Context<'_>,
        id: i64,
        selection: String,
    ) -> Result<Event> {
        let conn = DbConn::from_ctx(ctx);
        let selection: Selection = selection.parse()?;
        Event::activate(id, selection, conn).await?;

        Ok(Event::with_id(id, conn).await?)
    }

    pub async fn check_in(&self, ctx: &Context<'_>, event: i64, member: i64) -> Result<Event> {
        let conn = DbConn::from_ctx(ctx);
        Event::check_in(event, member, conn).await?;

        Ok(Event::with_id(event, conn).await?)
    }

    pub async fn submit_excuse(&self, ctx: &Context<'_>, new_excuse: NewExcuse) -> Result<Excuse> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Excuse::submit(new_excuse, conn, current_time()).await?)
    }

    pub async fn approve_excuse(&self, ctx: &Context<'_>, id: i64) -> Result<Excuse> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Excuse::approve(id, conn, notifier_from_ctx(ctx)).await?)
    }

    pub async fn deny_excuse(&self, ctx: &Context<'_>, id: i64) -> Result<Excuse> {
        let conn = DbConn::from_ctx(ctx);
        Ok(Excuse::deny(id, conn, notifier_from_ctx(ctx)).await?)
    }
}
