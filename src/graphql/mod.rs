use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Schema};

use crate::db::DbConn;
use crate::graphql::mutation::MutationRoot;
use crate::graphql::query::QueryRoot;
use crate::notify::Notifier;

pub mod mutation;
pub mod query;

pub type AxoSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(conn: DbConn, notifier: Arc<dyn Notifier>) -> AxoSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(conn)
        .data(notifier)
        .finish()
}

pub(crate) fn notifier_from_ctx<'c>(ctx: &Context<'c>) -> &'c dyn Notifier {
    ctx.data_unchecked::<Arc<dyn Notifier>>().as_ref()
}
