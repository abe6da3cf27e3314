use async_graphql::{Enum, SimpleObject};
use time::OffsetDateTime;

use crate::db::DbConn;
use crate::error::AxoResult;
use crate::models::attendance::context::AttendanceContext;
use crate::models::attendance::{Percentage, Points};
use crate::models::member::Member;
use crate::models::term::TermId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
pub enum ReportOrder {
    /// Roster order: first name, then last name
    Name,
    /// Lowest percentage first; members with nothing required yet go last
    Percentage,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct RosterEntry {
    pub member: Member,
    pub points: Points,
}

impl RosterEntry {
    pub fn percentage(&self) -> Percentage {
        self.points.percentage_value()
    }

    /// Every member on the roster with their points for the term.
    pub async fn for_term(
        term: TermId,
        order: ReportOrder,
        conn: &DbConn,
        now: OffsetDateTime,
    ) -> AxoResult<Vec<Self>> {
        let context = AttendanceContext::for_term(term, conn).await?;
        let members = Member::all(conn).await?;

        Ok(Self::from_context(&context, members, order, now))
    }

    pub fn from_context(
        context: &AttendanceContext,
        members: Vec<Member>,
        order: ReportOrder,
        now: OffsetDateTime,
    ) -> Vec<Self> {
        let mut entries: Vec<Self> = members
            .into_iter()
            .filter(|member| member.status.is_on_roster())
            .map(|member| Self {
                points: context.points_for(member.id, now),
                member,
            })
            .collect();

        entries.sort_by(|a, b| Member::roster_order(&a.member, &b.member));
        if order == ReportOrder::Percentage {
            // stable, so ties stay in roster order
            entries.sort_by(|a, b| Percentage::ascending(&a.percentage(), &b.percentage()));
        }

        entries
    }
}
