use async_graphql::{ComplexObject, Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::DbConn;
use crate::error::{AxoError, AxoResult};

pub type MemberId = i64;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, sqlx::Type, Serialize, Deserialize,
)]
#[sqlx(type_name = "member_status", rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Alum,
    NewMember,
    Abroad,
    Deaffiliated,
}

impl MemberStatus {
    /// Members with these statuses are never pulled into an event's required pool.
    pub fn is_inactive(self) -> bool {
        matches!(
            self,
            MemberStatus::Alum | MemberStatus::Abroad | MemberStatus::Deaffiliated
        )
    }

    /// Whether members with this status show up on attendance reports.
    pub fn is_on_roster(self) -> bool {
        !matches!(self, MemberStatus::Alum | MemberStatus::Deaffiliated)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, SimpleObject, sqlx::FromRow, Serialize, Deserialize)]
#[graphql(complex)]
pub struct Member {
    /// The ID of the member
    pub id: MemberId,
    /// The member's first name
    pub first_name: String,
    /// The member's last name
    pub last_name: String,
    /// The member's email
    pub email: String,
    /// Where the member currently stands with the chapter
    pub status: MemberStatus,
    /// The member's expected graduation year
    pub class_year: i32,
}

#[ComplexObject]
impl Member {
    /// The member's full name
    pub async fn full_name(&self) -> String {
        self.name()
    }
}

impl Member {
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn with_id(id: MemberId, conn: &DbConn) -> AxoResult<Self> {
        Self::with_id_opt(id, conn)
            .await?
            .ok_or_else(|| AxoError::not_found("member", id))
    }

    pub async fn with_id_opt(id: MemberId, conn: &DbConn) -> AxoResult<Option<Self>> {
        conn.member(id).await
    }

    /// Every member, in roster order (first name, then last name).
    pub async fn all(conn: &DbConn) -> AxoResult<Vec<Self>> {
        let mut members = conn.members().await?;
        members.sort_by(Self::roster_order);

        Ok(members)
    }

    pub fn roster_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        (&a.first_name, &a.last_name, a.id).cmp(&(&b.first_name, &b.last_name, b.id))
    }

    pub async fn create(new_member: NewMember, conn: &DbConn) -> AxoResult<Self> {
        if new_member.first_name.trim().is_empty() || new_member.last_name.trim().is_empty() {
            return Err(AxoError::invalid("Members must have a first and last name"));
        }

        let member = conn.create_member(new_member).await?;
        info!(member = member.id, status = ?member.status, "created member {}", member.name());

        Ok(member)
    }
}

#[derive(Clone, Debug, InputObject, Serialize, Deserialize)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: MemberStatus,
    pub class_year: i32,
}
