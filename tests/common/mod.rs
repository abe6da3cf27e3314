#![allow(dead_code)]

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use axo::db::{DbConn, MemoryStore};
use axo::models::event::excuse::{Excuse, NewExcuse};
use axo::models::event::{Event, NewEvent};
use axo::models::member::{Member, MemberStatus, NewMember};
use axo::models::term::{NewTerm, Season, Term};
use axo::notify::{ExcuseNotice, Notifier};

pub const NOW: OffsetDateTime = datetime!(2017-02-05 05:00 UTC);

pub fn conn() -> DbConn {
    DbConn::new(MemoryStore::new())
}

pub async fn term(conn: &DbConn, season: Season, year: i32) -> Term {
    Term::create(NewTerm { season, year }, conn).await.unwrap()
}

pub async fn member(
    conn: &DbConn,
    first_name: &str,
    status: MemberStatus,
    class_year: i32,
) -> Member {
    let new_member = NewMember {
        first_name: first_name.to_owned(),
        last_name: "Sister".to_owned(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        status,
        class_year,
    };

    Member::create(new_member, conn).await.unwrap()
}

/// A mandatory event `days` away from `NOW`, negative for the past.
pub async fn event(conn: &DbConn, term: &Term, name: &str, points: i64, days: i64) -> Event {
    let new_event = NewEvent {
        name: name.to_owned(),
        term: term.id,
        date: (NOW + Duration::days(days)).into(),
        mandatory: true,
        points,
    };

    Event::create(new_event, conn).await.unwrap()
}

pub fn excuse(member: &Member, event: &Event, freebie: bool) -> NewExcuse {
    NewExcuse {
        member: member.id,
        event: event.id,
        reason: "Exam that night".to_owned(),
        freebie,
    }
}

pub async fn submit(conn: &DbConn, member: &Member, event: &Event, freebie: bool) -> Excuse {
    Excuse::submit(excuse(member, event, freebie), conn, NOW)
        .await
        .unwrap()
}

/// Keeps every notice it's handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub subjects: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn excuse_resolved(&self, notice: &ExcuseNotice) -> Result<()> {
        self.subjects.lock().unwrap().push(notice.subject());
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn excuse_resolved(&self, _notice: &ExcuseNotice) -> Result<()> {
        bail!("mail server is down")
    }
}
