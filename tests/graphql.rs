mod common;

use std::sync::Arc;

use async_graphql::value;

use axo::graphql::{build_schema, AxoSchema};
use axo::models::event::{Event, Selection};
use axo::models::member::MemberStatus;
use axo::models::term::Season;

use common::{conn, event, member, term, RecordingNotifier};

fn schema(conn: axo::db::DbConn) -> AxoSchema {
    build_schema(conn, Arc::new(RecordingNotifier::default()))
}

#[tokio::test]
async fn creates_and_lists_members() {
    let schema = schema(conn());

    let created = schema
        .execute(
            r#"mutation {
                createMember(newMember: {
                    firstName: "Ada", lastName: "Lovelace", email: "ada@example.com",
                    status: NEW_MEMBER, classYear: 2020
                }) { fullName status }
            }"#,
        )
        .await;
    assert!(created.errors.is_empty(), "{:?}", created.errors);
    assert_eq!(
        created.data,
        value!({ "createMember": { "fullName": "Ada Lovelace", "status": "NEW_MEMBER" } })
    );

    let listed = schema.execute("{ members { firstName classYear } }").await;
    assert_eq!(
        listed.data,
        value!({ "members": [{ "firstName": "Ada", "classYear": 2020 }] })
    );
}

#[tokio::test]
async fn reports_points_for_a_member() {
    let conn = conn();
    let spring = term(&conn, Season::Spring, 2017).await;
    let ada = member(&conn, "Ada", MemberStatus::Active, 2018).await;
    let chapter = event(&conn, &spring, "Chapter", 10, -1).await;
    Event::activate(chapter.id, Selection::All, &conn).await.unwrap();
    let schema = schema(conn);

    let query = format!(
        "{{ attendance(member: {}, term: {}) {{ required earned percentage display }} }}",
        ada.id, spring.id
    );
    let response = schema.execute(query).await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        value!({ "attendance": { "required": 10, "earned": 0.0, "percentage": 0.0, "display": "0%" } })
    );
}

#[tokio::test]
async fn bad_selections_are_rejected() {
    let conn = conn();
    let spring = term(&conn, Season::Spring, 2017).await;
    let chapter = event(&conn, &spring, "Chapter", 10, 1).await;
    let schema = schema(conn.clone());

    let query = format!(
        r#"mutation {{ activateEvent(id: {}, selection: "seniors") {{ activated }} }}"#,
        chapter.id
    );
    let response = schema.execute(query).await;

    assert_eq!(response.errors.len(), 1);
    assert!(!Event::with_id(chapter.id, &conn).await.unwrap().activated);
}

#[tokio::test]
async fn missing_terms_are_errors() {
    let schema = schema(conn());

    let response = schema.execute("{ report(term: 404) { points { display } } }").await;

    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.contains("404"));
}

#[tokio::test]
async fn report_puts_unmeasured_members_last() {
    let conn = conn();
    let spring = term(&conn, Season::Spring, 2017).await;
    let ada = member(&conn, "Ada", MemberStatus::Active, 2018).await;
    member(&conn, "Bea", MemberStatus::Active, 2018).await;
    let chapter = event(&conn, &spring, "Chapter", 10, -1).await;
    Event::activate(chapter.id, Selection::All, &conn).await.unwrap();
    Event::check_in(chapter.id, ada.id, &conn).await.unwrap();
    member(&conn, "Abe", MemberStatus::NewMember, 2020).await;
    let schema = schema(conn);

    let query = format!(
        "{{ report(term: {}, order: PERCENTAGE) {{ member {{ firstName }} points {{ display }} }} }}",
        spring.id
    );
    let response = schema.execute(query).await;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        value!({ "report": [
            { "member": { "firstName": "Bea" }, "points": { "display": "0%" } },
            { "member": { "firstName": "Ada" }, "points": { "display": "100%" } },
            { "member": { "firstName": "Abe" }, "points": { "display": "No mandatory events attended yet" } }
        ] })
    );
}
