//! Points and completion percentages for members over a term.
//!
//! Everything here is computed on demand from the event member sets and
//! never written back to the store.

use std::cmp::Ordering;
use std::fmt;

use async_graphql::{ComplexObject, SimpleObject};
use serde::Serialize;
use time::OffsetDateTime;

use crate::models::event::{Event, EventAttendance};
use crate::models::member::MemberId;

pub mod context;
pub mod record;
pub mod report;
pub mod sheet;

/// Share of an event's points granted for an approved, non-freebie excuse.
pub const EXCUSED_CREDIT: f64 = 0.75;

/// Shown in place of a percentage when there is nothing to divide by.
pub const NO_PERCENTAGE: &str = "No mandatory events attended yet";

/// Percentages this close to the target get two decimal places. Both are in
/// basis points.
const CLOSE_CALL_TARGET: i64 = 8_500;
const CLOSE_CALL_RANGE: i64 = 500;

/// An event along with its member sets.
#[derive(Clone, Debug)]
pub struct EventWithAttendance {
    pub event: Event,
    pub attendance: EventAttendance,
}

impl EventWithAttendance {
    /// Points a member earned at this event, or `None` if they were neither
    /// required nor present.
    pub fn points_earned(&self, member: MemberId) -> Option<f64> {
        let points = self.event.points as f64;

        if self.attendance.is_required(member) {
            if self.attendance.did_attend(member) || self.attendance.used_freebie(member) {
                Some(points)
            } else if self.attendance.is_excused(member) {
                Some(EXCUSED_CREDIT * points)
            } else {
                Some(0.0)
            }
        } else if self.attendance.did_attend(member) {
            Some(points)
        } else {
            None
        }
    }

    /// Points this event adds to a member's requirement.
    pub fn points_required(&self, member: MemberId) -> i64 {
        if self.event.mandatory && self.attendance.is_required(member) {
            self.event.points
        } else {
            0
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, SimpleObject, Serialize)]
#[graphql(complex)]
pub struct Points {
    /// Points from past mandatory events the member was required at
    pub required: i64,
    /// Points the member actually earned over the same events
    pub earned: f64,
}

#[ComplexObject]
impl Points {
    /// Earned over required, or null if nothing was required yet
    pub async fn percentage(&self) -> Option<f64> {
        self.percentage_value().value()
    }

    /// The percentage, formatted for display
    pub async fn display(&self) -> String {
        self.percentage_value().to_string()
    }
}

impl Points {
    /// Tally a member's points over every event that has already started.
    pub fn tally<'e>(
        member: MemberId,
        events: impl IntoIterator<Item = &'e EventWithAttendance>,
        now: OffsetDateTime,
    ) -> Self {
        events
            .into_iter()
            .filter(|event| event.event.has_happened(now))
            .fold(Points::default(), |points, event| Points {
                required: points.required + event.points_required(member),
                earned: points.earned + event.points_earned(member).unwrap_or(0.0),
            })
    }

    pub fn percentage_value(&self) -> Percentage {
        if self.required == 0 {
            Percentage::NoMandatoryEvents
        } else {
            Percentage::Measured(self.earned / self.required as f64)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Percentage {
    /// Earned points over required points; can go past 1.0
    Measured(f64),
    /// No past mandatory events required the member, so there is no rate yet
    NoMandatoryEvents,
}

impl Percentage {
    pub fn value(self) -> Option<f64> {
        match self {
            Percentage::Measured(fraction) => Some(fraction),
            Percentage::NoMandatoryEvents => None,
        }
    }

    /// Lowest first, with unmeasurable percentages after every measured one.
    pub fn ascending(a: &Self, b: &Self) -> Ordering {
        match (a, b) {
            (Percentage::Measured(a), Percentage::Measured(b)) => a.total_cmp(b),
            (Percentage::Measured(_), Percentage::NoMandatoryEvents) => Ordering::Less,
            (Percentage::NoMandatoryEvents, Percentage::Measured(_)) => Ordering::Greater,
            (Percentage::NoMandatoryEvents, Percentage::NoMandatoryEvents) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentage::Measured(fraction) if is_close_call(*fraction) => {
                write!(f, "{:.2}%", fraction * 100.0)
            }
            Percentage::Measured(fraction) => write!(f, "{:.0}%", fraction * 100.0),
            Percentage::NoMandatoryEvents => f.write_str(NO_PERCENTAGE),
        }
    }
}

fn is_close_call(fraction: f64) -> bool {
    let basis_points = (fraction * 10_000.0).round() as i64;
    (basis_points - CLOSE_CALL_TARGET).abs() <= CLOSE_CALL_RANGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::MemberSet;
    use crate::tests::mock::{mock_event, with_member, NOW};

    const MEMBER: MemberId = 7;

    fn with(event: EventWithAttendance, sets: &[MemberSet]) -> EventWithAttendance {
        with_member(event, MEMBER, sets)
    }

    fn percentage(events: &[EventWithAttendance]) -> Percentage {
        Points::tally(MEMBER, events, NOW).percentage_value()
    }

    #[test]
    fn nothing_required_is_not_measurable() {
        assert_eq!(percentage(&[]), Percentage::NoMandatoryEvents);
        assert_eq!(
            percentage(&[with(mock_event(1, 10, false, -1), &[MemberSet::Required])]),
            Percentage::NoMandatoryEvents
        );
    }

    #[test]
    fn attended_mandatory_event_is_full_credit() {
        let events = [with(
            mock_event(1, 30, true, -1),
            &[MemberSet::Required, MemberSet::Attended],
        )];

        assert_eq!(percentage(&events), Percentage::Measured(1.0));
    }

    #[test]
    fn excused_mandatory_event_is_partial_credit() {
        let events = [with(
            mock_event(1, 30, true, -1),
            &[MemberSet::Required, MemberSet::Excused],
        )];

        assert_eq!(percentage(&events), Percentage::Measured(0.75));
    }

    #[test]
    fn freebie_is_full_credit() {
        let events = [with(
            mock_event(1, 30, true, -1),
            &[MemberSet::Required, MemberSet::Freebied],
        )];

        assert_eq!(percentage(&events), Percentage::Measured(1.0));
    }

    #[test]
    fn missed_mandatory_event_is_zero() {
        let events = [with(mock_event(1, 30, true, -1), &[MemberSet::Required])];

        assert_eq!(percentage(&events), Percentage::Measured(0.0));
    }

    #[test]
    fn optional_events_only_add_to_earned_points() {
        let events = [
            with(
                mock_event(1, 20, true, -2),
                &[MemberSet::Required, MemberSet::Attended],
            ),
            with(
                mock_event(2, 12, false, -1),
                &[MemberSet::Required, MemberSet::Attended],
            ),
        ];

        assert_eq!(percentage(&events), Percentage::Measured(1.6));
    }

    #[test]
    fn walk_ins_still_earn_points() {
        let events = [
            with(
                mock_event(1, 10, true, -2),
                &[MemberSet::Required, MemberSet::Attended],
            ),
            with(mock_event(2, 5, true, -1), &[MemberSet::Attended]),
        ];

        assert_eq!(
            Points::tally(MEMBER, &events, NOW),
            Points {
                required: 10,
                earned: 15.0
            }
        );
    }

    #[test]
    fn excused_without_being_required_earns_nothing() {
        let events = [
            with(mock_event(1, 10, true, -2), &[MemberSet::Required]),
            with(mock_event(2, 10, true, -1), &[MemberSet::Excused]),
        ];

        assert_eq!(percentage(&events), Percentage::Measured(0.0));
    }

    #[test]
    fn future_events_are_ignored() {
        let events = [
            with(
                mock_event(1, 10, true, -1),
                &[MemberSet::Required, MemberSet::Excused],
            ),
            with(
                mock_event(2, 40, true, 1),
                &[MemberSet::Required, MemberSet::Attended],
            ),
            with(mock_event(3, 40, true, 3), &[MemberSet::Required]),
        ];

        assert_eq!(percentage(&events), Percentage::Measured(0.75));
    }

    #[test]
    fn events_starting_now_count() {
        let events = [with(mock_event(1, 10, true, 0), &[MemberSet::Required])];

        assert_eq!(percentage(&events), Percentage::Measured(0.0));
    }

    #[test]
    fn no_points_earned_when_not_involved() {
        let event = mock_event(1, 10, true, -1);

        assert_eq!(event.points_earned(MEMBER), None);
        assert_eq!(event.points_required(MEMBER), 0);
    }

    #[test]
    fn tallying_is_repeatable() {
        let events = [
            with(
                mock_event(1, 30, true, -3),
                &[MemberSet::Required, MemberSet::Excused],
            ),
            with(mock_event(2, 20, true, -2), &[MemberSet::Required]),
        ];

        assert_eq!(
            Points::tally(MEMBER, &events, NOW),
            Points::tally(MEMBER, &events, NOW)
        );
    }

    #[test]
    fn formats_whole_percentages() {
        assert_eq!(Percentage::Measured(0.75).to_string(), "75%");
        assert_eq!(Percentage::Measured(1.6).to_string(), "160%");
        assert_eq!(Percentage::Measured(0.0).to_string(), "0%");
        assert_eq!(Percentage::Measured(0.333).to_string(), "33%");
    }

    #[test]
    fn formats_close_calls_with_two_decimals() {
        assert_eq!(Percentage::Measured(0.85).to_string(), "85.00%");
        assert_eq!(Percentage::Measured(0.8234).to_string(), "82.34%");
        assert_eq!(Percentage::Measured(0.8875).to_string(), "88.75%");
    }

    #[test]
    fn close_call_band_includes_both_edges() {
        assert_eq!(Percentage::Measured(0.80).to_string(), "80.00%");
        assert_eq!(Percentage::Measured(0.90).to_string(), "90.00%");
        assert_eq!(
            Points {
                required: 20,
                earned: 16.0
            }
            .percentage_value()
            .to_string(),
            "80.00%"
        );
        assert_eq!(
            Points {
                required: 20,
                earned: 18.0
            }
            .percentage_value()
            .to_string(),
            "90.00%"
        );
    }

    #[test]
    fn just_outside_the_close_call_band_is_whole() {
        assert_eq!(Percentage::Measured(0.7999).to_string(), "80%");
        assert_eq!(Percentage::Measured(0.9001).to_string(), "90%");
    }

    #[test]
    fn sentinel_passes_through_formatting() {
        assert_eq!(Percentage::NoMandatoryEvents.to_string(), NO_PERCENTAGE);
    }

    #[test]
    fn sentinel_sorts_after_measured_percentages() {
        let mut percentages = vec![
            Percentage::NoMandatoryEvents,
            Percentage::Measured(1.2),
            Percentage::Measured(0.0),
            Percentage::Measured(0.5),
        ];
        percentages.sort_by(Percentage::ascending);

        assert_eq!(
            percentages,
            vec![
                Percentage::Measured(0.0),
                Percentage::Measured(0.5),
                Percentage::Measured(1.2),
                Percentage::NoMandatoryEvents,
            ]
        );
    }
}
