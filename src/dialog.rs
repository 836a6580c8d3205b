//! Turn orchestration for the appointment dialog.
//!
//! [`Scheduler`] advances a [`SchedulingSession`] one user reply at a time
//! and returns the next [`Step`] to present. Every recoverable scheduling
//! failure becomes a clarification step. Only store, session and recognizer
//! failures surface as [`DialogError`].

use std::sync::Arc;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{
    SchedulerConfig, CATEGORY_MATCH_THRESHOLD, DEFAULT_CATEGORIES, MAX_DAY_OPTIONS, MAX_TIME_OPTIONS,
};
use crate::db::{DatabaseError, ScheduleStore};
use crate::models::{EntityKind, TemporalRequest};
use crate::nlu::{
    classify_intent, EntityRecognizer, Intent, NluError, RecognizerResponse, TemporalEntities,
};
use crate::scheduling::parse::parse_time;
use crate::scheduling::{
    book_slot, match_category, normalize, resolve, timeslots_for_day, validate_alignment,
    Candidates, Clock, SchedulingError,
};
use crate::session::{Awaiting, SchedulingSession, SessionError, SessionStore};

const TIME_LABEL: &str = "%-I:%M %p";
const DAY_LABEL: &str = "%a, %b %-d";
const CONFIRMED_LABEL: &str = "%A, %B %-d, %Y at %-I:%M %p";

pub const HELP_TEXT: &str = "I can schedule an appointment with a doctor. Try saying:\n\
    'Schedule an appointment'\n\
    'I need to see a radiologist'\n\
    'I need to see a psychiatrist tomorrow between 2pm and 4pm'\n\
    'Schedule me with a dermatologist this week at 1:30pm'\n\
    'I want an appointment between october 30th and november 4th from 9am to 11:30am'";

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Nlu(#[from] NluError),
}

// ═══════════════════════════════════════════════════════════
// Steps, menus, notices
// ═══════════════════════════════════════════════════════════

/// Why the dialog is re-asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    PastDate,
    NothingAvailable,
    NoDaysWithTime,
    SlotTaken,
    InvalidChoice,
    OvernightRange,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::PastDate => "The date cannot be in the past",
            Self::NothingAvailable => "Sorry, there aren't any available for that.",
            Self::NoDaysWithTime => {
                "Sorry, there are no available days with this time. Please pick a different date/time."
            }
            Self::SlotTaken => {
                "Sorry, that timeslot is booked. However, here are some other times for this day."
            }
            Self::InvalidChoice => "Please choose from the available options",
            Self::OvernightRange => "The time range has to start and end on the same day",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MenuOption {
    /// A bookable slot; `with_day` when the menu spans several days.
    Slot { at: NaiveDateTime, with_day: bool },
    /// A day offering the menu's fixed time.
    Day { at: NaiveDateTime },
    /// Search other days for a time that was taken.
    ViewDaysWithTime { time: NaiveTime },
    /// Closing option of a time menu.
    PickAnotherTime,
    /// Closing option of a day menu.
    PickAnotherDay,
}

impl MenuOption {
    pub fn label(&self) -> String {
        match self {
            Self::Slot { at, with_day: true } => {
                format!("{} {}", at.format(DAY_LABEL), at.format(TIME_LABEL))
            }
            Self::Slot { at, with_day: false } => at.format(TIME_LABEL).to_string(),
            Self::Day { at } => at.format(DAY_LABEL).to_string(),
            Self::ViewDaysWithTime { time } => {
                format!("View days with {} available", time.format(TIME_LABEL))
            }
            Self::PickAnotherTime => "Pick a different time/day".to_string(),
            Self::PickAnotherDay => "Pick a different time or day".to_string(),
        }
    }
}

/// A numbered list of choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub options: Vec<MenuOption>,
}

impl Menu {
    /// Up to [`MAX_TIME_OPTIONS`] slots, then `extra`, then "pick another".
    pub fn times(slots: &[NaiveDateTime], notice: Option<Notice>, extra: Option<MenuOption>) -> Self {
        let with_day = slots
            .first()
            .map_or(false, |first| slots.iter().any(|s| s.date() != first.date()));
        let mut options: Vec<MenuOption> = slots
            .iter()
            .take(MAX_TIME_OPTIONS)
            .map(|at| MenuOption::Slot { at: *at, with_day })
            .collect();
        options.extend(extra);
        options.push(MenuOption::PickAnotherTime);
        Self {
            title: "Which one of these times would you prefer?".to_string(),
            notice,
            options,
        }
    }

    /// Up to [`MAX_DAY_OPTIONS`] days offering `time`, then "pick another".
    pub fn days(time: NaiveTime, slots: &[NaiveDateTime]) -> Self {
        let mut options: Vec<MenuOption> = slots
            .iter()
            .take(MAX_DAY_OPTIONS)
            .map(|at| MenuOption::Day { at: *at })
            .collect();
        options.push(MenuOption::PickAnotherDay);
        Self {
            title: format!(
                "Here are the days with a {} timeslot available",
                time.format(TIME_LABEL)
            ),
            notice: None,
            options,
        }
    }

    fn with_notice(&self, notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            ..self.clone()
        }
    }

    /// Map a reply to an option: a 1-based number or the option's label.
    pub fn select(&self, reply: &str) -> Option<usize> {
        let reply = reply.trim();
        if let Ok(n) = reply.parse::<usize>() {
            return (1..=self.options.len()).contains(&n).then(|| n - 1);
        }
        self.options
            .iter()
            .position(|o| o.label().eq_ignore_ascii_case(reply))
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.options.len() + 2);
        if let Some(notice) = self.notice {
            lines.push(notice.message().to_string());
        }
        lines.push(self.title.clone());
        for (i, option) in self.options.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, option.label()));
        }
        lines.join("\n")
    }
}

/// A completed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub reference: Uuid,
    pub category: String,
    pub at: NaiveDateTime,
    pub reason: String,
}

impl Confirmation {
    pub fn message(&self) -> String {
        format!(
            "Alright! Your appointment is scheduled with a {} for {} for the reason: {}\nThanks!",
            self.category,
            self.at.format(CONFIRMED_LABEL),
            self.reason
        )
    }
}

/// What to present to the user next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "detail", rename_all = "snake_case")]
pub enum Step {
    AskCategory,
    AskDayAndTime { notice: Option<Notice> },
    AskProperTime,
    ChooseTime(Menu),
    ChooseDay(Menu),
    AskReason,
    Confirmed(Confirmation),
    Help,
    Cancelled,
}

impl Step {
    pub fn prompt(&self) -> String {
        match self {
            Self::AskCategory => "What type of doctor you would like to see?".to_string(),
            Self::AskDayAndTime { notice } => {
                let ask = "Please enter a day, a time, both, or a date and time range";
                match notice {
                    Some(n) => format!("{}\n{}", n.message(), ask),
                    None => ask.to_string(),
                }
            }
            Self::AskProperTime => {
                "Please provide increments of 30 minutes only. (Examples: 1:30PM, 2:00PM, 2:30PM)"
                    .to_string()
            }
            Self::ChooseTime(menu) | Self::ChooseDay(menu) => menu.render(),
            Self::AskReason => "What is the reason for the appointment?".to_string(),
            Self::Confirmed(confirmation) => confirmation.message(),
            Self::Help => HELP_TEXT.to_string(),
            Self::Cancelled => "Appointment scheduling canceled.".to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Scheduler
// ═══════════════════════════════════════════════════════════

pub struct Scheduler {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    categories: Vec<String>,
    category_threshold: f64,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            category_threshold: CATEGORY_MATCH_THRESHOLD,
        }
    }

    pub fn from_config(
        config: &SchedulerConfig,
        store: Arc<dyn ScheduleStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            categories: config.categories.clone(),
            category_threshold: config.category_threshold,
            ..Self::new(store, clock)
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    // ── Whole turns ──────────────────────────────────────

    /// Recognize raw text, then run [`Scheduler::handle_turn`].
    pub fn handle_utterance(
        &self,
        recognizer: &dyn EntityRecognizer,
        sessions: &dyn SessionStore,
        conversation_id: &str,
        utterance: &str,
    ) -> Result<Step, DialogError> {
        let response = recognizer.recognize(utterance)?;
        self.handle_turn(sessions, conversation_id, &response)
    }

    /// Process one recognized utterance for a conversation, loading and
    /// saving its session around the turn.
    pub fn handle_turn(
        &self,
        sessions: &dyn SessionStore,
        conversation_id: &str,
        response: &RecognizerResponse,
    ) -> Result<Step, DialogError> {
        let mut session = sessions.load(conversation_id)?;
        let step = self.handle_intent(&mut session, response)?;
        sessions.save(conversation_id, &session)?;
        tracing::debug!(conversation_id, step = ?step, "Turn handled");
        Ok(step)
    }

    /// Route one utterance: cancel and help interrupt any dialog, a
    /// scheduling intent starts one when idle, anything else answers the
    /// pending question.
    pub fn handle_intent(
        &self,
        session: &mut SchedulingSession,
        response: &RecognizerResponse,
    ) -> Result<Step, DialogError> {
        match classify_intent(response) {
            Intent::Cancel => return Ok(self.cancel(session)),
            Intent::Help => return Ok(self.help()),
            Intent::ScheduleAppointment if session.is_idle() => return self.start(session, response),
            _ => {}
        }

        let Some(awaiting) = session.awaiting else {
            return Ok(self.help());
        };
        match awaiting {
            Awaiting::Category => {
                let text = response
                    .find_entity(EntityKind::DoctorType)
                    .map_or(response.query.as_str(), |e| e.entity.as_str());
                self.provide_category(session, text)
            }
            Awaiting::DayAndTime => self.resolve_temporal(session, &response.temporal()),
            Awaiting::ProperTime => self.provide_proper_time(session, &response.temporal()),
            Awaiting::TimeChoice | Awaiting::DayChoice => self.choose_reply(session, &response.query),
            Awaiting::Reason => {
                let reason = response
                    .find_entity(EntityKind::AppointmentReason)
                    .map_or(response.query.as_str(), |e| e.entity.as_str());
                self.provide_reason(session, reason)
            }
        }
    }

    // ── Individual steps ─────────────────────────────────

    /// Begin a new request from the triggering utterance.
    pub fn start(
        &self,
        session: &mut SchedulingSession,
        response: &RecognizerResponse,
    ) -> Result<Step, DialogError> {
        session.reset();

        let temporal = response.temporal();
        if !temporal.is_empty() {
            session.pending = Some(temporal);
        }

        if let Some(entity) = response.find_entity(EntityKind::DoctorType) {
            if let Some(found) = match_category(&entity.entity, &self.categories, self.category_threshold) {
                tracing::info!(category = %found.name, score = found.score, "Category matched");
                session.category = Some(found.name);
                return self.ask_for_time(session);
            }
        }

        session.awaiting = Some(Awaiting::Category);
        Ok(Step::AskCategory)
    }

    pub fn provide_category(
        &self,
        session: &mut SchedulingSession,
        text: &str,
    ) -> Result<Step, DialogError> {
        match match_category(text, &self.categories, self.category_threshold) {
            Some(found) => {
                tracing::info!(category = %found.name, score = found.score, "Category matched");
                session.category = Some(found.name);
                self.ask_for_time(session)
            }
            None => {
                session.awaiting = Some(Awaiting::Category);
                Ok(Step::AskCategory)
            }
        }
    }

    /// Normalize newly recognized temporal entities and offer candidates.
    pub fn resolve_temporal(
        &self,
        session: &mut SchedulingSession,
        entities: &TemporalEntities,
    ) -> Result<Step, DialogError> {
        if session.category.is_none() {
            session.awaiting = Some(Awaiting::Category);
            return Ok(Step::AskCategory);
        }

        match normalize(entities, self.clock.today()) {
            Ok(request) => self.offer(session, request),
            Err(err) => self.recover(session, err),
        }
    }

    /// Replace the misaligned time of the pending request.
    pub fn provide_proper_time(
        &self,
        session: &mut SchedulingSession,
        entities: &TemporalEntities,
    ) -> Result<Step, DialogError> {
        let Some(request) = session.request.clone() else {
            return self.ask_day_and_time(session, None);
        };

        let time = entities
            .time
            .iter()
            .chain(entities.date_time.iter())
            .flat_map(|e| e.values())
            .filter_map(|v| v.value.as_deref())
            .find_map(parse_time);

        match time {
            Some(time) if validate_alignment(time).is_ok() => self.offer(session, request.with_time(time)),
            _ => {
                session.awaiting = Some(Awaiting::ProperTime);
                Ok(Step::AskProperTime)
            }
        }
    }

    /// Pick a menu option by 0-based index.
    pub fn choose(&self, session: &mut SchedulingSession, index: usize) -> Result<Step, DialogError> {
        let Some(menu) = session.menu.clone() else {
            return self.ask_day_and_time(session, None);
        };
        let Some(option) = menu.options.get(index).cloned() else {
            return Ok(self.present_menu(session, menu.with_notice(Notice::InvalidChoice)));
        };

        match option {
            MenuOption::Slot { at, .. } | MenuOption::Day { at } => {
                session.requested = Some(at);
                session.menu = None;
                session.awaiting = Some(Awaiting::Reason);
                Ok(Step::AskReason)
            }
            MenuOption::ViewDaysWithTime { time } => {
                self.offer(session, TemporalRequest::TimeOpenDay { time })
            }
            MenuOption::PickAnotherTime | MenuOption::PickAnotherDay => {
                session.request = None;
                self.ask_day_and_time(session, None)
            }
        }
    }

    /// Pick a menu option from a free-text reply.
    pub fn choose_reply(&self, session: &mut SchedulingSession, reply: &str) -> Result<Step, DialogError> {
        let Some(menu) = session.menu.clone() else {
            return self.ask_day_and_time(session, None);
        };
        match menu.select(reply) {
            Some(index) => self.choose(session, index),
            None => Ok(self.present_menu(session, menu.with_notice(Notice::InvalidChoice))),
        }
    }

    pub fn provide_reason(&self, session: &mut SchedulingSession, reason: &str) -> Result<Step, DialogError> {
        if session.requested.is_none() {
            return self.ask_day_and_time(session, None);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            session.awaiting = Some(Awaiting::Reason);
            return Ok(Step::AskReason);
        }
        session.reason = Some(reason.to_string());
        self.confirm(session)
    }

    /// Book the chosen slot. Losing the slot to another conversation
    /// re-offers that day's remaining times.
    pub fn confirm(&self, session: &mut SchedulingSession) -> Result<Step, DialogError> {
        let (Some(category), Some(at)) = (session.category.clone(), session.requested) else {
            return self.ask_day_and_time(session, None);
        };
        let reason = session.reason.clone().unwrap_or_default();

        match book_slot(&*self.store, &category, at) {
            Ok(()) => {
                let confirmation = Confirmation {
                    reference: Uuid::new_v4(),
                    category,
                    at,
                    reason,
                };
                tracing::info!(reference = %confirmation.reference, at = %at, "Appointment confirmed");
                session.reset();
                Ok(Step::Confirmed(confirmation))
            }
            Err(SchedulingError::SlotUnavailable(_)) => {
                session.requested = None;
                session.reason = None;
                self.offer(session, TemporalRequest::Exact { at })
            }
            Err(err) => self.recover(session, err),
        }
    }

    /// Abandon the request. Slots are never released.
    pub fn cancel(&self, session: &mut SchedulingSession) -> Step {
        tracing::info!(category = ?session.category, "Scheduling canceled");
        session.reset();
        Step::Cancelled
    }

    pub fn help(&self) -> Step {
        Step::Help
    }

    // ── Internals ────────────────────────────────────────

    fn ask_for_time(&self, session: &mut SchedulingSession) -> Result<Step, DialogError> {
        match session.pending.take() {
            Some(entities) => self.resolve_temporal(session, &entities),
            None => self.ask_day_and_time(session, None),
        }
    }

    fn ask_day_and_time(
        &self,
        session: &mut SchedulingSession,
        notice: Option<Notice>,
    ) -> Result<Step, DialogError> {
        session.menu = None;
        session.requested = None;
        session.awaiting = Some(Awaiting::DayAndTime);
        Ok(Step::AskDayAndTime { notice })
    }

    fn present_menu(&self, session: &mut SchedulingSession, menu: Menu) -> Step {
        session.menu = Some(menu.clone());
        if matches!(menu.options.last(), Some(MenuOption::PickAnotherDay)) {
            session.awaiting = Some(Awaiting::DayChoice);
            Step::ChooseDay(menu)
        } else {
            session.awaiting = Some(Awaiting::TimeChoice);
            Step::ChooseTime(menu)
        }
    }

    /// Resolve `request` and turn the candidates into the next step.
    fn offer(&self, session: &mut SchedulingSession, request: TemporalRequest) -> Result<Step, DialogError> {
        let Some(category) = session.category.clone() else {
            session.awaiting = Some(Awaiting::Category);
            return Ok(Step::AskCategory);
        };
        session.request = Some(request.clone());
        let today = self.clock.today();

        let candidates = match resolve(&*self.store, &category, &request, today) {
            Ok(candidates) => candidates,
            Err(err) => return self.recover(session, err),
        };

        match candidates {
            Candidates::Exact { at, available: true } => {
                session.requested = Some(at);
                session.menu = None;
                session.awaiting = Some(Awaiting::Reason);
                Ok(Step::AskReason)
            }
            Candidates::Exact { at, available: false } => {
                let same_day = match timeslots_for_day(&*self.store, &category, at.date(), None) {
                    Ok(slots) => slots,
                    Err(err) => return self.recover(session, err),
                };
                if same_day.is_empty() {
                    return self.ask_day_and_time(session, Some(Notice::NothingAvailable));
                }
                let menu = Menu::times(
                    &same_day,
                    Some(Notice::SlotTaken),
                    Some(MenuOption::ViewDaysWithTime { time: at.time() }),
                );
                Ok(self.present_menu(session, menu))
            }
            Candidates::Times { slots } if slots.is_empty() => {
                self.ask_day_and_time(session, Some(Notice::NothingAvailable))
            }
            Candidates::Times { slots } => Ok(self.present_menu(session, Menu::times(&slots, None, None))),
            Candidates::Days { slots, .. } if slots.is_empty() => {
                self.ask_day_and_time(session, Some(Notice::NoDaysWithTime))
            }
            Candidates::Days { time, slots } => Ok(self.present_menu(session, Menu::days(time, &slots))),
        }
    }

    /// Map a recoverable scheduling error to a clarification step.
    fn recover(&self, session: &mut SchedulingSession, err: SchedulingError) -> Result<Step, DialogError> {
        tracing::debug!(error = %err, "Recovering from scheduling error");
        match err {
            SchedulingError::MisalignedTime(_) => {
                session.awaiting = Some(Awaiting::ProperTime);
                Ok(Step::AskProperTime)
            }
            SchedulingError::PastDate => self.ask_day_and_time(session, Some(Notice::PastDate)),
            SchedulingError::TimeRangeCrossesMidnight { .. } => {
                self.ask_day_and_time(session, Some(Notice::OvernightRange))
            }
            SchedulingError::SlotUnavailable(_) => {
                self.ask_day_and_time(session, Some(Notice::NothingAvailable))
            }
            SchedulingError::MissingEntity => self.ask_day_and_time(session, None),
            SchedulingError::Database(e) => Err(DialogError::Database(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryScheduleStore;
    use crate::models::{SlotKey, SlotState};
    use crate::nlu::{Entity, IntentScore, MockRecognizer, ResolutionValue};
    use crate::scheduling::testutil::{d, sample_store, t, today};
    use crate::scheduling::FixedClock;
    use crate::session::InMemorySessionStore;

    fn scheduler_over(store: Arc<dyn ScheduleStore>) -> Scheduler {
        Scheduler::new(store, Arc::new(FixedClock(today())))
    }

    fn scheduler() -> (Scheduler, Arc<InMemoryScheduleStore>) {
        let store = Arc::new(sample_store());
        (scheduler_over(store.clone()), store)
    }

    fn utterance(intent: &str, score: f64, entities: Vec<Entity>) -> RecognizerResponse {
        RecognizerResponse {
            query: "…".into(),
            top_scoring_intent: Some(IntentScore {
                intent: intent.into(),
                score,
            }),
            intents: Vec::new(),
            entities,
        }
    }

    fn doctor(text: &str) -> Entity {
        Entity::text(EntityKind::DoctorType, text)
    }

    fn date(value: &str) -> Entity {
        Entity::resolved(EntityKind::Date, value, vec![ResolutionValue::single(value)])
    }

    fn time(value: &str) -> Entity {
        Entity::resolved(EntityKind::Time, value, vec![ResolutionValue::single(value)])
    }

    fn ranged(kind: EntityKind, start: &str, end: &str) -> Entity {
        Entity::resolved(kind, start, vec![ResolutionValue::range(start, end)])
    }

    fn temporal(entities: Vec<Entity>) -> TemporalEntities {
        TemporalEntities::from_entities(&entities)
    }

    fn menu_of(step: &Step) -> &Menu {
        match step {
            Step::ChooseTime(menu) | Step::ChooseDay(menu) => menu,
            other => panic!("expected a menu, got {other:?}"),
        }
    }

    #[test]
    fn one_shot_request_books_after_reason() {
        let (scheduler, store) = scheduler();
        let mut session = SchedulingSession::new();

        let step = scheduler
            .start(
                &mut session,
                &utterance(
                    "ScheduleAppointment",
                    0.95,
                    vec![doctor("radiologst"), date("2026-10-20"), time("14:00:00")],
                ),
            )
            .unwrap();
        assert_eq!(step, Step::AskReason);
        assert_eq!(session.category.as_deref(), Some("Radiologist"));
        assert_eq!(session.requested, Some(d(2026, 10, 20).and_time(t(14, 0))));

        let step = scheduler.provide_reason(&mut session, "knee pain").unwrap();
        let Step::Confirmed(confirmation) = &step else {
            panic!("expected confirmation, got {step:?}");
        };
        assert_eq!(confirmation.category, "Radiologist");
        assert_eq!(confirmation.reason, "knee pain");
        assert_eq!(
            step.prompt(),
            "Alright! Your appointment is scheduled with a Radiologist for Tuesday, October 20, 2026 at 2:00 PM for the reason: knee pain\nThanks!"
        );
        assert!(session.is_idle());
        assert_eq!(
            store
                .slot_state(&SlotKey::new("Radiologist", d(2026, 10, 20), t(14, 0)))
                .unwrap(),
            Some(SlotState::Booked)
        );
    }

    #[test]
    fn unmatched_category_reprompts() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession::new();

        let step = scheduler
            .start(&mut session, &utterance("ScheduleAppointment", 0.9, vec![]))
            .unwrap();
        assert_eq!(step, Step::AskCategory);
        assert_eq!(step.prompt(), "What type of doctor you would like to see?");

        assert_eq!(scheduler.provide_category(&mut session, "plumber").unwrap(), Step::AskCategory);
        assert_eq!(session.awaiting, Some(Awaiting::Category));

        let step = scheduler.provide_category(&mut session, "cardiologist").unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: None });
        assert_eq!(session.category.as_deref(), Some("Cardiologist"));
    }

    #[test]
    fn entities_before_category_are_kept() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession::new();

        scheduler
            .start(
                &mut session,
                &utterance("ScheduleAppointment", 0.9, vec![date("2026-10-20")]),
            )
            .unwrap();
        assert!(session.pending.is_some());

        let step = scheduler.provide_category(&mut session, "Cardiologist").unwrap();
        let menu = menu_of(&step);
        assert_eq!(menu.options[0], MenuOption::Slot { at: d(2026, 10, 20).and_time(t(14, 0)), with_day: false });
        assert!(session.pending.is_none());
    }

    #[test]
    fn misaligned_time_asks_for_proper_time() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-20"), time("14:15:00")]))
            .unwrap();
        assert_eq!(step, Step::AskProperTime);
        assert!(step.prompt().starts_with("Please provide increments of 30 minutes only."));

        // Still off the grid.
        let step = scheduler
            .provide_proper_time(&mut session, &temporal(vec![time("14:45:00")]))
            .unwrap();
        assert_eq!(step, Step::AskProperTime);

        let step = scheduler
            .provide_proper_time(&mut session, &temporal(vec![time("14:00:00")]))
            .unwrap();
        assert_eq!(step, Step::AskReason);
        assert_eq!(session.requested, Some(d(2026, 10, 20).and_time(t(14, 0))));
    }

    #[test]
    fn late_misaligned_time_in_date_range_asks_for_proper_time() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };

        let this_week = ranged(EntityKind::DateRange, "2026-10-19", "2026-10-25");
        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![this_week, time("23:45:00")]))
            .unwrap();
        assert_eq!(step, Step::AskProperTime);
        assert_eq!(session.awaiting, Some(Awaiting::ProperTime));

        let step = scheduler
            .provide_proper_time(&mut session, &temporal(vec![time("14:00:00")]))
            .unwrap();
        let labels: Vec<String> = menu_of(&step).options.iter().map(MenuOption::label).collect();
        assert_eq!(
            labels,
            vec!["Mon, Oct 19", "Tue, Oct 20", "Thu, Oct 22", "Pick a different time or day"]
        );
    }

    #[test]
    fn overnight_time_range_reprompts_with_notice() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };
        let late = ranged(EntityKind::TimeRange, "22:00:00", "01:00:00");
        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-20"), late]))
            .unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: Some(Notice::OvernightRange) });
        assert!(step.prompt().starts_with("The time range has to start and end on the same day\n"));
    }

    #[test]
    fn past_date_reprompts_with_notice() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };
        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-18")]))
            .unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: Some(Notice::PastDate) });
        assert_eq!(
            step.prompt(),
            "The date cannot be in the past\nPlease enter a day, a time, both, or a date and time range"
        );
    }

    #[test]
    fn nothing_recognized_asks_again() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };
        let step = scheduler.resolve_temporal(&mut session, &temporal(vec![])).unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: None });
    }

    #[test]
    fn empty_results_fall_back_to_asking() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-23")]))
            .unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: Some(Notice::NothingAvailable) });

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![time("07:00:00")]))
            .unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: Some(Notice::NoDaysWithTime) });
    }

    #[test]
    fn booked_slot_offers_same_day_and_other_days() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-20"), time("09:30:00")]))
            .unwrap();
        let menu = menu_of(&step).clone();
        assert!(matches!(step, Step::ChooseTime(_)));
        assert_eq!(menu.notice, Some(Notice::SlotTaken));
        let labels: Vec<String> = menu.options.iter().map(MenuOption::label).collect();
        assert_eq!(
            labels,
            vec![
                "9:00 AM",
                "11:30 AM",
                "2:00 PM",
                "3:30 PM",
                "View days with 9:30 AM available",
                "Pick a different time/day",
            ]
        );

        let step = scheduler.choose(&mut session, 4).unwrap();
        assert!(matches!(step, Step::ChooseDay(_)));
        let menu = menu_of(&step);
        assert_eq!(menu.title, "Here are the days with a 9:30 AM timeslot available");
        assert_eq!(
            menu.options,
            vec![MenuOption::Day { at: d(2026, 10, 19).and_time(t(9, 30)) }, MenuOption::PickAnotherDay]
        );
        assert_eq!(session.awaiting, Some(Awaiting::DayChoice));
    }

    #[test]
    fn booked_slot_with_empty_day_asks_again() {
        let store = InMemoryScheduleStore::new();
        store
            .insert_slot(SlotKey::new("Cardiologist", d(2026, 10, 20), t(14, 0)), SlotState::Booked)
            .unwrap();
        let scheduler = scheduler_over(Arc::new(store));
        let mut session = SchedulingSession {
            category: Some("Cardiologist".into()),
            ..SchedulingSession::default()
        };

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-20"), time("14:00:00")]))
            .unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: Some(Notice::NothingAvailable) });
        assert!(session.menu.is_none());
    }

    #[test]
    fn time_only_offers_days_and_accepts_label_reply() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![time("14:00:00")]))
            .unwrap();
        let labels: Vec<String> = menu_of(&step).options.iter().map(MenuOption::label).collect();
        assert_eq!(
            labels,
            vec!["Mon, Oct 19", "Tue, Oct 20", "Thu, Oct 22", "Pick a different time or day"]
        );

        let step = scheduler.choose_reply(&mut session, "tue, oct 20").unwrap();
        assert_eq!(step, Step::AskReason);
        assert_eq!(session.requested, Some(d(2026, 10, 20).and_time(t(14, 0))));
    }

    #[test]
    fn invalid_choice_repeats_menu() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };
        let first = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-22")]))
            .unwrap();

        let step = scheduler.choose_reply(&mut session, "99").unwrap();
        let menu = menu_of(&step);
        assert_eq!(menu.notice, Some(Notice::InvalidChoice));
        assert_eq!(menu.options, menu_of(&first).options);
        assert!(step.prompt().starts_with("Please choose from the available options\n"));

        assert_eq!(scheduler.choose(&mut session, 17).unwrap(), step);
    }

    #[test]
    fn pick_another_returns_to_open_question() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };
        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-22")]))
            .unwrap();
        let last = menu_of(&step).options.len();

        let step = scheduler.choose_reply(&mut session, &last.to_string()).unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: None });
        assert!(session.request.is_none());
        assert!(session.menu.is_none());
    }

    #[test]
    fn losing_the_race_reoffers_the_day() {
        let (scheduler, store) = scheduler();
        let mut session = SchedulingSession {
            category: Some("Radiologist".into()),
            ..SchedulingSession::default()
        };
        let at = d(2026, 10, 22).and_time(t(14, 0));
        scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-22"), time("14:00:00")]))
            .unwrap();
        assert_eq!(session.requested, Some(at));

        // Another conversation takes the slot first.
        assert!(store.book(&SlotKey::at("Radiologist", at)).unwrap().is_booked());

        let step = scheduler.provide_reason(&mut session, "checkup").unwrap();
        let menu = menu_of(&step);
        assert_eq!(menu.notice, Some(Notice::SlotTaken));
        assert_eq!(
            menu.options[0],
            MenuOption::Slot { at: d(2026, 10, 22).and_time(t(16, 0)), with_day: false }
        );
        assert!(session.requested.is_none());
    }

    #[test]
    fn menus_are_capped() {
        let store = InMemoryScheduleStore::new();
        for half_hours in 0..20u32 {
            let time = t(8 + half_hours / 2, (half_hours % 2) * 30);
            store
                .insert_slot(SlotKey::new("Psychiatrist", d(2026, 10, 20), time), SlotState::Available)
                .unwrap();
        }
        for day in 20..28 {
            store
                .insert_slot(SlotKey::new("Psychiatrist", d(2026, 10, day), t(17, 0)), SlotState::Available)
                .unwrap();
        }
        let scheduler = scheduler_over(Arc::new(store));
        let mut session = SchedulingSession {
            category: Some("Psychiatrist".into()),
            ..SchedulingSession::default()
        };

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![date("2026-10-20")]))
            .unwrap();
        let options = &menu_of(&step).options;
        assert_eq!(options.len(), MAX_TIME_OPTIONS + 1);
        assert_eq!(options.last(), Some(&MenuOption::PickAnotherTime));

        let step = scheduler
            .resolve_temporal(&mut session, &temporal(vec![time("17:00:00")]))
            .unwrap();
        let options = &menu_of(&step).options;
        assert_eq!(options.len(), MAX_DAY_OPTIONS + 1);
        assert_eq!(options.last(), Some(&MenuOption::PickAnotherDay));
    }

    #[test]
    fn multi_day_time_menu_labels_include_day() {
        let menu = Menu::times(
            &[d(2026, 10, 20).and_time(t(9, 0)), d(2026, 10, 21).and_time(t(13, 30))],
            None,
            None,
        );
        assert_eq!(menu.options[0].label(), "Tue, Oct 20 9:00 AM");
        assert_eq!(menu.options[1].label(), "Wed, Oct 21 1:30 PM");
        assert_eq!(menu.select("2"), Some(1));
        assert_eq!(menu.select("0"), None);
        assert_eq!(menu.select("pick a different time/day"), Some(2));
    }

    #[test]
    fn cancel_and_help_interrupt_without_releasing() {
        let (scheduler, store) = scheduler();
        let sessions = InMemorySessionStore::new();

        let step = scheduler
            .handle_turn(
                &sessions,
                "conv-1",
                &utterance("ScheduleAppointment", 0.9, vec![doctor("dermatologist")]),
            )
            .unwrap();
        assert_eq!(step, Step::AskDayAndTime { notice: None });
        assert_eq!(sessions.len(), 1);

        let step = scheduler
            .handle_turn(&sessions, "conv-1", &utterance("Help", 0.95, vec![]))
            .unwrap();
        assert_eq!(step, Step::Help);
        assert!(step.prompt().contains("'Schedule me with a dermatologist this week at 1:30pm'"));
        assert_eq!(sessions.load("conv-1").unwrap().awaiting, Some(Awaiting::DayAndTime));

        let step = scheduler
            .handle_turn(&sessions, "conv-1", &utterance("Cancel", 0.7, vec![]))
            .unwrap();
        assert_eq!(step, Step::Cancelled);
        assert_eq!(step.prompt(), "Appointment scheduling canceled.");
        assert!(sessions.is_empty());
        assert_eq!(store.len(), 13);
    }

    #[test]
    fn turns_answer_the_pending_question() {
        let (scheduler, _) = scheduler();
        let sessions = InMemorySessionStore::new();

        scheduler
            .handle_turn(&sessions, "conv-1", &utterance("ScheduleAppointment", 0.9, vec![]))
            .unwrap();

        let mut reply = utterance("None", 0.2, vec![doctor("radiologist")]);
        reply.query = "a radiologist please".into();
        assert_eq!(
            scheduler.handle_turn(&sessions, "conv-1", &reply).unwrap(),
            Step::AskDayAndTime { notice: None }
        );

        let reply = utterance("ScheduleAppointment", 0.85, vec![date("2026-10-22"), time("16:00:00")]);
        assert_eq!(scheduler.handle_turn(&sessions, "conv-1", &reply).unwrap(), Step::AskReason);

        let mut reply = utterance("None", 0.1, vec![]);
        reply.query = "annual scan".into();
        let step = scheduler.handle_turn(&sessions, "conv-1", &reply).unwrap();
        assert!(matches!(step, Step::Confirmed(ref c) if c.reason == "annual scan"));
        assert!(sessions.is_empty());
    }

    #[test]
    fn idle_chatter_gets_help() {
        let (scheduler, _) = scheduler();
        let mut session = SchedulingSession::new();
        let step = scheduler
            .handle_intent(&mut session, &utterance("None", 0.3, vec![]))
            .unwrap();
        assert_eq!(step, Step::Help);
    }

    #[test]
    fn utterances_go_through_the_recognizer() {
        let (scheduler, _) = scheduler();
        let sessions = InMemorySessionStore::new();
        let recognizer = MockRecognizer::new(utterance(
            "ScheduleAppointment",
            0.97,
            vec![doctor("cardiologist"), date("2026-10-20")],
        ));

        let step = scheduler
            .handle_utterance(&recognizer, &sessions, "conv-9", "cardiologist tomorrow")
            .unwrap();
        assert_eq!(
            menu_of(&step).options,
            vec![
                MenuOption::Slot { at: d(2026, 10, 20).and_time(t(14, 0)), with_day: false },
                MenuOption::PickAnotherTime,
            ]
        );
    }

    #[test]
    fn step_serializes_with_tag() {
        let json = serde_json::to_value(Step::AskDayAndTime { notice: Some(Notice::PastDate) }).unwrap();
        assert_eq!(json["step"], "ask_day_and_time");
        assert_eq!(json["detail"]["notice"], "past_date");
    }
}
