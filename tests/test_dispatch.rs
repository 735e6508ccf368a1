//! Integration tests for intent dispatch and the per-handler contract,
//! driven through a recording stand-in for the dialogue bus.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nelum_skill::dialogue::{DialogueApi, IntentMessage, IntentPayload};
use nelum_skill::dispatch::{Dispatcher, IntentHandler};
use nelum_skill::error::AppError;
use nelum_skill::handlers;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    EndSession { session_id: String, text: String },
    Notification { site_id: String, text: String },
}

#[derive(Default)]
struct RecordingDialogue {
    calls: Mutex<Vec<Call>>,
}

impl RecordingDialogue {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl DialogueApi for RecordingDialogue {
    fn end_session(&self, session_id: &str, text: &str) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(Call::EndSession {
            session_id: session_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn start_session_notification(
        &self,
        site_id: &str,
        text: &str,
        _custom_data: Option<&str>,
    ) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(Call::Notification {
            site_id: site_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

fn intent(name: &str, session_id: &str, site_id: &str) -> IntentMessage {
    IntentMessage {
        session_id: session_id.to_string(),
        site_id: site_id.to_string(),
        intent: IntentPayload {
            intent_name: name.to_string(),
            confidence_score: Some(1.0),
        },
        input: None,
        custom_data: None,
    }
}

fn counting_handler(counter: Arc<AtomicUsize>) -> IntentHandler {
    Box::new(move |_api, _msg| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn matching_handler_invoked_exactly_once() {
    let h1_calls = Arc::new(AtomicUsize::new(0));
    let h2_calls = Arc::new(AtomicUsize::new(0));

    let api = Arc::new(RecordingDialogue::default());
    let dispatcher = Dispatcher::new(
        api,
        vec![
            ("intent_1", counting_handler(h1_calls.clone())),
            ("intent_2", counting_handler(h2_calls.clone())),
        ],
    );

    dispatcher.dispatch(&intent("intent_1", "s1", "default"));

    assert_eq!(h1_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h2_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_intent_invokes_no_handler() {
    let h1_calls = Arc::new(AtomicUsize::new(0));

    let api = Arc::new(RecordingDialogue::default());
    let dispatcher = Dispatcher::new(api.clone(), vec![("intent_1", counting_handler(h1_calls.clone()))]);

    dispatcher.dispatch(&intent("intent_3", "s1", "default"));

    assert_eq!(h1_calls.load(Ordering::SeqCst), 0);
    assert!(api.calls().is_empty());
}

#[test]
fn handler_ends_session_then_notifies_the_site() {
    let api = Arc::new(RecordingDialogue::default());
    let dispatcher = Dispatcher::new(
        api.clone(),
        vec![("intent_1", Box::new(handlers::action_one) as IntentHandler)],
    );

    dispatcher.dispatch(&intent("intent_1", "abc", "kitchen"));

    assert_eq!(
        api.calls(),
        vec![
            Call::EndSession { session_id: "abc".to_string(), text: String::new() },
            Call::Notification {
                site_id: "kitchen".to_string(),
                text: "Action one has been done".to_string(),
            },
        ]
    );
}

#[test]
#[should_panic(expected = "duplicate intent handler")]
fn duplicate_registration_panics() {
    let api = Arc::new(RecordingDialogue::default());
    let _ = Dispatcher::new(
        api,
        vec![
            ("intent_1", Box::new(|_: &dyn DialogueApi, _: &IntentMessage| Ok(())) as IntentHandler),
            ("intent_1", Box::new(|_: &dyn DialogueApi, _: &IntentMessage| Ok(())) as IntentHandler),
        ],
    );
}

#[test]
fn handler_error_does_not_stop_dispatching() {
    let ok_calls = Arc::new(AtomicUsize::new(0));

    let api = Arc::new(RecordingDialogue::default());
    let dispatcher = Dispatcher::new(
        api,
        vec![
            (
                "broken",
                Box::new(|_: &dyn DialogueApi, _: &IntentMessage| {
                    Err(AppError::Bus("publish failed".into()))
                }) as IntentHandler,
            ),
            ("intent_1", counting_handler(ok_calls.clone())),
        ],
    );

    dispatcher.dispatch(&intent("broken", "s1", "default"));
    dispatcher.dispatch(&intent("intent_1", "s2", "default"));

    assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
}
