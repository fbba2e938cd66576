//! Application session state machine
//!
//! The session is the single source of truth behind the UI: current
//! screen, concern selection, in-flight analysis status, diagnosis,
//! annotation visibility, chat transcript, and the bounded history.
//!
//! Every user action and every asynchronous completion enters as a
//! `SessionEvent`; [`Session::apply`] advances the state and returns the
//! effects the runtime must execute (camera control, remote calls,
//! history saves). Nothing else mutates the session, which keeps every
//! transition unit-testable without a UI or network.

use crate::analysis::Diagnosis;
use crate::capture::CapturedImage;
use crate::chat::Transcript;
use crate::history::{push_entry, HistoryEntry};
use chrono::{DateTime, Local};
use std::collections::BTreeSet;

/// The four reachable screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Login,
    Dashboard,
    Scanner,
    Results,
}

/// A user action or asynchronous completion
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum SessionEvent {
    /// Login form submitted; any non-empty pair is accepted
    LoginSubmitted { email: String, password: String },
    LogoutRequested,
    /// Toggle one concern tag on the dashboard
    ConcernToggled { id: String },
    /// Start a scan; requires at least one selected concern
    ScanRequested,
    /// Leave the scanner without capturing
    ScanCancelled,
    /// The camera could not deliver (device missing, permission denied,
    /// stream died)
    CameraFailed { message: String },
    /// A snapshot was captured; analysis begins
    ImageCaptured { image: CapturedImage },
    AnalysisSucceeded {
        diagnosis: Diagnosis,
        completed_at: DateTime<Local>,
    },
    AnalysisFailed { message: String },
    /// Load a past scan from the history strip
    HistorySelected { index: usize },
    /// Close the results screen
    ResultsDismissed,
    /// Show/hide detection overlays
    AnnotationsToggled,
    ChatSubmitted { text: String },
    ChatFragment { text: String },
    ChatCompleted,
    ChatFailed,
}

/// Side effects the runtime executes after a transition
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub(crate) enum Effect {
    StartCamera,
    StopCamera,
    Analyze {
        image: CapturedImage,
        concerns: Vec<String>,
    },
    SaveHistory(Vec<HistoryEntry>),
    OpenChat(Diagnosis),
    SendChat(String),
}

/// The single mutable session; one per running client
#[derive(Debug)]
pub(crate) struct Session {
    pub screen: Screen,
    /// Display-only identity (the login email); no real authentication
    pub user: Option<String>,
    pub selected_concerns: BTreeSet<String>,
    pub captured_image: Option<CapturedImage>,
    pub analyzing: bool,
    pub diagnosis: Option<Diagnosis>,
    pub show_annotations: bool,
    pub history: Vec<HistoryEntry>,
    /// Chat transcript for the current diagnosis, if one is open
    pub transcript: Option<Transcript>,
    /// Blocking user notice (analysis failures)
    pub notice: Option<String>,
    /// Inline camera error on the scanner screen
    pub camera_error: Option<String>,
}

impl Session {
    pub(crate) fn new(history: Vec<HistoryEntry>) -> Self {
        Self {
            screen: Screen::Login,
            user: None,
            selected_concerns: BTreeSet::new(),
            captured_image: None,
            analyzing: false,
            diagnosis: None,
            show_annotations: true,
            history,
            transcript: None,
            notice: None,
            camera_error: None,
        }
    }

    /// Whether the scan action is currently reachable
    pub(crate) fn can_start_scan(&self) -> bool {
        self.screen == Screen::Dashboard && !self.selected_concerns.is_empty()
    }

    /// Advance the session by one event; returns the effects to run
    pub(crate) fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::LoginSubmitted { email, password } => {
                if self.screen == Screen::Login
                    && !email.trim().is_empty()
                    && !password.is_empty()
                {
                    self.user = Some(email);
                    self.screen = Screen::Dashboard;
                }
                Vec::new()
            }

            SessionEvent::LogoutRequested => {
                let leaving_scanner = self.screen == Screen::Scanner;
                self.user = None;
                self.selected_concerns.clear();
                self.captured_image = None;
                self.diagnosis = None;
                self.transcript = None;
                self.notice = None;
                self.camera_error = None;
                // An in-flight analysis keeps running; its completion is
                // ignored because the flag is cleared here
                self.analyzing = false;
                self.screen = Screen::Login;
                if leaving_scanner {
                    vec![Effect::StopCamera]
                } else {
                    Vec::new()
                }
            }

            SessionEvent::ConcernToggled { id } => {
                if self.screen == Screen::Dashboard {
                    self.notice = None;
                    if !self.selected_concerns.remove(&id) {
                        self.selected_concerns.insert(id);
                    }
                }
                Vec::new()
            }

            SessionEvent::ScanRequested => {
                if self.can_start_scan() {
                    self.notice = None;
                    self.camera_error = None;
                    self.screen = Screen::Scanner;
                    vec![Effect::StartCamera]
                } else {
                    Vec::new()
                }
            }

            SessionEvent::ScanCancelled => {
                if self.screen == Screen::Scanner {
                    self.camera_error = None;
                    self.screen = Screen::Dashboard;
                    vec![Effect::StopCamera]
                } else {
                    Vec::new()
                }
            }

            SessionEvent::CameraFailed { message } => {
                if self.screen == Screen::Scanner {
                    self.camera_error = Some(message);
                    // The device is released immediately; the user backs
                    // out with cancel and may retry from the dashboard
                    vec![Effect::StopCamera]
                } else {
                    Vec::new()
                }
            }

            SessionEvent::ImageCaptured { image } => {
                if self.screen == Screen::Scanner && !self.analyzing {
                    self.captured_image = Some(image.clone());
                    self.diagnosis = None;
                    self.transcript = None;
                    self.analyzing = true;
                    self.screen = Screen::Results;
                    let concerns = self.selected_concerns.iter().cloned().collect();
                    vec![Effect::StopCamera, Effect::Analyze { image, concerns }]
                } else {
                    Vec::new()
                }
            }

            SessionEvent::AnalysisSucceeded {
                diagnosis,
                completed_at,
            } => {
                if !self.analyzing {
                    // Stale completion (user logged out meanwhile)
                    return Vec::new();
                }
                let Some(image) = self.captured_image.clone() else {
                    self.analyzing = false;
                    return Vec::new();
                };

                self.analyzing = false;
                push_entry(
                    &mut self.history,
                    HistoryEntry::new(image, diagnosis.clone(), completed_at),
                );
                self.transcript = Some(Transcript::seeded(&diagnosis.condition));
                self.diagnosis = Some(diagnosis.clone());
                vec![
                    Effect::SaveHistory(self.history.clone()),
                    Effect::OpenChat(diagnosis),
                ]
            }

            SessionEvent::AnalysisFailed { message } => {
                if self.analyzing {
                    self.analyzing = false;
                    self.notice = Some(message);
                    self.screen = Screen::Dashboard;
                }
                Vec::new()
            }

            SessionEvent::HistorySelected { index } => {
                if self.analyzing {
                    return Vec::new();
                }
                let Some(entry) = self.history.get(index) else {
                    return Vec::new();
                };

                self.captured_image = Some(entry.image.clone());
                self.diagnosis = Some(entry.result.clone());
                // Viewing history is independent of any new scan setup
                self.selected_concerns.clear();
                self.transcript = Some(Transcript::seeded(&entry.result.condition));
                self.screen = Screen::Results;
                vec![Effect::OpenChat(entry.result.clone())]
            }

            SessionEvent::ResultsDismissed => {
                if self.screen == Screen::Results && !self.analyzing {
                    self.captured_image = None;
                    self.diagnosis = None;
                    self.transcript = None;
                    self.screen = Screen::Dashboard;
                }
                Vec::new()
            }

            SessionEvent::AnnotationsToggled => {
                if self.screen == Screen::Results {
                    // Toggling visibility never discards detection data
                    self.show_annotations = !self.show_annotations;
                }
                Vec::new()
            }

            SessionEvent::ChatSubmitted { text } => {
                let Some(transcript) = self.transcript.as_mut() else {
                    return Vec::new();
                };
                if self.screen == Screen::Results
                    && !self.analyzing
                    && transcript.can_submit(&text)
                {
                    let text = text.trim().to_string();
                    transcript.begin_send(text.clone());
                    vec![Effect::SendChat(text)]
                } else {
                    Vec::new()
                }
            }

            SessionEvent::ChatFragment { text } => {
                if let Some(transcript) = self.transcript.as_mut() {
                    transcript.apply_fragment(&text);
                }
                Vec::new()
            }

            SessionEvent::ChatCompleted => {
                if let Some(transcript) = self.transcript.as_mut() {
                    transcript.complete_stream();
                }
                Vec::new()
            }

            SessionEvent::ChatFailed => {
                if let Some(transcript) = self.transcript.as_mut() {
                    transcript.fail_stream();
                }
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn diagnosis(condition: &str) -> Diagnosis {
        serde_json::from_value(serde_json::json!({
            "condition": condition,
            "confidence": 0.9,
            "description": "A description.",
            "severity": "Moderate",
            "recommendations": ["Cleanse twice daily"],
            "suggestedIngredients": ["Salicylic Acid"],
            "disclaimer": "Not medical advice.",
            "detections": [
                {"label": "Acne", "box_2d": [100, 200, 300, 500]},
                {"label": "Redness", "box_2d": [400, 400, 600, 700]}
            ]
        }))
        .expect("diagnosis")
    }

    fn image(tag: u8) -> CapturedImage {
        CapturedImage {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8, tag],
        }
    }

    fn at(millis: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
    }

    fn logged_in() -> Session {
        let mut session = Session::new(Vec::new());
        session.apply(SessionEvent::LoginSubmitted {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        });
        session
    }

    /// Walk a session from login to an in-flight analysis
    fn analyzing_session(concerns: &[&str]) -> Session {
        let mut session = logged_in();
        for id in concerns {
            session.apply(SessionEvent::ConcernToggled { id: id.to_string() });
        }
        session.apply(SessionEvent::ScanRequested);
        session.apply(SessionEvent::ImageCaptured { image: image(1) });
        session
    }

    #[test]
    fn test_login_requires_non_empty_credentials() {
        let mut session = Session::new(Vec::new());

        session.apply(SessionEvent::LoginSubmitted {
            email: "  ".to_string(),
            password: "x".to_string(),
        });
        assert_eq!(session.screen, Screen::Login);

        session.apply(SessionEvent::LoginSubmitted {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        });
        assert_eq!(session.screen, Screen::Dashboard);
        assert_eq!(session.user.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_concern_toggle_is_idempotent_and_order_insensitive() {
        let mut a = logged_in();
        let mut b = logged_in();

        for id in ["acne", "redness", "acne", "pores", "redness", "redness"] {
            a.apply(SessionEvent::ConcernToggled { id: id.to_string() });
        }
        // same multiset of toggles, different order
        for id in ["redness", "acne", "pores", "redness", "redness", "acne"] {
            b.apply(SessionEvent::ConcernToggled { id: id.to_string() });
        }

        // acne toggled twice (off), redness thrice (on), pores once (on)
        let expected: BTreeSet<String> =
            ["pores", "redness"].iter().map(|s| s.to_string()).collect();
        assert_eq!(a.selected_concerns, expected);
        assert_eq!(b.selected_concerns, expected);
    }

    #[test]
    fn test_scan_requires_selected_concern() {
        let mut session = logged_in();
        assert!(!session.can_start_scan());

        let effects = session.apply(SessionEvent::ScanRequested);
        assert_eq!(session.screen, Screen::Dashboard);
        assert!(effects.is_empty());

        session.apply(SessionEvent::ConcernToggled {
            id: "acne".to_string(),
        });
        assert!(session.can_start_scan());

        let effects = session.apply(SessionEvent::ScanRequested);
        assert_eq!(session.screen, Screen::Scanner);
        assert_eq!(effects, vec![Effect::StartCamera]);
    }

    #[test]
    fn test_capture_enters_analyzing_results_and_requests_analysis() {
        let session_image = image(7);
        let mut session = logged_in();
        session.apply(SessionEvent::ConcernToggled {
            id: "redness".to_string(),
        });
        session.apply(SessionEvent::ConcernToggled {
            id: "acne".to_string(),
        });
        session.apply(SessionEvent::ScanRequested);

        let effects = session.apply(SessionEvent::ImageCaptured {
            image: session_image.clone(),
        });

        assert_eq!(session.screen, Screen::Results);
        assert!(session.analyzing);
        assert!(session.diagnosis.is_none());
        assert_eq!(session.captured_image.as_ref(), Some(&session_image));
        assert_eq!(
            effects,
            vec![
                Effect::StopCamera,
                Effect::Analyze {
                    image: session_image,
                    concerns: vec!["acne".to_string(), "redness".to_string()],
                }
            ]
        );
    }

    #[test]
    fn test_capture_is_not_reentrant_while_analyzing() {
        let mut session = analyzing_session(&["acne"]);
        assert!(session.analyzing);

        let effects = session.apply(SessionEvent::ImageCaptured { image: image(2) });
        assert!(effects.is_empty());
    }

    #[test]
    fn test_analysis_success_stores_diagnosis_and_prepends_history() {
        let mut session = analyzing_session(&["acne", "redness"]);

        let effects = session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne Vulgaris"),
            completed_at: at(0),
        });

        assert_eq!(session.screen, Screen::Results);
        assert!(!session.analyzing);
        assert_eq!(
            session.diagnosis.as_ref().map(|d| d.condition.as_str()),
            Some("Acne Vulgaris")
        );
        assert_eq!(session.diagnosis.as_ref().unwrap().detections.len(), 2);
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].condition, "Acne Vulgaris");
        // transcript is seeded with exactly one assistant message
        let transcript = session.transcript.as_ref().expect("transcript");
        assert_eq!(transcript.messages().len(), 1);
        assert!(transcript.messages()[0].text.contains("Acne Vulgaris"));

        assert!(matches!(effects[0], Effect::SaveHistory(ref h) if h.len() == 1));
        assert!(matches!(effects[1], Effect::OpenChat(_)));
    }

    #[test]
    fn test_history_caps_at_five_evicting_the_oldest() {
        let mut session = logged_in();
        session.apply(SessionEvent::ConcernToggled {
            id: "acne".to_string(),
        });

        for i in 0..7 {
            session.apply(SessionEvent::ScanRequested);
            session.apply(SessionEvent::ImageCaptured { image: image(i) });
            session.apply(SessionEvent::AnalysisSucceeded {
                diagnosis: diagnosis(&format!("Condition {i}")),
                completed_at: at(i as i64),
            });
            session.apply(SessionEvent::ResultsDismissed);
            // concerns persist across dismissal, so the next scan is reachable
            assert!(session.can_start_scan());
        }

        assert_eq!(session.history.len(), 5);
        let conditions: Vec<&str> = session
            .history
            .iter()
            .map(|e| e.condition.as_str())
            .collect();
        assert_eq!(
            conditions,
            vec![
                "Condition 6",
                "Condition 5",
                "Condition 4",
                "Condition 3",
                "Condition 2"
            ]
        );
    }

    #[test]
    fn test_analysis_failure_returns_to_dashboard_without_partial_update() {
        let mut session = analyzing_session(&["acne"]);
        let image_before = session.captured_image.clone();

        let effects = session.apply(SessionEvent::AnalysisFailed {
            message: "Analysis failed. Check your connection and try again.".to_string(),
        });

        assert_eq!(session.screen, Screen::Dashboard);
        assert!(!session.analyzing);
        assert!(session.notice.is_some());
        assert!(session.diagnosis.is_none());
        assert_eq!(session.captured_image, image_before);
        assert!(session.history.is_empty());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_history_selection_loads_entry_and_clears_concerns() {
        let mut session = analyzing_session(&["acne"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Rosacea"),
            completed_at: at(0),
        });
        session.apply(SessionEvent::ResultsDismissed);

        session.apply(SessionEvent::ConcernToggled {
            id: "pores".to_string(),
        });
        let effects = session.apply(SessionEvent::HistorySelected { index: 0 });

        assert_eq!(session.screen, Screen::Results);
        assert!(!session.analyzing);
        assert!(session.selected_concerns.is_empty());
        assert_eq!(
            session.diagnosis.as_ref().map(|d| d.condition.as_str()),
            Some("Rosacea")
        );
        assert_eq!(session.captured_image, Some(image(1)));
        assert!(matches!(effects[0], Effect::OpenChat(_)));
    }

    #[test]
    fn test_history_selection_out_of_range_is_a_no_op() {
        let mut session = logged_in();
        let effects = session.apply(SessionEvent::HistorySelected { index: 3 });
        assert!(effects.is_empty());
        assert_eq!(session.screen, Screen::Dashboard);
    }

    #[test]
    fn test_dismiss_clears_result_but_keeps_concerns() {
        let mut session = analyzing_session(&["acne", "dryness"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne"),
            completed_at: at(0),
        });

        session.apply(SessionEvent::ResultsDismissed);

        assert_eq!(session.screen, Screen::Dashboard);
        assert!(session.captured_image.is_none());
        assert!(session.diagnosis.is_none());
        assert!(session.transcript.is_none());
        assert_eq!(session.selected_concerns.len(), 2);
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_logout_clears_session_but_keeps_history() {
        let mut session = analyzing_session(&["acne"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne"),
            completed_at: at(0),
        });

        session.apply(SessionEvent::LogoutRequested);

        assert_eq!(session.screen, Screen::Login);
        assert!(session.user.is_none());
        assert!(session.selected_concerns.is_empty());
        assert!(session.captured_image.is_none());
        assert!(session.diagnosis.is_none());
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn test_stale_analysis_completion_after_logout_is_ignored() {
        let mut session = analyzing_session(&["acne"]);
        session.apply(SessionEvent::LogoutRequested);

        let effects = session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne"),
            completed_at: at(0),
        });

        assert!(effects.is_empty());
        assert_eq!(session.screen, Screen::Login);
        assert!(session.diagnosis.is_none());
        assert!(session.history.is_empty());
    }

    #[test]
    fn test_camera_failure_shows_inline_error_and_releases_camera() {
        let mut session = logged_in();
        session.apply(SessionEvent::ConcernToggled {
            id: "acne".to_string(),
        });
        session.apply(SessionEvent::ScanRequested);

        let effects = session.apply(SessionEvent::CameraFailed {
            message: "Could not access camera".to_string(),
        });

        assert_eq!(session.screen, Screen::Scanner);
        assert!(session.camera_error.is_some());
        assert_eq!(effects, vec![Effect::StopCamera]);

        // retry-by-cancel: back to the dashboard, scan still reachable
        session.apply(SessionEvent::ScanCancelled);
        assert_eq!(session.screen, Screen::Dashboard);
        assert!(session.camera_error.is_none());
        assert!(session.can_start_scan());
    }

    #[test]
    fn test_annotation_toggle_keeps_detections() {
        let mut session = analyzing_session(&["acne"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne"),
            completed_at: at(0),
        });
        assert!(session.show_annotations);

        session.apply(SessionEvent::AnnotationsToggled);
        assert!(!session.show_annotations);
        assert_eq!(session.diagnosis.as_ref().unwrap().detections.len(), 2);

        session.apply(SessionEvent::AnnotationsToggled);
        assert!(session.show_annotations);
    }

    #[test]
    fn test_chat_submission_rejected_while_send_pending() {
        let mut session = analyzing_session(&["acne"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne"),
            completed_at: at(0),
        });

        let effects = session.apply(SessionEvent::ChatSubmitted {
            text: "What ingredient helps most?".to_string(),
        });
        assert_eq!(
            effects,
            vec![Effect::SendChat("What ingredient helps most?".to_string())]
        );

        // a second submit while the first is streaming is a no-op
        let effects = session.apply(SessionEvent::ChatSubmitted {
            text: "And how often?".to_string(),
        });
        assert!(effects.is_empty());

        session.apply(SessionEvent::ChatFragment {
            text: "Salicylic acid.".to_string(),
        });
        session.apply(SessionEvent::ChatCompleted);

        let effects = session.apply(SessionEvent::ChatSubmitted {
            text: "And how often?".to_string(),
        });
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_chat_fragments_stream_into_transcript() {
        let mut session = analyzing_session(&["acne"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne"),
            completed_at: at(0),
        });
        session.apply(SessionEvent::ChatSubmitted {
            text: "Tell me more".to_string(),
        });

        session.apply(SessionEvent::ChatFragment {
            text: "Use a gentle ".to_string(),
        });
        session.apply(SessionEvent::ChatFragment {
            text: "cleanser.".to_string(),
        });

        let transcript = session.transcript.as_ref().unwrap();
        assert_eq!(
            transcript.messages().last().unwrap().text,
            "Use a gentle cleanser."
        );

        session.apply(SessionEvent::ChatCompleted);
        assert!(!session.transcript.as_ref().unwrap().is_pending());
    }

    #[test]
    fn test_full_scan_scenario_from_empty_history() {
        // selecting {acne, redness}, capturing, receiving a Moderate
        // diagnosis with 2 detections
        let mut session = analyzing_session(&["acne", "redness"]);
        session.apply(SessionEvent::AnalysisSucceeded {
            diagnosis: diagnosis("Acne Vulgaris"),
            completed_at: at(0),
        });

        assert_eq!(session.screen, Screen::Results);
        assert!(!session.analyzing);
        let result = session.diagnosis.as_ref().unwrap();
        assert_eq!(result.severity.to_string(), "Moderate");
        assert_eq!(result.detections.len(), 2);
        assert_eq!(session.history.len(), 1);
    }
}
