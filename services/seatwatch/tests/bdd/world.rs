//! BDD test world for seatwatch service

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use cucumber::World;
use seatwatch::alert::{Alert, AlertSink};
use seatwatch::auth::CredentialManager;
use seatwatch::credential::CredentialReader;
use seatwatch::io::{HttpClient, HttpResponse};
use seatwatch::monitor::{MonitorTarget, SeatSnapshot};
use seatwatch::poller::Poller;
use seatwatch::state::StateHandle;
use seatwatch::{Config, SeatWatchError};

/// A request seen by [`ScriptedHttp`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub authorization: String,
    pub params: Vec<(String, String)>,
}

/// HTTP client answering token and class requests from scripted queues
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    pub token_responses: Mutex<VecDeque<HttpResponse>>,
    pub token_requests: Mutex<Vec<RecordedRequest>>,
    pub class_responses: Mutex<HashMap<u32, VecDeque<Result<HttpResponse, String>>>>,
    pub class_requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedHttp {
    pub fn push_token_response(&self, response: HttpResponse) {
        self.token_responses.lock().unwrap().push_back(response);
    }

    pub fn push_class_response(&self, course_id: u32, response: Result<HttpResponse, String>) {
        self.class_responses
            .lock()
            .unwrap()
            .entry(course_id)
            .or_default()
            .push_back(response);
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, url: &str, authorization: &str) -> seatwatch::Result<HttpResponse> {
        self.class_requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            authorization: authorization.to_string(),
            params: Vec::new(),
        });

        let course_id: u32 = url
            .rsplit('/')
            .next()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| SeatWatchError::Http(format!("unexpected class url {}", url)))?;

        let next = self
            .class_responses
            .lock()
            .unwrap()
            .get_mut(&course_id)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(SeatWatchError::Http(message)),
            None => Ok(HttpResponse {
                status: 200,
                body: r#"{"AvailableSeats": 0}"#.to_string(),
            }),
        }
    }

    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        params: &[(&str, &str)],
    ) -> seatwatch::Result<HttpResponse> {
        self.token_requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            authorization: authorization.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        self.token_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SeatWatchError::Http("no scripted token response".to_string()))
    }
}

/// Sink collecting delivered alerts
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<Alert>>,
}

#[async_trait::async_trait]
impl AlertSink for RecordingSink {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn alert(&self, alert: &Alert) -> seatwatch::Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

#[derive(Debug, Default, World)]
pub struct SeatWatchWorld {
    pub http: Arc<ScriptedHttp>,

    // Credential lifecycle
    pub manager: Option<CredentialManager>,
    pub reader: Option<CredentialReader>,
    pub issue_result: Option<seatwatch::Result<()>>,
    pub refresh_result: Option<seatwatch::Result<()>>,

    // Polling and alerts
    pub targets: Vec<MonitorTarget>,
    pub poller: Option<Poller>,
    pub state: Option<StateHandle>,
    pub sink: Arc<RecordingSink>,
    pub last_snapshots: Vec<SeatSnapshot>,

    // Configuration and service startup
    pub config: Option<Config>,
    pub validation: Option<seatwatch::Result<()>>,
    pub run_result: Option<seatwatch::Result<()>>,
}
