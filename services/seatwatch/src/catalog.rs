//! Course catalog client for the class availability endpoint

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::io::HttpClient;
use crate::monitor::{MonitorTarget, SeatSource, SEATS_UNKNOWN};

/// Client for `GET {base}/Terms/{term}/Classes/{class}`
pub struct CourseCatalogClient {
    base_url: String,
    seats_field: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for CourseCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseCatalogClient")
            .field("base_url", &self.base_url)
            .field("seats_field", &self.seats_field)
            .finish()
    }
}

impl CourseCatalogClient {
    pub fn new(base_url: &str, seats_field: &str, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created CourseCatalogClient at {}", base_url);

        Self {
            base_url,
            seats_field: seats_field.to_string(),
            http,
        }
    }

    pub fn class_url(&self, target: &MonitorTarget) -> String {
        format!(
            "{}/Terms/{}/Classes/{}",
            self.base_url, target.term, target.course_id
        )
    }
}

#[async_trait]
impl SeatSource for CourseCatalogClient {
    async fn query_seats(&self, target: &MonitorTarget, bearer_token: &str) -> crate::Result<i32> {
        let url = self.class_url(target);
        let authorization = format!("Bearer {}", bearer_token);

        let response = self.http.get(&url, &authorization).await?;
        if response.status != 200 {
            return Err(crate::SeatWatchError::Fetch(format!(
                "Class {} returned status {}",
                target, response.status
            )));
        }

        let seats = parse_open_seats(&response.body, &self.seats_field);
        if seats == SEATS_UNKNOWN {
            tracing::debug!(
                "Class {} response has no usable '{}' field ({} bytes)",
                target,
                self.seats_field,
                response.body.len()
            );
        } else {
            tracing::debug!("Class {}: {} open seats", target, seats);
        }
        Ok(seats)
    }
}

/// Extract the open seat count from a class response body
///
/// The field is looked up at any depth and may be a number or a numeric
/// string. Anything else, including a body that is not JSON, yields
/// [`SEATS_UNKNOWN`].
pub fn parse_open_seats(body: &str, seats_field: &str) -> i32 {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return SEATS_UNKNOWN;
    };

    let seats = match find_field(&value, seats_field) {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    };

    match seats {
        Some(n) if n >= 0 => n,
        _ => SEATS_UNKNOWN,
    }
}

fn find_field<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(field)
            .or_else(|| map.values().find_map(|v| find_field(v, field))),
        Value::Array(items) => items.iter().find_map(|v| find_field(v, field)),
        _ => None,
    }
}
