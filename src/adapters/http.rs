use crate::domain::model::{Receiver, Source};
use crate::domain::ports::{EventLookup, TravelTimeLookup};
use crate::utils::error::{Result, SeismoError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

fn client(timeout_seconds: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

/// 事件資料服務：`GET <endpoint>?id=<event id>`
pub struct HttpEventClient {
    client: Client,
    endpoint: String,
}

impl HttpEventClient {
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: client(timeout_seconds)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EventLookup for HttpEventClient {
    async fn event(&self, event_id: &str) -> Result<Option<serde_json::Value>> {
        tracing::debug!("Requesting event '{}' from {}", event_id, self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id", event_id)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(SeismoError::upstream(format!(
                "Event service answered {} for '{}'",
                status, event_id
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TravelTimeResponse {
    travel_times: HashMap<String, Option<f64>>,
}

/// Travel time service queried with the source/receiver geometry and a
/// phase list; phases missing from the answer do not exist there.
pub struct HttpTravelTimeClient {
    client: Client,
    endpoint: String,
}

impl HttpTravelTimeClient {
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: client(timeout_seconds)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TravelTimeLookup for HttpTravelTimeClient {
    async fn travel_time(
        &self,
        source: &Source,
        receiver: &Receiver,
        phase: &str,
    ) -> Result<Option<f64>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("sourcelatitude", source.latitude.to_string()),
                ("sourcelongitude", source.longitude.to_string()),
                ("sourcedepthinmeters", source.depth_in_m.to_string()),
                ("receiverlatitude", receiver.latitude.to_string()),
                ("receiverlongitude", receiver.longitude.to_string()),
                ("receiverdepthinmeters", receiver.depth_in_m.to_string()),
                ("phases", phase.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(SeismoError::not_found(format!("Invalid phase name: {}", phase)));
        }
        if !status.is_success() {
            return Err(SeismoError::upstream(format!(
                "Travel time service answered {} for phase '{}'",
                status, phase
            )));
        }

        let body: TravelTimeResponse = response.json().await.map_err(|e| {
            SeismoError::upstream(format!("Travel time service returned an invalid result: {}", e))
        })?;
        let travel_time = body.travel_times.get(phase).copied().flatten();
        tracing::debug!(
            "Travel time of {} to {}: {:?}",
            phase,
            receiver.seed_id(),
            travel_time
        );
        Ok(travel_time)
    }
}
