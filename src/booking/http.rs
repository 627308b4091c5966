//! Booking API client over HTTP.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{BookingSource, RawBooking, RemoteBay};
use crate::common::constants::API_KEY_HEADER;
use crate::error::{Error, Result};

/// Blocking client for the booking API.
pub struct HttpBookingSource {
    client: Client,
    api_root: String,
    api_key: String,
}

impl HttpBookingSource {
    pub fn new(api_root: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("baywake/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Connection(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.api_root);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .map_err(|e| classify_transport_error(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Connection(format!("GET {path} returned {status}")));
        }

        let body = response
            .text()
            .map_err(|e| classify_transport_error(path, e))?;

        serde_json::from_str(&body)
            .map_err(|e| Error::Protocol(format!("GET {path} returned an unexpected body: {e}")))
    }
}

fn classify_transport_error(path: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("GET {path}: {err}"))
    } else {
        Error::Connection(format!("GET {path}: {err}"))
    }
}

impl BookingSource for HttpBookingSource {
    fn list_bays(&self) -> Result<Vec<RemoteBay>> {
        self.get("/bays", &[])
    }

    fn list_bookings(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<RawBooking>> {
        self.get(
            "/bookings/public-admin",
            &[
                ("start_gte", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("start_lte", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ],
        )
    }
}
