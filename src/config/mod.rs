//! Configuration system for baywake.
//!
//! Settings are merged from four sources, lowest precedence first:
//!
//! 1. Built-in defaults from `common::constants`
//! 2. `baywake.toml` in the configuration directory (`$XDG_CONFIG_HOME/baywake/`,
//!    or the directory given with `--config`)
//! 3. A `.env` file in the working directory
//! 4. Process environment variables (`API_ROOT`, `API_KEY`, `PRE_BOOKING_MINUTES`,
//!    `POST_BOOKING_MINUTES`, `BAY_FETCH_INTERVAL_MINUTES`,
//!    `BOOKING_FETCH_INTERVAL_MINUTES`)
//!
//! ```toml
//! #[Booking API]
//! api_root = "https://bookings.example.com/api"
//! api_key = "..."
//!
//! #[Booking windows]
//! pre_booking_minutes = 15    # Wake bays this long before a booking starts (0-240)
//! post_booking_minutes = 35   # Keep bays on this long after a booking ends (0-240)
//!
//! #[Devices]
//! wol_broadcast = "255.255.255.255"
//! pjlink_port = 4352
//! ```
//!
//! Validation runs once every source has been applied, so a bad value coming
//! from the environment is reported the same way as one in the file.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::core::activation::BookingMargins;
use crate::core::reconcile::ReconcileSettings;
use crate::device::PjLinkOptions;

pub use builder::create_default_config;
pub use loading::{
    get_config_path, get_custom_config_dir, load, load_from_path, resolve_mapping_path,
    set_config_dir,
};
pub use watcher::start_mapping_watcher;

/// Configuration for the baywake daemon and its commands.
///
/// Every field is optional in the file; accessors fall back to the defaults in
/// `common::constants`. `api_root` and `api_key` have no default and must come
/// from the file or the environment.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub api_root: Option<String>,
    pub api_key: Option<String>,

    pub pre_booking_minutes: Option<i64>,
    pub post_booking_minutes: Option<i64>,
    pub bay_fetch_interval_minutes: Option<u64>,
    pub booking_fetch_interval_minutes: Option<u64>,
    pub lookback_hours: Option<i64>,
    pub lookahead_hours: Option<i64>,
    /// IANA name of the venue timezone, e.g. "Europe/London"
    pub timezone: Option<String>,

    /// Path of the bay mapping file, relative to the config directory unless absolute
    pub bay_mapping: Option<String>,
    pub resolve_addresses: Option<bool>,
    pub power_on_after_wake: Option<bool>,
    pub redundant_wake: Option<bool>,

    pub wol_broadcast: Option<String>,
    pub wol_port: Option<u16>,
    pub pjlink_port: Option<u16>,
    pub pjlink_timeout_ms: Option<u64>,

    pub actuation_workers: Option<usize>,
    pub cycle_watchdog_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
}

impl Config {
    pub fn api_root(&self) -> &str {
        self.api_root.as_deref().unwrap_or_default()
    }

    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    pub fn margins(&self) -> BookingMargins {
        BookingMargins::from_minutes(
            self.pre_booking_minutes
                .unwrap_or(DEFAULT_PRE_BOOKING_MINUTES),
            self.post_booking_minutes
                .unwrap_or(DEFAULT_POST_BOOKING_MINUTES),
        )
    }

    pub fn bay_fetch_interval(&self) -> Duration {
        Duration::from_secs(
            self.bay_fetch_interval_minutes
                .unwrap_or(DEFAULT_BAY_FETCH_INTERVAL_MINUTES)
                * 60,
        )
    }

    pub fn booking_fetch_interval(&self) -> Duration {
        Duration::from_secs(
            self.booking_fetch_interval_minutes
                .unwrap_or(DEFAULT_BOOKING_FETCH_INTERVAL_MINUTES)
                * 60,
        )
    }

    /// Venue timezone. `None` means the system local zone.
    ///
    /// Only meaningful after validation, which rejects unknown names.
    pub fn venue_timezone(&self) -> Option<chrono_tz::Tz> {
        self.timezone.as_deref().and_then(|name| name.parse().ok())
    }

    pub fn resolve_addresses(&self) -> bool {
        self.resolve_addresses.unwrap_or(DEFAULT_RESOLVE_ADDRESSES)
    }

    pub fn power_on_after_wake(&self) -> bool {
        self.power_on_after_wake
            .unwrap_or(DEFAULT_POWER_ON_AFTER_WAKE)
    }

    pub fn wol_broadcast(&self) -> Ipv4Addr {
        self.wol_broadcast
            .as_deref()
            .and_then(|addr| addr.parse().ok())
            .unwrap_or(Ipv4Addr::BROADCAST)
    }

    pub fn wol_port(&self) -> u16 {
        self.wol_port.unwrap_or(DEFAULT_WOL_PORT)
    }

    pub fn pjlink_options(&self) -> PjLinkOptions {
        PjLinkOptions {
            port: self.pjlink_port.unwrap_or(DEFAULT_PJLINK_PORT),
            timeout: Duration::from_millis(
                self.pjlink_timeout_ms.unwrap_or(DEFAULT_PJLINK_TIMEOUT_MS),
            ),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Settings for the reconciliation loop.
    pub fn reconcile_settings(&self, debug_enabled: bool) -> ReconcileSettings {
        ReconcileSettings {
            margins: self.margins(),
            lookback_hours: self.lookback_hours.unwrap_or(DEFAULT_LOOKBACK_HOURS),
            lookahead_hours: self.lookahead_hours.unwrap_or(DEFAULT_LOOKAHEAD_HOURS),
            timezone: self.venue_timezone(),
            workers: self
                .actuation_workers
                .unwrap_or(DEFAULT_ACTUATION_WORKERS),
            watchdog: Duration::from_secs(
                self.cycle_watchdog_secs
                    .unwrap_or(DEFAULT_CYCLE_WATCHDOG_SECS),
            ),
            redundant_wake: self.redundant_wake.unwrap_or(DEFAULT_REDUNDANT_WAKE),
            debug_enabled,
        }
    }

    /// Location of the bay mapping file.
    pub fn mapping_path(&self) -> anyhow::Result<PathBuf> {
        resolve_mapping_path(self.bay_mapping.as_deref())
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Booking API: {}", self.api_root());
        if let Ok(path) = self.mapping_path() {
            log_indented!("Bay mapping: {}", private_path(&path));
        }

        let margins = self.margins();
        log_indented!(
            "Booking margins: {} min before, {} min after",
            margins.pre.num_minutes(),
            margins.post.num_minutes()
        );
        log_indented!(
            "Fetch intervals: bays every {} min, bookings every {} min",
            self.bay_fetch_interval().as_secs() / 60,
            self.booking_fetch_interval().as_secs() / 60
        );
        log_indented!(
            "Timezone: {}",
            self.timezone.as_deref().unwrap_or("system local")
        );
        log_indented!(
            "Wake-on-LAN: {}:{}",
            self.wol_broadcast(),
            self.wol_port()
        );

        let pjlink = self.pjlink_options();
        log_indented!(
            "PJLink: port {}, {} ms timeout{}",
            pjlink.port,
            pjlink.timeout.as_millis(),
            if self.power_on_after_wake() {
                ", power on after wake"
            } else {
                ""
            }
        );

        if self.resolve_addresses() {
            log_indented!("Address resolution: neighbor table");
        }
        if self.redundant_wake.unwrap_or(DEFAULT_REDUNDANT_WAKE) {
            log_indented!("Redundant wake: on");
        }
    }
}
