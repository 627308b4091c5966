//! Application-wide constants: configuration defaults, validation limits and
//! protocol parameters.
//!
//! Defaults mirror the values documented in the generated `baywake.toml`. Keep the
//! two in sync when changing either.

// # Booking windows

/// Minutes before a booking starts at which its bay is woken.
pub const DEFAULT_PRE_BOOKING_MINUTES: i64 = 15;
/// Minutes after a booking ends during which its bay stays active.
pub const DEFAULT_POST_BOOKING_MINUTES: i64 = 35;
pub const MINIMUM_BOOKING_MARGIN_MINUTES: i64 = 0;
pub const MAXIMUM_BOOKING_MARGIN_MINUTES: i64 = 240;

/// Hours of bookings fetched behind "now" (aligned to the hour).
pub const DEFAULT_LOOKBACK_HOURS: i64 = 2;
/// Hours of bookings fetched ahead of "now" (aligned to the hour).
pub const DEFAULT_LOOKAHEAD_HOURS: i64 = 6;
pub const MAXIMUM_LOOKBACK_HOURS: i64 = 24;
pub const MINIMUM_LOOKAHEAD_HOURS: i64 = 1;
pub const MAXIMUM_LOOKAHEAD_HOURS: i64 = 48;

// # Timers

pub const DEFAULT_BAY_FETCH_INTERVAL_MINUTES: u64 = 15;
pub const MINIMUM_BAY_FETCH_INTERVAL_MINUTES: u64 = 1;
pub const MAXIMUM_BAY_FETCH_INTERVAL_MINUTES: u64 = 1440;

pub const DEFAULT_BOOKING_FETCH_INTERVAL_MINUTES: u64 = 1;
pub const MINIMUM_BOOKING_FETCH_INTERVAL_MINUTES: u64 = 1;
pub const MAXIMUM_BOOKING_FETCH_INTERVAL_MINUTES: u64 = 60;

/// Upper bound on a single reconciliation actuation pass.
pub const DEFAULT_CYCLE_WATCHDOG_SECS: u64 = 45;
pub const MINIMUM_CYCLE_WATCHDOG_SECS: u64 = 5;
pub const MAXIMUM_CYCLE_WATCHDOG_SECS: u64 = 600;

pub const DEFAULT_ACTUATION_WORKERS: usize = 4;
pub const MINIMUM_ACTUATION_WORKERS: usize = 1;
pub const MAXIMUM_ACTUATION_WORKERS: usize = 32;

// # Booking API

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const MINIMUM_HTTP_TIMEOUT_SECS: u64 = 1;
pub const MAXIMUM_HTTP_TIMEOUT_SECS: u64 = 120;
pub const API_KEY_HEADER: &str = "x-api-key";

// # Wake-on-LAN

pub const DEFAULT_WOL_BROADCAST: &str = "255.255.255.255";
pub const DEFAULT_WOL_PORT: u16 = 9;
/// 6 bytes of 0xFF followed by the hardware address repeated 16 times.
pub const MAGIC_PACKET_LEN: usize = 102;

// # PJLink

pub const DEFAULT_PJLINK_PORT: u16 = 4352;
pub const DEFAULT_PJLINK_TIMEOUT_MS: u64 = 3000;
pub const MINIMUM_PJLINK_TIMEOUT_MS: u64 = 100;
pub const MAXIMUM_PJLINK_TIMEOUT_MS: u64 = 30000;
/// Banner prefix announcing a class-1 device with authentication disabled.
pub const PJLINK_UNAUTHENTICATED_BANNER: &str = "PJLINK 0";
pub const PJLINK_POWER_ON: &str = "%1POWR 1";
pub const PJLINK_POWER_OFF: &str = "%1POWR 0";
pub const PJLINK_READ_BUFFER_SIZE: usize = 512;
/// Frames longer than this without a terminator are treated as a protocol violation.
pub const PJLINK_MAX_FRAME_LEN: usize = 4096;

// # Defaults for toggles

pub const DEFAULT_RESOLVE_ADDRESSES: bool = false;
pub const DEFAULT_POWER_ON_AFTER_WAKE: bool = true;
pub const DEFAULT_REDUNDANT_WAKE: bool = false;

// # Files

pub const CONFIG_DIR_NAME: &str = "baywake";
pub const CONFIG_FILE_NAME: &str = "baywake.toml";
pub const DEFAULT_BAY_MAPPING_FILE: &str = "bays.json";
pub const LOCK_FILE_NAME: &str = "baywake.lock";
pub const SOCKET_FILE_NAME: &str = "baywake.sock";

// # IPC

pub const IPC_CLIENT_TIMEOUT_SECS: u64 = 5;
pub const IPC_POLL_INTERVAL_MS: u64 = 20;

// # Exit codes

pub const EXIT_FAILURE: i32 = 1;

#[cfg(test)]
pub mod test_constants {
    pub const TEST_API_ROOT: &str = "https://api.example-golf.test/v1";
    pub const TEST_API_KEY: &str = "test-key";
    pub const TEST_MAC_A: &str = "00:11:22:33:44:55";
    pub const TEST_MAC_B: &str = "66:77:88:99:AA:BB";
}
