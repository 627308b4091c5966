//! Device control: Wake-on-LAN, PJLink and neighbor-table lookups.
//!
//! The reconciliation loop never talks to these directly. It hands each
//! transitioning bay to a [`BayActuator`], which lets tests swap the network
//! for a recorder.

pub mod arp;
pub mod pjlink;
pub mod wol;

use std::fmt;

use crate::bays::Bay;
use crate::error::Result;

pub use arp::{ArpCommand, NeighborTable};
pub use pjlink::{PjLinkClient, PjLinkOptions};
pub use wol::WakeOnLan;

/// What a transition asks of a bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// false → true
    Wake,
    /// Steady active bay, wake packet only
    Rewake,
    /// true → false
    Sleep,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Wake => write!(f, "wake"),
            Action::Rewake => write!(f, "re-wake"),
            Action::Sleep => write!(f, "sleep"),
        }
    }
}

/// What actually went out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    WakeSent,
    /// Wake packet sent and the projector acknowledged power on
    WakeSentPoweredOn(String),
    PoweredOff(String),
    /// No network address known; the bay sleeps on its own timer
    PassiveSleep,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::WakeSent => write!(f, "wake packet sent"),
            Outcome::WakeSentPoweredOn(reply) => {
                write!(f, "wake packet sent, projector replied {reply}")
            }
            Outcome::PoweredOff(reply) => write!(f, "projector replied {reply}"),
            Outcome::PassiveSleep => write!(f, "no network address, left to sleep on its own"),
        }
    }
}

/// Carries out one action against one bay.
pub trait BayActuator: Send + Sync {
    fn actuate(&self, bay: &Bay, action: Action) -> Result<Outcome>;
}

/// The real actuator: Wake-on-LAN plus optional PJLink power control.
#[derive(Debug, Clone, Copy)]
pub struct NetworkActuator {
    wol: WakeOnLan,
    pjlink: PjLinkClient,
    power_on_after_wake: bool,
}

impl NetworkActuator {
    pub fn new(wol: WakeOnLan, pjlink: PjLinkClient, power_on_after_wake: bool) -> Self {
        Self {
            wol,
            pjlink,
            power_on_after_wake,
        }
    }
}

impl BayActuator for NetworkActuator {
    fn actuate(&self, bay: &Bay, action: Action) -> Result<Outcome> {
        match action {
            Action::Rewake => {
                self.wol.wake(&bay.hardware_address)?;
                Ok(Outcome::WakeSent)
            }
            Action::Wake => {
                let wake = self.wol.wake(&bay.hardware_address);

                // Try the projector even when the wake packet failed; report the first error
                let power_on = match bay.network_address {
                    Some(ip) if self.power_on_after_wake => Some(self.pjlink.power_on(ip)),
                    _ => None,
                };

                wake?;
                match power_on {
                    Some(reply) => Ok(Outcome::WakeSentPoweredOn(reply?)),
                    None => Ok(Outcome::WakeSent),
                }
            }
            Action::Sleep => match bay.network_address {
                Some(ip) => Ok(Outcome::PoweredOff(self.pjlink.power_off(ip)?)),
                None => Ok(Outcome::PassiveSleep),
            },
        }
    }
}
