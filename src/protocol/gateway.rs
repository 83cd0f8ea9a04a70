// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Single-slot command hand-off between the operator thread and the control loop.
//!
//! The channel holds one [`Directive`]. The gateway validates before sending, so the control loop
//! never sees an out-of-range parameter. The control loop polls the slot once per tick and never
//! blocks on it.

use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, SendTimeoutError, Sender, TryRecvError};
use log::debug;

use crate::error::GatewayError;
use crate::protocol::messages::{Command, Directive, ParamLimits};

/// How long a submission waits for the previous command to be consumed.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_millis(250);

/// Create a connected gateway / slot pair.
pub fn command_channel(limits: ParamLimits) -> (CommandGateway, CommandSlot) {
    let (tx, rx) = bounded(1);
    (
        CommandGateway {
            tx,
            limits,
            timeout: DEFAULT_SUBMIT_TIMEOUT,
        },
        CommandSlot { rx },
    )
}

/// Operator side of the hand-off.
pub struct CommandGateway {
    tx: Sender<Directive>,
    limits: ParamLimits,
    timeout: Duration,
}

impl CommandGateway {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate a command and hand it to the control loop.
    pub fn submit(&self, command: Command) -> Result<(), GatewayError> {
        let directive = command.validate(&self.limits)?;
        debug!("submitting {:?}", directive);
        self.tx
            .send_timeout(directive, self.timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => GatewayError::Busy,
                SendTimeoutError::Disconnected(_) => GatewayError::Disconnected,
            })
    }

    pub fn limits(&self) -> &ParamLimits {
        &self.limits
    }
}

/// Control loop side of the hand-off.
pub struct CommandSlot {
    rx: Receiver<Directive>,
}

impl CommandSlot {
    /// Take the pending directive, if any. Never blocks.
    pub fn take(&self) -> Option<Directive> {
        match self.rx.try_recv() {
            Ok(directive) => Some(directive),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn validated_command_reaches_slot() {
        let (gateway, slot) = command_channel(ParamLimits::default());
        assert_eq!(slot.take(), None);
        gateway.submit(Command::SetForce(50.0)).unwrap();
        assert_eq!(slot.take(), Some(Directive::SetForce(50.0)));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn invalid_command_never_reaches_slot() {
        let (gateway, slot) = command_channel(ParamLimits::default());
        assert_eq!(
            gateway.submit(Command::SetCycles(0)),
            Err(GatewayError::Rejected(ConfigError::InvalidCycles(0)))
        );
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn full_slot_reports_busy() {
        let (gateway, slot) = command_channel(ParamLimits::default());
        let gateway = gateway.with_timeout(Duration::from_millis(5));
        gateway.submit(Command::Start).unwrap();
        assert_eq!(gateway.submit(Command::Stop), Err(GatewayError::Busy));
        assert_eq!(slot.take(), Some(Directive::Start));
        gateway.submit(Command::Stop).unwrap();
    }

    #[test]
    fn closed_loop_reports_disconnected() {
        let (gateway, slot) = command_channel(ParamLimits::default());
        drop(slot);
        assert_eq!(gateway.submit(Command::Quit), Err(GatewayError::Disconnected));
    }
}
