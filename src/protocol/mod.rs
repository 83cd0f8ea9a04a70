// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

pub mod gateway;
pub mod messages;
pub mod parser;

pub use gateway::{command_channel, CommandGateway, CommandSlot};
pub use messages::{Command, Directive, ParamLimits};
pub use parser::Parser;
