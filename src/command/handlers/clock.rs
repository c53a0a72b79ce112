//! Clock command handler

use super::{forward, HandlerContext};
use crate::command::CommandResult;
use chrono::{Datelike, Local, Timelike};
use eq3_shared::{ValveCommand, ValveRequest};
use tracing::info;

/// Handle SETTIME
///
/// Without an explicit timestamp the valve is set to the bridge's local time.
pub async fn handle_settime(ctx: &HandlerContext<'_>, request: &ValveRequest) -> CommandResult {
    let timestamp = match request.command {
        ValveCommand::SetTime(Some(ts)) => ts,
        ValveCommand::SetTime(None) => clock_bytes(&Local::now()),
        _ => {
            return CommandResult::Rejected {
                message: "Not a settime request".into(),
            };
        }
    };

    let resolved = ValveRequest {
        address: request.address,
        command: ValveCommand::SetTime(Some(timestamp)),
    };
    info!("  [SETTIME] {}", resolved);

    forward(ctx, &resolved).await
}

/// `[YY, MM, DD, hh, mm, ss]` as sent to the valve
fn clock_bytes<T: Datelike + Timelike>(t: &T) -> [u8; 6] {
    [
        (t.year().rem_euclid(100)) as u8,
        t.month() as u8,
        t.day() as u8,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_clock_bytes() {
        let t = NaiveDate::from_ymd_opt(2024, 10, 27)
            .and_then(|d| d.and_hms_opt(12, 45, 3))
            .expect("valid date");
        assert_eq!(clock_bytes(&t), [24, 10, 27, 12, 45, 3]);
    }
}
