//! Classification of collaborator errors.
//!
//! Drivers hand back `Box<dyn Error + Send + Sync>`. A bad clutch index is a
//! wiring/config mistake; anything the driver itself reports as broken is a
//! fault; the rest is an ordinary hardware error.

use crate::error::SwitchError;

/// Classify a collaborator error.
///
/// With `hardware-errors`, `switcher_hardware::HwError` is matched by
/// variant. Other errors are classified from their message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SwitchError {
    #[cfg(feature = "hardware-errors")]
    {
        use switcher_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::InvalidIndex { .. } => SwitchError::Config(hw.to_string()),
                HwError::Io(_) => SwitchError::Hardware(hw.to_string()),
                other => SwitchError::HardwareFault(other.to_string()),
            };
        }
    }

    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("out of range") || lower.contains("invalid index") {
        SwitchError::Config(msg)
    } else if lower.contains("disabled") {
        SwitchError::HardwareFault(msg)
    } else {
        SwitchError::Hardware(msg)
    }
}
