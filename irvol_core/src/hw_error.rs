//! Maps `Box<dyn Error>` from the transmitter boundary to typed `IrError`.
//!
//! `irvol_traits::Transmitter` returns `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `irvol_hardware::HwError` downcasting.

use crate::error::IrError;

/// Map a trait-boundary error to a typed `IrError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> IrError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<irvol_hardware::error::HwError>() {
            return match hw {
                irvol_hardware::error::HwError::Timeout => IrError::Timeout,
                other => IrError::Transmit(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        IrError::Timeout
    } else {
        IrError::Transmit(s)
    }
}
