//! Maps `Box<dyn Error>` from trait boundaries to typed `RigError`.
//!
//! The traits in `rpmlab_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `rpmlab_hardware::HwError`.

use crate::error::RigError;

/// Map a trait-boundary error to a typed `RigError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to the error's message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RigError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<rpmlab_hardware::error::HwError>() {
            return RigError::HardwareFault(hw.to_string());
        }
    }

    RigError::Hardware(e.to_string())
}

/// Convenience for the boxed errors returned by `rpmlab_traits::Motor`.
pub(crate) fn map_hw_error_dyn(e: &(dyn std::error::Error + Send + Sync + 'static)) -> RigError {
    map_hw_error(e)
}
