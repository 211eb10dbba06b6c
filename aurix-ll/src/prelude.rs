//! Traits an application is expected to have in scope

pub use crate::core::Dependencies as _;
pub use embedded_can::Frame as _;
pub use embedded_hal::digital::v2::InputPin as _;
pub use embedded_hal::digital::v2::OutputPin as _;
pub use embedded_hal::digital::v2::StatefulOutputPin as _;
pub use embedded_hal::digital::v2::ToggleableOutputPin as _;
