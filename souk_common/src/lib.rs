mod fils;

pub mod helpers;
pub mod op;
mod secret;

pub use fils::{Fils, FilsConversionError, AED_CURRENCY_CODE, AED_CURRENCY_CODE_LOWER};
pub use secret::Secret;
