mod rupees;

pub mod helpers;
pub mod op;
mod secret;

pub use helpers::{env_or_default, parse_boolean_flag};
pub use rupees::{Rupees, RupeesConversionError, CURRENCY_CODE, CURRENCY_SYMBOL};
pub use secret::Secret;
