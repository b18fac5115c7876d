mod clock;
mod delivery_code;

pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery_code::{generate_delivery_code, MAX_CODE_LENGTH, MIN_CODE_LENGTH};
