use rand::Rng;

pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 9;

/// A fixed-width numeric code, leading zeros included. The length is clamped to
/// [`MIN_CODE_LENGTH`]..=[`MAX_CODE_LENGTH`].
pub fn generate_delivery_code(length: usize) -> String {
    let length = length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH);
    let mut rng = rand::thread_rng();
    (0..length).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}
