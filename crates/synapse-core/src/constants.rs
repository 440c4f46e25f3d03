/// Key length (bytes) for keyed-MAC token signing.
pub const TOKEN_KEY_LEN: usize = 32;
