//! Process exit statuses from BSD `sysexits.h`.
//!
//! `libc` only exports these on the BSDs and macOS, so they live here.

pub const EX_OK: i32 = 0;
pub const EX_USAGE: i32 = 64;
pub const EX_DATAERR: i32 = 65;
pub const EX_UNAVAILABLE: i32 = 69;
pub const EX_SOFTWARE: i32 = 70;
pub const EX_IOERR: i32 = 74;
pub const EX_CONFIG: i32 = 78;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_match_sysexits_h() {
        assert_eq!(
            [EX_OK, EX_USAGE, EX_DATAERR, EX_UNAVAILABLE, EX_SOFTWARE, EX_IOERR, EX_CONFIG],
            [0, 64, 65, 69, 70, 74, 78]
        );
    }
}
