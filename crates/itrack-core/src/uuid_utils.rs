//! UUIDv7 helpers.
//!
//! Every row id is a UUIDv7, so ids sort by creation time. Several ordering
//! rules (lowest remaining stage id, newest applications first) rely on that.

use uuid::Uuid;

/// Generate a new time-ordered identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_has_version_7() {
        assert_eq!(new_v7().get_version_num(), 7);
    }

    #[test]
    fn test_new_v7_sorts_by_creation() {
        let first = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = new_v7();
        assert!(first < second);
    }
}
