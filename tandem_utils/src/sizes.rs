pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;

/// Formats a byte count for log output, e.g. `256 KiB`.
pub fn format_bytes(bytes: usize) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KiB", bytes / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_units() {
        assert_eq!(format_bytes(256 * KIB), "256 KiB");
        assert_eq!(format_bytes(2 * MIB), "2 MiB");
        assert_eq!(format_bytes(1500), "1500 B");
    }
}
