use super::Recognize;

const SECTOR_SIZE: usize = 2048;
const PRIMARY_VOLUME_DESCRIPTOR: u8 = 1;
const STANDARD_IDENTIFIER: &[u8; 5] = b"CD001";

/// The primary volume descriptor of an ISO9660 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso9660 {
    pub volume_id: [u8; 32],
}

impl Recognize for Iso9660 {
    // The system area takes the first 16 sectors; the primary volume descriptor comes next.
    const OFFSET: u64 = 16 * SECTOR_SIZE as u64;
    const SIZE: usize = SECTOR_SIZE;

    fn recognize(buf: &[u8]) -> Option<Self> {
        if buf[0] != PRIMARY_VOLUME_DESCRIPTOR || &buf[1..6] != STANDARD_IDENTIFIER || buf[6] != 1
        {
            return None;
        }

        let mut volume_id = [0; 32];
        volume_id.copy_from_slice(&buf[40..72]);
        Some(Self { volume_id })
    }
}
