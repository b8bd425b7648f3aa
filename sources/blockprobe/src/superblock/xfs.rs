use super::Recognize;

const XFS_MAGIC: &[u8; 4] = b"XFSB";

/// The primary superblock of an XFS filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xfs {
    pub fname: [u8; 12],
}

impl Recognize for Xfs {
    const OFFSET: u64 = 0;
    const SIZE: usize = 512;

    fn recognize(buf: &[u8]) -> Option<Self> {
        if &buf[0..4] != XFS_MAGIC {
            return None;
        }

        // sb_fname follows the fixed-size geometry fields.
        let mut fname = [0; 12];
        fname.copy_from_slice(&buf[108..120]);
        Some(Self { fname })
    }
}
