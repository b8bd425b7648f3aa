use super::Recognize;

const EXT_MAGIC: u16 = 0xef53;

const COMPAT_HAS_JOURNAL: u32 = 0x0004;
const COMPAT_DIR_INDEX: u32 = 0x0020;

const RO_COMPAT_HUGE_FILE: u32 = 0x0008;
const RO_COMPAT_GDT_CSUM: u32 = 0x0010;
const RO_COMPAT_DIR_NLINK: u32 = 0x0020;
const RO_COMPAT_EXTRA_ISIZE: u32 = 0x0040;
const RO_COMPAT_BIGALLOC: u32 = 0x0200;

const INCOMPAT_META_BG: u32 = 0x0010;
const INCOMPAT_EXTENTS: u32 = 0x0040;
const INCOMPAT_64BIT: u32 = 0x0080;
const INCOMPAT_MMP: u32 = 0x0100;
const INCOMPAT_FLEX_BG: u32 = 0x0200;

// Features introduced by ext4 and ext3 respectively.
const EXT4_RO_COMPAT: u32 = RO_COMPAT_HUGE_FILE
    | RO_COMPAT_GDT_CSUM
    | RO_COMPAT_DIR_NLINK
    | RO_COMPAT_EXTRA_ISIZE
    | RO_COMPAT_BIGALLOC;
const EXT4_INCOMPAT: u32 =
    INCOMPAT_META_BG | INCOMPAT_EXTENTS | INCOMPAT_64BIT | INCOMPAT_MMP | INCOMPAT_FLEX_BG;
const EXT3_COMPAT: u32 = COMPAT_HAS_JOURNAL | COMPAT_DIR_INDEX;

/// The superblock of an ext2/3/4 filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ext {
    pub volume_name: [u8; 16],
    pub feature_compat: u32,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,
}

/// Which generation of ext the feature flags describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtType {
    Ext2,
    Ext3,
    Ext4,
}

impl ExtType {
    pub fn name(self) -> &'static str {
        match self {
            ExtType::Ext2 => "ext2",
            ExtType::Ext3 => "ext3",
            ExtType::Ext4 => "ext4",
        }
    }
}

impl Ext {
    pub fn ext_type(&self) -> ExtType {
        if self.feature_ro_compat & EXT4_RO_COMPAT != 0
            || self.feature_incompat & EXT4_INCOMPAT != 0
        {
            ExtType::Ext4
        } else if self.feature_compat & EXT3_COMPAT != 0 {
            ExtType::Ext3
        } else {
            ExtType::Ext2
        }
    }
}

fn le_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

impl Recognize for Ext {
    const OFFSET: u64 = 0x400;
    const SIZE: usize = 0x400;

    fn recognize(buf: &[u8]) -> Option<Self> {
        if u16::from_le_bytes([buf[0x38], buf[0x39]]) != EXT_MAGIC {
            return None;
        }

        let mut volume_name = [0; 16];
        volume_name.copy_from_slice(&buf[0x78..0x88]);
        Some(Self {
            volume_name,
            feature_compat: le_u32(buf, 0x5c),
            feature_incompat: le_u32(buf, 0x60),
            feature_ro_compat: le_u32(buf, 0x64),
        })
    }
}
