use super::Recognize;

const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xaa];
const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
const NO_LABEL: [u8; 11] = *b"           ";

// The extended BIOS parameter block sits at a different offset for FAT32 than for FAT12/16.
const FAT32_EBPB: Layout = Layout {
    signature: 0x42,
    label: 0x47,
    fs_type: 0x52,
};
const FAT16_EBPB: Layout = Layout {
    signature: 0x26,
    label: 0x2b,
    fs_type: 0x36,
};

struct Layout {
    signature: usize,
    label: usize,
    fs_type: usize,
}

impl Layout {
    fn fs_type<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.fs_type..self.fs_type + 8]
    }

    fn label(&self, buf: &[u8]) -> [u8; 11] {
        if buf[self.signature] != EXTENDED_BOOT_SIGNATURE {
            return NO_LABEL;
        }
        let mut label = [0; 11];
        label.copy_from_slice(&buf[self.label..self.label + 11]);
        label
    }
}

/// The boot sector of a FAT filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vfat {
    pub label: [u8; 11],
}

impl Recognize for Vfat {
    const OFFSET: u64 = 0;
    const SIZE: usize = 512;

    fn recognize(buf: &[u8]) -> Option<Self> {
        if buf[510..512] != BOOT_SIGNATURE {
            return None;
        }

        if FAT32_EBPB.fs_type(buf) == b"FAT32   " {
            Some(Self {
                label: FAT32_EBPB.label(buf),
            })
        } else if FAT16_EBPB.fs_type(buf).starts_with(b"FAT") {
            Some(Self {
                label: FAT16_EBPB.label(buf),
            })
        } else {
            None
        }
    }
}
