/*!
Filesystem recognition.

Each supported filesystem kind knows where its superblock lives and how to check it. The kinds
are tried in a fixed order and the first one whose signature matches wins.
*/

mod ext;
mod iso9660;
mod vfat;
mod xfs;

pub use ext::{Ext, ExtType};
pub use iso9660::Iso9660;
pub use vfat::Vfat;
pub use xfs::Xfs;

use std::io::{self, Read, Seek, SeekFrom};

/// A filesystem superblock format.
trait Recognize: Sized {
    /// Byte offset of the superblock from the start of the device.
    const OFFSET: u64;
    /// Number of bytes to read at `OFFSET`.
    const SIZE: usize;
    /// Returns the parsed superblock if `buf` carries this format's signature.
    fn recognize(buf: &[u8]) -> Option<Self>;
}

/// A recognized filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Superblock {
    Iso9660(Iso9660),
    Vfat(Vfat),
    Xfs(Xfs),
    Ext(Ext),
}

impl Superblock {
    /// Name of the filesystem type, as `mount -t` would take it.
    pub fn kind(&self) -> &'static str {
        match self {
            Superblock::Iso9660(_) => "iso9660",
            Superblock::Vfat(_) => "vfat",
            Superblock::Xfs(_) => "xfs",
            Superblock::Ext(sb) => sb.ext_type().name(),
        }
    }

    /// The raw label field, including any padding.
    pub fn label_bytes(&self) -> &[u8] {
        match self {
            Superblock::Iso9660(sb) => &sb.volume_id,
            Superblock::Vfat(sb) => &sb.label,
            Superblock::Xfs(sb) => &sb.fname,
            Superblock::Ext(sb) => &sb.volume_name,
        }
    }

    /// The label with padding removed.
    pub fn label(&self) -> String {
        String::from_utf8_lossy(trim_label(self.label_bytes())).into_owned()
    }

    /// Returns true if the trimmed label is exactly `label`.
    pub fn label_matches(&self, label: &str) -> bool {
        trim_label(self.label_bytes()) == label.as_bytes()
    }
}

/// Strips the spaces and NUL bytes that pad fixed-size label fields.
pub fn trim_label(raw: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| *b == b' ' || *b == 0;
    let start = raw.iter().position(|b| !is_pad(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

/// Looks for a known filesystem on `reader`.
///
/// A device too short to hold a given superblock just doesn't have that filesystem; other I/O
/// errors are returned.
pub fn probe<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Superblock>> {
    if let Some(sb) = recognize::<Iso9660, _>(reader)? {
        Ok(Some(Superblock::Iso9660(sb)))
    } else if let Some(sb) = recognize::<Vfat, _>(reader)? {
        Ok(Some(Superblock::Vfat(sb)))
    } else if let Some(sb) = recognize::<Xfs, _>(reader)? {
        Ok(Some(Superblock::Xfs(sb)))
    } else if let Some(sb) = recognize::<Ext, _>(reader)? {
        Ok(Some(Superblock::Ext(sb)))
    } else {
        Ok(None)
    }
}

fn recognize<T: Recognize, R: Read + Seek>(reader: &mut R) -> io::Result<Option<T>> {
    reader.seek(SeekFrom::Start(T::OFFSET))?;
    let mut buf = vec![0; T::SIZE];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(T::recognize(&buf)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}
