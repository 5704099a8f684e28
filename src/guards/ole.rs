//! Minimal read-only OLE2 compound-file (CFB) access.
//!
//! This is deliberately not a general CFB implementation: the encryption
//! probes only need to know which streams a container holds and to read a
//! bounded prefix of one of them. Work is proportional to the FAT and
//! directory, never to the full content, and every sector access is
//! bounds-checked against the input slice.

use crate::error::{DocsieveError, Result};

/// CFB signature bytes.
const MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FREESECT: u32 = 0xFFFF_FFFF;

/// Directory entry object types.
const TYPE_STREAM: u8 = 2;
const TYPE_ROOT: u8 = 5;

/// Whether the buffer starts with the compound-file signature.
pub fn is_cfb(data: &[u8]) -> bool {
    data.len() >= MAGIC.len() && data[..MAGIC.len()] == MAGIC
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| DocsieveError::parsing("compound file truncated"))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| DocsieveError::parsing("compound file truncated"))
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    object_type: u8,
    start_sector: u32,
    size: u64,
}

/// Parsed directory view of a compound file.
#[derive(Debug)]
pub struct CompoundFile<'a> {
    data: &'a [u8],
    sector_size: usize,
    mini_cutoff: u64,
    fat: Vec<u32>,
    mini_fat: Vec<u32>,
    entries: Vec<DirEntry>,
}

impl<'a> CompoundFile<'a> {
    /// Parse the header, FAT and directory of a compound file.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if !is_cfb(data) {
            return Err(DocsieveError::parsing("not a compound file (bad signature)"));
        }
        if data.len() < 512 {
            return Err(DocsieveError::parsing("compound file header truncated"));
        }

        let major_version = read_u16(data, 26)?;
        let sector_shift = read_u16(data, 30)?;
        if !(7..=15).contains(&sector_shift) {
            return Err(DocsieveError::parsing("compound file has invalid sector shift"));
        }
        let sector_size = 1usize << sector_shift;

        let num_fat_sectors = read_u32(data, 44)? as usize;
        let first_dir_sector = read_u32(data, 48)?;
        let mini_cutoff = u64::from(read_u32(data, 56)?);
        let first_mini_fat_sector = read_u32(data, 60)?;
        let num_mini_fat_sectors = read_u32(data, 64)? as usize;
        let first_difat_sector = read_u32(data, 68)?;
        let num_difat_sectors = read_u32(data, 72)? as usize;

        // FAT sector ids: 109 header DIFAT slots, then chained DIFAT sectors.
        let mut fat_sector_ids = Vec::with_capacity(num_fat_sectors.min(4096));
        for i in 0..109 {
            let id = read_u32(data, 76 + i * 4)?;
            if id != FREESECT && id != ENDOFCHAIN {
                fat_sector_ids.push(id);
            }
        }
        let ids_per_difat = sector_size / 4 - 1;
        let mut difat_sector = first_difat_sector;
        for _ in 0..num_difat_sectors {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let base = sector_offset(difat_sector, sector_size);
            for i in 0..ids_per_difat {
                let id = read_u32(data, base + i * 4)?;
                if id != FREESECT && id != ENDOFCHAIN {
                    fat_sector_ids.push(id);
                }
            }
            difat_sector = read_u32(data, base + ids_per_difat * 4)?;
        }

        let mut fat = Vec::with_capacity(fat_sector_ids.len() * (sector_size / 4));
        for id in fat_sector_ids {
            let base = sector_offset(id, sector_size);
            for i in 0..sector_size / 4 {
                fat.push(read_u32(data, base + i * 4)?);
            }
        }

        let mut cf = Self {
            data,
            sector_size,
            mini_cutoff,
            fat,
            mini_fat: Vec::new(),
            entries: Vec::new(),
        };

        // Mini FAT lives in a regular-FAT chain.
        let mut mini_fat = Vec::with_capacity(num_mini_fat_sectors * (sector_size / 4));
        for sector in cf.chain(first_mini_fat_sector)? {
            let base = sector_offset(sector, sector_size);
            for i in 0..sector_size / 4 {
                mini_fat.push(read_u32(data, base + i * 4)?);
            }
        }
        cf.mini_fat = mini_fat;

        // Directory entries, 128 bytes each.
        let mut entries = Vec::new();
        for sector in cf.chain(first_dir_sector)? {
            let base = sector_offset(sector, sector_size);
            for i in 0..sector_size / 128 {
                let entry_base = base + i * 128;
                let name_len = read_u16(data, entry_base + 64)? as usize;
                let object_type = *data
                    .get(entry_base + 66)
                    .ok_or_else(|| DocsieveError::parsing("compound file directory truncated"))?;
                if object_type == 0 || name_len < 2 || name_len > 64 {
                    continue;
                }
                let name_bytes = data
                    .get(entry_base..entry_base + name_len - 2)
                    .ok_or_else(|| DocsieveError::parsing("compound file directory truncated"))?;
                let name: String = name_bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .map(|u| char::from_u32(u32::from(u)).unwrap_or('\u{FFFD}'))
                    .collect();
                let start_sector = read_u32(data, entry_base + 116)?;
                let mut size = u64::from(read_u32(data, entry_base + 120)?);
                if major_version != 3 {
                    size |= u64::from(read_u32(data, entry_base + 124)?) << 32;
                }
                entries.push(DirEntry {
                    name,
                    object_type,
                    start_sector,
                    size,
                });
            }
        }
        cf.entries = entries;
        Ok(cf)
    }

    /// Whether a stream with the given name exists anywhere in the directory.
    pub fn has_stream(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.object_type == TYPE_STREAM && e.name == name)
    }

    /// Read up to `max_len` bytes from the start of the named stream.
    pub fn read_stream_prefix(&self, name: &str, max_len: usize) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.object_type == TYPE_STREAM && e.name == name)
            .ok_or_else(|| DocsieveError::parsing(format!("compound file has no stream '{name}'")))?;

        let want = usize::try_from(entry.size.min(max_len as u64)).unwrap_or(max_len);
        if entry.size < self.mini_cutoff {
            self.read_mini_stream(entry.start_sector, want)
        } else {
            self.read_regular_stream(entry.start_sector, want)
        }
    }

    fn read_regular_stream(&self, start: u32, want: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(want);
        for sector in self.chain(start)? {
            if out.len() >= want {
                break;
            }
            let base = sector_offset(sector, self.sector_size);
            let take = (want - out.len()).min(self.sector_size);
            let bytes = self
                .data
                .get(base..base + take)
                .ok_or_else(|| DocsieveError::parsing("compound file stream truncated"))?;
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }

    fn read_mini_stream(&self, start: u32, want: usize) -> Result<Vec<u8>> {
        // The mini stream's backing bytes are the root entry's regular chain.
        let root = self
            .entries
            .iter()
            .find(|e| e.object_type == TYPE_ROOT)
            .ok_or_else(|| DocsieveError::parsing("compound file has no root entry"))?;
        let backing_len = usize::try_from(root.size).unwrap_or(usize::MAX);
        let backing = self.read_regular_stream(root.start_sector, backing_len)?;

        let mut out = Vec::with_capacity(want);
        let mut sector = start;
        let mut steps = 0usize;
        while sector != ENDOFCHAIN && sector != FREESECT && out.len() < want {
            if steps > self.mini_fat.len() {
                return Err(DocsieveError::parsing("compound file mini-FAT chain cycles"));
            }
            steps += 1;
            let base = sector as usize * 64;
            let take = (want - out.len()).min(64);
            let bytes = backing
                .get(base..base + take)
                .ok_or_else(|| DocsieveError::parsing("compound file mini stream truncated"))?;
            out.extend_from_slice(bytes);
            sector = *self
                .mini_fat
                .get(sector as usize)
                .ok_or_else(|| DocsieveError::parsing("compound file mini-FAT chain out of range"))?;
        }
        Ok(out)
    }

    /// Follow a FAT chain from `start`, collecting sector numbers.
    ///
    /// The chain length is capped by the FAT size, so a cyclic chain fails
    /// instead of looping.
    fn chain(&self, start: u32) -> Result<Vec<u32>> {
        let mut sectors = Vec::new();
        let mut sector = start;
        while sector != ENDOFCHAIN && sector != FREESECT {
            if sectors.len() > self.fat.len() {
                return Err(DocsieveError::parsing("compound file FAT chain cycles"));
            }
            sectors.push(sector);
            sector = *self
                .fat
                .get(sector as usize)
                .ok_or_else(|| DocsieveError::parsing("compound file FAT chain out of range"))?;
        }
        Ok(sectors)
    }
}

fn sector_offset(sector: u32, sector_size: usize) -> usize {
    (sector as usize + 1) * sector_size
}
