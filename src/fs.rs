use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::allocator::{allocate, deallocate};
use crate::bitmap::FreeSpaceIndex;
use crate::compact;
use crate::config::*;
use crate::file::{transfer, Transfer};
use crate::names::FilenameList;
use crate::path::{normalize, parent, split_stream, strip_dir};
use crate::region::{self, Region};
use crate::structs::*;
use crate::table::Table;
use crate::{BlockDevice, Error, Result};

/// Position of a file in the filename list, table and FileInfo array.
/// Indices above a deleted file shift down by one.
pub type FileIndex = usize;

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    geometry: Geometry,
    table: Table,
    names: FilenameList,
    infos: Vec<FileInfo>,
    free_index: FreeSpaceIndex,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Writes an empty table region, then seeds the root directory and the volume label
    /// entry and commits them.
    pub fn format(device: Arc<D>, sector_size: u64) -> Result<Self> {
        region::format_region(&*device, sector_size)?;
        let mut fs_inst = Self::mount(device)?;
        fs_inst.create(ROOT_NAME, Attributes::DIRECTORY)?;
        fs_inst.create(VOLUME_LABEL_NAME, Attributes::ARCHIVE)?;
        fs_inst.commit()?;
        Ok(fs_inst)
    }

    pub fn mount(device: Arc<D>) -> Result<Self> {
        let Region { geometry, table, names, infos } = region::read_region(&*device)?;
        // A full scan up front rejects cross-linked tables.
        let free_index = FreeSpaceIndex::scan(table.as_str(), &geometry)?;
        log::debug!(
            "mounted: {} files, {} of {} bytes free",
            names.len(),
            free_index.free_space(),
            geometry.data_blocks() * geometry.sector_size
        );
        Ok(Self {
            device,
            geometry,
            table,
            names,
            infos,
            free_index,
        })
    }

    /// Persists the table, filename list and FileInfo array. Nothing is written before this.
    pub fn commit(&mut self) -> Result<()> {
        region::write_region(
            &*self.device,
            &mut self.geometry,
            &self.table,
            &self.names,
            &self.infos,
            &mut self.free_index,
        )?;
        log::debug!("committed {} files", self.names.len());
        Ok(())
    }

    // Following methods operate on the in-memory state; callers serialise access.

    pub fn lookup(&self, name: &str) -> Result<FileIndex> {
        self.names.find(&normalize(name)).ok_or(Error::NotFound)
    }

    /// Byte position of a file's entry in the table text.
    pub fn table_index(&self, name: &str) -> Result<usize> {
        let span = self.table.entry_span(self.lookup(name)?)?;
        Ok(span.start)
    }

    /// Creates an empty file. Owner ids come from the parent directory, or from the base
    /// file for a named stream.
    pub fn create(&mut self, name: &str, attributes: Attributes) -> Result<FileIndex> {
        let name = normalize(name);
        if self.names.find(&name).is_some() {
            return Err(Error::NameCollision);
        }
        let mut info = FileInfo::new(now(), attributes);
        let owner = match split_stream(&name) {
            (base, Some(_)) => base,
            (_, None) => parent(&name),
        };
        if owner != name {
            if let Some(owner) = self.names.find(owner) {
                info.gid = self.infos[owner].gid;
                info.uid = self.infos[owner].uid;
            }
        }

        let index = self.names.push(&name)?;
        self.table.push_entry();
        self.infos.push(info);
        log::trace!("created {} at {}", name, index);
        Ok(index)
    }

    /// Removes a file's entry, name and record, together with its named streams
    /// (`name:stream`). Their blocks are free from the next scan.
    pub fn delete(&mut self, index: FileIndex) -> Result<()> {
        let name = self.name(index)?;
        if name == ROOT_NAME || name == VOLUME_LABEL_NAME {
            return Err(Error::InvalidFileName);
        }
        let mut doomed: Vec<FileIndex> = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, other)| match split_stream(other) {
                (base, Some(_)) => base.eq_ignore_ascii_case(&name),
                (_, None) => false,
            })
            .map(|(i, _)| i)
            .collect();
        doomed.push(index);
        doomed.sort_unstable();

        // Highest first, so the remaining indices stay valid.
        for &i in doomed.iter().rev() {
            self.table.remove_entry(i)?;
            self.names.remove(i)?;
            self.infos.remove(i);
        }
        self.free_index.invalidate();
        log::trace!("deleted {} with {} streams", name, doomed.len() - 1);
        Ok(())
    }

    /// Renames a file together with everything stored under it (`old/...`, `old:stream`).
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (normalize(old), normalize(new));
        let old_index = self.lookup(&old)?;
        if old == ROOT_NAME || old == VOLUME_LABEL_NAME {
            return Err(Error::InvalidFileName);
        }

        let mut renamed = self.names.clone();
        for (i, name) in self.names.iter().enumerate() {
            let Some(rest) = strip_dir(&name, &old) else {
                continue;
            };
            let target = format!("{}{}", new, rest);
            match self.names.find(&target) {
                Some(other) if other != i && other != old_index => return Err(Error::NameCollision),
                _ => renamed.set(i, &target)?,
            }
        }
        self.names = renamed;
        Ok(())
    }

    pub fn file_size(&self, index: FileIndex) -> Result<u64> {
        let sector_size = self.geometry.sector_size;
        let extents = self.table.extents(index)?;
        Ok(extents.iter().map(|e| e.len(sector_size)).sum())
    }

    /// Appends `size` bytes of extents to a file, all or nothing.
    pub fn allocate(&mut self, index: FileIndex, size: u64) -> Result<()> {
        allocate(&mut self.table, &mut self.free_index, &self.geometry, index, size)
    }

    /// Releases `size` bytes from the tail of a file.
    pub fn deallocate(&mut self, index: FileIndex, size: u64) -> Result<()> {
        deallocate(&mut self.table, &mut self.free_index, &self.geometry, index, size)
    }

    /// Grows or shrinks a file. On failure the table is left as it was.
    pub fn truncate(&mut self, index: FileIndex, new_size: u64) -> Result<()> {
        let old_size = self.file_size(index)?;
        if new_size == old_size {
            return Ok(());
        }
        let snapshot = self.table.clone();
        let result = self.resize(index, old_size, new_size);
        if result.is_err() {
            self.table = snapshot;
            self.free_index.invalidate();
        }
        result
    }

    fn resize(&mut self, index: FileIndex, old_size: u64, new_size: u64) -> Result<()> {
        let sector_size = self.geometry.sector_size;
        self.table.replace_text(compact::desimp(self.table.as_str())?);

        if new_size > old_size {
            let growth = new_size - old_size;
            self.free_index.refresh(self.table.as_str(), &self.geometry)?;
            if growth > self.free_index.free_space() {
                return Err(Error::InsufficientSpace);
            }
            let tail = old_size % sector_size;
            if tail == 0 {
                self.allocate(index, growth)?;
            } else {
                // The trailing partial sector is re-homed together with the growth.
                let tail_start = old_size - tail;
                let mut scratch = vec![0u8; tail as usize];
                transfer(
                    &*self.device,
                    &self.geometry,
                    &self.table,
                    index,
                    tail_start,
                    Transfer::Read(&mut scratch),
                )?;
                self.deallocate(index, tail)?;
                self.allocate(index, tail + growth)?;
                transfer(
                    &*self.device,
                    &self.geometry,
                    &self.table,
                    index,
                    tail_start,
                    Transfer::Write(&scratch),
                )?;
            }
        } else {
            self.deallocate(index, old_size - new_size)?;
        }

        self.table.replace_text(compact::simp(self.table.as_str())?);
        Ok(())
    }

    /// Reads from `offset`, clamped to end of file. Returns 0 at or past end of file.
    pub fn read(&self, index: FileIndex, offset: u64, buf: &mut [u8]) -> Result<usize> {
        transfer(
            &*self.device,
            &self.geometry,
            &self.table,
            index,
            offset,
            Transfer::Read(buf),
        )
    }

    /// Writes at `offset`, growing the file first if the write runs past its end.
    pub fn write(&mut self, index: FileIndex, offset: u64, buf: &[u8]) -> Result<usize> {
        let end = offset + buf.len() as u64;
        if end > self.file_size(index)? {
            self.truncate(index, end)?;
        }
        let written = transfer(
            &*self.device,
            &self.geometry,
            &self.table,
            index,
            offset,
            Transfer::Write(buf),
        )?;
        let info = &mut self.infos[index];
        info.written = now();
        info.accessed = info.written;
        Ok(written)
    }

    pub fn file_info(&self, index: FileIndex) -> Result<FileInfo> {
        self.infos.get(index).copied().ok_or(Error::NotFound)
    }

    pub fn set_file_info(&mut self, index: FileIndex, info: FileInfo) -> Result<()> {
        // gid and uid have 3 and 2 bytes on disk.
        if info.gid > 0xff_ffff || info.uid > 0xffff {
            return Err(Error::OutOfBounds);
        }
        let slot = self.infos.get_mut(index).ok_or(Error::NotFound)?;
        *slot = info;
        Ok(())
    }

    pub fn name(&self, index: FileIndex) -> Result<String> {
        self.names.get(index).ok_or(Error::NotFound)
    }

    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.names.iter()
    }

    pub fn file_count(&self) -> usize {
        self.names.len()
    }

    pub fn volume_info(&mut self) -> Result<VolumeInfo> {
        self.refresh_index()?;
        Ok(VolumeInfo {
            total_size: self.geometry.data_blocks() * self.geometry.sector_size,
            free_size: self.free_index.free_space(),
            label: self.volume_label()?,
        })
    }

    pub fn volume_label(&self) -> Result<String> {
        let index = self.lookup(VOLUME_LABEL_NAME)?;
        let mut buf = vec![0u8; self.file_size(index)? as usize];
        let n = self.read(index, 0, &mut buf)?;
        buf.truncate(n);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn set_volume_label(&mut self, label: &str) -> Result<()> {
        let index = self.lookup(VOLUME_LABEL_NAME)?;
        self.truncate(index, label.len() as u64)?;
        self.write(index, 0, label.as_bytes())?;
        Ok(())
    }

    /// Rebuilds the free-space index if a mutation invalidated it.
    pub fn refresh_index(&mut self) -> Result<()> {
        self.free_index.refresh(self.table.as_str(), &self.geometry)
    }

    pub fn free_space_index(&self) -> &FreeSpaceIndex {
        &self.free_index
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }
}
