#![allow(unused)]

use std::sync::Arc;

mod common;

use common::{init_logger, pattern, RamDisk};
use spacefs::Attributes;
use spacefs::BlockDevice;
use spacefs::Error;
use spacefs::FileSystem;
use spacefs::DEFAULT_GID;
use spacefs::DEFAULT_UID;
use spacefs::DIRECTORY_MODE;
use spacefs::FILE_MODE;

fn format(num_blocks: u64, sector_size: u64) -> FileSystem<RamDisk> {
    init_logger();
    FileSystem::format(Arc::new(RamDisk::new(num_blocks)), sector_size).unwrap()
}

#[test]
fn test_init_fs() {
    let fs = format(64, 512);
    assert_eq!(fs.file_count(), 2);
    assert_eq!(fs.name(0).unwrap(), "/");
    assert_eq!(fs.name(1).unwrap(), ":");
    assert!(fs.file_info(0).unwrap().is_directory());
    assert_eq!(fs.table().as_str(), "..");
    assert_eq!(fs.geometry().table_sectors, 1);
    assert_eq!(fs.geometry().data_blocks(), 63);
    log!("{:?}", fs.geometry());
}

#[test]
fn test_format_rejects_bad_sector_size() {
    init_logger();
    let err = FileSystem::format(Arc::new(RamDisk::new(64)), 1000).unwrap_err();
    assert_eq!(err, Error::InvalidSectorSize(1000));
    let err = FileSystem::format(Arc::new(RamDisk::new(64)), 256).unwrap_err();
    assert_eq!(err, Error::InvalidSectorSize(256));
}

#[test]
fn test_mount_blank_device() {
    init_logger();
    let err = FileSystem::mount(Arc::new(RamDisk::new(64))).unwrap_err();
    assert_eq!(err, Error::InvalidRegion);
}

#[test]
fn test_mount_after_format() {
    let fs = format(64, 1024);
    let mounted = FileSystem::mount(fs.device()).unwrap();
    assert_eq!(mounted.geometry(), fs.geometry());
    assert_eq!(mounted.table(), fs.table());
    assert_eq!(mounted.names().collect::<Vec<_>>(), vec!["/", ":"]);
    assert_eq!(mounted.free_space_index().free_space(), 31 * 1024);
}

#[test]
fn test_create_and_lookup() {
    let mut fs = format(64, 512);
    let dir = fs.create("/Docs", Attributes::DIRECTORY).unwrap();
    let file = fs.create("/Docs/Readme.TXT", Attributes::ARCHIVE).unwrap();
    assert_eq!(dir, 2);
    assert_eq!(file, 3);
    assert_eq!(fs.lookup("/docs/readme.txt").unwrap(), file);
    assert_eq!(fs.lookup("\\DOCS\\README.txt").unwrap(), file);
    assert_eq!(fs.lookup("/docs/missing").unwrap_err(), Error::NotFound);
    assert_eq!(
        fs.create("/DOCS/readme.txt", Attributes::ARCHIVE).unwrap_err(),
        Error::NameCollision
    );
    assert_eq!(fs.table().entry_count(), 4);
    assert_eq!(fs.table_index("/docs/readme.txt").unwrap(), 3);
    assert_eq!(fs.file_size(file).unwrap(), 0);
}

#[test]
fn test_invalid_names() {
    let mut fs = format(64, 512);
    assert_eq!(fs.create("", Attributes::ARCHIVE).unwrap_err(), Error::InvalidFileName);
    assert_eq!(fs.create("/a*b", Attributes::ARCHIVE).unwrap_err(), Error::InvalidFileName);
    assert_eq!(fs.create("/a\0b", Attributes::ARCHIVE).unwrap_err(), Error::InvalidFileName);
    // Nothing was half-created.
    assert_eq!(fs.file_count(), 2);
    assert_eq!(fs.table().entry_count(), 2);
}

#[test]
fn test_default_file_info() {
    let mut fs = format(64, 512);
    let dir = fs.create("/d", Attributes::DIRECTORY).unwrap();
    let file = fs.create("/f", Attributes::ARCHIVE).unwrap();

    let info = fs.file_info(file).unwrap();
    assert_eq!(info.gid, DEFAULT_GID);
    assert_eq!(info.uid, DEFAULT_UID);
    assert_eq!(info.mode, FILE_MODE);
    assert_eq!(info.attributes, Attributes::ARCHIVE);
    assert!(info.created > 0.0);
    assert_eq!(fs.file_info(dir).unwrap().mode, DIRECTORY_MODE);

    // Children and streams inherit owner ids.
    let mut dir_info = fs.file_info(dir).unwrap();
    dir_info.gid = 1000;
    dir_info.uid = 1001;
    fs.set_file_info(dir, dir_info).unwrap();
    let child = fs.create("/d/child", Attributes::ARCHIVE).unwrap();
    let stream = fs.create("/d:meta", Attributes::ARCHIVE).unwrap();
    assert_eq!(fs.file_info(child).unwrap().gid, 1000);
    assert_eq!(fs.file_info(child).unwrap().uid, 1001);
    assert_eq!(fs.file_info(stream).unwrap().uid, 1001);

    dir_info.gid = 0x100_0000;
    assert_eq!(fs.set_file_info(dir, dir_info).unwrap_err(), Error::OutOfBounds);
    assert_eq!(fs.file_info(99).unwrap_err(), Error::NotFound);
}

#[test]
fn test_delete_shifts_indices() {
    let mut fs = format(64, 512);
    let a = fs.create("/a", Attributes::ARCHIVE).unwrap();
    let b = fs.create("/b", Attributes::ARCHIVE).unwrap();
    fs.write(a, 0, &pattern(700, 1)).unwrap();
    let data = pattern(300, 2);
    fs.write(b, 0, &data).unwrap();
    let used = fs.free_space_index().clone();

    fs.delete(a).unwrap();
    assert_eq!(fs.lookup("/a").unwrap_err(), Error::NotFound);
    let b = fs.lookup("/b").unwrap();
    assert_eq!(b, a);
    assert_eq!(fs.table().entry_count(), 3);

    let mut buf = vec![0u8; 300];
    assert_eq!(fs.read(b, 0, &mut buf).unwrap(), 300);
    assert_eq!(buf, data);
    let info = fs.volume_info().unwrap();
    assert_eq!(info.free_size, 63 * 512 - 300);
    assert_eq!(fs.delete(10).unwrap_err(), Error::NotFound);
}

#[test]
fn test_rename_moves_descendants() {
    let mut fs = format(64, 512);
    fs.create("/d", Attributes::DIRECTORY).unwrap();
    let x = fs.create("/d/x", Attributes::ARCHIVE).unwrap();
    fs.create("/d:s", Attributes::ARCHIVE).unwrap();
    fs.create("/dd", Attributes::ARCHIVE).unwrap();
    fs.write(x, 0, b"payload").unwrap();

    fs.rename("/d", "/e").unwrap();
    assert_eq!(
        fs.names().collect::<Vec<_>>(),
        vec!["/", ":", "/e", "/e/x", "/e:s", "/dd"]
    );
    assert_eq!(fs.lookup("/E/X").unwrap(), x);
    let mut buf = [0u8; 7];
    fs.read(x, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"payload");

    // Changing only the case is allowed.
    fs.rename("/e", "/E").unwrap();
    assert_eq!(fs.name(x).unwrap(), "/E/x");

    assert_eq!(fs.rename("/E/x", "/DD").unwrap_err(), Error::NameCollision);
    assert_eq!(fs.rename("/missing", "/z").unwrap_err(), Error::NotFound);
    assert_eq!(fs.rename("/", "/root").unwrap_err(), Error::InvalidFileName);
    assert_eq!(fs.rename(":", "/label").unwrap_err(), Error::InvalidFileName);
    assert_eq!(fs.name(x).unwrap(), "/E/x");
}

#[test]
fn test_truncate_sequence() {
    // 8 MiB device
    let mut fs = format(16384, 512);
    let f = fs.create("/big", Attributes::ARCHIVE).unwrap();

    fs.truncate(f, 6291968).unwrap();
    assert_eq!(fs.file_size(f).unwrap(), 6291968);
    assert_eq!(fs.table().entry(f).unwrap(), "0-12288");

    fs.truncate(f, 2097152).unwrap();
    assert_eq!(fs.file_size(f).unwrap(), 2097152);
    assert_eq!(fs.table().entry(f).unwrap(), "0-4095");

    fs.truncate(f, 2097664).unwrap();
    assert_eq!(fs.file_size(f).unwrap(), 2097664);
    assert_eq!(fs.table().entry(f).unwrap(), "0-4096");

    fs.truncate(f, 2097664 + 10).unwrap();
    assert_eq!(fs.table().entry(f).unwrap(), "0-4096,4097;0;10");
    fs.truncate(f, 0).unwrap();
    assert_eq!(fs.table().entry(f).unwrap(), "");
}

#[test]
fn test_truncate_failure_restores_table() {
    let mut fs = format(64, 512);
    let f = fs.create("/f", Attributes::ARCHIVE).unwrap();
    fs.write(f, 0, &pattern(1000, 3)).unwrap();
    let before = fs.table().clone();

    assert_eq!(fs.truncate(f, 1 << 20).unwrap_err(), Error::InsufficientSpace);
    assert_eq!(fs.table(), &before);
    assert_eq!(fs.file_size(f).unwrap(), 1000);
    let mut buf = vec![0u8; 1000];
    fs.read(f, 0, &mut buf).unwrap();
    assert_eq!(buf, pattern(1000, 3));
}

#[test]
fn test_read_after_write() {
    for sector_size in [512u64, 4096] {
        let mut fs = format(512, sector_size);
        let f = fs.create("/data.bin", Attributes::ARCHIVE).unwrap();
        let data = pattern(3 * sector_size as usize + 123, 7);
        assert_eq!(fs.write(f, 0, &data).unwrap(), data.len());
        assert_eq!(fs.file_size(f).unwrap(), data.len() as u64);

        let mut buf = vec![0u8; data.len()];
        assert_eq!(fs.read(f, 0, &mut buf).unwrap(), data.len());
        assert_eq!(buf, data);

        // Unaligned window straddling sector boundaries.
        let (off, len) = (sector_size as usize - 17, sector_size as usize + 40);
        let mut window = vec![0u8; len];
        assert_eq!(fs.read(f, off as u64, &mut window).unwrap(), len);
        assert_eq!(window, &data[off..off + len]);

        // Overwrite in the middle, then extend past the end.
        let patch = pattern(301, 9);
        fs.write(f, 1001, &patch).unwrap();
        let tail = pattern(sector_size as usize, 11);
        let end = data.len() as u64;
        fs.write(f, end, &tail).unwrap();

        let mut expected = data.clone();
        expected[1001..1302].copy_from_slice(&patch);
        expected.extend_from_slice(&tail);
        let mut buf = vec![0u8; expected.len()];
        assert_eq!(fs.read(f, 0, &mut buf).unwrap(), expected.len());
        assert_eq!(buf, expected);
    }
}

#[test]
fn test_read_clamps_at_eof() {
    let mut fs = format(64, 512);
    let f = fs.create("/f", Attributes::ARCHIVE).unwrap();
    let data = pattern(700, 5);
    fs.write(f, 0, &data).unwrap();

    let mut buf = [0u8; 10];
    assert_eq!(fs.read(f, 697, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], &data[697..]);
    assert_eq!(fs.read(f, 700, &mut buf).unwrap(), 0);
    assert_eq!(fs.read(f, 5000, &mut buf).unwrap(), 0);
    assert_eq!(fs.read(f, 0, &mut []).unwrap(), 0);
}

#[test]
fn test_partial_blocks_stay_private() {
    let mut fs = format(64, 512);
    let a = fs.create("/a", Attributes::ARCHIVE).unwrap();
    let b = fs.create("/b", Attributes::ARCHIVE).unwrap();
    let a_head = pattern(100, 1);
    let b_data = pattern(100, 2);
    fs.write(a, 0, &a_head).unwrap();
    fs.write(b, 0, &b_data).unwrap();
    assert_eq!(fs.table().entry(a).unwrap(), "0;0;100");
    assert_eq!(fs.table().entry(b).unwrap(), "1;0;100");

    // Growing `a` re-homes its tail and leaves `b` alone.
    let a_rest = pattern(600, 3);
    fs.write(a, 100, &a_rest).unwrap();
    assert_eq!(fs.file_size(a).unwrap(), 700);
    assert_eq!(fs.table().entry(a).unwrap(), "0,2;0;188");
    assert_eq!(fs.table().entry(b).unwrap(), "1;0;100");

    let mut buf = vec![0u8; 700];
    fs.read(a, 0, &mut buf).unwrap();
    assert_eq!(&buf[..100], &a_head[..]);
    assert_eq!(&buf[100..], &a_rest[..]);
    let mut buf = vec![0u8; 100];
    fs.read(b, 0, &mut buf).unwrap();
    assert_eq!(buf, b_data);
}

#[test]
fn test_delete_takes_streams_along() {
    let mut fs = format(64, 512);
    let f = fs.create("/f", Attributes::ARCHIVE).unwrap();
    let s = fs.create("/F:meta", Attributes::ARCHIVE).unwrap();
    fs.create("/g", Attributes::ARCHIVE).unwrap();
    fs.create("/fg:x", Attributes::ARCHIVE).unwrap();
    fs.write(f, 0, &pattern(100, 1)).unwrap();
    fs.write(s, 0, &pattern(600, 2)).unwrap();
    let total = fs.volume_info().unwrap().total_size;

    fs.delete(f).unwrap();
    assert_eq!(fs.names().collect::<Vec<_>>(), vec!["/", ":", "/g", "/fg:x"]);
    assert_eq!(fs.lookup("/f:meta").unwrap_err(), Error::NotFound);
    assert_eq!(fs.volume_info().unwrap().free_size, total);

    // A recreated file starts empty and without streams.
    let f = fs.create("/f", Attributes::ARCHIVE).unwrap();
    assert_eq!(fs.file_size(f).unwrap(), 0);
    assert_eq!(fs.lookup("/f:meta").unwrap_err(), Error::NotFound);

    // Deleting a stream leaves its base file.
    let s = fs.create("/f:meta", Attributes::ARCHIVE).unwrap();
    fs.delete(s).unwrap();
    assert_eq!(fs.lookup("/f").unwrap(), f);
}

#[test]
fn test_delete_rejects_reserved_entries() {
    let mut fs = format(64, 512);
    assert_eq!(fs.delete(0).unwrap_err(), Error::InvalidFileName);
    assert_eq!(fs.delete(1).unwrap_err(), Error::InvalidFileName);
    assert_eq!(fs.file_count(), 2);
    assert_eq!(fs.volume_info().unwrap().label, "");
}

#[test]
fn test_block_run_is_one_device_call() {
    init_logger();
    let disk = Arc::new(RamDisk::new(256));
    let mut fs = FileSystem::format(Arc::clone(&disk), 512).unwrap();
    let f = fs.create("/run", Attributes::ARCHIVE).unwrap();
    fs.truncate(f, 64 * 512).unwrap();
    assert_eq!(fs.table().entry(f).unwrap(), "0-63");

    let data = pattern(64 * 512, 8);
    let before = disk.io_calls();
    fs.write(f, 0, &data).unwrap();
    assert_eq!(disk.io_calls() - before, 1);

    let mut buf = vec![0u8; data.len()];
    let before = disk.io_calls();
    assert_eq!(fs.read(f, 0, &mut buf).unwrap(), data.len());
    assert_eq!(disk.io_calls() - before, 1);
    assert_eq!(buf, data);

    // Unaligned write: read then write the covered blocks.
    let patch = pattern(1000, 9);
    let before = disk.io_calls();
    fs.write(f, 300, &patch).unwrap();
    assert_eq!(disk.io_calls() - before, 2);
    let mut window = vec![0u8; 1000];
    fs.read(f, 300, &mut window).unwrap();
    assert_eq!(window, patch);

    // Block 0 sits at the end of the device, block 1 just before it.
    let raw = disk.snapshot();
    let end = raw.len();
    assert_eq!(&raw[end - 512..end - 212], &data[..300]);
    assert_eq!(&raw[end - 1024..end - 512], &patch[212..724]);
}

#[test]
fn test_commit_and_remount() {
    let mut fs = format(256, 512);
    let dir = fs.create("/docs", Attributes::DIRECTORY).unwrap();
    let f = fs.create("/docs/a.txt", Attributes::ARCHIVE | Attributes::HIDDEN).unwrap();
    let data = pattern(1500, 4);
    fs.write(f, 0, &data).unwrap();
    fs.set_volume_label("BACKUP").unwrap();
    let info = fs.file_info(f).unwrap();
    fs.commit().unwrap();

    let mounted = FileSystem::mount(fs.device()).unwrap();
    assert_eq!(mounted.table(), fs.table());
    assert_eq!(mounted.names().collect::<Vec<_>>(), fs.names().collect::<Vec<_>>());
    let f = mounted.lookup("/DOCS/A.TXT").unwrap();
    assert_eq!(mounted.file_info(f).unwrap(), info);
    assert!(mounted.file_info(dir).unwrap().is_directory());
    assert_eq!(mounted.volume_label().unwrap(), "BACKUP");

    let mut buf = vec![0u8; data.len()];
    assert_eq!(mounted.read(f, 0, &mut buf).unwrap(), data.len());
    assert_eq!(buf, data);
}

#[test]
fn test_uncommitted_changes_are_lost() {
    let mut fs = format(64, 512);
    fs.create("/scratch", Attributes::ARCHIVE).unwrap();
    let mounted = FileSystem::mount(fs.device()).unwrap();
    assert_eq!(mounted.lookup("/scratch").unwrap_err(), Error::NotFound);
    assert_eq!(mounted.file_count(), 2);
}

#[test]
fn test_table_region_growth() {
    let mut fs = format(64, 512);
    let f = fs.create("/fill", Attributes::ARCHIVE).unwrap();
    fs.allocate(f, 63 * 512).unwrap();
    for i in 0..20 {
        fs.create(&format!("/file_{:02}", i), Attributes::ARCHIVE).unwrap();
    }

    // The region would have to cover the highest data block.
    assert_eq!(fs.commit().unwrap_err(), Error::InsufficientSpace);
    assert_eq!(fs.geometry().table_sectors, 1);

    fs.deallocate(f, 8 * 512).unwrap();
    fs.commit().unwrap();
    let table_sectors = fs.geometry().table_sectors;
    assert!(table_sectors > 1);
    assert_eq!(fs.geometry().data_blocks(), 64 - table_sectors);

    let mounted = FileSystem::mount(fs.device()).unwrap();
    assert_eq!(mounted.geometry().table_sectors, table_sectors);
    assert_eq!(mounted.file_count(), 23);
    assert_eq!(mounted.file_size(f).unwrap(), 55 * 512);
    assert_eq!(mounted.name(22).unwrap(), "/file_19");
}

#[test]
fn test_volume_label() {
    let mut fs = format(64, 512);
    assert_eq!(fs.volume_label().unwrap(), "");
    fs.set_volume_label("DATA").unwrap();
    let info = fs.volume_info().unwrap();
    assert_eq!(info.label, "DATA");
    assert_eq!(info.total_size, 63 * 512);
    assert_eq!(info.free_size, 63 * 512 - 4);

    fs.set_volume_label("LONGER LABEL").unwrap();
    assert_eq!(fs.volume_label().unwrap(), "LONGER LABEL");
    fs.set_volume_label("X").unwrap();
    assert_eq!(fs.volume_label().unwrap(), "X");
}
