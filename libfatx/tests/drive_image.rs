use std::fs::OpenOptions;

use libfatx::{Device, format_drive, read_drive_layout};

const GIB: u64 = 1024 * 1024 * 1024;

// Formats a sparse 10 GiB image through the device wrapper and reads the
// layout back, the same flow the CLI drives end to end.
#[test]
fn formats_and_lists_a_sparse_drive_image() {
    let path = std::env::temp_dir().join(format!("fatx-drive-{}.img", std::process::id()));

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.set_len(10 * GIB).unwrap();
    drop(file);

    let mut dev = Device::open_rw(&path).unwrap();
    assert_eq!(dev.size(), 10 * GIB);

    let layout = format_drive(&mut dev).unwrap();
    assert_eq!(layout.in_placement_order().len(), 7);
    drop(dev);

    let mut dev = Device::open_ro(&path).unwrap();
    let reports = read_drive_layout(&mut dev).unwrap();

    assert_eq!(reports.len(), 7);

    let letters: Vec<&str> = reports.iter().map(|r| r.letter).collect();
    assert_eq!(letters, ["X", "Y", "Z", "C", "E", "F", "G / other"]);

    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "XBOX GAME SWAP 1",
            "XBOX GAME SWAP 2",
            "XBOX GAME SWAP 3",
            "XBOX SYSTEM",
            "XBOX DATA",
            "XBOX F",
            "XBOX G",
        ]
    );

    // Every partition on a 10 GiB drive stays in the 16 KiB tier.
    assert!(reports.iter().all(|r| r.cluster_size == Some(16 * 1024)));

    // The two trailing partitions split the tail evenly.
    assert_eq!(reports[5].size, reports[6].size);
    assert!(reports[6].offset + reports[6].size <= 10 * GIB);

    std::fs::remove_file(&path).unwrap();
}
