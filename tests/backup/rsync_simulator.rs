//! Local stand-in for `rsync -a --delete` used by behavioural tests.
//!
//! Copies the source tree into the destination and prunes destination
//! entries absent from the source, which is all the mirroring semantics the
//! tests observe.

use std::collections::HashSet;
use std::fs::{copy, create_dir_all, read_dir, remove_dir_all, remove_file};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

pub fn simulate_rsync(source: &Utf8Path, destination: &Utf8Path) -> io::Result<usize> {
    create_dir_all(destination)?;
    let mut kept = HashSet::new();
    let copied = copy_tree(source, destination, Utf8Path::new(""), &mut kept)?;
    prune(destination, Utf8Path::new(""), &kept)?;
    Ok(copied)
}

fn utf8(path: std::path::PathBuf) -> io::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| io::Error::new(io::ErrorKind::InvalidData, path.display().to_string()))
}

fn copy_tree(
    source_root: &Utf8Path,
    destination_root: &Utf8Path,
    relative: &Utf8Path,
    kept: &mut HashSet<Utf8PathBuf>,
) -> io::Result<usize> {
    let mut copied = 0;
    for item in read_dir(source_root.join(relative))? {
        let entry = item?;
        let name = utf8(entry.file_name().into())?;
        let child = relative.join(&name);
        kept.insert(child.clone());

        if entry.file_type()?.is_dir() {
            create_dir_all(destination_root.join(&child))?;
            copied += copy_tree(source_root, destination_root, &child, kept)?;
        } else {
            copy(source_root.join(&child), destination_root.join(&child))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn prune(
    destination_root: &Utf8Path,
    relative: &Utf8Path,
    kept: &HashSet<Utf8PathBuf>,
) -> io::Result<()> {
    for item in read_dir(destination_root.join(relative))? {
        let entry = item?;
        let name = utf8(entry.file_name().into())?;
        let child = relative.join(&name);
        let is_dir = entry.file_type()?.is_dir();

        if !kept.contains(&child) {
            if is_dir {
                remove_dir_all(destination_root.join(&child))?;
            } else {
                remove_file(destination_root.join(&child))?;
            }
        } else if is_dir {
            prune(destination_root, &child, kept)?;
        }
    }
    Ok(())
}
