//! Filesystem helpers for the embedded cluster.

use super::BoxError;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::{Permissions, PermissionsExt};
use cap_std::fs_utf8::Dir;
use postgresql_embedded::Settings;

fn open_parent_dir(path: &Utf8Path) -> Result<(Dir, &str), BoxError> {
    let file_name = path.file_name().ok_or_else(|| {
        Box::new(std::io::Error::other("path must include a file name")) as BoxError
    })?;
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok((dir, file_name))
}

/// Copies the worker somewhere the unprivileged user can execute it.
pub(super) fn prepare_pg_worker(worker: &Utf8Path) -> Result<Utf8PathBuf, BoxError> {
    let temp_dir = Utf8PathBuf::try_from(std::env::temp_dir())
        .map_err(|err| Box::new(err) as BoxError)?;
    let destination = temp_dir.join(format!("switchboard_pg_worker_{}", std::process::id()));
    let (source_dir, source_name) = open_parent_dir(worker)?;
    let (destination_dir, destination_name) = open_parent_dir(&destination)?;

    match destination_dir.remove_file(destination_name) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(Box::new(err) as BoxError),
    }
    source_dir
        .copy(source_name, &destination_dir, destination_name)
        .map_err(|err| Box::new(err) as BoxError)?;
    destination_dir
        .set_permissions(destination_name, Permissions::from_mode(0o755))
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(destination)
}

/// Picks up the generated superuser password when the bootstrap wrote one.
pub(super) fn sync_password_from_file(settings: &mut Settings) -> Result<(), BoxError> {
    let password_path = settings.password_file.to_string_lossy().into_owned();
    let (dir, file_name) = open_parent_dir(Utf8Path::new(&password_path))?;
    match dir.read_to_string(file_name) {
        Ok(contents) => {
            let password = contents.trim_end();
            if !password.is_empty() {
                password.clone_into(&mut settings.password);
            }
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Box::new(err) as BoxError),
    }
}

/// The fourth line of `postmaster.pid` holds the port the server bound.
pub(super) fn sync_port_from_pid(settings: &mut Settings) -> Result<(), BoxError> {
    let data_dir = settings.data_dir.to_string_lossy().into_owned();
    let dir = Dir::open_ambient_dir(Utf8Path::new(&data_dir), ambient_authority())
        .map_err(|err| Box::new(err) as BoxError)?;
    let contents = match dir.read_to_string("postmaster.pid") {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(Box::new(err) as BoxError),
    };
    if let Some(port) = contents
        .lines()
        .nth(3)
        .and_then(|line| line.trim().parse::<u16>().ok())
    {
        settings.port = port;
    }
    Ok(())
}
