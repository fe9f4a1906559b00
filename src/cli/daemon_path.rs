use std::path::PathBuf;

pub const DAEMON_NAME: &str = "daybook-daemon";

/// The daemon binary is installed next to the cli one.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(DAEMON_NAME);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
