use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;

/// Fork into the background: the child gets a new session and /dev/null
/// stdio. Returns the child pid in the parent and 0 in the child, ala
/// fork(2). Callers skip this entirely for foreground runs.
pub fn fork_to_background() -> io::Result<libc::pid_t> {
    let child = unsafe { libc::fork() };
    if child < 0 {
        return Err(io::Error::last_os_error());
    }
    if child > 0 {
        return Ok(child);
    }

    unsafe { libc::setsid() };
    let devnull_in = File::open("/dev/null")?;
    let devnull_out = OpenOptions::new().write(true).open("/dev/null")?;
    unsafe {
        libc::dup2(devnull_in.as_raw_fd(), libc::STDIN_FILENO);
        libc::dup2(devnull_out.as_raw_fd(), libc::STDOUT_FILENO);
        libc::dup2(devnull_out.as_raw_fd(), libc::STDERR_FILENO);
    }
    Ok(0)
}
