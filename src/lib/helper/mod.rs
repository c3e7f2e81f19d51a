pub mod daemon;

/// Short hostname with any domain part dropped, for the uptime line.
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    let failed = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) } != 0;
    if failed {
        return "localhost".to_string();
    }
    let end = buf.iter().position(|&byte| byte == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]);
    match name.split('.').next() {
        Some(short) if !short.is_empty() => short.to_string(),
        _ => "localhost".to_string(),
    }
}
