use cfg_aliases::cfg_aliases;

fn main() {
    // Setup cfg aliases
    cfg_aliases! {
        // Transports
        pipe_transport: { unix },
        // pipe2(2) with O_CLOEXEC, so no other child inherits the capture pipe
        pipe2: { any(target_os = "linux", target_os = "android", target_os = "freebsd",
                    target_os = "netbsd", target_os = "openbsd", target_os = "dragonfly",
                    target_os = "illumos") },
    }
}
