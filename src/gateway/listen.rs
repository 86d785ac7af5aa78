pub(crate) fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim(), "0.0.0.0" | "::")
}

pub(crate) fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Address a browser on this machine can open; wildcard binds map to loopback.
pub(crate) fn local_base_url(host: &str, port: u16) -> String {
    let host = if is_wildcard_host(host) {
        "127.0.0.1"
    } else {
        host.trim()
    };
    format!("http://{}", format_host_port(host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv6_hosts_are_bracketed() {
        assert_eq!(format_host_port("127.0.0.1", 8888), "127.0.0.1:8888");
        assert_eq!(format_host_port("::1", 8888), "[::1]:8888");
    }

    #[test]
    fn wildcard_hosts_map_to_loopback_url() {
        assert_eq!(local_base_url("0.0.0.0", 8888), "http://127.0.0.1:8888");
        assert_eq!(local_base_url("::", 9000), "http://127.0.0.1:9000");
        assert_eq!(local_base_url("localhost", 8888), "http://localhost:8888");
    }
}
