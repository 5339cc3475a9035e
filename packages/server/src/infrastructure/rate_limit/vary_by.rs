//! Builds rate-limit bucket keys from request attributes.

use std::net::SocketAddr;

use serde::Deserialize;

/// Which request attributes separate one bucket from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VaryBy {
    pub remote_addr: bool,
    pub method: bool,
    pub resource: bool,
}

impl Default for VaryBy {
    fn default() -> Self {
        Self {
            remote_addr: true,
            method: false,
            resource: true,
        }
    }
}

impl VaryBy {
    pub fn key(&self, prefix: &str, method: &str, resource: &str, remote_addr: &str) -> String {
        let mut key = String::from(prefix);
        if self.remote_addr {
            key.push_str(&host_of(remote_addr));
            key.push('\n');
        }
        if self.method {
            key.push_str(method);
            key.push('\n');
        }
        if self.resource {
            key.push_str(resource);
            key.push('\n');
        }
        key
    }
}

/// The remote address without its port, lower-cased.
fn host_of(remote_addr: &str) -> String {
    if let Ok(addr) = remote_addr.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    let host = match remote_addr.rfind(':') {
        Some(idx) if !remote_addr[..idx].contains(':') => &remote_addr[..idx],
        _ => remote_addr,
    };
    host.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_is_stripped_from_remote_address() {
        // テスト項目: リモートアドレスのポートは無視される
        // given (前提条件):
        let vary_by = VaryBy::default();

        // when (操作):
        let a = vary_by.key("ws__", "3", "message", "192.168.1.10:50000");
        let b = vary_by.key("ws__", "3", "message", "192.168.1.10:50001");
        let v6 = vary_by.key("ws__", "3", "message", "[::1]:8080");

        // then (期待する結果):
        assert_eq!(a, b);
        assert_eq!(a, "ws__192.168.1.10\nmessage\n");
        assert_eq!(v6, "ws__::1\nmessage\n");
    }

    #[test]
    fn test_unparseable_address_is_lower_cased() {
        // テスト項目: SocketAddr でないアドレスは小文字化してポートを除く
        // given (前提条件):
        let vary_by = VaryBy {
            remote_addr: true,
            method: true,
            resource: false,
        };

        // when (操作):
        let key = vary_by.key("http__", "GET", "/api/health", "Proxy.Local:443");

        // then (期待する結果):
        assert_eq!(key, "http__proxy.local\nGET\n");
    }
}
