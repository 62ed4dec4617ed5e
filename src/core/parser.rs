//! Parsing of `netstat -ano` style listing lines.
//!
//! Accepted shape, whitespace separated:
//!
//! ```text
//! <PROTO> <local-ip>:<local-port> <remote-ip>:<remote-port-or-*> [<state>] [<pid>]
//! ```
//!
//! Anything else (headers, blank lines, summaries) is rejected without error.

use super::connection::{ConnectionRecord, Protocol, UDP_STATE_SENTINEL};

pub fn parse_line(line: &str) -> Option<ConnectionRecord> {
    let mut tokens = line.split_whitespace();

    let protocol = Protocol::from_token(tokens.next()?)?;
    let (local_address, local_port) = split_endpoint(tokens.next()?)?;
    let (remote_address, remote_port) = split_endpoint(tokens.next()?)?;

    if local_port == "*" {
        return None;
    }

    let trailing: Vec<&str> = tokens.collect();
    let (state, pid) = match trailing.as_slice() {
        [] => (None, None),
        [single] => match parse_pid(single) {
            Some(pid) => (None, Some(pid)),
            None if is_state_token(single) => (Some(single.to_string()), None),
            None => return None,
        },
        [state, pid] => {
            if !is_state_token(state) {
                return None;
            }
            (Some(state.to_string()), Some(parse_pid(pid)?))
        }
        _ => return None,
    };

    let state = match (state, protocol) {
        (None, Protocol::Udp) => Some(UDP_STATE_SENTINEL.to_string()),
        (state, _) => state,
    };

    Some(ConnectionRecord::new(
        protocol,
        local_address.to_string(),
        local_port.to_string(),
        remote_address.to_string(),
        remote_port.to_string(),
        state,
        pid,
    ))
}

/// Parses every line of a listing, dropping the ones that do not match.
pub fn parse_listing(text: &str) -> Vec<ConnectionRecord> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

// The port is whatever follows the last colon, so bracketed IPv6 addresses
// keep their inner colons in the address part.
fn split_endpoint(token: &str) -> Option<(&str, &str)> {
    let (address, port) = token.rsplit_once(':')?;
    if address.is_empty() || port.is_empty() {
        return None;
    }
    Some((address, port))
}

fn is_state_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn parse_pid(token: &str) -> Option<u32> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_listening_line() {
        let rec = parse_line("TCP 127.0.0.1:80 0.0.0.0:0 LISTENING 1234").unwrap();
        assert_eq!(rec.protocol, Protocol::Tcp);
        assert_eq!(rec.local_address, "127.0.0.1");
        assert_eq!(rec.local_port, "80");
        assert_eq!(rec.remote_address, "0.0.0.0");
        assert_eq!(rec.remote_port, "0");
        assert_eq!(rec.state.as_deref(), Some("LISTENING"));
        assert_eq!(rec.pid, Some(1234));
    }

    #[test]
    fn test_parse_udp_without_state_or_pid() {
        let rec = parse_line("UDP 0.0.0.0:68 *:*").unwrap();
        assert_eq!(rec.protocol, Protocol::Udp);
        assert_eq!(rec.remote_address, "*");
        assert_eq!(rec.remote_port, "*");
        assert_eq!(rec.state.as_deref(), Some(UDP_STATE_SENTINEL));
        assert_eq!(rec.pid, None);
    }

    #[test]
    fn test_parse_udp_with_pid_only() {
        let rec = parse_line("UDP    0.0.0.0:5353    *:*    2216").unwrap();
        assert_eq!(rec.state.as_deref(), Some(UDP_STATE_SENTINEL));
        assert_eq!(rec.pid, Some(2216));
    }

    #[test]
    fn test_tcp_without_state_stays_blank() {
        let rec = parse_line("TCP 10.0.0.2:50000 10.0.0.1:443").unwrap();
        assert_eq!(rec.state, None);
        assert_eq!(rec.pid, None);
    }

    #[test]
    fn test_underscored_states_parse_whole() {
        let rec = parse_line("TCP 10.0.0.2:50000 93.184.216.34:443 TIME_WAIT 0").unwrap();
        assert_eq!(rec.state.as_deref(), Some("TIME_WAIT"));
        assert_eq!(rec.pid, Some(0));

        let rec = parse_line("TCP 10.0.0.2:50001 93.184.216.34:443 FIN_WAIT_2 812").unwrap();
        assert_eq!(rec.state.as_deref(), Some("FIN_WAIT_2"));
    }

    #[test]
    fn test_ipv6_endpoints_split_on_last_colon() {
        let rec = parse_line("TCP [::]:135 [::]:0 LISTENING 1044").unwrap();
        assert_eq!(rec.local_address, "[::]");
        assert_eq!(rec.local_port, "135");
        assert_eq!(rec.remote_address, "[::]");

        let rec = parse_line("UDP [fe80::1%4]:546 *:* 1500").unwrap();
        assert_eq!(rec.local_address, "[fe80::1%4]");
        assert_eq!(rec.local_port, "546");
    }

    #[test]
    fn test_rejects_non_listing_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("Active Connections").is_none());
        assert!(parse_line("Proto Local Address Foreign Address State").is_none());
        assert!(parse_line("tcp 127.0.0.1:80 0.0.0.0:0 LISTENING 1").is_none());
        assert!(parse_line("TCP 127.0.0.1 0.0.0.0:0 LISTENING 1").is_none());
        assert!(parse_line("TCP 127.0.0.1:80").is_none());
        assert!(parse_line("TCP 127.0.0.1:* 0.0.0.0:0").is_none());
        assert!(parse_line("TCP :80 0.0.0.0:0").is_none());
        assert!(parse_line("TCP 127.0.0.1:80 0.0.0.0:0 LISTENING 1234 extra").is_none());
        assert!(parse_line("TCP 127.0.0.1:80 0.0.0.0:0 LISTENING abc").is_none());
        assert!(parse_line("TCP 127.0.0.1:80 0.0.0.0:0 -1").is_none());
    }

    #[test]
    fn test_parse_listing_skips_headers() {
        let text = "\r\nActive Connections\r\n\r\n  Proto  Local Address          Foreign Address        State           PID\r\n  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1044\r\n  UDP    0.0.0.0:500            *:*                                    3920\r\n";
        let records = parse_listing(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].local_port, "135");
        assert_eq!(records[1].pid, Some(3920));
    }
}
