use std::net::Ipv4Addr;

/// Test if `addr` belongs to an RFC1918 range (10/8, 172.16/12, 192.168/16)
#[inline]
pub fn is_private(addr: Ipv4Addr) -> bool {
    addr.is_private()
}

/// Select the endpoint worth enriching: the public one, when exactly one side of
/// the flow is private
pub fn remote_endpoint(src: Ipv4Addr, dst: Ipv4Addr) -> Option<Ipv4Addr> {
    match (is_private(src), is_private(dst)) {
        (true, false) => Some(dst),
        (false, true) => Some(src),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_boundaries() {
        let cases = [
            ([9, 255, 255, 255], false),
            ([10, 0, 0, 0], true),
            ([10, 255, 255, 255], true),
            ([11, 0, 0, 0], false),
            ([172, 15, 255, 255], false),
            ([172, 16, 0, 0], true),
            ([172, 31, 255, 255], true),
            ([172, 32, 0, 0], false),
            ([192, 167, 255, 255], false),
            ([192, 168, 0, 0], true),
            ([192, 168, 255, 255], true),
            ([192, 169, 0, 0], false),
            ([127, 0, 0, 1], false),
            ([100, 64, 0, 1], false),
        ];
        for (octets, expected) in cases {
            let addr = Ipv4Addr::from(octets);
            assert_eq!(is_private(addr), expected, "{addr}");
        }
    }

    #[test]
    fn remote_side_selection() {
        let lan = Ipv4Addr::new(192, 168, 1, 10);
        let lan2 = Ipv4Addr::new(10, 1, 2, 3);
        let wan = Ipv4Addr::new(93, 184, 216, 34);
        let wan2 = Ipv4Addr::new(1, 1, 1, 1);
        assert_eq!(remote_endpoint(lan, wan), Some(wan));
        assert_eq!(remote_endpoint(wan, lan), Some(wan));
        assert_eq!(remote_endpoint(lan, lan2), None);
        assert_eq!(remote_endpoint(wan, wan2), None);
    }
}
