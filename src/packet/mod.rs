pub mod errors;
pub mod flags;
pub mod ip_header;
pub mod segment;
pub mod tcp_header;

pub use errors::HeaderError;
pub use flags::{IPFlags, TCPFlags};
pub use segment::CapturedSegment;

/// Add `data` to `sum` as big-endian 16-bit words, zero-padding an odd tail.
pub(crate) fn sum_words(data: &[u8], mut sum: u32) -> u32 {
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }
    if let [last] = words.remainder() {
        sum += (*last as u32) << 8;
    }
    sum
}

/// Fold the carries back in and take the one's complement.
pub(crate) fn fold(mut sum: u32) -> u16 {
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

// Unit test helpers

#[cfg(test)]
pub mod test_utils {
    /// IPv4 header of a captured SYN, 10.110.208.106 -> 204.44.192.60.
    pub fn get_ip_hex() -> &'static str {
        "45000040000040004006d3760a6ed06acc2cc03c"
    }

    /// TCP header (with options) of the same SYN, 50871 -> 80.
    pub fn get_tcp_hex() -> &'static str {
        "c6b70050a4269c9300000000b002ffff92970000020405b4010303060101080abb6879f80000000004020000"
    }

    pub fn get_syn_datagram() -> Vec<u8> {
        [
            hex::decode(get_ip_hex()).unwrap(),
            hex::decode(get_tcp_hex()).unwrap(),
        ]
        .concat()
    }
}
