use bitflags::bitflags;

bitflags! {
    // Top 3 bits of the flags/fragment-offset word: [ RF, DF, MF ]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IPFlags: u16 {
        const RF = 1 << 15; // Reserved
        const DF = 1 << 14; // Don't Fragment
        const MF = 1 << 13; // More Fragments
    }
}

impl IPFlags {
    /// Combine the flags with a 13-bit fragment offset.
    pub fn pack(self, frag_offset: u16) -> u16 {
        self.bits() | (frag_offset & 0x1fff)
    }

    /// Split a flags/fragment-offset word into its two parts.
    pub fn unpack(word: u16) -> (Self, u16) {
        (Self::from_bits_truncate(word), word & 0x1fff)
    }
}

bitflags! {
    // Byte 13 of the TCP header: [ CWR, ECE, URG, ACK, PSH, RST, SYN, FIN ]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TCPFlags: u8 {
        const CWR = 1 << 7;
        const ECE = 1 << 6;
        const URG = 1 << 5;
        const ACK = 1 << 4;
        const PSH = 1 << 3;
        const RST = 1 << 2;
        const SYN = 1 << 1;
        const FIN = 1 << 0;
    }
}

// -- Unit tests --
