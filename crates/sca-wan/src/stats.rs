/// Per-port interface counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortStats {
    pub ipackets: u64,
    pub ierrors: u64,
    pub iqdrops: u64,
    pub noproto: u64,
    pub opackets: u64,
    pub oerrors: u64,
    pub obytes: u64,
    pub omcasts: u64,
    pub oqdrops: u64,
    pub collisions: u64,
    pub tx_underruns: u64,
    pub tx_ring_resets: u64,
    pub rx_ring_resets: u64,
}
