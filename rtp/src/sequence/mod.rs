
/// Sequencer generates sequential sequence numbers for building RTP packets
#[derive(Debug, Clone)]
pub struct Sequencer {
    sequence_number: u16,
    roll_over_count: u64,
    started: bool,
}

impl Sequencer {
    /// Starts from a random sequence number, as RFC 3550 §5.1 recommends.
    pub fn new_random() -> Self {
        Self::new_fixed(rand::random::<u16>())
    }

    /// Starts from a specific sequence number, which is the first one returned.
    pub fn new_fixed(s: u16) -> Self {
        Sequencer {
            sequence_number: s,
            roll_over_count: 0,
            started: false,
        }
    }

    /// Returns the next sequence number, counting wraps past 65535.
    pub fn next_sequence_number(&mut self) -> u16 {
        if !self.started {
            self.started = true;
            return self.sequence_number;
        }
        self.sequence_number = self.sequence_number.wrapping_add(1);
        if self.sequence_number == 0 {
            self.roll_over_count += 1;
        }
        self.sequence_number
    }

    /// The amount of times the 16bit sequence number has wrapped
    pub fn roll_over_count(&self) -> u64 {
        self.roll_over_count
    }
}
