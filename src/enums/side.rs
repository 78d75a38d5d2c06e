use std::fmt;

/// Side of the top of book a price was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Both sides, asks first as they are displayed
    pub const ALL: [Side; 2] = [Side::Ask, Side::Bid];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        };
        write!(f, "{}", s)
    }
}
