//! Touch events reported by the display

/// Press state carried by touch and coordinate reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchEvent {
    /// Finger lifted
    Release,
    /// Finger down
    Press,
}

// Wire format values
const EVENT_RELEASE: u8 = 0x00;
const EVENT_PRESS: u8 = 0x01;

impl TouchEvent {
    /// Parse an event from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            EVENT_RELEASE => Some(TouchEvent::Release),
            EVENT_PRESS => Some(TouchEvent::Press),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            TouchEvent::Release => EVENT_RELEASE,
            TouchEvent::Press => EVENT_PRESS,
        }
    }
}

/// Component touch report (`0x65`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Touch {
    /// Page the component lives on
    pub page: u8,
    /// Component id within the page
    pub component: u8,
    pub event: TouchEvent,
}

/// Raw touch coordinate report (`0x67`, or `0x68` while asleep)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coordinate {
    pub x: i16,
    pub y: i16,
    pub event: TouchEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bytes() {
        assert_eq!(TouchEvent::from_byte(0x01), Some(TouchEvent::Press));
        assert_eq!(TouchEvent::from_byte(0x00), Some(TouchEvent::Release));
        assert_eq!(TouchEvent::Press.to_byte(), 0x01);
        assert_eq!(TouchEvent::Release.to_byte(), 0x00);
    }

    #[test]
    fn test_unknown_event() {
        assert!(TouchEvent::from_byte(0x02).is_none());
        assert!(TouchEvent::from_byte(0xFF).is_none());
    }
}
