//! Per-field status bits.

use bitflags::bitflags;

bitflags! {
    /// Compact status word carried by every field.
    ///
    /// The low three bits hold the [`FieldKind`] tag; the remaining bits are
    /// independent boolean flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u16 {
        const KIND_MASK           = 0x0007;
        const DEFAULT             = 0x0008;
        const IGNORED             = 0x0010;
        const EXTENDED_STORAGE    = 0x0020;
        const CONNECTIONS_ENABLED = 0x0040;
        const DIRTY               = 0x0080;
        /// Set while `value_changed` runs; guards against re-entrant writes.
        const READ_ONLY           = 0x0100;
        const NOTIFY_ENABLED      = 0x0200;
        const DESTRUCTING         = 0x0400;
        const EVALUATING          = 0x0800;
        /// Set while the field is forwarding a notification.
        const NOTIFIED            = 0x1000;
    }
}

impl StatusFlags {
    /// Flags of a freshly constructed field.
    pub fn initial() -> Self {
        StatusFlags::NOTIFY_ENABLED | StatusFlags::DEFAULT | StatusFlags::CONNECTIONS_ENABLED
    }

    /// Sets or clears `bits`, returning true if any bit changed.
    pub fn change(&mut self, bits: StatusFlags, on: bool) -> bool {
        let old = *self;
        self.set(bits, on);
        old != *self
    }

    pub fn kind(&self) -> FieldKind {
        FieldKind::from_bits(self.bits() & StatusFlags::KIND_MASK.bits()).unwrap_or(FieldKind::Normal)
    }

    pub fn set_kind(&mut self, kind: FieldKind) {
        let bits = (self.bits() & !StatusFlags::KIND_MASK.bits()) | kind as u16;
        *self = StatusFlags::from_bits_retain(bits);
    }
}

/// Role of a field inside its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum FieldKind {
    #[default]
    Normal = 0,
    EventIn = 1,
    EventOut = 2,
    Internal = 3,
    Exposed = 4,
}

impl FieldKind {
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(FieldKind::Normal),
            1 => Some(FieldKind::EventIn),
            2 => Some(FieldKind::EventOut),
            3 => Some(FieldKind::Internal),
            4 => Some(FieldKind::Exposed),
            _ => None,
        }
    }
}
